use schema_index::{
    SchemaIndex, TypeDescriptor, TypeKind,
    classifier::{self, ExclusionFilter},
};
use std::{cell::RefCell, collections::HashSet, fmt};

/// Recursion bound of the selection walk. Relation fields already cut every cycle through
/// entities, this only bounds cycles through embedded types.
pub const MAX_DEPTH: usize = 16;

/// The depth of an entity's attributes inside a document:
/// `query { <root> { data { attributes { .. } } } }`.
pub const ROOT_DEPTH: usize = 4;

const TYPENAME: &str = "__typename";
const FETCH_ALL: &str = "pagination: { limit: -1 }";

/// One item of a selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionItem {
    /// `name`
    Leaf(String),
    /// `name(arguments) { selection }`
    Field {
        name: String,
        arguments: Option<String>,
        selection: Selection,
    },
    /// `... on TypeName { selection }`
    InlineFragment { type_condition: String, selection: Selection },
}

impl SelectionItem {
    fn leaf(name: impl Into<String>) -> Self {
        SelectionItem::Leaf(name.into())
    }
}

/// A non-empty selection set, rendered without its surrounding braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    items: Vec<SelectionItem>,
}

impl Selection {
    fn new(items: Vec<SelectionItem>) -> Option<Self> {
        (!items.is_empty()).then_some(Selection { items })
    }

    fn with_typename(mut self) -> Self {
        if self.items.first() != Some(&SelectionItem::leaf(TYPENAME)) {
            self.items.insert(0, SelectionItem::leaf(TYPENAME));
        }

        self
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }
}

impl fmt::Display for SelectionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionItem::Leaf(name) => f.write_str(name),
            SelectionItem::Field {
                name,
                arguments: Some(arguments),
                selection,
            } => write!(f, "{name}({arguments}) {{ {selection} }}"),
            SelectionItem::Field {
                name,
                arguments: None,
                selection,
            } => write!(f, "{name} {{ {selection} }}"),
            SelectionItem::InlineFragment {
                type_condition,
                selection,
            } => write!(f, "... on {type_condition} {{ {selection} }}"),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, item) in self.items.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }

            write!(f, "{item}")?;
        }

        Ok(())
    }
}

/// Builds selection sets from the schema index. One builder serves one synthesis pass:
/// unresolvable type names are only warned about the first time they are met.
pub struct SelectionBuilder<'a> {
    index: &'a SchemaIndex,
    exclusions: &'a ExclusionFilter,
    warned: RefCell<HashSet<String>>,
}

impl<'a> SelectionBuilder<'a> {
    pub fn new(index: &'a SchemaIndex, exclusions: &'a ExclusionFilter) -> Self {
        SelectionBuilder {
            index,
            exclusions,
            warned: RefCell::new(HashSet::new()),
        }
    }

    /// The selection of an entity's attributes, as one space-separated string. `None` when the
    /// type has nothing to select.
    pub fn synthesize_root(&self, ty: &TypeDescriptor, depth: usize) -> Option<String> {
        self.synthesize(ty, depth).map(|selection| selection.to_string())
    }

    /// The selection of `ty` at `depth`. `None` past [MAX_DEPTH], for leaf kinds, and when
    /// nothing is left to select.
    pub fn synthesize(&self, ty: &TypeDescriptor, depth: usize) -> Option<Selection> {
        if depth > MAX_DEPTH {
            return None;
        }

        match ty.kind {
            TypeKind::Object | TypeKind::Interface if classifier::is_entity_object(&ty.name) => {
                Selection::new(vec![SelectionItem::leaf("id")])
            }
            TypeKind::Object | TypeKind::Interface => {
                let items = self
                    .exclusions
                    .retained_fields(ty)
                    .filter_map(|field| self.field_item(field, depth))
                    .collect();

                Selection::new(items)
            }
            TypeKind::Union => Selection::new(self.union_items(ty, depth)),
            TypeKind::Enum => {
                let mut items = vec![SelectionItem::leaf(TYPENAME)];
                items.extend(ty.enum_values.iter().map(|value| SelectionItem::leaf(&value.name)));

                Selection::new(items)
            }
            TypeKind::Scalar | TypeKind::InputObject | TypeKind::List | TypeKind::NonNull => None,
        }
    }

    fn union_items(&self, ty: &TypeDescriptor, depth: usize) -> Vec<SelectionItem> {
        let mut items = vec![SelectionItem::leaf(TYPENAME)];

        for member in &ty.possible_types {
            let Some(member_name) = member.name.as_deref() else {
                continue;
            };

            if self.exclusions.is_excluded(member_name) {
                continue;
            }

            let Some(member_ty) = self.lookup(member_name) else {
                continue;
            };

            if let Some(selection) = self.synthesize(member_ty, depth + 1) {
                items.push(SelectionItem::InlineFragment {
                    type_condition: member_name.to_owned(),
                    selection: selection.with_typename(),
                });
            }
        }

        items
    }

    fn field_item(&self, field: &schema_index::FieldDescriptor, depth: usize) -> Option<SelectionItem> {
        let Some(named) = classifier::unwrap_to_named(&field.type_ref) else {
            tracing::debug!(field = %field.name, "Skipping field with a malformed type reference");
            return None;
        };

        let arguments = field.has_arg("pagination").then(|| String::from(FETCH_ALL));

        if classifier::classify_relation(named.name).is_some() {
            let data = SelectionItem::Field {
                name: String::from("data"),
                arguments: None,
                selection: Selection {
                    items: vec![SelectionItem::leaf("id")],
                },
            };

            return Some(SelectionItem::Field {
                name: field.name.clone(),
                arguments,
                selection: Selection {
                    items: vec![SelectionItem::leaf(TYPENAME), data],
                },
            });
        }

        match named.kind {
            TypeKind::Scalar | TypeKind::Enum => Some(SelectionItem::leaf(&field.name)),
            TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
                let ty = self.lookup(named.name)?;
                let selection = self.synthesize(ty, depth + 1)?;

                Some(SelectionItem::Field {
                    name: field.name.clone(),
                    arguments,
                    selection: selection.with_typename(),
                })
            }
            TypeKind::InputObject | TypeKind::List | TypeKind::NonNull => None,
        }
    }

    fn lookup(&self, name: &str) -> Option<&'a TypeDescriptor> {
        let found = self.index.get(name);

        if found.is_none() && self.warned.borrow_mut().insert(name.to_owned()) {
            tracing::warn!(type_name = name, "Type is referenced but missing from the schema, skipping it");
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_setup::fixtures::*;

    fn index(types: Vec<serde_json::Value>) -> SchemaIndex {
        SchemaIndex::from_introspection(introspection_response(types)).unwrap()
    }

    #[test]
    fn entity_objects_select_their_id_only() {
        let index = index(vec![object_type(
            "UploadFileEntity",
            vec![field("id", scalar("ID")), field("attributes", object("UploadFile"))],
        )]);
        let exclusions = ExclusionFilter::default();
        let builder = SelectionBuilder::new(&index, &exclusions);

        let ty = index.get("UploadFileEntity").unwrap();

        assert_eq!(builder.synthesize_root(ty, ROOT_DEPTH).as_deref(), Some("id"));
    }

    #[test]
    fn enum_nodes_select_their_values() {
        let index = index(vec![enum_type("ENUM_ARTICLE_STATUS", &["draft", "published"])]);
        let exclusions = ExclusionFilter::default();
        let builder = SelectionBuilder::new(&index, &exclusions);

        let ty = index.get("ENUM_ARTICLE_STATUS").unwrap();

        assert_eq!(
            builder.synthesize_root(ty, ROOT_DEPTH).as_deref(),
            Some("__typename draft published")
        );
    }

    #[test]
    fn empty_objects_are_dropped() {
        let index = index(vec![
            object_type("Holder", vec![field("title", scalar("String")), field("empty", object("Empty"))]),
            object_type("Empty", vec![field("morph", union_ref("GenericMorph"))]),
        ]);
        let exclusions = ExclusionFilter::default();
        let builder = SelectionBuilder::new(&index, &exclusions);

        let holder = index.get("Holder").unwrap();

        assert_eq!(builder.synthesize_root(holder, ROOT_DEPTH).as_deref(), Some("title"));
    }

    #[test]
    fn depth_past_the_bound_yields_nothing() {
        let index = index(vec![object_type("Leafy", vec![field("title", scalar("String"))])]);
        let exclusions = ExclusionFilter::default();
        let builder = SelectionBuilder::new(&index, &exclusions);

        let leafy = index.get("Leafy").unwrap();

        assert!(builder.synthesize(leafy, MAX_DEPTH).is_some());
        assert_eq!(builder.synthesize(leafy, MAX_DEPTH + 1), None);
    }
}
