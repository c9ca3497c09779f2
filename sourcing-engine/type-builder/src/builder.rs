use crate::{
    definition::{FieldDefinition, ObjectDefinition, TypeDefinition, TypeDefinitions, UnionDefinition},
    resolver::{FILE_TYPE, FieldResolver},
};
use indexmap::IndexMap;
use schema_index::{
    EntitySet, FieldDescriptor, SchemaIndex, TypeDescriptor, TypeKind, TypeRef, UPLOAD_FILE,
    classifier::{self, Cardinality, ExclusionFilter},
};
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_TYPE_PREFIX: &str = "Strapi";

const NODE_INTERFACE: &str = "Node";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBuilderOptions {
    /// Prepended to every local type name.
    pub prefix: String,
    /// Entity type name to the rich text fields images are extracted from.
    pub inline_images: IndexMap<String, Vec<String>>,
    /// Also expose the parsed document of each rich text field.
    pub parse_documents: bool,
}

impl Default for TypeBuilderOptions {
    fn default() -> Self {
        TypeBuilderOptions {
            prefix: String::from(DEFAULT_TYPE_PREFIX),
            inline_images: IndexMap::new(),
            parse_documents: false,
        }
    }
}

/// Renders a remote type reference as the local type, in GraphQL syntax. Object, interface and
/// union types get the prefix, enums are stored as strings. `None` for input objects and
/// malformed references.
pub fn render_local_type(type_ref: &TypeRef, prefix: &str) -> Option<String> {
    match (type_ref.kind, type_ref.of_type.as_deref()) {
        (TypeKind::NonNull, Some(inner)) => render_local_type(inner, prefix).map(|inner| format!("{inner}!")),
        (TypeKind::List, Some(inner)) => render_local_type(inner, prefix).map(|inner| format!("[{inner}]")),
        (TypeKind::List | TypeKind::NonNull, None) => None,
        (TypeKind::Object | TypeKind::Interface | TypeKind::Union, _) => {
            type_ref.name.as_deref().map(|name| format!("{prefix}{name}"))
        }
        (TypeKind::Enum, _) => Some(String::from("String")),
        (TypeKind::Scalar, _) => type_ref.name.as_deref().map(|name| classifier::map_scalar(name).to_owned()),
        (TypeKind::InputObject, _) => None,
    }
}

/// Breadth-first synthesis of the local types reachable from the configured entities.
pub struct TypeDefinitionBuilder<'a> {
    index: &'a SchemaIndex,
    entities: &'a EntitySet,
    exclusions: &'a ExclusionFilter,
    options: &'a TypeBuilderOptions,
}

/// The BFS work-list. Each name is enqueued at most once.
#[derive(Default)]
struct WorkList {
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl WorkList {
    fn enqueue(&mut self, name: &str) {
        if self.seen.insert(name.to_owned()) {
            self.queue.push_back(name.to_owned());
        }
    }

    fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }
}

impl<'a> TypeDefinitionBuilder<'a> {
    pub fn new(
        index: &'a SchemaIndex,
        entities: &'a EntitySet,
        exclusions: &'a ExclusionFilter,
        options: &'a TypeBuilderOptions,
    ) -> Self {
        TypeDefinitionBuilder {
            index,
            entities,
            exclusions,
            options,
        }
    }

    pub fn build(&self) -> TypeDefinitions {
        let mut work = WorkList::default();
        let mut definitions = TypeDefinitions::default();

        for entity in self.entities.names() {
            work.enqueue(entity);
        }

        while let Some(name) = work.pop() {
            let Some(ty) = self.index.get(&name) else {
                if self.entities.contains(&name) {
                    tracing::warn!(entity = %name, "The configured entity type is missing from the schema, skipping it");
                }
                continue;
            };

            match ty.kind {
                TypeKind::Object | TypeKind::Interface => {
                    definitions.push(TypeDefinition::Object(self.object_definition(ty, &mut work)))
                }
                TypeKind::Union => definitions.push(TypeDefinition::Union(self.union_definition(ty, &mut work))),
                other => tracing::debug!(type_name = %name, kind = ?other, "No local definition for this kind"),
            }
        }

        tracing::debug!(definitions = definitions.len(), "Built local type definitions");

        definitions
    }

    fn local_name(&self, remote_name: &str) -> String {
        format!("{}{remote_name}", self.options.prefix)
    }

    fn object_definition(&self, ty: &TypeDescriptor, work: &mut WorkList) -> ObjectDefinition {
        let is_entity = self.entities.contains(&ty.name);

        let mut fields: Vec<FieldDefinition> = self
            .exclusions
            .retained_fields(ty)
            .filter_map(|field| self.field_definition(ty, field, work))
            .collect();

        if ty.name == UPLOAD_FILE {
            fields.push(FieldDefinition::resolved(
                "file",
                FILE_TYPE,
                FieldResolver::File {
                    key: String::from("file"),
                },
            ));
        }

        for tracked in self.options.inline_images.get(&ty.name).into_iter().flatten() {
            if ty.field(tracked).is_none() {
                tracing::warn!(type_name = %ty.name, field = %tracked, "Inline images are configured for a missing field");
                continue;
            }

            let key = format!("{tracked}_images");
            fields.push(FieldDefinition::resolved(
                key.clone(),
                format!("[{FILE_TYPE}]"),
                FieldResolver::Files { key },
            ));

            if self.options.parse_documents {
                fields.push(FieldDefinition::plain(format!("{tracked}_document"), "JSON"));
            }
        }

        ObjectDefinition {
            name: self.local_name(&ty.name),
            remote_name: ty.name.clone(),
            interfaces: if is_entity {
                vec![String::from(NODE_INTERFACE)]
            } else {
                Vec::new()
            },
            fields,
        }
    }

    fn field_definition(
        &self,
        owner: &TypeDescriptor,
        field: &FieldDescriptor,
        work: &mut WorkList,
    ) -> Option<FieldDefinition> {
        let named = classifier::unwrap_to_named(&field.type_ref)?;

        if let Some(relation) = classifier::classify_relation(named.name) {
            if !self.entities.contains(relation.entity) {
                tracing::debug!(
                    type_name = %owner.name,
                    field = %field.name,
                    entity = relation.entity,
                    "Dropping a relation to an entity that is not sourced"
                );
                return None;
            }

            let target = self.local_name(relation.entity);
            let type_name = match relation.cardinality {
                Cardinality::One => target.clone(),
                Cardinality::Many => format!("[{target}]"),
            };

            return Some(FieldDefinition::resolved(
                field.name.clone(),
                type_name,
                FieldResolver::Relation {
                    key: field.name.clone(),
                    target,
                    cardinality: relation.cardinality,
                },
            ));
        }

        if matches!(named.kind, TypeKind::Object | TypeKind::Interface | TypeKind::Union) {
            if !self.index.contains(named.name) {
                tracing::warn!(
                    type_name = %owner.name,
                    field = %field.name,
                    missing = named.name,
                    "The field's type is missing from the schema, skipping the field"
                );
                return None;
            }

            work.enqueue(named.name);
        }

        render_local_type(&field.type_ref, &self.options.prefix)
            .map(|type_name| FieldDefinition::plain(field.name.clone(), type_name))
    }

    fn union_definition(&self, ty: &TypeDescriptor, work: &mut WorkList) -> UnionDefinition {
        let members = ty
            .possible_types
            .iter()
            .filter_map(|member| member.name.as_deref())
            .filter(|member| !self.exclusions.is_excluded(member) && self.index.contains(member))
            .map(|member| {
                work.enqueue(member);
                self.local_name(member)
            })
            .collect();

        UnionDefinition {
            name: self.local_name(&ty.name),
            remote_name: ty.name.clone(),
            members,
        }
    }
}
