//! Pure classification of type references, shared by the query and type synthesizers so that
//! both agree on what a field is.

use crate::types::{FieldDescriptor, TypeDescriptor, TypeKind, TypeRef};
use std::collections::BTreeSet;

/// How many wrappers the introspection query unwraps at most.
pub const MAX_WRAPPER_DEPTH: usize = 7;

/// The object type every polymorphic "morph" relation points to. It references every entity at
/// once, so it is never walked.
pub const GENERIC_MORPH: &str = "GenericMorph";

const ENTITY_SUFFIX: &str = "Entity";

/// The innermost named type behind a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedType<'a> {
    pub kind: TypeKind,
    pub name: &'a str,
    /// A `LIST` wrapper was crossed on the way.
    pub is_list: bool,
    /// The outermost wrapper is `NON_NULL`.
    pub is_required: bool,
}

/// Strips `NON_NULL` and `LIST` wrappers. Returns `None` for malformed references: a wrapper
/// without `ofType`, a named kind without a name, or more wrappers than introspection unwraps.
pub fn unwrap_to_named(type_ref: &TypeRef) -> Option<NamedType<'_>> {
    let is_required = type_ref.kind == TypeKind::NonNull;
    let mut is_list = false;
    let mut current = type_ref;

    for _ in 0..=MAX_WRAPPER_DEPTH {
        if !current.kind.is_wrapper() {
            return current.name.as_deref().map(|name| NamedType {
                kind: current.kind,
                name,
                is_list,
                is_required,
            });
        }

        is_list |= current.kind == TypeKind::List;
        current = current.of_type.as_deref()?;
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A field type following one of the relation-response naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation<'a> {
    pub entity: &'a str,
    pub cardinality: Cardinality,
}

const RELATION_SUFFIXES: &[(&str, Cardinality)] = &[
    ("EntityResponseCollection", Cardinality::Many),
    ("RelationResponseCollection", Cardinality::Many),
    ("EntityResponse", Cardinality::One),
];

/// Recognizes `<Entity>EntityResponse`, `<Entity>EntityResponseCollection` and
/// `<Entity>RelationResponseCollection`, returning the bare entity name.
pub fn classify_relation(type_name: &str) -> Option<Relation<'_>> {
    RELATION_SUFFIXES.iter().find_map(|(suffix, cardinality)| {
        type_name
            .strip_suffix(suffix)
            .filter(|entity| !entity.is_empty())
            .map(|entity| Relation {
                entity,
                cardinality: *cardinality,
            })
    })
}

/// Like [`classify_relation`], restricted to the shapes root query fields return: a collection
/// (`<Entity>EntityResponseCollection`) or a singleton (`<Entity>EntityResponse`).
pub fn classify_root_response(type_name: &str) -> Option<Relation<'_>> {
    classify_relation(type_name).filter(|_| !type_name.ends_with("RelationResponseCollection"))
}

/// `<X>Entity` objects wrap an entity's identifier and attributes. Selecting them beyond their
/// identifier would walk into the entity graph.
pub fn is_entity_object(type_name: &str) -> bool {
    type_name.len() > ENTITY_SUFFIX.len() && type_name.ends_with(ENTITY_SUFFIX)
}

/// Maps a remote scalar name to the local scalar it is stored as.
pub fn map_scalar(name: &str) -> &str {
    match name {
        "DateTime" | "Date" | "Time" => "Date",
        "Long" => "Float",
        other => other,
    }
}

/// The local scalar a leaf field is stored as. Enum values are stored as strings.
pub fn local_leaf_type<'a>(named: &NamedType<'a>) -> &'a str {
    match named.kind {
        TypeKind::Enum => "String",
        _ => map_scalar(named.name),
    }
}

/// Type names dropped from every field enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionFilter {
    excluded: BTreeSet<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new([GENERIC_MORPH])
    }
}

impl ExclusionFilter {
    pub fn new<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExclusionFilter {
            excluded: type_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.excluded.contains(type_name)
    }

    pub fn retains(&self, field: &FieldDescriptor) -> bool {
        unwrap_to_named(&field.type_ref).is_none_or(|named| !self.is_excluded(named.name))
    }

    /// The fields of `ty` whose type is not excluded, in declaration order.
    pub fn retained_fields<'a>(&'a self, ty: &'a TypeDescriptor) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        ty.fields.iter().filter(move |field| self.retains(field))
    }
}
