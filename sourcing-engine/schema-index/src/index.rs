use crate::{
    classifier,
    types::{TypeDescriptor, TypeRef},
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

/// Failures to turn an introspection response into an index. Both are fatal for a run: nothing
/// can be synthesized without the schema.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("The introspection response does not contain a `__schema` object.")]
    MissingSchema,
    #[error("The introspection schema could not be read: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    #[serde(default)]
    query_type: Option<NamedType>,
    types: Vec<TypeDescriptor>,
}

#[derive(Debug, Deserialize)]
struct NamedType {
    name: String,
}

/// Lookup table of every named type of the remote schema, in introspection order.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    types: IndexMap<String, TypeDescriptor>,
    query_type: String,
}

impl SchemaIndex {
    /// Builds the index from an introspection response. Both the bare `{ "__schema": .. }`
    /// object and the `{ "data": { "__schema": .. } }` envelope are accepted.
    pub fn from_introspection(response: Value) -> IndexResult<Self> {
        let schema = match response {
            Value::Object(mut root) => match root.remove("data") {
                Some(Value::Object(mut data)) => data.remove("__schema"),
                _ => root.remove("__schema"),
            },
            _ => None,
        };

        let schema = schema.filter(|schema| !schema.is_null()).ok_or(IndexError::MissingSchema)?;
        let raw: RawSchema = serde_json::from_value(schema)?;

        let mut index = Self::from_types(raw.types);

        if let Some(query_type) = raw.query_type {
            index.query_type = query_type.name;
        }

        tracing::debug!(types = index.len(), query_type = %index.query_type, "Built schema index");

        Ok(index)
    }

    pub fn from_types(types: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        SchemaIndex {
            types: types.into_iter().map(|ty| (ty.name.clone(), ty)).collect(),
            query_type: String::from("Query"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// The root type queries start from.
    pub fn query_type(&self) -> Option<&TypeDescriptor> {
        self.get(&self.query_type)
    }

    /// Follows a type reference through its wrappers to the named type's descriptor.
    pub fn resolve(&self, type_ref: &TypeRef) -> Option<&TypeDescriptor> {
        classifier::unwrap_to_named(type_ref).and_then(|named| self.get(named.name))
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;
    use serde_json::json;

    #[test]
    fn missing_schema_is_reported() {
        let err = SchemaIndex::from_introspection(json!({ "data": { "__schema": null } })).unwrap_err();
        assert!(matches!(err, IndexError::MissingSchema));

        let err = SchemaIndex::from_introspection(json!({ "errors": [] })).unwrap_err();
        assert!(matches!(err, IndexError::MissingSchema));

        let err = SchemaIndex::from_introspection(json!("not an object")).unwrap_err();
        assert!(matches!(err, IndexError::MissingSchema));
    }

    #[test]
    fn malformed_schema_is_reported() {
        let err = SchemaIndex::from_introspection(json!({ "__schema": { "types": 3 } })).unwrap_err();
        assert!(matches!(err, IndexError::Malformed(_)));
    }

    #[test]
    fn bare_schema_objects_are_accepted() {
        let index = SchemaIndex::from_introspection(json!({
            "__schema": {
                "queryType": { "name": "RootQuery" },
                "types": [
                    { "kind": "OBJECT", "name": "RootQuery", "fields": [] },
                    { "kind": "SCALAR", "name": "String" },
                ]
            }
        }))
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.query_type().map(|ty| ty.kind), Some(TypeKind::Object));
        assert!(index.contains("String"));
    }
}
