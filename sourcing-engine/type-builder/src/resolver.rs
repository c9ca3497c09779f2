use schema_index::classifier::Cardinality;
use serde_json::Value;
use sourcing_connector::{ConnectorResult, NodeId, NodeLookup, Record};

/// The host type downloaded files are registered as.
pub const FILE_TYPE: &str = "File";

/// How a field's value is found, for fields that are not read straight from the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldResolver {
    /// A relation, stored on the record as `{ "nodeId": .. }` or `{ "nodeIds": [..] }` under
    /// `key`.
    Relation {
        key: String,
        target: String,
        cardinality: Cardinality,
    },
    /// The downloaded file of a media record, stored as a file id under `key`.
    File { key: String },
    /// Files extracted from a rich text field, stored as a list of file ids under `key`.
    Files { key: String },
}

/// The outcome of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Null,
    Record(Record),
    Records(Vec<Record>),
}

impl FieldResolver {
    /// Looks up the records the field of `source` points to. A missing reference resolves to
    /// `Null` for single-valued fields and to an empty list otherwise.
    pub async fn resolve(&self, source: &Value, lookup: &dyn NodeLookup) -> ConnectorResult<Resolved> {
        match self {
            FieldResolver::Relation {
                key,
                target,
                cardinality: Cardinality::One,
            } => {
                let Some(id) = source[key.as_str()]["nodeId"].as_str() else {
                    return Ok(Resolved::Null);
                };

                Ok(lookup
                    .get(&NodeId::new(id), target)
                    .await?
                    .map_or(Resolved::Null, Resolved::Record))
            }
            FieldResolver::Relation {
                key,
                target,
                cardinality: Cardinality::Many,
            } => {
                let ids = node_ids(&source[key.as_str()]["nodeIds"]);
                Ok(Resolved::Records(lookup.get_many(&ids, target).await?))
            }
            FieldResolver::File { key } => {
                let Some(id) = source[key.as_str()].as_str() else {
                    return Ok(Resolved::Null);
                };

                Ok(lookup
                    .get(&NodeId::new(id), FILE_TYPE)
                    .await?
                    .map_or(Resolved::Null, Resolved::Record))
            }
            FieldResolver::Files { key } => {
                let ids = node_ids(&source[key.as_str()]);
                Ok(Resolved::Records(lookup.get_many(&ids, FILE_TYPE).await?))
            }
        }
    }
}

fn node_ids(value: &Value) -> Vec<NodeId> {
    value
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).map(NodeId::new).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sourcing_connector::NodeStore;
    use test_setup::{InMemoryNodeStore, runtime::run_with_tokio};

    fn category(remote_id: &str) -> Record {
        Record::new(
            NodeId::derive("StrapiCategory", remote_id),
            "StrapiCategory",
            json!({ "name": remote_id }),
        )
    }

    #[test]
    fn relations_resolve_through_the_lookup() {
        run_with_tokio(async {
            let store = InMemoryNodeStore::new();
            store.create_or_update(category("1")).await.unwrap();
            store.create_or_update(category("2")).await.unwrap();

            let one = FieldResolver::Relation {
                key: String::from("category"),
                target: String::from("StrapiCategory"),
                cardinality: Cardinality::One,
            };
            let many = FieldResolver::Relation {
                key: String::from("categories"),
                target: String::from("StrapiCategory"),
                cardinality: Cardinality::Many,
            };

            let source = json!({
                "category": { "nodeId": NodeId::derive("StrapiCategory", "2") },
                "categories": {
                    "nodeIds": [
                        NodeId::derive("StrapiCategory", "2"),
                        NodeId::derive("StrapiCategory", "404"),
                        NodeId::derive("StrapiCategory", "1"),
                    ]
                },
            });

            assert_eq!(one.resolve(&source, &store).await.unwrap(), Resolved::Record(category("2")));
            assert_eq!(
                many.resolve(&source, &store).await.unwrap(),
                Resolved::Records(vec![category("2"), category("1")])
            );
        })
    }

    #[test]
    fn missing_references_resolve_to_empty_values() {
        run_with_tokio(async {
            let store = InMemoryNodeStore::new();
            let source = json!({ "category": null });

            let one = FieldResolver::Relation {
                key: String::from("category"),
                target: String::from("StrapiCategory"),
                cardinality: Cardinality::One,
            };
            let files = FieldResolver::Files {
                key: String::from("body_images"),
            };

            assert_eq!(one.resolve(&source, &store).await.unwrap(), Resolved::Null);
            assert_eq!(files.resolve(&source, &store).await.unwrap(), Resolved::Records(Vec::new()));
        })
    }
}
