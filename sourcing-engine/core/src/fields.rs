use crate::images;
use futures::{
    FutureExt,
    future::{BoxFuture, join_all},
};
use indexmap::IndexMap;
use schema_index::{
    UPLOAD_FILE,
    classifier::{self, Cardinality, Relation},
};
use serde_json::{Map, Value, json};
use sourcing_connector::{FileMaterializer, FileRecord, Headers, NodeId};
use std::{collections::HashMap, sync::Mutex};

/// Media URLs already materialized during the run, mapped to their file record ids. Filled
/// while the media entity is sourced, read when other entities reference the same files.
#[derive(Debug, Default)]
pub struct UploadIndex {
    files: Mutex<HashMap<String, NodeId>>,
}

impl UploadIndex {
    pub fn get(&self, url: &str) -> Option<NodeId> {
        self.files.lock().ok()?.get(url).cloned()
    }

    pub fn insert(&self, url: &str, id: NodeId) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(url.to_owned(), id);
        }
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What processing the fields of one record needs.
pub struct ProcessingContext<'a> {
    /// Relative file URLs are resolved against it.
    pub api_base: &'a str,
    /// Sent with file downloads.
    pub headers: &'a Headers,
    /// The local type prefix, for relation targets.
    pub prefix: &'a str,
    /// The record being built. Downloaded files belong to it.
    pub parent: &'a NodeId,
    pub files: &'a dyn FileMaterializer,
    pub uploads: &'a UploadIndex,
    /// Tracked rich text fields by remote type name.
    pub inline_images: &'a IndexMap<String, Vec<String>>,
    pub parse_documents: bool,
}

/// Turns the attributes of a fetched item into record fields.
///
/// - Media objects get their file downloaded, its id stored under `file`.
/// - Tracked rich text fields get the ids of their images under `<field>_images`, and the
///   image document under `<field>_document` when enabled.
/// - Relation wrappers become `{ "nodeId": .. }`, `{ "nodeIds": [..] }` or `null`.
/// - Other typed objects and arrays are processed recursively. Everything else is kept as is.
pub fn process_field_data<'a>(value: &'a Value, ctx: &'a ProcessingContext<'a>) -> BoxFuture<'a, Value> {
    async move {
        match value {
            Value::Object(map) => Value::Object(process_object(map, ctx).await),
            Value::Array(items) => Value::Array(join_all(items.iter().map(|item| process_field_data(item, ctx))).await),
            other => other.clone(),
        }
    }
    .boxed()
}

async fn process_object(map: &Map<String, Value>, ctx: &ProcessingContext<'_>) -> Map<String, Value> {
    let typename = map.get("__typename").and_then(Value::as_str);
    let mut output = map.clone();

    if typename == Some(UPLOAD_FILE) {
        if let Some(url) = map.get("url").and_then(Value::as_str) {
            let url = absolute_file_url(url, ctx.api_base);

            if let Some(file) = materialize(&url, ctx).await {
                ctx.uploads.insert(&url, file.id.clone());
                output.insert(String::from("file"), json!(file.id));
            }
        }
    }

    let tracked = typename.and_then(|typename| ctx.inline_images.get(typename));

    for field in tracked.into_iter().flatten() {
        let Some(text) = map.get(field).and_then(Value::as_str) else {
            continue;
        };

        let urls = images::extract_image_urls(text, ctx.api_base);
        let ids: Vec<Value> = join_all(urls.iter().map(|url| inline_image(url, ctx)))
            .await
            .into_iter()
            .flatten()
            .map(|id| json!(id))
            .collect();

        output.insert(format!("{field}_images"), Value::Array(ids));

        if ctx.parse_documents {
            output.insert(format!("{field}_document"), images::image_document(text, ctx.api_base));
        }
    }

    for (key, value) in map {
        let processed = match value {
            Value::Object(inner) => {
                let Some(inner_typename) = inner.get("__typename").and_then(Value::as_str) else {
                    continue;
                };

                match classifier::classify_relation(inner_typename) {
                    Some(relation) if inner.contains_key("data") => relation_reference(relation, &inner["data"], ctx),
                    _ => process_field_data(value, ctx).await,
                }
            }
            Value::Array(_) => process_field_data(value, ctx).await,
            _ => continue,
        };

        output.insert(key.clone(), processed);
    }

    output
}

fn relation_reference(relation: Relation<'_>, data: &Value, ctx: &ProcessingContext<'_>) -> Value {
    let target = format!("{}{}", ctx.prefix, relation.entity);

    match (relation.cardinality, data) {
        (_, Value::Array(items)) => {
            let ids: Vec<NodeId> = items
                .iter()
                .filter_map(|item| remote_id(&item["id"]))
                .map(|id| NodeId::derive(&target, &id))
                .collect();

            json!({ "nodeIds": ids })
        }
        (Cardinality::Many, Value::Null) => json!({ "nodeIds": [] }),
        (_, item) => match remote_id(&item["id"]) {
            Some(id) => json!({ "nodeId": NodeId::derive(&target, &id) }),
            None => Value::Null,
        },
    }
}

/// Remote ids come as strings or numbers.
pub(crate) fn remote_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn absolute_file_url(url: &str, api_base: &str) -> String {
    if url.starts_with('/') && !url.starts_with("//") {
        format!("{api_base}{url}")
    } else {
        url.to_owned()
    }
}

async fn inline_image(url: &str, ctx: &ProcessingContext<'_>) -> Option<NodeId> {
    if let Some(id) = ctx.uploads.get(url) {
        return Some(id);
    }

    materialize(url, ctx).await.map(|file| file.id)
}

async fn materialize(url: &str, ctx: &ProcessingContext<'_>) -> Option<FileRecord> {
    match ctx.files.materialize(url, ctx.parent, ctx.headers).await {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(url, parent = %ctx.parent, error = %err, "Could not download the file, skipping it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_setup::{InMemoryFiles, runtime::run_with_tokio};

    const API: &str = "http://localhost:1337";

    fn context<'a>(
        parent: &'a NodeId,
        files: &'a InMemoryFiles,
        uploads: &'a UploadIndex,
        inline_images: &'a IndexMap<String, Vec<String>>,
        headers: &'a Headers,
    ) -> ProcessingContext<'a> {
        ProcessingContext {
            api_base: API,
            headers,
            prefix: "Strapi",
            parent,
            files,
            uploads,
            inline_images,
            parse_documents: false,
        }
    }

    #[test]
    fn relation_wrappers_become_node_references() {
        run_with_tokio(async {
            let parent = NodeId::derive("StrapiArticle", "1");
            let files = InMemoryFiles::new();
            let uploads = UploadIndex::default();
            let inline_images = IndexMap::new();
            let headers = Headers::new();
            let ctx = context(&parent, &files, &uploads, &inline_images, &headers);

            let attributes = json!({
                "__typename": "Article",
                "title": "Hello",
                "categories": {
                    "__typename": "CategoryRelationResponseCollection",
                    "data": [{ "id": "3" }, { "id": 4 }],
                },
                "author": {
                    "__typename": "WriterEntityResponse",
                    "data": { "id": "7" },
                },
                "editor": {
                    "__typename": "WriterEntityResponse",
                    "data": null,
                },
                "formats": { "thumbnail": { "url": "/t.png" } },
            });

            let fields = process_field_data(&attributes, &ctx).await;

            assert_eq!(
                fields,
                json!({
                    "__typename": "Article",
                    "title": "Hello",
                    "categories": {
                        "nodeIds": [NodeId::derive("StrapiCategory", "3"), NodeId::derive("StrapiCategory", "4")],
                    },
                    "author": { "nodeId": NodeId::derive("StrapiWriter", "7") },
                    "editor": null,
                    "formats": { "thumbnail": { "url": "/t.png" } },
                })
            );
            assert!(files.requested().is_empty());
        })
    }

    #[test]
    fn media_objects_are_materialized() {
        run_with_tokio(async {
            let parent = NodeId::derive("StrapiUploadFile", "1");
            let files = InMemoryFiles::new();
            let uploads = UploadIndex::default();
            let inline_images = IndexMap::new();
            let headers = Headers::new();
            let ctx = context(&parent, &files, &uploads, &inline_images, &headers);

            let attributes = json!({ "__typename": "UploadFile", "url": "/uploads/cat.png", "name": "cat.png" });

            let fields = process_field_data(&attributes, &ctx).await;
            let url = "http://localhost:1337/uploads/cat.png";

            assert_eq!(fields["file"], json!(InMemoryFiles::file_id(url)));
            assert_eq!(uploads.get(url), Some(InMemoryFiles::file_id(url)));
            assert_eq!(files.requested(), [url]);
        })
    }

    #[test]
    fn inline_images_reuse_known_uploads_and_skip_failures() {
        run_with_tokio(async {
            let parent = NodeId::derive("StrapiArticle", "1");
            let files = InMemoryFiles::new();
            let uploads = UploadIndex::default();
            let known = NodeId::derive("File", "known");
            uploads.insert("http://localhost:1337/uploads/known.png", known.clone());

            let mut inline_images = IndexMap::new();
            inline_images.insert(String::from("Article"), vec![String::from("body")]);
            let headers = Headers::new();
            let ctx = context(&parent, &files, &uploads, &inline_images, &headers);

            let attributes = json!({
                "__typename": "Article",
                "body": "![a](/uploads/known.png) ![b](https://cdn.example.com/broken.png)\n\n<img src=\"https://cdn.example.com/new.png\">\n",
            });

            let fields = process_field_data(&attributes, &ctx).await;

            assert_eq!(
                fields["body_images"],
                json!([known, InMemoryFiles::file_id("https://cdn.example.com/new.png")])
            );
            assert_eq!(
                files.requested(),
                ["https://cdn.example.com/broken.png", "https://cdn.example.com/new.png"]
            );
            assert!(fields.get("body_document").is_none());
        })
    }

    #[test]
    fn nested_components_and_zones_are_processed() {
        run_with_tokio(async {
            let parent = NodeId::derive("StrapiArticle", "1");
            let files = InMemoryFiles::new();
            let uploads = UploadIndex::default();
            let inline_images = IndexMap::new();
            let headers = Headers::new();
            let ctx = context(&parent, &files, &uploads, &inline_images, &headers);

            let attributes = json!({
                "__typename": "Article",
                "sections": [
                    {
                        "__typename": "ComponentSectionsHero",
                        "heading": "Hi",
                        "image": { "__typename": "UploadFileEntityResponse", "data": { "id": "9" } },
                    },
                ],
            });

            let fields = process_field_data(&attributes, &ctx).await;

            assert_eq!(
                fields["sections"][0]["image"],
                json!({ "nodeId": NodeId::derive("StrapiUploadFile", "9") })
            );
            assert_eq!(fields["sections"][0]["heading"], json!("Hi"));
        })
    }
}
