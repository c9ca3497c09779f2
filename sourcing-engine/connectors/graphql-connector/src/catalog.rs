use schema_index::{UPLOAD_FILE, normalize_entity_name};
use serde::Deserialize;
use serde_json::Value;
use sourcing_connector::ContentTypeCatalog;

const UPLOAD_FILE_UID: &str = "plugin::upload.file";

#[derive(Debug, Deserialize)]
struct ContentTypes {
    #[serde(default)]
    data: Vec<ContentType>,
}

#[derive(Debug, Deserialize)]
struct ContentType {
    uid: String,
    schema: ContentTypeSchema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeSchema {
    singular_name: String,
}

/// Maps the content-type builder listing to entity type names. Unreadable listings give an
/// empty catalog.
pub(crate) fn from_content_types(listing: &Value) -> ContentTypeCatalog {
    let content_types = match ContentTypes::deserialize(listing) {
        Ok(content_types) => content_types,
        Err(err) => {
            tracing::warn!(error = %err, "Unexpected content type listing");
            return ContentTypeCatalog::new();
        }
    };

    content_types
        .data
        .into_iter()
        .filter_map(|content_type| {
            let entity = if content_type.uid == UPLOAD_FILE_UID {
                String::from(UPLOAD_FILE)
            } else {
                normalize_entity_name(&content_type.schema.singular_name)?
            };

            Some((entity, content_type.uid))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn content_types_map_to_entity_names() {
        let listing = json!({
            "data": [
                { "uid": "api::article.article", "schema": { "singularName": "article", "kind": "collectionType" } },
                { "uid": "api::blog-post.blog-post", "schema": { "singularName": "blog-post" } },
                { "uid": "plugin::upload.file", "schema": { "singularName": "file" } },
            ]
        });

        let catalog = from_content_types(&listing);

        assert_eq!(
            catalog.into_iter().collect::<Vec<_>>(),
            [
                (String::from("Article"), String::from("api::article.article")),
                (String::from("BlogPost"), String::from("api::blog-post.blog-post")),
                (String::from("UploadFile"), String::from("plugin::upload.file")),
            ]
        );
    }

    #[test]
    fn unreadable_listings_give_an_empty_catalog() {
        assert!(from_content_types(&json!({ "data": "nope" })).is_empty());
    }
}
