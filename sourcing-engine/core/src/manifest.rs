use sourcing_connector::{ContentTypeCatalog, NodeManifest, NodeStore, Record};
use std::sync::atomic::{AtomicBool, Ordering};

/// Records node manifests for previewed content. Disabled outside of preview mode.
pub(crate) struct ManifestWriter {
    catalog: Option<ContentTypeCatalog>,
    warned_unsupported: AtomicBool,
}

impl ManifestWriter {
    pub(crate) fn disabled() -> Self {
        ManifestWriter {
            catalog: None,
            warned_unsupported: AtomicBool::new(false),
        }
    }

    pub(crate) fn new(catalog: ContentTypeCatalog) -> Self {
        ManifestWriter {
            catalog: Some(catalog),
            warned_unsupported: AtomicBool::new(false),
        }
    }

    /// Records the manifest of `record`, when its entity has a content-type uid and the
    /// record carries `updatedAt`.
    pub(crate) async fn record(&self, nodes: &dyn NodeStore, entity: &str, remote_id: &str, record: &Record) {
        let Some(catalog) = &self.catalog else {
            return;
        };

        let Some(uid) = catalog.get(entity) else {
            return;
        };

        let Some(updated_at) = record.field("updatedAt").and_then(|value| value.as_str()) else {
            return;
        };

        let manifest = NodeManifest::new(uid, remote_id, updated_at, record.id.clone());

        match nodes.create_manifest(manifest).await {
            Ok(true) => (),
            Ok(false) => {
                if !self.warned_unsupported.swap(true, Ordering::Relaxed) {
                    tracing::warn!("The host does not support node manifests, content previews will not be linked");
                }
            }
            Err(err) => tracing::warn!(node = %record.id, error = %err, "Could not record the node manifest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sourcing_connector::NodeId;
    use test_setup::{InMemoryNodeStore, runtime::run_with_tokio};

    fn article() -> Record {
        Record::new(
            NodeId::derive("StrapiArticle", "1"),
            "StrapiArticle",
            json!({ "title": "Hello", "updatedAt": "2024-03-01T10:00:00.000Z" }),
        )
    }

    fn catalog() -> ContentTypeCatalog {
        let mut catalog = ContentTypeCatalog::new();
        catalog.insert(String::from("Article"), String::from("api::article.article"));
        catalog
    }

    #[test]
    fn manifests_are_recorded_for_catalogued_entities() {
        run_with_tokio(async {
            let nodes = InMemoryNodeStore::with_manifests();
            let writer = ManifestWriter::new(catalog());

            writer.record(&nodes, "Article", "1", &article()).await;
            writer.record(&nodes, "Category", "1", &article()).await;

            let manifests = nodes.manifests();
            assert_eq!(manifests.len(), 1);
            assert_eq!(
                manifests[0].manifest_id,
                "api::article.article-1-2024-03-01T10:00:00.000Z"
            );
        })
    }

    #[test]
    fn nothing_is_recorded_when_disabled_or_unsupported() {
        run_with_tokio(async {
            let unsupported = InMemoryNodeStore::new();
            let writer = ManifestWriter::new(catalog());
            writer.record(&unsupported, "Article", "1", &article()).await;
            writer.record(&unsupported, "Article", "1", &article()).await;
            assert!(unsupported.manifests().is_empty());

            let supported = InMemoryNodeStore::with_manifests();
            ManifestWriter::disabled()
                .record(&supported, "Article", "1", &article())
                .await;
            assert!(supported.manifests().is_empty());
        })
    }
}
