use crate::{ConnectorResult, FileRecord, Headers, NodeId, NodeManifest, OwnedNode, Record};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Read access to materialized records, used by field resolvers.
#[async_trait::async_trait]
pub trait NodeLookup: Send + Sync {
    /// The record with `id`, if it exists and has type `type_name`.
    async fn get(&self, id: &NodeId, type_name: &str) -> ConnectorResult<Option<Record>>;

    /// The records with `ids` and type `type_name`, in the order of `ids`. Missing ids are
    /// skipped.
    async fn get_many(&self, ids: &[NodeId], type_name: &str) -> ConnectorResult<Vec<Record>>;
}

/// The host-side record store.
#[async_trait::async_trait]
pub trait NodeStore: NodeLookup {
    /// Create the record, or replace it if it exists.
    async fn create_or_update(&self, record: Record) -> ConnectorResult<()>;

    /// Mark the record as still present, so that the host keeps it.
    async fn touch(&self, id: &NodeId) -> ConnectorResult<()>;

    /// Remove the record.
    async fn delete(&self, id: &NodeId) -> ConnectorResult<()>;

    /// Every record created by the engine, from this or earlier runs.
    async fn owned_nodes(&self) -> ConnectorResult<Vec<OwnedNode>>;

    /// Record a node manifest. Returns `false` when the host does not support manifests.
    async fn create_manifest(&self, manifest: NodeManifest) -> ConnectorResult<bool> {
        let _ = manifest;
        Ok(false)
    }
}

/// Downloads remote files and registers them as host records.
#[async_trait::async_trait]
pub trait FileMaterializer: Send + Sync {
    /// Download `url` for the record `parent`. `Ok(None)` means the host chose to skip the file.
    async fn materialize(&self, url: &str, parent: &NodeId, headers: &Headers) -> ConnectorResult<Option<FileRecord>>;
}

/// The persisted sync cursor.
#[async_trait::async_trait]
pub trait CursorStore: Send + Sync {
    /// When the last fully successful sync started, if any.
    async fn last_synced_at(&self) -> ConnectorResult<Option<DateTime<Utc>>>;

    /// Persist the cursor.
    async fn set_last_synced_at(&self, at: DateTime<Utc>) -> ConnectorResult<()>;
}

/// A failed remote operation, with everything needed to replay it by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    /// The operation name.
    pub operation_name: String,
    /// The GraphQL document that was sent.
    pub document: String,
    /// The variables that were sent.
    pub variables: Value,
    /// What went wrong.
    pub message: String,
}

impl OperationFailure {
    /// A multi-line rendering with the document and variables attached.
    pub fn render(&self) -> String {
        let variables = serde_json::to_string_pretty(&self.variables).unwrap_or_default();

        format!(
            "Operation {} failed: {}\n===== QUERY =====\n{}\n===== VARIABLES =====\n{variables}",
            self.operation_name, self.message, self.document
        )
    }
}

/// Where failed operations are reported.
pub trait Reporter: Send + Sync {
    /// Report one failure. Called once per error message.
    fn operation_failed(&self, failure: &OperationFailure);
}

/// Reports failures as error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn operation_failed(&self, failure: &OperationFailure) {
        tracing::error!(operation = %failure.operation_name, "{}", failure.render());
    }
}

/// Everything the engine needs from its host.
#[derive(Clone)]
pub struct SourceHost {
    /// The record store.
    pub nodes: Arc<dyn NodeStore>,
    /// The file downloader.
    pub files: Arc<dyn FileMaterializer>,
    /// The sync cursor.
    pub cursor: Arc<dyn CursorStore>,
    /// Error reporting.
    pub reporter: Arc<dyn Reporter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn failures_render_document_and_variables() {
        let failure = OperationFailure {
            operation_name: String::from("ArticleQuery"),
            document: String::from("query ArticleQuery { articles { data { id } } }"),
            variables: json!({ "locale": "en" }),
            message: String::from("Forbidden access"),
        };

        assert_eq!(
            failure.render(),
            "Operation ArticleQuery failed: Forbidden access\n===== QUERY =====\nquery ArticleQuery { articles { data { id } } }\n===== VARIABLES =====\n{\n  \"locale\": \"en\"\n}"
        );
    }
}
