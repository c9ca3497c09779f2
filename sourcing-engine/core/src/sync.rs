use crate::{
    config::SourceConfig,
    error::{CoreResult, OperationError},
    fields::{self, ProcessingContext, UploadIndex, remote_id},
    manifest::ManifestWriter,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use query_builder::{Operation, OperationVariables, PublicationState};
use schema_index::UPLOAD_FILE;
use serde_json::{Map, Value};
use sourcing_connector::{ConnectorError, NodeId, QueryRequest, QueryResponse, Record, SourceApi, SourceHost};
use std::{collections::HashSet, sync::Mutex};
use tracing_futures::Instrument;

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items returned by full-state queries.
    pub fetched: usize,
    /// Records kept alive by sync queries.
    pub touched: usize,
    pub deleted: usize,
    /// The operations that failed, by operation name.
    pub failed_operations: Vec<String>,
    /// Whether the cursor was moved to the start of this run.
    pub cursor_advanced: bool,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed_operations.is_empty()
    }
}

/// State shared by the operations of one run.
struct RunState {
    last_synced_at: Option<DateTime<Utc>>,
    uploads: UploadIndex,
    present: Mutex<HashSet<NodeId>>,
    manifests: ManifestWriter,
}

impl RunState {
    fn mark_present(&self, id: NodeId) {
        if let Ok(mut present) = self.present.lock() {
            present.insert(id);
        }
    }

    fn is_present(&self, id: &NodeId) -> bool {
        self.present.lock().map(|present| present.contains(id)).unwrap_or(false)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct OperationStats {
    fetched: usize,
    touched: usize,
}

type OperationOutcome<'o> = (&'o Operation, Result<OperationStats, OperationError>);

/// Runs operations against the remote API and reconciles the host's records with the result.
///
/// Media operations run first, so that other entities find their files in the upload index.
/// With a cursor from an earlier run, only changed items are fetched in full, sync queries
/// list the ids that still exist, and every owned record that was neither fetched nor listed
/// is deleted.
pub struct SyncDriver<'a> {
    api: &'a dyn SourceApi,
    host: &'a SourceHost,
    config: &'a SourceConfig,
    inline_images: IndexMap<String, Vec<String>>,
}

impl<'a> SyncDriver<'a> {
    pub fn new(api: &'a dyn SourceApi, host: &'a SourceHost, config: &'a SourceConfig) -> Self {
        SyncDriver {
            api,
            host,
            config,
            inline_images: config.inline_images(),
        }
    }

    #[tracing::instrument(skip_all, fields(operations = operations.len()))]
    pub async fn run(&self, operations: &[Operation]) -> CoreResult<SyncReport> {
        let started_at = Utc::now();

        let last_synced_at = if self.config.cache {
            self.host.cursor.last_synced_at().await?
        } else {
            None
        };

        match last_synced_at {
            Some(at) => tracing::info!(last_synced_at = %at, "Fetching changes since the last sync"),
            None => tracing::info!("No sync cursor, fetching everything"),
        }

        let state = RunState {
            last_synced_at,
            uploads: UploadIndex::default(),
            present: Mutex::new(HashSet::new()),
            manifests: self.manifest_writer().await,
        };

        let (uploads, others): (Vec<&Operation>, Vec<&Operation>) = operations
            .iter()
            .partition(|operation| operation.entity_type_name == UPLOAD_FILE);

        let mut outcomes = self.run_all(&uploads, &state).await;
        tracing::debug!(files = state.uploads.len(), "Media operations done");
        outcomes.extend(self.run_all(&others, &state).await);

        let mut report = SyncReport::default();
        let mut failed_types = HashSet::new();

        for (operation, outcome) in outcomes {
            match outcome {
                Ok(stats) => {
                    report.fetched += stats.fetched;
                    report.touched += stats.touched;
                }
                Err(err) => {
                    for failure in err.failures() {
                        self.host.reporter.operation_failed(&failure);
                    }

                    failed_types.insert(self.config.local_type_name(&operation.entity_type_name));
                    report.failed_operations.push(err.operation_name);
                }
            }
        }

        if last_synced_at.is_some() {
            report.deleted = self.delete_absent(&state, &failed_types).await?;
        }

        if !report.is_success() {
            tracing::warn!(
                failed = report.failed_operations.len(),
                "Some operations failed, the sync cursor is left unchanged"
            );
        } else if self.config.cache {
            self.host.cursor.set_last_synced_at(started_at).await?;
            report.cursor_advanced = true;
        }

        tracing::info!(
            fetched = report.fetched,
            touched = report.touched,
            deleted = report.deleted,
            "Sync finished"
        );

        Ok(report)
    }

    async fn manifest_writer(&self) -> ManifestWriter {
        if !self.config.preview {
            return ManifestWriter::disabled();
        }

        match self.api.fetch_content_type_catalog().await {
            Ok(catalog) => ManifestWriter::new(catalog),
            Err(err) => {
                tracing::warn!(error = %err, "Could not fetch the content type catalog, node manifests are disabled");
                ManifestWriter::disabled()
            }
        }
    }

    async fn run_all<'o>(&self, operations: &[&'o Operation], state: &RunState) -> Vec<OperationOutcome<'o>> {
        join_all(operations.iter().map(|operation| {
            let span = tracing::info_span!(
                "operation",
                name = %operation.operation_name,
                locale = operation.locale.as_deref().unwrap_or("-"),
            );

            async move { (*operation, self.run_operation(operation, state).await) }.instrument(span)
        }))
        .await
    }

    async fn run_operation(&self, operation: &Operation, state: &RunState) -> Result<OperationStats, OperationError> {
        let variables = self.live_variables(operation, state.last_synced_at);

        let (fetched, touched) = futures::try_join!(
            self.fetch_full_state(operation, &variables, state),
            self.fetch_sync_state(operation, &variables, state),
        )?;

        tracing::debug!(fetched, touched, "Operation done");

        Ok(OperationStats { fetched, touched })
    }

    fn live_variables(&self, operation: &Operation, last_synced_at: Option<DateTime<Utc>>) -> OperationVariables {
        let mut variables = operation.variables.clone().with_page_size(self.config.page_size);

        if self.config.preview {
            variables = variables.with_publication_state(PublicationState::Preview);
        }

        if let Some(at) = last_synced_at {
            variables = variables.with_updated_after(at.to_rfc3339_opts(SecondsFormat::Millis, true));
        }

        variables
    }

    /// Fetches the changed items and creates or updates their records.
    async fn fetch_full_state(
        &self,
        operation: &Operation,
        variables: &OperationVariables,
        state: &RunState,
    ) -> Result<usize, OperationError> {
        let name = &operation.operation_name;
        let document = &operation.full_query_document;
        let items = self.fetch_all(operation, name, document, variables).await?;
        let node_type = self.config.local_type_name(&operation.entity_type_name);

        let upserted = join_all(items.iter().map(|item| self.upsert(operation, &node_type, item, state)))
            .await
            .into_iter()
            .collect::<Result<Vec<bool>, ConnectorError>>()
            .map_err(|source| operation_error(name, document, variables, source))?;

        Ok(upserted.into_iter().filter(|created| *created).count())
    }

    /// Lists the ids that still exist and keeps their records alive. Only runs with a cursor.
    async fn fetch_sync_state(
        &self,
        operation: &Operation,
        variables: &OperationVariables,
        state: &RunState,
    ) -> Result<usize, OperationError> {
        if state.last_synced_at.is_none() {
            return Ok(0);
        }

        let name = operation.sync_operation_name();
        let document = &operation.sync_query_document;
        let variables = variables.for_sync();
        let items = self.fetch_all(operation, &name, document, &variables).await?;
        let node_type = self.config.local_type_name(&operation.entity_type_name);

        let mut touched = 0;

        for id in items.iter().filter_map(|item| remote_id(&item["id"])) {
            let node_id = NodeId::derive(&node_type, &id);

            self.host
                .nodes
                .touch(&node_id)
                .await
                .map_err(|source| operation_error(&name, document, &variables, source))?;

            state.mark_present(node_id);
            touched += 1;
        }

        Ok(touched)
    }

    /// Every item of the root field, following pagination on collections.
    async fn fetch_all(
        &self,
        operation: &Operation,
        name: &str,
        document: &str,
        variables: &OperationVariables,
    ) -> Result<Vec<Value>, OperationError> {
        let paginated = operation.is_collection && operation.capabilities.pagination;
        let mut items = Vec::new();
        let mut start = 0;

        loop {
            let page_variables = variables.clone().with_start(start);
            let data = self.execute(name, document, &page_variables).await?;
            let payload = &data[operation.root_field_name.as_str()];

            let page = match &payload["data"] {
                Value::Array(page) => page.clone(),
                Value::Null => Vec::new(),
                item => vec![item.clone()],
            };

            let page_len = page.len();
            items.extend(page);

            if !paginated || page_len == 0 {
                break;
            }

            start += self.config.page_size;

            match payload["meta"]["pagination"]["total"].as_i64() {
                Some(total) if start < total => tracing::debug!(start, total, "Fetching the next page"),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn execute(&self, name: &str, document: &str, variables: &OperationVariables) -> Result<Value, OperationError> {
        let request = QueryRequest::new(document)
            .with_operation_name(name)
            .with_variables(variables.to_json());

        self.api
            .execute(&request)
            .await
            .and_then(QueryResponse::into_data)
            .map_err(|source| operation_error(name, document, variables, source))
    }

    /// Builds the record of one fetched item. `false` when the item has no id.
    async fn upsert(
        &self,
        operation: &Operation,
        node_type: &str,
        item: &Value,
        state: &RunState,
    ) -> Result<bool, ConnectorError> {
        let Some(id) = remote_id(&item["id"]) else {
            tracing::warn!(root_field = %operation.root_field_name, "Skipping an item without id");
            return Ok(false);
        };

        let node_id = NodeId::derive(node_type, &id);

        let ctx = ProcessingContext {
            api_base: self.config.api_base(),
            headers: &self.config.headers,
            prefix: &self.config.type_prefix,
            parent: &node_id,
            files: self.host.files.as_ref(),
            uploads: &state.uploads,
            inline_images: &self.inline_images,
            parse_documents: self.config.inline_images.parse_documents,
        };

        let fields = match fields::process_field_data(&item["attributes"], &ctx).await {
            Value::Object(fields) => Value::Object(fields),
            _ => Value::Object(Map::new()),
        };

        let parent = parent_of(&fields);
        let mut record = Record::new(node_id.clone(), node_type, fields).with_remote_id(id.clone());

        if let Some(parent) = parent {
            record = record.with_parent(parent);
        }

        self.host.nodes.create_or_update(record.clone()).await?;
        state
            .manifests
            .record(self.host.nodes.as_ref(), &operation.entity_type_name, &id, &record)
            .await;
        state.mark_present(node_id);

        Ok(true)
    }

    /// Deletes the owned records that were neither fetched nor listed in this run. Records of
    /// types with a failed operation are kept.
    async fn delete_absent(&self, state: &RunState, failed_types: &HashSet<String>) -> CoreResult<usize> {
        let mut seen = HashSet::new();
        let mut deleted = 0;

        for node in self.host.nodes.owned_nodes().await? {
            if state.is_present(&node.id) || failed_types.contains(&node.type_name) || !seen.insert(node.id.clone()) {
                continue;
            }

            tracing::debug!(node = %node.id, type_name = %node.type_name, "Deleting a record gone from the remote side");
            self.host.nodes.delete(&node.id).await?;
            deleted += 1;
        }

        Ok(deleted)
    }
}

/// A `parent` relation of the item, once resolved to a node reference.
fn parent_of(fields: &Value) -> Option<NodeId> {
    fields["parent"]["nodeId"].as_str().map(NodeId::new)
}

fn operation_error(name: &str, document: &str, variables: &OperationVariables, source: ConnectorError) -> OperationError {
    OperationError {
        operation_name: name.to_owned(),
        document: document.to_owned(),
        variables: variables.to_json(),
        source,
    }
}
