use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sourcing_connector::{
    ConnectorError, ConnectorResult, CursorStore, FileMaterializer, FileRecord, Headers, NodeId, NodeLookup,
    NodeManifest, NodeStore, OperationFailure, OwnedNode, Record, Reporter, SourceHost,
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// How many writes reached the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutationCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl MutationCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

#[derive(Default)]
struct StoreState {
    records: IndexMap<NodeId, Record>,
    touched: HashSet<NodeId>,
    deleted: Vec<NodeId>,
    mutations: MutationCounts,
    manifests: Vec<NodeManifest>,
}

/// A [NodeStore] keeping records in memory. Writes with an unchanged content digest are
/// no-ops and are not counted.
#[derive(Default)]
pub struct InMemoryNodeStore {
    state: Mutex<StoreState>,
    supports_manifests: bool,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifests() -> Self {
        InMemoryNodeStore {
            supports_manifests: true,
            ..Default::default()
        }
    }

    /// Seed a record without counting a mutation.
    pub fn insert(&self, record: Record) {
        self.state.lock().unwrap().records.insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &NodeId) -> Option<Record> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    pub fn records_of(&self, type_name: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|record| record.type_name == type_name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mutations(&self) -> MutationCounts {
        self.state.lock().unwrap().mutations
    }

    /// Forget mutation counts, touches and deletions, keeping the records.
    pub fn reset_counters(&self) {
        let mut state = self.state.lock().unwrap();
        state.mutations = MutationCounts::default();
        state.touched.clear();
        state.deleted.clear();
    }

    pub fn touched(&self) -> HashSet<NodeId> {
        self.state.lock().unwrap().touched.clone()
    }

    /// Every delete call, in order, including repeated ones.
    pub fn deleted(&self) -> Vec<NodeId> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn manifests(&self) -> Vec<NodeManifest> {
        self.state.lock().unwrap().manifests.clone()
    }
}

#[async_trait::async_trait]
impl NodeLookup for InMemoryNodeStore {
    async fn get(&self, id: &NodeId, type_name: &str) -> ConnectorResult<Option<Record>> {
        Ok(self.record(id).filter(|record| record.type_name == type_name))
    }

    async fn get_many(&self, ids: &[NodeId], type_name: &str) -> ConnectorResult<Vec<Record>> {
        let state = self.state.lock().unwrap();

        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|record| record.type_name == type_name)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn create_or_update(&self, record: Record) -> ConnectorResult<()> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        match state.records.get(&record.id) {
            Some(existing) if existing.content_digest == record.content_digest => return Ok(()),
            Some(_) => state.mutations.updated += 1,
            None => state.mutations.created += 1,
        }

        state.records.insert(record.id.clone(), record);

        Ok(())
    }

    async fn touch(&self, id: &NodeId) -> ConnectorResult<()> {
        self.state.lock().unwrap().touched.insert(id.clone());
        Ok(())
    }

    async fn delete(&self, id: &NodeId) -> ConnectorResult<()> {
        let mut state = self.state.lock().unwrap();

        state.deleted.push(id.clone());

        if state.records.shift_remove(id).is_some() {
            state.mutations.deleted += 1;
        }

        Ok(())
    }

    async fn owned_nodes(&self) -> ConnectorResult<Vec<OwnedNode>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .values()
            .map(|record| OwnedNode {
                id: record.id.clone(),
                type_name: record.type_name.clone(),
            })
            .collect())
    }

    async fn create_manifest(&self, manifest: NodeManifest) -> ConnectorResult<bool> {
        if !self.supports_manifests {
            return Ok(false);
        }

        self.state.lock().unwrap().manifests.push(manifest);

        Ok(true)
    }
}

/// A [FileMaterializer] that downloads nothing. URLs containing `broken` fail.
#[derive(Default)]
pub struct InMemoryFiles {
    requested: Mutex<Vec<String>>,
}

impl InMemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// The URLs materialization was requested for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// The id a successfully materialized `url` gets.
    pub fn file_id(url: &str) -> NodeId {
        NodeId::derive("File", url)
    }
}

#[async_trait::async_trait]
impl FileMaterializer for InMemoryFiles {
    async fn materialize(&self, url: &str, _parent: &NodeId, _headers: &Headers) -> ConnectorResult<Option<FileRecord>> {
        self.requested.lock().unwrap().push(url.to_owned());

        if url.contains("broken") {
            return Err(ConnectorError::http(url, 404, "Not Found"));
        }

        Ok(Some(FileRecord {
            id: Self::file_id(url),
            url: url.to_owned(),
        }))
    }
}

#[derive(Default)]
pub struct InMemoryCursor {
    at: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryCursor {
    pub fn new(at: Option<DateTime<Utc>>) -> Self {
        InMemoryCursor { at: Mutex::new(at) }
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        *self.at.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl CursorStore for InMemoryCursor {
    async fn last_synced_at(&self) -> ConnectorResult<Option<DateTime<Utc>>> {
        Ok(self.get())
    }

    async fn set_last_synced_at(&self, at: DateTime<Utc>) -> ConnectorResult<()> {
        *self.at.lock().unwrap() = Some(at);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    failures: Mutex<Vec<OperationFailure>>,
}

impl RecordingReporter {
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn operation_failed(&self, failure: &OperationFailure) {
        self.failures.lock().unwrap().push(failure.clone());
    }
}

/// The in-memory collaborators, kept by concrete type so tests can inspect them.
#[derive(Clone, Default)]
pub struct TestHost {
    pub nodes: Arc<InMemoryNodeStore>,
    pub files: Arc<InMemoryFiles>,
    pub cursor: Arc<InMemoryCursor>,
    pub reporter: Arc<RecordingReporter>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: InMemoryNodeStore) -> Self {
        TestHost {
            nodes: Arc::new(nodes),
            ..Default::default()
        }
    }

    pub fn source_host(&self) -> SourceHost {
        SourceHost {
            nodes: self.nodes.clone(),
            files: self.files.clone(),
            cursor: self.cursor.clone(),
            reporter: self.reporter.clone(),
        }
    }
}
