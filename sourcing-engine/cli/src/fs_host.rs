//! A host keeping records as JSON files, for running the engine outside of a site generator.
//!
//! Layout under the output directory:
//!
//! - `nodes/<id>.json`: one [Record] per file, downloads included as `File` records.
//! - `files/<sha256 of url>[.ext]`: downloaded files.
//! - `.last-synced-at`: the sync cursor, RFC 3339.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::json;
use sha2::{Digest, Sha256};
use sourcing_connector::{
    ConnectorError, ConnectorResult, CursorStore, FileMaterializer, FileRecord, Headers, NodeId, NodeLookup,
    NodeStore, OwnedNode, Record, Reporter, SourceHost, TracingReporter,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::Mutex};

const NODES_DIR: &str = "nodes";
const FILES_DIR: &str = "files";
const CURSOR_FILE: &str = ".last-synced-at";
const FILE_TYPE: &str = "File";

/// Builds the host for an output directory, loading the records of earlier runs.
pub(crate) async fn open(root: &Path, reporter: Arc<dyn Reporter>) -> ConnectorResult<SourceHost> {
    let nodes = Arc::new(FsNodeStore::open(root).await?);

    Ok(SourceHost {
        files: Arc::new(FsFiles::open(root, nodes.clone()).await?),
        nodes,
        cursor: Arc::new(FsCursor::new(root)),
        reporter,
    })
}

pub(crate) async fn open_default(root: &Path) -> ConnectorResult<SourceHost> {
    open(root, Arc::new(TracingReporter)).await
}

pub(crate) struct FsNodeStore {
    dir: PathBuf,
    records: Mutex<IndexMap<NodeId, Record>>,
}

impl FsNodeStore {
    pub(crate) async fn open(root: &Path) -> ConnectorResult<Self> {
        let dir = root.join(NODES_DIR);
        fs::create_dir_all(&dir).await?;

        let mut records = IndexMap::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let record: Record = serde_json::from_slice(&fs::read(&path).await?)?;
            records.insert(record.id.clone(), record);
        }

        tracing::debug!(records = records.len(), dir = %dir.display(), "Loaded records");

        Ok(FsNodeStore {
            dir,
            records: Mutex::new(records),
        })
    }

    fn path(&self, id: &NodeId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait::async_trait]
impl NodeLookup for FsNodeStore {
    async fn get(&self, id: &NodeId, type_name: &str) -> ConnectorResult<Option<Record>> {
        let records = self.records.lock().await;
        Ok(records.get(id).filter(|record| record.type_name == type_name).cloned())
    }

    async fn get_many(&self, ids: &[NodeId], type_name: &str) -> ConnectorResult<Vec<Record>> {
        let records = self.records.lock().await;

        Ok(ids
            .iter()
            .filter_map(|id| records.get(id))
            .filter(|record| record.type_name == type_name)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl NodeStore for FsNodeStore {
    async fn create_or_update(&self, record: Record) -> ConnectorResult<()> {
        let mut records = self.records.lock().await;

        let unchanged = records
            .get(&record.id)
            .is_some_and(|existing| existing.content_digest == record.content_digest);

        if unchanged {
            return Ok(());
        }

        fs::write(self.path(&record.id), serde_json::to_vec_pretty(&record)?).await?;
        records.insert(record.id.clone(), record);

        Ok(())
    }

    async fn touch(&self, id: &NodeId) -> ConnectorResult<()> {
        if !self.records.lock().await.contains_key(id) {
            tracing::debug!(node = %id, "Touched a record that does not exist");
        }

        Ok(())
    }

    async fn delete(&self, id: &NodeId) -> ConnectorResult<()> {
        if self.records.lock().await.shift_remove(id).is_some() {
            fs::remove_file(self.path(id)).await?;
        }

        Ok(())
    }

    /// Every record but the `File` ones, which belong to the downloads.
    async fn owned_nodes(&self) -> ConnectorResult<Vec<OwnedNode>> {
        let records = self.records.lock().await;

        Ok(records
            .values()
            .filter(|record| record.type_name != FILE_TYPE)
            .map(|record| OwnedNode {
                id: record.id.clone(),
                type_name: record.type_name.clone(),
            })
            .collect())
    }
}

/// Downloads files next to the records and registers a `File` record for each. A file
/// already on disk is not downloaded again.
pub(crate) struct FsFiles {
    dir: PathBuf,
    http: reqwest::Client,
    nodes: Arc<FsNodeStore>,
}

impl FsFiles {
    pub(crate) async fn open(root: &Path, nodes: Arc<FsNodeStore>) -> ConnectorResult<Self> {
        let dir = root.join(FILES_DIR);
        fs::create_dir_all(&dir).await?;

        Ok(FsFiles {
            dir,
            http: reqwest::Client::new(),
            nodes,
        })
    }

    async fn register(&self, url: &str, path: &Path, parent: &NodeId) -> ConnectorResult<FileRecord> {
        let id = NodeId::derive(FILE_TYPE, url);
        let fields = json!({ "url": url, "localPath": path.display().to_string() });

        self.nodes
            .create_or_update(Record::new(id.clone(), FILE_TYPE, fields).with_parent(parent.clone()))
            .await?;

        Ok(FileRecord { id, url: url.to_owned() })
    }

    fn path(&self, url: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(url.as_bytes()));

        match file_extension(url) {
            Some(ext) => self.dir.join(format!("{name}.{ext}")),
            None => self.dir.join(name),
        }
    }
}

/// The extension of the last path segment, query and fragment ignored.
fn file_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;

    (!ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
}

#[async_trait::async_trait]
impl FileMaterializer for FsFiles {
    async fn materialize(&self, url: &str, parent: &NodeId, headers: &Headers) -> ConnectorResult<Option<FileRecord>> {
        let path = self.path(url);

        if fs::try_exists(&path).await? {
            return self.register(url, &path, parent).await.map(Some);
        }

        let mut request = self.http.get(url);

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|err| ConnectorError::transport(url, err))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::http(url, status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ConnectorError::transport(url, err))?;

        fs::write(&path, &bytes).await?;
        tracing::debug!(url, parent = %parent, path = %path.display(), "Downloaded file");

        self.register(url, &path, parent).await.map(Some)
    }
}

pub(crate) struct FsCursor {
    path: PathBuf,
}

impl FsCursor {
    pub(crate) fn new(root: &Path) -> Self {
        FsCursor {
            path: root.join(CURSOR_FILE),
        }
    }
}

#[async_trait::async_trait]
impl CursorStore for FsCursor {
    async fn last_synced_at(&self) -> ConnectorResult<Option<DateTime<Utc>>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;

        let at = DateTime::parse_from_rfc3339(content.trim())
            .map_err(|err| ConnectorError::decode(format!("Invalid sync cursor in {}: {err}", self.path.display())))?;

        Ok(Some(at.with_timezone(&Utc)))
    }

    async fn set_last_synced_at(&self, at: DateTime<Utc>) -> ConnectorResult<()> {
        fs::write(&self.path, at.to_rfc3339()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_setup::runtime::run_with_tokio;

    fn category(remote_id: &str, name: &str) -> Record {
        Record::new(
            NodeId::derive("StrapiCategory", remote_id),
            "StrapiCategory",
            json!({ "name": name }),
        )
        .with_remote_id(remote_id)
    }

    #[test]
    fn records_survive_a_reopen() {
        run_with_tokio(async {
            let root = tempfile::tempdir().unwrap();

            let store = FsNodeStore::open(root.path()).await.unwrap();
            store.create_or_update(category("1", "News")).await.unwrap();
            store.create_or_update(category("2", "Sports")).await.unwrap();
            store.delete(&NodeId::derive("StrapiCategory", "2")).await.unwrap();

            let reopened = FsNodeStore::open(root.path()).await.unwrap();
            let owned = reopened.owned_nodes().await.unwrap();

            assert_eq!(
                owned,
                [OwnedNode {
                    id: NodeId::derive("StrapiCategory", "1"),
                    type_name: String::from("StrapiCategory"),
                }]
            );
            assert_eq!(
                reopened
                    .get(&NodeId::derive("StrapiCategory", "1"), "StrapiCategory")
                    .await
                    .unwrap(),
                Some(category("1", "News"))
            );
            assert_eq!(
                reopened
                    .get(&NodeId::derive("StrapiCategory", "1"), "StrapiArticle")
                    .await
                    .unwrap(),
                None
            );
        })
    }

    #[test]
    fn downloads_are_registered_as_file_records() {
        run_with_tokio(async {
            let root = tempfile::tempdir().unwrap();
            let url = "http://localhost:1337/uploads/cover.png";
            let parent = NodeId::derive("StrapiUploadFile", "10");

            let nodes = Arc::new(FsNodeStore::open(root.path()).await.unwrap());
            let files = FsFiles::open(root.path(), nodes.clone()).await.unwrap();
            std::fs::write(files.path(url), b"png").unwrap();

            let file = files.materialize(url, &parent, &Headers::new()).await.unwrap().unwrap();

            assert_eq!(file.id, NodeId::derive(FILE_TYPE, url));
            assert!(nodes.owned_nodes().await.unwrap().is_empty());

            let reopened = FsNodeStore::open(root.path()).await.unwrap();
            let record = reopened.get(&file.id, FILE_TYPE).await.unwrap().unwrap();

            assert_eq!(record.parent, Some(parent));
            assert_eq!(record.field("url"), Some(&json!(url)));
        })
    }

    #[test]
    fn the_cursor_round_trips() {
        run_with_tokio(async {
            let root = tempfile::tempdir().unwrap();
            let cursor = FsCursor::new(root.path());

            assert_eq!(cursor.last_synced_at().await.unwrap(), None);

            let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            cursor.set_last_synced_at(at).await.unwrap();

            assert_eq!(cursor.last_synced_at().await.unwrap(), Some(at));
        })
    }

    #[test]
    fn file_names_keep_the_extension() {
        assert_eq!(file_extension("http://localhost:1337/uploads/cat.png"), Some("png"));
        assert_eq!(file_extension("https://cdn.example.com/a/b.JPG?width=200#top"), Some("JPG"));
        assert_eq!(file_extension("https://cdn.example.com/download"), None);
    }
}
