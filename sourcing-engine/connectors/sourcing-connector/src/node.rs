use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

const NODE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x2f, 0x1c, 0x0e, 0x84, 0x51, 0x4d, 0x3a, 0x9e, 0x57, 0x3c, 0x12, 0xa4, 0x0b, 0x77, 0xd9,
]);

/// The host-side identifier of a materialized record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an identifier issued elsewhere.
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// The stable identifier of the record `remote_id` of `type_name`. The same inputs always
    /// give the same id, across runs and processes.
    pub fn derive(type_name: &str, remote_id: &str) -> Self {
        let name = format!("{type_name}-{remote_id}");
        NodeId(Uuid::new_v5(&NODE_NAMESPACE, name.as_bytes()).to_string())
    }

    /// The identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record as handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// The host-side id.
    pub id: NodeId,
    /// The local type name, prefix included.
    pub type_name: String,
    /// The id on the remote side, when the record mirrors a remote entity.
    pub remote_id: Option<String>,
    /// The record this one belongs to, e.g. the entity a file was downloaded for.
    pub parent: Option<NodeId>,
    /// The processed attributes.
    pub fields: Value,
    /// A digest of `fields`. Hosts may skip writes whose digest did not change.
    pub content_digest: String,
}

impl Record {
    /// A record with its digest computed from `fields`.
    pub fn new(id: NodeId, type_name: impl Into<String>, fields: Value) -> Self {
        Record {
            id,
            type_name: type_name.into(),
            remote_id: None,
            parent: None,
            content_digest: content_digest(&fields),
            fields,
        }
    }

    /// Set the remote id.
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// A top-level attribute.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Hex-encoded SHA-256 of the JSON serialization of `value`.
pub fn content_digest(value: &Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// A record the host holds on behalf of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNode {
    /// The host-side id.
    pub id: NodeId,
    /// The local type name, prefix included.
    pub type_name: String,
}

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// The host-side id of the file record.
    pub id: NodeId,
    /// The absolute URL it was downloaded from.
    pub url: String,
}

/// Content-source bookkeeping tying a record to the remote revision it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeManifest {
    /// `{uid}-{remoteId}-{updatedAt}`.
    pub manifest_id: String,
    /// The record the manifest describes.
    pub node_id: NodeId,
    /// The remote revision timestamp.
    pub updated_at: String,
}

impl NodeManifest {
    /// The manifest for `node_id`, built from the content-type uid and the remote revision.
    pub fn new(uid: &str, remote_id: &str, updated_at: &str, node_id: NodeId) -> Self {
        NodeManifest {
            manifest_id: format!("{uid}-{remote_id}-{updated_at}"),
            node_id,
            updated_at: updated_at.to_owned(),
        }
    }
}
