#![deny(rust_2018_idioms, unsafe_code, missing_docs)]

//! The contracts between the sourcing engine core and its collaborators: the remote API it
//! reads the schema and content from, and the host that owns materialized records, downloaded
//! files, the sync cursor and error reporting. The entry points are [SourceApi] and
//! [SourceHost].

mod api;
mod error;
mod host;
mod node;

pub use api::{ContentTypeCatalog, GraphqlError, QueryRequest, QueryResponse, SourceApi};
pub use error::{ConnectorError, ConnectorResult, ErrorKind};
pub use host::{
    CursorStore, FileMaterializer, NodeLookup, NodeStore, OperationFailure, Reporter, SourceHost, TracingReporter,
};
pub use node::{FileRecord, NodeId, NodeManifest, OwnedNode, Record, content_digest};

/// Extra HTTP headers, by name.
pub type Headers = indexmap::IndexMap<String, String>;
