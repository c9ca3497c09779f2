#![deny(rust_2018_idioms, unsafe_code)]

//! Synthesizes the GraphQL documents that fetch every configured entity.
//!
//! [SelectionBuilder] walks the introspected type graph from an entity type and produces the
//! selection set of its attributes. [build_operations] wraps those selections into one full and
//! one sync document per root field and locale.

mod locales;
mod operation;
mod selection;

pub use locales::{LocaleSetting, resolve_locales};
pub use operation::{
    Capabilities, DEFAULT_PAGE_SIZE, EPOCH_SENTINEL, Operation, OperationVariables, Pagination, PublicationState,
    build_operations,
};
pub use selection::{MAX_DEPTH, ROOT_DEPTH, Selection, SelectionBuilder, SelectionItem};
