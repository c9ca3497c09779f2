#![deny(rust_2018_idioms, unsafe_code)]

//! The type metadata index and field classifier.
//!
//! A remote schema is only known at run time, as the answer to an introspection query. This
//! crate turns that answer into a [`SchemaIndex`] keyed by type name, and provides the pure
//! classification rules both synthesizers walk it with: unwrapping `NON_NULL`/`LIST`
//! wrappers, recognizing relation-response conventions, mapping remote scalars to local ones,
//! and excluding types from field enumeration.

pub mod classifier;

mod entities;
mod index;
mod introspection_query;
mod types;

pub use entities::{EntitySet, UPLOAD_FILE, normalize_entity_name};
pub use index::{IndexError, IndexResult, SchemaIndex};
pub use introspection_query::INTROSPECTION_QUERY;
pub use types::{EnumValue, FieldDescriptor, InputValue, TypeDescriptor, TypeKind, TypeRef};
