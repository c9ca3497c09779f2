#![deny(rust_2018_idioms, unsafe_code)]

//! Local type definitions mirroring the remote content model.
//!
//! Definitions are plain data: the host registers them with whatever schema runtime it has,
//! and [FieldResolver] implements the lookups behind relation and file fields. The
//! [TypeDefinitions] `Display` implementation renders them as GraphQL SDL.

mod builder;
mod definition;
mod resolver;

pub use builder::{DEFAULT_TYPE_PREFIX, TypeBuilderOptions, TypeDefinitionBuilder, render_local_type};
pub use definition::{FieldDefinition, ObjectDefinition, TypeDefinition, TypeDefinitions, UnionDefinition};
pub use resolver::{FILE_TYPE, FieldResolver, Resolved};
