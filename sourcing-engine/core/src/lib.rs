#![deny(rust_2018_idioms, unsafe_code)]

//! The sourcing engine core: configuration, orchestration of the synthesizers, and the
//! incremental sync driver that turns remote content into host records.
//!
//! The entry point is [SourcingEngine].

mod config;
mod engine;
mod error;
mod fields;
mod images;
mod manifest;
mod sync;

pub use config::{InlineImagesConfig, SourceConfig};
pub use engine::SourcingEngine;
pub use error::{CoreError, CoreResult, OperationError};
pub use fields::{ProcessingContext, UploadIndex, process_field_data};
pub use images::{ImageReference, ImageSyntax, extract_image_references, extract_image_urls, image_document};
pub use sync::{SyncDriver, SyncReport};
