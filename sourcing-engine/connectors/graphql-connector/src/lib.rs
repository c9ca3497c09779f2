#![deny(rust_2018_idioms, unsafe_code, missing_docs)]

//! The [SourceApi](sourcing_connector::SourceApi) implementation talking to a Strapi-style
//! GraphQL endpoint over HTTP.

mod catalog;
mod client;
mod factory;

pub use client::{ClientOptions, GraphqlClient, LOCALES_QUERY};
pub use factory::ClientFactory;
