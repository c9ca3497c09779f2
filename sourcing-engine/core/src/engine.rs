use crate::{
    config::SourceConfig,
    error::CoreResult,
    sync::{SyncDriver, SyncReport},
};
use query_builder::{Operation, build_operations, resolve_locales};
use schema_index::SchemaIndex;
use sourcing_connector::{SourceApi, SourceHost};
use std::sync::Arc;
use type_builder::{TypeDefinitionBuilder, TypeDefinitions};

/// Ties the configuration to a remote API: loads the schema, synthesizes the local types and
/// the operations, and runs the sync.
pub struct SourcingEngine {
    api: Arc<dyn SourceApi>,
    config: SourceConfig,
}

impl SourcingEngine {
    pub fn new(api: Arc<dyn SourceApi>, config: SourceConfig) -> Self {
        SourcingEngine { api, config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Fetches and indexes the remote schema. Failing to do so aborts the run.
    #[tracing::instrument(skip(self), fields(endpoint = self.api.endpoint()))]
    pub async fn load_schema(&self) -> CoreResult<SchemaIndex> {
        let introspection = self.api.fetch_introspection().await?;

        let index = SchemaIndex::from_introspection(introspection)?;
        tracing::debug!(types = index.len(), "Indexed the remote schema");

        Ok(index)
    }

    pub fn type_definitions(&self, index: &SchemaIndex) -> TypeDefinitions {
        let entities = self.config.entities();
        let exclusions = self.config.exclusions();
        let options = self.config.type_builder_options();

        TypeDefinitionBuilder::new(index, &entities, &exclusions, &options).build()
    }

    /// The operations of a run, one per root field and locale.
    #[tracing::instrument(skip_all)]
    pub async fn operations(&self, index: &SchemaIndex) -> Vec<Operation> {
        let available = match self.api.fetch_available_locales().await {
            Ok(locales) => locales,
            Err(err) => {
                tracing::warn!(error = %err, "Could not fetch the available locales, sourcing without locale filter");
                Vec::new()
            }
        };

        let locales: Vec<Option<String>> = if available.is_empty() {
            Vec::new()
        } else {
            resolve_locales(&self.config.locale, &available)
        };

        let operations = build_operations(index, &self.config.entities(), &locales, &self.config.exclusions());
        tracing::info!(operations = operations.len(), "Built the operations");

        operations
    }

    /// A full run: schema, operations, sync.
    #[tracing::instrument(skip_all)]
    pub async fn source_nodes(&self, host: &SourceHost) -> CoreResult<SyncReport> {
        let index = self.load_schema().await?;
        let operations = self.operations(&index).await;

        SyncDriver::new(self.api.as_ref(), host, &self.config)
            .run(&operations)
            .await
    }
}
