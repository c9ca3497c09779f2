use schema_index::IndexError;
use serde_json::Value;
use sourcing_connector::{ConnectorError, OperationFailure};
use std::{error::Error as StdError, fmt::Display};

/// The result type of engine runs.
pub type CoreResult<T> = Result<T, CoreError>;

/// The top-level error type of the engine. Every variant aborts the run.
#[derive(Debug)]
pub enum CoreError {
    /// The configuration is invalid.
    Configuration(String),

    /// The introspection schema could not be read.
    Schema(IndexError),

    /// Errors from a collaborator, outside of any operation.
    Connector(ConnectorError),

    /// Generic unspecified errors.
    Generic(anyhow::Error),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Configuration(message) => write!(f, "Invalid configuration: {message}"),
            CoreError::Schema(err) => write!(f, "Could not load the remote schema: {err}"),
            CoreError::Connector(err) => write!(f, "Connector error: {err}"),
            CoreError::Generic(src) => write!(f, "Generic error: {src}"),
        }
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CoreError::Configuration(_) => None,
            CoreError::Schema(err) => Some(err),
            CoreError::Connector(err) => Some(err),
            CoreError::Generic(err) => Some(err.as_ref()),
        }
    }
}

impl From<ConnectorError> for CoreError {
    fn from(err: ConnectorError) -> Self {
        CoreError::Connector(err)
    }
}

impl From<IndexError> for CoreError {
    fn from(err: IndexError) -> Self {
        CoreError::Schema(err)
    }
}

/// A failed operation. It is reported and the run goes on.
#[derive(Debug, thiserror::Error)]
#[error("Operation {operation_name} failed: {source}")]
pub struct OperationError {
    /// The operation name.
    pub operation_name: String,
    /// The document that was executed.
    pub document: String,
    /// The variables it was executed with.
    pub variables: Value,
    /// What went wrong.
    #[source]
    pub source: ConnectorError,
}

impl OperationError {
    /// One failure per error message, for the reporter.
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.source
            .messages()
            .into_iter()
            .map(|message| OperationFailure {
                operation_name: self.operation_name.clone(),
                document: self.document.clone(),
                variables: self.variables.clone(),
                message,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sourcing_connector::GraphqlError;

    #[test]
    fn graphql_errors_become_one_failure_each() {
        let err = OperationError {
            operation_name: String::from("ArticleQuery"),
            document: String::from("query ArticleQuery { articles { data { id } } }"),
            variables: json!({}),
            source: ConnectorError::query(vec![GraphqlError::new("first"), GraphqlError::new("second")]),
        };

        let messages: Vec<String> = err.failures().into_iter().map(|failure| failure.message).collect();

        assert_eq!(messages, ["first", "second"]);
        assert_eq!(err.to_string(), "Operation ArticleQuery failed: first; second");
    }
}
