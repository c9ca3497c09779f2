//! The connector error type.

use crate::api::GraphqlError;
use std::{
    error::Error as StdError,
    fmt::{self, Display},
};
use tracing_error::SpanTrace;

/// Shorthand for a [Result](std::result::Result) where the error variant is a [ConnectorError].
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// The general error reporting type for collaborators.
#[derive(Debug)]
pub struct ConnectorError {
    kind: ErrorKind,
    context: SpanTrace,
}

impl ConnectorError {
    /// The `ErrorKind` wrapped by the error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The `ErrorKind` wrapped by the error.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// The `tracing_error::SpanTrace` captured where the error was built.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.context
    }

    /// The request never produced a response.
    pub fn transport(endpoint: impl Into<String>, source: impl Display) -> Self {
        ErrorKind::Transport {
            endpoint: endpoint.into(),
            message: source.to_string(),
        }
        .into()
    }

    /// The server answered with a non-success status.
    pub fn http(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        ErrorKind::Http {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
        .into()
    }

    /// The server rejected or partially failed a query.
    pub fn query(errors: Vec<GraphqlError>) -> Self {
        ErrorKind::Query(errors).into()
    }

    /// A response did not have the expected shape.
    pub fn decode(message: impl Into<String>) -> Self {
        ErrorKind::Decode(message.into()).into()
    }

    /// Build a generic error from just an error message.
    pub fn from_msg(message: impl Into<String>) -> Self {
        ErrorKind::Other(message.into()).into()
    }

    /// The individual messages of the error. A rejected query carries one per GraphQL error.
    pub fn messages(&self) -> Vec<String> {
        match &self.kind {
            ErrorKind::Query(errors) if !errors.is_empty() => errors.iter().map(|err| err.message.clone()).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl From<ErrorKind> for ConnectorError {
    fn from(kind: ErrorKind) -> Self {
        ConnectorError {
            kind,
            context: SpanTrace::capture(),
        }
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::Io(err).into()
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::decode(err.to_string())
    }
}

impl Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

impl StdError for ConnectorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.kind.source()
    }
}

/// Variants of [ConnectorError].
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The request could not be sent or its response not received.
    #[error("Request to `{endpoint}` failed: {message}")]
    Transport {
        /// The endpoint the request targeted.
        endpoint: String,
        /// What the transport reported.
        message: String,
    },
    /// A non-success HTTP status.
    #[error("`{endpoint}` answered with HTTP {status}: {body}")]
    Http {
        /// The endpoint the request targeted.
        endpoint: String,
        /// The status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },
    /// GraphQL errors in an otherwise successful response.
    #[error("{}", render_graphql_errors(.0))]
    Query(Vec<GraphqlError>),
    /// A response did not have the expected shape.
    #[error("Could not decode the response: {0}")]
    Decode(String),
    /// Local IO done by a host.
    #[error(transparent)]
    Io(std::io::Error),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

fn render_graphql_errors(errors: &[GraphqlError]) -> String {
    if errors.is_empty() {
        return String::from("The query failed without an error message.");
    }

    errors
        .iter()
        .map(|err| err.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_errors_expose_one_message_each() {
        let err = ConnectorError::query(vec![
            GraphqlError::new("Cannot query field \"title\" on type \"Article\"."),
            GraphqlError::new("Variable \"$locale\" is never used."),
        ]);

        assert_eq!(err.messages().len(), 2);
        assert_eq!(
            err.to_string(),
            "Cannot query field \"title\" on type \"Article\".; Variable \"$locale\" is never used."
        );
    }

    #[test]
    fn other_errors_expose_their_display() {
        let err = ConnectorError::http("http://localhost:1337/graphql", 502, "Bad Gateway");

        assert_eq!(
            err.messages(),
            ["`http://localhost:1337/graphql` answered with HTTP 502: Bad Gateway"]
        );
    }
}
