use crate::{ConnectorError, ConnectorResult};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Entity type name to the opaque content-type uid the host uses in node manifests.
pub type ContentTypeCatalog = IndexMap<String, String>;

/// The remote content API.
#[async_trait::async_trait]
pub trait SourceApi: Send + Sync {
    /// Where queries are sent, for diagnostics.
    fn endpoint(&self) -> &str;

    /// The result of the introspection query: the full response body, `data` envelope included.
    async fn fetch_introspection(&self) -> ConnectorResult<Value>;

    /// The locale codes the remote side serves.
    async fn fetch_available_locales(&self) -> ConnectorResult<Vec<String>>;

    /// The content-type catalog. Only needed for node manifests.
    async fn fetch_content_type_catalog(&self) -> ConnectorResult<ContentTypeCatalog>;

    /// Execute one named operation. GraphQL errors are returned in the response rather than as
    /// an `Err`, so that partial data stays visible to the caller.
    async fn execute(&self, request: &QueryRequest) -> ConnectorResult<QueryResponse>;
}

/// The body of a GraphQL POST request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// The operation to run when the document holds several.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// The GraphQL document.
    pub query: String,
    /// The variables, as a JSON object.
    pub variables: Value,
}

impl QueryRequest {
    /// A request without operation name or variables.
    pub fn new(query: impl Into<String>) -> Self {
        QueryRequest {
            operation_name: None,
            query: query.into(),
            variables: Value::Object(Default::default()),
        }
    }

    /// Set the operation name.
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the variables.
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

/// One entry of a GraphQL response's `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// The human-readable message.
    pub message: String,
    /// Where in the response the error happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    /// Server-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    /// An error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        GraphqlError {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

/// The body of a GraphQL response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The `data` member. Absent when the whole query failed.
    #[serde(default)]
    pub data: Option<Value>,
    /// The `errors` member.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl QueryResponse {
    /// A successful response.
    pub fn from_data(data: Value) -> Self {
        QueryResponse {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// A failed response.
    pub fn from_errors(errors: Vec<GraphqlError>) -> Self {
        QueryResponse { data: None, errors }
    }

    /// The data, or the errors as a [ConnectorError] when there are any.
    pub fn into_data(self) -> ConnectorResult<Value> {
        if !self.errors.is_empty() {
            return Err(ConnectorError::query(self.errors));
        }

        Ok(self.data.unwrap_or(Value::Null))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<GraphqlError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GraphqlError>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn requests_serialize_as_graphql_post_bodies() {
        let request = QueryRequest::new("query ArticleQuery { articles { data { id } } }")
            .with_operation_name("ArticleQuery")
            .with_variables(json!({ "locale": "en" }));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "operationName": "ArticleQuery",
                "query": "query ArticleQuery { articles { data { id } } }",
                "variables": { "locale": "en" },
            })
        );
    }

    #[test]
    fn responses_with_errors_fail_into_data() {
        let response: QueryResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Forbidden access", "extensions": { "code": "FORBIDDEN" } }],
        }))
        .unwrap();

        let err = response.into_data().unwrap_err();
        assert_eq!(err.messages(), ["Forbidden access"]);
    }

    #[test]
    fn null_errors_are_accepted() {
        let response: QueryResponse = serde_json::from_value(json!({
            "data": { "articles": null },
            "errors": null,
        }))
        .unwrap();

        assert_eq!(response.into_data().unwrap(), json!({ "articles": null }));
    }
}
