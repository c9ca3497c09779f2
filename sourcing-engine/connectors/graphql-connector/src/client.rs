use crate::catalog;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use schema_index::INTROSPECTION_QUERY;
use serde_json::{Value, json};
use sourcing_connector::{
    ConnectorError, ConnectorResult, ContentTypeCatalog, Headers, QueryRequest, QueryResponse, SourceApi,
};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Lists the locale codes served by the i18n plugin.
pub const LOCALES_QUERY: &str = "query LocalesQuery { i18NLocales { data { attributes { code } } } }";

const CONTENT_TYPES_PATH: &str = "api/content-type-builder/content-types";

/// How requests are authenticated and bounded.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Sent with every request. They take precedence over the token.
    pub headers: Headers,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

/// Responses that do not change during a run.
#[derive(Default)]
struct ResponseCache {
    introspection: Option<Value>,
    locales: Option<Vec<String>>,
    catalog: Option<ContentTypeCatalog>,
}

/// A client for one API URL. Schema-level responses are cached for the client's lifetime,
/// content queries always go to the network.
pub struct GraphqlClient {
    http: reqwest::Client,
    base: Url,
    endpoint: String,
    cache: Mutex<ResponseCache>,
}

impl GraphqlClient {
    /// A client sending queries to `<base>/graphql`.
    pub fn new(base: Url, options: &ClientOptions) -> ConnectorResult<Self> {
        let endpoint = format!("{}/graphql", base.as_str().trim_end_matches('/'));

        let mut builder = reqwest::Client::builder().default_headers(default_headers(options)?);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|err| ConnectorError::transport(endpoint.as_str(), err))?;

        Ok(GraphqlClient {
            http,
            base,
            endpoint,
            cache: Mutex::new(ResponseCache::default()),
        })
    }

    /// The API URL the client was built for.
    pub fn base(&self) -> &Url {
        &self.base
    }

    async fn post(&self, request: &QueryRequest) -> ConnectorResult<QueryResponse> {
        tracing::debug!(operation = ?request.operation_name, "Sending query");

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| ConnectorError::transport(self.endpoint.as_str(), err))?;

        let status = response.status();

        // GraphQL servers answer validation errors with 400 and a regular error body.
        if !status.is_success() && status != reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::http(self.endpoint.as_str(), status.as_u16(), body));
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|err| ConnectorError::decode(format!("Invalid GraphQL response from {}: {err}", self.endpoint)))
    }

    async fn get_json(&self, path: &str) -> ConnectorResult<Value> {
        let url = self
            .base
            .join(path)
            .map_err(|err| ConnectorError::from_msg(format!("Invalid URL for {path}: {err}")))?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ConnectorError::transport(url.as_str(), err))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::http(url.as_str(), status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ConnectorError::decode(format!("Invalid JSON from {url}: {err}")))
    }
}

fn default_headers(options: &ClientOptions) -> ConnectorResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &options.token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| ConnectorError::from_msg(format!("Invalid token: {err}")))?;
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ConnectorError::from_msg(format!("Invalid header name `{name}`: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| ConnectorError::from_msg(format!("Invalid value for header `{name}`: {err}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// The codes of a [LOCALES_QUERY] response.
fn locale_codes(data: &Value) -> Vec<String> {
    data["i18NLocales"]["data"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|locale| locale["attributes"]["code"].as_str())
        .map(str::to_owned)
        .collect()
}

#[async_trait::async_trait]
impl SourceApi for GraphqlClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_introspection(&self) -> ConnectorResult<Value> {
        let mut cache = self.cache.lock().await;

        if let Some(introspection) = &cache.introspection {
            return Ok(introspection.clone());
        }

        let request = QueryRequest::new(INTROSPECTION_QUERY).with_operation_name("IntrospectionQuery");
        let data = self.post(&request).await?.into_data()?;
        let introspection = json!({ "data": data });

        cache.introspection = Some(introspection.clone());

        Ok(introspection)
    }

    async fn fetch_available_locales(&self) -> ConnectorResult<Vec<String>> {
        let mut cache = self.cache.lock().await;

        if let Some(locales) = &cache.locales {
            return Ok(locales.clone());
        }

        let request = QueryRequest::new(LOCALES_QUERY).with_operation_name("LocalesQuery");
        let locales = locale_codes(&self.post(&request).await?.into_data()?);
        tracing::debug!(?locales, "Fetched the available locales");

        cache.locales = Some(locales.clone());

        Ok(locales)
    }

    async fn fetch_content_type_catalog(&self) -> ConnectorResult<ContentTypeCatalog> {
        let mut cache = self.cache.lock().await;

        if let Some(catalog) = &cache.catalog {
            return Ok(catalog.clone());
        }

        let catalog = catalog::from_content_types(&self.get_json(CONTENT_TYPES_PATH).await?);
        cache.catalog = Some(catalog.clone());

        Ok(catalog)
    }

    async fn execute(&self, request: &QueryRequest) -> ConnectorResult<QueryResponse> {
        self.post(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn queries_go_to_the_graphql_path() {
        let base = Url::parse("http://localhost:1337/").unwrap();
        let client = GraphqlClient::new(base, &ClientOptions::default()).unwrap();

        assert_eq!(client.endpoint(), "http://localhost:1337/graphql");
    }

    #[test]
    fn headers_carry_the_token_and_custom_headers() {
        let mut options = ClientOptions {
            token: Some(String::from("secret")),
            ..Default::default()
        };
        options.headers.insert(String::from("x-tenant"), String::from("blog"));

        let headers = default_headers(&options).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
        assert_eq!(headers.get("x-tenant").unwrap(), "blog");
    }

    #[test]
    fn invalid_header_names_are_rejected() {
        let mut options = ClientOptions::default();
        options.headers.insert(String::from("not a header"), String::from("value"));

        assert!(default_headers(&options).is_err());
    }

    #[test]
    fn locale_codes_are_read_from_the_response() {
        let data = json!({
            "i18NLocales": {
                "data": [
                    { "attributes": { "code": "en" } },
                    { "attributes": { "code": "fr" } },
                ]
            }
        });

        assert_eq!(locale_codes(&data), ["en", "fr"]);
        assert!(locale_codes(&json!({ "i18NLocales": null })).is_empty());
    }
}
