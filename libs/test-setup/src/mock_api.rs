use serde_json::{Value, json};
use sourcing_connector::{
    ConnectorError, ConnectorResult, ContentTypeCatalog, GraphqlError, QueryRequest, QueryResponse, SourceApi,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

/// A fixture-driven [SourceApi].
///
/// Content is keyed by root field. Collections honor the `pagination` and `updatedAt`
/// variables, and `*SyncQuery` operations only answer with ids. Every executed request is
/// recorded.
pub struct MockApi {
    introspection: Value,
    locales: Vec<String>,
    catalog: ContentTypeCatalog,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    singles: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl MockApi {
    pub fn new(introspection: Value) -> Self {
        MockApi {
            introspection,
            locales: Vec::new(),
            catalog: ContentTypeCatalog::new(),
            collections: Mutex::new(HashMap::new()),
            singles: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_locales(mut self, locales: &[&str]) -> Self {
        self.locales = locales.iter().map(|locale| locale.to_string()).collect();
        self
    }

    pub fn with_catalog(mut self, entries: &[(&str, &str)]) -> Self {
        self.catalog = entries
            .iter()
            .map(|(entity, uid)| (entity.to_string(), uid.to_string()))
            .collect();
        self
    }

    /// Replace the items of a collection root field. Items are `{ "id": .., "attributes": .. }`.
    pub fn set_items(&self, root_field: &str, items: Vec<Value>) {
        self.collections.lock().unwrap().insert(root_field.to_owned(), items);
    }

    /// Replace the item of a single type root field.
    pub fn set_single(&self, root_field: &str, item: Value) {
        self.singles.lock().unwrap().insert(root_field.to_owned(), item);
    }

    /// Make every execution of the named operation fail with a GraphQL error.
    pub fn fail_operation(&self, operation_name: &str) {
        self.failing.lock().unwrap().insert(operation_name.to_owned());
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The operation names of the executed requests, in execution order.
    pub fn executed_operations(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|request| request.operation_name)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn answer(&self, request: &QueryRequest) -> Value {
        let root_field = root_field_name(&request.query);
        let is_sync = request
            .operation_name
            .as_deref()
            .is_some_and(|name| name.ends_with("SyncQuery"));

        if let Some(item) = self.singles.lock().unwrap().get(&root_field) {
            let data = if is_sync { json!({ "id": item["id"] }) } else { item.clone() };
            return json!({ root_field: { "data": data } });
        }

        let items = self
            .collections
            .lock()
            .unwrap()
            .get(&root_field)
            .cloned()
            .unwrap_or_default();

        let updated_after = request.variables["updatedAt"].as_str();
        let matching: Vec<Value> = items
            .into_iter()
            .filter(|item| match (updated_after, item["attributes"]["updatedAt"].as_str()) {
                (Some(threshold), Some(updated_at)) => updated_at > threshold,
                _ => true,
            })
            .collect();

        let total = matching.len();
        let start = request.variables["pagination"]["start"].as_u64().unwrap_or(0) as usize;
        let limit = request.variables["pagination"]["limit"]
            .as_i64()
            .filter(|limit| *limit >= 0)
            .map(|limit| limit as usize)
            .unwrap_or(total);

        let page: Vec<Value> = matching
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|item| if is_sync { json!({ "id": item["id"] }) } else { item })
            .collect();

        json!({ root_field: { "data": page, "meta": { "pagination": { "total": total } } } })
    }
}

/// The first selected field of the document: `query Q($a: T) { articles(..) { .. } }` gives
/// `articles`.
fn root_field_name(document: &str) -> String {
    document
        .split_once('{')
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

#[async_trait::async_trait]
impl SourceApi for MockApi {
    fn endpoint(&self) -> &str {
        "http://localhost:1337/graphql"
    }

    async fn fetch_introspection(&self) -> ConnectorResult<Value> {
        if self.introspection.is_null() {
            return Err(ConnectorError::http(self.endpoint(), 401, "Unauthorized"));
        }

        Ok(self.introspection.clone())
    }

    async fn fetch_available_locales(&self) -> ConnectorResult<Vec<String>> {
        Ok(self.locales.clone())
    }

    async fn fetch_content_type_catalog(&self) -> ConnectorResult<ContentTypeCatalog> {
        Ok(self.catalog.clone())
    }

    async fn execute(&self, request: &QueryRequest) -> ConnectorResult<QueryResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let failing = request
            .operation_name
            .as_ref()
            .is_some_and(|name| self.failing.lock().unwrap().contains(name));

        if failing {
            return Ok(QueryResponse::from_errors(vec![GraphqlError::new("Forbidden access")]));
        }

        Ok(QueryResponse::from_data(self.answer(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_field_names_are_read_from_documents() {
        assert_eq!(
            root_field_name("query ArticleQuery($locale: I18NLocaleCode) { articles(locale: $locale) { data { id } } }"),
            "articles"
        );
        assert_eq!(root_field_name("query HomepageQuery { homepage { data { id } } }"), "homepage");
    }
}
