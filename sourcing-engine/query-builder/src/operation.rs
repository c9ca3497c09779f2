use crate::selection::{ROOT_DEPTH, SelectionBuilder};
use schema_index::{
    EntitySet, FieldDescriptor, SchemaIndex,
    classifier::{self, Cardinality, ExclusionFilter},
};
use serde::Serialize;
use serde_json::Value;

/// The `updatedAt` threshold of a sync query: older than every record.
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00.000Z";

/// Items fetched per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: i64 = 1000;

const DEFAULT_UPDATED_AT_TYPE: &str = "DateTime";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationState {
    Live,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub start: i64,
    pub limit: i64,
}

/// The arguments a root field supports, negotiated from the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub pagination: bool,
    pub publication_state: bool,
    pub locale: bool,
    /// The field's `filters` input can filter on `updatedAt`.
    pub updated_at: bool,
}

/// Variables of an operation. Unsupported variables are `None` and never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_state: Option<PublicationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl OperationVariables {
    fn defaults(capabilities: Capabilities, locale: Option<&str>) -> Self {
        OperationVariables {
            pagination: capabilities.pagination.then_some(Pagination {
                start: 0,
                limit: DEFAULT_PAGE_SIZE,
            }),
            publication_state: capabilities.publication_state.then_some(PublicationState::Live),
            locale: capabilities
                .locale
                .then(|| locale.unwrap_or("all").to_owned()),
            updated_at: capabilities.updated_at.then(|| EPOCH_SENTINEL.to_owned()),
        }
    }

    /// The same variables with the `updatedAt` threshold forced back to [EPOCH_SENTINEL], so
    /// that a sync query sees every existing record.
    pub fn for_sync(&self) -> Self {
        OperationVariables {
            updated_at: self.updated_at.as_ref().map(|_| EPOCH_SENTINEL.to_owned()),
            ..self.clone()
        }
    }

    pub fn with_page_size(mut self, limit: i64) -> Self {
        if let Some(pagination) = &mut self.pagination {
            pagination.limit = limit;
        }

        self
    }

    pub fn with_start(mut self, start: i64) -> Self {
        if let Some(pagination) = &mut self.pagination {
            pagination.start = start;
        }

        self
    }

    pub fn with_publication_state(mut self, state: PublicationState) -> Self {
        if let Some(current) = &mut self.publication_state {
            *current = state;
        }

        self
    }

    /// Only fetch records modified after `threshold`.
    pub fn with_updated_after(mut self, threshold: impl Into<String>) -> Self {
        if let Some(current) = &mut self.updated_at {
            *current = threshold.into();
        }

        self
    }

    /// The variables as the JSON object sent with the request.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// A pair of documents fetching one root field, for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub root_field_name: String,
    pub entity_type_name: String,
    pub is_collection: bool,
    pub locale: Option<String>,
    pub operation_name: String,
    pub full_query_document: String,
    pub sync_query_document: String,
    pub variables: OperationVariables,
    pub capabilities: Capabilities,
}

impl Operation {
    pub fn sync_operation_name(&self) -> String {
        format!("{}SyncQuery", self.entity_type_name)
    }

    fn validate(&self) -> Result<(), graphql_parser::query::ParseError> {
        graphql_parser::parse_query::<String>(&self.full_query_document)?;
        graphql_parser::parse_query::<String>(&self.sync_query_document)?;

        Ok(())
    }
}

/// Variable declarations and the matching root field arguments.
struct Signature {
    declarations: Vec<String>,
    arguments: Vec<String>,
}

impl Signature {
    fn new(index: &SchemaIndex, field: &FieldDescriptor, capabilities: Capabilities) -> Self {
        let mut signature = Signature {
            declarations: Vec::new(),
            arguments: Vec::new(),
        };

        for (variable, supported) in [
            ("pagination", capabilities.pagination),
            ("publicationState", capabilities.publication_state),
            ("locale", capabilities.locale),
        ] {
            if let (true, Some(arg)) = (supported, field.arg(variable)) {
                signature.declarations.push(format!("${variable}: {}", arg.type_ref));
                signature.arguments.push(format!("{variable}: ${variable}"));
            }
        }

        if capabilities.updated_at {
            let type_name = updated_at_filter_type(index, field).unwrap_or_else(|| DEFAULT_UPDATED_AT_TYPE.to_owned());

            signature.declarations.push(format!("$updatedAt: {type_name}"));
            signature
                .arguments
                .push(String::from("filters: { updatedAt: { gt: $updatedAt } }"));
        }

        signature
    }

    fn render_declarations(&self) -> String {
        parenthesized(&self.declarations)
    }

    fn render_arguments(&self) -> String {
        parenthesized(&self.arguments)
    }
}

fn parenthesized(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("({})", items.join(", "))
    }
}

/// The `filters` input object of a root field.
fn filters_input<'a>(index: &'a SchemaIndex, field: &FieldDescriptor) -> Option<&'a schema_index::TypeDescriptor> {
    field.arg("filters").and_then(|filters| index.resolve(&filters.type_ref))
}

/// The type of `filters.updatedAt.gt`, rendered as a variable type.
fn updated_at_filter_type(index: &SchemaIndex, field: &FieldDescriptor) -> Option<String> {
    let updated_at = filters_input(index, field)?.input_field("updatedAt")?;
    let gt = index.resolve(&updated_at.type_ref)?.input_field("gt")?;

    Some(gt.type_ref.to_string())
}

impl Capabilities {
    fn negotiate(index: &SchemaIndex, field: &FieldDescriptor) -> Self {
        Capabilities {
            pagination: field.has_arg("pagination"),
            publication_state: field.has_arg("publicationState"),
            locale: field.has_arg("locale"),
            updated_at: filters_input(index, field).is_some_and(|filters| filters.input_field("updatedAt").is_some()),
        }
    }
}

/// One operation per configured root field of the query type and per locale. Root fields
/// without a `locale` argument get a single pass; an empty `locales` means one pass without a
/// locale filter.
pub fn build_operations(
    index: &SchemaIndex,
    entities: &EntitySet,
    locales: &[Option<String>],
    exclusions: &ExclusionFilter,
) -> Vec<Operation> {
    let Some(query_type) = index.query_type() else {
        tracing::warn!("The schema has no query type, no operation can be built");
        return Vec::new();
    };

    let selections = SelectionBuilder::new(index, exclusions);
    let mut operations = Vec::new();

    for field in &query_type.fields {
        let Some(named) = classifier::unwrap_to_named(&field.type_ref) else {
            continue;
        };

        let Some(relation) = classifier::classify_root_response(named.name) else {
            continue;
        };

        let is_collection = relation.cardinality == Cardinality::Many;
        let configured = match relation.cardinality {
            Cardinality::Many => entities.is_collection(relation.entity),
            Cardinality::One => entities.is_single(relation.entity),
        };

        if !configured {
            continue;
        }

        let Some(entity_type) = index.get(relation.entity) else {
            tracing::warn!(
                entity = relation.entity,
                root_field = %field.name,
                "The entity type is missing from the schema, skipping its root field"
            );
            continue;
        };

        let capabilities = Capabilities::negotiate(index, field);
        let signature = Signature::new(index, field, capabilities);
        let selection = selections.synthesize_root(entity_type, ROOT_DEPTH);

        let passes: Vec<Option<&str>> = if capabilities.locale && !locales.is_empty() {
            locales.iter().map(Option::as_deref).collect()
        } else {
            vec![None]
        };

        for locale in passes {
            let operation_name = format!("{}Query", relation.entity);

            let operation = Operation {
                full_query_document: full_document(
                    &operation_name,
                    &field.name,
                    &signature,
                    selection.as_deref(),
                    capabilities,
                ),
                sync_query_document: sync_document(relation.entity, &field.name, &signature, capabilities),
                root_field_name: field.name.clone(),
                entity_type_name: relation.entity.to_owned(),
                is_collection,
                locale: locale.map(str::to_owned),
                operation_name,
                variables: OperationVariables::defaults(capabilities, locale),
                capabilities,
            };

            match operation.validate() {
                Ok(()) => operations.push(operation),
                Err(err) => tracing::error!(
                    operation = %operation.operation_name,
                    document = %operation.full_query_document,
                    "Dropping an operation whose document does not parse: {err}"
                ),
            }
        }
    }

    tracing::debug!(operations = operations.len(), "Built operations");

    operations
}

fn meta(capabilities: Capabilities) -> &'static str {
    if capabilities.pagination {
        " meta { pagination { total } }"
    } else {
        ""
    }
}

fn full_document(
    operation_name: &str,
    root_field: &str,
    signature: &Signature,
    selection: Option<&str>,
    capabilities: Capabilities,
) -> String {
    let attributes = match selection {
        Some(selection) => format!("__typename {selection}"),
        None => String::from("__typename"),
    };

    format!(
        "query {operation_name}{declarations} {{ {root_field}{arguments} {{ __typename data {{ __typename id attributes {{ {attributes} }} }}{meta} }} }}",
        declarations = signature.render_declarations(),
        arguments = signature.render_arguments(),
        meta = meta(capabilities),
    )
}

fn sync_document(entity: &str, root_field: &str, signature: &Signature, capabilities: Capabilities) -> String {
    format!(
        "query {entity}SyncQuery{declarations} {{ {root_field}{arguments} {{ data {{ id }}{meta} }} }}",
        declarations = signature.render_declarations(),
        arguments = signature.render_arguments(),
        meta = meta(capabilities),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn capabilities() -> Capabilities {
        Capabilities {
            pagination: true,
            publication_state: true,
            locale: true,
            updated_at: true,
        }
    }

    #[test]
    fn default_variables_cover_supported_arguments_only() {
        let variables = OperationVariables::defaults(
            Capabilities {
                pagination: true,
                ..Default::default()
            },
            Some("en"),
        );

        assert_eq!(variables.to_json(), json!({ "pagination": { "start": 0, "limit": 1000 } }));
    }

    #[test]
    fn default_variables_with_every_capability() {
        let variables = OperationVariables::defaults(capabilities(), None);

        assert_eq!(
            variables.to_json(),
            json!({
                "pagination": { "start": 0, "limit": 1000 },
                "publicationState": "LIVE",
                "locale": "all",
                "updatedAt": "1970-01-01T00:00:00.000Z",
            })
        );
    }

    #[test]
    fn sync_variables_reset_the_threshold() {
        let live = OperationVariables::defaults(capabilities(), Some("fr"))
            .with_publication_state(PublicationState::Preview)
            .with_updated_after("2022-05-01T00:00:00.000Z")
            .with_start(2000);

        let sync = live.for_sync();

        assert_eq!(sync.updated_at.as_deref(), Some(EPOCH_SENTINEL));
        assert_eq!(sync.locale, live.locale);
        assert_eq!(sync.publication_state, live.publication_state);
        assert_eq!(sync.pagination, live.pagination);
    }

    #[test]
    fn setters_never_add_unsupported_variables() {
        let variables = OperationVariables::defaults(Capabilities::default(), None)
            .with_updated_after("2022-05-01T00:00:00.000Z")
            .with_publication_state(PublicationState::Preview)
            .with_page_size(10);

        assert_eq!(variables.to_json(), json!({}));
    }

    #[test]
    fn attributes_always_select_the_typename() {
        let signature = Signature {
            declarations: Vec::new(),
            arguments: Vec::new(),
        };

        assert_eq!(
            full_document("HomepageQuery", "homepage", &signature, None, Capabilities::default()),
            "query HomepageQuery { homepage { __typename data { __typename id attributes { __typename } } } }"
        );
        assert_eq!(
            full_document("HomepageQuery", "homepage", &signature, Some("title"), Capabilities::default()),
            "query HomepageQuery { homepage { __typename data { __typename id attributes { __typename title } } } }"
        );
    }
}
