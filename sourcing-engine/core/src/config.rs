use crate::error::{CoreError, CoreResult};
use indexmap::IndexMap;
use query_builder::{DEFAULT_PAGE_SIZE, LocaleSetting};
use schema_index::{
    EntitySet,
    classifier::{ExclusionFilter, GENERIC_MORPH},
    normalize_entity_name,
};
use serde::Deserialize;
use sourcing_connector::Headers;
use std::{path::Path, time::Duration};
use type_builder::{DEFAULT_TYPE_PREFIX, TypeBuilderOptions};
use url::Url;

/// The engine configuration, as read from a JSON or TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// The base URL of the remote API, without the `/graphql` path.
    #[serde(rename = "apiURL")]
    pub api_url: Url,
    /// Sent as a bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Sent with every request, file downloads included.
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub collection_types: Vec<String>,
    #[serde(default)]
    pub single_types: Vec<String>,
    #[serde(default)]
    pub locale: LocaleSetting,
    /// Fetch drafts, and record node manifests.
    #[serde(default)]
    pub preview: bool,
    /// `false` disables the sync cursor: every run is a first run.
    #[serde(default = "default_cache")]
    pub cache: bool,
    #[serde(default)]
    pub inline_images: InlineImagesConfig,
    #[serde(default = "default_type_prefix")]
    pub type_prefix: String,
    #[serde(default = "default_excluded_types")]
    pub excluded_types: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Rich text fields images are extracted from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImagesConfig {
    /// Configured entity name to field names.
    #[serde(default)]
    pub types_to_parse: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub parse_documents: bool,
}

fn default_cache() -> bool {
    true
}

fn default_type_prefix() -> String {
    String::from(DEFAULT_TYPE_PREFIX)
}

fn default_excluded_types() -> Vec<String> {
    vec![String::from(GENERIC_MORPH)]
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl SourceConfig {
    /// A configuration with defaults for everything but the API URL.
    pub fn new(api_url: Url) -> Self {
        SourceConfig {
            api_url,
            token: None,
            headers: Headers::new(),
            collection_types: Vec::new(),
            single_types: Vec::new(),
            locale: LocaleSetting::default(),
            preview: false,
            cache: default_cache(),
            inline_images: InlineImagesConfig::default(),
            type_prefix: default_type_prefix(),
            excluded_types: default_excluded_types(),
            page_size: default_page_size(),
            timeout_seconds: None,
        }
    }

    pub fn from_json_str(input: &str) -> CoreResult<Self> {
        let config: SourceConfig =
            serde_json::from_str(input).map_err(|err| CoreError::Configuration(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> CoreResult<Self> {
        let config: SourceConfig = toml::from_str(input).map_err(|err| CoreError::Configuration(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Reads a `.toml` file as TOML and anything else as JSON.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|err| CoreError::Configuration(format!("Could not read {}: {err}", path.display())))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&input),
            _ => Self::from_json_str(&input),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !matches!(self.api_url.scheme(), "http" | "https") {
            return Err(CoreError::Configuration(format!(
                "apiURL must be an http(s) URL, got `{}`",
                self.api_url
            )));
        }

        if self.page_size <= 0 {
            return Err(CoreError::Configuration(format!(
                "pageSize must be positive, got {}",
                self.page_size
            )));
        }

        if self.type_prefix.is_empty() {
            return Err(CoreError::Configuration(String::from("typePrefix must not be empty")));
        }

        Ok(())
    }

    /// The API URL without trailing slash. Relative file URLs are resolved against it.
    pub fn api_base(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }

    pub fn graphql_endpoint(&self) -> String {
        format!("{}/graphql", self.api_base())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn entities(&self) -> EntitySet {
        EntitySet::new(&self.collection_types, &self.single_types)
    }

    pub fn exclusions(&self) -> ExclusionFilter {
        ExclusionFilter::new(self.excluded_types.iter().cloned())
    }

    /// Tracked rich text fields by remote type name.
    pub fn inline_images(&self) -> IndexMap<String, Vec<String>> {
        self.inline_images
            .types_to_parse
            .iter()
            .filter_map(|(entity, fields)| normalize_entity_name(entity).map(|name| (name, fields.clone())))
            .collect()
    }

    pub fn type_builder_options(&self) -> TypeBuilderOptions {
        TypeBuilderOptions {
            prefix: self.type_prefix.clone(),
            inline_images: self.inline_images(),
            parse_documents: self.inline_images.parse_documents,
        }
    }

    /// The local type name records of `entity` are stored as.
    pub fn local_type_name(&self, entity: &str) -> String {
        format!("{}{entity}", self.type_prefix)
    }
}
