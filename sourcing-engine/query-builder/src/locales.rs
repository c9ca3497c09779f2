use serde::{Deserialize, Deserializer};

const WILDCARDS: &[&str] = &["*", "all"];

/// The configured `locale` option: one code, a list of codes, or a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocaleSetting {
    /// Every locale the remote side serves.
    #[default]
    All,
    Only(Vec<String>),
}

impl LocaleSetting {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();

        if codes.is_empty() || codes.iter().any(|code| WILDCARDS.contains(&code.as_str())) {
            LocaleSetting::All
        } else {
            LocaleSetting::Only(codes)
        }
    }
}

impl<'de> Deserialize<'de> for LocaleSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(code) => LocaleSetting::from_codes([code]),
            Raw::Many(codes) => LocaleSetting::from_codes(codes),
        })
    }
}

/// The locale passes to run. `None` is a single pass without locale filter, used when nothing
/// matched.
pub fn resolve_locales(setting: &LocaleSetting, available: &[String]) -> Vec<Option<String>> {
    let resolved: Vec<Option<String>> = match setting {
        LocaleSetting::All => available.iter().cloned().map(Some).collect(),
        LocaleSetting::Only(configured) => {
            let kept: Vec<Option<String>> = configured
                .iter()
                .filter(|code| available.contains(code))
                .cloned()
                .map(Some)
                .collect();

            if kept.len() < configured.len() {
                tracing::warn!(
                    configured = ?configured,
                    available = ?available,
                    "Some configured locales are not available and will not be fetched"
                );
            }

            kept
        }
    };

    if resolved.is_empty() {
        return vec![None];
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn available() -> Vec<String> {
        vec![String::from("en"), String::from("fr"), String::from("de")]
    }

    #[test]
    fn wildcards_select_every_available_locale() {
        for setting in [
            LocaleSetting::from_codes(["*"]),
            LocaleSetting::from_codes(["en", "all"]),
            LocaleSetting::from_codes(Vec::<String>::new()),
        ] {
            assert_eq!(setting, LocaleSetting::All);
            assert_eq!(
                resolve_locales(&setting, &available()),
                [Some("en".to_owned()), Some("fr".to_owned()), Some("de".to_owned())]
            );
        }
    }

    #[test]
    fn configured_locales_are_intersected_in_configured_order() {
        let setting = LocaleSetting::from_codes(["de", "it", "en"]);

        assert_eq!(
            resolve_locales(&setting, &available()),
            [Some("de".to_owned()), Some("en".to_owned())]
        );
    }

    #[test]
    fn nothing_available_falls_back_to_one_unfiltered_pass() {
        assert_eq!(resolve_locales(&LocaleSetting::All, &[]), [None::<String>]);
        assert_eq!(
            resolve_locales(&LocaleSetting::from_codes(["it"]), &available()),
            [None::<String>]
        );
    }

    #[test]
    fn settings_deserialize_from_a_code_or_a_list() {
        let one: LocaleSetting = serde_json::from_str("\"fr\"").unwrap();
        let many: LocaleSetting = serde_json::from_str("[\"fr\", \"en\"]").unwrap();
        let wildcard: LocaleSetting = serde_json::from_str("\"all\"").unwrap();

        assert_eq!(one, LocaleSetting::Only(vec!["fr".to_owned()]));
        assert_eq!(many, LocaleSetting::Only(vec!["fr".to_owned(), "en".to_owned()]));
        assert_eq!(wildcard, LocaleSetting::All);
    }
}
