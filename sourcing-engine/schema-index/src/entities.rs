use indexmap::IndexSet;

/// The media entity. It is always sourced, and sourced first, so that other entities can map
/// file URLs back to its records.
pub const UPLOAD_FILE: &str = "UploadFile";

/// The configured entity types, normalized to the remote schema's type names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    collections: IndexSet<String>,
    singles: IndexSet<String>,
}

impl EntitySet {
    pub fn new<C, S>(collection_types: C, single_types: S) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let mut collections = IndexSet::new();
        collections.insert(String::from(UPLOAD_FILE));
        collections.extend(
            collection_types
                .into_iter()
                .filter_map(|name| normalize_entity_name(name.as_ref())),
        );

        let singles = single_types
            .into_iter()
            .filter_map(|name| normalize_entity_name(name.as_ref()))
            .filter(|name| !collections.contains(name))
            .collect();

        EntitySet { collections, singles }
    }

    pub fn is_collection(&self, name: &str) -> bool {
        self.collections.contains(name)
    }

    pub fn is_single(&self, name: &str) -> bool {
        self.singles.contains(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_collection(name) || self.is_single(name)
    }

    /// Collection types first, then single types, in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().chain(self.singles.iter()).map(String::as_str)
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(String::as_str)
    }

    pub fn singles(&self) -> impl Iterator<Item = &str> {
        self.singles.iter().map(String::as_str)
    }
}

/// Turns a configured name (`blog-post`, `blogPost`, `blog_post`) into the PascalCase type name
/// the remote schema uses (`BlogPost`). Returns `None` when nothing alphanumeric is left.
pub fn normalize_entity_name(raw: &str) -> Option<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lowercase = false;

    for c in raw.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lowercase = false;
            continue;
        }

        if c.is_uppercase() && previous_lowercase && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        previous_lowercase = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    let normalized: String = words.iter().map(|word| capitalize(word)).collect();

    (!normalized.is_empty()).then_some(normalized)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn configured_names_are_normalized() {
        assert_eq!(normalize_entity_name("article").as_deref(), Some("Article"));
        assert_eq!(normalize_entity_name("blogPost").as_deref(), Some("BlogPost"));
        assert_eq!(normalize_entity_name("blog-post").as_deref(), Some("BlogPost"));
        assert_eq!(normalize_entity_name("blog_post").as_deref(), Some("BlogPost"));
        assert_eq!(normalize_entity_name("UploadFile").as_deref(), Some("UploadFile"));
        assert_eq!(normalize_entity_name("--").as_deref(), None);
    }

    #[test]
    fn upload_file_is_always_a_collection() {
        let entities = EntitySet::new(["article", "category"], ["homepage"]);

        assert_eq!(
            entities.names().collect::<Vec<_>>(),
            ["UploadFile", "Article", "Category", "Homepage"]
        );
        assert!(entities.is_collection(UPLOAD_FILE));
        assert!(entities.is_single("Homepage"));
        assert!(!entities.is_collection("Homepage"));
        assert!(!entities.contains("Writer"));
    }

    #[test]
    fn duplicates_are_collapsed() {
        let entities = EntitySet::new(["article", "Article", "upload-file"], ["article"]);

        assert_eq!(entities.names().collect::<Vec<_>>(), ["UploadFile", "Article"]);
    }
}
