use crate::resolver::FieldResolver;
use indexmap::IndexMap;
use std::fmt;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    /// The local type in GraphQL syntax, e.g. `[StrapiCategory]`.
    pub type_name: String,
    /// `None` for fields read straight from the record.
    pub resolver: Option<FieldResolver>,
}

impl FieldDefinition {
    pub fn plain(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        FieldDefinition {
            name: name.into(),
            type_name: type_name.into(),
            resolver: None,
        }
    }

    pub fn resolved(name: impl Into<String>, type_name: impl Into<String>, resolver: FieldResolver) -> Self {
        FieldDefinition {
            name: name.into(),
            type_name: type_name.into(),
            resolver: Some(resolver),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDefinition {
    pub name: String,
    /// The type this definition mirrors.
    pub remote_name: String,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDefinition>,
}

impl ObjectDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A union. The concrete type of a value is read from its `__typename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDefinition {
    pub name: String,
    pub remote_name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Object(ObjectDefinition),
    Union(UnionDefinition),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(object) => &object.name,
            TypeDefinition::Union(union) => &union.name,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectDefinition> {
        match self {
            TypeDefinition::Object(object) => Some(object),
            TypeDefinition::Union(_) => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionDefinition> {
        match self {
            TypeDefinition::Union(union) => Some(union),
            TypeDefinition::Object(_) => None,
        }
    }
}

/// Local definitions by local type name, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDefinitions {
    definitions: IndexMap<String, TypeDefinition>,
}

impl TypeDefinitions {
    pub(crate) fn push(&mut self, definition: TypeDefinition) {
        self.definitions.insert(definition.name().to_owned(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        self.get(name).and_then(TypeDefinition::as_object)
    }

    pub fn union(&self, name: &str) -> Option<&UnionDefinition> {
        self.get(name).and_then(TypeDefinition::as_union)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl fmt::Display for ObjectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.name)?;

        if !self.interfaces.is_empty() {
            write!(f, " implements {}", self.interfaces.join(" & "))?;
        }

        f.write_str(" {\n")?;

        for field in &self.fields {
            writeln!(f, "{INDENT}{}: {}", field.name, field.type_name)?;
        }

        f.write_str("}")
    }
}

impl fmt::Display for UnionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "union {} = {}", self.name, self.members.join(" | "))
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDefinition::Object(object) => fmt::Display::fmt(object, f),
            TypeDefinition::Union(union) => fmt::Display::fmt(union, f),
        }
    }
}

/// Renders every definition as GraphQL SDL, separated by blank lines.
impl fmt::Display for TypeDefinitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, definition) in self.definitions.values().enumerate() {
            if idx > 0 {
                f.write_str("\n\n")?;
            }

            write!(f, "{definition}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn definitions_render_as_sdl() {
        let mut definitions = TypeDefinitions::default();

        definitions.push(TypeDefinition::Object(ObjectDefinition {
            name: String::from("StrapiCategory"),
            remote_name: String::from("Category"),
            interfaces: vec![String::from("Node")],
            fields: vec![
                FieldDefinition::plain("name", "String!"),
                FieldDefinition::plain("slug", "String"),
            ],
        }));

        definitions.push(TypeDefinition::Union(UnionDefinition {
            name: String::from("StrapiBlockZone"),
            remote_name: String::from("BlockZone"),
            members: vec![String::from("StrapiComponentText"), String::from("StrapiComponentQuote")],
        }));

        let expected = indoc! {"
            type StrapiCategory implements Node {
              name: String!
              slug: String
            }

            union StrapiBlockZone = StrapiComponentText | StrapiComponentQuote"
        };

        assert_eq!(definitions.to_string(), expected);
        assert_eq!(definitions.names().collect::<Vec<_>>(), ["StrapiCategory", "StrapiBlockZone"]);
    }
}
