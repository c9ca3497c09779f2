use pretty_assertions::assert_eq;
use schema_index::{
    SchemaIndex, TypeKind,
    classifier::{self, Cardinality, ExclusionFilter},
};
use test_setup::blog_schema;

#[test]
fn the_blog_schema_is_indexed() {
    let index = SchemaIndex::from_introspection(blog_schema()).unwrap();

    let query = index.query_type().unwrap();
    assert_eq!(query.name, "Query");
    assert!(query.field("articles").unwrap().has_arg("locale"));

    let zone = index.get("SectionDynamicZone").unwrap();
    assert_eq!(zone.kind, TypeKind::Union);
    assert_eq!(zone.possible_types.len(), 3);

    assert!(!index.contains("LegacyBlock"));
}

#[test]
fn article_fields_classify_as_expected() {
    let index = SchemaIndex::from_introspection(blog_schema()).unwrap();
    let article = index.get("Article").unwrap();

    let relation = |name: &str| {
        let named = classifier::unwrap_to_named(&article.field(name).unwrap().type_ref).unwrap();
        classifier::classify_relation(named.name).map(|relation| (relation.entity, relation.cardinality))
    };

    assert_eq!(relation("cover"), Some(("UploadFile", Cardinality::One)));
    assert_eq!(relation("categories"), Some(("Category", Cardinality::Many)));
    assert_eq!(relation("title"), None);
    assert_eq!(relation("sections"), None);

    let tags = classifier::unwrap_to_named(&article.field("tags").unwrap().type_ref).unwrap();
    assert!(tags.is_list && tags.is_required);
    assert_eq!(tags.name, "String");

    let filter = ExclusionFilter::default();
    let retained: Vec<&str> = filter
        .retained_fields(article)
        .map(|field| field.name.as_str())
        .collect();
    assert!(!retained.contains(&"morph"));
    assert!(retained.contains(&"legacy"));
}

#[test]
fn the_resolved_field_type_is_the_named_descriptor() {
    let index = SchemaIndex::from_introspection(blog_schema()).unwrap();
    let article = index.get("Article").unwrap();

    let sections = index.resolve(&article.field("sections").unwrap().type_ref).unwrap();
    assert_eq!(sections.name, "SectionDynamicZone");

    assert!(index.resolve(&article.field("legacy").unwrap().type_ref).is_none());
}
