//! Builders for introspection JSON, and a blog-shaped schema in the remote CMS conventions.
//!
//! The builders produce exactly what the introspection query returns, `null` lists included,
//! so that fixtures go through the same deserialization path as live responses.

use serde_json::{Value, json};

fn named(kind: &str, name: &str) -> Value {
    json!({ "kind": kind, "name": name, "ofType": null })
}

pub fn scalar(name: &str) -> Value {
    named("SCALAR", name)
}

pub fn object(name: &str) -> Value {
    named("OBJECT", name)
}

pub fn union_ref(name: &str) -> Value {
    named("UNION", name)
}

pub fn enumeration(name: &str) -> Value {
    named("ENUM", name)
}

pub fn input(name: &str) -> Value {
    named("INPUT_OBJECT", name)
}

pub fn list(of_type: Value) -> Value {
    json!({ "kind": "LIST", "name": null, "ofType": of_type })
}

pub fn non_null(of_type: Value) -> Value {
    json!({ "kind": "NON_NULL", "name": null, "ofType": of_type })
}

/// A field argument, or an input object field.
pub fn arg(name: &str, type_ref: Value) -> Value {
    json!({ "name": name, "description": null, "type": type_ref, "defaultValue": null })
}

pub fn field(name: &str, type_ref: Value) -> Value {
    field_with_args(name, Vec::new(), type_ref)
}

pub fn field_with_args(name: &str, args: Vec<Value>, type_ref: Value) -> Value {
    json!({
        "name": name,
        "description": null,
        "args": args,
        "type": type_ref,
        "isDeprecated": false,
        "deprecationReason": null,
    })
}

pub fn object_type(name: &str, fields: Vec<Value>) -> Value {
    json!({
        "kind": "OBJECT",
        "name": name,
        "description": null,
        "fields": fields,
        "inputFields": null,
        "interfaces": [],
        "enumValues": null,
        "possibleTypes": null,
    })
}

pub fn union_type(name: &str, members: &[&str]) -> Value {
    json!({
        "kind": "UNION",
        "name": name,
        "description": null,
        "fields": null,
        "inputFields": null,
        "interfaces": null,
        "enumValues": null,
        "possibleTypes": members.iter().map(|member| object(member)).collect::<Vec<_>>(),
    })
}

pub fn enum_type(name: &str, values: &[&str]) -> Value {
    json!({
        "kind": "ENUM",
        "name": name,
        "description": null,
        "fields": null,
        "inputFields": null,
        "interfaces": null,
        "enumValues": values
            .iter()
            .map(|value| json!({ "name": value, "description": null, "isDeprecated": false, "deprecationReason": null }))
            .collect::<Vec<_>>(),
        "possibleTypes": null,
    })
}

pub fn input_type(name: &str, fields: Vec<Value>) -> Value {
    json!({
        "kind": "INPUT_OBJECT",
        "name": name,
        "description": null,
        "fields": null,
        "inputFields": fields,
        "interfaces": null,
        "enumValues": null,
        "possibleTypes": null,
    })
}

pub fn scalar_type(name: &str) -> Value {
    json!({
        "kind": "SCALAR",
        "name": name,
        "description": null,
        "fields": null,
        "inputFields": null,
        "interfaces": null,
        "enumValues": null,
        "possibleTypes": null,
    })
}

/// Wraps the types in the `{ "data": { "__schema": .. } }` envelope, with `Query` as root.
pub fn introspection_response(types: Vec<Value>) -> Value {
    json!({
        "data": {
            "__schema": {
                "queryType": { "name": "Query" },
                "mutationType": null,
                "subscriptionType": null,
                "types": types,
                "directives": [],
            }
        }
    })
}

/// `<Entity>Entity`, `<Entity>EntityResponse`, `<Entity>EntityResponseCollection` and
/// `<Entity>RelationResponseCollection` for an entity type.
pub fn entity_wrappers(entity: &str) -> Vec<Value> {
    let entity_object = format!("{entity}Entity");

    vec![
        object_type(
            &entity_object,
            vec![field("id", scalar("ID")), field("attributes", object(entity))],
        ),
        object_type(
            &format!("{entity}EntityResponse"),
            vec![field("data", object(&entity_object))],
        ),
        object_type(
            &format!("{entity}EntityResponseCollection"),
            vec![
                field("data", non_null(list(non_null(object(&entity_object))))),
                field("meta", non_null(object("ResponseCollectionMeta"))),
            ],
        ),
        object_type(
            &format!("{entity}RelationResponseCollection"),
            vec![field("data", non_null(list(non_null(object(&entity_object)))))],
        ),
    ]
}

/// The arguments of a collection field or relation: `filters`, `pagination` and `sort`.
pub fn collection_args(filters_input: &str) -> Vec<Value> {
    vec![
        arg("filters", input(filters_input)),
        arg("pagination", input("PaginationArg")),
        arg("sort", list(scalar("String"))),
    ]
}

/// The types every schema of the remote CMS carries.
pub fn base_types() -> Vec<Value> {
    vec![
        scalar_type("String"),
        scalar_type("ID"),
        scalar_type("Int"),
        scalar_type("Float"),
        scalar_type("Boolean"),
        scalar_type("DateTime"),
        scalar_type("Long"),
        scalar_type("JSON"),
        scalar_type("I18NLocaleCode"),
        enum_type("PublicationState", &["LIVE", "PREVIEW"]),
        input_type(
            "PaginationArg",
            vec![
                arg("page", scalar("Int")),
                arg("pageSize", scalar("Int")),
                arg("start", scalar("Int")),
                arg("limit", scalar("Int")),
            ],
        ),
        input_type(
            "StringFilterInput",
            vec![arg("eq", scalar("String")), arg("gt", scalar("String"))],
        ),
        input_type(
            "DateTimeFilterInput",
            vec![arg("eq", scalar("DateTime")), arg("gt", scalar("DateTime"))],
        ),
        object_type(
            "Pagination",
            vec![
                field("total", non_null(scalar("Int"))),
                field("page", non_null(scalar("Int"))),
                field("pageSize", non_null(scalar("Int"))),
                field("pageCount", non_null(scalar("Int"))),
            ],
        ),
        object_type(
            "ResponseCollectionMeta",
            vec![field("pagination", non_null(object("Pagination")))],
        ),
    ]
}

/// A blog: localized `Article` collection with a dynamic zone, a `Category` collection, a
/// `Homepage` single type and the media library.
///
/// `Article.legacy` points to a type the schema does not define, and `Article.morph` to the
/// excluded `GenericMorph` union.
pub fn blog_schema() -> Value {
    let article_args = {
        let mut args = collection_args("ArticleFiltersInput");
        args.push(arg("publicationState", enumeration("PublicationState")));
        args.push(arg("locale", scalar("I18NLocaleCode")));
        args
    };

    let category_args = {
        let mut args = collection_args("CategoryFiltersInput");
        args.push(arg("publicationState", enumeration("PublicationState")));
        args
    };

    let mut types = vec![
        object_type(
            "Query",
            vec![
                field_with_args("articles", article_args, object("ArticleEntityResponseCollection")),
                field_with_args(
                    "article",
                    vec![arg("id", scalar("ID")), arg("locale", scalar("I18NLocaleCode"))],
                    object("ArticleEntityResponse"),
                ),
                field_with_args(
                    "homepage",
                    vec![
                        arg("publicationState", enumeration("PublicationState")),
                        arg("locale", scalar("I18NLocaleCode")),
                    ],
                    object("HomepageEntityResponse"),
                ),
                field_with_args("categories", category_args, object("CategoryEntityResponseCollection")),
                field_with_args(
                    "uploadFiles",
                    collection_args("UploadFileFiltersInput"),
                    object("UploadFileEntityResponseCollection"),
                ),
                field_with_args(
                    "uploadFile",
                    vec![arg("id", scalar("ID"))],
                    object("UploadFileEntityResponse"),
                ),
            ],
        ),
        object_type(
            "Article",
            vec![
                field("title", non_null(scalar("String"))),
                field("slug", scalar("String")),
                field("body", scalar("String")),
                field("cover", object("UploadFileEntityResponse")),
                field("tags", non_null(list(non_null(scalar("String"))))),
                field("sections", list(union_ref("SectionDynamicZone"))),
                field_with_args(
                    "categories",
                    collection_args("CategoryFiltersInput"),
                    object("CategoryRelationResponseCollection"),
                ),
                field("author", object("ComponentSharedAuthor")),
                field("status", enumeration("ENUM_ARTICLE_STATUS")),
                field("views", scalar("Long")),
                field("publishedAt", scalar("DateTime")),
                field("updatedAt", scalar("DateTime")),
                field("locale", scalar("String")),
                field_with_args(
                    "localizations",
                    collection_args("ArticleFiltersInput"),
                    object("ArticleRelationResponseCollection"),
                ),
                field("morph", list(union_ref("GenericMorph"))),
                field("legacy", object("LegacyBlock")),
            ],
        ),
        union_type(
            "SectionDynamicZone",
            &["ComponentSectionsHero", "ComponentSectionsGallery", "Error"],
        ),
        object_type(
            "ComponentSectionsHero",
            vec![
                field("id", non_null(scalar("ID"))),
                field("heading", scalar("String")),
                field("image", object("UploadFileEntityResponse")),
            ],
        ),
        object_type(
            "ComponentSectionsGallery",
            vec![
                field("id", non_null(scalar("ID"))),
                field_with_args(
                    "images",
                    collection_args("UploadFileFiltersInput"),
                    object("UploadFileRelationResponseCollection"),
                ),
            ],
        ),
        object_type(
            "Error",
            vec![field("code", non_null(scalar("String"))), field("message", scalar("String"))],
        ),
        object_type(
            "ComponentSharedAuthor",
            vec![
                field("id", non_null(scalar("ID"))),
                field("name", scalar("String")),
                field("seo", object("ComponentSharedSeo")),
            ],
        ),
        object_type(
            "ComponentSharedSeo",
            vec![
                field("id", non_null(scalar("ID"))),
                field("metaTitle", scalar("String")),
                field("metaImage", object("UploadFileEntityResponse")),
            ],
        ),
        enum_type("ENUM_ARTICLE_STATUS", &["draft", "review", "published"]),
        union_type("GenericMorph", &["Article", "Category", "UploadFile"]),
        object_type(
            "Category",
            vec![
                field("name", non_null(scalar("String"))),
                field("slug", scalar("String")),
                field_with_args(
                    "articles",
                    collection_args("ArticleFiltersInput"),
                    object("ArticleRelationResponseCollection"),
                ),
            ],
        ),
        object_type(
            "Homepage",
            vec![
                field("title", scalar("String")),
                field("hero", object("ComponentSectionsHero")),
                field("seo", object("ComponentSharedSeo")),
                field("updatedAt", scalar("DateTime")),
            ],
        ),
        object_type(
            "UploadFile",
            vec![
                field("name", non_null(scalar("String"))),
                field("alternativeText", scalar("String")),
                field("url", non_null(scalar("String"))),
                field("mime", non_null(scalar("String"))),
                field("size", non_null(scalar("Float"))),
                field("formats", scalar("JSON")),
                field("related", list(union_ref("GenericMorph"))),
                field("updatedAt", scalar("DateTime")),
            ],
        ),
        input_type(
            "ArticleFiltersInput",
            vec![
                arg("title", input("StringFilterInput")),
                arg("updatedAt", input("DateTimeFilterInput")),
                arg("and", list(input("ArticleFiltersInput"))),
            ],
        ),
        input_type("CategoryFiltersInput", vec![arg("name", input("StringFilterInput"))]),
        input_type(
            "UploadFileFiltersInput",
            vec![
                arg("name", input("StringFilterInput")),
                arg("updatedAt", input("DateTimeFilterInput")),
            ],
        ),
    ];

    types.extend(base_types());

    for entity in ["Article", "Category", "Homepage", "UploadFile"] {
        types.extend(entity_wrappers(entity));
    }

    introspection_response(types)
}
