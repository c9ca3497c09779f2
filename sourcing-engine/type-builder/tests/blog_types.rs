use indexmap::IndexMap;
use indoc::indoc;
use pretty_assertions::assert_eq;
use schema_index::{EntitySet, SchemaIndex, classifier::Cardinality, classifier::ExclusionFilter};
use test_setup::blog_schema;
use type_builder::{FieldResolver, TypeBuilderOptions, TypeDefinitionBuilder, TypeDefinitions};

fn build(entities: &EntitySet, options: &TypeBuilderOptions) -> TypeDefinitions {
    let index = SchemaIndex::from_introspection(blog_schema()).unwrap();
    let exclusions = ExclusionFilter::default();

    TypeDefinitionBuilder::new(&index, entities, &exclusions, options).build()
}

fn blog_options() -> TypeBuilderOptions {
    let mut inline_images = IndexMap::new();
    inline_images.insert(String::from("Article"), vec![String::from("body")]);

    TypeBuilderOptions {
        inline_images,
        parse_documents: true,
        ..Default::default()
    }
}

#[test]
fn blog_types_render_as_sdl() {
    let entities = EntitySet::new(["article", "category"], ["homepage"]);
    let definitions = build(&entities, &blog_options());

    let expected = indoc! {"
        type StrapiUploadFile implements Node {
          name: String!
          alternativeText: String
          url: String!
          mime: String!
          size: Float!
          formats: JSON
          updatedAt: Date
          file: File
        }

        type StrapiArticle implements Node {
          title: String!
          slug: String
          body: String
          cover: StrapiUploadFile
          tags: [String!]!
          sections: [StrapiSectionDynamicZone]
          categories: [StrapiCategory]
          author: StrapiComponentSharedAuthor
          status: String
          views: Float
          publishedAt: Date
          updatedAt: Date
          locale: String
          localizations: [StrapiArticle]
          body_images: [File]
          body_document: JSON
        }

        type StrapiCategory implements Node {
          name: String!
          slug: String
          articles: [StrapiArticle]
        }

        type StrapiHomepage implements Node {
          title: String
          hero: StrapiComponentSectionsHero
          seo: StrapiComponentSharedSeo
          updatedAt: Date
        }

        union StrapiSectionDynamicZone = StrapiComponentSectionsHero | StrapiComponentSectionsGallery | StrapiError

        type StrapiComponentSharedAuthor {
          id: ID!
          name: String
          seo: StrapiComponentSharedSeo
        }

        type StrapiComponentSectionsHero {
          id: ID!
          heading: String
          image: StrapiUploadFile
        }

        type StrapiComponentSharedSeo {
          id: ID!
          metaTitle: String
          metaImage: StrapiUploadFile
        }

        type StrapiComponentSectionsGallery {
          id: ID!
          images: [StrapiUploadFile]
        }

        type StrapiError {
          code: String!
          message: String
        }"
    };

    assert_eq!(definitions.to_string(), expected);
}

#[test]
fn relation_fields_carry_their_resolver() {
    let entities = EntitySet::new(["article", "category"], ["homepage"]);
    let definitions = build(&entities, &TypeBuilderOptions::default());

    let article = definitions.object("StrapiArticle").unwrap();

    assert_eq!(
        article.field("categories").unwrap().resolver,
        Some(FieldResolver::Relation {
            key: String::from("categories"),
            target: String::from("StrapiCategory"),
            cardinality: Cardinality::Many,
        })
    );
    assert_eq!(
        article.field("cover").unwrap().resolver,
        Some(FieldResolver::Relation {
            key: String::from("cover"),
            target: String::from("StrapiUploadFile"),
            cardinality: Cardinality::One,
        })
    );
    assert_eq!(article.field("title").unwrap().resolver, None);
    assert!(article.field("body_images").is_none());
}

#[test]
fn relations_to_unsourced_entities_are_dropped() {
    let entities = EntitySet::new(["article"], Vec::<String>::new());
    let definitions = build(&entities, &TypeBuilderOptions::default());

    let article = definitions.object("StrapiArticle").unwrap();

    assert!(article.field("categories").is_none());
    assert!(article.field("cover").is_some());
    assert!(definitions.object("StrapiCategory").is_none());
}

#[test]
fn missing_entities_contribute_no_definitions() {
    let entities = EntitySet::new(["writer", "category"], Vec::<String>::new());
    let definitions = build(&entities, &TypeBuilderOptions::default());

    assert_eq!(
        definitions.names().collect::<Vec<_>>(),
        ["StrapiUploadFile", "StrapiCategory"]
    );
}

#[test]
fn the_prefix_is_configurable() {
    let entities = EntitySet::new(["category"], Vec::<String>::new());
    let options = TypeBuilderOptions {
        prefix: String::from("Cms"),
        ..Default::default()
    };

    let definitions = build(&entities, &options);

    assert_eq!(definitions.names().collect::<Vec<_>>(), ["CmsUploadFile", "CmsCategory"]);
}

#[test]
fn every_type_name_is_emitted_once() {
    let entities = EntitySet::new(["article", "category"], ["homepage"]);
    let definitions = build(&entities, &blog_options());

    let names: Vec<&str> = definitions.names().collect();
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();

    assert_eq!(names.len(), unique.len());
    assert_eq!(definitions.len(), 10);
}
