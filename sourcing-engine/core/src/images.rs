use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static HTML_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']?([^"'\s>]+)["']?[^>]*>"#).unwrap());

static HTML_ALT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSyntax {
    Markdown,
    Html,
}

/// An image referenced from a rich text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub syntax: ImageSyntax,
    pub alt: Option<String>,
    /// The source as written.
    pub src: String,
    /// The absolute URL, `None` when the source is neither a path nor an http(s) URL.
    pub url: Option<String>,
    /// Byte offset in the text.
    #[serde(skip)]
    pub offset: usize,
}

/// Every image reference of `text`, in source order. Markdown images come from the CommonMark
/// parse, including reference-style ones. `<img>` tags are only read from HTML blocks, so code
/// blocks, code spans and inline HTML contribute nothing.
pub fn extract_image_references(text: &str, api_base: &str) -> Vec<ImageReference> {
    let mut references = Vec::new();
    let mut open_image: Option<ImageReference> = None;

    for (event, range) in Parser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::Image { dest_url, .. }) => {
                open_image = Some(ImageReference {
                    syntax: ImageSyntax::Markdown,
                    alt: None,
                    url: absolute_url(&dest_url, api_base),
                    src: dest_url.into_string(),
                    offset: range.start,
                });
            }
            Event::Text(alt) | Event::Code(alt) => {
                if let Some(image) = open_image.as_mut() {
                    image.alt.get_or_insert_with(String::new).push_str(&alt);
                }
            }
            Event::End(TagEnd::Image) => references.extend(open_image.take()),
            Event::Html(html) => references.extend(html_images(&html, range.start, api_base)),
            _ => (),
        }
    }

    references
}

fn html_images(html: &str, offset: usize, api_base: &str) -> Vec<ImageReference> {
    HTML_IMAGE
        .captures_iter(html)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let src = captures.get(1)?.as_str();
            let alt = HTML_ALT
                .captures(whole.as_str())
                .and_then(|alt| alt.get(1))
                .map(|alt| alt.as_str().to_owned());

            Some(ImageReference {
                syntax: ImageSyntax::Html,
                alt,
                src: src.to_owned(),
                url: absolute_url(src, api_base),
                offset: offset + whole.start(),
            })
        })
        .collect()
}

/// The absolute URLs of the images of `text`, in source order. References that resolve to
/// nothing are dropped.
pub fn extract_image_urls(text: &str, api_base: &str) -> Vec<String> {
    extract_image_references(text, api_base)
        .into_iter()
        .filter_map(|reference| reference.url)
        .collect()
}

/// The JSON document stored next to a rich text field: its image references.
pub fn image_document(text: &str, api_base: &str) -> Value {
    let images = extract_image_references(text, api_base);
    serde_json::json!({ "images": images })
}

fn absolute_url(src: &str, api_base: &str) -> Option<String> {
    if src.starts_with("//") {
        return Some(format!("https:{src}"));
    }

    if src.starts_with('/') {
        return Some(format!("{api_base}{src}"));
    }

    let lowercase = src.to_ascii_lowercase();
    (lowercase.starts_with("http://") || lowercase.starts_with("https://")).then(|| src.to_owned())
}
