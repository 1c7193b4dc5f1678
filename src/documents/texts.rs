//! `texts` documents

use super::fragments::text_metadata;
use super::markup::{extract_all, strip_markup, unique_names};
use super::record_id;
use crate::search::SearchDocument;
use crate::source::{path_str, DomainObject};

/// One document per image text with markup stripped for full-text search
pub fn build_text_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    let content = path_str(obj, "content").unwrap_or_default();
    let (places, people) = if content.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let found = extract_all(&content);
        (unique_names(found.places), unique_names(found.people))
    };

    let mut doc = SearchDocument::new(id);
    doc.merge(&text_metadata(obj))
        .set("content", strip_markup(&content))
        .set_opt("language", path_str(obj, "language"))
        .set("places", places)
        .set("people", people);

    vec![doc]
}
