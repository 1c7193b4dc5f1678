//! `scribes` documents

use super::record_id;
use crate::search::SearchDocument;
use crate::source::{path_str, DomainObject};

pub fn build_scribe_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    // Period is either a plain label or a related record with a name
    let period = path_str(obj, "period")
        .or_else(|| path_str(obj, "period__name"))
        .unwrap_or_default();

    let mut doc = SearchDocument::new(id);
    doc.set_opt("name", path_str(obj, "name"))
        .set("period", period)
        .set("scriptorium", path_str(obj, "scriptorium").unwrap_or_default());

    vec![doc]
}
