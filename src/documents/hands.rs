//! `hands` documents

use super::record_id;
use crate::search::SearchDocument;
use crate::source::{path_str, related_many, DomainObject};

pub fn build_hand_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    let catalogue_numbers: Vec<String> =
        related_many(obj, "item_part__historical_item__catalogue_numbers")
            .into_iter()
            .filter_map(|number| {
                let value = path_str(number, "number")?;
                Some(match path_str(number, "catalogue__label") {
                    Some(label) => format!("{} {}", label, value),
                    None => value,
                })
            })
            .collect();

    let mut doc = SearchDocument::new(id);
    doc.set_opt("name", path_str(obj, "name"))
        .set("place", path_str(obj, "place").unwrap_or_default())
        .set("description", path_str(obj, "description").unwrap_or_default())
        .set_opt(
            "repository_name",
            path_str(obj, "item_part__current_item__repository__name"),
        )
        .set_opt(
            "repository_city",
            path_str(obj, "item_part__current_item__repository__place"),
        )
        .set_opt("shelfmark", path_str(obj, "item_part__current_item__shelfmark"))
        .set("catalogue_numbers", catalogue_numbers)
        .set_opt("date", path_str(obj, "date__date"));

    vec![doc]
}
