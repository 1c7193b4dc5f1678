//! `item-parts` documents

use super::{catalogue_numbers_display, record_id, set_date_fields};
use crate::search::SearchDocument;
use crate::source::{path_str, related, related_many, DomainObject};

/// One document per item part, with image counts denormalised
pub fn build_item_part_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    let historical_item = related(obj, "historical_item");
    let images = related_many(obj, "images").len();

    let mut doc = SearchDocument::new(id);
    doc.set_opt("repository_name", path_str(obj, "current_item__repository__name"))
        .set_opt("repository_city", path_str(obj, "current_item__repository__place"))
        .set_opt("shelfmark", path_str(obj, "current_item__shelfmark"))
        .set("catalogue_numbers", catalogue_numbers_display(historical_item));
    set_date_fields(&mut doc, historical_item.and_then(|item| related(item, "date")));
    doc.set_opt("type", path_str(obj, "historical_item__type"))
        .set_opt("format", path_str(obj, "historical_item__format__name"))
        .set("number_of_images", images)
        .set(
            "image_availability",
            if images > 0 { "With images" } else { "Without images" },
        );

    vec![doc]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FieldValue;
    use serde_json::json;

    fn item_part() -> serde_json::Value {
        json!({
            "id": 41,
            "current_item": {
                "shelfmark": "Cotton MS Augustus II 3",
                "repository": { "name": "British Library", "place": "London" }
            },
            "historical_item": {
                "type": "charter",
                "format": { "name": "single sheet" },
                "date": { "date": "s. x2", "min_weight": 950, "max_weight": 1000 },
                "catalogue_numbers": [{ "number": "S 1" }, { "number": "S 2" }]
            },
            "images": [{ "id": 1 }, { "id": 2 }, { "id": 3 }]
        })
    }

    #[test]
    fn test_full_item_part() {
        let docs = build_item_part_document(&item_part());
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];

        assert_eq!(doc.id(), Some(&FieldValue::Int(41)));
        assert_eq!(doc.get("repository_city").and_then(FieldValue::as_str), Some("London"));
        assert_eq!(doc.get("catalogue_numbers").and_then(FieldValue::as_str), Some("S 1, S 2"));
        assert_eq!(doc.get("date_min"), Some(&FieldValue::Int(950)));
        assert_eq!(doc.get("date_max"), Some(&FieldValue::Int(1000)));
        assert_eq!(doc.get("format").and_then(FieldValue::as_str), Some("single sheet"));
        assert_eq!(doc.get("number_of_images"), Some(&FieldValue::Int(3)));
        assert_eq!(
            doc.get("image_availability").and_then(FieldValue::as_str),
            Some("With images")
        );
    }

    #[test]
    fn test_missing_relations_are_omitted() {
        let docs = build_item_part_document(&json!({ "id": 2, "historical_item": null }));
        let doc = &docs[0];

        assert!(!doc.contains("repository_name"));
        assert!(!doc.contains("date"));
        assert!(!doc.contains("date_min"));
        assert_eq!(doc.get("catalogue_numbers").and_then(FieldValue::as_str), Some(""));
        assert_eq!(
            doc.get("image_availability").and_then(FieldValue::as_str),
            Some("Without images")
        );
    }

    #[test]
    fn test_rebuild_is_identical() {
        let record = item_part();
        assert_eq!(
            build_item_part_document(&record),
            build_item_part_document(&record)
        );
    }
}
