//! `graphs` documents

use super::{record_id, related_id, GraphVocabulary};
use crate::search::SearchDocument;
use crate::source::{path_str, related, DomainObject};

pub fn build_graph_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    let vocabulary = GraphVocabulary::collect([obj]);
    let is_annotated = !vocabulary.components.is_empty() || !vocabulary.positions.is_empty();

    // Annotation geometry is stored as an opaque structure
    let coordinates = related(obj, "annotation")
        .and_then(|annotation| annotation.to_json())
        .map(|annotation| annotation.to_string())
        .or_else(|| path_str(obj, "annotation"));

    let mut doc = SearchDocument::new(id);
    doc.set_opt("item_image", related_id(obj, "item_image"))
        .set_opt("image_iiif", path_str(obj, "item_image__image__iiif__info"))
        .set_opt("coordinates", coordinates)
        .set("is_annotated", is_annotated)
        .set_opt(
            "repository_name",
            path_str(obj, "item_image__item_part__current_item__repository__name"),
        )
        .set_opt(
            "repository_city",
            path_str(obj, "item_image__item_part__current_item__repository__place"),
        )
        .set_opt(
            "shelfmark",
            path_str(obj, "item_image__item_part__current_item__shelfmark"),
        )
        .set_opt(
            "date",
            path_str(obj, "item_image__item_part__historical_item__date__date"),
        )
        .set_opt("place", path_str(obj, "hand__place"))
        .set_opt("hand_name", path_str(obj, "hand__name"));
    vocabulary.apply(&mut doc);
    doc.set_opt("allograph", path_str(obj, "allograph__name"))
        .set_opt("character", path_str(obj, "allograph__character__name"))
        .set_opt("character_type", path_str(obj, "allograph__character__type"));

    vec![doc]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FieldValue;
    use serde_json::json;

    #[test]
    fn test_graph_document() {
        let docs = build_graph_document(&json!({
            "id": 7,
            "annotation": { "type": "Feature", "geometry": { "coordinates": [[1, 2]] } },
            "item_image": {
                "id": 100,
                "image": { "iiif": { "info": "https://iiif.example/100/info.json" } },
                "item_part": { "current_item": { "shelfmark": "MS 3" } }
            },
            "hand": { "name": "Hand A", "place": "Winchester" },
            "allograph": { "name": "a, Caroline", "character": { "name": "a", "type": "letter" } },
            "components": [],
            "positions": [{ "name": "initial" }]
        }));
        let doc = &docs[0];

        assert_eq!(doc.get("item_image"), Some(&FieldValue::Int(100)));
        assert_eq!(doc.get("is_annotated"), Some(&FieldValue::Bool(true)));
        assert_eq!(doc.get("hand_name").and_then(FieldValue::as_str), Some("Hand A"));
        assert_eq!(doc.get("character_type").and_then(FieldValue::as_str), Some("letter"));
        let coordinates = doc.get("coordinates").and_then(FieldValue::as_str).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(coordinates).unwrap();
        assert_eq!(parsed["type"], "Feature");
    }

    #[test]
    fn test_unannotated_graph() {
        let docs = build_graph_document(&json!({ "id": 8, "annotation": "{}" }));
        let doc = &docs[0];
        assert_eq!(doc.get("is_annotated"), Some(&FieldValue::Bool(false)));
        assert_eq!(doc.get("coordinates").and_then(FieldValue::as_str), Some("{}"));
        assert!(!doc.contains("allograph"));
    }
}
