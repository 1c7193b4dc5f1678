//! `item-images` documents

use super::{record_id, GraphVocabulary};
use crate::search::SearchDocument;
use crate::source::{path_str, related_many, DomainObject};

/// One document per image; graphs annotated on it become facet vocabularies
pub fn build_item_image_document(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let Some(id) = record_id(obj) else {
        return Vec::new();
    };
    let graphs = related_many(obj, "graphs");
    let number_of_annotations = graphs.len();

    let mut doc = SearchDocument::new(id);
    doc.set_opt("image_iiif", path_str(obj, "image__iiif__info"))
        .set_opt("locus", path_str(obj, "locus"))
        .set_opt(
            "repository_name",
            path_str(obj, "item_part__current_item__repository__name"),
        )
        .set_opt(
            "repository_city",
            path_str(obj, "item_part__current_item__repository__place"),
        )
        .set_opt("shelfmark", path_str(obj, "item_part__current_item__shelfmark"))
        .set_opt("date", path_str(obj, "item_part__historical_item__date__date"))
        .set_opt("type", path_str(obj, "item_part__historical_item__type"))
        .set("number_of_annotations", number_of_annotations);
    GraphVocabulary::collect(graphs).apply(&mut doc);

    vec![doc]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FieldValue;
    use serde_json::json;

    #[test]
    fn test_item_image_aggregates_graphs() {
        let docs = build_item_image_document(&json!({
            "id": 100,
            "locus": "f. 2r",
            "image": { "iiif": { "info": "https://iiif.example/100/info.json" } },
            "item_part": {
                "current_item": { "shelfmark": "MS 3", "repository": { "name": "Bodleian", "place": "Oxford" } },
                "historical_item": { "type": "charter", "date": { "date": "s. x" } }
            },
            "graphs": [
                {
                    "components": [{ "name": "ascender" }],
                    "graph_components": [
                        { "component": { "name": "ascender" }, "features": [{ "name": "wedged" }] }
                    ],
                    "positions": [{ "name": "medial" }]
                },
                {
                    "components": [{ "name": "ascender" }, { "name": "bowl" }],
                    "graph_components": [],
                    "positions": [{ "name": "medial" }]
                }
            ]
        }));
        let doc = &docs[0];

        assert_eq!(doc.get("number_of_annotations"), Some(&FieldValue::Int(2)));
        assert_eq!(
            doc.get("components"),
            Some(&FieldValue::List(vec!["ascender".into(), "bowl".into()]))
        );
        assert_eq!(
            doc.get("component_features"),
            Some(&FieldValue::List(vec!["ascender - wedged".into()]))
        );
        assert_eq!(doc.get("positions"), Some(&FieldValue::List(vec!["medial".into()])));
        assert_eq!(doc.get("date").and_then(FieldValue::as_str), Some("s. x"));
        assert_eq!(
            doc.get("image_iiif").and_then(FieldValue::as_str),
            Some("https://iiif.example/100/info.json")
        );
    }

    #[test]
    fn test_image_without_graphs_has_empty_lists() {
        let docs = build_item_image_document(&json!({ "id": 1 }));
        let doc = &docs[0];
        assert_eq!(doc.get("number_of_annotations"), Some(&FieldValue::Int(0)));
        assert_eq!(doc.get("features"), Some(&FieldValue::List(vec![])));
        assert!(!doc.contains("locus"));
    }
}
