//! Fan-out documents for `clauses`, `people` and `places`
//!
//! Each annotated span in an image text's transcription becomes its own
//! document. Metadata about the text, its image and its manuscript is
//! computed once per record and merged into every fragment.

use super::markup::{extract_all, Mention};
use super::{catalogue_numbers_display, related_id, set_date_fields};
use crate::search::{FieldValue, SearchDocument};
use crate::source::{path_str, related, DomainObject};

/// Attributes shared by a text and every fragment cut from it (no `id`)
pub(super) fn text_metadata(obj: &dyn DomainObject) -> SearchDocument {
    let item_image = related(obj, "item_image");
    let historical_item = related(obj, "item_image__item_part__historical_item");

    let mut shared = SearchDocument::default();
    shared
        .set_opt("item_image", related_id(obj, "item_image"))
        .set_opt("item_part", related_id(obj, "item_image__item_part"))
        .set_opt("text_type", path_str(obj, "type"))
        .set_opt(
            "repository_city",
            path_str(obj, "item_image__item_part__current_item__repository__place"),
        )
        .set_opt(
            "repository_name",
            path_str(obj, "item_image__item_part__current_item__repository__name"),
        )
        .set_opt(
            "shelfmark",
            path_str(obj, "item_image__item_part__current_item__shelfmark"),
        );
    set_date_fields(&mut shared, historical_item.and_then(|item| related(item, "date")));
    shared.set("catalogue_numbers", catalogue_numbers_display(historical_item));
    if let Some(image) = item_image {
        shared.set("locus", path_str(image, "locus").unwrap_or_default());
    } else {
        shared.set("locus", "");
    }
    shared
        .set_opt(
            "type",
            path_str(obj, "item_image__item_part__historical_item__type"),
        )
        .set_opt("status", path_str(obj, "status"))
        .set_opt(
            "thumbnail_iiif",
            path_str(obj, "item_image__image__iiif__info"),
        );
    shared
}

fn parent_id(obj: &dyn DomainObject) -> Option<String> {
    path_str(obj, "id")
}

fn content(obj: &dyn DomainObject) -> Option<String> {
    path_str(obj, "content").filter(|content| !content.is_empty())
}

/// One document per `data-dpt="clause"` span, ids `<text id>_<n>`
pub fn build_clause_documents(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let (Some(parent), Some(content)) = (parent_id(obj), content(obj)) else {
        return Vec::new();
    };
    let clauses = extract_all(&content).clauses;
    if clauses.is_empty() {
        return Vec::new();
    }

    let shared = text_metadata(obj);
    clauses
        .into_iter()
        .enumerate()
        .map(|(idx, clause)| {
            let mut doc = SearchDocument::new(format!("{}_{}", parent, idx));
            doc.set("clause_type", clause.clause_type)
                .set("content", clause.content)
                .merge(&shared);
            doc
        })
        .collect()
}

/// One document per `data-dpt="person"` span, ids `<text id>_p<n>`
pub fn build_person_documents(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let (Some(parent), Some(content)) = (parent_id(obj), content(obj)) else {
        return Vec::new();
    };
    mention_documents(obj, &parent, "p", "person_type", extract_all(&content).people)
}

/// One document per `data-dpt="place"` span, ids `<text id>_l<n>`
pub fn build_place_documents(obj: &dyn DomainObject) -> Vec<SearchDocument> {
    let (Some(parent), Some(content)) = (parent_id(obj), content(obj)) else {
        return Vec::new();
    };
    mention_documents(obj, &parent, "l", "place_type", extract_all(&content).places)
}

fn mention_documents(
    obj: &dyn DomainObject,
    parent: &str,
    id_marker: &str,
    type_attribute: &str,
    mentions: Vec<Mention>,
) -> Vec<SearchDocument> {
    if mentions.is_empty() {
        return Vec::new();
    }

    let shared = text_metadata(obj);
    mentions
        .into_iter()
        .enumerate()
        .map(|(idx, mention)| {
            let mut doc =
                SearchDocument::new(FieldValue::Str(format!("{}_{}{}", parent, id_marker, idx)));
            doc.set("name", mention.name)
                .set(type_attribute, mention.mention_type)
                .set("ref", mention.reference)
                .merge(&shared);
            doc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image_text(content: &str) -> serde_json::Value {
        json!({
            "id": 31,
            "type": "Transcription",
            "status": "Live",
            "content": content,
            "item_image": {
                "id": 100,
                "locus": "f. 1r",
                "image": { "iiif": { "info": "https://iiif.example/100/info.json" } },
                "item_part": {
                    "id": 41,
                    "current_item": {
                        "shelfmark": "MS 3",
                        "repository": { "name": "Bodleian", "place": "Oxford" }
                    },
                    "historical_item": {
                        "type": "charter",
                        "date": { "date": "s. x2", "min_weight": 950, "max_weight": 1000 },
                        "catalogue_numbers": [{ "number": "S 1" }]
                    }
                }
            }
        })
    }

    #[test]
    fn test_clause_fragments_carry_shared_metadata() {
        let record = image_text(concat!(
            r#"<p><span data-dpt="clause" data-dpt-type="address">To <i>all</i></span>"#,
            r#"<span data-dpt="clause" data-dpt-type="sanction">Curse</span></p>"#
        ));
        let docs = build_clause_documents(&record);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id_string().as_deref(), Some("31_0"));
        assert_eq!(docs[1].id_string().as_deref(), Some("31_1"));
        assert_eq!(docs[0].get("content").and_then(FieldValue::as_str), Some("To all"));
        assert_eq!(docs[1].get("clause_type").and_then(FieldValue::as_str), Some("sanction"));
        for doc in &docs {
            assert_eq!(doc.get("item_part"), Some(&FieldValue::Int(41)));
            assert_eq!(doc.get("date_min"), Some(&FieldValue::Int(950)));
            assert_eq!(doc.get("catalogue_numbers").and_then(FieldValue::as_str), Some("S 1"));
            assert_eq!(doc.get("text_type").and_then(FieldValue::as_str), Some("Transcription"));
            assert_eq!(doc.get("locus").and_then(FieldValue::as_str), Some("f. 1r"));
        }
    }

    #[test]
    fn test_people_and_places_ids() {
        let record = image_text(concat!(
            r#"<span data-dpt="person" data-dpt-type="name" data-dpt-ref="viaf:9">Oswald</span>"#,
            r#"<span data-dpt="place" data-dpt-type="estate">Ripple</span>"#,
            r#"<span data-dpt="person">Wulfstan</span>"#
        ));

        let people = build_person_documents(&record);
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].id_string().as_deref(), Some("31_p0"));
        assert_eq!(people[0].get("ref").and_then(FieldValue::as_str), Some("viaf:9"));
        assert_eq!(people[1].get("person_type").and_then(FieldValue::as_str), Some(""));

        let places = build_place_documents(&record);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id_string().as_deref(), Some("31_l0"));
        assert_eq!(places[0].get("place_type").and_then(FieldValue::as_str), Some("estate"));
        assert_eq!(places[0].get("repository_city").and_then(FieldValue::as_str), Some("Oxford"));
    }

    #[test]
    fn test_no_markup_no_fragments() {
        let record = image_text("<p>Plain transcription</p>");
        assert!(build_clause_documents(&record).is_empty());
        assert!(build_person_documents(&record).is_empty());
        assert!(build_place_documents(&record).is_empty());
        assert!(build_clause_documents(&image_text("")).is_empty());
    }

    #[test]
    fn test_fragments_are_deterministic() {
        let record = image_text(r#"<span data-dpt="clause" data-dpt-type="a">x</span>"#);
        assert_eq!(build_clause_documents(&record), build_clause_documents(&record));
    }
}
