//! Document builders: relational records in, flat search documents out
//!
//! Every builder has the same shape, `fn(&dyn DomainObject) -> Vec<SearchDocument>`.
//! The one-to-one builders return exactly one document (none when the record
//! has no id); the fan-out builders for clauses, people and places return one
//! document per annotated span in the record's transcription.

mod fragments;
mod graphs;
mod hands;
mod item_images;
mod item_parts;
pub mod markup;
mod scribes;
mod texts;

pub use fragments::{build_clause_documents, build_person_documents, build_place_documents};
pub use graphs::build_graph_document;
pub use hands::build_hand_document;
pub use item_images::build_item_image_document;
pub use item_parts::build_item_part_document;
pub use scribes::build_scribe_document;
pub use texts::build_text_document;

use crate::search::{IndexType, SearchDocument};
use crate::source::{path_int, path_str, path_value, related, related_many, DomainObject};

/// Uniform builder signature used by the registry and the orchestrator
pub type DocumentBuilder = fn(&dyn DomainObject) -> Vec<SearchDocument>;

/// The builder that feeds `index_type`
pub fn builder_for(index_type: IndexType) -> DocumentBuilder {
    match index_type {
        IndexType::ItemParts => build_item_part_document,
        IndexType::ItemImages => build_item_image_document,
        IndexType::Scribes => build_scribe_document,
        IndexType::Hands => build_hand_document,
        IndexType::Graphs => build_graph_document,
        IndexType::Texts => build_text_document,
        IndexType::Clauses => build_clause_documents,
        IndexType::People => build_person_documents,
        IndexType::Places => build_place_documents,
    }
}

/// Copy `date`, `date_min` and `date_max` from a date record, or nothing
fn set_date_fields(doc: &mut SearchDocument, date: Option<&dyn DomainObject>) {
    let Some(date) = date else {
        return;
    };
    doc.set_opt("date", path_str(date, "date"))
        .set_opt("date_min", path_value(date, "min_weight"))
        .set_opt("date_max", path_value(date, "max_weight"));
}

/// `"S 1, S 2"`: catalogue numbers of a historical item joined for display
fn catalogue_numbers_display(historical_item: Option<&dyn DomainObject>) -> String {
    historical_item
        .map(|item| {
            related_many(item, "catalogue_numbers")
                .into_iter()
                .filter_map(|number| path_str(number, "number"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Insertion-ordered distinct values
fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Component, feature and position names collected from annotated graphs
#[derive(Debug, Default)]
struct GraphVocabulary {
    components: Vec<String>,
    features: Vec<String>,
    component_features: Vec<String>,
    positions: Vec<String>,
}

impl GraphVocabulary {
    fn collect<'a>(graphs: impl IntoIterator<Item = &'a dyn DomainObject>) -> Self {
        let mut components = Vec::new();
        let mut features = Vec::new();
        let mut component_features = Vec::new();
        let mut positions = Vec::new();

        for graph in graphs {
            components.extend(
                related_many(graph, "components")
                    .into_iter()
                    .filter_map(|c| path_str(c, "name")),
            );
            for graph_component in related_many(graph, "graph_components") {
                let component = path_str(graph_component, "component__name");
                for feature in related_many(graph_component, "features") {
                    let Some(feature) = path_str(feature, "name") else {
                        continue;
                    };
                    if let Some(component) = &component {
                        component_features.push(format!("{} - {}", component, feature));
                    }
                    features.push(feature);
                }
            }
            positions.extend(
                related_many(graph, "positions")
                    .into_iter()
                    .filter_map(|p| path_str(p, "name")),
            );
        }

        Self {
            components: unique(components),
            features: unique(features),
            component_features: unique(component_features),
            positions: unique(positions),
        }
    }

    fn apply(self, doc: &mut SearchDocument) {
        doc.set("components", self.components)
            .set("features", self.features)
            .set("component_features", self.component_features)
            .set("positions", self.positions);
    }
}

/// Identifier of a record, or `None` when the record cannot be addressed
fn record_id(obj: &dyn DomainObject) -> Option<crate::search::FieldValue> {
    let id = path_value(obj, "id");
    if id.is_none() {
        tracing::debug!("Skipping record without id");
    }
    id
}

/// Integer id of a related record
fn related_id(obj: &dyn DomainObject, path: &str) -> Option<i64> {
    related(obj, path).and_then(|related| path_int(related, "id"))
}
