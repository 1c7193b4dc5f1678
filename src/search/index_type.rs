//! Logical search indexes and the relational models behind them

use super::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Every search index the catalogue exposes.
///
/// `Display`/`FromStr` use the kebab-case URL segment (`item-parts`);
/// [`IndexType::internal_id`] is the snake_case engine id (`item_parts`).
/// Declaration order is the registry order used by catalogue-wide runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IndexType {
    ItemParts,
    ItemImages,
    Scribes,
    Hands,
    Graphs,
    Texts,
    Clauses,
    People,
    Places,
}

impl IndexType {
    /// URL segment, e.g. `item-images`
    pub fn segment(self) -> &'static str {
        self.into()
    }

    /// Engine-side id before prefixing, e.g. `item_images`
    pub fn internal_id(self) -> &'static str {
        match self {
            IndexType::ItemParts => "item_parts",
            IndexType::ItemImages => "item_images",
            IndexType::Scribes => "scribes",
            IndexType::Hands => "hands",
            IndexType::Graphs => "graphs",
            IndexType::Texts => "texts",
            IndexType::Clauses => "clauses",
            IndexType::People => "people",
            IndexType::Places => "places",
        }
    }

    /// Human label shown in admin views
    pub fn label(self) -> &'static str {
        match self {
            IndexType::ItemParts => "Item Parts",
            IndexType::ItemImages => "Item Images",
            IndexType::Scribes => "Scribes",
            IndexType::Hands => "Hands",
            IndexType::Graphs => "Graphs",
            IndexType::Texts => "Texts",
            IndexType::Clauses => "Clauses",
            IndexType::People => "People",
            IndexType::Places => "Places",
        }
    }

    /// Relational model the index is built from
    pub fn source_model(self) -> SourceModel {
        match self {
            IndexType::ItemParts => SourceModel::ItemPart,
            IndexType::ItemImages => SourceModel::ItemImage,
            IndexType::Scribes => SourceModel::Scribe,
            IndexType::Hands => SourceModel::Hand,
            IndexType::Graphs => SourceModel::Graph,
            IndexType::Texts | IndexType::Clauses | IndexType::People | IndexType::Places => {
                SourceModel::ImageText
            }
        }
    }

    /// Whether one source record may yield zero or many documents
    pub fn is_fan_out(self) -> bool {
        matches!(
            self,
            IndexType::Clauses | IndexType::People | IndexType::Places
        )
    }
}

/// Relational aggregates that feed the indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum SourceModel {
    ItemPart,
    ItemImage,
    Scribe,
    Hand,
    Graph,
    ImageText,
}

impl SourceModel {
    /// Collection name in catalogue exports
    pub fn collection(self) -> &'static str {
        match self {
            SourceModel::ItemPart => "item_parts",
            SourceModel::ItemImage => "item_images",
            SourceModel::Scribe => "scribes",
            SourceModel::Hand => "hands",
            SourceModel::Graph => "graphs",
            SourceModel::ImageText => "image_texts",
        }
    }
}

/// Map a URL segment to its index type
pub fn resolve_segment(segment: &str) -> SearchResult<IndexType> {
    segment
        .parse()
        .map_err(|_| SearchError::UnknownIndexType(segment.to_string()))
}

/// All index types in registry order
pub fn all_index_types() -> Vec<IndexType> {
    IndexType::iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_round_trip_for_every_index() {
        for index_type in IndexType::iter() {
            assert_eq!(resolve_segment(index_type.segment()).unwrap(), index_type);
        }
    }

    #[test]
    fn test_unknown_segment_is_error() {
        let err = resolve_segment("not-a-real-index").unwrap_err();
        assert!(matches!(err, SearchError::UnknownIndexType(ref s) if s == "not-a-real-index"));
        // Internal ids are not URL segments
        assert!(resolve_segment("item_parts").is_err());
    }

    #[test]
    fn test_segment_and_internal_id_forms() {
        assert_eq!(IndexType::ItemImages.segment(), "item-images");
        assert_eq!(IndexType::ItemImages.internal_id(), "item_images");
        assert_eq!(IndexType::ItemImages.to_string(), "item-images");
    }

    #[test]
    fn test_fan_out_indexes_share_text_model() {
        for index_type in [IndexType::Texts, IndexType::Clauses, IndexType::People, IndexType::Places] {
            assert_eq!(index_type.source_model(), SourceModel::ImageText);
        }
        assert!(!IndexType::Texts.is_fan_out());
        assert!(IndexType::Places.is_fan_out());
    }

    #[test]
    fn test_registry_order() {
        let all = all_index_types();
        assert_eq!(all.len(), 9);
        assert_eq!(all[0], IndexType::ItemParts);
        assert_eq!(all[8], IndexType::Places);
    }
}
