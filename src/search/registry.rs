//! Static per-index configuration
//!
//! Binds every [`IndexType`] to its source model, its document builder and
//! the attribute lists pushed to the engine as index settings. The
//! registry is built once at startup and shared behind an `Arc`.

use super::document::SearchDocument;
use super::index_type::{IndexType, SourceModel};
use crate::documents::{builder_for, DocumentBuilder};
use crate::source::DomainObject;
use strum::IntoEnumIterator;

/// Immutable description of one search index
#[derive(Clone)]
pub struct IndexRegistration {
    pub index_type: IndexType,
    pub url_segment: &'static str,
    pub source_model: SourceModel,
    pub builder: DocumentBuilder,
    pub filterable_attributes: &'static [&'static str],
    pub sortable_attributes: &'static [&'static str],
    pub searchable_attributes: &'static [&'static str],
    pub default_facet_attributes: &'static [&'static str],
}

impl IndexRegistration {
    fn new(index_type: IndexType) -> Self {
        let attributes = attributes_for(index_type);
        Self {
            index_type,
            url_segment: index_type.segment(),
            source_model: index_type.source_model(),
            builder: builder_for(index_type),
            filterable_attributes: attributes.filterable,
            sortable_attributes: attributes.sortable,
            searchable_attributes: attributes.searchable,
            default_facet_attributes: attributes.default_facets,
        }
    }

    pub fn is_filterable(&self, attribute: &str) -> bool {
        self.filterable_attributes.contains(&attribute)
    }

    pub fn is_sortable(&self, attribute: &str) -> bool {
        self.sortable_attributes.contains(&attribute)
    }

    /// Run the builder for one record
    pub fn build(&self, obj: &dyn DomainObject) -> Vec<SearchDocument> {
        (self.builder)(obj)
    }
}

impl std::fmt::Debug for IndexRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistration")
            .field("index_type", &self.index_type)
            .field("source_model", &self.source_model)
            .field("filterable_attributes", &self.filterable_attributes)
            .field("sortable_attributes", &self.sortable_attributes)
            .finish_non_exhaustive()
    }
}

/// Lookup table over every index, addressed by type or URL segment
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    registrations: Vec<IndexRegistration>,
    index_prefix: String,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Registry whose engine uids start with `index_prefix`
    pub fn with_prefix(index_prefix: impl Into<String>) -> Self {
        Self {
            registrations: IndexType::iter().map(IndexRegistration::new).collect(),
            index_prefix: index_prefix.into(),
        }
    }

    pub fn get(&self, index_type: IndexType) -> &IndexRegistration {
        // Built from `IndexType::iter()`, so position equals discriminant
        &self.registrations[index_type as usize]
    }

    pub fn by_segment(&self, segment: &str) -> super::SearchResult<&IndexRegistration> {
        super::resolve_segment(segment).map(|index_type| self.get(index_type))
    }

    /// Registrations in registry order
    pub fn iter(&self) -> impl Iterator<Item = &IndexRegistration> {
        self.registrations.iter()
    }

    /// Engine uid for an index: prefix + snake_case id
    pub fn uid(&self, index_type: IndexType) -> String {
        format!("{}{}", self.index_prefix, index_type.internal_id())
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct AttributeSets {
    filterable: &'static [&'static str],
    sortable: &'static [&'static str],
    searchable: &'static [&'static str],
    default_facets: &'static [&'static str],
}

fn attributes_for(index_type: IndexType) -> AttributeSets {
    match index_type {
        IndexType::ItemParts => AttributeSets {
            filterable: &[
                "id",
                "repository_name",
                "repository_city",
                "shelfmark",
                "catalogue_numbers",
                "date",
                "date_min",
                "date_max",
                "type",
                "format",
                "number_of_images",
                "image_availability",
            ],
            sortable: &[
                "id",
                "repository_name",
                "repository_city",
                "shelfmark",
                "catalogue_numbers",
                "type",
                "number_of_images",
                "date_min",
                "date_max",
            ],
            searchable: &[
                "repository_name",
                "repository_city",
                "shelfmark",
                "catalogue_numbers",
                "type",
            ],
            default_facets: &[
                "image_availability",
                "type",
                "repository_city",
                "repository_name",
                "format",
                "date_min",
                "date_max",
            ],
        },
        IndexType::ItemImages => AttributeSets {
            filterable: &[
                "id",
                "locus",
                "repository_name",
                "repository_city",
                "shelfmark",
                "date",
                "type",
                "number_of_annotations",
                "components",
                "features",
                "component_features",
                "positions",
            ],
            sortable: &[
                "id",
                "repository_name",
                "repository_city",
                "shelfmark",
                "type",
                "number_of_annotations",
            ],
            searchable: &[
                "locus",
                "repository_name",
                "shelfmark",
                "components",
                "features",
            ],
            default_facets: &[
                "locus",
                "type",
                "repository_city",
                "repository_name",
                "components",
                "features",
                "component_features",
            ],
        },
        IndexType::Scribes => AttributeSets {
            filterable: &["id", "name", "period", "scriptorium"],
            sortable: &["id", "name", "scriptorium"],
            searchable: &["name", "scriptorium"],
            default_facets: &["scriptorium"],
        },
        IndexType::Hands => AttributeSets {
            filterable: &[
                "id",
                "name",
                "place",
                "repository_name",
                "repository_city",
                "shelfmark",
                "catalogue_numbers",
                "date",
            ],
            sortable: &[
                "id",
                "name",
                "repository_name",
                "repository_city",
                "shelfmark",
                "place",
                "catalogue_numbers",
            ],
            searchable: &[
                "name",
                "place",
                "description",
                "repository_name",
                "shelfmark",
            ],
            default_facets: &["repository_city", "repository_name", "place"],
        },
        IndexType::Graphs => AttributeSets {
            filterable: &[
                "id",
                "item_image",
                "repository_name",
                "repository_city",
                "shelfmark",
                "date",
                "place",
                "hand_name",
                "components",
                "features",
                "component_features",
                "positions",
                "allograph",
                "character",
                "character_type",
                "is_annotated",
            ],
            sortable: &[
                "id",
                "repository_name",
                "repository_city",
                "shelfmark",
                "allograph",
            ],
            searchable: &[
                "repository_name",
                "shelfmark",
                "allograph",
                "character",
                "hand_name",
                "components",
            ],
            default_facets: &[
                "repository_city",
                "repository_name",
                "allograph",
                "character",
                "character_type",
                "components",
                "features",
                "component_features",
                "positions",
            ],
        },
        IndexType::Texts => AttributeSets {
            filterable: &[
                "id",
                "item_image",
                "item_part",
                "repository_name",
                "repository_city",
                "shelfmark",
                "text_type",
                "date",
                "date_min",
                "date_max",
                "catalogue_numbers",
                "locus",
                "type",
                "status",
                "language",
                "places",
                "people",
            ],
            sortable: &[
                "id",
                "repository_name",
                "repository_city",
                "shelfmark",
                "text_type",
                "date_min",
                "date_max",
            ],
            searchable: &[
                "content",
                "repository_name",
                "shelfmark",
                "catalogue_numbers",
                "places",
                "people",
            ],
            default_facets: &[
                "text_type",
                "status",
                "language",
                "type",
                "repository_city",
                "repository_name",
                "places",
                "people",
                "date_min",
                "date_max",
            ],
        },
        IndexType::Clauses => AttributeSets {
            filterable: &[
                "id",
                "item_image",
                "item_part",
                "clause_type",
                "repository_name",
                "repository_city",
                "shelfmark",
                "text_type",
                "date",
                "date_min",
                "date_max",
                "catalogue_numbers",
                "locus",
                "type",
                "status",
            ],
            sortable: &[
                "id",
                "clause_type",
                "repository_name",
                "repository_city",
                "shelfmark",
                "date_min",
                "date_max",
            ],
            searchable: &["content", "clause_type", "repository_name", "shelfmark"],
            default_facets: &[
                "clause_type",
                "text_type",
                "type",
                "repository_city",
                "repository_name",
                "date_min",
                "date_max",
            ],
        },
        IndexType::People => AttributeSets {
            filterable: &[
                "id",
                "item_image",
                "item_part",
                "name",
                "person_type",
                "ref",
                "repository_name",
                "repository_city",
                "shelfmark",
                "text_type",
                "date",
                "date_min",
                "date_max",
                "catalogue_numbers",
                "locus",
                "type",
                "status",
            ],
            sortable: &[
                "id",
                "name",
                "person_type",
                "repository_name",
                "repository_city",
                "shelfmark",
                "date_min",
                "date_max",
            ],
            searchable: &["name", "person_type", "repository_name", "shelfmark"],
            default_facets: &[
                "person_type",
                "text_type",
                "type",
                "repository_city",
                "repository_name",
                "date_min",
                "date_max",
            ],
        },
        IndexType::Places => AttributeSets {
            filterable: &[
                "id",
                "item_image",
                "item_part",
                "name",
                "place_type",
                "ref",
                "repository_name",
                "repository_city",
                "shelfmark",
                "text_type",
                "date",
                "date_min",
                "date_max",
                "catalogue_numbers",
                "locus",
                "type",
                "status",
            ],
            sortable: &[
                "id",
                "name",
                "place_type",
                "repository_name",
                "repository_city",
                "shelfmark",
                "date_min",
                "date_max",
            ],
            searchable: &["name", "place_type", "repository_name", "shelfmark"],
            default_facets: &[
                "place_type",
                "text_type",
                "type",
                "repository_city",
                "repository_name",
                "date_min",
                "date_max",
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_index_type_has_one_registration() {
        let registry = IndexRegistry::new();
        assert_eq!(registry.iter().count(), 9);
        for index_type in IndexType::iter() {
            assert_eq!(registry.get(index_type).index_type, index_type);
            assert_eq!(registry.get(index_type).url_segment, index_type.segment());
        }
    }

    #[test]
    fn test_attribute_sets_are_consistent() {
        let registry = IndexRegistry::new();
        for registration in registry.iter() {
            for facet in registration.default_facet_attributes {
                assert!(
                    registration.is_filterable(facet),
                    "{} facet {} must be filterable",
                    registration.url_segment,
                    facet
                );
            }
            assert!(registration.is_filterable("id"));
            assert!(registration.is_sortable("id"));
        }
    }

    #[test]
    fn test_uid_uses_prefix_and_internal_id() {
        let registry = IndexRegistry::with_prefix("staging_");
        assert_eq!(registry.uid(IndexType::ItemImages), "staging_item_images");
        assert_eq!(IndexRegistry::new().uid(IndexType::People), "people");
    }

    #[test]
    fn test_by_segment() {
        let registry = IndexRegistry::new();
        assert_eq!(
            registry.by_segment("hands").unwrap().source_model,
            SourceModel::Hand
        );
        assert!(registry.by_segment("manuscripts").is_err());
    }
}
