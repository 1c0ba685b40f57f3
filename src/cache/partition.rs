//! The partition registry: every cached view, and what invalidates it
//!
//! Partitions are a closed enum rather than ad-hoc string keys so that the
//! mutation-to-partition mapping below is checked by the compiler. Review
//! [`partitions_for_topic`] whenever a new derived view of an entity is
//! added — an entry missing from that table is exactly the class of
//! staleness bug this layer exists to prevent.

use serde::{Deserialize, Serialize};

/// A named subset of the local cache, corresponding to one query or view
/// over remote survey data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// The full species list view
    SpeciesList,
    /// Per-species detail records, keyed by species name
    SpeciesDetail,
    /// Sighting locations per species, keyed by species name
    SpeciesLocations,
    /// Aggregate sighting counts
    SpeciesCounts,
    /// The survey location list view
    LocationList,
    /// Per-location detail records, keyed by location name
    LocationDetail,
    /// Media gallery listings, keyed by species name
    MediaGallery,
    /// The flat media index
    MediaIndex,
    /// The team roster view
    TeamRoster,
    /// Decoded image payloads (volatile)
    ImageCache,
    /// Decoded audio payloads (volatile)
    AudioCache,
    /// Short-lived scratch data (volatile)
    ScratchCache,
}

impl Partition {
    /// Every known partition. "Purge all" iterates exactly this registry.
    pub const ALL: [Partition; 12] = [
        Partition::SpeciesList,
        Partition::SpeciesDetail,
        Partition::SpeciesLocations,
        Partition::SpeciesCounts,
        Partition::LocationList,
        Partition::LocationDetail,
        Partition::MediaGallery,
        Partition::MediaIndex,
        Partition::TeamRoster,
        Partition::ImageCache,
        Partition::AudioCache,
        Partition::ScratchCache,
    ];

    /// Partitions holding reclaimable decoded payloads, cleared on recovery.
    pub const VOLATILE: [Partition; 3] = [
        Partition::ImageCache,
        Partition::AudioCache,
        Partition::ScratchCache,
    ];

    pub fn is_volatile(self) -> bool {
        Partition::VOLATILE.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Partition::SpeciesList => "species_list",
            Partition::SpeciesDetail => "species_detail",
            Partition::SpeciesLocations => "species_locations",
            Partition::SpeciesCounts => "species_counts",
            Partition::LocationList => "location_list",
            Partition::LocationDetail => "location_detail",
            Partition::MediaGallery => "media_gallery",
            Partition::MediaIndex => "media_index",
            Partition::TeamRoster => "team_roster",
            Partition::ImageCache => "image_cache",
            Partition::AudioCache => "audio_cache",
            Partition::ScratchCache => "scratch_cache",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A mutation category, used to look up which partitions it can stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// A species record changed
    Species,
    /// A survey location changed
    Location,
    /// A media item changed
    Media,
    /// The team roster changed
    Team,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Species => write!(f, "species"),
            Topic::Location => write!(f, "location"),
            Topic::Media => write!(f, "media"),
            Topic::Team => write!(f, "team"),
        }
    }
}

/// Every partition that can hold a derived or denormalized copy of data
/// touched by a mutation of the given topic.
///
/// This table is the single source of truth for write-triggered
/// invalidation. When a new view over an entity is introduced, it must be
/// added to every topic that can change the data it renders.
pub fn partitions_for_topic(topic: Topic) -> &'static [Partition] {
    match topic {
        // A species change reaches the list, its detail and location views,
        // the aggregate counts, and the gallery listing headed by the species.
        Topic::Species => &[
            Partition::SpeciesList,
            Partition::SpeciesDetail,
            Partition::SpeciesLocations,
            Partition::SpeciesCounts,
            Partition::MediaGallery,
        ],
        // A location change also invalidates the per-species location views
        // and the counts aggregated over locations.
        Topic::Location => &[
            Partition::LocationList,
            Partition::LocationDetail,
            Partition::SpeciesLocations,
            Partition::SpeciesCounts,
        ],
        // Media changes surface in galleries, the flat index, and the
        // species detail (which embeds a cover image reference).
        Topic::Media => &[
            Partition::MediaGallery,
            Partition::MediaIndex,
            Partition::SpeciesDetail,
        ],
        Topic::Team => &[Partition::TeamRoster],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_is_complete_and_distinct() {
        let unique: HashSet<_> = Partition::ALL.iter().collect();
        assert_eq!(unique.len(), Partition::ALL.len());
    }

    #[test]
    fn test_volatile_subset() {
        for p in Partition::VOLATILE {
            assert!(p.is_volatile());
            assert!(Partition::ALL.contains(&p));
        }
        assert!(!Partition::SpeciesList.is_volatile());
        assert!(!Partition::TeamRoster.is_volatile());
    }

    #[test]
    fn test_topic_mappings_stay_inside_registry() {
        for topic in [Topic::Species, Topic::Location, Topic::Media, Topic::Team] {
            let mapped = partitions_for_topic(topic);
            assert!(!mapped.is_empty());
            for p in mapped {
                assert!(Partition::ALL.contains(p), "{topic}: {p} not registered");
            }
            // No duplicates within a mapping.
            let unique: HashSet<_> = mapped.iter().collect();
            assert_eq!(unique.len(), mapped.len());
        }
    }

    #[test]
    fn test_species_mutation_reaches_derived_views() {
        let mapped = partitions_for_topic(Topic::Species);
        assert!(mapped.contains(&Partition::SpeciesList));
        assert!(mapped.contains(&Partition::SpeciesDetail));
        assert!(mapped.contains(&Partition::SpeciesLocations));
        assert!(mapped.contains(&Partition::SpeciesCounts));
        assert!(mapped.contains(&Partition::MediaGallery));
        // ...and not unrelated views.
        assert!(!mapped.contains(&Partition::TeamRoster));
        assert!(!mapped.contains(&Partition::LocationList));
    }

    #[test]
    fn test_volatile_partitions_never_topic_mapped() {
        // Volatile caches are cleared by recovery, not by mutations.
        for topic in [Topic::Species, Topic::Location, Topic::Media, Topic::Team] {
            for p in partitions_for_topic(topic) {
                assert!(!p.is_volatile(), "{topic} maps volatile partition {p}");
            }
        }
    }
}
