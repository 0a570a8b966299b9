/// Vessel registry for float time estimates.
///
/// Defines the built-in paddling craft and their baseline speeds on
/// moving flatwater. Catalog entries in `floatplan.toml` may override any
/// of these or add new ones; this list is the fallback when they don't.

use crate::model::VesselType;

/// Slug used when a request doesn't name a vessel.
pub const DEFAULT_VESSEL: &str = "canoe";

/// Built-in vessel metadata.
pub struct Vessel {
    pub slug: &'static str,
    pub name: &'static str,
    /// Typical drift-plus-paddle speed, miles per hour.
    pub speed_mph: f64,
}

/// Baseline speeds for a relaxed float with occasional paddling.
pub static VESSEL_REGISTRY: &[Vessel] = &[
    Vessel {
        slug: "canoe",
        name: "Canoe",
        speed_mph: 2.5,
    },
    Vessel {
        slug: "kayak",
        name: "Kayak",
        speed_mph: 3.0,
    },
    Vessel {
        slug: "raft",
        name: "Raft",
        speed_mph: 2.0,
    },
    Vessel {
        slug: "tube",
        name: "Tube",
        speed_mph: 1.5,
    },
];

impl Vessel {
    pub fn to_vessel_type(&self) -> VesselType {
        VesselType {
            slug: self.slug.to_string(),
            name: self.name.to_string(),
            speed_mph: self.speed_mph,
        }
    }
}

/// Looks up a built-in vessel by slug. Returns `None` if not found.
pub fn find_vessel(slug: &str) -> Option<VesselType> {
    VESSEL_REGISTRY
        .iter()
        .find(|v| v.slug == slug)
        .map(Vessel::to_vessel_type)
}

pub fn all_slugs() -> Vec<&'static str> {
    VESSEL_REGISTRY.iter().map(|v| v.slug).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_speeds_positive() {
        for vessel in VESSEL_REGISTRY {
            assert!(
                vessel.speed_mph > 0.0,
                "speed for '{}' must be positive, got {}",
                vessel.slug,
                vessel.speed_mph
            );
        }
    }

    #[test]
    fn test_no_duplicate_slugs() {
        let mut seen = std::collections::HashSet::new();
        for vessel in VESSEL_REGISTRY {
            assert!(seen.insert(vessel.slug), "duplicate slug '{}'", vessel.slug);
        }
    }

    #[test]
    fn test_default_vessel_is_registered() {
        assert!(find_vessel(DEFAULT_VESSEL).is_some());
    }

    #[test]
    fn test_canoe_and_raft_differ() {
        let canoe = find_vessel("canoe").expect("canoe should be registered");
        let raft = find_vessel("raft").expect("raft should be registered");
        assert_eq!(canoe.speed_mph, 2.5);
        assert!(raft.speed_mph < canoe.speed_mph);
    }

    #[test]
    fn test_find_vessel_unknown() {
        assert!(find_vessel("pontoon").is_none());
        assert_eq!(all_slugs().len(), VESSEL_REGISTRY.len());
    }
}
