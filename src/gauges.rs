/// Gauge selection for a river section.
///
/// A river may be linked to several gauge stations. The resolver picks the
/// one that governs a section: the association flagged primary wins, and
/// ties (or the absence of a primary) go to the gauge closest to the
/// section. Rivers without any association fall back to the nearest known
/// gauge by straight-line distance, which is reported as advisory only.

use log::debug;

use crate::geometry::{MileIndex, haversine_miles};
use crate::model::{Coordinate, GaugeStation, RiverGaugeAssociation};
use crate::thresholds::DualThresholds;

/// The gauge chosen for a section, with how far it is from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGauge {
    pub gauge: GaugeStation,
    /// Thresholds for this river. Advisory gauges have none.
    pub thresholds: Option<DualThresholds>,
    pub distance_miles: f64,
    /// Not associated with the river; readings are context only.
    pub advisory: bool,
    /// Set when the gauge is farther than its configured tolerance.
    pub accuracy_warning: Option<String>,
}

fn section_distance(
    association: &RiverGaugeAssociation,
    section: Coordinate,
) -> f64 {
    association
        .distance_from_section_miles
        .unwrap_or_else(|| haversine_miles(association.gauge.coordinate, section))
}

/// Picks the governing gauge for the section at `mile`.
///
/// Returns `None` when the river has no associated gauges.
/// `default_warning_miles` applies to associations without their own
/// accuracy tolerance.
pub fn resolve(
    associations: &[RiverGaugeAssociation],
    index: &MileIndex,
    mile: f64,
    default_warning_miles: Option<f64>,
) -> Option<ResolvedGauge> {
    let section = index.mile_to_point(mile);

    let (chosen, distance) = associations
        .iter()
        .map(|a| (a, section_distance(a, section)))
        .min_by(|(a, da), (b, db)| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| da.total_cmp(db))
        })?;

    debug!(
        "Resolved gauge {} ({}) for mile {:.1}: primary={}, {:.1} mi away",
        chosen.gauge.name, chosen.gauge.site_id, mile, chosen.is_primary, distance
    );

    let limit = chosen.accuracy_warning_threshold_miles.or(default_warning_miles);
    let accuracy_warning = limit
        .filter(|&limit| distance > limit)
        .map(|_| format!("Gauge is {:.1} miles from this section", distance));

    Some(ResolvedGauge {
        gauge: chosen.gauge.clone(),
        thresholds: Some(chosen.thresholds),
        distance_miles: distance,
        advisory: false,
        accuracy_warning,
    })
}

/// Closest gauge to `point` by great-circle distance.
pub fn nearest_by_distance(
    point: Coordinate,
    gauges: &[GaugeStation],
) -> Option<(&GaugeStation, f64)> {
    gauges
        .iter()
        .map(|g| (g, haversine_miles(point, g.coordinate)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Fallback for rivers with no associations: the nearest gauge, flagged
/// advisory and carrying no thresholds.
pub fn nearby(point: Coordinate, gauges: &[GaugeStation]) -> Option<ResolvedGauge> {
    nearest_by_distance(point, gauges).map(|(gauge, distance)| {
        debug!("Using nearby gauge {} ({:.1} mi) as advisory", gauge.name, distance);
        ResolvedGauge {
            gauge: gauge.clone(),
            thresholds: None,
            distance_miles: distance,
            advisory: true,
            accuracy_warning: None,
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::{ThresholdTiers, ThresholdUnit};

    fn station(id: &str, lat: f64, lon: f64) -> GaugeStation {
        GaugeStation {
            id: id.to_string(),
            site_id: format!("0706{}", id),
            name: format!("Gauge {}", id),
            coordinate: Coordinate::new(lat, lon),
        }
    }

    fn association(
        id: &str,
        is_primary: bool,
        distance: Option<f64>,
        warn_at: Option<f64>,
    ) -> RiverGaugeAssociation {
        RiverGaugeAssociation {
            river_id: "current".to_string(),
            gauge: station(id, 37.0, -91.0),
            is_primary,
            thresholds: DualThresholds::new(
                ThresholdUnit::Feet,
                ThresholdTiers { low: Some(2.0), ..Default::default() },
                ThresholdTiers::default(),
            ),
            distance_from_section_miles: distance,
            accuracy_warning_threshold_miles: warn_at,
        }
    }

    fn index() -> MileIndex {
        MileIndex::calibrated(
            vec![Coordinate::new(37.0, -91.0), Coordinate::new(38.0, -91.0)],
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_primary_wins_over_closer_gauge() {
        let assocs = vec![
            association("near", false, Some(1.0), None),
            association("main", true, Some(8.0), None),
        ];
        let resolved = resolve(&assocs, &index(), 10.0, None).unwrap();
        assert_eq!(resolved.gauge.id, "main");
        assert!(!resolved.advisory);
        assert!(resolved.thresholds.is_some());
    }

    #[test]
    fn test_closest_wins_without_primary() {
        let assocs = vec![
            association("far", false, Some(12.0), None),
            association("near", false, Some(3.0), None),
        ];
        assert_eq!(resolve(&assocs, &index(), 10.0, None).unwrap().gauge.id, "near");
    }

    #[test]
    fn test_closest_primary_breaks_ties() {
        let assocs = vec![
            association("a", true, Some(9.0), None),
            association("b", true, Some(2.0), None),
        ];
        assert_eq!(resolve(&assocs, &index(), 10.0, None).unwrap().gauge.id, "b");
    }

    #[test]
    fn test_accuracy_warning_when_beyond_tolerance() {
        let assocs = vec![association("main", true, Some(14.0), Some(10.0))];
        let resolved = resolve(&assocs, &index(), 10.0, None).unwrap();
        assert_eq!(
            resolved.accuracy_warning.as_deref(),
            Some("Gauge is 14.0 miles from this section")
        );
    }

    #[test]
    fn test_no_warning_within_tolerance() {
        let assocs = vec![association("main", true, Some(4.0), Some(10.0))];
        assert!(resolve(&assocs, &index(), 10.0, None).unwrap().accuracy_warning.is_none());
    }

    #[test]
    fn test_default_tolerance_applies_when_unset() {
        let assocs = vec![association("main", true, Some(6.0), None)];
        assert!(resolve(&assocs, &index(), 10.0, Some(5.0)).unwrap().accuracy_warning.is_some());
        assert!(resolve(&assocs, &index(), 10.0, None).unwrap().accuracy_warning.is_none());
    }

    #[test]
    fn test_distance_computed_from_section_when_not_stored() {
        // Gauge sits at mile 0; section is mile 50 on a 100-mile line
        // spanning one degree of latitude, about 34.5 real miles away.
        let assocs = vec![association("main", true, None, None)];
        let resolved = resolve(&assocs, &index(), 50.0, None).unwrap();
        assert!((resolved.distance_miles - 34.55).abs() < 0.1, "got {}", resolved.distance_miles);
    }

    #[test]
    fn test_empty_associations_resolve_to_none() {
        assert!(resolve(&[], &index(), 10.0, Some(5.0)).is_none());
    }

    #[test]
    fn test_nearest_by_distance_is_closest_of_all() {
        let gauges = vec![
            station("a", 36.0, -90.0),
            station("b", 37.1, -91.1),
            station("c", 38.5, -92.0),
            station("d", 37.0, -90.7),
        ];
        let point = Coordinate::new(37.0, -91.0);
        let (best, best_distance) = nearest_by_distance(point, &gauges).unwrap();
        assert_eq!(best.id, "b");
        for g in &gauges {
            assert!(best_distance <= haversine_miles(point, g.coordinate));
        }
    }

    #[test]
    fn test_nearby_is_advisory_without_thresholds() {
        let gauges = vec![station("x", 37.2, -91.0)];
        let resolved = nearby(Coordinate::new(37.0, -91.0), &gauges).unwrap();
        assert!(resolved.advisory);
        assert!(resolved.thresholds.is_none());
        assert!(nearby(Coordinate::new(37.0, -91.0), &[]).is_none());
    }
}
