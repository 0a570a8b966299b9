/// Float plan assembly.
///
/// `Planner` ties the pieces together for one request:
///
/// 1. fetch the river and build its mile index
/// 2. place the put-in and take-out on the river
/// 3. route between them (distance, direction, path)
/// 4. estimate float time for the vessel
/// 5. resolve the governing gauge at the put-in and classify its reading
/// 6. collect hazards inside the traveled mile range
/// 7. attach warnings
///
/// Missing or unusable gauge data never fails a plan; it yields an
/// `unknown` condition plus a warning explaining why. Everything else that
/// goes wrong aborts the request with a `PlanError`.
///
/// The reference time for reading freshness is part of the request, so the
/// same request against the same catalog snapshot always produces the same
/// plan.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::duration;
use crate::freshness::{self, Freshness};
use crate::gauges::{self, ResolvedGauge};
use crate::geometry::{MileIndex, Snap};
use crate::model::{
    AccessPoint, Coordinate, Direction, FloatPlan, GaugeReading, Hazard, PlanCondition,
    PlanDistance, PlanEndpoint, PlanError, PlanRiver, River,
};
use crate::route;
use crate::store::PlanStore;
use crate::thresholds::{ConditionCode, ThresholdUnit};
use crate::vessels::DEFAULT_VESSEL;

pub const UPSTREAM_WARNING: &str =
    "This trip runs upstream; expect to paddle against the current the whole way.";
pub const NO_GAUGE_WARNING: &str =
    "No gauge data is available for this river; check conditions locally before launching.";
pub const DANGEROUS_WARNING: &str =
    "Water levels are dangerous. Do not float this section until levels drop.";

// ---------------------------------------------------------------------------
// Settings and requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    /// Readings older than this don't determine the condition.
    pub stale_after: Duration,
    /// Accuracy tolerance for associations that don't set their own.
    pub default_accuracy_warning_miles: Option<f64>,
    /// Raw coordinates farther than this from the river need review.
    pub snap_tolerance_miles: f64,
    pub default_vessel: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            stale_after: Duration::hours(6),
            default_accuracy_warning_miles: None,
            snap_tolerance_miles: 0.5,
            default_vessel: DEFAULT_VESSEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub river_id: String,
    pub put_in_id: String,
    pub take_out_id: String,
    /// Vessel slug; the configured default when `None`.
    pub vessel: Option<String>,
    pub as_of: DateTime<Utc>,
}

/// One gauge's condition on one river, for severity-ranked listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeCondition {
    pub river_id: String,
    pub river_name: String,
    pub gauge_name: String,
    pub site_id: String,
    pub is_primary: bool,
    pub code: ConditionCode,
    pub label: String,
    pub threshold_unit: ThresholdUnit,
    pub gauge_height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub reading_time: Option<DateTime<Utc>>,
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct Planner<S> {
    store: S,
    settings: PlannerSettings,
}

impl<S: PlanStore> Planner<S> {
    pub fn new(store: S, settings: PlannerSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Builds a complete float plan, or fails without a partial result.
    pub fn plan(&self, request: &PlanRequest) -> Result<FloatPlan, PlanError> {
        let river = self.active_river(&request.river_id)?;
        let index = MileIndex::calibrated(river.geometry.clone(), river.length_miles)?;

        let (put_in, put_in_mile) = self.place(&river, &index, &request.put_in_id)?;
        let (take_out, take_out_mile) = self.place(&river, &index, &request.take_out_id)?;

        let route = route::extract(&index, put_in_mile, take_out_mile)?;

        let vessel_slug = request
            .vessel
            .as_deref()
            .unwrap_or(&self.settings.default_vessel);
        let vessel = self
            .store
            .get_vessel_type(vessel_slug)?
            .ok_or_else(|| PlanError::VesselNotFound(vessel_slug.to_string()))?;
        let float_time = duration::estimate(route.distance_miles, &vessel)?;

        let associations = self.store.get_gauge_associations_for_river(&river.id)?;
        let resolved = match gauges::resolve(
            &associations,
            &index,
            put_in_mile,
            self.settings.default_accuracy_warning_miles,
        ) {
            Some(resolved) => Some(resolved),
            None => {
                let all = self.store.list_gauge_stations()?;
                gauges::nearby(index.mile_to_point(put_in_mile), &all)
            }
        };
        let (condition, degraded_reason) = self.evaluate(resolved, request.as_of)?;

        let hazards = self.hazards_between(&river.id, put_in_mile, take_out_mile)?;

        let mut warnings = Vec::new();
        if route.direction == Direction::Upstream {
            warnings.push(UPSTREAM_WARNING.to_string());
        }
        if let Some(reason) = degraded_reason {
            warnings.push(reason);
        }
        if let Some(reason) = &condition.accuracy_warning_reason {
            warnings.push(reason.clone());
        }
        if condition.code == ConditionCode::Dangerous {
            warnings.push(DANGEROUS_WARNING.to_string());
        }

        info!(
            "Planned {} -> {} on {}: {:.1} mi {}, {}, condition {}",
            put_in.name,
            take_out.name,
            river.name,
            route.distance_miles,
            route.direction.as_str(),
            float_time.formatted,
            condition.code.as_str()
        );

        Ok(FloatPlan {
            river: PlanRiver {
                id: river.id.clone(),
                name: river.name.clone(),
                slug: river.slug.clone(),
                length_miles: index.total_miles(),
            },
            put_in: plan_endpoint(&put_in, put_in_mile, &index),
            take_out: plan_endpoint(&take_out, take_out_mile, &index),
            distance: PlanDistance {
                miles: route.distance_miles,
                formatted: route::format_distance(route.distance_miles),
            },
            direction: route.direction,
            float_time,
            vessel,
            condition,
            hazards,
            warnings,
            path: route.path,
        })
    }

    /// Projects a raw coordinate onto a river, flagging it for review when
    /// it lies beyond the snap tolerance.
    pub fn snap(&self, river_id: &str, lat: f64, lon: f64) -> Result<Snap, PlanError> {
        let river = self.active_river(river_id)?;
        let index = MileIndex::calibrated(river.geometry, river.length_miles)?;
        Ok(index.snap(Coordinate::new(lat, lon), self.settings.snap_tolerance_miles))
    }

    /// Classifies every gauge on every active river, best floating first.
    pub fn conditions(&self, as_of: DateTime<Utc>) -> Result<Vec<GaugeCondition>, PlanError> {
        let mut rows = Vec::new();
        for river in self.store.list_rivers()?.into_iter().filter(|r| r.active) {
            for association in self.store.get_gauge_associations_for_river(&river.id)? {
                let reading = self.store.get_latest_reading(&association.gauge.id)?;
                let code = match &reading {
                    Some(r) if !is_stale(r, as_of, self.settings.stale_after) => {
                        association.thresholds.classify_reading(r)
                    }
                    _ => ConditionCode::Unknown,
                };
                rows.push(GaugeCondition {
                    river_id: river.id.clone(),
                    river_name: river.name.clone(),
                    gauge_name: association.gauge.name.clone(),
                    site_id: association.gauge.site_id.clone(),
                    is_primary: association.is_primary,
                    code,
                    label: code.label().to_string(),
                    threshold_unit: association.thresholds.unit(),
                    gauge_height_ft: reading.as_ref().and_then(|r| r.gauge_height_ft),
                    discharge_cfs: reading.as_ref().and_then(|r| r.discharge_cfs),
                    reading_time: reading.as_ref().and_then(|r| r.timestamp),
                    source_url: association.gauge.source_url(),
                });
            }
        }

        rows.sort_by(|a, b| {
            a.code
                .display_rank()
                .cmp(&b.code.display_rank())
                .then_with(|| a.river_name.cmp(&b.river_name))
                .then_with(|| a.gauge_name.cmp(&b.gauge_name))
        });
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn active_river(&self, river_id: &str) -> Result<River, PlanError> {
        self.store
            .get_river(river_id)?
            .filter(|r| r.active)
            .ok_or_else(|| PlanError::RiverNotFound(river_id.to_string()))
    }

    /// Fetches an access point on `river` and returns it with its river mile.
    fn place(
        &self,
        river: &River,
        index: &MileIndex,
        access_point_id: &str,
    ) -> Result<(AccessPoint, f64), PlanError> {
        let access_point = self
            .store
            .get_access_point(access_point_id)?
            .filter(|ap| ap.river_id == river.id)
            .ok_or_else(|| PlanError::AccessPointNotFound {
                access_point: access_point_id.to_string(),
                river: river.id.clone(),
            })?;

        let mile = match access_point.river_mile {
            Some(mile) => index.clamp_mile(mile),
            None => {
                let from = access_point.snapped.unwrap_or(access_point.coordinate);
                let projection = index.point_to_mile(from);
                debug!(
                    "Derived mile {:.2} for {} ({:.2} mi off the river line)",
                    projection.mile, access_point.name, projection.offset_miles
                );
                projection.mile
            }
        };
        Ok((access_point, mile))
    }

    /// Reads and classifies the resolved gauge. Returns the condition and,
    /// when it is `unknown`, the reason to show the paddler.
    fn evaluate(
        &self,
        resolved: Option<ResolvedGauge>,
        as_of: DateTime<Utc>,
    ) -> Result<(PlanCondition, Option<String>), PlanError> {
        let Some(resolved) = resolved else {
            warn!("No gauge available; condition unknown");
            return Ok((PlanCondition::unavailable(), Some(NO_GAUGE_WARNING.to_string())));
        };

        let name = resolved.gauge.name.clone();
        let reading = self.store.get_latest_reading(&resolved.gauge.id)?;

        let (code, reason) = match (&reading, &resolved.thresholds) {
            (None, _) => (
                ConditionCode::Unknown,
                Some(format!("No current reading from {}; flow conditions are unknown.", name)),
            ),
            (Some(_), None) => (
                ConditionCode::Unknown,
                Some(format!(
                    "No gauge is linked to this river; {} ({:.1} mi away) is shown for reference only.",
                    name, resolved.distance_miles
                )),
            ),
            (Some(r), Some(thresholds)) => match freshness::check(r, as_of, self.settings.stale_after) {
                Freshness::Stale(age) => (
                    ConditionCode::Unknown,
                    Some(format!(
                        "Latest reading from {} is {} old; flow conditions are unknown.",
                        name,
                        freshness::describe_age(age)
                    )),
                ),
                Freshness::Fresh | Freshness::Undated => match thresholds.classify_reading(r) {
                    ConditionCode::Unknown => (
                        ConditionCode::Unknown,
                        Some(format!(
                            "{} has no usable thresholds for its current reading; flow conditions are unknown.",
                            name
                        )),
                    ),
                    code => (code, None),
                },
            },
        };

        if let Some(reason) = &reason {
            warn!("Degraded condition: {}", reason);
        }

        let condition = PlanCondition {
            code,
            label: code.label().to_string(),
            gauge_height_ft: reading.as_ref().and_then(|r| r.gauge_height_ft),
            discharge_cfs: reading.as_ref().and_then(|r| r.discharge_cfs),
            reading_time: reading.as_ref().and_then(|r| r.timestamp),
            source_url: Some(resolved.gauge.source_url()),
            gauge_name: Some(name),
            advisory: resolved.advisory,
            accuracy_warning: resolved.accuracy_warning.as_ref().map(|_| true),
            accuracy_warning_reason: resolved.accuracy_warning,
        };
        Ok((condition, reason))
    }

    /// Hazards within the traveled range, in travel order.
    fn hazards_between(
        &self,
        river_id: &str,
        from_mile: f64,
        to_mile: f64,
    ) -> Result<Vec<Hazard>, PlanError> {
        let (lo, hi) = (from_mile.min(to_mile), from_mile.max(to_mile));
        let mut hazards: Vec<Hazard> = self
            .store
            .get_hazards_for_river(river_id)?
            .into_iter()
            .filter(|h| h.river_mile >= lo && h.river_mile <= hi)
            .collect();
        hazards.sort_by(|a, b| a.river_mile.total_cmp(&b.river_mile));
        if to_mile < from_mile {
            hazards.reverse();
        }
        Ok(hazards)
    }
}

fn is_stale(reading: &GaugeReading, as_of: DateTime<Utc>, stale_after: Duration) -> bool {
    matches!(freshness::check(reading, as_of, stale_after), Freshness::Stale(_))
}

fn plan_endpoint(access_point: &AccessPoint, mile: f64, index: &MileIndex) -> PlanEndpoint {
    PlanEndpoint {
        id: access_point.id.clone(),
        name: access_point.name.clone(),
        river_mile: mile,
        coordinate: access_point
            .snapped
            .unwrap_or_else(|| index.mile_to_point(mile)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GaugeStation, RiverGaugeAssociation};
    use crate::store::MemoryStore;
    use crate::thresholds::{DualThresholds, ThresholdTiers};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()
    }

    fn river(id: &str) -> River {
        River {
            id: id.to_string(),
            name: format!("{} river", id),
            slug: id.to_string(),
            geometry: vec![Coordinate::new(37.0, -91.0), Coordinate::new(38.0, -91.0)],
            length_miles: 100.0,
            active: true,
        }
    }

    fn access_point(id: &str, river_id: &str, mile: Option<f64>) -> AccessPoint {
        AccessPoint {
            id: id.to_string(),
            river_id: river_id.to_string(),
            name: format!("{} access", id),
            river_mile: mile,
            coordinate: Coordinate::new(37.2, -91.0),
            snapped: None,
            types: vec!["gravel_bar".to_string()],
            is_public: true,
            has_fee: false,
            approved: true,
        }
    }

    fn gauge(id: &str) -> GaugeStation {
        GaugeStation {
            id: id.to_string(),
            site_id: "07066000".to_string(),
            name: format!("Gauge {}", id),
            coordinate: Coordinate::new(37.1, -91.0),
        }
    }

    fn tiers() -> ThresholdTiers {
        ThresholdTiers {
            too_low: Some(1.5),
            low: Some(2.0),
            optimal_min: Some(3.0),
            optimal_max: Some(5.0),
            high: Some(7.0),
            dangerous: Some(9.0),
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_river(river("r1"));
        store.add_access_point(access_point("a", "r1", Some(10.0)));
        store.add_access_point(access_point("b", "r1", Some(30.0)));
        store.add_access_point(access_point("other", "r2", Some(5.0)));
        store.add_association(RiverGaugeAssociation {
            river_id: "r1".to_string(),
            gauge: gauge("g1"),
            is_primary: true,
            thresholds: DualThresholds::new(ThresholdUnit::Feet, tiers(), ThresholdTiers::default()),
            distance_from_section_miles: Some(2.0),
            accuracy_warning_threshold_miles: Some(10.0),
        });
        store
    }

    fn request(put_in: &str, take_out: &str) -> PlanRequest {
        PlanRequest {
            river_id: "r1".to_string(),
            put_in_id: put_in.to_string(),
            take_out_id: take_out.to_string(),
            vessel: None,
            as_of: now(),
        }
    }

    fn reading(ft: f64, age_hours: i64) -> GaugeReading {
        GaugeReading {
            gauge_height_ft: Some(ft),
            discharge_cfs: None,
            timestamp: Some(now() - Duration::hours(age_hours)),
        }
    }

    #[test]
    fn test_plan_downstream_with_optimal_flow() {
        let mut store = store();
        store.set_reading("g1", reading(4.0, 1));
        let plan = Planner::new(store, PlannerSettings::default()).plan(&request("a", "b")).unwrap();

        assert_eq!(plan.direction, Direction::Downstream);
        assert!((plan.distance.miles - 20.0).abs() < 1e-9);
        assert_eq!(plan.distance.formatted, "20.0 mi");
        assert_eq!(plan.float_time.formatted, "8h 0m");
        assert_eq!(plan.vessel.slug, "canoe");
        assert_eq!(plan.condition.code, ConditionCode::Optimal);
        assert_eq!(plan.condition.gauge_name.as_deref(), Some("Gauge g1"));
        assert!(plan.warnings.is_empty(), "unexpected warnings: {:?}", plan.warnings);
    }

    #[test]
    fn test_plan_upstream_warns() {
        let mut store = store();
        store.set_reading("g1", reading(4.0, 1));
        let plan = Planner::new(store, PlannerSettings::default()).plan(&request("b", "a")).unwrap();
        assert_eq!(plan.direction, Direction::Upstream);
        assert_eq!(plan.warnings, vec![UPSTREAM_WARNING.to_string()]);
    }

    #[test]
    fn test_same_point_fails() {
        let planner = Planner::new(store(), PlannerSettings::default());
        assert_eq!(planner.plan(&request("a", "a")), Err(PlanError::SamePoint));
    }

    #[test]
    fn test_access_point_on_another_river_fails() {
        let planner = Planner::new(store(), PlannerSettings::default());
        let err = planner.plan(&request("a", "other")).unwrap_err();
        assert_eq!(err.code(), "ACCESS_POINT_NOT_FOUND");
    }

    #[test]
    fn test_inactive_river_is_not_found() {
        let mut store = store();
        let mut inactive = river("r1");
        inactive.active = false;
        store.add_river(inactive);
        let err = Planner::new(store, PlannerSettings::default())
            .plan(&request("a", "b"))
            .unwrap_err();
        assert_eq!(err, PlanError::RiverNotFound("r1".to_string()));
    }

    #[test]
    fn test_unknown_vessel_fails() {
        let mut req = request("a", "b");
        req.vessel = Some("hovercraft".to_string());
        let err = Planner::new(store(), PlannerSettings::default()).plan(&req).unwrap_err();
        assert_eq!(err.code(), "VESSEL_NOT_FOUND");
    }

    #[test]
    fn test_missing_reading_is_unknown_not_error() {
        let plan = Planner::new(store(), PlannerSettings::default()).plan(&request("a", "b")).unwrap();
        assert_eq!(plan.condition.code, ConditionCode::Unknown);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("No current reading"));
    }

    #[test]
    fn test_stale_reading_is_unknown() {
        let mut store = store();
        store.set_reading("g1", reading(4.0, 9));
        let plan = Planner::new(store, PlannerSettings::default()).plan(&request("a", "b")).unwrap();
        assert_eq!(plan.condition.code, ConditionCode::Unknown);
        assert_eq!(plan.condition.gauge_height_ft, Some(4.0));
        assert!(plan.warnings[0].contains("9 hours old"), "{:?}", plan.warnings);
    }

    #[test]
    fn test_dangerous_flow_adds_safety_warning() {
        let mut store = store();
        store.set_reading("g1", reading(9.5, 0));
        let plan = Planner::new(store, PlannerSettings::default()).plan(&request("a", "b")).unwrap();
        assert_eq!(plan.condition.code, ConditionCode::Dangerous);
        assert_eq!(plan.warnings, vec![DANGEROUS_WARNING.to_string()]);
    }

    #[test]
    fn test_derives_mile_from_coordinate_when_not_stored() {
        let mut store = store();
        // 37.2 N on a 100-mile river spanning 37..38 N: mile 20.
        store.add_access_point(access_point("c", "r1", None));
        store.set_reading("g1", reading(4.0, 1));
        let plan = Planner::new(store, PlannerSettings::default()).plan(&request("a", "c")).unwrap();
        assert!((plan.take_out.river_mile - 20.0).abs() < 0.01);
        assert!((plan.distance.miles - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_hazards_in_range_only_in_travel_order() {
        let mut store = store();
        for (id, mile) in [("h1", 5.0), ("h2", 12.0), ("h3", 30.0), ("h4", 31.0), ("h5", 18.0)] {
            store.add_hazard(
                "r1",
                Hazard { id: id.to_string(), name: id.to_string(), river_mile: mile, kind: None },
            );
        }
        let planner = Planner::new(store, PlannerSettings::default());

        let down: Vec<String> = planner.plan(&request("a", "b")).unwrap().hazards.into_iter().map(|h| h.id).collect();
        assert_eq!(down, vec!["h2", "h5", "h3"]);

        let up: Vec<String> = planner.plan(&request("b", "a")).unwrap().hazards.into_iter().map(|h| h.id).collect();
        assert_eq!(up, vec!["h3", "h5", "h2"]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let mut store = store();
        store.set_reading("g1", reading(2.5, 2));
        let planner = Planner::new(store, PlannerSettings::default());
        assert_eq!(planner.plan(&request("a", "b")), planner.plan(&request("a", "b")));
    }

    #[test]
    fn test_conditions_ranked_by_severity() {
        let mut store = store();
        store.add_river(river("r2"));
        store.add_association(RiverGaugeAssociation {
            river_id: "r2".to_string(),
            gauge: gauge("g2"),
            is_primary: true,
            thresholds: DualThresholds::new(ThresholdUnit::Feet, tiers(), ThresholdTiers::default()),
            distance_from_section_miles: None,
            accuracy_warning_threshold_miles: None,
        });
        store.set_reading("g1", reading(9.5, 0));
        store.set_reading("g2", reading(4.0, 0));

        let rows = Planner::new(store, PlannerSettings::default()).conditions(now()).unwrap();
        let codes: Vec<ConditionCode> = rows.iter().map(|r| r.code).collect();
        assert_eq!(codes, vec![ConditionCode::Optimal, ConditionCode::Dangerous]);
        assert_eq!(rows[0].river_id, "r2");
    }

    #[test]
    fn test_snap_uses_configured_tolerance() {
        let planner = Planner::new(store(), PlannerSettings::default());
        let snap = planner.snap("r1", 37.5, -90.9).unwrap();
        assert!(snap.needs_review);
        assert!((snap.projection.mile - 50.0).abs() < 0.1);
    }
}
