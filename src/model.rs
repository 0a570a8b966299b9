/// Core data types for the float trip planner.
///
/// This module defines the shared domain model imported by all other modules.
/// Rivers, access points, gauges and associations are read-only records owned
/// by an administrative process; `FloatPlan` is computed per request and
/// never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thresholds::{ConditionCode, DualThresholds, ThresholdUnit};

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// A paddleable river. Geometry runs from the headwater (mile 0) toward
/// the mouth.
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub geometry: Vec<Coordinate>,
    /// Declared length in river miles. Zero means "use measured length".
    pub length_miles: f64,
    pub active: bool,
}

/// A put-in / take-out location on a river.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    pub id: String,
    pub river_id: String,
    pub name: String,
    /// River mile, when already derived by the admin flow.
    pub river_mile: Option<f64>,
    pub coordinate: Coordinate,
    /// Nearest point on the river line, if snapped.
    pub snapped: Option<Coordinate>,
    pub types: Vec<String>,
    pub is_public: bool,
    pub has_fee: bool,
    pub approved: bool,
}

/// The most recent reading reported by a gauge station. Either value may
/// be missing when the sensor doesn't report that parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    pub gauge_height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl GaugeReading {
    /// Returns the value expressed in `unit`, if reported.
    pub fn value_in(&self, unit: ThresholdUnit) -> Option<f64> {
        match unit {
            ThresholdUnit::Feet => self.gauge_height_ft,
            ThresholdUnit::Cfs => self.discharge_cfs,
        }
    }
}

/// A water-level sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeStation {
    pub id: String,
    /// Upstream provider's site identifier (e.g. USGS site number).
    pub site_id: String,
    pub name: String,
    pub coordinate: Coordinate,
}

/// Base URL for a gauge's public monitoring page.
pub const GAUGE_SOURCE_BASE_URL: &str = "https://waterdata.usgs.gov/monitoring-location/";

impl GaugeStation {
    pub fn source_url(&self) -> String {
        format!("{}{}/", GAUGE_SOURCE_BASE_URL, self.site_id)
    }
}

/// Links a gauge station to a river, with the thresholds that interpret
/// its readings for that river.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverGaugeAssociation {
    pub river_id: String,
    pub gauge: GaugeStation,
    pub is_primary: bool,
    pub thresholds: DualThresholds,
    pub distance_from_section_miles: Option<f64>,
    pub accuracy_warning_threshold_miles: Option<f64>,
}

/// A paddling craft category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselType {
    pub slug: String,
    pub name: String,
    pub speed_mph: f64,
}

/// A point-like hazard (low-water bridge, strainer, dam) on a river.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    pub id: String,
    pub name: String,
    pub river_mile: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Computed plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Downstream,
    Upstream,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Downstream => "downstream",
            Direction::Upstream => "upstream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDistance {
    pub miles: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatTime {
    pub minutes: u32,
    pub formatted: String,
    pub speed_mph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEndpoint {
    pub id: String,
    pub name: String,
    pub river_mile: f64,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRiver {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub length_miles: f64,
}

/// Flow condition for the trip, as read from the governing gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCondition {
    pub code: ConditionCode,
    pub label: String,
    pub gauge_height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub reading_time: Option<DateTime<Utc>>,
    pub gauge_name: Option<String>,
    pub source_url: Option<String>,
    /// True when the gauge is a nearby sensor, not one associated with the river.
    pub advisory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_warning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_warning_reason: Option<String>,
}

impl PlanCondition {
    /// Condition used when no gauge can be resolved at all.
    pub fn unavailable() -> Self {
        PlanCondition {
            code: ConditionCode::Unknown,
            label: ConditionCode::Unknown.label().to_string(),
            gauge_height_ft: None,
            discharge_cfs: None,
            reading_time: None,
            gauge_name: None,
            source_url: None,
            advisory: false,
            accuracy_warning: None,
            accuracy_warning_reason: None,
        }
    }
}

/// Everything a paddler needs to know about one trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatPlan {
    pub river: PlanRiver,
    pub put_in: PlanEndpoint,
    pub take_out: PlanEndpoint,
    pub distance: PlanDistance,
    pub direction: Direction,
    pub float_time: FloatTime,
    pub vessel: VesselType,
    pub condition: PlanCondition,
    pub hazards: Vec<Hazard>,
    pub warnings: Vec<String>,
    /// Travel-ordered route geometry from put-in to take-out.
    pub path: Vec<Coordinate>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a plan request. No partial plan is ever returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("River not found: {0}")]
    RiverNotFound(String),
    #[error("Access point {access_point} is not on river {river}")]
    AccessPointNotFound { access_point: String, river: String },
    #[error("River geometry missing: need at least 2 vertices, found {vertices}")]
    GeometryMissing { vertices: usize },
    #[error("Put-in and take-out are at the same river mile")]
    SamePoint,
    #[error("Vessel '{vessel}' has invalid speed {speed_mph} mph")]
    InvalidVesselSpeed { vessel: String, speed_mph: f64 },
    #[error("Vessel type not found: {0}")]
    VesselNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PlanError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::RiverNotFound(_) => "RIVER_NOT_FOUND",
            PlanError::AccessPointNotFound { .. } => "ACCESS_POINT_NOT_FOUND",
            PlanError::GeometryMissing { .. } => "GEOMETRY_MISSING",
            PlanError::SamePoint => "SAME_POINT",
            PlanError::InvalidVesselSpeed { .. } => "INVALID_VESSEL_SPEED",
            PlanError::VesselNotFound(_) => "VESSEL_NOT_FOUND",
            PlanError::Storage(_) => "STORAGE",
        }
    }
}
