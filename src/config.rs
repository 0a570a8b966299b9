/// Configuration loader - parses floatplan.toml
///
/// Holds planner tuning under `[planner]` and, optionally, a full river
/// catalog (vessels, rivers, access points, gauges, associations and
/// hazards). The catalog lets the service run without a database and lets
/// thresholds or access points change without recompiling.
///
/// Every table is optional. A file with only `[planner]` is valid; the
/// catalog is then empty and the database backend is expected.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::{
    AccessPoint, Coordinate, GaugeReading, GaugeStation, Hazard, River, RiverGaugeAssociation,
    VesselType,
};
use crate::planner::PlannerSettings;
use crate::store::MemoryStore;
use crate::thresholds::{DualThresholds, ThresholdOrderError, ThresholdTiers, ThresholdUnit};
use crate::vessels::DEFAULT_VESSEL;

pub const DEFAULT_CONFIG_PATH: &str = "floatplan.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid planner setting {name} = {value}")]
    InvalidSetting { name: &'static str, value: f64 },
    #[error("Duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },
    #[error("{kind} '{id}' references unknown river '{river}'")]
    UnknownRiver {
        kind: &'static str,
        id: String,
        river: String,
    },
    #[error("Association on river '{river}' references unknown gauge '{gauge}'")]
    UnknownGauge { river: String, gauge: String },
    #[error("Vessel '{slug}' must have a positive speed, got {speed_mph}")]
    InvalidVessel { slug: String, speed_mph: f64 },
    #[error("Thresholds for gauge '{gauge}' on river '{river}': {source}")]
    Thresholds {
        river: String,
        gauge: String,
        #[source]
        source: ThresholdOrderError,
    },
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// `[planner]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub stale_reading_hours: f64,
    pub snap_tolerance_miles: f64,
    pub default_accuracy_warning_miles: Option<f64>,
    pub default_vessel: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            stale_reading_hours: 6.0,
            snap_tolerance_miles: 0.5,
            default_accuracy_warning_miles: None,
            default_vessel: DEFAULT_VESSEL.to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn to_settings(&self) -> Result<PlannerSettings, ConfigError> {
        positive("stale_reading_hours", self.stale_reading_hours)?;
        positive("snap_tolerance_miles", self.snap_tolerance_miles)?;
        if let Some(miles) = self.default_accuracy_warning_miles {
            positive("default_accuracy_warning_miles", miles)?;
        }
        let stale_after = Duration::try_minutes((self.stale_reading_hours * 60.0).round() as i64)
            .ok_or(ConfigError::InvalidSetting {
                name: "stale_reading_hours",
                value: self.stale_reading_hours,
            })?;
        Ok(PlannerSettings {
            stale_after,
            default_accuracy_warning_miles: self.default_accuracy_warning_miles,
            snap_tolerance_miles: self.snap_tolerance_miles,
            default_vessel: self.default_vessel.clone(),
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting { name, value })
    }
}

fn yes() -> bool {
    true
}

fn feet() -> ThresholdUnit {
    ThresholdUnit::Feet
}

#[derive(Debug, Clone, Deserialize)]
pub struct VesselConfig {
    pub slug: String,
    pub name: String,
    pub speed_mph: f64,
}

/// Geometry is a list of `[lat, lon]` pairs, upstream first.
#[derive(Debug, Clone, Deserialize)]
pub struct RiverConfig {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub length_miles: f64,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub geometry: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessPointConfig {
    pub id: String,
    pub river: String,
    pub name: String,
    pub river_mile: Option<f64>,
    pub lat: f64,
    pub lon: f64,
    /// `[lat, lon]` on the river line, if already reviewed.
    pub snapped: Option<[f64; 2]>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default = "yes")]
    pub is_public: bool,
    #[serde(default)]
    pub has_fee: bool,
    #[serde(default = "yes")]
    pub approved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingConfig {
    pub gauge_height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    /// RFC 3339 string, e.g. "2024-06-01T14:00:00Z".
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GaugeConfig {
    pub id: String,
    pub site_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Last known reading, for running without the ingestion database.
    pub reading: Option<ReadingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationConfig {
    pub river: String,
    pub gauge: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "feet")]
    pub threshold_unit: ThresholdUnit,
    #[serde(default)]
    pub thresholds: ThresholdTiers,
    #[serde(default)]
    pub alt_thresholds: ThresholdTiers,
    pub distance_from_section_miles: Option<f64>,
    pub accuracy_warning_threshold_miles: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HazardConfig {
    pub id: String,
    pub river: String,
    pub name: String,
    pub river_mile: f64,
    pub kind: Option<String>,
}

/// Root structure for TOML parsing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    planner: PlannerConfig,
    vessel: Vec<VesselConfig>,
    river: Vec<RiverConfig>,
    access_point: Vec<AccessPointConfig>,
    gauge: Vec<GaugeConfig>,
    association: Vec<AssociationConfig>,
    hazard: Vec<HazardConfig>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Validated configuration: planner settings plus the catalog.
#[derive(Debug, Clone)]
pub struct Config {
    pub planner: PlannerSettings,
    pub catalog: MemoryStore,
}

/// Reads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&contents)
}

/// Parses and validates configuration text.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let file: FileConfig = toml::from_str(contents)?;
    let planner = file.planner.to_settings()?;
    let mut catalog = MemoryStore::new();

    for v in file.vessel {
        if !(v.speed_mph.is_finite() && v.speed_mph > 0.0) {
            return Err(ConfigError::InvalidVessel {
                slug: v.slug,
                speed_mph: v.speed_mph,
            });
        }
        catalog.add_vessel(VesselType {
            slug: v.slug,
            name: v.name,
            speed_mph: v.speed_mph,
        });
    }

    for r in file.river {
        if catalog.has_river(&r.id) {
            return Err(ConfigError::Duplicate { kind: "river", id: r.id });
        }
        catalog.add_river(River {
            slug: r.slug.unwrap_or_else(|| r.id.clone()),
            id: r.id,
            name: r.name,
            geometry: r.geometry.iter().map(|&[lat, lon]| Coordinate::new(lat, lon)).collect(),
            length_miles: r.length_miles,
            active: r.active,
        });
    }

    for g in file.gauge {
        if catalog.has_gauge(&g.id) {
            return Err(ConfigError::Duplicate { kind: "gauge", id: g.id });
        }
        if let Some(reading) = g.reading {
            catalog.set_reading(
                &g.id,
                GaugeReading {
                    gauge_height_ft: reading.gauge_height_ft,
                    discharge_cfs: reading.discharge_cfs,
                    timestamp: reading.timestamp,
                },
            );
        }
        catalog.add_gauge(GaugeStation {
            id: g.id,
            site_id: g.site_id,
            name: g.name,
            coordinate: Coordinate::new(g.lat, g.lon),
        });
    }

    for ap in file.access_point {
        if catalog.has_access_point(&ap.id) {
            return Err(ConfigError::Duplicate { kind: "access point", id: ap.id });
        }
        if !catalog.has_river(&ap.river) {
            return Err(ConfigError::UnknownRiver {
                kind: "Access point",
                id: ap.id,
                river: ap.river,
            });
        }
        catalog.add_access_point(AccessPoint {
            id: ap.id,
            river_id: ap.river,
            name: ap.name,
            river_mile: ap.river_mile,
            coordinate: Coordinate::new(ap.lat, ap.lon),
            snapped: ap.snapped.map(|[lat, lon]| Coordinate::new(lat, lon)),
            types: ap.types,
            is_public: ap.is_public,
            has_fee: ap.has_fee,
            approved: ap.approved,
        });
    }

    for a in file.association {
        if !catalog.has_river(&a.river) {
            return Err(ConfigError::UnknownRiver {
                kind: "Association",
                id: a.gauge,
                river: a.river,
            });
        }
        let Some(gauge) = catalog.gauge(&a.gauge).cloned() else {
            return Err(ConfigError::UnknownGauge {
                river: a.river,
                gauge: a.gauge,
            });
        };
        let thresholds = DualThresholds::new(a.threshold_unit, a.thresholds, a.alt_thresholds);
        thresholds.validate().map_err(|source| ConfigError::Thresholds {
            river: a.river.clone(),
            gauge: a.gauge.clone(),
            source,
        })?;
        catalog.add_association(RiverGaugeAssociation {
            river_id: a.river,
            gauge,
            is_primary: a.is_primary,
            thresholds,
            distance_from_section_miles: a.distance_from_section_miles,
            accuracy_warning_threshold_miles: a.accuracy_warning_threshold_miles,
        });
    }

    for h in file.hazard {
        if catalog.has_hazard(&h.id) {
            return Err(ConfigError::Duplicate { kind: "hazard", id: h.id });
        }
        if !catalog.has_river(&h.river) {
            return Err(ConfigError::UnknownRiver {
                kind: "Hazard",
                id: h.id,
                river: h.river,
            });
        }
        catalog.add_hazard(
            &h.river,
            Hazard {
                id: h.id,
                name: h.name,
                river_mile: h.river_mile,
                kind: h.kind,
            },
        );
    }

    Ok(Config { planner, catalog })
}
