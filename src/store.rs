/// Read-only data access for the planner.
///
/// `PlanStore` is the contract the planner needs from whatever holds the
/// river and gauge catalog. `MemoryStore` keeps a catalog in memory (loaded
/// from the TOML config or built directly in tests); `db::PgStore`
/// serves the same records from PostgreSQL.

use std::collections::HashMap;

use crate::model::{
    AccessPoint, GaugeReading, GaugeStation, Hazard, PlanError, River, RiverGaugeAssociation,
    VesselType,
};
use crate::vessels;

/// Read-only catalog access. Implementations must be safe to share across
/// request threads.
pub trait PlanStore: Send + Sync {
    fn get_river(&self, river_id: &str) -> Result<Option<River>, PlanError>;

    fn list_rivers(&self) -> Result<Vec<River>, PlanError>;

    fn get_access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, PlanError>;

    fn get_gauge_associations_for_river(
        &self,
        river_id: &str,
    ) -> Result<Vec<RiverGaugeAssociation>, PlanError>;

    /// Every known gauge, associated with a river or not.
    fn list_gauge_stations(&self) -> Result<Vec<GaugeStation>, PlanError>;

    fn get_latest_reading(&self, gauge_station_id: &str) -> Result<Option<GaugeReading>, PlanError>;

    /// Hazards along a river. Stores without hazard data return none.
    fn get_hazards_for_river(&self, _river_id: &str) -> Result<Vec<Hazard>, PlanError> {
        Ok(Vec::new())
    }

    /// Vessel by slug. Defaults to the built-in registry.
    fn get_vessel_type(&self, slug: &str) -> Result<Option<VesselType>, PlanError> {
        Ok(vessels::find_vessel(slug))
    }
}

// ---------------------------------------------------------------------------
// In-memory catalog
// ---------------------------------------------------------------------------

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rivers: HashMap<String, River>,
    access_points: HashMap<String, AccessPoint>,
    gauges: HashMap<String, GaugeStation>,
    associations: Vec<RiverGaugeAssociation>,
    readings: HashMap<String, GaugeReading>,
    /// (river id, hazard)
    hazards: Vec<(String, Hazard)>,
    vessels: HashMap<String, VesselType>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_river(&mut self, river: River) {
        self.rivers.insert(river.id.clone(), river);
    }

    pub fn add_access_point(&mut self, access_point: AccessPoint) {
        self.access_points.insert(access_point.id.clone(), access_point);
    }

    pub fn add_gauge(&mut self, gauge: GaugeStation) {
        self.gauges.insert(gauge.id.clone(), gauge);
    }

    /// Adds an association; its gauge is registered as well.
    pub fn add_association(&mut self, association: RiverGaugeAssociation) {
        self.gauges
            .entry(association.gauge.id.clone())
            .or_insert_with(|| association.gauge.clone());
        self.associations.push(association);
    }

    pub fn set_reading(&mut self, gauge_id: &str, reading: GaugeReading) {
        self.readings.insert(gauge_id.to_string(), reading);
    }

    pub fn add_hazard(&mut self, river_id: &str, hazard: Hazard) {
        self.hazards.push((river_id.to_string(), hazard));
    }

    /// Registers or overrides a vessel type.
    pub fn add_vessel(&mut self, vessel: VesselType) {
        self.vessels.insert(vessel.slug.clone(), vessel);
    }

    pub fn has_river(&self, river_id: &str) -> bool {
        self.rivers.contains_key(river_id)
    }

    pub fn has_access_point(&self, access_point_id: &str) -> bool {
        self.access_points.contains_key(access_point_id)
    }

    pub fn has_hazard(&self, hazard_id: &str) -> bool {
        self.hazards.iter().any(|(_, h)| h.id == hazard_id)
    }

    pub fn has_gauge(&self, gauge_id: &str) -> bool {
        self.gauges.contains_key(gauge_id)
    }

    pub fn gauge(&self, gauge_id: &str) -> Option<&GaugeStation> {
        self.gauges.get(gauge_id)
    }
}

impl PlanStore for MemoryStore {
    fn get_river(&self, river_id: &str) -> Result<Option<River>, PlanError> {
        Ok(self.rivers.get(river_id).cloned())
    }

    fn list_rivers(&self) -> Result<Vec<River>, PlanError> {
        let mut rivers: Vec<River> = self.rivers.values().cloned().collect();
        rivers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rivers)
    }

    fn get_access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, PlanError> {
        Ok(self.access_points.get(access_point_id).cloned())
    }

    fn get_gauge_associations_for_river(
        &self,
        river_id: &str,
    ) -> Result<Vec<RiverGaugeAssociation>, PlanError> {
        Ok(self
            .associations
            .iter()
            .filter(|a| a.river_id == river_id)
            .cloned()
            .collect())
    }

    fn list_gauge_stations(&self) -> Result<Vec<GaugeStation>, PlanError> {
        let mut gauges: Vec<GaugeStation> = self.gauges.values().cloned().collect();
        gauges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(gauges)
    }

    fn get_latest_reading(&self, gauge_station_id: &str) -> Result<Option<GaugeReading>, PlanError> {
        Ok(self.readings.get(gauge_station_id).cloned())
    }

    fn get_hazards_for_river(&self, river_id: &str) -> Result<Vec<Hazard>, PlanError> {
        Ok(self
            .hazards
            .iter()
            .filter(|(r, _)| r == river_id)
            .map(|(_, h)| h.clone())
            .collect())
    }

    fn get_vessel_type(&self, slug: &str) -> Result<Option<VesselType>, PlanError> {
        Ok(self
            .vessels
            .get(slug)
            .cloned()
            .or_else(|| vessels::find_vessel(slug)))
    }
}
