/// floatplan_service: river float trip planning.
///
/// # Module structure
///
/// ```text
/// floatplan_service
/// ├── model      - shared data types (River, AccessPoint, FloatPlan, PlanError, …)
/// ├── geometry   - haversine distance and the river-mile index (mile <-> point, snapping)
/// ├── route      - distance, direction and path between two river miles
/// ├── duration   - float time estimate for a vessel
/// ├── thresholds - condition tiers, unit duality and reading classification
/// ├── freshness  - gauge reading staleness
/// ├── gauges     - governing gauge selection for a river section
/// ├── vessels    - built-in vessel registry
/// ├── store      - PlanStore data-access trait and the in-memory catalog
/// ├── planner    - float plan assembly and the conditions listing
/// ├── config     - floatplan.toml loader (planner settings + catalog)
/// ├── db         - PostgreSQL connection and PlanStore implementation
/// └── endpoint   - HTTP API for plans and conditions
/// ```

/// Public modules
pub mod config;
pub mod db;
pub mod duration;
pub mod endpoint;
pub mod freshness;
pub mod gauges;
pub mod geometry;
pub mod model;
pub mod planner;
pub mod route;
pub mod store;
pub mod thresholds;
pub mod vessels;
