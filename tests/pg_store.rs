/// Integration tests for the PostgreSQL plan store
///
/// These tests seed a small river into the floatplan schema, plan a trip
/// through `PgStore` and clean up afterwards.
///
/// Prerequisites:
/// - PostgreSQL running with the floatplan schema
///   (sql/001_initial_schema.sql applied)
/// - DATABASE_URL set in .env
///
/// Run with: cargo test --test pg_store -- --ignored --test-threads=1

use chrono::{Duration, Utc};
use postgres::Client;
use rust_decimal::Decimal;

use floatplan_service::db::{PgStore, connect_and_verify};
use floatplan_service::planner::{PlanRequest, Planner, PlannerSettings};
use floatplan_service::store::PlanStore;
use floatplan_service::thresholds::{ConditionCode, ThresholdUnit};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn get_test_client() -> Client {
    connect_and_verify().unwrap_or_else(|e| {
        eprintln!("\n{}\n", "=".repeat(80));
        eprintln!("INTEGRATION TEST SETUP ERROR");
        eprintln!("{}", "=".repeat(80));
        eprintln!("\n{}\n", e);
        panic!("Database setup validation failed");
    })
}

fn dec(value: f64) -> Decimal {
    Decimal::try_from(value).expect("test values fit in NUMERIC")
}

fn clean_test_data(client: &mut Client) {
    for sql in [
        "DELETE FROM floatplan.gauge_readings WHERE gauge_id LIKE 'TEST%'",
        "DELETE FROM floatplan.river_gauges WHERE river_id LIKE 'TEST%'",
        "DELETE FROM floatplan.hazards WHERE river_id LIKE 'TEST%'",
        "DELETE FROM floatplan.access_points WHERE river_id LIKE 'TEST%'",
        "DELETE FROM floatplan.gauge_stations WHERE id LIKE 'TEST%'",
        "DELETE FROM floatplan.rivers WHERE id LIKE 'TEST%'",
    ] {
        client.execute(sql, &[]).ok();
    }
}

fn seed(client: &mut Client) {
    clean_test_data(client);

    client
        .execute(
            "INSERT INTO floatplan.rivers (id, name, slug, length_miles, active)
             VALUES ('TEST-river', 'Test River', 'test-river', $1, TRUE)",
            &[&dec(100.0)],
        )
        .unwrap();
    for (seq, lat) in [(0, 37.0_f64), (1, 37.5), (2, 38.0)] {
        client
            .execute(
                "INSERT INTO floatplan.river_vertices (river_id, seq, lat, lon)
                 VALUES ('TEST-river', $1, $2, -91.0)",
                &[&(seq as i32), &lat],
            )
            .unwrap();
    }
    for (id, mile) in [("TEST-put-in", 10.0), ("TEST-take-out", 22.0)] {
        client
            .execute(
                "INSERT INTO floatplan.access_points (id, river_id, name, river_mile, lat, lon, approved)
                 VALUES ($1, 'TEST-river', $1, $2, 37.1, -91.0, TRUE)",
                &[&id, &dec(mile)],
            )
            .unwrap();
    }
    client
        .execute(
            "INSERT INTO floatplan.gauge_stations (id, site_id, name, lat, lon)
             VALUES ('TEST-gauge', '00000000', 'Test gauge', 37.1, -91.0)",
            &[],
        )
        .unwrap();
    client
        .execute(
            "INSERT INTO floatplan.river_gauges
                (river_id, gauge_id, is_primary, threshold_unit,
                 too_low, low, optimal_min, optimal_max, high, dangerous)
             VALUES ('TEST-river', 'TEST-gauge', TRUE, 'ft', $1, $2, $3, $4, $5, $6)",
            &[&dec(1.5), &dec(2.0), &dec(3.0), &dec(5.0), &dec(7.0), &dec(9.0)],
        )
        .unwrap();
    client
        .execute(
            "INSERT INTO floatplan.gauge_readings (gauge_id, reading_time, gauge_height_ft)
             VALUES ('TEST-gauge', $1, $2)",
            &[&(Utc::now() - Duration::minutes(20)), &dec(4.0)],
        )
        .unwrap();
    client
        .execute(
            "INSERT INTO floatplan.hazards (id, river_id, name, river_mile)
             VALUES ('TEST-hazard', 'TEST-river', 'Test strainer', $1)",
            &[&dec(15.0)],
        )
        .unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_store_reads_seeded_catalog() {
    let mut client = get_test_client();
    seed(&mut client);

    let store = PgStore::connect().expect("store should connect");
    let river = store.get_river("TEST-river").unwrap().expect("river should exist");
    assert_eq!(river.geometry.len(), 3, "vertices should load in order");
    assert_eq!(river.length_miles, 100.0);

    let assocs = store.get_gauge_associations_for_river("TEST-river").unwrap();
    assert_eq!(assocs.len(), 1);
    assert_eq!(assocs[0].thresholds.unit(), ThresholdUnit::Feet);
    assert_eq!(assocs[0].thresholds.primary().tiers.dangerous, Some(9.0));

    let reading = store.get_latest_reading("TEST-gauge").unwrap().expect("reading should exist");
    assert_eq!(reading.gauge_height_ft, Some(4.0));

    clean_test_data(&mut client);
}

#[test]
#[ignore] // Only run when database is available
fn test_plan_through_postgres() {
    let mut client = get_test_client();
    seed(&mut client);

    let planner = Planner::new(PgStore::connect().unwrap(), PlannerSettings::default());
    let plan = planner
        .plan(&PlanRequest {
            river_id: "TEST-river".to_string(),
            put_in_id: "TEST-put-in".to_string(),
            take_out_id: "TEST-take-out".to_string(),
            vessel: None,
            as_of: Utc::now(),
        })
        .expect("plan should succeed");

    assert_eq!(plan.distance.formatted, "12.0 mi");
    assert_eq!(plan.float_time.formatted, "4h 48m");
    assert_eq!(plan.condition.code, ConditionCode::Optimal);
    assert_eq!(plan.hazards.len(), 1);

    clean_test_data(&mut client);
}
