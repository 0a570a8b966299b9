//! Float Planner - command line and HTTP service
//!
//! Plans a float trip between two access points on a river: distance,
//! direction, float time for the chosen vessel, current flow condition
//! from the governing gauge, hazards along the way and warnings.
//!
//! Usage:
//!   floatplan plan current akers pulltite --vessel kayak
//!   floatplan conditions
//!   floatplan snap current 37.26 -91.41
//!   floatplan serve --port 8080
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string; when unset (or with
//!                  --catalog) the catalog in the config file is used
//!   RUST_LOG     - log filter, default "info"

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use floatplan_service::config::{self, ConfigError, DEFAULT_CONFIG_PATH};
use floatplan_service::db::{DbConfigError, PgStore};
use floatplan_service::endpoint::{self, EndpointError};
use floatplan_service::model::{FloatPlan, PlanError};
use floatplan_service::planner::{GaugeCondition, PlanRequest, Planner};
use floatplan_service::store::PlanStore;
use floatplan_service::vessels;

#[derive(Parser)]
#[command(name = "floatplan")]
#[command(about = "River float trip planner", long_about = None)]
struct Cli {
    /// Configuration and catalog file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use the config file catalog even when DATABASE_URL is set
    #[arg(long)]
    catalog: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan a trip between two access points
    Plan {
        river: String,
        put_in: String,
        take_out: String,

        /// Vessel slug (canoe, kayak, raft, tube, ...)
        #[arg(long)]
        vessel: Option<String>,

        /// Reference time for reading freshness (RFC 3339), default now
        #[arg(long)]
        as_of: Option<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every river gauge, best floating first
    Conditions {
        #[arg(long)]
        as_of: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Project a coordinate onto a river and report its mile
    Snap {
        river: String,

        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude; western hemisphere values are negative
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// Serve plans over HTTP
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Request worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbConfigError),
    #[error("{} ({})", .0, .0.code())]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("--as-of is not an RFC 3339 time: {0}")]
    InvalidTime(String),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("\nError: {}\n", e);
        if let AppError::Plan(PlanError::VesselNotFound(_)) = e {
            eprintln!("Built-in vessels: {}\n", vessels::all_slugs().join(", "));
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = config::load_config(&cli.config)?;
    info!("Loaded configuration from {}", cli.config.display());

    dotenv::dotenv().ok();
    if cli.catalog || std::env::var("DATABASE_URL").is_err() {
        info!("Using catalog from {}", cli.config.display());
        execute(Planner::new(config.catalog, config.planner), cli.command)
    } else {
        let store = PgStore::connect()?;
        info!("Using PostgreSQL catalog");
        execute(Planner::new(store, config.planner), cli.command)
    }
}

fn parse_as_of(raw: Option<String>) -> Result<DateTime<Utc>, AppError> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| AppError::InvalidTime(raw)),
    }
}

fn execute<S: PlanStore + 'static>(planner: Planner<S>, command: Command) -> Result<(), AppError> {
    match command {
        Command::Plan {
            river,
            put_in,
            take_out,
            vessel,
            as_of,
            json,
        } => {
            let request = PlanRequest {
                river_id: river,
                put_in_id: put_in,
                take_out_id: take_out,
                vessel,
                as_of: parse_as_of(as_of)?,
            };
            let plan = planner.plan(&request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
        Command::Conditions { as_of, json } => {
            let rows = planner.conditions(parse_as_of(as_of)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_conditions(&rows);
            }
        }
        Command::Snap { river, lat, lon } => {
            let snap = planner.snap(&river, lat, lon)?;
            println!(
                "Mile {:.2} at ({:.5}, {:.5}), {:.2} mi off the river line{}",
                snap.projection.mile,
                snap.projection.snapped.lat,
                snap.projection.snapped.lon,
                snap.projection.offset_miles,
                if snap.needs_review { " - needs review" } else { "" }
            );
        }
        Command::Serve { port, workers } => {
            endpoint::start_endpoint_server(port, Arc::new(planner), workers)?;
        }
    }
    Ok(())
}

fn print_plan(plan: &FloatPlan) {
    println!("{}", plan.river.name);
    println!("  {} (mile {:.1}) -> {} (mile {:.1})",
        plan.put_in.name, plan.put_in.river_mile,
        plan.take_out.name, plan.take_out.river_mile);
    println!("  Distance:   {} {}", plan.distance.formatted, plan.direction.as_str());
    println!("  Float time: {} by {} at {} mph",
        plan.float_time.formatted, plan.vessel.name, plan.float_time.speed_mph);

    let c = &plan.condition;
    match (&c.gauge_name, c.gauge_height_ft, c.discharge_cfs) {
        (Some(gauge), ft, cfs) => {
            let ft = ft.map(|v| format!("{:.2} ft", v)).unwrap_or_else(|| "- ft".to_string());
            let cfs = cfs.map(|v| format!("{:.0} cfs", v)).unwrap_or_else(|| "- cfs".to_string());
            println!("  Condition:  {} ({}, {} at {})", c.label, ft, cfs, gauge);
        }
        (None, _, _) => println!("  Condition:  {}", c.label),
    }

    if !plan.hazards.is_empty() {
        println!("  Hazards:");
        for hazard in &plan.hazards {
            println!("    mile {:>6.1}  {}", hazard.river_mile, hazard.name);
        }
    }
    for warning in &plan.warnings {
        println!("  ! {}", warning);
    }
}

fn print_conditions(rows: &[GaugeCondition]) {
    for row in rows {
        let value = match (row.gauge_height_ft, row.discharge_cfs) {
            (Some(ft), _) => format!("{:.2} ft", ft),
            (None, Some(cfs)) => format!("{:.0} cfs", cfs),
            (None, None) => "no reading".to_string(),
        };
        println!("{:<12} {:<20} {:<40} {}", row.label, row.river_name, row.gauge_name, value);
    }
}
