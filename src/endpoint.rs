/// HTTP endpoint for float plans
///
/// A thin JSON layer over `Planner`, served by tiny_http with requests
/// handed to a thread pool.
///
/// Endpoints:
/// - GET /health - Service health check
/// - GET /plan?river=&put_in=&take_out=[&vessel=][&as_of=] - Float plan
/// - GET /conditions[?as_of=] - Every river gauge, best floating first
///
/// `as_of` is an RFC 3339 timestamp and defaults to now. Errors come back
/// as `{ "code": ..., "error": ... }` with a 4xx/5xx status.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use threadpool::ThreadPool;

use crate::model::PlanError;
use crate::planner::{PlanRequest, Planner};
use crate::store::PlanStore;

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Failed to start HTTP server on port {port}: {reason}")]
    Bind { port: u16, reason: String },
}

/// Status code and JSON body for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "code": code, "error": message.into() }),
        }
    }
}

impl From<PlanError> for ApiResponse {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::RiverNotFound(_)
            | PlanError::AccessPointNotFound { .. }
            | PlanError::VesselNotFound(_) => 404,
            PlanError::SamePoint
            | PlanError::InvalidVesselSpeed { .. }
            | PlanError::GeometryMissing { .. } => 400,
            PlanError::Storage(_) => 500,
        };
        ApiResponse::error(status, err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Splits a request URL into its path and decoded query parameters.
pub fn parse_query(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = urlencoding::decode(&value).ok()?.into_owned();
            Some((key, value))
        })
        .collect();
    (path, params)
}

fn as_of(params: &HashMap<String, String>, now: DateTime<Utc>) -> Result<DateTime<Utc>, ApiResponse> {
    match params.get("as_of") {
        None => Ok(now),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                ApiResponse::error(400, "BAD_REQUEST", format!("as_of is not an RFC 3339 time: {}", raw))
            }),
    }
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiResponse> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiResponse::error(400, "BAD_REQUEST", format!("missing query parameter '{}'", name)))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResponse {
    match serde_json::to_value(value) {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => ApiResponse::error(500, "INTERNAL", format!("failed to serialize response: {}", e)),
    }
}

/// Handles one request URL. `now` is the default reference time.
pub fn route<S: PlanStore>(planner: &Planner<S>, url: &str, now: DateTime<Utc>) -> ApiResponse {
    let (path, params) = parse_query(url);
    let result = match path {
        "/health" => Ok(handle_health()),
        "/plan" => handle_plan(planner, &params, now),
        "/conditions" => handle_conditions(planner, &params, now),
        _ => Ok(ApiResponse {
            status: 404,
            body: json!({
                "code": "NOT_FOUND",
                "error": "Not found",
                "available_endpoints": ["/health", "/plan", "/conditions"]
            }),
        }),
    };
    result.unwrap_or_else(|response| response)
}

fn handle_health() -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "ok",
        "service": "floatplan_service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn handle_plan<S: PlanStore>(
    planner: &Planner<S>,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Result<ApiResponse, ApiResponse> {
    let request = PlanRequest {
        river_id: required(params, "river")?.to_string(),
        put_in_id: required(params, "put_in")?.to_string(),
        take_out_id: required(params, "take_out")?.to_string(),
        vessel: params.get("vessel").filter(|v| !v.is_empty()).cloned(),
        as_of: as_of(params, now)?,
    };
    let plan = planner.plan(&request)?;
    Ok(to_json(&plan))
}

fn handle_conditions<S: PlanStore>(
    planner: &Planner<S>,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Result<ApiResponse, ApiResponse> {
    let rows = planner.conditions(as_of(params, now)?)?;
    Ok(to_json(&rows))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

fn respond(request: tiny_http::Request, response: ApiResponse) {
    let body = serde_json::to_string_pretty(&response.body).unwrap_or_else(|_| "{}".to_string());
    let mut http = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(response.status));
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        http = http.with_header(header);
    }
    if let Err(e) = request.respond(http) {
        warn!("Failed to send response: {}", e);
    }
}

/// Start the HTTP server on `port`, handling requests on `workers` threads.
/// Blocks for the life of the server.
pub fn start_endpoint_server<S: PlanStore + 'static>(
    port: u16,
    planner: Arc<Planner<S>>,
    workers: usize,
) -> Result<(), EndpointError> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port)).map_err(|e| EndpointError::Bind {
        port,
        reason: e.to_string(),
    })?;
    let pool = ThreadPool::new(workers.max(1));

    info!("HTTP endpoint listening on http://0.0.0.0:{}", port);
    info!("  GET /health | /plan?river=&put_in=&take_out=&vessel= | /conditions");

    for request in server.incoming_requests() {
        let planner = Arc::clone(&planner);
        pool.execute(move || {
            let url = request.url().to_string();
            let response = route(&*planner, &url, Utc::now());
            info!("{} {} -> {}", request.method(), url, response.status);
            respond(request, response);
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
