/// Route extraction between two river miles.
///
/// Once both ends of a trip are expressed as river miles the distance is a
/// plain difference; the index already accounts for the river's curvature.
/// The clipped path is rebuilt from the index so it can be drawn from the
/// put-in to the take-out.

use crate::geometry::MileIndex;
use crate::model::{Coordinate, Direction, PlanError};

/// Paddling distance between two river miles.
pub fn distance(mile_a: f64, mile_b: f64) -> f64 {
    (mile_b - mile_a).abs()
}

/// Direction of travel from `from_mile` to `to_mile`. Miles increase
/// downstream.
pub fn direction(from_mile: f64, to_mile: f64) -> Result<Direction, PlanError> {
    if to_mile > from_mile {
        Ok(Direction::Downstream)
    } else if to_mile < from_mile {
        Ok(Direction::Upstream)
    } else {
        Err(PlanError::SamePoint)
    }
}

/// Polyline from `from_mile` to `to_mile` in travel order: the exact
/// interpolated end points plus every vertex strictly between them.
pub fn extract_path(index: &MileIndex, from_mile: f64, to_mile: f64) -> Vec<Coordinate> {
    let (start, end) = if from_mile <= to_mile {
        (from_mile, to_mile)
    } else {
        (to_mile, from_mile)
    };

    let mut path = vec![index.mile_to_point(start)];
    path.extend(
        index
            .vertices()
            .iter()
            .zip(index.vertex_miles())
            .filter(|&(_, &m)| m > start && m < end)
            .map(|(&v, _)| v),
    );
    path.push(index.mile_to_point(end));

    if to_mile < from_mile {
        path.reverse();
    }
    path
}

/// Distance, direction and clipped geometry for one trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_miles: f64,
    pub direction: Direction,
    pub path: Vec<Coordinate>,
}

pub fn extract(index: &MileIndex, from_mile: f64, to_mile: f64) -> Result<Route, PlanError> {
    let direction = direction(from_mile, to_mile)?;
    Ok(Route {
        distance_miles: distance(from_mile, to_mile),
        direction,
        path: extract_path(index, from_mile, to_mile),
    })
}

/// Formats a distance the way the plan output shows it, e.g. `"12.0 mi"`.
pub fn format_distance(miles: f64) -> String {
    format!("{:.1} mi", miles)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
