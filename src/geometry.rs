/// River geometry: great-circle distance and the river-mile index.
///
/// `MileIndex` is built once from a river's polyline and then answers two
/// questions without rescanning cumulative lengths:
///
/// - where on the map is river mile N? (`mile_to_point`, binary search)
/// - what river mile is nearest to this coordinate? (`point_to_mile`)
///
/// The index is immutable and `Send + Sync`, so one instance can be shared
/// behind an `Arc` by any number of concurrent plan computations.

use geo::{HaversineDistance, Point};

use crate::model::{Coordinate, PlanError};

/// Meters per statute mile.
const METERS_PER_MILE: f64 = 1609.344;

/// Miles per degree of latitude on the haversine sphere.
const MILES_PER_DEGREE: f64 = 6_371_008.8 / METERS_PER_MILE * std::f64::consts::PI / 180.0;

/// Great-circle distance in statute miles.
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    p1.haversine_distance(&p2) / METERS_PER_MILE
}

fn lerp(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate {
        lat: a.lat + (b.lat - a.lat) * t,
        lon: a.lon + (b.lon - a.lon) * t,
    }
}

// ---------------------------------------------------------------------------
// Projection result
// ---------------------------------------------------------------------------

/// Closest point on the river line to some coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub mile: f64,
    /// The projected point on the polyline.
    pub snapped: Coordinate,
    /// Distance from the input coordinate to `snapped`, in miles.
    pub offset_miles: f64,
    /// Index of the segment's first vertex.
    pub segment: usize,
}

/// Outcome of snapping a raw access-point coordinate to the river.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub projection: Projection,
    /// Raw coordinate is farther from the river than the tolerance.
    pub needs_review: bool,
}

// ---------------------------------------------------------------------------
// Mile index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MileIndex {
    vertices: Vec<Coordinate>,
    /// Cumulative river mile at each vertex; same length as `vertices`.
    miles: Vec<f64>,
}

impl MileIndex {
    /// Builds the index from measured great-circle lengths.
    pub fn build(vertices: Vec<Coordinate>) -> Result<Self, PlanError> {
        if vertices.len() < 2 {
            return Err(PlanError::GeometryMissing { vertices: vertices.len() });
        }

        let mut miles = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        miles.push(total);
        for pair in vertices.windows(2) {
            total += haversine_miles(pair[0], pair[1]);
            miles.push(total);
        }

        Ok(MileIndex { vertices, miles })
    }

    /// Builds the index and rescales it so the last vertex sits at
    /// `declared_length` river miles. A non-positive declared length, or a
    /// polyline with no measurable length, keeps the measured miles.
    pub fn calibrated(vertices: Vec<Coordinate>, declared_length: f64) -> Result<Self, PlanError> {
        let mut index = Self::build(vertices)?;
        let measured = index.total_miles();
        if declared_length > 0.0 && measured > 0.0 {
            let scale = declared_length / measured;
            for mile in &mut index.miles {
                *mile *= scale;
            }
            if let Some(last) = index.miles.last_mut() {
                *last = declared_length;
            }
        }
        Ok(index)
    }

    pub fn total_miles(&self) -> f64 {
        self.miles.last().copied().unwrap_or(0.0)
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn vertex_miles(&self) -> &[f64] {
        &self.miles
    }

    pub fn clamp_mile(&self, mile: f64) -> f64 {
        mile.clamp(0.0, self.total_miles())
    }

    /// Geographic position of a river mile. Out-of-range miles clamp to the
    /// nearest end of the river.
    pub fn mile_to_point(&self, mile: f64) -> Coordinate {
        let mile = self.clamp_mile(mile);
        // First vertex at or beyond `mile`.
        let upper = self.miles.partition_point(|&m| m < mile);
        if upper == 0 {
            return self.vertices[0];
        }
        if upper >= self.vertices.len() {
            return self.vertices[self.vertices.len() - 1];
        }

        let lower = upper - 1;
        let span = self.miles[upper] - self.miles[lower];
        if span <= 0.0 {
            return self.vertices[upper];
        }
        let t = (mile - self.miles[lower]) / span;
        lerp(self.vertices[lower], self.vertices[upper], t)
    }

    /// Projects a coordinate onto the closest polyline segment.
    ///
    /// Segments are flattened with an equirectangular projection centred on
    /// the query point, which is accurate at river-section scale. The
    /// reported offset is the great-circle distance to the snapped point.
    pub fn point_to_mile(&self, point: Coordinate) -> Projection {
        let cos_lat = point.lat.to_radians().cos();
        let to_plane = |c: Coordinate| -> (f64, f64) {
            (
                (c.lon - point.lon) * cos_lat * MILES_PER_DEGREE,
                (c.lat - point.lat) * MILES_PER_DEGREE,
            )
        };

        let mut best: Option<Projection> = None;
        for (i, pair) in self.vertices.windows(2).enumerate() {
            let (ax, ay) = to_plane(pair[0]);
            let (bx, by) = to_plane(pair[1]);
            let (dx, dy) = (bx - ax, by - ay);
            let len_sq = dx * dx + dy * dy;
            let t = if len_sq > 0.0 {
                (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let snapped = lerp(pair[0], pair[1], t);
            let offset_miles = haversine_miles(point, snapped);
            if best.is_some_and(|b| b.offset_miles <= offset_miles) {
                continue;
            }
            best = Some(Projection {
                mile: self.miles[i] + t * (self.miles[i + 1] - self.miles[i]),
                snapped,
                offset_miles,
                segment: i,
            });
        }

        // At least one segment exists: `build` rejects shorter polylines.
        best.unwrap_or(Projection {
            mile: 0.0,
            snapped: self.vertices[0],
            offset_miles: haversine_miles(point, self.vertices[0]),
            segment: 0,
        })
    }

    /// Projects a raw coordinate and flags it for review when it lies more
    /// than `tolerance_miles` from the river line.
    pub fn snap(&self, raw: Coordinate, tolerance_miles: f64) -> Snap {
        let projection = self.point_to_mile(raw);
        Snap {
            projection,
            needs_review: projection.offset_miles > tolerance_miles,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
