/// Float time estimation.
///
/// Speed is a flat per-vessel baseline; it is not adjusted for flow or
/// gradient.

use crate::model::{FloatTime, PlanError, VesselType};

/// Estimated time on the water for `distance_miles` in `vessel`.
pub fn estimate(distance_miles: f64, vessel: &VesselType) -> Result<FloatTime, PlanError> {
    if !(vessel.speed_mph.is_finite() && vessel.speed_mph > 0.0) {
        return Err(PlanError::InvalidVesselSpeed {
            vessel: vessel.slug.clone(),
            speed_mph: vessel.speed_mph,
        });
    }

    let minutes = (distance_miles.max(0.0) / vessel.speed_mph * 60.0).round() as u32;
    Ok(FloatTime {
        minutes,
        formatted: format_minutes(minutes),
        speed_mph: vessel.speed_mph,
    })
}

/// `"4h 48m"`, or just `"35m"` when under an hour.
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vessel(slug: &str, speed_mph: f64) -> VesselType {
        VesselType {
            slug: slug.to_string(),
            name: slug.to_string(),
            speed_mph,
        }
    }

    #[test]
    fn test_twelve_miles_by_canoe() {
        let t = estimate(67.2 - 55.2, &vessel("canoe", 2.5)).unwrap();
        assert_eq!(t.minutes, 288);
        assert_eq!(t.formatted, "4h 48m");
        assert_eq!(t.speed_mph, 2.5);
    }

    #[test]
    fn test_zero_distance() {
        let t = estimate(0.0, &vessel("canoe", 2.5)).unwrap();
        assert_eq!(t.minutes, 0);
        assert_eq!(t.formatted, "0m");
    }

    #[test]
    fn test_under_an_hour_omits_hours() {
        let t = estimate(1.0, &vessel("kayak", 3.0)).unwrap();
        assert_eq!(t.formatted, "20m");
    }

    #[test]
    fn test_slower_vessel_takes_longer() {
        let canoe = estimate(10.0, &vessel("canoe", 2.5)).unwrap();
        let raft = estimate(10.0, &vessel("raft", 2.0)).unwrap();
        assert!(raft.minutes > canoe.minutes);
        assert_eq!(raft.formatted, "5h 0m");
    }

    #[test]
    fn test_non_positive_speed_is_rejected() {
        for speed in [0.0, -1.0, f64::NAN] {
            let err = estimate(5.0, &vessel("anchor", speed)).unwrap_err();
            assert_eq!(err.code(), "INVALID_VESSEL_SPEED");
        }
    }
}
