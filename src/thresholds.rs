/// Flow condition classification.
///
/// A gauge's thresholds are six optional tier boundaries. A reading is
/// classified by walking an ordered rule table from most to least severe;
/// the first rule that applies wins. Absent tiers never match, so a
/// missing boundary is "not applicable" rather than zero.
///
/// Each river/gauge association stores its thresholds twice, once in the
/// primary unit and once in the alternate unit. `DualThresholds` keeps the
/// two groups together so a unit swap always moves all six tiers at once.

use serde::{Deserialize, Serialize};

use crate::model::GaugeReading;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Measurement unit a threshold set is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdUnit {
    /// Gauge height, feet.
    #[serde(rename = "ft")]
    Feet,
    /// Discharge, cubic feet per second.
    #[serde(rename = "cfs")]
    Cfs,
}

impl ThresholdUnit {
    pub fn other(self) -> Self {
        match self {
            ThresholdUnit::Feet => ThresholdUnit::Cfs,
            ThresholdUnit::Cfs => ThresholdUnit::Feet,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdUnit::Feet => "ft",
            ThresholdUnit::Cfs => "cfs",
        }
    }
}

// ---------------------------------------------------------------------------
// Condition codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCode {
    Dangerous,
    High,
    Optimal,
    Low,
    VeryLow,
    TooLow,
    Unknown,
}

impl ConditionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionCode::Dangerous => "dangerous",
            ConditionCode::High => "high",
            ConditionCode::Optimal => "optimal",
            ConditionCode::Low => "low",
            ConditionCode::VeryLow => "very_low",
            ConditionCode::TooLow => "too_low",
            ConditionCode::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConditionCode::Dangerous => "Dangerous - flood conditions",
            ConditionCode::High => "High water - experienced paddlers only",
            ConditionCode::Optimal => "Optimal",
            ConditionCode::Low => "Low - floatable",
            ConditionCode::VeryLow => "Very low - expect scraping",
            ConditionCode::TooLow => "Too low to float",
            ConditionCode::Unknown => "Unknown",
        }
    }

    /// Sort key for listing many gauges: best floating first, unknown last.
    pub fn display_rank(&self) -> u8 {
        match self {
            ConditionCode::Optimal => 0,
            ConditionCode::Low => 1,
            ConditionCode::VeryLow => 2,
            ConditionCode::High => 3,
            ConditionCode::TooLow => 4,
            ConditionCode::Dangerous => 5,
            ConditionCode::Unknown => 6,
        }
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Six named boundaries. Any of them may be undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTiers {
    #[serde(default)]
    pub too_low: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub optimal_min: Option<f64>,
    #[serde(default)]
    pub optimal_max: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub dangerous: Option<f64>,
}

/// A pair of defined tiers out of order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("threshold '{lower}' ({lower_value}) is above '{upper}' ({upper_value})")]
pub struct ThresholdOrderError {
    pub lower: &'static str,
    pub lower_value: f64,
    pub upper: &'static str,
    pub upper_value: f64,
}

impl ThresholdTiers {
    /// Tiers in ascending order, paired with their names.
    fn named(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("too_low", self.too_low),
            ("low", self.low),
            ("optimal_min", self.optimal_min),
            ("optimal_max", self.optimal_max),
            ("high", self.high),
            ("dangerous", self.dangerous),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.named().iter().all(|(_, v)| v.is_none())
    }

    /// Checks that defined tiers never decrease. Undefined tiers are skipped.
    pub fn validate(&self) -> Result<(), ThresholdOrderError> {
        let mut previous: Option<(&'static str, f64)> = None;
        for (name, value) in self.named() {
            let Some(value) = value else { continue };
            if let Some((prev_name, prev_value)) = previous {
                if value < prev_value {
                    return Err(ThresholdOrderError {
                        lower: prev_name,
                        lower_value: prev_value,
                        upper: name,
                        upper_value: value,
                    });
                }
            }
            previous = Some((name, value));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn at_least(bound: Option<f64>, reading: f64) -> bool {
    bound.is_some_and(|b| reading >= b)
}

fn below(bound: Option<f64>, reading: f64) -> bool {
    bound.is_some_and(|b| reading < b)
}

fn within_optimal(tiers: &ThresholdTiers, reading: f64) -> bool {
    match (tiers.optimal_min, tiers.optimal_max) {
        (Some(min), Some(max)) => min <= reading && reading <= max,
        _ => false,
    }
}

fn is_dangerous(t: &ThresholdTiers, r: f64) -> bool {
    at_least(t.dangerous, r)
}

fn is_high(t: &ThresholdTiers, r: f64) -> bool {
    at_least(t.high, r)
}

fn is_low(t: &ThresholdTiers, r: f64) -> bool {
    at_least(t.low, r)
}

fn is_very_low(t: &ThresholdTiers, r: f64) -> bool {
    at_least(t.too_low, r)
}

fn is_too_low(t: &ThresholdTiers, r: f64) -> bool {
    below(t.too_low, r)
}

struct Rule {
    code: ConditionCode,
    applies: fn(&ThresholdTiers, f64) -> bool,
}

/// Evaluated top to bottom; first match wins.
const RULES: [Rule; 6] = [
    Rule { code: ConditionCode::Dangerous, applies: is_dangerous },
    Rule { code: ConditionCode::High, applies: is_high },
    Rule { code: ConditionCode::Optimal, applies: within_optimal },
    Rule { code: ConditionCode::Low, applies: is_low },
    Rule { code: ConditionCode::VeryLow, applies: is_very_low },
    Rule { code: ConditionCode::TooLow, applies: is_too_low },
];

/// Maps one reading onto a tier set.
pub fn classify(reading: Option<f64>, tiers: &ThresholdTiers) -> ConditionCode {
    let Some(reading) = reading.filter(|r| r.is_finite()) else {
        return ConditionCode::Unknown;
    };
    if tiers.is_empty() {
        return ConditionCode::Unknown;
    }
    RULES
        .iter()
        .find(|rule| (rule.applies)(tiers, reading))
        .map(|rule| rule.code)
        .unwrap_or(ConditionCode::Unknown)
}

// ---------------------------------------------------------------------------
// Unit duality
// ---------------------------------------------------------------------------

/// A tier set tagged with the unit it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitThresholds {
    pub unit: ThresholdUnit,
    pub tiers: ThresholdTiers,
}

/// Primary-unit and alternate-unit tiers for one association.
///
/// The alternate set is always in the other unit; the fields are private so
/// nothing can replace one group without the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualThresholds {
    primary: UnitThresholds,
    alternate: UnitThresholds,
}

impl DualThresholds {
    pub fn new(
        primary_unit: ThresholdUnit,
        primary_tiers: ThresholdTiers,
        alternate_tiers: ThresholdTiers,
    ) -> Self {
        DualThresholds {
            primary: UnitThresholds { unit: primary_unit, tiers: primary_tiers },
            alternate: UnitThresholds { unit: primary_unit.other(), tiers: alternate_tiers },
        }
    }

    pub fn unit(&self) -> ThresholdUnit {
        self.primary.unit
    }

    pub fn primary(&self) -> &UnitThresholds {
        &self.primary
    }

    pub fn alternate(&self) -> &UnitThresholds {
        &self.alternate
    }

    /// Tiers expressed in `unit`, whichever group holds them.
    pub fn tiers_for(&self, unit: ThresholdUnit) -> &ThresholdTiers {
        if self.primary.unit == unit {
            &self.primary.tiers
        } else {
            &self.alternate.tiers
        }
    }

    /// Exchanges the primary and alternate groups. Applying it twice is the
    /// identity.
    pub fn swapped(self) -> Self {
        DualThresholds {
            primary: self.alternate,
            alternate: self.primary,
        }
    }

    /// Returns thresholds whose primary unit is `unit`, swapping only when
    /// the stored primary differs.
    pub fn with_primary_unit(self, unit: ThresholdUnit) -> Self {
        if self.primary.unit == unit {
            self
        } else {
            self.swapped()
        }
    }

    pub fn validate(&self) -> Result<(), ThresholdOrderError> {
        self.primary.tiers.validate()?;
        self.alternate.tiers.validate()
    }

    /// Classifies a gauge reading. The primary-unit value is used when
    /// present and the primary tiers are defined; otherwise the other value
    /// is checked against the alternate tiers. A primary value that matches
    /// no tier stays unknown.
    pub fn classify_reading(&self, reading: &GaugeReading) -> ConditionCode {
        let primary_value = reading.value_in(self.primary.unit);
        if primary_value.is_none() || self.primary.tiers.is_empty() {
            return classify(reading.value_in(self.alternate.unit), &self.alternate.tiers);
        }
        classify(primary_value, &self.primary.tiers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
