use crate::error::RefinementError;
use serde::{Deserialize, Serialize};

/// Base of the imbalance test that decides when a candidate midpoint is
/// recentered: a dimension is recentered once `RECENTER_BASE^min < max` for its
/// low/high coordinate counts.
pub const RECENTER_BASE: f64 = 5.0;

/// Seed used by [`crate::tree::RefinementTree::new`].
pub const DEFAULT_SEED: u64 = 42;

/// Marker printed for leaves whose mean is infinite or undefined.
pub const NON_FINITE_MARKER: &str = "\"inf\"";

/// Significant digits used when printing floats.
pub const PRINT_PRECISION: usize = f64::DIGITS as usize + 1;

/// Options controlling how a leaf learns and when it splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementOptions {
    /// Cap on the effective sample count of a leaf's value accumulator.
    pub q_learn_rate: usize,
    /// Multiplier applied to the caller's `delta` to get the mean-difference threshold.
    #[serde(alias = "indefference")]
    pub indifference: f64,
    /// Minimum samples on each side before the count signal accrues.
    pub lower_t: f64,
    /// Sample count at which the count signal accrues at full weight.
    pub upper_t: f64,
    /// Cap on the KS-like signal.
    pub ks_limit: f64,
    /// Decay applied to filter evidence on every observation, in `[0, 1]`.
    pub filter_rate: f64,
    /// A dimension qualifies for a split once its strongest signal reaches this value.
    pub filter_val: f64,
}

impl Default for RefinementOptions {
    fn default() -> Self {
        Self {
            q_learn_rate: 50,
            indifference: 0.2,
            lower_t: 2.0,
            upper_t: 20.0,
            ks_limit: 5.0,
            filter_rate: 0.1,
            filter_val: 4.0,
        }
    }
}

impl RefinementOptions {
    pub fn validate(&self) -> Result<(), RefinementError> {
        if self.q_learn_rate == 0 {
            return Err(RefinementError::InvalidOption {
                name: "q_learn_rate",
                reason: "must be at least 1".to_string(),
            });
        }
        let non_negative = [
            ("indifference", self.indifference),
            ("lower_t", self.lower_t),
            ("upper_t", self.upper_t),
            ("ks_limit", self.ks_limit),
            ("filter_val", self.filter_val),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RefinementError::InvalidOption {
                    name,
                    reason: format!("must be finite and non-negative, got {value}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.filter_rate) {
            return Err(RefinementError::InvalidOption {
                name: "filter_rate",
                reason: format!("must lie in [0, 1], got {}", self.filter_rate),
            });
        }
        Ok(())
    }
}
