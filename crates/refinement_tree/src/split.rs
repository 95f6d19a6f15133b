//! Split evidence for a single input dimension.
//!
//! Every leaf keeps one [`SplitData`] per dimension. It tracks how the observed
//! values would be distributed if the leaf were split at the current candidate
//! midpoint, and a [`SplitFilter`] that accumulates evidence that the two sides
//! really differ.

use crate::conf::{RECENTER_BASE, RefinementOptions};
use crate::stats::{Avg, QVar};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Which hypothetical side of the midpoint a coordinate falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Low,
    High,
}

/// Thresholds the filter is evaluated against, derived from
/// [`RefinementOptions`] and the caller's `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterThresholds {
    /// Smallest difference of means that counts as evidence.
    pub indifference: f64,
    pub lower_t: f64,
    pub upper_t: f64,
    pub ks_limit: f64,
    pub rate: f64,
}

impl FilterThresholds {
    pub fn new(delta: f64, options: &RefinementOptions) -> Self {
        Self {
            indifference: (delta * options.indifference).abs(),
            lower_t: options.lower_t,
            upper_t: options.upper_t,
            ks_limit: options.ks_limit,
            rate: options.filter_rate,
        }
    }
}

// ------------------- SplitFilter -------------------

/// Three leaky evidence accumulators, all non-negative.
///
/// - `mean`: counts observations where the side means differ by more than the
///   indifference threshold.
/// - `count`: same test, weighted by how populated the smaller side is
///   (`min(n_low, n_high) / upper_t`, once both sides reach `lower_t`).
/// - `ks`: Kolmogorov-Smirnov distance between normal fits of both sides,
///   capped at `ks_limit`.
///
/// Each update first decays the old evidence by `1 - rate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitFilter {
    mean: f64,
    count: f64,
    ks: f64,
}

impl SplitFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean_signal(&self) -> f64 {
        self.mean
    }

    pub fn count_signal(&self) -> f64 {
        self.count
    }

    pub fn ks_signal(&self) -> f64 {
        self.ks
    }

    /// Strongest of the three signals.
    pub fn max(&self) -> f64 {
        self.mean.max(self.count).max(self.ks)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add(&mut self, low: &QVar, high: &QVar, thresholds: &FilterThresholds) {
        let (Some(low_mean), Some(high_mean)) = (low.mean(), high.mean()) else {
            return;
        };
        let keep = 1.0 - thresholds.rate;
        self.mean *= keep;
        self.count *= keep;
        self.ks *= keep;

        let diff = (low_mean - high_mean).abs();
        if !(diff > thresholds.indifference) {
            return;
        }

        self.mean += 1.0;

        let smaller = low.count().min(high.count());
        if smaller >= thresholds.lower_t {
            let weight = if thresholds.upper_t > 0.0 {
                (smaller / thresholds.upper_t).min(1.0)
            } else {
                1.0
            };
            self.count += weight;
        }

        let distance = ks_distance(diff, low.std_dev() + high.std_dev());
        self.ks = (self.ks + distance).min(thresholds.ks_limit);
    }
}

/// KS distance between two normals whose means are `diff` apart, using the
/// equal-variance closed form `2 * Phi(diff / (sigma_low + sigma_high)) - 1`.
fn ks_distance(diff: f64, spread: f64) -> f64 {
    if spread <= 0.0 {
        return 1.0;
    }
    // 2 * Phi(z) - 1 == erf(z / sqrt(2))
    erf(diff / spread / SQRT_2).clamp(0.0, 1.0)
}

// ------------------- SplitData -------------------

/// Hypothetical split of a leaf along one dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitData {
    /// Running estimate of the split boundary; empty until first populated.
    pub midpoint: Avg,
    pub low_value: QVar,
    pub high_value: QVar,
    pub low_coord: Avg,
    pub high_coord: Avg,
    pub filter: SplitFilter,
}

impl SplitData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh data whose candidate boundary starts at `midpoint`.
    pub fn with_midpoint(midpoint: Avg) -> Self {
        Self {
            midpoint,
            ..Self::default()
        }
    }

    /// Current candidate boundary, if defined and finite.
    pub fn boundary(&self) -> Option<f64> {
        self.midpoint.mean().filter(|b| b.is_finite())
    }

    /// Side a coordinate is routed to. With no boundary yet everything goes low.
    pub fn side_of(&self, coord: f64) -> Side {
        match self.boundary() {
            Some(b) if coord > b => Side::High,
            _ => Side::Low,
        }
    }

    /// Running mean of all coordinates seen on either side.
    pub fn combined_coord(&self) -> Avg {
        self.low_coord.combined(&self.high_coord)
    }

    pub fn value(&self, side: Side) -> &QVar {
        match side {
            Side::Low => &self.low_value,
            Side::High => &self.high_value,
        }
    }

    pub fn coord(&self, side: Side) -> &Avg {
        match side {
            Side::Low => &self.low_coord,
            Side::High => &self.high_coord,
        }
    }

    /// Folds one observation into the side selected by the current midpoint and
    /// advances the filter.
    pub fn observe(&mut self, coord: f64, value: f64, thresholds: &FilterThresholds) {
        match self.side_of(coord) {
            Side::Low => {
                self.low_value.push(value);
                self.low_coord.push(coord);
            }
            Side::High => {
                self.high_value.push(value);
                self.high_coord.push(coord);
            }
        }
        self.filter.add(&self.low_value, &self.high_value, thresholds);
    }

    /// Whether this dimension has gathered enough evidence to split.
    pub fn qualifies(&self, filter_val: f64) -> bool {
        self.boundary().is_some() && self.filter.max() >= filter_val
    }

    /// Moves the candidate boundary towards the bulk of the data when the
    /// coordinates pile up on one side. Returns `true` if the boundary moved.
    ///
    /// Both coordinate sides restart from the combined mean with half its weight
    /// and both value sides from their approximate merge with half its weight.
    /// The caller is responsible for resetting the filters.
    pub fn recenter(&mut self) -> bool {
        let larger = self.low_coord.count().max(self.high_coord.count());
        let smaller = self.low_coord.count().min(self.high_coord.count());
        if !(larger >= 2.0 && RECENTER_BASE.powf(smaller) < larger && larger > self.midpoint.count())
        {
            return false;
        }

        let combined = self.combined_coord();
        if combined.mean() == self.midpoint.mean() {
            return false;
        }

        let mut half = combined;
        half.halve();
        self.low_coord = half;
        self.high_coord = half;
        self.midpoint.merge(&combined);

        let mut merged = QVar::approximate(&self.low_value, &self.high_value);
        merged.halve();
        self.low_value = merged;
        self.high_value = merged;
        true
    }
}
