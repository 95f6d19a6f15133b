//! Online statistics used by the leaves.
//!
//! - [`Avg`]: incremental mean and population variance over weighted samples.
//! - [`QVar`]: an [`Avg`] whose prior weight can be capped before each sample,
//!   which turns the running mean into an exponentially forgetting estimate.

use serde::{Deserialize, Serialize};

// ------------------- Avg -------------------

/// Running mean and population variance.
///
/// The count is an effective sample weight. It starts at zero, grows by one per
/// sample and may become fractional when a recentering halves it. While the count
/// is zero the accumulator is empty and [`Avg::mean`] returns `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Avg {
    count: f64,
    mean: f64,
    variance: f64,
}

impl Avg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator holding `count` samples with the given moments.
    pub fn with_moments(mean: f64, count: f64, variance: f64) -> Self {
        Self {
            count: count.max(0.0),
            mean,
            variance: variance.max(0.0),
        }
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count <= 0.0
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() { None } else { Some(self.mean) }
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Welford update with a sample of weight one.
    pub fn push(&mut self, sample: f64) {
        if self.is_empty() {
            self.count = 1.0;
            self.mean = sample;
            self.variance = 0.0;
            return;
        }
        self.count += 1.0;
        let delta = sample - self.mean;
        self.mean += delta / self.count;
        let spread = delta * (sample - self.mean);
        self.variance = (self.variance + (spread - self.variance) / self.count).max(0.0);
    }

    /// Exact count-weighted merge of means and pooled variances.
    pub fn merge(&mut self, other: &Avg) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        let total = self.count + other.count;
        let mean = self.mean + (other.mean - self.mean) * (other.count / total);
        let own = self.variance + (self.mean - mean).powi(2);
        let theirs = other.variance + (other.mean - mean).powi(2);
        self.variance = ((self.count * own + other.count * theirs) / total).max(0.0);
        self.mean = mean;
        self.count = total;
    }

    /// Merged copy of `self` and `other`.
    pub fn combined(&self, other: &Avg) -> Avg {
        let mut out = *self;
        out.merge(other);
        out
    }

    /// Truncates the effective count to at most `cap`.
    pub fn cap_count(&mut self, cap: f64) {
        self.count = self.count.min(cap);
    }

    pub fn halve(&mut self) {
        self.count /= 2.0;
    }
}

// ------------------- QVar -------------------

/// Value accumulator of a leaf or of one side of a candidate split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QVar {
    stat: Avg,
}

impl QVar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_moments(mean: f64, count: f64, variance: f64) -> Self {
        Self {
            stat: Avg::with_moments(mean, count, variance),
        }
    }

    /// Accumulator holding one synthetic sample.
    pub fn seeded(mean: f64) -> Self {
        Self::with_moments(mean, 1.0, 0.0)
    }

    pub fn stat(&self) -> &Avg {
        &self.stat
    }

    pub fn count(&self) -> f64 {
        self.stat.count()
    }

    pub fn is_empty(&self) -> bool {
        self.stat.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        self.stat.mean()
    }

    pub fn variance(&self) -> f64 {
        self.stat.variance()
    }

    pub fn std_dev(&self) -> f64 {
        self.stat.std_dev()
    }

    pub fn push(&mut self, sample: f64) {
        self.stat.push(sample);
    }

    /// Caps the prior weight at `cap` before folding in `sample`, so a new sample
    /// never weighs less than `1 / (cap + 1)`.
    pub fn push_capped(&mut self, sample: f64, cap: usize) {
        self.stat.cap_count(cap as f64);
        self.stat.push(sample);
    }

    pub fn halve(&mut self) {
        self.stat.halve();
    }

    /// Blends two accumulators using their effective counts as weights.
    ///
    /// Counts of capped or halved accumulators no longer correspond to raw
    /// samples, so the result only approximates the statistic of the union.
    pub fn approximate(a: &QVar, b: &QVar) -> QVar {
        QVar {
            stat: a.stat.combined(&b.stat),
        }
    }
}

