use crate::conf::RefinementOptions;
use crate::correction::{Correction, CorrectionProblem, CorrectionSolver};
use crate::split::{FilterThresholds, SplitData};
use crate::stats::{Avg, QVar};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Value statistic of the leaf covering a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafEstimate {
    pub mean: f64,
    pub count: u64,
    pub variance: f64,
}

impl LeafEstimate {
    /// Result for labels the tree has never seen.
    pub fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            count: 0,
            variance: 0.0,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.mean.is_nan()
    }
}

/// Internal node: points with `point[dim] <= boundary` belong to `low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub dim: usize,
    pub boundary: f64,
    pub low: usize,
    pub high: usize,
}

impl Split {
    pub fn child_for(&self, point: &[f64]) -> usize {
        if point[self.dim] <= self.boundary {
            self.low
        } else {
            self.high
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub value: QVar,
    /// Raw number of observations, ignoring the learning-rate cap.
    pub sample_count: u64,
    pub per_dim: Option<Vec<SplitData>>,
    pub correction: Option<Correction>,
}

/// Outcome of splitting a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSplit {
    pub boundary: f64,
    pub low: Leaf,
    pub high: Leaf,
}

impl Leaf {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_value(value: QVar, per_dim: Vec<SplitData>, correction: Option<Correction>) -> Self {
        Self {
            value,
            sample_count: value.count() as u64,
            per_dim: Some(per_dim),
            correction,
        }
    }

    pub fn estimate(&self) -> LeafEstimate {
        LeafEstimate {
            mean: self.value.mean().unwrap_or(f64::NAN),
            count: self.sample_count,
            variance: self.value.variance(),
        }
    }

    /// Leaf mean shifted by the correction between the leaf's midpoints and `point`.
    pub fn corrected_mean(&self, point: &[f64]) -> f64 {
        let mean = self.value.mean().unwrap_or(f64::NAN);
        let (Some(correction), Some(per_dim)) = (&self.correction, &self.per_dim) else {
            return mean;
        };
        let center: Vec<f64> = per_dim
            .iter()
            .zip(point)
            .map(|(data, &x)| data.boundary().unwrap_or(x))
            .collect();
        mean + correction.shift(point, &center)
    }

    /// Folds one observation into the leaf.
    ///
    /// Returns the dimension to split on, chosen uniformly among all qualifying
    /// dimensions. When none qualifies the candidate midpoints are recentered
    /// instead.
    pub fn observe<R: Rng>(
        &mut self,
        point: &[f64],
        value: f64,
        delta: f64,
        options: &RefinementOptions,
        rng: &mut R,
    ) -> Option<usize> {
        let thresholds = FilterThresholds::new(delta, options);
        let per_dim = self
            .per_dim
            .get_or_insert_with(|| vec![SplitData::new(); point.len()]);

        self.value.push_capped(value, options.q_learn_rate);
        self.sample_count += 1;

        // reservoir sampling over the qualifying dimensions
        let mut qualifying = 0u32;
        let mut chosen = None;
        for (i, (data, &coord)) in per_dim.iter_mut().zip(point).enumerate() {
            data.observe(coord, value, &thresholds);
            if data.qualifies(options.filter_val) {
                qualifying += 1;
                if rng.random_range(0..qualifying) == 0 {
                    chosen = Some(i);
                }
            }
        }

        if chosen.is_none() && self.recenter() {
            trace!(samples = self.sample_count, "recentered split candidates");
        }
        chosen
    }

    /// Recenters every imbalanced dimension; if any moved, all filters restart.
    pub fn recenter(&mut self) -> bool {
        let Some(per_dim) = self.per_dim.as_mut() else {
            return false;
        };
        let mut moved = false;
        for data in per_dim.iter_mut() {
            moved |= data.recenter();
        }
        if moved {
            for data in per_dim.iter_mut() {
                data.filter.reset();
            }
        }
        moved
    }

    /// Splits the leaf along `dim` at that dimension's current midpoint.
    ///
    /// The children inherit the side value accumulators of `dim`; an empty side is
    /// seeded with the parent's mean. Their candidate midpoints start from the
    /// parent's coordinate means. A correction is fitted from the parent's split
    /// data and handed to both children. Returns the leaf unchanged if `dim` has
    /// no boundary.
    pub fn split<S: CorrectionSolver + ?Sized>(
        self,
        dim: usize,
        solver: &S,
    ) -> Result<LeafSplit, Leaf> {
        let boundary = self
            .per_dim
            .as_ref()
            .and_then(|per_dim| per_dim.get(dim))
            .and_then(SplitData::boundary);
        let Some(boundary) = boundary else {
            return Err(self);
        };
        let per_dim = self.per_dim.unwrap_or_default();

        let parent_mean = self.value.mean();
        let inherit = |q: QVar| match parent_mean {
            Some(mean) if q.is_empty() => QVar::seeded(mean),
            _ => q,
        };
        let low_value = inherit(per_dim[dim].low_value);
        let high_value = inherit(per_dim[dim].high_value);

        let seed_dims = |own: fn(&SplitData) -> Avg| -> Vec<SplitData> {
            per_dim
                .iter()
                .enumerate()
                .map(|(i, data)| {
                    let midpoint = if i == dim { own(data) } else { data.combined_coord() };
                    SplitData::with_midpoint(midpoint)
                })
                .collect()
        };
        let low_dims = seed_dims(|data| data.low_coord);
        let high_dims = seed_dims(|data| data.high_coord);

        let correction = match CorrectionProblem::from_leaf(&self.value, &per_dim)
            .and_then(|problem| solver.solve(&problem))
        {
            Ok(correction) => Some(correction),
            Err(err) => {
                debug!(%err, dim, "no correction fitted");
                None
            }
        };

        Ok(LeafSplit {
            boundary,
            low: Leaf::with_value(low_value, low_dims, correction.clone()),
            high: Leaf::with_value(high_value, high_dims, correction),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf(Leaf),
    Internal(Split),
}

impl Default for Node {
    fn default() -> Self {
        Node::Leaf(Leaf::new())
    }
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Internal(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Internal(_) => None,
        }
    }

    pub fn as_split(&self) -> Option<&Split> {
        match self {
            Node::Leaf(_) => None,
            Node::Internal(split) => Some(split),
        }
    }
}
