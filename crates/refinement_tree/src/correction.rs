//! Locally linear corrections fitted when a leaf splits.
//!
//! The tree only prepares a [`CorrectionProblem`] from the leaf's per-dimension
//! statistics; solving it is delegated to a [`CorrectionSolver`].
//!
//! For every dimension `d` and side `s` the linear model
//! `sum_i beta_i * x_i + c` should reproduce the observed side mean, where
//! `x_d` is the side's coordinate mean and `x_i` (`i != d`) is the combined
//! coordinate mean of dimension `i`. Each row gets a pair of non-negative slacks
//! and the objective minimises the confidence-weighted slack. With `r` the ratio
//! of the side's standard deviation to the leaf's, the slack covering a
//! prediction below the target costs `1 / (1 + r^2)` and the one covering a
//! prediction above it costs `1 / (1 + r)`.

use crate::error::CorrectionError;
use crate::split::{Side, SplitData};
use crate::stats::QVar;
use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use serde::{Deserialize, Serialize};

/// One equality constraint of the correction program.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRow {
    pub coords: Vec<f64>,
    pub target: f64,
    /// Objective weight of the `+1` slack, used when the prediction falls short.
    pub over_weight: f64,
    /// Objective weight of the `-1` slack, used when the prediction overshoots.
    pub under_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionProblem {
    pub dimen: usize,
    pub rows: Vec<CorrectionRow>,
}

impl CorrectionProblem {
    /// Builds the program for a leaf about to split.
    ///
    /// Sides without value samples produce no row. A leaf whose value variance
    /// is zero is already exact and yields [`CorrectionError::ZeroVariance`].
    pub fn from_leaf(value: &QVar, per_dim: &[SplitData]) -> Result<Self, CorrectionError> {
        let leaf_std = value.std_dev();
        if !(leaf_std > 0.0) {
            return Err(CorrectionError::ZeroVariance);
        }
        let centers: Vec<f64> = per_dim
            .iter()
            .map(|data| data.combined_coord().mean().unwrap_or(0.0))
            .collect();

        let mut rows = Vec::with_capacity(per_dim.len() * 2);
        for (d, data) in per_dim.iter().enumerate() {
            for side in [Side::Low, Side::High] {
                let q = data.value(side);
                let (Some(target), Some(coord)) = (q.mean(), data.coord(side).mean()) else {
                    continue;
                };
                let mut coords = centers.clone();
                coords[d] = coord;
                let ratio = q.std_dev() / leaf_std;
                rows.push(CorrectionRow {
                    coords,
                    target,
                    over_weight: 1.0 / (1.0 + ratio * ratio),
                    under_weight: 1.0 / (1.0 + ratio),
                });
            }
        }
        if rows.is_empty() {
            return Err(CorrectionError::Empty);
        }
        Ok(Self {
            dimen: per_dim.len(),
            rows,
        })
    }

    fn is_finite(&self) -> bool {
        self.rows.iter().all(|row| {
            row.target.is_finite()
                && row.over_weight.is_finite()
                && row.under_weight.is_finite()
                && row.coords.iter().all(|c| c.is_finite())
        })
    }
}

/// Fitted linear model `sum_i coefficients[i] * x_i + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub coefficients: Vec<f64>,
    pub offset: f64,
}

impl Correction {
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(point)
            .map(|(beta, x)| beta * x)
            .sum::<f64>()
            + self.offset
    }

    /// Change of the model between `center` and `point`.
    pub fn shift(&self, point: &[f64], center: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(point.iter().zip(center))
            .map(|(beta, (x, c))| beta * (x - c))
            .sum()
    }
}

/// Solves correction programs.
pub trait CorrectionSolver {
    fn solve(&self, problem: &CorrectionProblem) -> Result<Correction, CorrectionError>;
}

/// Never fits a correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCorrection;

impl CorrectionSolver for NoCorrection {
    fn solve(&self, _problem: &CorrectionProblem) -> Result<Correction, CorrectionError> {
        Err(CorrectionError::Disabled)
    }
}

/// Simplex solver backed by `minilp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl CorrectionSolver for SimplexSolver {
    fn solve(&self, problem: &CorrectionProblem) -> Result<Correction, CorrectionError> {
        if problem.rows.is_empty() {
            return Err(CorrectionError::Empty);
        }
        if !problem.is_finite() {
            return Err(CorrectionError::NonFinite);
        }

        let mut lp = Problem::new(OptimizationDirection::Minimize);
        let free = (f64::NEG_INFINITY, f64::INFINITY);
        let coefficients: Vec<_> = (0..problem.dimen).map(|_| lp.add_var(0.0, free)).collect();
        let offset = lp.add_var(0.0, free);

        for row in &problem.rows {
            let over = lp.add_var(row.over_weight, (0.0, f64::INFINITY));
            let under = lp.add_var(row.under_weight, (0.0, f64::INFINITY));
            let mut expr = LinearExpr::empty();
            for (&var, &coord) in coefficients.iter().zip(&row.coords) {
                expr.add(var, coord);
            }
            expr.add(offset, 1.0);
            expr.add(over, 1.0);
            expr.add(under, -1.0);
            lp.add_constraint(expr, ComparisonOp::Eq, row.target);
        }

        let solution = lp.solve().map_err(|err| match err {
            minilp::Error::Infeasible => CorrectionError::Infeasible,
            minilp::Error::Unbounded => CorrectionError::Unbounded,
        })?;
        Ok(Correction {
            coefficients: coefficients.iter().map(|&var| solution[var]).collect(),
            offset: solution[offset],
        })
    }
}
