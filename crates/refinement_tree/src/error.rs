//! Error types returned by the tree and by correction solvers.

/// Invalid arguments passed to [`crate::tree::RefinementTree`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefinementError {
    /// A point must have at least one coordinate.
    #[error("dimension must be positive")]
    ZeroDimension,

    /// The point slice does not match the declared or stored dimension.
    #[error("point has {got} coordinates, expected {expected}")]
    PointLength { expected: usize, got: usize },

    /// The tree was first updated with a different dimension.
    #[error("tree holds {expected}-dimensional points, got dimension {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Observed values are folded into running means and must be finite.
    #[error("observed value must be finite, got {0}")]
    NonFiniteValue(f64),

    /// Coordinates feed the candidate midpoints and must be finite.
    #[error("coordinate {dim} must be finite, got {value}")]
    NonFiniteCoordinate { dim: usize, value: f64 },

    /// Candidate labels for `best_q` must be sorted ascending.
    #[error("candidate labels must be sorted ascending")]
    UnsortedLabels,

    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// Reasons a correction could not be fitted. Never surfaced by the tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrectionError {
    #[error("leaf has zero variance")]
    ZeroVariance,

    #[error("no constraint rows")]
    Empty,

    #[error("problem contains non-finite data")]
    NonFinite,

    #[error("linear program is infeasible")]
    Infeasible,

    #[error("linear program is unbounded")]
    Unbounded,

    #[error("solver is disabled")]
    Disabled,
}
