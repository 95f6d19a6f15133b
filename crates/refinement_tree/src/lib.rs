//! # Refinement Tree
//!
//! Online, self-partitioning regression trees for approximating value functions
//! (e.g. Q-functions) over a continuous input space, one tree per discrete label.
//!
//! ## Key Features
//!
//! - **Online statistics**: every leaf keeps a running, learning-rate capped
//!   estimate and per-dimension evidence about where it should split
//! - **Evidence driven splits**: a dimension splits once its filter signal
//!   reaches the configured threshold, ties broken uniformly at random
//! - **Arena storage**: nodes of all labels live in one growable `Vec` and refer
//!   to their children by index
//! - **Pluggable corrections**: a linear correction can be fitted at split time
//!   through any [`correction::CorrectionSolver`]
//!
//! ## Example
//!
//! ```rust
//! use refinement_tree::{RefinementOptions, RefinementTree};
//!
//! let options = RefinementOptions {
//!     filter_val: 3.0,
//!     ..RefinementOptions::default()
//! };
//! let mut tree = RefinementTree::new();
//! for i in 0..400 {
//!     let (x, q) = if i % 2 == 0 { (0.0, 0.0) } else { (1.0, 10.0) };
//!     tree.update(0, &[x], 1, q, 1.0, &options).unwrap();
//! }
//! let low = tree.lookup(0, &[0.1]).unwrap();
//! let high = tree.lookup(0, &[0.9]).unwrap();
//! assert!(low.mean < high.mean);
//! ```

pub mod conf;
pub mod correction;
pub mod error;
pub mod node;
pub mod print;
pub mod split;
pub mod stats;
pub mod tree;

pub use conf::RefinementOptions;
pub use correction::{Correction, CorrectionSolver, NoCorrection, SimplexSolver};
pub use error::{CorrectionError, RefinementError};
pub use node::{Leaf, LeafEstimate, Node, Split};
pub use tree::{LabelEntry, RefinementTree, SplitRecord};
