use crate::conf::{DEFAULT_SEED, RefinementOptions};
use crate::correction::{CorrectionSolver, NoCorrection};
use crate::error::RefinementError;
use crate::node::{LeafEstimate, Node, Split};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Root of the tree belonging to one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: usize,
    pub root: usize,
}

// Split record to inspect the refinement history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub label: usize,
    pub parent_index: usize,
    pub dim: usize,
    pub boundary: f64,
    pub low_child_index: usize,
    pub high_child_index: usize,
}

fn default_rng() -> StdRng {
    StdRng::seed_from_u64(DEFAULT_SEED)
}

/// Online regression tree over `dimen`-dimensional points, one root per label.
///
/// All nodes of all labels live in a single arena that only grows. Children are
/// referred to by arena index and are always appended after their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementTree<S = NoCorrection> {
    nodes: Vec<Node>,
    /// Sorted by label.
    mapping: Vec<LabelEntry>,
    dimen: Option<usize>,
    split_history: Vec<SplitRecord>,
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
    #[serde(skip)]
    solver: S,
}

impl RefinementTree<NoCorrection> {
    /// Tree that never fits corrections, seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_solver(NoCorrection, None)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_solver(NoCorrection, Some(seed))
    }
}

impl Default for RefinementTree<NoCorrection> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RefinementTree<S> {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.mapping
    }

    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.mapping.iter().map(|entry| entry.label)
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Dimension fixed by the first update, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimen
    }

    pub fn get_split_history(&self) -> &Vec<SplitRecord> {
        &self.split_history
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn root_of(&self, label: usize) -> Option<usize> {
        self.find(label).ok().map(|pos| self.mapping[pos].root)
    }

    /// Arena indices of the leaves under `label`, low side first.
    pub fn leaves(&self, label: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack: Vec<usize> = self.root_of(label).into_iter().collect();
        while let Some(index) = stack.pop() {
            match &self.nodes[index] {
                Node::Leaf(_) => leaves.push(index),
                Node::Internal(split) => {
                    stack.push(split.high);
                    stack.push(split.low);
                }
            }
        }
        leaves
    }

    /// Value statistic of the leaf covering `point`, or
    /// [`LeafEstimate::undefined`] when `label` was never updated.
    pub fn lookup(&self, label: usize, point: &[f64]) -> Result<LeafEstimate, RefinementError> {
        let Some(root) = self.root_of(label) else {
            return Ok(LeafEstimate::undefined());
        };
        self.check_point(point)?;
        let index = self.descend(root, point);
        Ok(self.nodes[index]
            .as_leaf()
            .map(|leaf| leaf.estimate())
            .unwrap_or_else(LeafEstimate::undefined))
    }

    /// Leaf mean at `point` adjusted by the leaf's fitted correction, if any.
    /// NaN for unknown labels.
    pub fn estimate(&self, label: usize, point: &[f64]) -> Result<f64, RefinementError> {
        let Some(root) = self.root_of(label) else {
            return Ok(f64::NAN);
        };
        self.check_point(point)?;
        let index = self.descend(root, point);
        Ok(self.nodes[index]
            .as_leaf()
            .map(|leaf| leaf.corrected_mean(point))
            .unwrap_or(f64::NAN))
    }

    /// Best finite leaf mean at `point` over `candidates` (every label if `None`).
    ///
    /// Candidates must be sorted ascending; labels without a tree are skipped.
    /// Returns `+inf` when minimizing and `-inf` when maximizing if no candidate
    /// has a finite estimate.
    pub fn best_q(
        &self,
        point: &[f64],
        minimize: bool,
        candidates: Option<&[usize]>,
    ) -> Result<f64, RefinementError> {
        let mut best = if minimize {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        if let Some(labels) = candidates {
            if labels.windows(2).any(|pair| pair[0] > pair[1]) {
                return Err(RefinementError::UnsortedLabels);
            }
        }
        if self.mapping.is_empty() {
            return Ok(best);
        }
        self.check_point(point)?;

        let mut consider = |root: usize| {
            let index = self.descend(root, point);
            let value = self.nodes[index]
                .as_leaf()
                .and_then(|leaf| leaf.value.mean())
                .unwrap_or(f64::NAN);
            if value.is_finite() {
                best = if minimize {
                    best.min(value)
                } else {
                    best.max(value)
                };
            }
        };

        match candidates {
            None => self.mapping.iter().for_each(|entry| consider(entry.root)),
            Some(labels) => {
                let mut j = 0;
                for &label in labels {
                    while j < self.mapping.len() && self.mapping[j].label < label {
                        j += 1;
                    }
                    if j >= self.mapping.len() {
                        break;
                    }
                    if self.mapping[j].label == label {
                        consider(self.mapping[j].root);
                    }
                }
            }
        }
        Ok(best)
    }

    fn find(&self, label: usize) -> Result<usize, usize> {
        self.mapping.binary_search_by_key(&label, |entry| entry.label)
    }

    fn descend(&self, mut index: usize, point: &[f64]) -> usize {
        while let Node::Internal(split) = &self.nodes[index] {
            index = split.child_for(point);
        }
        index
    }

    fn check_point(&self, point: &[f64]) -> Result<(), RefinementError> {
        match self.dimen {
            Some(expected) if point.len() != expected => Err(RefinementError::PointLength {
                expected,
                got: point.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl<S: CorrectionSolver> RefinementTree<S> {
    /// Tree fitting corrections with `solver`. Tie-breaks between split
    /// dimensions draw from an RNG seeded with `seed` (default 42).
    pub fn with_solver(solver: S, seed: Option<u64>) -> Self {
        Self {
            nodes: Vec::new(),
            mapping: Vec::new(),
            dimen: None,
            split_history: Vec::new(),
            rng: StdRng::seed_from_u64(seed.unwrap_or(DEFAULT_SEED)),
            solver,
        }
    }

    /// Reseeds the tie-break RNG, e.g. after deserializing.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Folds `observed` into the leaf of `label` covering `point`, creating the
    /// label's root on first use and splitting the leaf once a dimension has
    /// gathered enough evidence.
    pub fn update(
        &mut self,
        label: usize,
        point: &[f64],
        dimen: usize,
        observed: f64,
        delta: f64,
        options: &RefinementOptions,
    ) -> Result<(), RefinementError> {
        if dimen == 0 {
            return Err(RefinementError::ZeroDimension);
        }
        if let Some(expected) = self.dimen {
            if expected != dimen {
                return Err(RefinementError::DimensionMismatch {
                    expected,
                    got: dimen,
                });
            }
        }
        if point.len() != dimen {
            return Err(RefinementError::PointLength {
                expected: dimen,
                got: point.len(),
            });
        }
        if let Some((dim, &value)) = point.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(RefinementError::NonFiniteCoordinate { dim, value });
        }
        if !observed.is_finite() {
            return Err(RefinementError::NonFiniteValue(observed));
        }
        options.validate()?;
        self.dimen = Some(dimen);

        let root = match self.find(label) {
            Ok(pos) => self.mapping[pos].root,
            Err(pos) => {
                let root = self.nodes.len();
                self.nodes.push(Node::default());
                self.mapping.insert(pos, LabelEntry { label, root });
                root
            }
        };

        let index = self.descend(root, point);
        let Node::Leaf(leaf) = &mut self.nodes[index] else {
            return Ok(());
        };
        if let Some(dim) = leaf.observe(point, observed, delta, options, &mut self.rng) {
            self.split_leaf(label, index, dim);
        }
        Ok(())
    }

    fn split_leaf(&mut self, label: usize, index: usize, dim: usize) {
        let leaf = match std::mem::take(&mut self.nodes[index]) {
            Node::Leaf(leaf) => leaf,
            internal => {
                self.nodes[index] = internal;
                return;
            }
        };
        let outcome = match leaf.split(dim, &self.solver) {
            Ok(outcome) => outcome,
            Err(leaf) => {
                self.nodes[index] = Node::Leaf(leaf);
                return;
            }
        };

        let low = self.nodes.len();
        let high = low + 1;
        self.nodes[index] = Node::Internal(Split {
            dim,
            boundary: outcome.boundary,
            low,
            high,
        });
        self.nodes.push(Node::Leaf(outcome.low));
        self.nodes.push(Node::Leaf(outcome.high));

        debug!(label, node = index, dim, boundary = outcome.boundary, "split leaf");
        self.split_history.push(SplitRecord {
            label,
            parent_index: index,
            dim,
            boundary: outcome.boundary,
            low_child_index: low,
            high_child_index: high,
        });
    }
}
