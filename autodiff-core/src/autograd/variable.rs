use crate::error::AutogradError;
use num_traits::Zero;
use std::fmt::{self, Debug};
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide source of node ids. Starts at 1 and is never reset.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a node in the computation graph.
///
/// Ids are used as keys for derivative accumulation and for visited/in-progress
/// tracking during graph traversal, so two handles to the same node must report
/// the same id and two distinct nodes must never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Mints a fresh id. Safe to call from several threads.
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capabilities a value must provide to take part in backpropagation.
///
/// Implementors are cheap handles (typically an `Rc`/`Arc` around the node data):
/// `parents()` and `chain_rule()` hand out clones of upstream handles.
///
/// Every reachable node falls into exactly one case:
/// * **constant** (`is_constant() == true`): pruned from the graph, never receives a derivative;
/// * **leaf** (`is_leaf() == true`): no parents, receives its total derivative through
///   [`accumulate_derivative`](Variable::accumulate_derivative);
/// * **computed**: has parents and distributes its incoming derivative to them via
///   [`chain_rule`](Variable::chain_rule).
pub trait Variable: Clone {
    /// Type of the derivatives flowing through the graph (e.g. `f64`).
    type Derivative: Clone + Debug + Zero + AddAssign;

    /// Id assigned at construction, never reused or mutated.
    fn unique_id(&self) -> NodeId;

    fn is_leaf(&self) -> bool;

    fn is_constant(&self) -> bool;

    /// Upstream nodes this value was computed from, in operand order.
    /// Empty for leaves and constants.
    fn parents(&self) -> Vec<Self>;

    /// Applies the local derivative rule.
    ///
    /// Given `d_output`, the derivative of the terminal with respect to this node, returns
    /// one `(parent, partial)` pair per parent the derivative flows into. Every returned
    /// parent must be one of [`parents`](Variable::parents). The order of the pairs must be
    /// stable across calls.
    fn chain_rule(
        &self,
        d_output: &Self::Derivative,
    ) -> Result<Vec<(Self, Self::Derivative)>, AutogradError>;

    /// Adds `d` into the persistent gradient of a leaf. Additive across backward calls.
    fn accumulate_derivative(&self, d: Self::Derivative) -> Result<(), AutogradError>;
}

#[cfg(test)]
#[path = "variable_test.rs"]
mod tests;
