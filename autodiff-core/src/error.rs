use crate::autograd::NodeId;
use thiserror::Error;

/// Error type for graph ordering and backpropagation.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum AutogradError {
    /// A node was reached again while it was still on the active traversal path.
    #[error("Cycle detected in the computation graph at node {node}.")]
    GraphCyclic { node: NodeId },

    /// A `Variable` implementation broke its contract (leaf with parents, chain rule
    /// routing a derivative to an undeclared parent, ...).
    #[error("Contract violation at node {node}: {reason}")]
    ContractViolation { node: NodeId, reason: String },

    /// Failure reported by a `Variable` implementation while computing or storing a derivative.
    #[error("Backward error: {0}")]
    BackwardError(String),
}
