//! # Autograd
//!
//! Reverse-mode differentiation over a graph of [`Variable`]s.
//!
//! - [`graph`]: dependency-respecting ordering of the graph reachable from a terminal node.
//! - [`backward`]: walks that ordering and routes derivatives down to the leaves.
//! - [`context`]: per-operation scratch space shared between forward and backward.
//! - [`grad_check`]: finite-difference oracle used to validate analytical gradients.

pub mod backward;
pub mod context;
pub mod grad_check;
pub mod graph;
pub mod variable;

pub use backward::{backpropagate, backward};
pub use context::Context;
pub use grad_check::{central_difference, central_difference_with_epsilon, check_grad};
pub use graph::topological_order;
pub use variable::{NodeId, Variable};
