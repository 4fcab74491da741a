// Declares the main modules of the crate
pub mod autograd;
pub mod error;
pub mod utils;

// Re-export the engine entry points so they are reachable as `autodiff_core::backpropagate`, etc.
pub use autograd::{
    backpropagate, central_difference, topological_order, Context, NodeId, Variable,
};
pub use error::AutogradError;
// Re-export traits required by the `Variable::Derivative` bounds
pub use num_traits;
