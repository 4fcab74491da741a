use crate::autograd::variable::{NodeId, Variable};
use crate::error::AutogradError;
use std::collections::HashSet;
use std::vec::IntoIter;

/// A node whose parents are still being visited.
struct Frame<V> {
    node: V,
    remaining_parents: IntoIter<V>,
}

/// Depth-first traversal state. Replaces the native call stack with `stack`
/// so deep graphs cannot overflow it.
struct Walk<V> {
    /// Nodes already placed in `post_order`.
    emitted: HashSet<NodeId>,
    /// Nodes on the active path, i.e. with a frame on `stack`.
    in_progress: HashSet<NodeId>,
    stack: Vec<Frame<V>>,
    post_order: Vec<V>,
}

impl<V: Variable> Walk<V> {
    fn new() -> Self {
        Walk {
            emitted: HashSet::new(),
            in_progress: HashSet::new(),
            stack: Vec::new(),
            post_order: Vec::new(),
        }
    }

    /// Starts visiting `node`: skips it if already emitted or constant,
    /// fails if it is on the active path, otherwise pushes a frame for it.
    fn enter(&mut self, node: V) -> Result<(), AutogradError> {
        let id = node.unique_id();
        if self.emitted.contains(&id) || node.is_constant() {
            return Ok(());
        }
        if !self.in_progress.insert(id) {
            log::warn!("Cycle detected while ordering the graph: node {} is its own ancestor", id);
            return Err(AutogradError::GraphCyclic { node: id });
        }

        let parents = node.parents();
        if node.is_leaf() && !parents.is_empty() {
            log::warn!("Leaf node {} declares {} parent(s)", id, parents.len());
            return Err(AutogradError::ContractViolation {
                node: id,
                reason: format!("leaf node declares {} parent(s)", parents.len()),
            });
        }
        if !node.is_leaf() && parents.is_empty() {
            log::warn!("Node {} is neither leaf nor constant but has no parents", id);
            return Err(AutogradError::ContractViolation {
                node: id,
                reason: "non-leaf, non-constant node declares no parents".to_string(),
            });
        }
        log::trace!("[topological_order] entering node {} ({} parent(s))", id, parents.len());

        self.stack.push(Frame {
            node,
            remaining_parents: parents.into_iter(),
        });
        Ok(())
    }

    fn run(mut self, terminal: &V) -> Result<Vec<V>, AutogradError> {
        self.enter(terminal.clone())?;

        while let Some(mut frame) = self.stack.pop() {
            match frame.remaining_parents.next() {
                Some(parent) => {
                    self.stack.push(frame);
                    self.enter(parent)?;
                }
                None => {
                    // Every parent is emitted: the node can be emitted too.
                    let id = frame.node.unique_id();
                    self.in_progress.remove(&id);
                    self.emitted.insert(id);
                    log::trace!("[topological_order] emitting node {}", id);
                    self.post_order.push(frame.node);
                }
            }
        }

        let mut order = self.post_order;
        order.reverse();
        Ok(order)
    }
}

/// Computes the order in which backpropagation must visit the graph ending at `terminal`.
///
/// Returns every non-constant node reachable from `terminal` through non-constant nodes,
/// `terminal` first. Each node appears strictly before all of its ancestors, so every node
/// that routes a derivative into another is processed before it. The result is the reverse
/// of a depth-first post-order that follows parents in declaration order, and is therefore
/// fully determined by node ids and parent order.
///
/// A constant `terminal` yields an empty order.
///
/// # Errors
/// * [`AutogradError::GraphCyclic`] if a node is (transitively) its own ancestor.
/// * [`AutogradError::ContractViolation`] if a leaf declares parents, or a node that is
///   neither leaf nor constant declares none.
pub fn topological_order<V: Variable>(terminal: &V) -> Result<Vec<V>, AutogradError> {
    let order = Walk::new().run(terminal)?;
    log::debug!(
        "Ordered {} node(s) reachable from terminal {}",
        order.len(),
        terminal.unique_id()
    );
    Ok(order)
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
