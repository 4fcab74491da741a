use crate::autograd::graph::topological_order;
use crate::autograd::variable::{NodeId, Variable};
use crate::error::AutogradError;
use num_traits::{One, Zero};
use std::collections::{HashMap, HashSet};

/// Propagates `seed` from `terminal` down to every reachable leaf.
///
/// Walks the graph in [`topological_order`], keeping the derivative accumulated so far for
/// each node. A computed node hands its total incoming derivative to
/// [`Variable::chain_rule`] and the returned partials are added to its parents' entries; a
/// leaf receives its total through [`Variable::accumulate_derivative`], exactly once per call.
///
/// Contributions routed to constant parents are dropped. If `terminal` is constant nothing
/// happens.
///
/// # Errors
/// * Any error from [`topological_order`] (cycle, leaf with parents, parentless computed
///   node).
/// * [`AutogradError::ContractViolation`] if a chain rule routes a derivative to a node that
///   is not one of its declared parents.
/// * Errors returned by `chain_rule` or `accumulate_derivative` themselves.
///
/// After an error, leaves already accumulated during this call are not rolled back.
pub fn backpropagate<V: Variable>(terminal: &V, seed: V::Derivative) -> Result<(), AutogradError> {
    let order = topological_order(terminal)?;
    if order.is_empty() {
        log::debug!("Terminal {} is constant, nothing to propagate", terminal.unique_id());
        return Ok(());
    }
    log::debug!(
        "Backpropagating from terminal {} through {} node(s) (seed = {:?})",
        terminal.unique_id(),
        order.len(),
        seed
    );

    // Accumulated derivative of the terminal w.r.t. each node seen so far.
    let mut derivatives: HashMap<NodeId, V::Derivative> = HashMap::new();
    *derivatives
        .entry(terminal.unique_id())
        .or_insert_with(V::Derivative::zero) += seed;

    let mut leaves = 0usize;
    for node in order {
        let id = node.unique_id();
        // Complete by now: every node routing into `node` precedes it in `order`.
        let d_out = derivatives.remove(&id).unwrap_or_else(V::Derivative::zero);
        log::trace!("[backpropagate] node {} receives {:?}", id, d_out);

        if node.is_leaf() {
            node.accumulate_derivative(d_out)?;
            leaves += 1;
            continue;
        }

        // Only used to reject pairs routed to nodes outside `parents()`.
        let declared: HashSet<NodeId> = node.parents().iter().map(Variable::unique_id).collect();
        for (parent, partial) in node.chain_rule(&d_out)? {
            let parent_id = parent.unique_id();
            if !declared.contains(&parent_id) {
                log::warn!(
                    "Chain rule of node {} routed a derivative to undeclared node {}",
                    id,
                    parent_id
                );
                return Err(AutogradError::ContractViolation {
                    node: id,
                    reason: format!("chain rule returned node {} which is not a parent", parent_id),
                });
            }
            if parent.is_constant() {
                continue;
            }
            *derivatives
                .entry(parent_id)
                .or_insert_with(V::Derivative::zero) += partial;
        }
    }

    log::debug!("Backpropagation finished, {} leaf node(s) updated", leaves);
    Ok(())
}

/// Same as [`backpropagate`] with a seed of one, the usual case for a scalar loss.
pub fn backward<V>(terminal: &V) -> Result<(), AutogradError>
where
    V: Variable,
    V::Derivative: One,
{
    backpropagate(terminal, V::Derivative::one())
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
