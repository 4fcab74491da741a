use crate::autograd::{NodeId, Variable};
use crate::error::AutogradError;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Checks that two floats are within `tolerance` of each other.
/// Panics with both values and the difference otherwise.
pub fn check_near(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();
    if diff > tolerance {
        panic!(
            "Value mismatch: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
            actual, expected, diff, tolerance
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestNodeKind {
    Leaf,
    Constant,
    Computed,
}

struct TestNodeData {
    id: NodeId,
    kind: TestNodeKind,
    // (parent, d self / d parent)
    inputs: RefCell<Vec<(TestNode, f64)>>,
    // Pairs returned by the chain rule without being declared as parents.
    undeclared_outputs: RefCell<Vec<(TestNode, f64)>>,
    grad: Cell<f64>,
    accumulate_calls: Cell<usize>,
    chain_rule_calls: Cell<usize>,
}

/// Graph node with fixed local partials, for exercising the engine without real operations.
///
/// A computed node `n` with inputs `(p_i, k_i)` behaves like `n = sum_i k_i * p_i`: its chain
/// rule returns `(p_i, k_i * d)`. Counters record how often the engine touched each node.
/// Parents can be linked after construction so that cyclic or malformed graphs can be built.
#[derive(Clone)]
pub struct TestNode(Rc<TestNodeData>);

impl TestNode {
    fn with_kind(kind: TestNodeKind) -> Self {
        TestNode(Rc::new(TestNodeData {
            id: NodeId::next(),
            kind,
            inputs: RefCell::new(Vec::new()),
            undeclared_outputs: RefCell::new(Vec::new()),
            grad: Cell::new(0.0),
            accumulate_calls: Cell::new(0),
            chain_rule_calls: Cell::new(0),
        }))
    }

    pub fn leaf() -> Self {
        Self::with_kind(TestNodeKind::Leaf)
    }

    pub fn constant() -> Self {
        Self::with_kind(TestNodeKind::Constant)
    }

    /// Computed node whose local derivative is 1 w.r.t. each input.
    pub fn sum_of(inputs: &[&TestNode]) -> Self {
        let node = Self::with_kind(TestNodeKind::Computed);
        for input in inputs {
            node.link_parent(input, 1.0);
        }
        node
    }

    /// Computed node with the given local partial for each input.
    pub fn weighted(inputs: &[(&TestNode, f64)]) -> Self {
        let node = Self::with_kind(TestNodeKind::Computed);
        for (input, partial) in inputs {
            node.link_parent(input, *partial);
        }
        node
    }

    /// Appends `parent` to this node's parents with local partial `partial`.
    pub fn link_parent(&self, parent: &TestNode, partial: f64) {
        self.0.inputs.borrow_mut().push((parent.clone(), partial));
    }

    /// Makes the chain rule also return `(target, partial * d)` without declaring `target`.
    pub fn emit_undeclared(&self, target: &TestNode, partial: f64) {
        self.0
            .undeclared_outputs
            .borrow_mut()
            .push((target.clone(), partial));
    }

    pub fn grad(&self) -> f64 {
        self.0.grad.get()
    }

    pub fn accumulate_calls(&self) -> usize {
        self.0.accumulate_calls.get()
    }

    pub fn chain_rule_calls(&self) -> usize {
        self.0.chain_rule_calls.get()
    }
}

impl fmt::Debug for TestNode {
    // Parents are not printed: graphs built for cycle tests would recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestNode")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("grad", &self.0.grad.get())
            .finish()
    }
}

impl Variable for TestNode {
    type Derivative = f64;

    fn unique_id(&self) -> NodeId {
        self.0.id
    }

    fn is_leaf(&self) -> bool {
        self.0.kind == TestNodeKind::Leaf
    }

    fn is_constant(&self) -> bool {
        self.0.kind == TestNodeKind::Constant
    }

    fn parents(&self) -> Vec<Self> {
        self.0
            .inputs
            .borrow()
            .iter()
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    fn chain_rule(&self, d_output: &f64) -> Result<Vec<(Self, f64)>, AutogradError> {
        if self.0.kind != TestNodeKind::Computed {
            return Err(AutogradError::BackwardError(format!(
                "chain_rule called on {:?} node {}",
                self.0.kind, self.0.id
            )));
        }
        self.0.chain_rule_calls.set(self.0.chain_rule_calls.get() + 1);
        let inputs = self.0.inputs.borrow();
        let undeclared = self.0.undeclared_outputs.borrow();
        Ok(inputs
            .iter()
            .chain(undeclared.iter())
            .map(|(parent, partial)| (parent.clone(), partial * d_output))
            .collect())
    }

    fn accumulate_derivative(&self, d: f64) -> Result<(), AutogradError> {
        if self.0.kind != TestNodeKind::Leaf {
            return Err(AutogradError::BackwardError(format!(
                "accumulate_derivative called on {:?} node {}",
                self.0.kind, self.0.id
            )));
        }
        self.0.accumulate_calls.set(self.0.accumulate_calls.get() + 1);
        self.0.grad.set(self.0.grad.get() + d);
        Ok(())
    }
}
