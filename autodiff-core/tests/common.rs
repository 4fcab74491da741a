// Scalar value type used by the integration tests to drive the engine with real operations.
#![allow(dead_code)]

use autodiff_core::autograd::backward;
use autodiff_core::{AutogradError, Context, NodeId, Variable};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Add,
    Mul,
    Neg,
    Inv,
    Exp,
    Ln,
    Sigmoid,
    Relu,
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl ScalarOp {
    fn forward(self, ctx: &mut Context<f64>, x: &[f64]) -> f64 {
        match self {
            ScalarOp::Add => x[0] + x[1],
            ScalarOp::Mul => {
                ctx.save_for_backward([x[0], x[1]]);
                x[0] * x[1]
            }
            ScalarOp::Neg => -x[0],
            ScalarOp::Inv => {
                ctx.save_for_backward([x[0]]);
                1.0 / x[0]
            }
            ScalarOp::Exp => {
                let out = x[0].exp();
                ctx.save_for_backward([out]);
                out
            }
            ScalarOp::Ln => {
                ctx.save_for_backward([x[0]]);
                x[0].ln()
            }
            ScalarOp::Sigmoid => {
                let out = sigmoid(x[0]);
                ctx.save_for_backward([out]);
                out
            }
            ScalarOp::Relu => {
                ctx.save_for_backward([x[0]]);
                x[0].max(0.0)
            }
        }
    }

    /// Local derivative of the output w.r.t. each input, scaled by `d`.
    fn backward(self, ctx: &Context<f64>, d: f64) -> Result<Vec<f64>, AutogradError> {
        let grads = match (self, ctx.saved_values()) {
            (ScalarOp::Add, _) => vec![d, d],
            (ScalarOp::Neg, _) => vec![-d],
            (ScalarOp::Mul, [a, b]) => vec![d * b, d * a],
            (ScalarOp::Inv, [x]) => vec![-d / (x * x)],
            (ScalarOp::Exp, [out]) => vec![d * out],
            (ScalarOp::Ln, [x]) => vec![d / x],
            (ScalarOp::Sigmoid, [s]) => vec![d * s * (1.0 - s)],
            (ScalarOp::Relu, [x]) => vec![if *x > 0.0 { d } else { 0.0 }],
            (op, saved) => {
                return Err(AutogradError::BackwardError(format!(
                    "{:?} found {} saved value(s)",
                    op,
                    saved.len()
                )))
            }
        };
        Ok(grads)
    }
}

struct History {
    op: ScalarOp,
    ctx: Context<f64>,
    inputs: Vec<Scalar>,
}

struct ScalarData {
    id: NodeId,
    value: f64,
    requires_grad: bool,
    history: Option<History>,
    derivative: Cell<Option<f64>>,
}

#[derive(Clone)]
pub struct Scalar(Rc<ScalarData>);

impl Scalar {
    fn build(value: f64, requires_grad: bool, history: Option<History>) -> Self {
        Scalar(Rc::new(ScalarData {
            id: NodeId::next(),
            value,
            requires_grad,
            history,
            derivative: Cell::new(None),
        }))
    }

    /// Leaf that collects a derivative.
    pub fn new(value: f64) -> Self {
        Self::build(value, true, None)
    }

    pub fn constant(value: f64) -> Self {
        Self::build(value, false, None)
    }

    pub fn apply(op: ScalarOp, inputs: Vec<Scalar>) -> Self {
        let values: Vec<f64> = inputs.iter().map(Scalar::value).collect();
        let requires_grad = inputs.iter().any(|s| !s.is_constant());
        let mut ctx = Context::with_no_grad(!requires_grad);
        let value = op.forward(&mut ctx, &values);
        if !requires_grad {
            return Self::constant(value);
        }
        Self::build(value, true, Some(History { op, ctx, inputs }))
    }

    pub fn value(&self) -> f64 {
        self.0.value
    }

    pub fn derivative(&self) -> Option<f64> {
        self.0.derivative.get()
    }

    pub fn zero_grad(&self) {
        self.0.derivative.set(None);
    }

    pub fn exp(&self) -> Self {
        Self::apply(ScalarOp::Exp, vec![self.clone()])
    }

    pub fn ln(&self) -> Self {
        Self::apply(ScalarOp::Ln, vec![self.clone()])
    }

    pub fn sigmoid(&self) -> Self {
        Self::apply(ScalarOp::Sigmoid, vec![self.clone()])
    }

    pub fn relu(&self) -> Self {
        Self::apply(ScalarOp::Relu, vec![self.clone()])
    }

    pub fn inv(&self) -> Self {
        Self::apply(ScalarOp::Inv, vec![self.clone()])
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scalar")
            .field("id", &self.0.id)
            .field("value", &self.0.value)
            .field("op", &self.0.history.as_ref().map(|h| h.op))
            .finish()
    }
}

impl std::ops::Add for &Scalar {
    type Output = Scalar;
    fn add(self, rhs: Self) -> Scalar {
        Scalar::apply(ScalarOp::Add, vec![self.clone(), rhs.clone()])
    }
}

impl std::ops::Mul for &Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Self) -> Scalar {
        Scalar::apply(ScalarOp::Mul, vec![self.clone(), rhs.clone()])
    }
}

impl std::ops::Neg for &Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar::apply(ScalarOp::Neg, vec![self.clone()])
    }
}

impl std::ops::Sub for &Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Self) -> Scalar {
        self + &(-rhs)
    }
}

impl std::ops::Div for &Scalar {
    type Output = Scalar;
    fn div(self, rhs: Self) -> Scalar {
        self * &rhs.inv()
    }
}

impl Variable for Scalar {
    type Derivative = f64;

    fn unique_id(&self) -> NodeId {
        self.0.id
    }

    fn is_leaf(&self) -> bool {
        self.0.requires_grad && self.0.history.is_none()
    }

    fn is_constant(&self) -> bool {
        !self.0.requires_grad
    }

    fn parents(&self) -> Vec<Self> {
        self.0
            .history
            .as_ref()
            .map(|h| h.inputs.clone())
            .unwrap_or_default()
    }

    fn chain_rule(&self, d_output: &f64) -> Result<Vec<(Self, f64)>, AutogradError> {
        let history = self.0.history.as_ref().ok_or_else(|| {
            AutogradError::BackwardError(format!("node {} has no history", self.0.id))
        })?;
        let local = history.op.backward(&history.ctx, *d_output)?;
        Ok(history.inputs.iter().cloned().zip(local).collect())
    }

    fn accumulate_derivative(&self, d: f64) -> Result<(), AutogradError> {
        let current = self.0.derivative.get().unwrap_or(0.0);
        self.0.derivative.set(Some(current + d));
        Ok(())
    }
}

/// A scalar function of several inputs, written once and evaluated either on leaves
/// (to backpropagate) or on constants (to evaluate numerically).
pub type ScalarFn = fn(&[Scalar]) -> Scalar;

/// Evaluates `f` at `values` without building a differentiable graph.
pub fn eval(f: ScalarFn, values: &[f64]) -> f64 {
    let inputs: Vec<Scalar> = values.iter().copied().map(Scalar::constant).collect();
    f(&inputs).value()
}

/// Gradient of `f` at `values`, one entry per input, computed by backpropagation.
pub fn gradients(f: ScalarFn, values: &[f64]) -> Result<Vec<f64>, AutogradError> {
    let inputs: Vec<Scalar> = values.iter().copied().map(Scalar::new).collect();
    let output = f(&inputs);
    backward(&output)?;
    Ok(inputs
        .iter()
        .map(|x| x.derivative().unwrap_or(0.0))
        .collect())
}
