/// Scratch space an operation uses to pass values from its forward pass to its backward pass.
///
/// A context lives for exactly one forward/backward pairing and is owned by the operation
/// invocation that created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Context<T> {
    no_grad: bool,
    saved_values: Vec<T>,
}

impl<T> Context<T> {
    /// Creates a context for a pass that tracks gradients.
    pub fn new() -> Self {
        Self::with_no_grad(false)
    }

    /// Creates a context; with `no_grad = true` nothing is ever saved.
    /// Setting the flag correctly (no input requires a gradient) is up to the caller.
    pub fn with_no_grad(no_grad: bool) -> Self {
        Context {
            no_grad,
            saved_values: Vec::new(),
        }
    }

    pub fn no_grad(&self) -> bool {
        self.no_grad
    }

    /// Stores `values` for the backward pass, replacing whatever was saved before.
    /// Does nothing when the context is `no_grad`.
    pub fn save_for_backward<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        if self.no_grad {
            return;
        }
        self.saved_values = values.into_iter().collect();
    }

    /// Values from the last `save_for_backward`; empty if nothing was saved.
    pub fn saved_values(&self) -> &[T] {
        &self.saved_values
    }

    /// Alias of [`saved_values`](Context::saved_values).
    pub fn saved_tensors(&self) -> &[T] {
        self.saved_values()
    }
}

impl<T> Default for Context<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
