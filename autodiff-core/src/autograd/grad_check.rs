use thiserror::Error;

/// Default step of the central difference. Kept at `1e-6` so results match other
/// implementations of the same oracle.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Default tolerance when comparing analytical and numerical gradients.
pub const DEFAULT_TOLERANCE: f64 = 1e-2;

/// Error type specifically for finite differences and gradient checking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Argument index {arg} is out of range for {len} input value(s)")]
    ArgumentOutOfRange { arg: usize, len: usize },

    #[error("Expected {expected} analytical gradient(s), got {actual}")]
    GradientCountMismatch { expected: usize, actual: usize },

    #[error("Gradient check failed for input {input_index}: Analytical grad {analytical_grad:?} != Numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },

    #[error("Numerical gradient is NaN or infinite for input {input_index}. Details: f(x+eps): {value_plus:?}, f(x-eps): {value_minus:?}")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        value_plus: f64,
        value_minus: f64,
    },

    #[error("Analytical gradient is NaN or infinite for input {input_index}. Value: {value:?}")]
    AnalyticalGradNaNOrInfinite { input_index: usize, value: f64 },
}

/// Step and tolerance used by [`check_grad`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckConfig {
    pub epsilon: f64,
    pub tolerance: f64,
}

impl GradCheckConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        GradCheckConfig {
            epsilon: DEFAULT_EPSILON,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Approximates the derivative of `f` with respect to `values[arg]` using
/// [`DEFAULT_EPSILON`]. See [`central_difference_with_epsilon`].
pub fn central_difference<F>(f: F, values: &[f64], arg: usize) -> Result<f64, GradCheckError>
where
    F: Fn(&[f64]) -> f64,
{
    central_difference_with_epsilon(f, values, arg, DEFAULT_EPSILON)
}

/// Approximates \\( \partial f / \partial x_{arg} \\) at `values` as
/// \\( (f(x + \epsilon e_{arg}) - f(x - \epsilon e_{arg})) / 2\epsilon \\).
///
/// `f` must be a pure function of its inputs. Only meant as a test oracle.
pub fn central_difference_with_epsilon<F>(
    f: F,
    values: &[f64],
    arg: usize,
    epsilon: f64,
) -> Result<f64, GradCheckError>
where
    F: Fn(&[f64]) -> f64,
{
    let (value_plus, value_minus) = evaluate_around(&f, values, arg, epsilon)?;
    Ok((value_plus - value_minus) / (2.0 * epsilon))
}

/// Evaluates `f` at `values` shifted by `+epsilon` and `-epsilon` along `arg`.
fn evaluate_around<F>(
    f: &F,
    values: &[f64],
    arg: usize,
    epsilon: f64,
) -> Result<(f64, f64), GradCheckError>
where
    F: Fn(&[f64]) -> f64,
{
    if arg >= values.len() {
        return Err(GradCheckError::ArgumentOutOfRange {
            arg,
            len: values.len(),
        });
    }
    let mut values_plus = values.to_vec();
    let mut values_minus = values.to_vec();
    values_plus[arg] += epsilon;
    values_minus[arg] -= epsilon;
    Ok((f(&values_plus), f(&values_minus)))
}

/// Checks analytical gradients against numerical gradients using central differences.
///
/// `analytical[i]` is the gradient of `f` with respect to `values[i]`, as produced by
/// backpropagation. Each entry must be within `config.tolerance` of the numerical estimate,
/// either absolutely or relatively.
pub fn check_grad<F>(
    f: F,
    values: &[f64],
    analytical: &[f64],
    config: &GradCheckConfig,
) -> Result<(), GradCheckError>
where
    F: Fn(&[f64]) -> f64,
{
    if analytical.len() != values.len() {
        return Err(GradCheckError::GradientCountMismatch {
            expected: values.len(),
            actual: analytical.len(),
        });
    }

    for (i, &analytical_grad) in analytical.iter().enumerate() {
        let (value_plus, value_minus) = evaluate_around(&f, values, i, config.epsilon)?;
        let numerical_grad = (value_plus - value_minus) / (2.0 * config.epsilon);

        if !numerical_grad.is_finite() {
            return Err(GradCheckError::NumericalGradNaNOrInfinite {
                input_index: i,
                value_plus,
                value_minus,
            });
        }
        if !analytical_grad.is_finite() {
            return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                input_index: i,
                value: analytical_grad,
            });
        }

        let close = approx::relative_eq!(
            analytical_grad,
            numerical_grad,
            epsilon = config.tolerance,
            max_relative = config.tolerance
        );
        if !close {
            let difference = (analytical_grad - numerical_grad).abs();
            log::warn!(
                "Gradient mismatch for input {}: analytical {} vs numerical {}",
                i,
                analytical_grad,
                numerical_grad
            );
            return Err(GradCheckError::GradientMismatch {
                input_index: i,
                analytical_grad,
                numerical_grad,
                difference,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
