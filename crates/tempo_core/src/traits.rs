use crate::error::OdeResult;
use nalgebra::DMatrix;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in model code.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A function `F: R^dim_x -> R^dim_f` that knows its own Jacobian.
///
/// Every physical model and every node of a residual expression implements
/// this contract. `dim_x` and `dim_f` must not change over the object's
/// lifetime.
pub trait NonlinearFunction {
    /// Length of the input vector.
    fn dim_x(&self) -> usize;

    /// Length of the output vector.
    fn dim_f(&self) -> usize;

    /// Writes `f = F(x)`.
    fn evaluate(&self, x: &[f64], f: &mut [f64]);

    /// Writes the `dim_f x dim_x` Jacobian of `F` at `x` into `df`.
    ///
    /// Callers that go through a residual expression get a zeroed buffer, so
    /// implementations only need to write nonzero entries there. Direct callers
    /// must clear `df` themselves.
    fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>);
}

/// A model written once over any `Scalar`.
///
/// Evaluating it with `f64` gives the residual; evaluating it with dual
/// numbers gives the residual together with its partial derivatives.
/// See [`crate::autodiff::AutoDiffFunction`].
pub trait GenericFunction {
    fn dim_x(&self) -> usize;
    fn dim_f(&self) -> usize;
    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]);
}

/// A one-step scheme advancing a first-order system `y' = F(y)`.
pub trait TimeStepper {
    /// Performs one step of size `tau`, overwriting `y` with the new state.
    /// On failure `y` holds the last Newton iterate and the run should stop.
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()>;
}
