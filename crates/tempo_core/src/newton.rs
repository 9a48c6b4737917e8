//! Newton root-finder shared by every implicit scheme.

use crate::error::{ensure_dim, OdeError, OdeResult};
use crate::traits::NonlinearFunction;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    /// Absolute bound on ‖F(x)‖₂.
    pub tolerance: f64,
    /// Relative bound on the update, ‖Δ‖₂ ≤ step_tolerance · (1 + ‖x‖₂).
    pub step_tolerance: f64,
    pub damping: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tolerance: 1e-10,
            step_tolerance: 1e-12,
            damping: 1.0,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> OdeResult<()> {
        if self.max_steps == 0 {
            return Err(OdeError::invalid("max_steps must be greater than zero."));
        }
        if !(self.damping > 0.0) {
            return Err(OdeError::invalid("damping must be positive."));
        }
        if !(self.tolerance > 0.0) {
            return Err(OdeError::invalid("tolerance must be positive."));
        }
        if self.step_tolerance < 0.0 {
            return Err(OdeError::invalid("step_tolerance must not be negative."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonReport {
    /// Number of state updates performed.
    pub iterations: usize,
    /// ‖F(x)‖₂ at the last evaluation.
    pub residual_norm: f64,
}

/// Finds `x` with `func(x) ≈ 0`, using `x` as the initial guess and
/// overwriting it with the solution.
///
/// On a singular Jacobian the state keeps the last iterate; the failed
/// iteration does not touch it.
pub fn newton_solve(
    func: &dyn NonlinearFunction,
    x: &mut [f64],
    settings: &NewtonSettings,
) -> OdeResult<NewtonReport> {
    settings.validate()?;
    let dim = func.dim_x();
    ensure_dim("Newton system (dim_f vs dim_x)", dim, func.dim_f())?;
    ensure_dim("Newton state", dim, x.len())?;

    let mut residual = vec![0.0; dim];
    let mut jacobian = DMatrix::zeros(dim, dim);
    let mut iterations = 0;

    // The residual is checked after every update, the last one included.
    let residual_norm = loop {
        func.evaluate(x, &mut residual);
        let residual_norm = l2_norm(&residual);
        debug!(iteration = iterations, residual_norm, "newton iteration");

        if !residual_norm.is_finite() {
            break residual_norm;
        }
        if residual_norm <= settings.tolerance {
            return Ok(NewtonReport {
                iterations,
                residual_norm,
            });
        }
        if iterations == settings.max_steps {
            break residual_norm;
        }

        jacobian.fill(0.0);
        func.evaluate_deriv(x, &mut jacobian);
        let delta = solve_linear_system(&jacobian, &residual).ok_or_else(|| {
            warn!(iteration = iterations, residual_norm, "singular Newton matrix");
            OdeError::SingularJacobian {
                iteration: iterations,
            }
        })?;

        for (xi, di) in x.iter_mut().zip(delta.iter()) {
            *xi -= settings.damping * di;
        }
        iterations += 1;

        if delta.norm() <= settings.step_tolerance * (1.0 + l2_norm(x)) {
            func.evaluate(x, &mut residual);
            let residual_norm = l2_norm(&residual);
            if !residual_norm.is_finite() {
                break residual_norm;
            }
            return Ok(NewtonReport {
                iterations,
                residual_norm,
            });
        }
    };

    warn!(iterations, residual_norm, "Newton solver did not converge");
    Err(OdeError::NotConverged {
        iterations,
        residual_norm,
    })
}

/// Solves `J · Δ = r`; `None` when the LU factorization breaks down.
fn solve_linear_system(jacobian: &DMatrix<f64>, residual: &[f64]) -> Option<DVector<f64>> {
    let rhs = DVector::from_column_slice(residual);
    jacobian
        .clone()
        .lu()
        .solve(&rhs)
        .filter(|delta| delta.iter().all(|v| v.is_finite()))
}

pub(crate) fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
