//! Generalized-alpha integration of `M a = F(x)`.
//!
//! `M` is given as a residual acting on the acceleration and may be singular:
//! rows with a zero mass diagonal turn the matching rows of `F` into algebraic
//! constraints, and the matching unknowns act as Lagrange multipliers.

use crate::error::{ensure_dim, OdeError, OdeResult};
use crate::newton::{newton_solve, NewtonSettings};
use crate::residual::{Expr, Graph, Parameter, Snapshot};
use crate::steppers::ensure_square;
use crate::traits::NonlinearFunction;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaParameters {
    pub alpha_m: f64,
    pub alpha_f: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl AlphaParameters {
    /// Chung–Hulbert parameters for high-frequency spectral radius `rho_inf` in (0, 1].
    pub fn from_spectral_radius(rho_inf: f64) -> OdeResult<Self> {
        if !(rho_inf > 0.0 && rho_inf <= 1.0) {
            return Err(OdeError::invalid(format!(
                "spectral radius must lie in (0, 1], got {rho_inf}"
            )));
        }
        let alpha_m = (2.0 * rho_inf - 1.0) / (rho_inf + 1.0);
        let alpha_f = rho_inf / (rho_inf + 1.0);
        let gamma = 0.5 - alpha_m + alpha_f;
        let shifted = 1.0 - alpha_m + alpha_f;
        Ok(Self {
            alpha_m,
            alpha_f,
            beta: 0.25 * shifted * shifted,
            gamma,
        })
    }

    /// Average-acceleration Newmark scheme.
    pub fn newmark() -> Self {
        Self {
            alpha_m: 0.0,
            alpha_f: 0.0,
            beta: 0.25,
            gamma: 0.5,
        }
    }
}

impl Default for AlphaParameters {
    fn default() -> Self {
        Self::newmark()
    }
}

/// Advances position, velocity and acceleration of `M a = F(x)` by a fixed step.
///
/// Each step solves for the new acceleration `a` from
/// `M((1 - alpha_m) a + alpha_m a_old) - F((1 - alpha_f) x_new(a) + alpha_f x_old) = 0`
/// where
/// `x_new(a) = x_old + dt v_old + dt^2/2 ((1 - 2 beta) a_old + 2 beta a)` and
/// `v_new(a) = v_old + dt ((1 - gamma) a_old + gamma a)`.
pub struct SecondOrderIntegrator {
    params: AlphaParameters,
    dt: f64,
    time: f64,
    settings: NewtonSettings,
    equ: Expr,
    x_new: Expr,
    v_new: Expr,
    x_old: Snapshot,
    a_old: Snapshot,
    x_pred: Snapshot,
    v_pred: Snapshot,
    beta_dt2: Parameter,
    gamma_dt: Parameter,
    x_buf: Vec<f64>,
    v_buf: Vec<f64>,
}

impl SecondOrderIntegrator {
    pub fn new(
        rhs: Rc<dyn NonlinearFunction>,
        mass: Rc<dyn NonlinearFunction>,
        dt: f64,
        params: AlphaParameters,
    ) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        ensure_dim("mass residual", dim, ensure_square(mass.as_ref())?)?;

        let x_old = Snapshot::zeros(dim);
        let a_old = Snapshot::zeros(dim);
        let x_pred = Snapshot::zeros(dim);
        let v_pred = Snapshot::zeros(dim);
        let beta_dt2 = Parameter::new(0.0);
        let gamma_dt = Parameter::new(0.0);

        let mut graph = Graph::new();
        let a = graph.identity(dim);
        let a_prev = graph.constant(dim, &a_old);
        let x_prev = graph.constant(dim, &x_old);

        let x_corr = graph.scale(&beta_dt2, a)?;
        let x_base = graph.constant(dim, &x_pred);
        let x_next = graph.sum(x_base, x_corr)?;
        let v_corr = graph.scale(&gamma_dt, a)?;
        let v_base = graph.constant(dim, &v_pred);
        let v_next = graph.sum(v_base, v_corr)?;

        let a_mid = graph.scaled_sum(1.0 - params.alpha_m, a, params.alpha_m, a_prev)?;
        let x_mid = graph.scaled_sum(1.0 - params.alpha_f, x_next, params.alpha_f, x_prev)?;
        let m = graph.leaf(mass);
        let f = graph.leaf(rhs);
        let inertia = graph.compose(m, a_mid)?;
        let force = graph.compose(f, x_mid)?;
        let equ = graph.difference(inertia, force)?;

        let graph = Rc::new(graph);
        let mut integrator = Self {
            params,
            dt: 0.0,
            time: 0.0,
            settings: NewtonSettings::default(),
            equ: Expr::new(graph.clone(), equ)?,
            x_new: Expr::new(graph.clone(), x_next)?,
            v_new: Expr::new(graph, v_next)?,
            x_old,
            a_old,
            x_pred,
            v_pred,
            beta_dt2,
            gamma_dt,
            x_buf: vec![0.0; dim],
            v_buf: vec![0.0; dim],
        };
        integrator.set_step_size(dt)?;
        Ok(integrator)
    }

    pub fn with_settings(mut self, settings: NewtonSettings) -> OdeResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn set_step_size(&mut self, dt: f64) -> OdeResult<()> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(OdeError::invalid(format!("step size must be positive, got {dt}")));
        }
        self.dt = dt;
        self.beta_dt2.set(self.params.beta * dt * dt);
        self.gamma_dt.set(self.params.gamma * dt);
        Ok(())
    }

    pub fn params(&self) -> &AlphaParameters {
        &self.params
    }

    pub fn step_size(&self) -> f64 {
        self.dt
    }

    /// Time reached by the accepted steps so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advances `(x, dx, ddx)` by one step and returns the new time.
    ///
    /// A failed solve leaves all three vectors unchanged.
    pub fn step(&mut self, x: &mut [f64], dx: &mut [f64], ddx: &mut [f64]) -> OdeResult<f64> {
        let dim = self.x_buf.len();
        ensure_dim("position", dim, x.len())?;
        ensure_dim("velocity", dim, dx.len())?;
        ensure_dim("acceleration", dim, ddx.len())?;

        let AlphaParameters { beta, gamma, .. } = self.params;
        let dt = self.dt;
        for i in 0..dim {
            self.x_buf[i] = x[i] + dt * dx[i] + 0.5 * dt * dt * (1.0 - 2.0 * beta) * ddx[i];
            self.v_buf[i] = dx[i] + dt * (1.0 - gamma) * ddx[i];
        }
        self.x_old.set(x)?;
        self.a_old.set(ddx)?;
        self.x_pred.set(&self.x_buf)?;
        self.v_pred.set(&self.v_buf)?;

        let mut a = ddx.to_vec();
        let report = newton_solve(&self.equ, &mut a, &self.settings)?;

        self.x_new.evaluate(&a, x);
        self.v_new.evaluate(&a, dx);
        ddx.copy_from_slice(&a);
        self.time += dt;
        trace!(
            t = self.time,
            iterations = report.iterations,
            "generalized-alpha step"
        );
        Ok(self.time)
    }
}

/// Integrates `M a = F(x)` from `t = 0` to `t_end` in `steps` equal steps of
/// the generalized-alpha method with spectral radius `rho_inf`.
///
/// `callback(t, x)` runs after every accepted step. The first failed step
/// aborts the run and is returned.
#[allow(clippy::too_many_arguments)]
pub fn solve_ode_alpha<C>(
    t_end: f64,
    steps: usize,
    rho_inf: f64,
    x: &mut [f64],
    dx: &mut [f64],
    ddx: &mut [f64],
    rhs: Rc<dyn NonlinearFunction>,
    mass: Rc<dyn NonlinearFunction>,
    callback: C,
) -> OdeResult<()>
where
    C: FnMut(f64, &[f64]),
{
    let params = AlphaParameters::from_spectral_radius(rho_inf)?;
    run(t_end, steps, params, x, dx, ddx, rhs, mass, callback)
}

/// Same as [`solve_ode_alpha`] with the average-acceleration Newmark parameters.
#[allow(clippy::too_many_arguments)]
pub fn solve_ode_newmark<C>(
    t_end: f64,
    steps: usize,
    x: &mut [f64],
    dx: &mut [f64],
    ddx: &mut [f64],
    rhs: Rc<dyn NonlinearFunction>,
    mass: Rc<dyn NonlinearFunction>,
    callback: C,
) -> OdeResult<()>
where
    C: FnMut(f64, &[f64]),
{
    run(t_end, steps, AlphaParameters::newmark(), x, dx, ddx, rhs, mass, callback)
}

#[allow(clippy::too_many_arguments)]
fn run<C>(
    t_end: f64,
    steps: usize,
    params: AlphaParameters,
    x: &mut [f64],
    dx: &mut [f64],
    ddx: &mut [f64],
    rhs: Rc<dyn NonlinearFunction>,
    mass: Rc<dyn NonlinearFunction>,
    mut callback: C,
) -> OdeResult<()>
where
    C: FnMut(f64, &[f64]),
{
    if steps == 0 {
        return Err(OdeError::invalid("number of steps must be greater than zero"));
    }
    let dt = t_end / steps as f64;
    let mut integrator = SecondOrderIntegrator::new(rhs, mass, dt, params)?;
    debug!(t_end, steps, dt, ?params, "starting second-order integration");

    for _ in 0..steps {
        let t = integrator.step(x, dx, ddx)?;
        callback(t, x);
    }
    Ok(())
}
