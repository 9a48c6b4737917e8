use crate::error::{ensure_dim, OdeResult};
use crate::newton::{newton_solve, NewtonSettings};
use crate::residual::{Expr, Graph, Parameter, Snapshot};
use crate::traits::{NonlinearFunction, TimeStepper};
use std::rc::Rc;
use tracing::trace;

/// Rejects right-hand sides that cannot drive `y' = F(y)`.
pub(crate) fn ensure_square(rhs: &dyn NonlinearFunction) -> OdeResult<usize> {
    ensure_dim("right-hand side (dim_f vs dim_x)", rhs.dim_x(), rhs.dim_f())?;
    Ok(rhs.dim_x())
}

/// Runs `steps` steps of size `tau`, calling `callback(t, y)` after each one.
/// Stops at the first failed step.
pub fn integrate<S, C>(
    stepper: &mut S,
    tau: f64,
    steps: usize,
    y: &mut [f64],
    mut callback: C,
) -> OdeResult<()>
where
    S: TimeStepper + ?Sized,
    C: FnMut(f64, &[f64]),
{
    for i in 0..steps {
        stepper.do_step(tau, y)?;
        callback((i + 1) as f64 * tau, y);
    }
    Ok(())
}

/// Explicit Euler: `y += tau * F(y)`.
pub struct ExplicitEuler {
    rhs: Rc<dyn NonlinearFunction>,
    f: Vec<f64>,
}

impl ExplicitEuler {
    pub fn new(rhs: Rc<dyn NonlinearFunction>) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        Ok(Self {
            rhs,
            f: vec![0.0; dim],
        })
    }
}

impl TimeStepper for ExplicitEuler {
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()> {
        ensure_dim("state", self.f.len(), y.len())?;
        self.rhs.evaluate(y, &mut self.f);
        for (yi, fi) in y.iter_mut().zip(&self.f) {
            *yi += tau * fi;
        }
        Ok(())
    }
}

/// Improved Euler (explicit midpoint rule):
/// `y~ = y + tau/2 * F(y)`, then `y += tau * F(y~)`.
pub struct ImprovedEuler {
    rhs: Rc<dyn NonlinearFunction>,
    f: Vec<f64>,
    ytilde: Vec<f64>,
}

impl ImprovedEuler {
    pub fn new(rhs: Rc<dyn NonlinearFunction>) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        Ok(Self {
            rhs,
            f: vec![0.0; dim],
            ytilde: vec![0.0; dim],
        })
    }
}

impl TimeStepper for ImprovedEuler {
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()> {
        ensure_dim("state", self.f.len(), y.len())?;
        let half = 0.5 * tau;

        self.rhs.evaluate(y, &mut self.f);
        for ((yt, yi), fi) in self.ytilde.iter_mut().zip(y.iter()).zip(&self.f) {
            *yt = yi + half * fi;
        }

        self.rhs.evaluate(&self.ytilde, &mut self.f);
        for (yi, fi) in y.iter_mut().zip(&self.f) {
            *yi += tau * fi;
        }
        Ok(())
    }
}

/// Implicit Euler: solves `y_new - y_old - tau * F(y_new) = 0`.
#[derive(Debug)]
pub struct ImplicitEuler {
    equ: Expr,
    tau: Parameter,
    yold: Snapshot,
    settings: NewtonSettings,
}

impl ImplicitEuler {
    pub fn new(rhs: Rc<dyn NonlinearFunction>) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        let tau = Parameter::new(0.0);
        let yold = Snapshot::zeros(dim);

        let mut graph = Graph::new();
        let ynew = graph.identity(dim);
        let old = graph.constant(dim, &yold);
        let f = graph.leaf(rhs);
        let step = graph.scale(&tau, f)?;
        let increment = graph.difference(ynew, old)?;
        let equ = graph.difference(increment, step)?;

        Ok(Self {
            equ: Expr::new(Rc::new(graph), equ)?,
            tau,
            yold,
            settings: NewtonSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: NewtonSettings) -> OdeResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }
}

impl TimeStepper for ImplicitEuler {
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()> {
        self.yold.set(y)?;
        self.tau.set(tau);
        let report = newton_solve(&self.equ, y, &self.settings)?;
        trace!(tau, iterations = report.iterations, "implicit Euler step");
        Ok(())
    }
}

/// Crank–Nicolson (trapezoidal rule):
/// solves `y_new - y_old - tau/2 * (F(y_new) + F(y_old)) = 0`.
pub struct CrankNicolson {
    rhs: Rc<dyn NonlinearFunction>,
    rhs_old_val: Vec<f64>,
    equ: Expr,
    tau_half: Parameter,
    yold: Snapshot,
    rhs_old: Snapshot,
    settings: NewtonSettings,
}

impl CrankNicolson {
    pub fn new(rhs: Rc<dyn NonlinearFunction>) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        let tau_half = Parameter::new(0.0);
        let yold = Snapshot::zeros(dim);
        let rhs_old = Snapshot::zeros(dim);

        let mut graph = Graph::new();
        let ynew = graph.identity(dim);
        let old = graph.constant(dim, &yold);
        let f_new = graph.leaf(rhs.clone());
        let f_old = graph.constant(dim, &rhs_old);
        let f_sum = graph.sum(f_new, f_old)?;
        let step = graph.scale(&tau_half, f_sum)?;
        let increment = graph.difference(ynew, old)?;
        let equ = graph.difference(increment, step)?;

        Ok(Self {
            rhs,
            rhs_old_val: vec![0.0; dim],
            equ: Expr::new(Rc::new(graph), equ)?,
            tau_half,
            yold,
            rhs_old,
            settings: NewtonSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: NewtonSettings) -> OdeResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }
}

impl TimeStepper for CrankNicolson {
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()> {
        self.yold.set(y)?;
        self.tau_half.set(0.5 * tau);

        self.rhs.evaluate(y, &mut self.rhs_old_val);
        self.rhs_old.set(&self.rhs_old_val)?;

        let report = newton_solve(&self.equ, y, &self.settings)?;
        trace!(tau, iterations = report.iterations, "Crank-Nicolson step");
        Ok(())
    }
}
