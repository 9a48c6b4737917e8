use crate::error::{ensure_dim, OdeResult};
use crate::newton::{newton_solve, NewtonSettings};
use crate::quadrature::Tableau;
use crate::residual::{Expr, Graph, Parameter, Snapshot};
use crate::steppers::ensure_square;
use crate::traits::{NonlinearFunction, TimeStepper};
use std::rc::Rc;
use tracing::trace;

/// Implicit Runge–Kutta stepper for a collocation [`Tableau`].
///
/// All stage derivatives `k = (k_1, ..., k_s)` are solved for at once from
/// `k_i - F(y_old + tau * sum_j A[i,j] k_j) = 0`, then
/// `y_new = y_old + tau * sum_i b_i k_i`.
pub struct ImplicitRungeKutta {
    rhs: Rc<dyn NonlinearFunction>,
    tableau: Tableau,
    equ: Expr,
    tau: Parameter,
    yold: Snapshot,
    stages: Vec<f64>,
    settings: NewtonSettings,
}

impl ImplicitRungeKutta {
    pub fn new(rhs: Rc<dyn NonlinearFunction>, tableau: Tableau) -> OdeResult<Self> {
        let dim = ensure_square(rhs.as_ref())?;
        let s = tableau.stages();
        ensure_dim("tableau matrix rows", s, tableau.a.nrows())?;
        ensure_dim("tableau matrix columns", s, tableau.a.ncols())?;
        ensure_dim("tableau weights", s, tableau.b.len())?;

        let tau = Parameter::new(0.0);
        // y_old repeated once per stage.
        let yold = Snapshot::zeros(s * dim);

        let mut graph = Graph::new();
        let knew = graph.identity(s * dim);
        let old = graph.constant(s * dim, &yold);
        let coupling = graph.block_mat_vec(tableau.a.clone(), dim);
        let increment = graph.scale(&tau, coupling)?;
        let arguments = graph.sum(old, increment)?;
        let f = graph.leaf(rhs.clone());
        let stacked = graph.repeat(f, s)?;
        let stage_rhs = graph.compose(stacked, arguments)?;
        let equ = graph.difference(knew, stage_rhs)?;

        Ok(Self {
            rhs,
            tableau,
            equ: Expr::new(Rc::new(graph), equ)?,
            tau,
            yold,
            stages: vec![0.0; s * dim],
            settings: NewtonSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: NewtonSettings) -> OdeResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }
}

impl TimeStepper for ImplicitRungeKutta {
    fn do_step(&mut self, tau: f64, y: &mut [f64]) -> OdeResult<()> {
        let dim = self.rhs.dim_x();
        ensure_dim("state", dim, y.len())?;

        let repeated: Vec<f64> = y.iter().copied().cycle().take(self.stages.len()).collect();
        self.yold.set(&repeated)?;
        self.tau.set(tau);

        // Initial guess: every stage derivative equals F(y_old).
        let (first, rest) = self.stages.split_at_mut(dim);
        self.rhs.evaluate(y, first);
        for block in rest.chunks_exact_mut(dim) {
            block.copy_from_slice(first);
        }

        let report = newton_solve(&self.equ, &mut self.stages, &self.settings)?;
        trace!(
            tau,
            stages = self.tableau.stages(),
            iterations = report.iterations,
            "implicit Runge-Kutta step"
        );

        for (k, &bk) in self.stages.chunks_exact(dim).zip(self.tableau.b.iter()) {
            for (yi, ki) in y.iter_mut().zip(k) {
                *yi += tau * bk * ki;
            }
        }
        Ok(())
    }
}
