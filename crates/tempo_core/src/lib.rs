//! The `tempo_core` crate advances ODEs and index-2 DAEs in time.
//! Every implicit scheme reduces a step to a root-finding problem, built once
//! as a residual expression and solved by one shared Newton solver.
//!
//! Key components:
//! - **Traits**: `NonlinearFunction` (residual with Jacobian), `GenericFunction` (model written over any `Scalar`), `TimeStepper` (`do_step`).
//! - **Residual**: arena expression graph with mutable `Parameter` / `Snapshot` cells.
//! - **Autodiff**: `Dual` numbers and the `AutoDiffFunction` adapter for exact Jacobians.
//! - **Steppers**: explicit/improved/implicit Euler, Crank–Nicolson, collocation implicit Runge–Kutta.
//! - **Generalized alpha**: second-order integrator tolerating a singular mass matrix.
pub mod autodiff;
pub mod error;
pub mod generalized_alpha;
pub mod implicit_rk;
pub mod newton;
pub mod quadrature;
pub mod residual;
pub mod steppers;
pub mod traits;

pub use autodiff::{AutoDiffFunction, Dual};
pub use error::{OdeError, OdeResult};
pub use generalized_alpha::{
    solve_ode_alpha, solve_ode_newmark, AlphaParameters, SecondOrderIntegrator,
};
pub use implicit_rk::ImplicitRungeKutta;
pub use newton::{newton_solve, NewtonReport, NewtonSettings};
pub use quadrature::{CollocationFamily, Tableau};
pub use residual::{Coefficient, Expr, Graph, NodeId, Parameter, Snapshot};
pub use steppers::{integrate, CrankNicolson, ExplicitEuler, ImplicitEuler, ImprovedEuler};
pub use traits::{GenericFunction, NonlinearFunction, Scalar, TimeStepper};
