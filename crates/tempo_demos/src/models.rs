//! Small physical models driven by the demo binaries.

use nalgebra::DMatrix;
use std::f64::consts::PI;
use tempo_core::{GenericFunction, NonlinearFunction, Scalar};

fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Capacitor voltage of an RC circuit with a constant source.
#[derive(Debug, Clone, Copy)]
pub struct RcCircuit {
    pub resistance: f64,
    pub capacitance: f64,
    pub source: f64,
}

impl RcCircuit {
    pub fn time_constant(&self) -> f64 {
        self.resistance * self.capacitance
    }

    /// Capacitor voltage at `t` when charging from 0 V.
    pub fn charging_voltage(&self, t: f64) -> f64 {
        self.source * (1.0 - (-t / self.time_constant()).exp())
    }
}

impl NonlinearFunction for RcCircuit {
    fn dim_x(&self) -> usize {
        1
    }

    fn dim_f(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &[f64], f: &mut [f64]) {
        f[0] = (self.source - x[0]) / self.time_constant();
    }

    fn evaluate_deriv(&self, _x: &[f64], df: &mut DMatrix<f64>) {
        df[(0, 0)] = -1.0 / self.time_constant();
    }
}

/// Single mass on a linear spring, state `[x, v]`.
#[derive(Debug, Clone, Copy)]
pub struct MassOnSpring {
    pub mass: f64,
    pub stiffness: f64,
}

impl GenericFunction for MassOnSpring {
    fn dim_x(&self) -> usize {
        2
    }

    fn dim_f(&self) -> usize {
        2
    }

    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
        f[0] = x[1];
        f[1] = -x[0] * lit(self.stiffness / self.mass);
    }
}

/// Mathematical pendulum in first-order form, state `[theta, omega]`.
#[derive(Debug, Clone, Copy)]
pub struct Pendulum {
    pub length: f64,
    pub gravity: f64,
}

impl Pendulum {
    pub fn energy(&self, theta: f64, omega: f64) -> f64 {
        0.5 * omega * omega + self.gravity / self.length * (1.0 - theta.cos())
    }

    /// Exact period for a release from rest at `amplitude`, through the
    /// arithmetic-geometric mean.
    pub fn period(&self, amplitude: f64) -> f64 {
        let (mut a, mut b) = (1.0f64, (0.5 * amplitude).cos());
        while (a - b).abs() > 1e-15 * a {
            (a, b) = (0.5 * (a + b), (a * b).sqrt());
        }
        2.0 * PI / ((self.gravity / self.length).sqrt() * a)
    }

    /// Right-hand side of `theta'' = F(theta)` for the second-order integrators.
    pub fn acceleration(&self) -> PendulumAcceleration {
        PendulumAcceleration {
            length: self.length,
            gravity: self.gravity,
        }
    }
}

impl GenericFunction for Pendulum {
    fn dim_x(&self) -> usize {
        2
    }

    fn dim_f(&self) -> usize {
        2
    }

    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
        f[0] = x[1];
        f[1] = -x[0].sin() * lit(self.gravity / self.length);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PendulumAcceleration {
    pub length: f64,
    pub gravity: f64,
}

impl GenericFunction for PendulumAcceleration {
    fn dim_x(&self) -> usize {
        1
    }

    fn dim_f(&self) -> usize {
        1
    }

    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
        f[0] = -x[0].sin() * lit(self.gravity / self.length);
    }
}

/// Pendulum in Cartesian coordinates held by a rod constraint, state
/// `[px, py, lambda]`. Pair with the mass diagonal `[m, m, 0]`.
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedPendulum {
    pub length: f64,
    pub mass: f64,
    pub gravity: f64,
}

impl ConstrainedPendulum {
    pub fn mass_diagonal(&self) -> Vec<f64> {
        vec![self.mass, self.mass, 0.0]
    }

    /// Bob position for the angle `theta` from the downward vertical.
    pub fn position(&self, theta: f64) -> [f64; 2] {
        [self.length * theta.sin(), -self.length * theta.cos()]
    }

    pub fn rod_error(&self, x: &[f64]) -> f64 {
        x[0].hypot(x[1]) - self.length
    }
}

impl GenericFunction for ConstrainedPendulum {
    fn dim_x(&self) -> usize {
        3
    }

    fn dim_f(&self) -> usize {
        3
    }

    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
        let (px, py, lambda) = (x[0], x[1], x[2]);
        f[0] = -lambda * px;
        f[1] = -lambda * py - lit(self.mass * self.gravity);
        f[2] = (px * px + py * py - lit(self.length * self.length)) * lit(0.5);
    }
}

/// Planar double pendulum hanging from the origin, in Cartesian coordinates
/// with one Lagrange multiplier per rod.
///
/// State `[x1, y1, x2, y2, lambda1, lambda2]`; the last two rows are the rod
/// constraints `(|d|^2 - L^2) / 2 = 0`.
#[derive(Debug, Clone, Copy)]
pub struct DoublePendulum {
    pub lengths: [f64; 2],
    pub masses: [f64; 2],
    pub gravity: f64,
}

impl DoublePendulum {
    /// Mass matrix diagonal; zero on the multiplier rows.
    pub fn mass_diagonal(&self) -> Vec<f64> {
        let [m1, m2] = self.masses;
        vec![m1, m1, m2, m2, 0.0, 0.0]
    }

    /// Deviations of the two rod lengths from their nominal values.
    pub fn rod_errors(&self, x: &[f64]) -> [f64; 2] {
        let rod1 = x[0].hypot(x[1]);
        let rod2 = (x[2] - x[0]).hypot(x[3] - x[1]);
        [rod1 - self.lengths[0], rod2 - self.lengths[1]]
    }

    pub fn energy(&self, x: &[f64], v: &[f64]) -> f64 {
        let [m1, m2] = self.masses;
        let kinetic =
            0.5 * m1 * (v[0] * v[0] + v[1] * v[1]) + 0.5 * m2 * (v[2] * v[2] + v[3] * v[3]);
        kinetic + self.gravity * (m1 * x[1] + m2 * x[3])
    }
}

impl GenericFunction for DoublePendulum {
    fn dim_x(&self) -> usize {
        6
    }

    fn dim_f(&self) -> usize {
        6
    }

    fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
        let d1 = [x[0], x[1]];
        let d2 = [x[2] - x[0], x[3] - x[1]];
        let (lambda1, lambda2) = (x[4], x[5]);
        let half = lit::<T>(0.5);

        f[0] = -lambda1 * d1[0] + lambda2 * d2[0];
        f[1] = -lambda1 * d1[1] + lambda2 * d2[1] - lit(self.masses[0] * self.gravity);
        f[2] = -lambda2 * d2[0];
        f[3] = -lambda2 * d2[1] - lit(self.masses[1] * self.gravity);
        f[4] = (d1[0] * d1[0] + d1[1] * d1[1] - lit(self.lengths[0] * self.lengths[0])) * half;
        f[5] = (d2[0] * d2[0] + d2[1] * d2[1] - lit(self.lengths[1] * self.lengths[1])) * half;
    }
}

/// `M a` for a diagonal mass matrix; zero entries mark algebraic rows.
#[derive(Debug, Clone)]
pub struct DiagonalMass {
    diagonal: Vec<f64>,
}

impl DiagonalMass {
    pub fn new(diagonal: Vec<f64>) -> Self {
        Self { diagonal }
    }

    pub fn identity(dim: usize) -> Self {
        Self::new(vec![1.0; dim])
    }
}

impl NonlinearFunction for DiagonalMass {
    fn dim_x(&self) -> usize {
        self.diagonal.len()
    }

    fn dim_f(&self) -> usize {
        self.diagonal.len()
    }

    fn evaluate(&self, x: &[f64], f: &mut [f64]) {
        for ((fi, xi), m) in f.iter_mut().zip(x).zip(&self.diagonal) {
            *fi = m * xi;
        }
    }

    fn evaluate_deriv(&self, _x: &[f64], df: &mut DMatrix<f64>) {
        for (i, m) in self.diagonal.iter().enumerate() {
            df[(i, i)] = *m;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::AutoDiffFunction;

    #[test]
    fn circuit_jacobian_is_constant() {
        let rc = RcCircuit {
            resistance: 1000.0,
            capacitance: 1e-6,
            source: 5.0,
        };
        let mut df = DMatrix::zeros(1, 1);
        rc.evaluate_deriv(&[3.0], &mut df);
        assert!((df[(0, 0)] + 1000.0).abs() < 1e-9);
        assert!((rc.charging_voltage(1.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn pendulum_period_grows_with_amplitude() {
        let pendulum = Pendulum {
            length: 1.0,
            gravity: 9.81,
        };
        let small = 2.0 * PI / 9.81f64.sqrt();
        assert!((pendulum.period(1e-8) - small).abs() < 1e-12);
        assert!((pendulum.period(0.5) - 2.0379).abs() < 1e-3);
        assert!(pendulum.period(1.0) > pendulum.period(0.5));
    }

    #[test]
    fn constrained_pendulum_starts_on_the_rod() {
        let model = ConstrainedPendulum {
            length: 0.8,
            mass: 2.0,
            gravity: 9.81,
        };
        let [px, py] = model.position(0.5);
        let x = [px, py, 0.0];
        assert!(model.rod_error(&x).abs() < 1e-15);
        let mut f = [0.0f64; 3];
        model.apply(&x, &mut f);
        assert!(f[2].abs() < 1e-15);
        assert!((f[1] + 2.0 * 9.81).abs() < 1e-15);
    }

    #[test]
    fn double_pendulum_constraints_vanish_on_the_rods() {
        let model = DoublePendulum {
            lengths: [1.0, 0.5],
            masses: [1.0, 1.0],
            gravity: 9.81,
        };
        let x = [0.6f64, -0.8, 0.6, -1.3, 0.0, 0.0];
        let mut f = [0.0f64; 6];
        model.apply(&x, &mut f);
        assert!(f[4].abs() < 1e-15 && f[5].abs() < 1e-15);
        assert!(model.rod_errors(&x).iter().all(|e| e.abs() < 1e-15));

        let ad = AutoDiffFunction::<_, 6>::new(model).unwrap();
        let mut df = DMatrix::zeros(6, 6);
        ad.evaluate_deriv(&x, &mut df);
        // Constraint rows are the rod directions.
        assert!((df[(4, 0)] - 0.6).abs() < 1e-15);
        assert!((df[(5, 3)] + 0.5).abs() < 1e-15);
    }
}
