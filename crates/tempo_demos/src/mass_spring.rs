//! Point masses connected by linear springs in `D` dimensions.
//!
//! The state is the stacked mass positions `[x_0, ..., x_{n-1}]`. The rhs
//! returns accelerations, so the system pairs with an identity mass matrix.

use nalgebra::{DMatrix, SMatrix, SVector};
use tempo_core::NonlinearFunction;

/// Springs shorter than this exert no force.
const MIN_SPRING_LENGTH: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    Fix(usize),
    Mass(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct PointMass<const D: usize> {
    pub mass: f64,
    pub position: SVector<f64, D>,
}

#[derive(Debug, Clone, Copy)]
pub struct Spring {
    pub rest_length: f64,
    pub stiffness: f64,
    pub ends: [Connector; 2],
}

#[derive(Debug, Clone)]
pub struct MassSpringSystem<const D: usize> {
    fixes: Vec<SVector<f64, D>>,
    masses: Vec<PointMass<D>>,
    springs: Vec<Spring>,
    gravity: SVector<f64, D>,
}

impl<const D: usize> Default for MassSpringSystem<D> {
    fn default() -> Self {
        Self {
            fixes: Vec::new(),
            masses: Vec::new(),
            springs: Vec::new(),
            gravity: SVector::zeros(),
        }
    }
}

impl<const D: usize> MassSpringSystem<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_gravity(&mut self, gravity: SVector<f64, D>) {
        self.gravity = gravity;
    }

    pub fn add_fix(&mut self, position: SVector<f64, D>) -> Connector {
        self.fixes.push(position);
        Connector::Fix(self.fixes.len() - 1)
    }

    pub fn add_mass(&mut self, mass: f64, position: SVector<f64, D>) -> Connector {
        self.masses.push(PointMass { mass, position });
        Connector::Mass(self.masses.len() - 1)
    }

    pub fn add_spring(&mut self, rest_length: f64, stiffness: f64, ends: [Connector; 2]) {
        self.springs.push(Spring {
            rest_length,
            stiffness,
            ends,
        });
    }

    pub fn masses(&self) -> &[PointMass<D>] {
        &self.masses
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Stacked initial positions.
    pub fn positions(&self) -> Vec<f64> {
        self.masses
            .iter()
            .flat_map(|m| m.position.iter().copied())
            .collect()
    }

    fn position(&self, x: &[f64], end: Connector) -> SVector<f64, D> {
        match end {
            Connector::Fix(i) => self.fixes[i],
            Connector::Mass(i) => SVector::from_column_slice(&x[i * D..(i + 1) * D]),
        }
    }

    /// Unit direction and length of the spring, `None` when degenerate.
    fn geometry(&self, x: &[f64], spring: &Spring) -> Option<(SVector<f64, D>, f64)> {
        let [a, b] = spring.ends;
        let d = self.position(x, b) - self.position(x, a);
        let r = d.norm();
        (r >= MIN_SPRING_LENGTH).then(|| (d / r, r))
    }
}

impl<const D: usize> NonlinearFunction for MassSpringSystem<D> {
    fn dim_x(&self) -> usize {
        self.masses.len() * D
    }

    fn dim_f(&self) -> usize {
        self.masses.len() * D
    }

    fn evaluate(&self, x: &[f64], f: &mut [f64]) {
        for block in f.chunks_exact_mut(D) {
            block.copy_from_slice(self.gravity.as_slice());
        }

        for spring in &self.springs {
            let Some((u, r)) = self.geometry(x, spring) else {
                continue;
            };
            // Force on the first end, pulling it towards the second when stretched.
            let force = u * (spring.stiffness * (r - spring.rest_length));
            let [a, b] = spring.ends;
            for (end, sign) in [(a, 1.0), (b, -1.0)] {
                if let Connector::Mass(i) = end {
                    let inv_m = 1.0 / self.masses[i].mass;
                    for k in 0..D {
                        f[i * D + k] += sign * inv_m * force[k];
                    }
                }
            }
        }
    }

    fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>) {
        df.fill(0.0);
        for spring in &self.springs {
            let Some((u, r)) = self.geometry(x, spring) else {
                continue;
            };
            let k = spring.stiffness;
            let ratio = spring.rest_length / r;
            // d(force on a)/d(x_b); d/d(x_a) is its negative.
            let local: SMatrix<f64, D, D> =
                SMatrix::identity() * (k * (1.0 - ratio)) + u * u.transpose() * (k * ratio);

            let [a, b] = spring.ends;
            for (row_end, col_end, sign) in [(a, a, -1.0), (a, b, 1.0), (b, b, -1.0), (b, a, 1.0)] {
                let (Connector::Mass(i), Connector::Mass(j)) = (row_end, col_end) else {
                    continue;
                };
                let inv_m = 1.0 / self.masses[i].mass;
                for p in 0..D {
                    for q in 0..D {
                        df[(i * D + p, j * D + q)] += sign * inv_m * local[(p, q)];
                    }
                }
            }
        }
    }
}
