//! Collocation nodes, quadrature weights and Runge–Kutta tableaus.

use crate::autodiff::Dual;
use crate::error::{OdeError, OdeResult};
use crate::traits::Scalar;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// `P_0(x), ..., P_n(x)` by the three-term recurrence
/// `k P_k = (2k - 1) x P_{k-1} - (k - 1) P_{k-2}`.
///
/// Generic over the scalar so that evaluating on `Dual<1>` also yields `P_k'(x)`.
pub fn legendre_polynomials<T: Scalar>(n: usize, x: T) -> Vec<T> {
    let mut p = Vec::with_capacity(n + 1);
    p.push(T::one());
    if n == 0 {
        return p;
    }
    p.push(x);

    let one = T::one();
    let mut k = one;
    for idx in 2..=n {
        k = k + one;
        let next = ((k + k - one) * x * p[idx - 1] - (k - one) * p[idx - 2]) / k;
        p.push(next);
    }
    p
}

/// Gauss–Legendre nodes on [0, 1] (ascending) and their weights.
pub fn gauss_legendre(stages: usize) -> OdeResult<(Vec<f64>, Vec<f64>)> {
    if stages == 0 {
        return Err(OdeError::invalid("quadrature needs at least one node"));
    }

    let n = stages as f64;
    let mut nodes = Vec::with_capacity(stages);
    for i in 0..stages {
        // Descending initial guesses for the roots of P_s on [-1, 1].
        let mut t = (PI * (i as f64 + 0.75) / (n + 0.5)).cos();
        for _ in 0..100 {
            let p = legendre_polynomials(stages, Dual::<1>::variable(t, 0));
            let ps = p[stages];
            let dt = ps.val / ps.deriv[0];
            t -= dt;
            if dt.abs() <= 1e-15 {
                break;
            }
        }
        nodes.push(0.5 * (1.0 - t));
    }

    let weights = interpolatory_weights(&nodes)?;
    Ok((nodes, weights))
}

/// Radau IIA nodes on [0, 1] (ascending, last node is 1) and their weights.
///
/// The nodes are the roots of `P_s - P_{s-1}` mapped from [-1, 1].
pub fn gauss_radau(stages: usize) -> OdeResult<(Vec<f64>, Vec<f64>)> {
    if stages == 0 {
        return Err(OdeError::invalid("quadrature needs at least one node"));
    }

    let radau = |t: f64| {
        let p = legendre_polynomials(stages, t);
        p[stages] - p[stages - 1]
    };

    // Interior roots lie in (-1, 1); bracket them on a grid that stops short of 1.
    let samples = 200 * stages;
    let grid = |k: usize| -1.0 + 2.0 * k as f64 / samples as f64;
    let mut roots = Vec::with_capacity(stages);
    for k in 0..samples - 1 {
        let (mut lo, mut hi) = (grid(k), grid(k + 1));
        let (mut f_lo, f_hi) = (radau(lo), radau(hi));
        if f_lo == 0.0 {
            roots.push(lo);
            continue;
        }
        if f_lo * f_hi > 0.0 {
            continue;
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            let f_mid = radau(mid);
            if f_lo * f_mid <= 0.0 {
                hi = mid;
            } else {
                lo = mid;
                f_lo = f_mid;
            }
            if hi - lo <= 1e-16 {
                break;
            }
        }
        roots.push(0.5 * (lo + hi));
    }

    if roots.len() != stages - 1 {
        return Err(OdeError::invalid(format!(
            "found {} interior Radau roots for {} stages",
            roots.len(),
            stages
        )));
    }

    let mut nodes: Vec<f64> = roots.iter().map(|t| 0.5 * (1.0 + t)).collect();
    nodes.push(1.0);

    let weights = interpolatory_weights(&nodes)?;
    Ok((nodes, weights))
}

/// Collocation coefficients for nodes `c`.
///
/// `A` and `b` solve `sum_j A[i,j] c_j^k = c_i^(k+1) / (k+1)` and
/// `sum_j b_j c_j^k = 1 / (k+1)` for `k = 0..s-1`.
pub fn compute_ab_from_c(c: &[f64]) -> OdeResult<(DMatrix<f64>, DVector<f64>)> {
    let s = c.len();
    if s == 0 {
        return Err(OdeError::invalid("collocation needs at least one node"));
    }

    let vandermonde = DMatrix::from_fn(s, s, |k, j| c[j].powi(k as i32));
    let lu = vandermonde.lu();
    let solve = |rhs: DVector<f64>| {
        lu.solve(&rhs)
            .filter(|v| v.iter().all(|x| x.is_finite()))
            .ok_or_else(|| OdeError::invalid("collocation nodes must be distinct"))
    };

    let b = solve(DVector::from_fn(s, |k, _| 1.0 / (k + 1) as f64))?;

    let mut a = DMatrix::zeros(s, s);
    for (i, &ci) in c.iter().enumerate() {
        let row = solve(DVector::from_fn(s, |k, _| {
            ci.powi(k as i32 + 1) / (k + 1) as f64
        }))?;
        a.row_mut(i).copy_from(&row.transpose());
    }

    Ok((a, b))
}

fn interpolatory_weights(nodes: &[f64]) -> OdeResult<Vec<f64>> {
    let (_, b) = compute_ab_from_c(nodes)?;
    Ok(b.iter().copied().collect())
}

/// Node families for collocation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollocationFamily {
    /// Maximal order `2s`.
    GaussLegendre,
    /// Order `2s - 1`, L-stable, `c_s = 1`.
    RadauIIA,
}

impl CollocationFamily {
    pub fn nodes(self, stages: usize) -> OdeResult<(Vec<f64>, Vec<f64>)> {
        match self {
            CollocationFamily::GaussLegendre => gauss_legendre(stages),
            CollocationFamily::RadauIIA => gauss_radau(stages),
        }
    }

    /// Classical order at `stages` stages.
    pub fn order(self, stages: usize) -> usize {
        match self {
            CollocationFamily::GaussLegendre => 2 * stages,
            CollocationFamily::RadauIIA => (2 * stages).saturating_sub(1),
        }
    }
}

/// Butcher tableau of a collocation method.
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub c: DVector<f64>,
}

impl Tableau {
    pub fn from_nodes(c: &[f64]) -> OdeResult<Self> {
        let (a, b) = compute_ab_from_c(c)?;
        Ok(Self {
            a,
            b,
            c: DVector::from_column_slice(c),
        })
    }

    pub fn collocation(family: CollocationFamily, stages: usize) -> OdeResult<Self> {
        let (c, _) = family.nodes(stages)?;
        Self::from_nodes(&c)
    }

    pub fn gauss_legendre(stages: usize) -> OdeResult<Self> {
        Self::collocation(CollocationFamily::GaussLegendre, stages)
    }

    pub fn radau_iia(stages: usize) -> OdeResult<Self> {
        Self::collocation(CollocationFamily::RadauIIA, stages)
    }

    pub fn stages(&self) -> usize {
        self.c.len()
    }
}
