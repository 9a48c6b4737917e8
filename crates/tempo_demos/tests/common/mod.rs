//! Helpers shared by the integration tests.
#![allow(dead_code)]

use nalgebra::DMatrix;
use std::rc::Rc;
use tempo_core::{AutoDiffFunction, GenericFunction, NonlinearFunction};

pub const GRAVITY: f64 = 9.81;

/// Wraps a generic model with an `N`-wide dual number.
pub fn autodiff<M, const N: usize>(model: M) -> Rc<dyn NonlinearFunction>
where
    M: GenericFunction + 'static,
{
    Rc::new(AutoDiffFunction::<M, N>::new(model).unwrap())
}

/// Centered finite-difference Jacobian.
pub fn finite_difference_jacobian(
    func: &dyn NonlinearFunction,
    x: &[f64],
    h: f64,
) -> DMatrix<f64> {
    let (nx, nf) = (func.dim_x(), func.dim_f());
    let mut jac = DMatrix::zeros(nf, nx);
    let (mut fp, mut fm) = (vec![0.0; nf], vec![0.0; nf]);
    let mut xp = x.to_vec();
    for j in 0..nx {
        xp[j] = x[j] + h;
        func.evaluate(&xp, &mut fp);
        xp[j] = x[j] - h;
        func.evaluate(&xp, &mut fm);
        xp[j] = x[j];
        for i in 0..nf {
            jac[(i, j)] = (fp[i] - fm[i]) / (2.0 * h);
        }
    }
    jac
}

pub fn jacobian(func: &dyn NonlinearFunction, x: &[f64]) -> DMatrix<f64> {
    let mut df = DMatrix::zeros(func.dim_f(), func.dim_x());
    func.evaluate_deriv(x, &mut df);
    df
}

/// Times at which `samples` changes sign, linearly interpolated.
pub fn zero_crossings(samples: &[(f64, f64)]) -> Vec<f64> {
    samples
        .windows(2)
        .filter(|w| w[0].1 * w[1].1 < 0.0)
        .map(|w| {
            let ((t0, y0), (t1, y1)) = (w[0], w[1]);
            t0 + (t1 - t0) * y0 / (y0 - y1)
        })
        .collect()
}

/// Mean oscillation period from the sign changes of `samples`.
pub fn measured_period(samples: &[(f64, f64)]) -> f64 {
    let crossings = zero_crossings(samples);
    assert!(crossings.len() >= 3, "too few zero crossings: {}", crossings.len());
    let first = crossings[0];
    let last = crossings[crossings.len() - 1];
    2.0 * (last - first) / (crossings.len() - 1) as f64
}
