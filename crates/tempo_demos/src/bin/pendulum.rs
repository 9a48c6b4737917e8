//! Pendulum released from 0.5 rad (about 28.6 degrees).
//!
//! Logs the dual-number Jacobian at the release point, then compares the
//! period of a Crank–Nicolson run and a generalized-alpha run with the exact one.

use anyhow::{ensure, Result};
use nalgebra::DMatrix;
use std::rc::Rc;
use tempo_core::{
    integrate, AlphaParameters, AutoDiffFunction, CrankNicolson, NonlinearFunction,
    SecondOrderIntegrator,
};
use tempo_demos::init_logging;
use tempo_demos::models::{DiagonalMass, Pendulum};
use tracing::info;

const THETA0: f64 = 0.5;
const T_END: f64 = 10.0;

/// Mean period from the sign changes of `theta`.
fn period(samples: &[(f64, f64)]) -> Option<f64> {
    let crossings: Vec<f64> = samples
        .windows(2)
        .filter(|w| w[0].1 * w[1].1 < 0.0)
        .map(|w| {
            let ((t0, y0), (t1, y1)) = (w[0], w[1]);
            t0 + (t1 - t0) * y0 / (y0 - y1)
        })
        .collect();
    match crossings.as_slice() {
        [first, .., last] => Some(2.0 * (last - first) / (crossings.len() - 1) as f64),
        _ => None,
    }
}

fn main() -> Result<()> {
    init_logging();

    let pendulum = Pendulum {
        length: 1.0,
        gravity: 9.81,
    };
    let rhs = Rc::new(AutoDiffFunction::<_, 2>::new(pendulum)?);

    let x = [THETA0, 0.0];
    let mut f = [0.0; 2];
    let mut df = DMatrix::zeros(2, 2);
    rhs.evaluate(&x, &mut f);
    rhs.evaluate_deriv(&x, &mut df);
    info!(f0 = f[0], f1 = f[1], "f(x) at the release point");
    info!(
        d00 = df[(0, 0)],
        d01 = df[(0, 1)],
        d10 = df[(1, 0)],
        d11 = df[(1, 1)],
        "Df(x) at the release point"
    );

    let exact = pendulum.period(THETA0);
    info!(exact, "exact period");

    let dt = 1e-3;
    let mut stepper = CrankNicolson::new(rhs)?;
    let mut y = x;
    let mut samples = vec![(0.0, THETA0)];
    let steps = (T_END / dt).round() as usize;
    integrate(&mut stepper, dt, steps, &mut y, |t, y| samples.push((t, y[0])))?;
    let crank_nicolson = period(&samples);
    info!(?crank_nicolson, final_energy = pendulum.energy(y[0], y[1]), "Crank-Nicolson");

    let force: Rc<dyn NonlinearFunction> =
        Rc::new(AutoDiffFunction::<_, 1>::new(pendulum.acceleration())?);
    let params = AlphaParameters::from_spectral_radius(0.9)?;
    let mut integrator =
        SecondOrderIntegrator::new(force, Rc::new(DiagonalMass::identity(1)), 0.01, params)?;
    let (mut theta, mut omega) = ([THETA0], [0.0]);
    let mut accel = [-pendulum.gravity / pendulum.length * THETA0.sin()];
    let mut samples = vec![(0.0, THETA0)];
    while integrator.time() < T_END - 1e-9 {
        let t = integrator.step(&mut theta, &mut omega, &mut accel)?;
        samples.push((t, theta[0]));
    }
    let alpha = period(&samples);
    info!(?alpha, final_energy = pendulum.energy(theta[0], omega[0]), "generalized-alpha");

    ensure!(
        crank_nicolson.is_some() && alpha.is_some(),
        "too few zero crossings to measure a period"
    );
    Ok(())
}
