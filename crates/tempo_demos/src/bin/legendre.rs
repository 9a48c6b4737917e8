//! Legendre polynomials and their derivatives from one generic routine,
//! plus the quadrature rules built on them.

use anyhow::{ensure, Result};
use tempo_core::quadrature::{gauss_legendre, gauss_radau, legendre_polynomials};
use tempo_core::Dual;
use tempo_demos::init_logging;
use tracing::{debug, info};

const MAX_ORDER: usize = 5;
const POINTS: usize = 201;

fn main() -> Result<()> {
    init_logging();

    for i in 0..POINTS {
        let x = -1.0 + 2.0 * i as f64 / (POINTS - 1) as f64;
        let p = legendre_polynomials(MAX_ORDER, Dual::<1>::variable(x, 0));
        let values: Vec<f64> = p.iter().map(|d| d.value()).collect();
        let slopes: Vec<f64> = p.iter().map(|d| d.partial(0)).collect();
        debug!(x, ?values, ?slopes, "legendre sample");
    }

    // P_n(1) = 1 and P_n'(1) = n (n + 1) / 2.
    let at_one = legendre_polynomials(MAX_ORDER, Dual::<1>::variable(1.0, 0));
    for (n, p) in at_one.iter().enumerate() {
        let expected_slope = (n * (n + 1)) as f64 / 2.0;
        ensure!((p.value() - 1.0).abs() < 1e-12, "P_{n}(1) = {}", p.value());
        ensure!(
            (p.partial(0) - expected_slope).abs() < 1e-10,
            "P_{n}'(1) = {}",
            p.partial(0)
        );
        info!(n, value = p.value(), slope = p.partial(0), "endpoint check");
    }

    for stages in 1..=MAX_ORDER {
        let (nodes, weights) = gauss_legendre(stages)?;
        info!(stages, ?nodes, ?weights, "Gauss-Legendre");
        let (nodes, weights) = gauss_radau(stages)?;
        info!(stages, ?nodes, ?weights, "Radau IIA");
    }
    Ok(())
}
