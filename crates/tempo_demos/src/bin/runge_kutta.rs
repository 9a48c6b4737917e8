//! Mass on a spring integrated with Gauss–Legendre and Radau IIA collocation.

use anyhow::{Context, Result};
use std::f64::consts::PI;
use std::rc::Rc;
use tempo_core::{integrate, AutoDiffFunction, CollocationFamily, ImplicitRungeKutta, Tableau};
use tempo_demos::init_logging;
use tempo_demos::models::MassOnSpring;
use tracing::info;

fn main() -> Result<()> {
    init_logging();

    let t_end = 4.0 * PI;
    let rhs = Rc::new(AutoDiffFunction::<_, 2>::new(MassOnSpring {
        mass: 1.0,
        stiffness: 1.0,
    })?);

    let runs = [
        (CollocationFamily::GaussLegendre, 2),
        (CollocationFamily::GaussLegendre, 3),
        (CollocationFamily::RadauIIA, 2),
        (CollocationFamily::RadauIIA, 3),
    ];

    for steps in [25, 50, 100] {
        let tau = t_end / steps as f64;
        for (family, stages) in runs {
            let tableau = Tableau::collocation(family, stages)?;
            info!(?family, stages, nodes = ?tableau.c.as_slice(), "tableau");

            let mut stepper = ImplicitRungeKutta::new(rhs.clone(), tableau)?;
            let mut y = [1.0, 0.0];
            let mut max_error: f64 = 0.0;
            integrate(&mut stepper, tau, steps, &mut y, |t, y| {
                max_error = max_error.max((y[0] - t.cos()).abs());
            })
            .with_context(|| format!("{family:?} with {stages} stages failed"))?;

            info!(
                ?family,
                stages,
                steps,
                order = family.order(stages),
                max_error,
                energy = y[0] * y[0] + y[1] * y[1],
                "run finished"
            );
        }
    }
    Ok(())
}
