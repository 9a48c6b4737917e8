//! RC circuit charged by a constant source, integrated with the Euler family
//! and Crank–Nicolson.

use anyhow::{Context, Result};
use std::rc::Rc;
use tempo_core::{
    integrate, CrankNicolson, ImplicitEuler, ImprovedEuler, NonlinearFunction, TimeStepper,
};
use tempo_demos::init_logging;
use tempo_demos::models::RcCircuit;
use tracing::{info, warn};

const T_END: f64 = 0.5;

struct Summary {
    final_voltage: f64,
    max_error: f64,
}

fn run(circuit: &RcCircuit, stepper: &mut dyn TimeStepper, steps: usize) -> Result<Summary> {
    let mut y = [0.0];
    let mut max_error: f64 = 0.0;
    integrate(stepper, T_END / steps as f64, steps, &mut y, |t, y| {
        max_error = max_error.max((y[0] - circuit.charging_voltage(t)).abs());
    })?;
    Ok(Summary {
        final_voltage: y[0],
        max_error,
    })
}

fn main() -> Result<()> {
    init_logging();

    let circuit = RcCircuit {
        resistance: 1000.0,
        capacitance: 1e-6,
        source: 5.0,
    };
    let rhs: Rc<dyn NonlinearFunction> = Rc::new(circuit);

    for steps in [100, 1000, 2000, 4000] {
        let z = T_END / steps as f64 / circuit.time_constant();
        info!(steps, tau_over_rc = z, "circuit run");

        let schemes: [(&str, Box<dyn TimeStepper>); 3] = [
            ("improved Euler", Box::new(ImprovedEuler::new(rhs.clone())?)),
            ("implicit Euler", Box::new(ImplicitEuler::new(rhs.clone())?)),
            ("Crank-Nicolson", Box::new(CrankNicolson::new(rhs.clone())?)),
        ];
        for (name, mut stepper) in schemes {
            let summary = run(&circuit, stepper.as_mut(), steps)
                .with_context(|| format!("{name} failed with {steps} steps"))?;
            if summary.max_error.is_finite() && summary.max_error < circuit.source {
                info!(
                    scheme = name,
                    final_voltage = summary.final_voltage,
                    max_error = summary.max_error,
                    "done"
                );
            } else {
                warn!(scheme = name, max_error = summary.max_error, "unstable at this step size");
            }
        }
    }
    Ok(())
}
