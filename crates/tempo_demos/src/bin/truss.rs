//! Mass-spring structures under gravity: a hanging chain released from a
//! perturbed state and a Warren truss settling under its own weight.

use anyhow::Result;
use nalgebra::Vector2;
use std::rc::Rc;
use tempo_core::{solve_ode_alpha, NonlinearFunction};
use tempo_demos::init_logging;
use tempo_demos::mass_spring::{Connector, MassSpringSystem};
use tempo_demos::models::DiagonalMass;
use tracing::info;

const GRAVITY: f64 = -9.81;

fn chain() -> Result<()> {
    let mut mss = MassSpringSystem::<2>::new();
    mss.set_gravity(Vector2::new(0.0, GRAVITY));
    let fix = mss.add_fix(Vector2::zeros());
    let m1 = mss.add_mass(1.0, Vector2::new(1.0, 0.0));
    let m2 = mss.add_mass(1.0, Vector2::new(2.0, 0.0));
    let m3 = mss.add_mass(1.0, Vector2::new(3.0, 0.0));
    mss.add_spring(1.0, 1000.0, [fix, m1]);
    mss.add_spring(1.0, 1000.0, [m1, m2]);
    mss.add_spring(1.0, 1000.0, [m2, m3]);

    let mut x = mss.positions();
    x[4] = 2.5;
    x[5] = -1.0;
    let dim = x.len();
    let (mut v, mut a) = (vec![0.0; dim], vec![0.0; dim]);

    let rhs: Rc<dyn NonlinearFunction> = Rc::new(mss);
    let mass = Rc::new(DiagonalMass::identity(dim));
    let mut lowest = f64::INFINITY;
    solve_ode_alpha(10.0, 1000, 0.8, &mut x, &mut v, &mut a, rhs, mass, |_, x| {
        lowest = lowest.min(x[5]);
    })?;
    info!(?x, lowest, "chain finished");
    Ok(())
}

/// Bottom chord on `y = 0` with fixed ends, top chord on `y = 1`,
/// diagonals between them. Springs start at rest length.
fn warren_truss(panels: usize) -> MassSpringSystem<2> {
    let mut mss = MassSpringSystem::new();
    mss.set_gravity(Vector2::new(0.0, GRAVITY));

    let mut bottom: Vec<(Connector, Vector2<f64>)> = Vec::new();
    for i in 0..=panels {
        let p = Vector2::new(i as f64, 0.0);
        let node = if i == 0 || i == panels {
            mss.add_fix(p)
        } else {
            mss.add_mass(1.0, p)
        };
        bottom.push((node, p));
    }
    let top: Vec<(Connector, Vector2<f64>)> = (0..panels)
        .map(|i| {
            let p = Vector2::new(i as f64 + 0.5, 1.0);
            (mss.add_mass(1.0, p), p)
        })
        .collect();

    let stiffness = 1e4;
    let mut connect = |a: (Connector, Vector2<f64>), b: (Connector, Vector2<f64>)| {
        mss.add_spring((b.1 - a.1).norm(), stiffness, [a.0, b.0]);
    };
    for pair in bottom.windows(2) {
        connect(pair[0], pair[1]);
    }
    for pair in top.windows(2) {
        connect(pair[0], pair[1]);
    }
    for (i, &node) in top.iter().enumerate() {
        connect(bottom[i], node);
        connect(node, bottom[i + 1]);
    }
    mss
}

fn truss() -> Result<()> {
    let panels = 4;
    let mss = warren_truss(panels);
    let mut x = mss.positions();
    let dim = x.len();
    let (mut v, mut a) = (vec![0.0; dim], vec![0.0; dim]);
    info!(
        masses = mss.masses().len(),
        springs = mss.springs().len(),
        "truss built"
    );

    // Bottom mass at midspan; bottom masses come first, one per interior node.
    let midspan = 2 * (panels / 2 - 1) + 1;
    let rhs: Rc<dyn NonlinearFunction> = Rc::new(mss);
    let mass = Rc::new(DiagonalMass::identity(dim));
    let mut samples = 0;
    solve_ode_alpha(5.0, 500, 0.5, &mut x, &mut v, &mut a, rhs, mass, |t, x| {
        samples += 1;
        if samples % 100 == 0 {
            info!(t, deflection = x[midspan], "truss midspan");
        }
    })?;
    info!(deflection = x[midspan], "truss settled");
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    chain()?;
    truss()?;
    Ok(())
}
