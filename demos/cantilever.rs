//! Cantilever model problem: solve the state equation at a uniform density
//! and report compliance, in the reference configuration (32x20 grid, volume
//! fraction 0.4).

use simpopt::{
    write_density, ComplianceObjective, DesignBounds, ElasticityConstraint, EqualityConstraint,
    FemGrid, LoadCase, Objective, SparseCholesky,
};
use std::rc::Rc;

fn main() -> simpopt::Result<()> {
    env_logger::init();

    let grid = Rc::new(FemGrid::new(32, 20, 3, LoadCase::Cantilever)?);
    let constraint =
        ElasticityConstraint::new(Rc::clone(&grid)).with_solver(Box::new(SparseCholesky));
    let objective = ComplianceObjective::new(Rc::clone(&grid), 0.4);
    let bounds = DesignBounds::simp_default(grid.num_elements());

    let mut z = vec![0.4; grid.num_elements()];
    bounds.project(&mut z);

    let mut u = vec![0.0; grid.num_dofs()];
    constraint.solve_state(&mut u, &z)?;

    println!("compliance: {:.6e}", objective.value(&u, &z)?);
    let fraction = z.iter().sum::<f64>() / grid.num_elements() as f64;
    println!("volume fraction: {fraction:.3}");

    write_density("density.txt", &grid, &z)?;
    Ok(())
}
