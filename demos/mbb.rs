//! Half MBB beam: rollers along the symmetry plane, pinned bottom-right
//! corner, unit load at the top-left corner.

use simpopt::{
    write_density, ComplianceObjective, DesignBounds, ElasticityConstraint, EqualityConstraint,
    FemGrid, LoadCase, Objective, SparseCholesky,
};
use std::rc::Rc;

fn main() -> simpopt::Result<()> {
    env_logger::init();

    let grid = Rc::new(FemGrid::new(60, 20, 3, LoadCase::MbbBeam)?);
    let constraint =
        ElasticityConstraint::new(Rc::clone(&grid)).with_solver(Box::new(SparseCholesky));
    let objective = ComplianceObjective::new(Rc::clone(&grid), 0.5);
    let bounds = DesignBounds::simp_default(grid.num_elements());

    let mut z = vec![0.5; grid.num_elements()];
    bounds.project(&mut z);

    let mut u = vec![0.0; grid.num_dofs()];
    constraint.solve_state(&mut u, &z)?;

    println!("compliance: {:.6e}", objective.value(&u, &z)?);
    write_density("density_mbb.txt", &grid, &z)?;
    Ok(())
}
