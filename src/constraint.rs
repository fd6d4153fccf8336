//! The discretized equilibrium equation as an equality constraint over the
//! (state, design) pair.

use crate::error::{Error, Result};
use crate::mesh::FemGrid;
use crate::simopt::EqualityConstraint;
use crate::solver::{DenseLu, LinearSolver};
use nalgebra::DVector;
use std::rc::Rc;

/// `K(z)·u − f = 0` exposed through the [`EqualityConstraint`] contract.
///
/// The mesh model sits behind a shared handle so the objective can read the
/// same configuration; the linear-solver backend is pluggable. Every product
/// sanitizes its operands (fixed dof are forced to the imposed boundary
/// value before they enter an assembly or matrix-free product) and every
/// solve overwrites the fixed dof of its solution the same way.
///
/// The state operator `K(z)` is symmetric, so the adjoint-state actions
/// delegate to their forward counterparts, and the state-state curvature of
/// the constraint vanishes identically (the residual is linear in `u`).
pub struct ElasticityConstraint {
    /// Shared mesh model.
    grid: Rc<FemGrid>,
    /// Direct solver used for the state and adjoint-state systems.
    solver: Box<dyn LinearSolver>,
}

impl ElasticityConstraint {
    /// Constraint over `grid`, solving with the default pivoted dense LU.
    pub fn new(grid: Rc<FemGrid>) -> Self {
        Self {
            grid,
            solver: Box::new(DenseLu::default()),
        }
    }

    /// Replace the linear-solver backend.
    pub fn with_solver(mut self, solver: Box<dyn LinearSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// The shared mesh model.
    pub fn grid(&self) -> &FemGrid {
        &self.grid
    }

    /// Reject a state-sized operand of the wrong length.
    fn check_state(&self, v: &[f64]) -> Result<()> {
        if v.len() != self.grid.num_dofs() {
            return Err(Error::DimensionMismatch {
                expected: self.grid.num_dofs(),
                found: v.len(),
            });
        }
        Ok(())
    }

    /// Reject a design-sized operand of the wrong length.
    fn check_design(&self, v: &[f64]) -> Result<()> {
        if v.len() != self.grid.num_elements() {
            return Err(Error::DimensionMismatch {
                expected: self.grid.num_elements(),
                found: v.len(),
            });
        }
        Ok(())
    }

    /// Copy an operand and zero its fixed dof.
    fn sanitized(&self, v: &[f64]) -> Vec<f64> {
        let mut out = v.to_vec();
        self.grid.apply_dirichlet(&mut out);
        out
    }

    /// Assemble, factor and solve `K(z)·x = b`, then impose the boundary
    /// values on the solution.
    fn solve_system(&self, z: &[f64], b: &DVector<f64>) -> Result<DVector<f64>> {
        let k = self.grid.assemble(z, false);
        log::debug!(
            "factoring {}x{} stiffness system via {}",
            k.nrows(),
            k.ncols(),
            self.solver.name()
        );
        let mut x = self.solver.solve(k, b)?;
        self.grid.apply_dirichlet(x.as_mut_slice());
        Ok(x)
    }
}

impl EqualityConstraint for ElasticityConstraint {
    fn residual(&self, c: &mut [f64], u: &[f64], z: &[f64]) -> Result<()> {
        self.check_state(c)?;
        self.check_state(u)?;
        self.check_design(z)?;
        let u = self.sanitized(u);
        self.grid.apply_stiffness(c, &u, z);
        let f = self.grid.force();
        for (ci, fi) in c.iter_mut().zip(f.iter()) {
            *ci -= fi;
        }
        Ok(())
    }

    fn solve_state(&self, u: &mut [f64], z: &[f64]) -> Result<()> {
        self.check_state(u)?;
        self.check_design(z)?;
        let f = self.grid.force();
        let x = self.solve_system(z, &f)?;
        u.copy_from_slice(x.as_slice());
        Ok(())
    }

    fn apply_jacobian_state(&self, jv: &mut [f64], v: &[f64], _u: &[f64], z: &[f64]) -> Result<()> {
        self.check_state(jv)?;
        self.check_state(v)?;
        self.check_design(z)?;
        let v = self.sanitized(v);
        self.grid.apply_stiffness(jv, &v, z);
        Ok(())
    }

    fn apply_jacobian_design(&self, jv: &mut [f64], v: &[f64], u: &[f64], z: &[f64]) -> Result<()> {
        self.check_state(jv)?;
        self.check_design(v)?;
        self.check_state(u)?;
        self.check_design(z)?;
        let u = self.sanitized(u);
        self.grid.apply_stiffness_directional(jv, &u, z, v);
        Ok(())
    }

    fn apply_inverse_jacobian_state(
        &self,
        ijv: &mut [f64],
        v: &[f64],
        _u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        self.check_state(ijv)?;
        self.check_state(v)?;
        self.check_design(z)?;
        let rhs = DVector::from_column_slice(v);
        let x = self.solve_system(z, &rhs)?;
        ijv.copy_from_slice(x.as_slice());
        Ok(())
    }

    fn apply_adjoint_jacobian_state(
        &self,
        ajv: &mut [f64],
        v: &[f64],
        u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        // K(z) is symmetric.
        self.apply_jacobian_state(ajv, v, u, z)
    }

    fn apply_adjoint_jacobian_design(
        &self,
        ajv: &mut [f64],
        v: &[f64],
        u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        self.check_design(ajv)?;
        self.check_state(v)?;
        self.check_state(u)?;
        self.check_design(z)?;
        let u = self.sanitized(u);
        let v = self.sanitized(v);
        self.grid.apply_design_adjoint(ajv, &u, z, &v);
        Ok(())
    }

    fn apply_inverse_adjoint_jacobian_state(
        &self,
        iajv: &mut [f64],
        v: &[f64],
        u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        // K(z) is symmetric.
        self.apply_inverse_jacobian_state(iajv, v, u, z)
    }

    fn apply_adjoint_hessian_state_state(
        &self,
        ahwv: &mut [f64],
        _w: &[f64],
        _v: &[f64],
        _u: &[f64],
        _z: &[f64],
    ) -> Result<()> {
        // The residual is linear in the state.
        self.check_state(ahwv)?;
        ahwv.fill(0.0);
        Ok(())
    }

    fn apply_adjoint_hessian_design_state(
        &self,
        ahwv: &mut [f64],
        w: &[f64],
        v: &[f64],
        _u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        // Linearity in the state reduces this block to the design adjoint
        // with the state direction standing in for the state.
        self.apply_adjoint_jacobian_design(ahwv, w, v, z)
    }

    fn apply_adjoint_hessian_state_design(
        &self,
        ahwv: &mut [f64],
        w: &[f64],
        v: &[f64],
        _u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        // Mirror image of the (design, state) block: the dual stands in for
        // the state of the design-directional Jacobian.
        self.apply_jacobian_design(ahwv, v, w, z)
    }

    fn apply_adjoint_hessian_design_design(
        &self,
        ahwv: &mut [f64],
        w: &[f64],
        v: &[f64],
        u: &[f64],
        z: &[f64],
    ) -> Result<()> {
        self.check_design(ahwv)?;
        self.check_state(w)?;
        self.check_design(v)?;
        self.check_state(u)?;
        self.check_design(z)?;
        let u = self.sanitized(u);
        let w = self.sanitized(w);
        self.grid.apply_design_adjoint_hessian(ahwv, &u, z, v, &w);
        Ok(())
    }
}
