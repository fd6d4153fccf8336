//! Structured rectangular grid of bilinear quadrilateral elements with SIMP
//! penalization.
//!
//! The grid owns the element stiffness matrix and provides dof indexing,
//! Dirichlet boundary bookkeeping, global stiffness assembly (value and
//! directional-derivative forms) and the matrix-free Jacobian,
//! adjoint-Jacobian and adjoint-Hessian products the sensitivity machinery
//! is built from.

use crate::element;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Load/boundary-condition variant of the model problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadCase {
    /// Half of a simply supported beam: rollers along the left edge (every
    /// x-dof fixed), the bottom-right corner pinned in y, and a unit
    /// downward load at the top-left corner.
    MbbBeam,
    /// Beam clamped along the entire left edge, unit downward load at the
    /// bottom-right corner.
    Cantilever,
}

/// Structured mesh model: an `nx`×`ny` grid of identical unit-square
/// bilinear quadrilaterals whose element stiffness is scaled by the
/// penalized density `z_e^p`.
///
/// Nodes are numbered column-major over the `(nx+1)`×`(ny+1)` grid; each
/// node carries an x- and a y-displacement dof. Element `(i, j)` stores its
/// density at flat index `i + j*nx`. All parameters are immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct FemGrid {
    /// Element count along x.
    nx: usize,
    /// Element count along y.
    ny: usize,
    /// SIMP penalization exponent.
    penal: u32,
    /// Active load/boundary-condition variant.
    load_case: LoadCase,
    /// Young's modulus.
    youngs_modulus: f64,
    /// Poisson ratio.
    poisson_ratio: f64,
    /// Element stiffness matrix, built once at construction.
    ke: DMatrix<f64>,
}

impl FemGrid {
    /// Create a grid with the reference material constants `E = 1.0`,
    /// `ν = 0.3`.
    ///
    /// Fails with [`Error::Configuration`] when either element count is zero
    /// or the penalization exponent is below one.
    pub fn new(nx: usize, ny: usize, penal: u32, load_case: LoadCase) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(Error::Configuration(format!(
                "grid needs at least one element per axis, got {nx}x{ny}"
            )));
        }
        if penal < 1 {
            return Err(Error::Configuration(format!(
                "penalization exponent must be at least 1, got {penal}"
            )));
        }
        Ok(Self {
            nx,
            ny,
            penal,
            load_case,
            youngs_modulus: 1.0,
            poisson_ratio: 0.3,
            ke: element::stiffness_matrix(1.0, 0.3),
        })
    }

    /// Replace the material constants, rebuilding the element stiffness
    /// matrix.
    pub fn with_material(mut self, youngs_modulus: f64, poisson_ratio: f64) -> Self {
        self.youngs_modulus = youngs_modulus;
        self.poisson_ratio = poisson_ratio;
        self.ke = element::stiffness_matrix(youngs_modulus, poisson_ratio);
        self
    }

    /// Element count along x.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Element count along y.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// SIMP penalization exponent.
    pub fn penalization(&self) -> u32 {
        self.penal
    }

    /// Active load/boundary-condition variant.
    pub fn load_case(&self) -> LoadCase {
        self.load_case
    }

    /// Young's modulus.
    pub fn youngs_modulus(&self) -> f64 {
        self.youngs_modulus
    }

    /// Poisson ratio.
    pub fn poisson_ratio(&self) -> f64 {
        self.poisson_ratio
    }

    /// Number of design variables (one density per element).
    pub fn num_elements(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of displacement degrees of freedom.
    pub fn num_dofs(&self) -> usize {
        2 * (self.nx + 1) * (self.ny + 1)
    }

    /// The shared element stiffness matrix.
    pub fn element_stiffness(&self) -> &DMatrix<f64> {
        &self.ke
    }

    /// Global dof carried by local dof `r` of an element whose corner node
    /// scalars are `n1` and `n2` (1-based node numbering).
    fn global_dof(r: usize, n1: usize, n2: usize) -> usize {
        match r {
            0 => 2 * n1 - 2,
            1 => 2 * n1 - 1,
            2 => 2 * n2 - 2,
            3 => 2 * n2 - 1,
            4 => 2 * n2,
            5 => 2 * n2 + 1,
            6 => 2 * n1,
            7 => 2 * n1 + 1,
            _ => unreachable!("local dof index out of range"),
        }
    }

    /// Corner node scalars `(n1, n2)` of element `(i, j)`.
    fn corner_nodes(&self, i: usize, j: usize) -> (usize, usize) {
        let n1 = (self.ny + 1) * i + (j + 1);
        let n2 = (self.ny + 1) * (i + 1) + (j + 1);
        (n1, n2)
    }

    /// Flat design index of element `(i, j)`.
    fn design_index(&self, i: usize, j: usize) -> usize {
        i + j * self.nx
    }

    /// Whether a global dof is eliminated by the active variant's Dirichlet
    /// conditions.
    pub fn is_fixed(&self, dof: usize) -> bool {
        match self.load_case {
            LoadCase::MbbBeam => {
                (dof < 2 * (self.ny + 1) && dof % 2 == 0) || dof == self.num_dofs() - 1
            }
            LoadCase::Cantilever => dof < 2 * (self.ny + 1),
        }
    }

    /// Overwrite every fixed dof of `u` with the imposed boundary value
    /// (zero). Any vector standing for a state, perturbation or adjoint must
    /// pass through here before it enters an assembly or matrix-free
    /// product.
    pub fn apply_dirichlet(&self, u: &mut [f64]) {
        for (dof, value) in u.iter_mut().enumerate() {
            if self.is_fixed(dof) {
                *value = 0.0;
            }
        }
    }

    /// Point-load vector of the active variant.
    pub fn force(&self) -> DVector<f64> {
        let mut f = DVector::zeros(self.num_dofs());
        match self.load_case {
            LoadCase::MbbBeam => f[1] = -1.0,
            LoadCase::Cantilever => f[self.num_dofs() - 1] = -1.0,
        }
        f
    }

    /// Penalized density `z^p`.
    fn penalized(&self, z: f64) -> f64 {
        z.powi(self.penal as i32)
    }

    /// First derivative of `z^p`. `p == 1` short-circuits so no zero
    /// exponent is ever evaluated.
    fn penalized_d1(&self, z: f64) -> f64 {
        if self.penal == 1 {
            1.0
        } else {
            f64::from(self.penal) * z.powi(self.penal as i32 - 1)
        }
    }

    /// Second derivative of `z^p`. `p == 1` has no curvature, `p == 2` is
    /// the exact constant; only `p >= 3` evaluates a power of `z`.
    fn penalized_d2(&self, z: f64) -> f64 {
        match self.penal {
            1 => 0.0,
            2 => 2.0,
            p => f64::from(p) * (f64::from(p) - 1.0) * z.powi(p as i32 - 2),
        }
    }

    /// Assemble the global stiffness matrix `K(z)`, eliminating fixed dof by
    /// identity pivots: a fixed row carries a unit diagonal and nothing
    /// else, and fixed columns are skipped in interior rows. With
    /// `transpose` the element contributions accumulate at `(col, row)`
    /// instead; the operator is symmetric so the result is the same matrix,
    /// the flag mirrors the adjoint-assembly interface.
    ///
    /// # Panics
    ///
    /// Panics when `z` is not design-sized.
    pub fn assemble(&self, z: &[f64], transpose: bool) -> DMatrix<f64> {
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        let n = self.num_dofs();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let zp = self.penalized(z[self.design_index(i, j)]);
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        k[(row, row)] = 1.0;
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        let val = zp * self.ke[(r, c)];
                        if transpose {
                            k[(col, row)] += val;
                        } else {
                            k[(row, col)] += val;
                        }
                    }
                }
            }
        }
        k
    }

    /// Assemble the directional derivative of `K(z)` along the design
    /// perturbation `v`: the per-element scalar becomes `d(z^p)/dz · v_e`.
    /// Boundary handling is identical to [`FemGrid::assemble`].
    ///
    /// # Panics
    ///
    /// Panics when `z` or `v` is not design-sized.
    pub fn assemble_directional(&self, z: &[f64], v: &[f64], transpose: bool) -> DMatrix<f64> {
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        assert_eq!(v.len(), self.num_elements(), "design direction length");
        let n = self.num_dofs();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let e = self.design_index(i, j);
                let dzp = self.penalized_d1(z[e]);
                let dir = v[e];
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        k[(row, row)] = 1.0;
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        let val = dzp * dir * self.ke[(r, c)];
                        if transpose {
                            k[(col, row)] += val;
                        } else {
                            k[(row, col)] += val;
                        }
                    }
                }
            }
        }
        k
    }

    /// Matrix-free product `K(z)·u`, written into `ku`. Fixed rows pass `u`
    /// through unchanged, so the product agrees with the identity pivots of
    /// the assembled matrix.
    ///
    /// # Panics
    ///
    /// Panics when `ku`/`u` is not state-sized or `z` is not design-sized.
    pub fn apply_stiffness(&self, ku: &mut [f64], u: &[f64], z: &[f64]) {
        assert_eq!(ku.len(), self.num_dofs(), "output vector length");
        assert_eq!(u.len(), self.num_dofs(), "state vector length");
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        ku.fill(0.0);
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let zp = self.penalized(z[self.design_index(i, j)]);
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        ku[row] = u[row];
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        ku[row] += zp * self.ke[(r, c)] * u[col];
                    }
                }
            }
        }
    }

    /// Matrix-free product of the design-directional stiffness derivative
    /// with `u`: per element the scalar is `d(z^p)/dz · v_e`. Fixed rows
    /// pass `u` through unchanged.
    ///
    /// # Panics
    ///
    /// Panics on any mis-sized operand.
    pub fn apply_stiffness_directional(&self, ku: &mut [f64], u: &[f64], z: &[f64], v: &[f64]) {
        assert_eq!(ku.len(), self.num_dofs(), "output vector length");
        assert_eq!(u.len(), self.num_dofs(), "state vector length");
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        assert_eq!(v.len(), self.num_elements(), "design direction length");
        ku.fill(0.0);
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let e = self.design_index(i, j);
                let dzp = self.penalized_d1(z[e]);
                let dir = v[e];
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        ku[row] = u[row];
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        ku[row] += dir * dzp * self.ke[(r, c)] * u[col];
                    }
                }
            }
        }
    }

    /// Design-space adjoint of the state Jacobian: for each element,
    /// `jv[e] = d(z^p)/dz · Σ_{r,c} KE[r,c]·u[col]·v[row]`, with fixed rows
    /// contributing `v[row]·u[row]`. Every entry of `jv` is assigned.
    ///
    /// # Panics
    ///
    /// Panics on any mis-sized operand.
    pub fn apply_design_adjoint(&self, jv: &mut [f64], u: &[f64], z: &[f64], v: &[f64]) {
        assert_eq!(jv.len(), self.num_elements(), "output vector length");
        assert_eq!(u.len(), self.num_dofs(), "state vector length");
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        assert_eq!(v.len(), self.num_dofs(), "dual vector length");
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let e = self.design_index(i, j);
                let dzp = self.penalized_d1(z[e]);
                let mut vku = 0.0;
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        vku += v[row] * u[row];
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        vku += dzp * self.ke[(r, c)] * u[col] * v[row];
                    }
                }
                jv[e] = vku;
            }
        }
    }

    /// Design-space adjoint-Hessian action: the bilinear form of the second
    /// penalization derivative scaled by the design direction `v`, taken
    /// against the state `u` and the dual `w`. Fixed rows contribute
    /// `w[row]·u[row]`. Every entry of `hv` is assigned.
    ///
    /// For `p == 1` the result is identically zero; for `p == 2` the scaling
    /// is the constant `2` with no dependence on `z`.
    ///
    /// # Panics
    ///
    /// Panics on any mis-sized operand.
    pub fn apply_design_adjoint_hessian(
        &self,
        hv: &mut [f64],
        u: &[f64],
        z: &[f64],
        v: &[f64],
        w: &[f64],
    ) {
        assert_eq!(hv.len(), self.num_elements(), "output vector length");
        assert_eq!(u.len(), self.num_dofs(), "state vector length");
        assert_eq!(z.len(), self.num_elements(), "design vector length");
        assert_eq!(v.len(), self.num_elements(), "design direction length");
        assert_eq!(w.len(), self.num_dofs(), "dual vector length");
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (n1, n2) = self.corner_nodes(i, j);
                let e = self.design_index(i, j);
                let ddzp = self.penalized_d2(z[e]);
                let dir = v[e];
                let mut wku = 0.0;
                for r in 0..8 {
                    let row = Self::global_dof(r, n1, n2);
                    if self.is_fixed(row) {
                        wku += w[row] * u[row];
                        continue;
                    }
                    for c in 0..8 {
                        let col = Self::global_dof(c, n1, n2);
                        if self.is_fixed(col) {
                            continue;
                        }
                        wku += ddzp * dir * self.ke[(r, c)] * u[col] * w[row];
                    }
                }
                hv[e] = wku;
            }
        }
    }
}

/// Write the design field to a plain-text file, one `i  j  value` line per
/// element.
pub fn write_density<P: AsRef<Path>>(path: P, grid: &FemGrid, z: &[f64]) -> Result<()> {
    if z.len() != grid.num_elements() {
        return Err(Error::DimensionMismatch {
            expected: grid.num_elements(),
            found: z.len(),
        });
    }
    let mut file = BufWriter::new(File::create(path)?);
    for i in 0..grid.nx() {
        for j in 0..grid.ny() {
            writeln!(file, "{}  {}  {}", i, j, z[i + j * grid.nx()])?;
        }
    }
    Ok(())
}


#[cfg(test)]
mod boundary_tests {
    use super::{FemGrid, LoadCase};

    #[test]
    fn test_cantilever_fixes_left_edge() {
        let grid = FemGrid::new(4, 3, 3, LoadCase::Cantilever).unwrap();
        let fixed: Vec<usize> = (0..grid.num_dofs()).filter(|&d| grid.is_fixed(d)).collect();
        // Both dofs of all ny+1 left-edge nodes.
        assert_eq!(fixed, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_mbb_fixes_left_rollers_and_corner() {
        let grid = FemGrid::new(4, 3, 3, LoadCase::MbbBeam).unwrap();
        let fixed: Vec<usize> = (0..grid.num_dofs()).filter(|&d| grid.is_fixed(d)).collect();
        assert_eq!(fixed, vec![0, 2, 4, 6, grid.num_dofs() - 1]);
    }

    #[test]
    fn test_dirichlet_zeroes_fixed_dofs_only() {
        for case in [LoadCase::MbbBeam, LoadCase::Cantilever] {
            let grid = FemGrid::new(5, 4, 3, case).unwrap();
            let mut u: Vec<f64> = (0..grid.num_dofs()).map(|d| 1.0 + d as f64).collect();
            grid.apply_dirichlet(&mut u);
            for (d, &value) in u.iter().enumerate() {
                if grid.is_fixed(d) {
                    assert_eq!(value, 0.0);
                } else {
                    assert_eq!(value, 1.0 + d as f64);
                }
            }
        }
    }

    #[test]
    fn test_force_placement() {
        let mbb = FemGrid::new(4, 3, 3, LoadCase::MbbBeam).unwrap();
        let f = mbb.force();
        assert_eq!(f[1], -1.0);
        assert_eq!(f.iter().filter(|&&v| v != 0.0).count(), 1);

        let cantilever = FemGrid::new(4, 3, 3, LoadCase::Cantilever).unwrap();
        let f = cantilever.force();
        assert_eq!(f[cantilever.num_dofs() - 1], -1.0);
        assert_eq!(f.iter().filter(|&&v| v != 0.0).count(), 1);
    }
}
