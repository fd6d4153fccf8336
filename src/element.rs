//! Element stiffness kernel for the bilinear quadrilateral.

use nalgebra::DMatrix;

/// Local stiffness matrix of a unit-square, unit-thickness bilinear
/// quadrilateral in plane stress.
///
/// The eight independent coefficients `k[0..8]` are the classical
/// closed-form values for this element; every entry of the 8×8 matrix is one
/// of them, placed by a fixed symmetry pattern and scaled by `E/(1-ν²)`.
/// Built once per mesh model and shared read-only by all per-element
/// operations.
///
/// `poisson_ratio` must lie in `(-1, 0.5)` for a physically meaningful
/// material; the kernel itself is a pure function of the two constants and
/// does not enforce the range.
pub fn stiffness_matrix(youngs_modulus: f64, poisson_ratio: f64) -> DMatrix<f64> {
    let nu = poisson_ratio;
    let k = [
        1. / 2. - nu / 6.,
        1. / 8. + nu / 8.,
        -1. / 4. - nu / 12.,
        -1. / 8. + 3. * nu / 8.,
        -1. / 4. + nu / 12.,
        -1. / 8. - nu / 8.,
        nu / 6.,
        1. / 8. - 3. * nu / 8.,
    ];
    DMatrix::from_fn(8, 8, |i, j| {
        let idx = [
            [1, 2, 3, 4, 5, 6, 7, 8],
            [2, 1, 8, 7, 6, 5, 4, 3],
            [3, 8, 1, 6, 7, 4, 5, 2],
            [4, 7, 6, 1, 8, 3, 2, 5],
            [5, 6, 7, 8, 1, 2, 3, 4],
            [6, 5, 4, 3, 2, 1, 8, 7],
            [7, 4, 5, 2, 3, 8, 1, 6],
            [8, 3, 2, 5, 4, 7, 6, 1],
        ];
        youngs_modulus / (1.0 - nu * nu) * k[idx[i][j] - 1]
    })
}

#[cfg(test)]
mod stiffness_tests {
    use super::stiffness_matrix;

    #[test]
    fn test_symmetry_over_poisson_range() {
        for nu in [-0.9, -0.5, -0.1, 0.0, 0.1, 0.3, 0.45, 0.49] {
            let ke = stiffness_matrix(1.0, nu);
            assert!(
                ke.relative_eq(&ke.transpose(), 1e-14, 0.0),
                "element matrix not symmetric for nu = {nu}"
            );
        }
    }

    #[test]
    fn test_constant_diagonal() {
        let ke = stiffness_matrix(2.5, 0.3);
        let expected = 2.5 / (1.0 - 0.09) * (1. / 2. - 0.3 / 6.);
        for r in 0..8 {
            assert!((ke[(r, r)] - expected).abs() < 1e-14);
        }
    }

    #[test]
    fn test_modulus_scales_linearly() {
        let ke1 = stiffness_matrix(1.0, 0.3);
        let ke3 = stiffness_matrix(3.0, 0.3);
        assert!((ke1 * 3.0).relative_eq(&ke3, 1e-14, 0.0));
    }
}
