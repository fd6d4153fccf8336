#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod constraint;
pub mod element;
pub mod error;
pub mod mesh;
pub mod objective;
pub mod simopt;
pub mod solver;

pub use constraint::ElasticityConstraint;
pub use error::{Error, Result};
pub use mesh::{write_density, FemGrid, LoadCase};
pub use objective::ComplianceObjective;
pub use simopt::{Coefficients, DesignBounds, EqualityConstraint, Objective};
pub use solver::{DenseLu, LinearSolver, SparseCholesky};
