//! Dual solvers for binary SVM training

pub mod smo;

pub use self::smo::*;
