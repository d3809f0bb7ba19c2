//! Kernel functions for SVM

pub mod kind;
pub mod linear;
pub mod rbf;
pub mod traits;

pub use self::kind::*;
pub use self::linear::*;
pub use self::rbf::*;
pub use self::traits::*;
