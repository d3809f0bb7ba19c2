//! The bundled Iris flower dataset
//!
//! 150 samples of three species (50 each) with four measurements in
//! centimetres: sepal length, sepal width, petal length, petal width.

use crate::core::Result;
use crate::data::LabeledDataset;

const IRIS_CSV: &str = include_str!("../../data/iris.csv");

/// Number of rows in the Iris table
pub const IRIS_SAMPLES: usize = 150;

/// Number of feature columns in the Iris table
pub const IRIS_FEATURES: usize = 4;

/// Load the bundled Iris dataset
///
/// Classes are indexed `0 = setosa`, `1 = versicolor`, `2 = virginica`.
pub fn iris() -> Result<LabeledDataset> {
    LabeledDataset::from_reader(IRIS_CSV.as_bytes())
}
