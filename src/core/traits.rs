//! Core traits for datasets and classifiers

use crate::core::{Prediction, Result, Sample};

/// Dataset abstraction for row access
pub trait Dataset {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample;

    /// Get multiple samples
    fn get_batch(&self, indices: &[usize]) -> Vec<Sample> {
        indices.iter().map(|&i| self.get_sample(i)).collect()
    }

    /// Get all class labels in row order
    fn get_labels(&self) -> Vec<usize>;

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fitted classifier over dense rows
pub trait Classifier {
    /// Predict a single row
    fn predict(&self, features: &[f64]) -> Result<Prediction>;

    /// Predict several rows
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<Prediction>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Number of classes the model can emit
    fn n_classes(&self) -> usize;
}
