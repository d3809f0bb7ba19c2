//! Feature standardization
//!
//! [`StandardScaler`] learns per-feature mean and variance from training
//! rows and applies `z = (x - mean) / std` to any rows afterwards. Fitting
//! and transforming are separate calls so held-out rows can never leak
//! into the statistics.

use crate::core::{Result, SVMError};
use crate::data::LabeledDataset;
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as a constant feature
const MIN_STD: f64 = 1e-12;

/// Z-score scaler with population (ddof = 0) statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Vec<f64>>,
    variance: Option<Vec<f64>>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a fitted scaler from stored statistics
    pub fn from_parts(mean: Vec<f64>, variance: Vec<f64>, n_samples_seen: usize) -> Result<Self> {
        if mean.len() != variance.len() {
            return Err(SVMError::DimensionMismatch {
                expected: mean.len(),
                actual: variance.len(),
            });
        }
        if let Some(&v) = variance.iter().find(|&&v| !(v >= 0.0)) {
            return Err(SVMError::InvalidParameter(format!(
                "variance must be non-negative, got: {v}"
            )));
        }
        Ok(Self {
            mean: Some(mean),
            variance: Some(variance),
            n_samples_seen,
        })
    }

    /// Estimate mean and variance of every column of `records`
    pub fn fit(&mut self, records: &[Vec<f64>]) -> Result<()> {
        let first = records.first().ok_or(SVMError::EmptyDataset)?;
        let dim = first.len();
        if let Some(row) = records.iter().find(|row| row.len() != dim) {
            return Err(SVMError::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }

        let n = records.len() as f64;
        let mut mean = vec![0.0; dim];
        for row in records {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; dim];
        for row in records {
            for ((v, x), m) in variance.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }
        variance.iter_mut().for_each(|v| *v /= n);

        self.mean = Some(mean);
        self.variance = Some(variance);
        self.n_samples_seen = records.len();
        Ok(())
    }

    /// Standardize rows with the fitted statistics
    pub fn transform(&self, records: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        records.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Standardize a single row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let mean = self.mean.as_ref().ok_or(SVMError::NotFitted)?;
        self.check_width(row.len())?;
        let scale = self.scale().ok_or(SVMError::NotFitted)?;
        Ok(row
            .iter()
            .zip(mean)
            .zip(&scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect())
    }

    /// Fit on `records` and return them standardized
    pub fn fit_transform(&mut self, records: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(records)?;
        self.transform(records)
    }

    /// Map standardized rows back to the original units
    pub fn inverse_transform(&self, records: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let mean = self.mean.as_ref().ok_or(SVMError::NotFitted)?;
        let scale = self.scale().ok_or(SVMError::NotFitted)?;
        records
            .iter()
            .map(|row| {
                self.check_width(row.len())?;
                Ok(row
                    .iter()
                    .zip(mean)
                    .zip(&scale)
                    .map(|((z, m), s)| z * s + m)
                    .collect())
            })
            .collect()
    }

    /// Standardize the feature matrix of a dataset, keeping its labels
    pub fn transform_dataset(&self, dataset: &LabeledDataset) -> Result<LabeledDataset> {
        dataset.with_records(self.transform(dataset.records())?)
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Per-feature mean of the training rows
    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    /// Per-feature population variance of the training rows
    pub fn variance(&self) -> Option<&[f64]> {
        self.variance.as_deref()
    }

    /// Per-feature divisor: the standard deviation, or 1 for constant features
    pub fn scale(&self) -> Option<Vec<f64>> {
        self.variance.as_ref().map(|variance| {
            variance
                .iter()
                .map(|v| {
                    let std = v.sqrt();
                    if std < MIN_STD {
                        1.0
                    } else {
                        std
                    }
                })
                .collect()
        })
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    fn check_width(&self, width: usize) -> Result<()> {
        let expected = self.mean.as_ref().map_or(0, Vec::len);
        if width != expected {
            return Err(SVMError::DimensionMismatch {
                expected,
                actual: width,
            });
        }
        Ok(())
    }
}
