//! Classification metrics
//!
//! Multiclass generalization of the binary TP/TN/FP/FN counts: a
//! [`ConfusionMatrix`] over class indices and a per-class
//! [`ClassificationReport`] derived from it.

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of positions where `y_pred` equals `y_true`
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> Result<()> {
    if y_true.is_empty() {
        return Err(SVMError::EmptyDataset);
    }
    if y_true.len() != y_pred.len() {
        return Err(SVMError::DimensionMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    Ok(())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Class-by-class outcome counts: `counts[true][predicted]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth for classes `0..n_classes`
    pub fn new(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= n_classes || p >= n_classes {
                return Err(SVMError::InvalidLabel(t.max(p) as f64));
            }
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Count of rows with true class `actual` predicted as `predicted`
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Row sums: number of rows per true class
    pub fn support(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Column sums: number of rows per predicted class
    pub fn predicted_counts(&self) -> Vec<usize> {
        (0..self.n_classes())
            .map(|p| self.counts.iter().map(|row| row[p]).sum())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Diagonal sum over total
    pub fn accuracy(&self) -> f64 {
        let correct = (0..self.n_classes()).map(|k| self.counts[k][k]).sum();
        ratio(correct, self.total())
    }

    /// TP / (TP + FP) for class `k`
    pub fn precision(&self, k: usize) -> f64 {
        ratio(self.counts[k][k], self.predicted_counts()[k])
    }

    /// TP / (TP + FN) for class `k`
    pub fn recall(&self, k: usize) -> f64 {
        ratio(self.counts[k][k], self.support()[k])
    }

    /// Harmonic mean of precision and recall for class `k`
    pub fn f1_score(&self, k: usize) -> f64 {
        let p = self.precision(k);
        let r = self.recall(k);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);
        for row in &self.counts {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Precision, recall, F1 and support for one class or one average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class metrics with accuracy, macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build the report; `target_names[k]` labels class `k`
    pub fn new(y_true: &[usize], y_pred: &[usize], target_names: &[String]) -> Result<Self> {
        let matrix = ConfusionMatrix::new(y_true, y_pred, target_names.len())?;
        Ok(Self::from_confusion(&matrix, target_names))
    }

    /// Build the report from an existing confusion matrix
    ///
    /// # Panics
    /// Panics if `target_names` is shorter than the matrix
    pub fn from_confusion(matrix: &ConfusionMatrix, target_names: &[String]) -> Self {
        let support = matrix.support();
        let classes: Vec<ClassMetrics> = (0..matrix.n_classes())
            .map(|k| ClassMetrics {
                name: target_names[k].clone(),
                precision: matrix.precision(k),
                recall: matrix.recall(k),
                f1_score: matrix.f1_score(k),
                support: support[k],
            })
            .collect();

        let total: usize = support.iter().sum();
        let n = classes.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            name: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weight = |c: &ClassMetrics| {
            if total == 0 {
                0.0
            } else {
                c.support as f64 / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            name: "weighted avg".to_string(),
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1_score: classes.iter().map(|c| c.f1_score * weight(c)).sum(),
            support: total,
        };

        Self {
            classes,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn total_support(&self) -> usize {
        self.macro_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(std::iter::once(self.weighted_avg.name.len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.name, m.precision, m.recall, m.f1_score, m.support
            )
        };

        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total_support()
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}
