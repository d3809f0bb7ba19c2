//! SVG figures: decision regions of a 2-feature model and a confusion heatmap
//!
//! [`DecisionGrid`] is plain data so it can be tested without drawing
//! anything. The render functions only turn data into SVG.

use crate::core::{Classifier, Result, SVMError};
use crate::metrics::ConfusionMatrix;
use log::debug;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const CLASS_COLORS: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

const BOUNDARY_SIZE: (u32, u32) = (800, 600);
const HEATMAP_SIZE: (u32, u32) = (640, 600);

fn class_color(label: usize) -> RGBColor {
    CLASS_COLORS[label % CLASS_COLORS.len()]
}

fn plot_err<E: std::fmt::Display>(err: E) -> SVMError {
    SVMError::PlotError(err.to_string())
}

/// Model predictions over an evenly spaced 2-D mesh
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionGrid {
    /// Mesh coordinates along the first feature
    pub xs: Vec<f64>,
    /// Mesh coordinates along the second feature
    pub ys: Vec<f64>,
    /// `labels[j][i]` is the class predicted at `(xs[i], ys[j])`
    pub labels: Vec<Vec<usize>>,
}

impl DecisionGrid {
    /// Evaluate `model` at `resolution × resolution` points covering the ranges
    pub fn compute<C: Classifier>(
        model: &C,
        x_range: (f64, f64),
        y_range: (f64, f64),
        resolution: usize,
    ) -> Result<Self> {
        if resolution < 2 {
            return Err(SVMError::InvalidParameter(format!(
                "grid resolution must be at least 2, got: {resolution}"
            )));
        }
        let xs = linspace(x_range, resolution)?;
        let ys = linspace(y_range, resolution)?;

        let labels = ys
            .iter()
            .map(|&y| {
                xs.iter()
                    .map(|&x| model.predict(&[x, y]).map(|p| p.label))
                    .collect::<Result<Vec<usize>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Evaluated decision grid at {} points", xs.len() * ys.len());
        Ok(Self { xs, ys, labels })
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.ys[0], self.ys[self.ys.len() - 1])
    }

    /// Number of mesh points predicted as each class
    pub fn class_area(&self, n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];
        for &label in self.labels.iter().flatten() {
            if label < n_classes {
                counts[label] += 1;
            }
        }
        counts
    }

    /// Horizontal runs of equal predictions: `(row, first_col, last_col, label)`
    fn runs(&self) -> Vec<(usize, usize, usize, usize)> {
        let mut runs = Vec::new();
        for (j, row) in self.labels.iter().enumerate() {
            let mut start = 0;
            for i in 1..=row.len() {
                if i == row.len() || row[i] != row[start] {
                    runs.push((j, start, i - 1, row[start]));
                    start = i;
                }
            }
        }
        runs
    }
}

fn linspace((lo, hi): (f64, f64), n: usize) -> Result<Vec<f64>> {
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(SVMError::InvalidParameter(format!(
            "invalid axis range: ({lo}, {hi})"
        )));
    }
    let step = (hi - lo) / (n - 1) as f64;
    Ok((0..n).map(|i| lo + step * i as f64).collect())
}

/// `(min - padding, max + padding)` of one column of `points`
pub fn axis_range(points: &[Vec<f64>], column: usize, padding: f64) -> Result<(f64, f64)> {
    let (lo, hi) = points
        .iter()
        .map(|p| p.get(column).copied())
        .try_fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            v.map(|v| (lo.min(v), hi.max(v)))
        })
        .ok_or(SVMError::DimensionMismatch {
            expected: column + 1,
            actual: points.iter().map(Vec::len).min().unwrap_or(0),
        })?;
    if lo > hi {
        return Err(SVMError::EmptyDataset);
    }
    Ok((lo - padding, hi + padding))
}

/// Draw filled decision regions with the labeled points scattered on top
pub fn render_decision_boundary<P: AsRef<Path>>(
    path: P,
    grid: &DecisionGrid,
    points: &[Vec<f64>],
    labels: &[usize],
    axis_names: (&str, &str),
    class_names: &[String],
) -> Result<()> {
    if points.len() != labels.len() {
        return Err(SVMError::DimensionMismatch {
            expected: points.len(),
            actual: labels.len(),
        });
    }
    if let Some(p) = points.iter().find(|p| p.len() != 2) {
        return Err(SVMError::DimensionMismatch {
            expected: 2,
            actual: p.len(),
        });
    }

    let (x0, x1) = grid.x_range();
    let (y0, y1) = grid.y_range();
    let dx = (x1 - x0) / (grid.xs.len() - 1) as f64;
    let dy = (y1 - y0) / (grid.ys.len() - 1) as f64;

    let root = SVGBackend::new(path.as_ref(), BOUNDARY_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("SVM decision regions", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(axis_names.0)
        .y_desc(axis_names.1)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(grid.runs().into_iter().map(|(j, first, last, label)| {
            let left = (grid.xs[first] - dx / 2.0).max(x0);
            let right = (grid.xs[last] + dx / 2.0).min(x1);
            let bottom = (grid.ys[j] - dy / 2.0).max(y0);
            let top = (grid.ys[j] + dy / 2.0).min(y1);
            Rectangle::new(
                [(left, bottom), (right, top)],
                class_color(label).mix(0.25).filled(),
            )
        }))
        .map_err(plot_err)?;

    for (class, name) in class_names.iter().enumerate() {
        let color = class_color(class);
        chart
            .draw_series(
                points
                    .iter()
                    .zip(labels)
                    .filter(|(_, l)| **l == class)
                    .map(|(p, _)| Circle::new((p[0], p[1]), 4, color.filled())),
            )
            .map_err(plot_err)?
            .label(name.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("Wrote decision boundary plot to {}", path.as_ref().display());
    Ok(())
}

/// Draw a confusion matrix as a heatmap with per-cell counts
pub fn render_confusion_heatmap<P: AsRef<Path>>(
    path: P,
    matrix: &ConfusionMatrix,
    class_names: &[String],
) -> Result<()> {
    let n = matrix.n_classes();
    if class_names.len() != n {
        return Err(SVMError::DimensionMismatch {
            expected: n,
            actual: class_names.len(),
        });
    }
    let max_count = matrix.rows().iter().flatten().copied().max().unwrap_or(0).max(1);
    let side = n as i32;

    let root = SVGBackend::new(path.as_ref(), HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Confusion matrix", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0..side, side..0)
        .map_err(plot_err)?;

    let (width, height) = chart.plotting_area().dim_in_pixel();
    let cell_w = width as i32 / side.max(1);
    let cell_h = height as i32 / side.max(1);
    let name = |v: &i32| class_names.get(*v as usize).cloned().unwrap_or_default();

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n + 1)
        .y_labels(n + 1)
        .x_label_offset(cell_w / 2)
        .y_label_offset(-cell_h / 2)
        .x_label_formatter(&name)
        .y_label_formatter(&name)
        .x_desc("Predicted")
        .y_desc("True")
        .draw()
        .map_err(plot_err)?;

    let cells: Vec<(i32, i32, usize)> = matrix
        .rows()
        .iter()
        .enumerate()
        .flat_map(|(t, row)| {
            row.iter()
                .enumerate()
                .map(move |(p, &count)| (p as i32, t as i32, count))
        })
        .collect();

    chart
        .draw_series(cells.iter().map(|&(x, y, count)| {
            let shade = count as f64 / max_count as f64;
            Rectangle::new(
                [(x, y), (x + 1, y + 1)],
                HSLColor(0.6, 0.7, 0.95 - 0.55 * shade).filled(),
            )
        }))
        .map_err(plot_err)?;

    let text_style = ("sans-serif", 22)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart
        .draw_series(cells.iter().map(|&(x, y, count)| {
            EmptyElement::at((x, y))
                + Text::new(count.to_string(), (cell_w / 2, cell_h / 2), text_style.clone())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("Wrote confusion heatmap to {}", path.as_ref().display());
    Ok(())
}
