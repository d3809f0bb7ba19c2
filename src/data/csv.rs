//! CSV loading for labeled datasets
//!
//! Layout:
//! - The last column is the class, either a name (`setosa`) or a
//!   non-negative integer index
//! - All other columns are numeric features
//! - The first row may be a header (detected automatically)
//! - Blank lines and `#` comments are skipped

use crate::core::{Result, SVMError};
use crate::data::LabeledDataset;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl LabeledDataset {
    /// Load a dataset from a CSV file
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut header: Option<Vec<String>> = None;
        let mut records = Vec::new();
        let mut raw_labels = Vec::new();
        let mut width: Option<usize> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 2 {
                return Err(SVMError::ParseError(format!(
                    "line {}: expected at least one feature and a class, got {:?}",
                    line_no + 1,
                    line
                )));
            }

            if records.is_empty() && header.is_none() && is_header_line(&fields) {
                header = Some(fields.iter().map(|f| f.to_string()).collect());
                width = Some(fields.len());
                continue;
            }

            match width {
                Some(w) if w != fields.len() => {
                    return Err(SVMError::DimensionMismatch {
                        expected: w - 1,
                        actual: fields.len() - 1,
                    })
                }
                Some(_) => {}
                None => width = Some(fields.len()),
            }

            let (label, features) = fields.split_last().ok_or(SVMError::EmptyDataset)?;
            let row = features
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    field.parse::<f64>().map_err(|_| {
                        SVMError::ParseError(format!(
                            "line {}: invalid feature value at column {}: {:?}",
                            line_no + 1,
                            col + 1,
                            field
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            records.push(row);
            raw_labels.push(label.to_string());
        }

        if records.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let n_features = records[0].len();
        let feature_names = match header {
            Some(mut names) => {
                names.pop();
                names
            }
            None => (0..n_features).map(|i| format!("feature_{i}")).collect(),
        };

        let (targets, target_names) = encode_labels(&raw_labels);
        LabeledDataset::new(records, targets, feature_names, target_names)
    }
}

/// A header row has mostly non-numeric feature columns
fn is_header_line(fields: &[&str]) -> bool {
    let features = &fields[..fields.len() - 1];
    let non_numeric = features
        .iter()
        .filter(|f| f.parse::<f64>().is_err())
        .count();
    non_numeric * 2 > features.len()
}

/// Map raw class values to indices
///
/// If every value is a non-negative integer the integers are the indices
/// and names are their decimal strings. Otherwise names are indexed in
/// order of first appearance.
fn encode_labels(raw: &[String]) -> (Vec<usize>, Vec<String>) {
    let numeric: Option<Vec<usize>> = raw.iter().map(|s| s.parse::<usize>().ok()).collect();
    if let Some(targets) = numeric {
        let n_classes = targets.iter().max().map_or(0, |&m| m + 1);
        let names = (0..n_classes).map(|i| i.to_string()).collect();
        return (targets, names);
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut names = Vec::new();
    let targets = raw
        .iter()
        .map(|s| {
            *index.entry(s.as_str()).or_insert_with(|| {
                names.push(s.clone());
                names.len() - 1
            })
        })
        .collect();
    (targets, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_with_header_and_names() {
        let data = "a,b,species\n1.0,2.0,cat\n3.0,4.0,dog\n5.0,6.0,cat\n";
        let ds = LabeledDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.feature_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ds.target_names(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(ds.targets(), &[0, 1, 0]);
        assert_eq!(ds.records()[1], vec![3.0, 4.0]);
    }

    #[test]
    fn test_csv_without_header_numeric_labels() {
        let data = "1.0,2.0,2\n3.0,4.0,0\n";
        let ds = LabeledDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(ds.feature_names(), &["feature_0".to_string(), "feature_1".to_string()]);
        assert_eq!(ds.targets(), &[2, 0]);
        // Index 1 never occurs but still gets a name
        assert_eq!(ds.n_classes(), 3);
    }

    #[test]
    fn test_csv_comments_and_blank_lines() {
        let data = "# measurements\n\nx,y\n1.0,a\n\n# more\n2.0,b\n";
        let ds = LabeledDataset::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(ds.n_samples(), 2);
    }

    #[test]
    fn test_csv_errors() {
        assert!(matches!(
            LabeledDataset::from_reader(Cursor::new("")),
            Err(SVMError::EmptyDataset)
        ));
        assert!(matches!(
            LabeledDataset::from_reader(Cursor::new("x,y\n")),
            Err(SVMError::EmptyDataset)
        ));
        assert!(matches!(
            LabeledDataset::from_reader(Cursor::new("1.0\n")),
            Err(SVMError::ParseError(_))
        ));
        assert!(matches!(
            LabeledDataset::from_reader(Cursor::new("1.0,2.0,a\n1.0,abc,b\n")),
            Err(SVMError::ParseError(_))
        ));
        assert!(matches!(
            LabeledDataset::from_reader(Cursor::new("1.0,2.0,a\n1.0,b\n")),
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_is_header_line() {
        assert!(is_header_line(&["sepal_length", "sepal_width", "species"]));
        assert!(!is_header_line(&["5.1", "3.5", "setosa"]));
    }

    #[test]
    fn test_from_csv_file() {
        let mut file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
        writeln!(file, "f1,f2,label").unwrap();
        writeln!(file, "0.5,1.5,x").unwrap();
        writeln!(file, "2.5,3.5,y").unwrap();
        file.flush().unwrap();

        let ds = LabeledDataset::from_csv_file(file.path()).unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.class_counts(), vec![1, 1]);
    }
}
