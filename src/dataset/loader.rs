//! Loading and reshaping numeric sample files.
//!
//! Sample files are comma-separated numeric text with an optional header
//! line. Every data row must have the same number of columns.

use std::path::Path;

use ndarray::{concatenate, Array2, Axis};
use tracing::debug;

use crate::error::DatasetError;

/// Loads a comma-separated numeric file into an `N x D` matrix.
///
/// # Arguments
///
/// * `path` - File to read.
/// * `has_header` - When true, the first non-blank line is skipped.
///
/// # Errors
///
/// Returns `DatasetError` if the file cannot be read or any row fails
/// to parse (see [`parse_csv`]).
pub fn load_csv(path: impl AsRef<Path>, has_header: bool) -> Result<Array2<f64>, DatasetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let data = parse_csv(&text, has_header)?;

    debug!(
        path = %path.display(),
        rows = data.nrows(),
        columns = data.ncols(),
        "Loaded sample file"
    );

    Ok(data)
}

/// Parses comma-separated numeric text into an `N x D` matrix.
///
/// Blank lines are ignored. Cells are trimmed before parsing. Line numbers
/// in errors are 1-based and count every line of the input.
///
/// # Errors
///
/// - `DatasetError::Parse` for an empty, non-numeric or non-finite cell
///   (`nan`, `inf`).
/// - `DatasetError::RaggedRow` when a row's width differs from the first row.
/// - `DatasetError::Empty` when there are no data rows.
pub fn parse_csv(text: &str, has_header: bool) -> Result<Array2<f64>, DatasetError> {
    let mut values: Vec<f64> = Vec::new();
    let mut width: Option<usize> = None;
    let mut rows = 0;
    let mut header_pending = has_header;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if header_pending {
            header_pending = false;
            continue;
        }

        let start = values.len();
        for (column, cell) in line.split(',').enumerate() {
            let cell = cell.trim();
            let value = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetError::Parse {
                    line: line_number,
                    column: column + 1,
                    value: cell.to_string(),
                })?;
            values.push(value);
        }

        let row_width = values.len() - start;
        match width {
            None => width = Some(row_width),
            Some(expected) if expected != row_width => {
                return Err(DatasetError::RaggedRow {
                    line: line_number,
                    expected,
                    actual: row_width,
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let width = width.ok_or_else(|| DatasetError::Empty("no data rows found".to_string()))?;

    Array2::from_shape_vec((rows, width), values)
        .map_err(|e| DatasetError::Empty(format!("could not shape {} rows: {}", rows, e)))
}

/// Scales every column by its maximum absolute value.
///
/// After scaling, each column lies in `[-1, 1]` and at least one entry of
/// every non-zero column has magnitude 1. Columns that are entirely zero
/// are left unchanged.
pub fn normalize_max(data: &Array2<f64>) -> Array2<f64> {
    let mut normalized = data.clone();

    for mut column in normalized.columns_mut() {
        let max_abs = column.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_abs > 0.0 {
            column.mapv_inplace(|v| v / max_abs);
        }
    }

    normalized
}

/// Stacks `bottom` under `top`.
///
/// # Errors
///
/// Returns `DatasetError::ShapeMismatch` if the column counts differ.
pub fn stack_rows(top: &Array2<f64>, bottom: &Array2<f64>) -> Result<Array2<f64>, DatasetError> {
    if top.ncols() != bottom.ncols() {
        return Err(DatasetError::ShapeMismatch {
            top: top.ncols(),
            bottom: bottom.ncols(),
        });
    }

    concatenate(Axis(0), &[top.view(), bottom.view()]).map_err(|_| DatasetError::ShapeMismatch {
        top: top.ncols(),
        bottom: bottom.ncols(),
    })
}

/// Class labels for a stacked background-then-signal matrix.
///
/// Background rows get label `0`, signal rows label `1`.
pub fn labels(background_rows: usize, signal_rows: usize) -> Vec<usize> {
    let mut labels = vec![0; background_rows];
    labels.resize(background_rows + signal_rows, 1);
    labels
}
