//! CSV ingest of one tensile-test channel.
//!
//! A channel file has a `time` column and a value column (`strain` or
//! `stress` by default). Header names are matched case-insensitively.
//!
//! Rows that fail to parse, hold non-finite values, or do not advance in
//! time are skipped and reported. The surviving rows must still form a valid
//! `Series`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::Series;
use crate::error::AppError;

pub const TIME_COLUMN: &str = "time";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus row bookkeeping.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: Series,
    pub value_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load `(time, value_column)` pairs from a CSV file.
pub fn load_series(path: &Path, value_column: &str) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_series(file, value_column)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Read `(time, value_column)` pairs from any CSV source.
pub fn read_series<R: Read>(source: R, value_column: &str) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let value_key = normalize_header_name(value_column);
    let time_idx = *header_map
        .get(TIME_COLUMN)
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{TIME_COLUMN}`")))?;
    let value_idx = *header_map
        .get(&value_key)
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{value_key}`")))?;

    let mut time = Vec::new();
    let mut values = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = parse_field(&record, time_idx, TIME_COLUMN)
            .and_then(|t| parse_field(&record, value_idx, &value_key).map(|v| (t, v)));
        match parsed {
            Ok((t, _)) if time.last().is_some_and(|&prev| t <= prev) => row_errors.push(RowError {
                line,
                message: format!("time {t} does not increase on the previous row"),
            }),
            Ok((t, v)) => {
                time.push(t);
                values.push(v);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), rows_read, column = %value_key, "skipped invalid CSV rows");
    }

    let rows_used = time.len();
    if rows_used < 2 {
        return Err(AppError::new(
            3,
            format!("Only {rows_used} valid row(s) in the `{value_key}` channel; at least 2 are needed."),
        ));
    }

    Ok(IngestedSeries {
        series: Series::new(time, values)?,
        value_column: value_key,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_field(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_time_and_named_column() {
        let csv = "\u{feff}Time,Load,Stress\n0.0,1,0.5\n0.1,2,1.5\n0.2,3,2.5\n";
        let data = read_series(csv.as_bytes(), "stress").unwrap();
        assert_eq!(data.series.time(), &[0.0, 0.1, 0.2]);
        assert_eq!(data.series.values(), &[0.5, 1.5, 2.5]);
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.rows_used, 3);
        assert!(data.row_errors.is_empty());
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "time,strain\n0,0.0\n1,abc\n2,0.2\n2,0.3\n3,inf\n4,0.4\n5,\n";
        let data = read_series(csv.as_bytes(), "strain").unwrap();
        assert_eq!(data.series.time(), &[0.0, 2.0, 4.0]);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 5, 6, 8]);
        assert!(data.row_errors[1].message.contains("does not increase"));
    }

    #[test]
    fn missing_columns_are_input_errors() {
        let err = read_series("t,strain\n0,1\n1,2\n".as_bytes(), "strain").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("`time`"));

        let err = read_series("time,strain\n0,1\n1,2\n".as_bytes(), "stress").unwrap_err();
        assert!(err.to_string().contains("`stress`"));
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let err = read_series("time,stress\n0,1\n".as_bytes(), "stress").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
