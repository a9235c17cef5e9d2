use std::io::{BufRead, BufReader, Read};

use crate::catalog::ModelId;
use crate::data::{PredictionRecord, SourceError, finite};

const COLUMNS: usize = 8;

/// Parses model output rows:
/// `country_id,model,indicator,year,actual_value,predicted_value,is_test,is_forecast`
///
/// The first line is a header. Empty numeric cells are absent values, blank lines are skipped.
pub fn parse_predictions<R: Read>(input: R) -> Result<Vec<PredictionRecord>, SourceError> {
    let reader = BufReader::new(input);
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let line = line.map_err(|e| SourceError::Csv { line: line_no, reason: e.to_string() })?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(|p| p.trim().trim_matches('"')).collect();
        if parts.len() < COLUMNS {
            return Err(csv_err(line_no, format!("expected {} columns, got {}", COLUMNS, parts.len())));
        }

        let country_id = parts[0]
            .parse()
            .map_err(|_| csv_err(line_no, format!("bad country id '{}'", parts[0])))?;
        let model = ModelId::parse(parts[1])
            .ok_or_else(|| csv_err(line_no, format!("unknown model '{}'", parts[1])))?;
        let year = parts[3]
            .parse()
            .map_err(|_| csv_err(line_no, format!("bad year '{}'", parts[3])))?;

        rows.push(PredictionRecord {
            country_id,
            model,
            indicator_code: parts[2].to_string(),
            year,
            actual_value: number(parts[4], line_no)?,
            predicted_value: number(parts[5], line_no)?,
            is_test: flag(parts[6], line_no)?,
            is_forecast: flag(parts[7], line_no)?,
        });
    }

    Ok(rows)
}

fn csv_err(line: usize, reason: String) -> SourceError {
    SourceError::Csv { line, reason }
}

fn number(cell: &str, line: usize) -> Result<Option<f64>, SourceError> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|v| finite(Some(v)))
        .map_err(|_| csv_err(line, format!("bad number '{}'", cell)))
}

fn flag(cell: &str, line: usize) -> Result<bool, SourceError> {
    match cell.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        other => Err(csv_err(line, format!("bad flag '{}'", other))),
    }
}
