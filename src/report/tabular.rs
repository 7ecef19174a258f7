use std::collections::HashMap;

use log::debug;

use super::{Distribution, PredictionResult, decode_label};
use crate::error::{BridgeError, Result};

const PROB_PREFIX: &str = "prob_";

/// Where the probabilities of each row come from.
enum ProbColumns {
    /// `prob_<class>` columns: (index, class name).
    Named(Vec<(usize, String)>),
    /// A `distribution` column followed by one column per declared class.
    Positional(usize),
    None,
}

/// Parse every data row of a comma-separated report.
pub fn parse(raw: &str, classes: &[String]) -> Result<Vec<PredictionResult>> {
    let start = raw
        .split_inclusive('\n')
        .scan(0usize, |offset, line| {
            let at = *offset;
            *offset += line.len();
            Some((at, line))
        })
        .find(|(_, line)| {
            let line = line.trim_start();
            line.starts_with("inst#") && line.contains(',')
        })
        .map(|(at, _)| at)
        .ok_or_else(|| BridgeError::parse("no inst# header line", raw))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw[start..].as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| BridgeError::parse(format!("bad header: {e}"), raw))?
        .iter()
        .map(str::to_string)
        .collect();
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect();

    let predicted = *index
        .get("predicted")
        .ok_or_else(|| BridgeError::parse("missing predicted column", raw))?;

    let named: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            h.len() > PROB_PREFIX.len()
                && h.get(..PROB_PREFIX.len())
                    .is_some_and(|p| p.eq_ignore_ascii_case(PROB_PREFIX))
        })
        .map(|(i, h)| (i, h[PROB_PREFIX.len()..].to_string()))
        .collect();
    let probs = if !named.is_empty() {
        ProbColumns::Named(named)
    } else if let Some(&at) = index.get("distribution") {
        ProbColumns::Positional(at)
    } else {
        ProbColumns::None
    };

    let mut results = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| BridgeError::parse(format!("row {row_no}: {e}"), raw))?;
        let Some(token) = record.get(predicted).filter(|t| !t.is_empty()) else {
            debug!("Skipping report line without a predicted value: {record:?}");
            continue;
        };

        let distribution = match &probs {
            ProbColumns::Named(cols) => Distribution::new(
                cols.iter()
                    .map(|(i, class)| (class.clone(), probability(record.get(*i))))
                    .collect(),
            ),
            ProbColumns::Positional(at) => Distribution::aligned(
                (0..classes.len()).map(|k| probability(record.get(at + k))).collect(),
                classes,
            ),
            ProbColumns::None => Distribution::default(),
        };

        results.push(PredictionResult {
            label: decode_label(token),
            distribution,
        });
    }

    if results.is_empty() {
        return Err(BridgeError::parse("no prediction rows", raw));
    }
    Ok(results)
}

/// Non-numeric cells count as zero; a leading `*` marks the predicted class.
fn probability(cell: Option<&str>) -> f64 {
    cell.map(|c| c.trim_start_matches('*'))
        .and_then(|c| c.parse::<f64>().ok())
        .unwrap_or(0.0)
}
