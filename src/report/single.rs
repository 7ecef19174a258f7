use std::sync::LazyLock;

use regex::Regex;

use super::{Distribution, PredictionResult, decode_label};
use crate::error::{BridgeError, Result};

/// `<index> <actual> <predicted><rest>`
static PREDICTION_LINE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(\S+)\s+(\S+)(.*)$"));

/// Parse the first per-instance prediction line of `raw`.
pub fn parse(raw: &str, classes: &[String]) -> Result<PredictionResult> {
    let line = PREDICTION_LINE
        .as_ref()
        .map_err(|e| BridgeError::parse(e.to_string(), raw))?;

    let caps = raw
        .lines()
        .find_map(|l| line.captures(l))
        .ok_or_else(|| BridgeError::parse("no prediction line", raw))?;

    let label = decode_label(&caps[3]);
    let probabilities = match distribution_text(&caps[4]) {
        Some(text) => parse_probabilities(text).ok_or_else(|| {
            BridgeError::parse(format!("bad distribution '{text}'"), raw)
        })?,
        None => Vec::new(),
    };

    Ok(PredictionResult {
        label,
        distribution: Distribution::aligned(probabilities, classes),
    })
}

/// Locate the distribution in the text following the predicted token:
/// `[ +][ (<error>)][  [p1,p2,...]]`. An unbracketed comma list is accepted
/// too; a lone number is the prediction confidence, not a distribution.
fn distribution_text(rest: &str) -> Option<&str> {
    let mut rest = rest.trim();
    if let Some(r) = rest.strip_prefix('+') {
        rest = r.trim_start();
    }
    if rest.starts_with('(') {
        rest = match rest.find(')') {
            Some(end) => rest[end + 1..].trim_start(),
            None => "",
        };
    }
    if let Some(inner) = rest.strip_prefix('[') {
        return inner.find(']').map(|end| &inner[..end]);
    }
    rest.split_whitespace().find(|token| token.contains(','))
}

fn parse_probabilities(text: &str) -> Option<Vec<f64>> {
    text.split(',')
        .map(|v| v.trim().trim_start_matches('*').parse::<f64>().ok())
        .collect()
}
