//! Decoding of the tool's textual prediction reports.
//!
//! Two dialects are understood, picked by sniffing for a comma-separated
//! `inst#` header line:
//!
//! ```text
//!  === Predictions on test data ===       inst#,actual,predicted,prob_Apple,prob_Samsung
//!   inst#  actual  predicted error ...    1,?,2:Samsung,0.2,0.8
//!      1      ?    2:Apple   [0.1,0.4]    2,?,1:Apple,0.9,0.1
//!        (single instance)                     (tabular)
//! ```

pub mod single;
pub mod tabular;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{BridgeError, Result};

/// Status lines printed instead of predictions when the model and the
/// document do not go together.
const STALE_MARKERS: &[&str] = &[
    "no training file given",
    "no training file and no object input file given",
    "no test file given",
    "train and test set are not compatible",
    "training and test set are not compatible",
];

// ---------------------------------------------------------------------------
// PredictionResult
// ---------------------------------------------------------------------------

/// Per-class probabilities in class declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution(Vec<(String, f64)>);

impl Distribution {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Distribution(entries)
    }

    /// Pair bare probabilities with class names. When the counts disagree the
    /// entries are keyed by their one-based position instead.
    pub fn aligned(probabilities: Vec<f64>, classes: &[String]) -> Self {
        let named = classes.len() == probabilities.len();
        if !named && !classes.is_empty() {
            log::warn!(
                "Distribution has {} value(s) but the class declares {}",
                probabilities.len(),
                classes.len()
            );
        }
        let entries = probabilities
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let name = if named { classes[i].clone() } else { (i + 1).to_string() };
                (name, p)
            })
            .collect();
        Distribution(entries)
    }

    pub fn get(&self, class: &str) -> Option<f64> {
        self.0.iter().find(|(c, _)| c == class).map(|(_, p)| *p)
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.0.iter().map(|(_, p)| *p).collect()
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (class, p) in entries {
            map.serialize_entry(class, p)?;
        }
        map.end()
    }
}

/// A predicted label with its class distribution.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub distribution: Distribution,
}

// ---------------------------------------------------------------------------
// Report – tagged union over the two dialects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    SingleInstance(PredictionResult),
    Tabular(Vec<PredictionResult>),
}

impl Report {
    /// Flatten into the predictions the report carries.
    pub fn into_predictions(self) -> Vec<PredictionResult> {
        match self {
            Report::SingleInstance(p) => vec![p],
            Report::Tabular(ps) => ps,
        }
    }
}

/// Whether `raw` carries a comma-separated `inst#` header line.
pub fn is_tabular(raw: &str) -> bool {
    raw.lines().any(|l| {
        let l = l.trim_start();
        l.starts_with("inst#") && l.contains(',')
    })
}

/// Parse a report, choosing the dialect by content.
///
/// `classes` are the class attribute's declared values, used to name the
/// probabilities of the single-instance dialect.
pub fn parse_report(raw: &str, classes: &[String]) -> Result<Report> {
    check_stale(raw)?;
    if is_tabular(raw) {
        tabular::parse(raw, classes).map(Report::Tabular)
    } else {
        single::parse(raw, classes).map(Report::SingleInstance)
    }
}

/// Fails with [`BridgeError::StaleModel`] when `raw` says model and document disagree.
pub(crate) fn check_stale(raw: &str) -> Result<()> {
    let lower = raw.to_ascii_lowercase();
    if STALE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err(BridgeError::StaleModel {
            raw: raw.to_string(),
        });
    }
    Ok(())
}

/// `2:Apple` → `Apple`; tokens without a colon are the label themselves.
pub(crate) fn decode_label(token: &str) -> String {
    match token.split_once(':') {
        Some((_, label)) => label.to_string(),
        None => token.to_string(),
    }
}
