//! Bridge between tabular records and an external command-line classifier.
//!
//! Records are normalized and rendered as attribute-relation documents, the
//! classifier runs as a child process, and its textual report is parsed back
//! into labels with class distributions. The schema learned at training time
//! is persisted so prediction documents declare the same attributes.

pub mod arff;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tool;

pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorKind, Result};
pub use pipeline::{Bridge, Outcome, TrainOptions, TrainOutcome};
pub use report::{Distribution, PredictionResult};
