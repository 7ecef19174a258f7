use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// BridgeError – everything the core can report to its caller
// ---------------------------------------------------------------------------

/// Errors surfaced by the conversion and tool-protocol layer.
///
/// None of these are retried by the core. [`BridgeError::kind`] gives the
/// coarse category an outer request layer needs to pick a response.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("input table has no rows")]
    EmptyTable,

    #[error("class column '{column}' is absent from row {row}")]
    MissingClassColumn { column: String, row: usize },

    #[error("row {row} has no value for class column '{column}'")]
    ClassValueMissing { column: String, row: usize },

    #[error("row {row}: value '{value}' is not declared for nominal attribute '{attribute}'")]
    UnknownNominal {
        attribute: String,
        value: String,
        row: usize,
    },

    #[error("attribute '{name}' is declared more than once")]
    DuplicateAttribute { name: String },

    #[error("unsupported input {}: {reason}", path.display())]
    UnsupportedInput { path: PathBuf, reason: String },

    #[error("input {} is {size} bytes, limit is {limit}", path.display())]
    InputTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to load {}: {source:#}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("no persisted schema at {}; train a model first", path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("malformed schema header at line {line}: {reason}")]
    MalformedSchema { line: usize, reason: String },

    #[error("invalid schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("tool failed (exit code {exit_code:?}): {}", argv.join(" "))]
    Process {
        argv: Vec<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("could not parse tool report: {reason}")]
    Parse { reason: String, raw: String },

    #[error("tool reported a model/data mismatch instead of predictions")]
    StaleModel { raw: String },

    #[error("tool did not finish within {after:?}: {}", argv.join(" "))]
    Timeout { argv: Vec<String>, after: Duration },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Schema,
    Process,
    Parse,
    StaleModel,
    Timeout,
    Config,
    Io,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        use BridgeError::*;
        match self {
            EmptyTable
            | MissingClassColumn { .. }
            | ClassValueMissing { .. }
            | UnknownNominal { .. }
            | DuplicateAttribute { .. }
            | UnsupportedInput { .. }
            | InputTooLarge { .. }
            | Load { .. } => ErrorKind::Input,
            SchemaNotFound { .. } | MalformedSchema { .. } | InvalidSchema { .. } => {
                ErrorKind::Schema
            }
            Process { .. } => ErrorKind::Process,
            Parse { .. } => ErrorKind::Parse,
            StaleModel { .. } => ErrorKind::StaleModel,
            Timeout { .. } => ErrorKind::Timeout,
            InvalidConfig { .. } => ErrorKind::Config,
            Io(_) => ErrorKind::Io,
        }
    }

    /// The request itself was at fault; nothing was spawned.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Input | ErrorKind::Schema)
    }

    /// The same request may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    pub(crate) fn parse(reason: impl Into<String>, raw: &str) -> Self {
        BridgeError::Parse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
