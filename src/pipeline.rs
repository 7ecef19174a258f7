use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::arff::{
    FsSchemaStore, Mode, PersistedSchema, Schema, SchemaInferencer, SchemaStore, write_document,
};
use crate::config::BridgeConfig;
use crate::data::loader::{extension, load_table};
use crate::data::model::{Row, Table};
use crate::error::{BridgeError, Result};
use crate::report::{PredictionResult, Report, check_stale, parse_report};
use crate::tool::{ProcessRunner, ReportStyle, ToolRunner, WekaCommand, resolve_classifier};

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// Per-request training choices.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Classifier class or alias; the configured one when `None`.
    pub classifier: Option<String>,
    /// Extra tool options appended after the mode flags.
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainOutcome {
    pub model: PathBuf,
    pub classifier: String,
    pub attributes: usize,
    /// Tool stdout (training summary).
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Trained(TrainOutcome),
    Predicted(PredictionResult),
}

// ---------------------------------------------------------------------------
// Bridge – the train and predict flows
// ---------------------------------------------------------------------------

/// Composes inference, persistence, rendering, the tool and report parsing.
///
/// Each call is an independent unit of work. The only state shared between
/// calls is the schema artifact behind `store`.
pub struct Bridge<S = FsSchemaStore, R = ProcessRunner> {
    config: BridgeConfig,
    command: WekaCommand,
    inferencer: SchemaInferencer,
    store: S,
    runner: R,
}

impl Bridge<FsSchemaStore, ProcessRunner> {
    /// File-backed store and real process runner, as configured.
    pub fn from_config(config: BridgeConfig) -> Result<Self> {
        let store = FsSchemaStore::new(&config.schema_path);
        let runner = ProcessRunner::new(config.error_markers.clone());
        Bridge::new(config, store, runner)
    }
}

impl<S: SchemaStore, R: ToolRunner> Bridge<S, R> {
    pub fn new(config: BridgeConfig, store: S, runner: R) -> Result<Self> {
        let command = config.command()?;
        let inferencer = SchemaInferencer::new(&config.relation, &config.class_attribute)
            .with_string_attributes(config.string_attributes.iter().cloned());
        Ok(Bridge {
            config,
            command,
            inferencer,
            store,
            runner,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Entry point for an outer request layer: a local file and a flag.
    pub fn handle(&self, input: &Path, is_train: bool) -> Result<Outcome> {
        if is_train {
            self.train(input, &TrainOptions::default()).map(Outcome::Trained)
        } else {
            self.predict(input).map(Outcome::Predicted)
        }
    }

    // -- train --

    /// Train from a file. Attribute-relation documents are used as they are;
    /// anything else is loaded as a table first.
    pub fn train(&self, input: &Path, options: &TrainOptions) -> Result<TrainOutcome> {
        if extension(input) == "arff" {
            return self.train_document(input, options);
        }
        let table = load_table(input, self.config.max_input_bytes)?;
        self.train_table(&table, options)
    }

    pub fn train_table(&self, table: &Table, options: &TrainOptions) -> Result<TrainOutcome> {
        let schema = self.inferencer.infer(table)?;
        let document = self.temp_document(&schema, &table.rows, Mode::Train)?;
        self.run_training(document.path(), schema, options)
    }

    fn train_document(&self, input: &Path, options: &TrainOptions) -> Result<TrainOutcome> {
        let size = std::fs::metadata(input)?.len();
        if size > self.config.max_input_bytes {
            return Err(BridgeError::InputTooLarge {
                path: input.to_path_buf(),
                size,
                limit: self.config.max_input_bytes,
            });
        }
        let text = std::fs::read_to_string(input)?;
        let schema = Schema::parse_header(&text, Some(&self.config.class_attribute))?;
        self.run_training(input, schema, options)
    }

    /// Run the tool, then publish the model and the schema. Nothing is
    /// published if the run fails.
    fn run_training(
        &self,
        document: &Path,
        schema: Schema,
        options: &TrainOptions,
    ) -> Result<TrainOutcome> {
        let requested = options.classifier.as_deref().unwrap_or(&self.config.classifier);
        let classifier = resolve_classifier(requested);
        let model_dir = parent_dir(&self.config.model_path);
        std::fs::create_dir_all(model_dir)?;
        let staged = tempfile::Builder::new()
            .prefix(".model-")
            .suffix(".tmp")
            .tempfile_in(model_dir)?
            .into_temp_path();

        let invocation = self.command.train(
            &classifier,
            document,
            &staged,
            schema.class_index(),
            &options.extra,
        );
        let output = self.runner.run(&invocation)?;

        staged
            .persist(&self.config.model_path)
            .map_err(|e| BridgeError::Io(e.error))?;
        let attributes = schema.attributes().len();
        self.store.save(&PersistedSchema::new(schema, classifier.clone()))?;
        info!("Trained {classifier} → {}", self.config.model_path.display());

        Ok(TrainOutcome {
            model: self.config.model_path.clone(),
            classifier,
            attributes,
            report: output.stdout,
        })
    }

    // -- predict --

    /// Predict the first row of `input`.
    pub fn predict(&self, input: &Path) -> Result<PredictionResult> {
        let table = load_table(input, self.config.max_input_bytes)?;
        self.predict_table(&table)
    }

    pub fn predict_table(&self, table: &Table) -> Result<PredictionResult> {
        let report = self.run_prediction(table, ReportStyle::PerInstance)?;
        report
            .into_predictions()
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::parse("report carried no prediction", ""))
    }

    /// Predict every row of `input`.
    pub fn predict_batch(&self, input: &Path) -> Result<Vec<PredictionResult>> {
        let table = load_table(input, self.config.max_input_bytes)?;
        self.predict_batch_table(&table)
    }

    pub fn predict_batch_table(&self, table: &Table) -> Result<Vec<PredictionResult>> {
        let report = self.run_prediction(table, ReportStyle::Csv)?;
        if let Report::SingleInstance(_) = report {
            warn!("Batch run produced a per-instance report");
        }
        Ok(report.into_predictions())
    }

    fn run_prediction(&self, table: &Table, style: ReportStyle) -> Result<Report> {
        if table.is_empty() {
            return Err(BridgeError::EmptyTable);
        }
        let persisted = self.store.load()?;
        let schema = &persisted.schema;
        let document = self.temp_document(schema, &table.rows, Mode::Predict)?;

        let classifier = persisted.classifier.as_deref().unwrap_or(&self.config.classifier);
        let invocation = self.command.predict(
            classifier,
            &self.config.model_path,
            document.path(),
            schema.class_index(),
            style,
        );
        let output = match self.runner.run(&invocation) {
            Ok(output) => output,
            Err(BridgeError::Process {
                argv,
                exit_code,
                stdout,
                stderr,
            }) => {
                check_stale(&stderr)?;
                check_stale(&stdout)?;
                return Err(BridgeError::Process {
                    argv,
                    exit_code,
                    stdout,
                    stderr,
                });
            }
            Err(e) => return Err(e),
        };
        parse_report(&output.stdout, schema.class_attribute().values())
    }

    // -- model info --

    /// Evaluate the model against a header-only document and return whatever
    /// the tool printed. A failing run still yields its output.
    pub fn model_info(&self) -> Result<String> {
        let persisted = self.store.load()?;
        let schema = &persisted.schema;
        let document = self.temp_document(schema, &[], Mode::Predict)?;
        let classifier = persisted.classifier.as_deref().unwrap_or(&self.config.classifier);
        let invocation = self.command.model_info(
            classifier,
            &self.config.model_path,
            document.path(),
            schema.class_index(),
        );

        let (stdout, stderr) = match self.runner.run(&invocation) {
            Ok(out) => (out.stdout, out.stderr),
            Err(BridgeError::Process { stdout, stderr, .. }) => (stdout, stderr),
            Err(e) => return Err(e),
        };
        let text: Vec<&str> = [stdout.trim(), stderr.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        Ok(text.join("\n\n---\n\n"))
    }

    /// Render a document into a temp file owned by the caller; the file is
    /// removed when the handle drops, whichever way the request ends.
    fn temp_document(&self, schema: &Schema, rows: &[Row], mode: Mode) -> Result<NamedTempFile> {
        std::fs::create_dir_all(&self.config.work_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("doc-")
            .suffix(".arff")
            .tempfile_in(&self.config.work_dir)?;
        {
            let mut out = BufWriter::new(&mut file);
            write_document(&mut out, schema, rows, mode)?;
            out.flush()?;
        }
        Ok(file)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
