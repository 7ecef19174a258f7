//! Command lines for the Weka classifier runner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::invoker::Invocation;
use crate::error::{BridgeError, Result};

/// Prediction output class requested for batch runs.
const CSV_OUTPUT: &str = "weka.classifiers.evaluation.output.prediction.CSV -distribution";

/// Expand short classifier names to their fully qualified class.
pub fn resolve_classifier(name: &str) -> String {
    match name {
        "J48" => "weka.classifiers.trees.J48".to_string(),
        "NaiveBayes" => "weka.classifiers.bayes.NaiveBayes".to_string(),
        other => other.to_string(),
    }
}

/// How predictions should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// One line per instance with a bracketed distribution.
    PerInstance,
    /// Comma-separated table with a header line.
    Csv,
}

/// Builds [`Invocation`]s for the JVM-hosted tool.
#[derive(Debug, Clone)]
pub struct WekaCommand {
    java: PathBuf,
    classpath: String,
    heap: Option<String>,
    timeout: Option<Duration>,
}

impl WekaCommand {
    /// `classpath` archives are joined with the platform path separator.
    pub fn new(java: impl Into<PathBuf>, classpath: &[PathBuf]) -> Result<Self> {
        if classpath.is_empty() {
            return Err(BridgeError::InvalidConfig {
                reason: "classpath is empty".to_string(),
            });
        }
        let joined = std::env::join_paths(classpath).map_err(|e| BridgeError::InvalidConfig {
            reason: format!("classpath: {e}"),
        })?;
        Ok(WekaCommand {
            java: java.into(),
            classpath: joined.to_string_lossy().into_owned(),
            heap: None,
            timeout: None,
        })
    }

    /// Maximum JVM heap, e.g. `1G`.
    pub fn with_heap(mut self, heap: Option<String>) -> Self {
        self.heap = heap;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn invocation(&self, classifier: &str, tail: Vec<String>) -> Invocation {
        let mut args = Vec::with_capacity(tail.len() + 4);
        if let Some(heap) = &self.heap {
            args.push(format!("-Xmx{heap}"));
        }
        args.push("-cp".to_string());
        args.push(self.classpath.clone());
        args.push(resolve_classifier(classifier));
        args.extend(tail);
        Invocation {
            program: self.java.clone(),
            args,
            cwd: None,
            timeout: self.timeout,
        }
    }

    /// Train on `document` and write the model to `model_out`.
    ///
    /// `class_index` is zero-based; the tool counts from one. `extra` options
    /// go last so nested classifier options after `--` stay intact.
    pub fn train(
        &self,
        classifier: &str,
        document: &Path,
        model_out: &Path,
        class_index: usize,
        extra: &[String],
    ) -> Invocation {
        let mut tail = vec![
            "-t".to_string(),
            path_arg(document),
            "-d".to_string(),
            path_arg(model_out),
            "-c".to_string(),
            (class_index + 1).to_string(),
        ];
        tail.extend(extra.iter().cloned());
        self.invocation(classifier, tail)
    }

    /// Load `model` and predict every instance of `document`.
    pub fn predict(
        &self,
        classifier: &str,
        model: &Path,
        document: &Path,
        class_index: usize,
        style: ReportStyle,
    ) -> Invocation {
        let mut tail = self.test_args(model, document, class_index);
        match style {
            ReportStyle::PerInstance => {
                tail.extend(["-p".to_string(), "0".to_string(), "-distribution".to_string()]);
            }
            ReportStyle::Csv => {
                tail.extend(["-classifications".to_string(), CSV_OUTPUT.to_string()]);
            }
        }
        self.invocation(classifier, tail)
    }

    /// Load `model` and evaluate it against a header-only document.
    pub fn model_info(
        &self,
        classifier: &str,
        model: &Path,
        document: &Path,
        class_index: usize,
    ) -> Invocation {
        let tail = self.test_args(model, document, class_index);
        self.invocation(classifier, tail)
    }

    fn test_args(&self, model: &Path, document: &Path, class_index: usize) -> Vec<String> {
        vec![
            "-l".to_string(),
            path_arg(model),
            "-T".to_string(),
            path_arg(document),
            "-c".to_string(),
            (class_index + 1).to_string(),
        ]
    }
}

/// Forward slashes on every platform; the JVM accepts them on Windows too.
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
