use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::tool::WekaCommand;

// ---------------------------------------------------------------------------
// BridgeConfig – everything the core needs from its environment
// ---------------------------------------------------------------------------

/// Settings handed to the [`Bridge`](crate::pipeline::Bridge).
///
/// Read from an optional JSON file, then overridden by environment
/// variables. Core components receive values from here and never read the
/// environment themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Runtime binary that hosts the tool.
    pub java: PathBuf,
    pub weka_jar: PathBuf,
    /// Further archives appended to the classpath.
    pub extra_classpath: Vec<PathBuf>,
    /// Maximum JVM heap, e.g. `1G`.
    pub heap: Option<String>,
    /// Classifier used when training does not name one.
    pub classifier: String,
    pub class_attribute: String,
    /// Columns declared STRING rather than nominal.
    pub string_attributes: Vec<String>,
    pub relation: String,
    /// Directory for per-request documents.
    pub work_dir: PathBuf,
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    /// Zero disables the limit.
    pub timeout_secs: u64,
    pub max_input_bytes: u64,
    /// Substrings of stderr that mark a failed run.
    pub error_markers: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            java: PathBuf::from("java"),
            weka_jar: PathBuf::from("model/weka.jar"),
            extra_classpath: vec![PathBuf::from("model/mtj-1.0.4.jar")],
            heap: Some("1G".to_string()),
            classifier: "weka.classifiers.trees.J48".to_string(),
            class_attribute: "Current_brand".to_string(),
            string_attributes: Vec::new(),
            relation: "smartphone".to_string(),
            work_dir: PathBuf::from("uploads"),
            model_path: PathBuf::from("model/brand.model"),
            schema_path: PathBuf::from("model/header.arff"),
            timeout_secs: 300,
            max_input_bytes: 5_000_000,
            error_markers: vec!["Exception".to_string(), "Error:".to_string()],
        }
    }
}

impl BridgeConfig {
    /// Load `path` (if given) and apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply `WEKA_*` / `MTJ_JAR` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WEKA_JAVA") {
            self.java = v.into();
        }
        if let Some(v) = lookup("WEKA_JAR") {
            self.weka_jar = v.into();
        }
        if let Some(v) = lookup("MTJ_JAR") {
            self.extra_classpath = vec![v.into()];
        }
        if let Some(v) = lookup("WEKA_MODEL") {
            self.model_path = v.into();
        }
        if let Some(v) = lookup("WEKA_SCHEMA") {
            self.schema_path = v.into();
        }
        if let Some(v) = lookup("WEKA_WORK_DIR") {
            self.work_dir = v.into();
        }
        if let Some(v) = lookup("WEKA_CLASS_ATTR") {
            self.class_attribute = v;
        }
        if let Some(v) = lookup("WEKA_TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("WEKA_TIMEOUT_SECS is not a number: '{v}'"))?;
        }
        Ok(())
    }

    pub fn classpath(&self) -> Vec<PathBuf> {
        std::iter::once(self.weka_jar.clone())
            .chain(self.extra_classpath.iter().cloned())
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Command builder for the configured runtime and archives.
    pub fn command(&self) -> crate::error::Result<WekaCommand> {
        Ok(WekaCommand::new(&self.java, &self.classpath())?
            .with_heap(self.heap.clone())
            .with_timeout(self.timeout()))
    }
}
