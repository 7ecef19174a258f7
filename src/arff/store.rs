//! Persisted training schema.
//!
//! The artifact is the header section of the training document, preceded by
//! `%` comment lines naming the class attribute and the classifier. It is
//! replaced by writing a sibling temp file and renaming it over the old one,
//! so a concurrent reader sees either the previous or the new header.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::info;

use super::schema::Schema;
use crate::data::normalize::{escape, split_fields};
use crate::error::{BridgeError, Result};

const CLASS_KEY: &str = "class-attribute";
const CLASSIFIER_KEY: &str = "classifier";

/// The schema of the most recent successful training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSchema {
    pub schema: Schema,
    /// Classifier class the model was trained with.
    pub classifier: Option<String>,
}

impl PersistedSchema {
    pub fn new(schema: Schema, classifier: impl Into<String>) -> Self {
        PersistedSchema {
            schema,
            classifier: Some(classifier.into()),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "% {CLASS_KEY}: {}\n",
            escape(&self.schema.class_attribute().name)
        );
        if let Some(classifier) = &self.classifier {
            out.push_str(&format!("% {CLASSIFIER_KEY}: {classifier}\n"));
        }
        out.push_str(&self.schema.header());
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut class_attribute = None;
        let mut classifier = None;
        for line in text.lines() {
            let Some(comment) = line.trim().strip_prefix('%') else {
                continue;
            };
            match comment.split_once(':') {
                Some((key, value)) if key.trim() == CLASS_KEY => {
                    class_attribute = split_fields(value.trim()).into_iter().next();
                }
                Some((key, value)) if key.trim() == CLASSIFIER_KEY => {
                    classifier = Some(value.trim().to_string());
                }
                _ => {}
            }
        }
        let schema = Schema::parse_header(text, class_attribute.as_deref())?;
        Ok(PersistedSchema { schema, classifier })
    }
}

/// Load/save contract for the persisted schema.
pub trait SchemaStore: Send + Sync {
    /// Fails with [`BridgeError::SchemaNotFound`] when nothing was saved yet.
    fn load(&self) -> Result<PersistedSchema>;
    /// Atomically replace the stored schema.
    fn save(&self, persisted: &PersistedSchema) -> Result<()>;
}

/// Schema artifact kept in a single file.
#[derive(Debug, Clone)]
pub struct FsSchemaStore {
    path: PathBuf,
}

impl FsSchemaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FsSchemaStore { path: path.into() }
    }

    fn parent(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl SchemaStore for FsSchemaStore {
    fn load(&self) -> Result<PersistedSchema> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BridgeError::SchemaNotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        PersistedSchema::parse(&text)
    }

    fn save(&self, persisted: &PersistedSchema) -> Result<()> {
        let dir = self.parent();
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".schema-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(persisted.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BridgeError::Io(e.error))?;

        info!(
            "Replaced schema artifact {} ({} attribute(s))",
            self.path.display(),
            persisted.schema.attributes().len()
        );
        Ok(())
    }
}
