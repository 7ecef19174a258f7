use std::collections::{BTreeSet, HashSet};

use log::{info, warn};

use super::schema::{Attribute, Schema};
use crate::data::model::Table;
use crate::data::normalize::normalize;
use crate::error::{BridgeError, Result};

/// Derives a schema from a training table.
#[derive(Debug, Clone)]
pub struct SchemaInferencer {
    pub relation: String,
    pub class_attribute: String,
    /// Columns declared STRING instead of enumerating their values.
    pub string_attributes: HashSet<String>,
}

impl SchemaInferencer {
    pub fn new(relation: impl Into<String>, class_attribute: impl Into<String>) -> Self {
        SchemaInferencer {
            relation: relation.into(),
            class_attribute: class_attribute.into(),
            string_attributes: HashSet::new(),
        }
    }

    pub fn with_string_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_attributes
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Build the schema for `table`.
    ///
    /// Columns keep source order except the class column, which goes last.
    /// Nominal domains are the sorted, de-duplicated normalized values; missing
    /// cells do not contribute.
    pub fn infer(&self, table: &Table) -> Result<Schema> {
        if table.is_empty() {
            return Err(BridgeError::EmptyTable);
        }
        if let Some(row) = table
            .rows
            .iter()
            .position(|r| !r.contains(&self.class_attribute))
        {
            return Err(BridgeError::MissingClassColumn {
                column: self.class_attribute.clone(),
                row,
            });
        }

        let columns = table
            .column_names
            .iter()
            .filter(|c| **c != self.class_attribute)
            .chain(std::iter::once(&self.class_attribute));

        let mut attributes = Vec::with_capacity(table.column_names.len());
        for column in columns {
            let is_class = *column == self.class_attribute;
            let attr = if self.string_attributes.contains(column) && !is_class {
                Attribute::string(column.clone())
            } else {
                let values: BTreeSet<String> = table
                    .rows
                    .iter()
                    .filter_map(|row| normalize(row.get(column)))
                    .collect();
                if values.is_empty() && !is_class {
                    warn!("Column '{column}' has no values; declaring it STRING");
                    Attribute::string(column.clone())
                } else {
                    Attribute::nominal(column.clone(), values.into_iter().collect())
                }
            };
            attributes.push(if is_class { attr.into_class() } else { attr });
        }

        let schema = Schema::new(self.relation.clone(), attributes)?;
        info!(
            "Inferred {} attribute(s) from {} row(s); class '{}' has {} value(s)",
            schema.attributes().len(),
            table.len(),
            self.class_attribute,
            schema.class_attribute().values().len()
        );
        Ok(schema)
    }
}
