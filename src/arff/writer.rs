use std::collections::HashSet;
use std::io::Write;

use log::{debug, warn};

use super::schema::{AttributeKind, Schema};
use crate::data::model::Row;
use crate::data::normalize::{MISSING, escape, normalize};
use crate::error::{BridgeError, Result};

/// What the document is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Class values are required and written out.
    Train,
    /// Class values are replaced by `?`; unseen nominal values become `?`.
    Predict,
}

/// Render the full document into a byte buffer.
pub fn render_document(schema: &Schema, rows: &[Row], mode: Mode) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_document(&mut out, schema, rows, mode)?;
    Ok(out)
}

/// Write header, data marker and one line per row.
///
/// Fields are written in attribute declaration order. Nothing is written for
/// a row until the whole row has been validated.
pub fn write_document<W: Write>(
    out: &mut W,
    schema: &Schema,
    rows: &[Row],
    mode: Mode,
) -> Result<()> {
    out.write_all(schema.header().as_bytes())?;
    out.write_all(b"\n@DATA\n")?;

    let domains: Vec<Option<HashSet<&str>>> = schema
        .attributes()
        .iter()
        .map(|attr| match &attr.kind {
            AttributeKind::Nominal(values) => Some(values.iter().map(String::as_str).collect()),
            AttributeKind::String => None,
        })
        .collect();

    let mut unseen = 0usize;
    let mut fields = Vec::with_capacity(schema.attributes().len());
    for (row_no, row) in rows.iter().enumerate() {
        fields.clear();
        for (attr, domain) in schema.attributes().iter().zip(&domains) {
            if attr.is_class && mode == Mode::Predict {
                fields.push(MISSING.to_string());
                continue;
            }
            let token = normalize(row.get(&attr.name));
            let field = match (token, domain) {
                (None, _) if attr.is_class => {
                    return Err(BridgeError::ClassValueMissing {
                        column: attr.name.clone(),
                        row: row_no,
                    });
                }
                (None, _) => MISSING.to_string(),
                (Some(token), Some(domain)) if !domain.contains(token.as_str()) => match mode {
                    Mode::Predict => {
                        debug!("Row {row_no}: '{token}' unseen for '{}', writing ?", attr.name);
                        unseen += 1;
                        MISSING.to_string()
                    }
                    Mode::Train => {
                        return Err(BridgeError::UnknownNominal {
                            attribute: attr.name.clone(),
                            value: token,
                            row: row_no,
                        });
                    }
                },
                (Some(token), _) => escape(&token),
            };
            fields.push(field);
        }
        writeln!(out, "{}", fields.join(","))?;
    }

    if unseen > 0 {
        warn!("{unseen} nominal value(s) not seen during training were written as missing");
    }
    Ok(())
}
