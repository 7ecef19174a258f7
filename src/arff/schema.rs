use std::collections::HashSet;
use std::fmt::Write as _;

use crate::data::normalize::{escape, split_fields};
use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Attribute – one declared column
// ---------------------------------------------------------------------------

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Closed set of legal values, in declaration order.
    Nominal(Vec<String>),
    /// Free text.
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub is_class: bool,
}

impl Attribute {
    pub fn nominal(name: impl Into<String>, values: Vec<String>) -> Self {
        Attribute {
            name: name.into(),
            kind: AttributeKind::Nominal(values),
            is_class: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            kind: AttributeKind::String,
            is_class: false,
        }
    }

    pub fn into_class(mut self) -> Self {
        self.is_class = true;
        self
    }

    /// Declared values for a nominal attribute, empty for string attributes.
    pub fn values(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Nominal(values) => values,
            AttributeKind::String => &[],
        }
    }

    fn declaration(&self) -> String {
        let kind = match &self.kind {
            AttributeKind::Nominal(values) => {
                let joined: Vec<String> = values.iter().map(|v| escape(v)).collect();
                format!("{{{}}}", joined.join(","))
            }
            AttributeKind::String => "STRING".to_string(),
        };
        format!("@ATTRIBUTE {} {kind}", escape(&self.name))
    }
}

// ---------------------------------------------------------------------------
// Schema – ordered attribute list
// ---------------------------------------------------------------------------

/// Ordered, immutable attribute list. Position in the list is the column
/// position in every data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    relation: String,
    attributes: Vec<Attribute>,
    class_index: usize,
}

impl Schema {
    /// Build a schema. Names must be unique and exactly one attribute must be
    /// the class attribute.
    pub fn new(relation: impl Into<String>, attributes: Vec<Attribute>) -> Result<Self> {
        let mut seen = HashSet::new();
        for attr in &attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(BridgeError::DuplicateAttribute {
                    name: attr.name.clone(),
                });
            }
        }

        let classes: Vec<usize> = attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_class)
            .map(|(i, _)| i)
            .collect();
        let class_index = match classes.as_slice() {
            [index] => *index,
            [] => {
                return Err(BridgeError::InvalidSchema {
                    reason: "no class attribute".to_string(),
                });
            }
            _ => {
                return Err(BridgeError::InvalidSchema {
                    reason: format!("{} class attributes declared", classes.len()),
                });
            }
        };

        Ok(Schema {
            relation: relation.into(),
            attributes,
            class_index,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Zero-based position of the class attribute.
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    /// Render the header section: relation and attribute declarations, no
    /// data marker.
    pub fn header(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "@RELATION {}", escape(&self.relation));
        out.push('\n');
        for attr in &self.attributes {
            let _ = writeln!(out, "{}", attr.declaration());
        }
        out
    }

    /// Parse a header section back into a schema.
    ///
    /// Parsing stops at the data marker. `%` comment lines are skipped. The
    /// class attribute is `class_attribute` if declared, otherwise the last
    /// attribute.
    pub fn parse_header(text: &str, class_attribute: Option<&str>) -> Result<Self> {
        let mut relation = String::new();
        let mut attributes = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((k, r)) => (k, r.trim()),
                None => (line, ""),
            };
            match keyword.to_ascii_lowercase().as_str() {
                "@relation" => relation = read_name(rest, line_no)?.0,
                "@attribute" => attributes.push(parse_attribute(rest, line_no)?),
                "@data" => break,
                _ => {
                    return Err(BridgeError::MalformedSchema {
                        line: line_no,
                        reason: format!("unexpected line '{line}'"),
                    });
                }
            }
        }

        let class_index = class_attribute
            .and_then(|name| attributes.iter().position(|a| a.name == name))
            .or_else(|| attributes.len().checked_sub(1))
            .ok_or_else(|| BridgeError::MalformedSchema {
                line: 0,
                reason: "no attributes declared".to_string(),
            })?;
        attributes[class_index].is_class = true;

        Schema::new(relation, attributes)
    }
}

/// Read a possibly quoted name token; returns the name and the remaining text.
fn read_name(text: &str, line: usize) -> Result<(String, &str)> {
    if text.starts_with('\'') {
        let mut escaped = false;
        for (i, c) in text.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '\'' => {
                    let name = split_fields(&text[..=i]).remove(0);
                    return Ok((name, text[i + 1..].trim()));
                }
                _ => {}
            }
        }
        return Err(BridgeError::MalformedSchema {
            line,
            reason: "unterminated quoted name".to_string(),
        });
    }
    match text.split_once(char::is_whitespace) {
        Some((name, rest)) => Ok((name.to_string(), rest.trim())),
        None if !text.is_empty() => Ok((text.to_string(), "")),
        None => Err(BridgeError::MalformedSchema {
            line,
            reason: "missing name".to_string(),
        }),
    }
}

fn parse_attribute(text: &str, line: usize) -> Result<Attribute> {
    let (name, kind) = read_name(text, line)?;
    if let Some(inner) = kind.strip_prefix('{').and_then(|k| k.strip_suffix('}')) {
        let values = if inner.trim().is_empty() {
            Vec::new()
        } else {
            split_fields(inner)
        };
        return Ok(Attribute::nominal(name, values));
    }
    if kind.eq_ignore_ascii_case("string") {
        return Ok(Attribute::string(name));
    }
    Err(BridgeError::MalformedSchema {
        line,
        reason: format!("unsupported type '{kind}' for attribute '{name}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn phone_schema() -> Schema {
        Schema::new(
            "smartphone",
            vec![
                Attribute::nominal("Age", vec!["18-24".into(), "25-34".into()]),
                Attribute::string("Comment"),
                Attribute::nominal("City", vec!["Bangkok Metro".into(), "Chiang Mai".into()]),
                Attribute::nominal("Current_brand", vec!["Apple".into(), "Samsung".into()])
                    .into_class(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn header_renders_declarations_in_order() {
        let expected = "@RELATION smartphone\n\
                        \n\
                        @ATTRIBUTE Age {18-24,25-34}\n\
                        @ATTRIBUTE Comment STRING\n\
                        @ATTRIBUTE City {'Bangkok Metro','Chiang Mai'}\n\
                        @ATTRIBUTE Current_brand {Apple,Samsung}\n";
        assert_eq!(phone_schema().header(), expected);
    }

    #[test]
    fn parsed_header_reproduces_schema() {
        let schema = phone_schema();
        let parsed = Schema::parse_header(&schema.header(), None).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(parsed.class_index(), 3);
    }

    #[test]
    fn parse_honours_named_class_and_stops_at_data() {
        let text = "% produced elsewhere\n\
                    @relation 'phone survey'\n\
                    @attribute Current_brand {Apple,Samsung}\n\
                    @attribute 'Home city' {x,y}\n\
                    @data\n\
                    Apple,x\n";
        let schema = Schema::parse_header(text, Some("Current_brand")).unwrap();
        assert_eq!(schema.relation(), "phone survey");
        assert_eq!(schema.class_attribute().name, "Current_brand");
        assert_eq!(schema.attributes()[1].name, "Home city");
    }

    #[test]
    fn rejects_numeric_and_duplicates() {
        let numeric = "@RELATION r\n@ATTRIBUTE Income NUMERIC\n";
        assert!(matches!(
            Schema::parse_header(numeric, None),
            Err(BridgeError::MalformedSchema { line: 2, .. })
        ));

        let dup = Schema::new(
            "r",
            vec![Attribute::string("a"), Attribute::string("a").into_class()],
        );
        assert!(matches!(dup, Err(BridgeError::DuplicateAttribute { .. })));
    }

    #[test]
    fn requires_exactly_one_class() {
        let none = Schema::new("r", vec![Attribute::string("a")]);
        assert!(matches!(none, Err(BridgeError::InvalidSchema { .. })));
        assert!(Schema::parse_header("@RELATION r\n", None).is_err());
    }
}
