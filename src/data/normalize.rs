//! Per-field normalization and quoting for the attribute-relation format.

use unicode_normalization::UnicodeNormalization;

/// Token written for absent values and for the class value to be predicted.
pub const MISSING: &str = "?";

/// Normalize a raw cell into its semantic token.
///
/// Returns `None` when the cell counts as missing: absent, blank, made only of
/// commas, or the literal missing token itself.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let composed: String = raw.trim().nfc().collect();
    // Commas are field separators in the data section.
    let without_commas: String = composed.chars().filter(|c| *c != ',').collect();
    let token = collapse_whitespace(&without_commas);
    if token.is_empty() || token == MISSING {
        None
    } else {
        Some(token)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn needs_quoting(token: &str) -> bool {
    token
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | '{' | '}' | '\'' | '"' | '\\' | '%'))
}

/// Quote a semantic token if the document tokenizer would otherwise split it.
pub fn escape(token: &str) -> String {
    if !needs_quoting(token) {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('\'');
    for c in token.chars() {
        if matches!(c, '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Normalize and escape a raw cell in one step; missing cells become `?`.
pub fn field(raw: Option<&str>) -> String {
    match normalize(raw) {
        Some(token) => escape(&token),
        None => MISSING.to_string(),
    }
}

/// Split a comma-joined line back into semantic tokens.
///
/// Quoted tokens are unquoted and unescaped; unquoted tokens are trimmed.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '\'' => in_quotes = false,
                other => current.push(other),
            }
            continue;
        }
        match c {
            '\'' if current.trim().is_empty() => {
                current.clear();
                quoted = true;
                in_quotes = true;
            }
            ',' => {
                fields.push(finish_field(&mut current, quoted));
                quoted = false;
            }
            other => current.push(other),
        }
    }
    fields.push(finish_field(&mut current, quoted));
    fields
}

fn finish_field(current: &mut String, quoted: bool) -> String {
    let token = std::mem::take(current);
    if quoted {
        token
    } else {
        token.trim().to_string()
    }
}
