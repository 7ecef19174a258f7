use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Row – one record of the input table
// ---------------------------------------------------------------------------

/// A single input record: column name → raw cell text.
///
/// A column may be absent from a row entirely (JSON records with missing keys,
/// null Parquet cells). Absent and empty cells are both "missing" downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Raw value for `column`, if the row has one.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded input
// ---------------------------------------------------------------------------

/// Parsed input records plus the column order of the source header.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in source order (first-seen order for record formats).
    pub column_names: Vec<String>,
    /// All rows.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(column_names: Vec<String>, rows: Vec<Row>) -> Self {
        Table { column_names, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keeps_source_column_order() {
        let rows = vec![
            Row::from_iter([("Zone", "north"), ("Age", "30")]),
            Row::from_iter([("Zone", "south")]),
        ];
        let table = Table::new(vec!["Zone".to_string(), "Age".to_string()], rows);
        assert_eq!(table.column_names, vec!["Zone", "Age"]);
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn missing_column_reads_as_none() {
        let row = Row::from_iter([("Age", "30")]);
        assert_eq!(row.get("Age"), Some("30"));
        assert_eq!(row.get("Brand"), None);
        assert!(!row.contains("Brand"));
    }
}
