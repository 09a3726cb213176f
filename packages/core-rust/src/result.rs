//! Closed result type with one variant per statement mode.
//!
//! The backing store returns different shapes per statement kind (row set,
//! affected count, insert id). Rather than a dynamically-typed value, each
//! mode maps to exactly one variant, so callers pattern-match instead of
//! probing.

use serde::{Deserialize, Serialize};

/// One result row: column name to value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Result of a completed operation, shaped by its statement mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    /// SELECT: every matched row, in result-set order.
    Rows(Vec<Row>),
    /// Single-row SELECT: the first matched row, or `None`.
    Row(Option<Row>),
    /// INSERT: affected row count plus the generated insert id.
    Insert { affected_rows: u64, insert_id: u64 },
    /// UPDATE/DELETE: affected row count.
    Change { affected_rows: u64 },
    /// Statement executed; nothing further to report.
    Generic,
    /// One scalar value, e.g. the server version probe.
    Scalar(serde_json::Value),
}

impl QueryResult {
    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Rows(_) => "rows",
            QueryResult::Row(_) => "row",
            QueryResult::Insert { .. } => "insert",
            QueryResult::Change { .. } => "change",
            QueryResult::Generic => "generic",
            QueryResult::Scalar(_) => "scalar",
        }
    }

    /// The row set, if this is a [`QueryResult::Rows`].
    #[must_use]
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// The optional single row, if this is a [`QueryResult::Row`].
    #[must_use]
    pub fn into_row(self) -> Option<Option<Row>> {
        match self {
            QueryResult::Row(row) => Some(row),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(key: &str, value: serde_json::Value) -> Row {
        let mut row = Row::new();
        row.insert(key.to_string(), value);
        row
    }

    #[test]
    fn kind_labels_every_variant() {
        assert_eq!(QueryResult::Rows(Vec::new()).kind(), "rows");
        assert_eq!(QueryResult::Row(None).kind(), "row");
        assert_eq!(
            QueryResult::Insert {
                affected_rows: 1,
                insert_id: 42
            }
            .kind(),
            "insert"
        );
        assert_eq!(QueryResult::Change { affected_rows: 2 }.kind(), "change");
        assert_eq!(QueryResult::Generic.kind(), "generic");
        assert_eq!(QueryResult::Scalar(json!("8.0.32")).kind(), "scalar");
    }

    #[test]
    fn into_rows_only_matches_rows() {
        let rows = vec![row("v", json!(1))];
        assert_eq!(
            QueryResult::Rows(rows.clone()).into_rows(),
            Some(rows.clone())
        );
        assert_eq!(QueryResult::Generic.into_rows(), None);
        assert_eq!(
            QueryResult::Row(Some(rows[0].clone())).into_row(),
            Some(Some(rows[0].clone()))
        );
    }
}
