// 🔎 Query Runner
// Read-only SQL against the table store, plus the named analytical queries

use crate::error::{EtlError, Result};
use crate::load::validate_table_name;
use crate::transform::Currency;
use prettytable::{Cell, Row, Table};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

// ============================================================================
// RESULT SET
// ============================================================================

/// QueryResult - column names plus rows of JSON-typed cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// First column of the first row as a number (aggregates)
    pub fn scalar_f64(&self) -> Option<f64> {
        self.rows.first()?.first()?.as_f64()
    }

    /// Every value of a text column, in row order
    pub fn text_column(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.columns.iter().position(|c| c == column) else {
            return Vec::new();
        };

        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as a boxed text table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(Row::new(self.columns.iter().map(|c| Cell::new(c)).collect()));

        for row in &self.rows {
            table.add_row(Row::new(
                row.iter().map(|v| Cell::new(&display_value(v))).collect(),
            ));
        }
        table
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// RUNNING SQL
// ============================================================================

/// Execute one read-only statement and collect its result set
///
/// Anything SQLite would not report as read-only (INSERT, DROP, ...) is
/// rejected before it runs.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let leading = sql.trim_start().to_uppercase();
    if !(leading.starts_with("SELECT") || leading.starts_with("WITH")) {
        return Err(EtlError::Query(format!(
            "only SELECT statements are allowed: {}",
            sql.trim()
        )));
    }

    if has_trailing_statement(sql) {
        return Err(EtlError::Query(format!(
            "expected a single statement: {}",
            sql.trim()
        )));
    }

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| EtlError::Query(format!("{}: {}", e, sql.trim())))?;

    if !stmt.readonly() {
        return Err(EtlError::Query(format!(
            "statement is not read-only: {}",
            sql.trim()
        )));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(json_value))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(|e| EtlError::Query(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| EtlError::Query(e.to_string()))?;

    tracing::debug!(sql, rows = rows.len(), "query executed");
    Ok(QueryResult { columns, rows })
}

/// True when anything other than whitespace or `;` follows the first
/// top-level `;` (quoted text and comments are skipped)
fn has_trailing_statement(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b';' => {
                return sql[i..]
                    .chars()
                    .any(|c| !(c.is_whitespace() || c == ';'));
            }
            _ => {}
        }
        i += 1;
    }

    false
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

// ============================================================================
// NAMED QUERIES
// ============================================================================

/// AnalyticalQuery - the fixed report queries, rendered against a table name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticalQuery {
    /// Every row
    FullTable,
    /// Mean market cap in one currency
    AverageMarketCap(Currency),
    /// Names of the k largest banks by USD market cap
    TopNames(usize),
    /// The single largest bank with its USD market cap
    LargestBank,
}

impl AnalyticalQuery {
    /// The queries printed at the end of every run
    pub fn standard_set() -> Vec<AnalyticalQuery> {
        vec![
            AnalyticalQuery::FullTable,
            AnalyticalQuery::AverageMarketCap(Currency::GBP),
            AnalyticalQuery::TopNames(5),
            AnalyticalQuery::LargestBank,
        ]
    }

    pub fn name(&self) -> String {
        match self {
            AnalyticalQuery::FullTable => "full table".to_string(),
            AnalyticalQuery::AverageMarketCap(c) => format!("average market cap in {}", c.code()),
            AnalyticalQuery::TopNames(k) => format!("top {} banks", k),
            AnalyticalQuery::LargestBank => "largest bank".to_string(),
        }
    }

    pub fn sql(&self, table: &str) -> String {
        match self {
            AnalyticalQuery::FullTable => format!("SELECT * FROM {}", table),
            AnalyticalQuery::AverageMarketCap(c) => {
                format!("SELECT AVG({}) FROM {}", c.column(), table)
            }
            AnalyticalQuery::TopNames(k) => format!(
                "SELECT Name FROM {} ORDER BY MC_USD_Billion DESC, rowid LIMIT {}",
                table, k
            ),
            AnalyticalQuery::LargestBank => format!(
                "SELECT Name, MC_USD_Billion FROM {} ORDER BY MC_USD_Billion DESC LIMIT 1",
                table
            ),
        }
    }
}

/// Render a named query for `table` and run it
pub fn run_named(conn: &Connection, table: &str, query: &AnalyticalQuery) -> Result<QueryResult> {
    validate_table_name(table).map_err(|e| EtlError::Query(e.to_string()))?;
    run_query(conn, &query.sql(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::write_table;
    use crate::transform::EnrichedBankRecord;

    fn record(name: &str, usd: f64, gbp: f64) -> EnrichedBankRecord {
        EnrichedBankRecord {
            name: name.to_string(),
            mc_usd_billion: usd,
            mc_gbp_billion: gbp,
            mc_eur_billion: usd * 0.9,
            mc_inr_billion: usd * 80.0,
        }
    }

    fn store_with(records: &[EnrichedBankRecord]) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        write_table(&mut conn, "Largest_banks", records).unwrap();
        conn
    }

    #[test]
    fn test_average_gbp() {
        let conn = store_with(&[
            record("A", 12.5, 10.0),
            record("B", 25.0, 20.0),
            record("C", 37.5, 30.0),
        ]);

        let result = run_named(
            &conn,
            "Largest_banks",
            &AnalyticalQuery::AverageMarketCap(Currency::GBP),
        )
        .unwrap();

        assert_eq!(result.columns, vec!["AVG(MC_GBP_Billion)"]);
        assert_eq!(result.scalar_f64(), Some(20.0));
    }

    #[test]
    fn test_top_five_names() {
        let records: Vec<EnrichedBankRecord> = (0..10)
            .map(|i| record(&format!("Bank {}", i + 1), 500.0 - i as f64 * 25.0, 1.0))
            .collect();
        let conn = store_with(&records);

        let result = run_named(&conn, "Largest_banks", &AnalyticalQuery::TopNames(5)).unwrap();

        assert_eq!(result.row_count(), 5);
        assert_eq!(
            result.text_column("Name"),
            vec!["Bank 1", "Bank 2", "Bank 3", "Bank 4", "Bank 5"]
        );
    }

    #[test]
    fn test_full_table_and_largest() {
        let conn = store_with(&[record("Small", 10.0, 8.0), record("Big", 400.0, 320.0)]);

        let all = run_named(&conn, "Largest_banks", &AnalyticalQuery::FullTable).unwrap();
        assert_eq!(all.columns.len(), 5);
        assert_eq!(all.row_count(), 2);
        assert_eq!(all.text_column("Name"), vec!["Small", "Big"]);

        let largest = run_named(&conn, "Largest_banks", &AnalyticalQuery::LargestBank).unwrap();
        assert_eq!(largest.rows[0][0], Value::from("Big"));
        assert_eq!(largest.rows[0][1].as_f64(), Some(400.0));
    }

    #[test]
    fn test_mutating_sql_rejected() {
        let conn = store_with(&[record("A", 1.0, 1.0)]);

        for sql in [
            "DELETE FROM Largest_banks",
            "DROP TABLE Largest_banks",
            "INSERT INTO Largest_banks VALUES ('x', 1, 1, 1, 1)",
            "WITH t AS (SELECT 1) DELETE FROM Largest_banks",
        ] {
            let err = run_query(&conn, sql).unwrap_err();
            assert!(matches!(err, EtlError::Query(_)), "{} should be rejected", sql);
        }

        let count = run_query(&conn, "SELECT COUNT(*) FROM Largest_banks").unwrap();
        assert_eq!(count.rows[0][0], Value::from(1));
    }

    #[test]
    fn test_trailing_statement_rejected() {
        let conn = store_with(&[record("A", 1.0, 1.0)]);

        let err = run_query(&conn, "SELECT 1; DROP TABLE Largest_banks").unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));

        let err = run_query(&conn, "SELECT Name FROM Largest_banks; SELECT 2").unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));

        // Table still there, untouched
        let count = run_query(&conn, "SELECT COUNT(*) FROM Largest_banks").unwrap();
        assert_eq!(count.rows[0][0], Value::from(1));
    }

    #[test]
    fn test_single_statement_variants_accepted() {
        let conn = store_with(&[record("A;B", 1.0, 1.0)]);

        let result = run_query(&conn, "SELECT Name FROM Largest_banks;  ;\n").unwrap();
        assert_eq!(result.text_column("Name"), vec!["A;B"]);

        let result =
            run_query(&conn, "SELECT Name FROM Largest_banks WHERE Name = 'A;B' -- x; y").unwrap();
        assert_eq!(result.row_count(), 1);

        let result = run_query(&conn, "SELECT /* a; b */ COUNT(*) FROM Largest_banks").unwrap();
        assert_eq!(result.scalar_f64(), Some(1.0));
    }

    #[test]
    fn test_malformed_and_missing_table() {
        let conn = Connection::open_in_memory().unwrap();

        let err = run_query(&conn, "SELECT FROM WHERE").unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));

        let err = run_named(&conn, "Largest_banks", &AnalyticalQuery::FullTable).unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));
    }

    #[test]
    fn test_rendered_table() {
        let conn = store_with(&[record("Bank A", 100.0, 80.0)]);
        let result = run_named(&conn, "Largest_banks", &AnalyticalQuery::FullTable).unwrap();

        let rendered = result.to_string();
        assert!(rendered.contains("MC_GBP_Billion"));
        assert!(rendered.contains("Bank A"));
        assert!(rendered.contains("80.0"));
    }

    #[test]
    fn test_standard_set_sql() {
        let sqls: Vec<String> = AnalyticalQuery::standard_set()
            .iter()
            .map(|q| q.sql("Largest_banks"))
            .collect();

        assert_eq!(sqls[0], "SELECT * FROM Largest_banks");
        assert_eq!(sqls[1], "SELECT AVG(MC_GBP_Billion) FROM Largest_banks");
        assert!(sqls[2].ends_with("LIMIT 5"));
        assert_eq!(sqls.len(), 4);
    }
}
