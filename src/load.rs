// 💾 Loaders
// Dataset → CSV file and → SQLite table, both full-replace

use crate::error::{EtlError, Result};
use crate::transform::EnrichedBankRecord;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// CSV
// ============================================================================

/// Write the dataset with a header row, replacing any existing file
///
/// Rows go to a sibling temp file first, which is then renamed over `path`.
pub fn write_csv(records: &[EnrichedBankRecord], path: &Path) -> Result<()> {
    let tmp_path = temp_path_for(path);

    let result = write_csv_rows(records, &tmp_path)
        .and_then(|_| fs::rename(&tmp_path, path).map_err(|e| EtlError::io(path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_csv_rows(records: &[EnrichedBankRecord], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| EtlError::io(path, e))?;

    // serde writes the header from the first record; an empty dataset still gets one
    if records.is_empty() {
        wtr.write_record(crate::transform::COLUMNS)
            .map_err(|e| EtlError::io(path, e))?;
    }

    for record in records {
        wtr.serialize(record).map_err(|e| EtlError::io(path, e))?;
    }

    wtr.flush().map_err(|e| EtlError::io(path, e))?;
    Ok(())
}

/// Replace `path` with `bytes` via a sibling temp file and a rename
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(path);

    let result = fs::write(&tmp_path, bytes)
        .and_then(|_| fs::rename(&tmp_path, path))
        .map_err(|e| EtlError::io(path, e));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a CSV produced by `write_csv`
pub fn read_csv(path: &Path) -> Result<Vec<EnrichedBankRecord>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| EtlError::io(path, e))?;

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        let record: EnrichedBankRecord = result.map_err(|e| {
            EtlError::parse(format!("{} line {}: {}", path.display(), idx + 2, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TABLE STORE
// ============================================================================

/// Open (or create) the single-file store
pub fn open_store(path: &Path) -> Result<Connection> {
    Connection::open(path).map_err(|e| {
        EtlError::Storage(format!("cannot open {}: {}", path.display(), e))
    })
}

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(EtlError::Storage(format!("invalid table name '{}'", table)))
    }
}

/// Replace the table's contents with `records` in one transaction
///
/// Either the whole replacement commits or the prior table stays as it was.
/// Returns the number of rows inserted.
pub fn write_table(
    conn: &mut Connection,
    table: &str,
    records: &[EnrichedBankRecord],
) -> Result<usize> {
    validate_table_name(table)?;

    let tx = conn.transaction()?;

    tx.execute(&format!("DROP TABLE IF EXISTS \"{}\"", table), [])?;
    tx.execute(
        &format!(
            "CREATE TABLE \"{}\" (
                Name TEXT NOT NULL,
                MC_USD_Billion REAL NOT NULL,
                MC_GBP_Billion REAL NOT NULL,
                MC_EUR_Billion REAL NOT NULL,
                MC_INR_Billion REAL NOT NULL
            )",
            table
        ),
        [],
    )?;

    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO \"{}\" (
                Name, MC_USD_Billion, MC_GBP_Billion, MC_EUR_Billion, MC_INR_Billion
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            table
        ))?;

        for r in records {
            stmt.execute(params![
                r.name,
                r.mc_usd_billion,
                r.mc_gbp_billion,
                r.mc_eur_billion,
                r.mc_inr_billion,
            ])?;
        }
    }

    // Dropping `tx` without commit rolls back
    tx.commit()?;

    tracing::info!(table, rows = records.len(), "table replaced");
    Ok(records.len())
}

/// Row count of a table
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    validate_table_name(table)?;
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}
