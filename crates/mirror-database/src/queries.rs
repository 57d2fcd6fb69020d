//! Standalone query functions for append-only log tables.
//!
//! Each function takes a `&Connection` as its first parameter so it can run
//! inside [`crate::AsyncDatabase::call`] or against a plain connection.
//!
//! Every log table has the shape `(seq, data)`. `seq` is an
//! `INTEGER PRIMARY KEY AUTOINCREMENT`, so SQLite assigns it and never reuses a
//! value, even after the highest row is removed out-of-band.

use crate::{DatabaseResult, LogTable, StoredRow};
use rusqlite::{params, Connection};
use tracing::debug;

/// Create the log table if it does not exist.
pub fn ensure_log_table(conn: &Connection, table: &LogTable) -> DatabaseResult<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            data TEXT NOT NULL CHECK (json_valid(data))
        );",
        table.quoted()
    ))?;
    debug!(table = %table, "Log table ensured");
    Ok(())
}

/// Load every row, ascending by seq.
pub fn load_all(conn: &Connection, table: &LogTable) -> DatabaseResult<Vec<StoredRow>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT seq, data FROM {} ORDER BY seq ASC", table.quoted()))?;
    let rows = stmt
        .query_map([], map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Load every row with `seq > last_seq`, ascending by seq.
pub fn fetch_since(conn: &Connection, table: &LogTable, last_seq: i64) -> DatabaseResult<Vec<StoredRow>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT seq, data FROM {} WHERE seq > ?1 ORDER BY seq ASC",
        table.quoted()
    ))?;
    let rows = stmt
        .query_map(params![last_seq], map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert one payload and return the seq SQLite assigned to it.
pub fn insert_one(conn: &Connection, table: &LogTable, data: &str) -> DatabaseResult<i64> {
    let mut stmt = conn.prepare_cached(&format!("INSERT INTO {} (data) VALUES (?1)", table.quoted()))?;
    stmt.execute(params![data])?;
    Ok(conn.last_insert_rowid())
}

/// Insert payloads in one transaction.
///
/// Either every payload commits or none does. The returned seqs are ascending
/// and line up positionally with `payloads`.
pub fn insert_many(conn: &Connection, table: &LogTable, payloads: &[String]) -> DatabaseResult<Vec<i64>> {
    if payloads.is_empty() {
        return Ok(Vec::new());
    }

    // Dropping the transaction on an early return rolls it back.
    let tx = conn.unchecked_transaction()?;
    let mut seqs = Vec::with_capacity(payloads.len());
    {
        let mut stmt = tx.prepare_cached(&format!("INSERT INTO {} (data) VALUES (?1)", table.quoted()))?;
        for data in payloads {
            stmt.execute(params![data])?;
            seqs.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;

    debug!(table = %table, count = seqs.len(), "Inserted batch");
    Ok(seqs)
}

/// Count rows in a log table.
pub fn count(conn: &Connection, table: &LogTable) -> DatabaseResult<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.quoted()), [], |row| row.get(0))?;
    Ok(n)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        seq: row.get(0)?,
        data: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Connection, LogTable) {
        let conn = Connection::open_in_memory().unwrap();
        let table = LogTable::new("records").unwrap();
        ensure_log_table(&conn, &table).unwrap();
        (conn, table)
    }

    #[test]
    fn ensure_log_table_is_idempotent() {
        let (conn, table) = setup();
        ensure_log_table(&conn, &table).unwrap();
        assert_eq!(count(&conn, &table).unwrap(), 0);
    }

    #[test]
    fn insert_one_assigns_increasing_seqs() {
        let (conn, table) = setup();

        let a = insert_one(&conn, &table, r#"{"value":1}"#).unwrap();
        let b = insert_one(&conn, &table, r#"{"value":2}"#).unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn insert_many_returns_positional_seqs() {
        let (conn, table) = setup();
        insert_one(&conn, &table, r#"{"value":0}"#).unwrap();

        let payloads = vec![
            r#"{"value":1}"#.to_string(),
            r#"{"value":2}"#.to_string(),
            r#"{"value":3}"#.to_string(),
        ];
        let seqs = insert_many(&conn, &table, &payloads).unwrap();

        assert_eq!(seqs, vec![2, 3, 4]);
        let rows = load_all(&conn, &table).unwrap();
        assert_eq!(rows[1].data, payloads[0]);
        assert_eq!(rows[3].data, payloads[2]);
    }

    #[test]
    fn insert_many_empty_is_noop() {
        let (conn, table) = setup();
        assert!(insert_many(&conn, &table, &[]).unwrap().is_empty());
        assert_eq!(count(&conn, &table).unwrap(), 0);
    }

    #[test]
    fn insert_many_is_all_or_nothing() {
        let (conn, table) = setup();

        let payloads = vec![
            r#"{"value":1}"#.to_string(),
            "not json".to_string(),
            r#"{"value":3}"#.to_string(),
        ];
        assert!(insert_many(&conn, &table, &payloads).is_err());
        assert_eq!(count(&conn, &table).unwrap(), 0);

        // The connection is usable afterwards and seqs were not consumed.
        assert_eq!(insert_one(&conn, &table, r#"{"value":4}"#).unwrap(), 1);
    }

    #[test]
    fn fetch_since_is_exclusive_and_ascending() {
        let (conn, table) = setup();
        for i in 1..=5 {
            insert_one(&conn, &table, &format!(r#"{{"value":{i}}}"#)).unwrap();
        }

        let rows = fetch_since(&conn, &table, 2).unwrap();
        let seqs: Vec<i64> = rows.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);

        assert!(fetch_since(&conn, &table, 5).unwrap().is_empty());
    }

    #[test]
    fn keyword_table_names_work() {
        let conn = Connection::open_in_memory().unwrap();
        for name in ["order", "group", "index"] {
            let table = LogTable::new(name).unwrap();
            ensure_log_table(&conn, &table).unwrap();
            insert_many(&conn, &table, &[r#"{"value":1}"#.to_string()]).unwrap();
            assert_eq!(insert_one(&conn, &table, r#"{"value":2}"#).unwrap(), 2);

            assert_eq!(fetch_since(&conn, &table, 1).unwrap().len(), 1);
            assert_eq!(load_all(&conn, &table).unwrap().len(), 2);
            assert_eq!(count(&conn, &table).unwrap(), 2);
        }
    }

    #[test]
    fn seqs_are_not_reused_after_out_of_band_delete() {
        let (conn, table) = setup();
        insert_one(&conn, &table, r#"{"value":1}"#).unwrap();
        insert_one(&conn, &table, r#"{"value":2}"#).unwrap();
        conn.execute("DELETE FROM records WHERE seq = 2", []).unwrap();

        assert_eq!(insert_one(&conn, &table, r#"{"value":3}"#).unwrap(), 3);
    }
}
