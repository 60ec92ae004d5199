//! Row-level access to the `records` key/value table.
//!
//! These helpers take a plain `&Connection` so they compose inside the
//! transactions opened by the photo and intent repositories.

use log::warn;
use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    db::{
        helpers::{parse_datetime, to_usize},
        models::{StoreKind, StoredValue},
    },
    error::StoreResult,
};

struct RawRecord {
    key: String,
    store_type: String,
    value: Vec<u8>,
    created_at: String,
}

impl RawRecord {
    fn decode(&self) -> StoreResult<StoredValue> {
        let created_at = parse_datetime(&self.created_at, "created_at")?;
        StoredValue::decode(&self.key, &self.store_type, &self.value, created_at)
    }
}

fn row_to_raw(row: &rusqlite::Row) -> Result<RawRecord, rusqlite::Error> {
    Ok(RawRecord {
        key: row.get("key")?,
        store_type: row.get("store_type")?,
        value: row.get("value")?,
        created_at: row.get("created_at")?,
    })
}

pub fn upsert_value(conn: &Connection, value: &StoredValue) -> StoreResult<()> {
    let encoded = value.encode()?;
    conn.execute(
        "INSERT INTO records (key, store_type, value, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
             store_type = excluded.store_type,
             value = excluded.value,
             created_at = excluded.created_at",
        params![
            value.key(),
            value.kind().as_str(),
            encoded,
            value.created_at().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_value(conn: &Connection, key: &str) -> StoreResult<Option<StoredValue>> {
    let raw = conn
        .query_row(
            "SELECT key, store_type, value, created_at FROM records WHERE key = ?1",
            params![key],
            row_to_raw,
        )
        .optional()?;

    raw.map(|raw| raw.decode()).transpose()
}

/// Loads every row of `kind`. Rows that fail to decode are logged and
/// skipped.
pub fn load_values(conn: &Connection, kind: StoreKind) -> StoreResult<Vec<StoredValue>> {
    let mut stmt = conn.prepare(
        "SELECT key, store_type, value, created_at
         FROM records
         WHERE store_type = ?1",
    )?;

    let rows = stmt
        .query_map(params![kind.as_str()], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = Vec::with_capacity(rows.len());
    for raw in rows {
        match raw.decode() {
            Ok(value) => values.push(value),
            Err(err) => warn!("Skipping unreadable record '{}': {err}", raw.key),
        }
    }

    Ok(values)
}

/// Returns whether a row was removed.
pub fn delete_value(conn: &Connection, key: &str) -> StoreResult<bool> {
    let removed = conn.execute("DELETE FROM records WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}

pub fn contains_key(conn: &Connection, key: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM records WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn count_kind(conn: &Connection, kind: StoreKind) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE store_type = ?1",
        params![kind.as_str()],
        |row| row.get(0),
    )?;
    to_usize(count, "count")
}
