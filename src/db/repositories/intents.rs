//! The widget intent index.
//!
//! Stored as one JSON array under a single `preferences` slot, always read
//! and written whole. Keeping it next to `records` in the same file lets a
//! save or delete update both sides in one transaction.

use std::collections::HashSet;

use log::warn;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::{
    db::{
        models::{IntentRef, StoreKind},
        repositories::records::load_values,
        Database,
    },
    error::{StoreError, StoreResult},
};

pub const WIDGET_INTENTS_SLOT: &str = "widgetIntents";

pub fn read_intents(conn: &Connection) -> StoreResult<Vec<IntentRef>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![WIDGET_INTENTS_SLOT],
            |row| row.get(0),
        )
        .optional()?;

    match blob {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map_err(|err| StoreError::decode(WIDGET_INTENTS_SLOT, err)),
        None => Ok(Vec::new()),
    }
}

pub fn write_intents(conn: &Connection, intents: &[IntentRef]) -> StoreResult<()> {
    let encoded = serde_json::to_vec(intents).map_err(StoreError::Encode)?;
    conn.execute(
        "INSERT INTO preferences (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![WIDGET_INTENTS_SLOT, encoded],
    )?;
    Ok(())
}

/// One intent per live photo, oldest first.
pub fn intents_from_records(conn: &Connection) -> StoreResult<Vec<IntentRef>> {
    let mut intents: Vec<IntentRef> = load_values(conn, StoreKind::Photo)?
        .into_iter()
        .filter_map(|value| value.into_photo())
        .map(|photo| IntentRef::from(&photo))
        .collect();
    intents.sort();
    Ok(intents)
}

/// Reads the index for a read-modify-write. An unreadable slot is replaced
/// by one derived from the live records instead of failing the write; the
/// flag is set when that happened and the caller must write the slot back.
pub fn read_intents_or_rebuild(conn: &Connection) -> StoreResult<(Vec<IntentRef>, bool)> {
    match read_intents(conn) {
        Ok(intents) => Ok((intents, false)),
        Err(StoreError::Decode { reason, .. }) => {
            warn!("Widget intent index is unreadable ({reason}); rebuilding from records");
            Ok((intents_from_records(conn)?, true))
        }
        Err(err) => Err(err),
    }
}

impl Database {
    pub async fn load_intent_refs(&self) -> StoreResult<Vec<IntentRef>> {
        self.execute(|conn| read_intents(conn)).await
    }

    /// Drops index entries whose photo no longer exists. Returns the number
    /// removed.
    pub async fn prune_orphaned_intents(&self) -> StoreResult<usize> {
        self.execute(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let live: HashSet<String> = load_values(&tx, StoreKind::Photo)?
                .into_iter()
                .filter_map(|value| value.into_photo())
                .map(|photo| photo.id)
                .collect();

            let (mut intents, rebuilt) = read_intents_or_rebuild(&tx)?;
            let before = intents.len();
            intents.retain(|intent| live.contains(&intent.id));
            let removed = before - intents.len();

            if removed > 0 || rebuilt {
                write_intents(&tx, &intents)?;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    /// Replaces the index with one entry per live photo. Returns the new
    /// index length.
    pub async fn rebuild_intent_index(&self) -> StoreResult<usize> {
        self.execute(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let intents = intents_from_records(&tx)?;
            write_intents(&tx, &intents)?;
            tx.commit()?;
            Ok(intents.len())
        })
        .await
    }
}
