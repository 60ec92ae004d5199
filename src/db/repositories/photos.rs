use std::collections::HashMap;

use rusqlite::TransactionBehavior;

use crate::{
    db::{
        models::{IntentRef, PhotoRecord, StoreKind, StoredValue},
        repositories::{
            intents::{read_intents, read_intents_or_rebuild, write_intents},
            records::{contains_key, count_kind, delete_value, get_value, load_values, upsert_value},
        },
        Database,
    },
    error::{StoreError, StoreResult},
};

impl Database {
    /// Upserts the photo and appends its intent in one immediate
    /// transaction. `max_photos` caps the number of distinct photos;
    /// overwriting an existing id never counts against it.
    pub async fn save_photo(&self, photo: &PhotoRecord, max_photos: Option<usize>) -> StoreResult<()> {
        let record = photo.clone();
        self.execute(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // Checked inside the write transaction so two processes cannot
            // both squeeze past the limit.
            if let Some(max) = max_photos {
                if !contains_key(&tx, &record.id)? && count_kind(&tx, StoreKind::Photo)? >= max {
                    return Err(StoreError::CapacityExceeded { max });
                }
            }

            let (mut intents, _) = read_intents_or_rebuild(&tx)?;
            upsert_value(&tx, &StoredValue::Photo(record.clone()))?;
            intents.push(IntentRef::from(&record));
            write_intents(&tx, &intents)?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Removes the photo and every intent pointing at it. Returns whether
    /// anything was removed.
    pub async fn delete_photo(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let removed_record = delete_value(&tx, &id)?;

            let (mut intents, rebuilt) = read_intents_or_rebuild(&tx)?;
            let before = intents.len();
            intents.retain(|intent| intent.id != id);
            let removed_intents = intents.len() != before;
            if removed_intents || rebuilt {
                write_intents(&tx, &intents)?;
            }

            tx.commit()?;
            Ok(removed_record || removed_intents)
        })
        .await
    }

    pub async fn get_photo(&self, id: &str) -> StoreResult<Option<PhotoRecord>> {
        let id = id.to_string();
        self.execute(move |conn| Ok(get_value(conn, &id)?.and_then(StoredValue::into_photo)))
            .await
    }

    pub async fn load_photos(&self) -> StoreResult<Vec<PhotoRecord>> {
        self.execute(|conn| {
            Ok(load_values(conn, StoreKind::Photo)?
                .into_iter()
                .filter_map(StoredValue::into_photo)
                .collect())
        })
        .await
    }

    pub async fn count_photos(&self) -> StoreResult<usize> {
        self.execute(|conn| count_kind(conn, StoreKind::Photo)).await
    }

    pub async fn contains_photo(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.execute(move |conn| contains_key(conn, &id)).await
    }

    /// Resolves the intent index to photos, one per intent, in index order.
    /// Intents without a live photo are left out.
    pub async fn intent_photos(&self) -> StoreResult<Vec<PhotoRecord>> {
        self.execute(|conn| {
            let intents = read_intents(conn)?;
            let photos: HashMap<String, PhotoRecord> = load_values(conn, StoreKind::Photo)?
                .into_iter()
                .filter_map(StoredValue::into_photo)
                .map(|photo| (photo.id.clone(), photo))
                .collect();

            Ok(intents
                .iter()
                .filter_map(|intent| photos.get(&intent.id).cloned())
                .collect())
        })
        .await
    }
}
