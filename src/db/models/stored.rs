//! Typed view over the flat `records` table.
//!
//! Every row carries a `store_type` tag next to an opaque JSON blob. The tag
//! is parsed into [`StoreKind`] and the blob into the matching
//! [`StoredValue`] variant, so callers match exhaustively instead of
//! comparing strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    db::helpers::base64_bytes,
    error::{StoreError, StoreResult},
};

use super::PhotoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Photo,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Photo => "photo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "photo" => Some(StoreKind::Photo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Photo(PhotoRecord),
}

impl StoredValue {
    pub fn kind(&self) -> StoreKind {
        match self {
            StoredValue::Photo(_) => StoreKind::Photo,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StoredValue::Photo(photo) => &photo.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            StoredValue::Photo(photo) => photo.created_at,
        }
    }

    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        match self {
            StoredValue::Photo(photo) => serde_json::to_vec(photo).map_err(StoreError::Encode),
        }
    }

    /// Decodes a row. `row_created_at` backfills payloads written without a
    /// timestamp.
    pub fn decode(
        key: &str,
        store_type: &str,
        value: &[u8],
        row_created_at: DateTime<Utc>,
    ) -> StoreResult<Self> {
        let kind = StoreKind::parse(store_type)
            .ok_or_else(|| StoreError::decode(key, format!("unknown store type '{store_type}'")))?;

        match kind {
            StoreKind::Photo => {
                let payload: PhotoPayload =
                    serde_json::from_slice(value).map_err(|err| StoreError::decode(key, err))?;
                Ok(StoredValue::Photo(payload.into_record(key, row_created_at)))
            }
        }
    }

    pub fn into_photo(self) -> Option<PhotoRecord> {
        match self {
            StoredValue::Photo(photo) => Some(photo),
        }
    }
}

/// Lenient shape of a stored photo; older writers omitted fields freely.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default, with = "base64_bytes")]
    image_data: Option<Vec<u8>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl PhotoPayload {
    fn into_record(self, key: &str, row_created_at: DateTime<Utc>) -> PhotoRecord {
        PhotoRecord {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| key.to_string()),
            source_id: self.source_id.unwrap_or_default(),
            image_data: self.image_data,
            created_at: self.created_at.unwrap_or(row_created_at),
        }
    }
}
