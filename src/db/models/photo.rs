//! Photo records selected by the user for widget display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::helpers::base64_bytes;

/// A photo persisted for widget rotation.
///
/// Records are immutable once created; saving a record with an existing `id`
/// replaces the stored copy wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    /// Identifier of the library asset the photo was taken from.
    pub source_id: String,
    #[serde(default, with = "base64_bytes")]
    pub image_data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl PhotoRecord {
    pub fn new(source_id: impl Into<String>, image_data: Option<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            image_data,
            created_at: Utc::now(),
        }
    }
}
