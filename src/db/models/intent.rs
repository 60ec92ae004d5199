use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PhotoRecord;

/// Index entry marking a stored photo as eligible for widget rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PhotoRecord> for IntentRef {
    fn from(photo: &PhotoRecord) -> Self {
        Self {
            id: photo.id.clone(),
            created_at: photo.created_at,
        }
    }
}

// Ordered by registration time; ties broken by id so sorting is total.
impl Ord for IntentRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for IntentRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn intents_sort_by_creation_time() {
        let now = Utc::now();
        let mut intents = vec![
            IntentRef { id: "late".into(), created_at: now + Duration::seconds(5) },
            IntentRef { id: "early".into(), created_at: now },
        ];
        intents.sort();
        assert_eq!(intents[0].id, "early");
        assert_eq!(intents[1].id, "late");
    }

    #[test]
    fn intent_wire_format_uses_camel_case() {
        let intent = IntentRef {
            id: "a1".into(),
            created_at: "2024-01-02T03:04:05Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert_eq!(json, r#"{"id":"a1","createdAt":"2024-01-02T03:04:05Z"}"#);
    }
}
