//! The shared photo store used by both the main app and the widget
//! extension.

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::{
    config::{SharedContainer, StoreConfig},
    db::{Database, IntentRef, PhotoRecord},
    error::{StoreError, StoreResult},
    refresh::{RefreshEvent, WidgetRefresher},
    timeline::{plan_timeline, RotationInterval, Timeline, WidgetFamily},
};

enum Backend {
    Ready(Database),
    Unavailable { path: PathBuf, reason: String },
}

/// Durable photo store in the shared container.
///
/// Cheap to clone; clones share one database worker. A second process
/// opens its own `SharedPhotoStore` on the same container.
#[derive(Clone)]
pub struct SharedPhotoStore {
    backend: Arc<Backend>,
    refresher: Arc<dyn WidgetRefresher>,
    max_photos: Option<usize>,
}

impl SharedPhotoStore {
    /// Opens the store, surfacing open failures.
    pub fn try_open(
        container: &SharedContainer,
        busy_timeout: Duration,
        max_photos: Option<usize>,
        refresher: Arc<dyn WidgetRefresher>,
    ) -> StoreResult<Self> {
        let database = Database::new(container.database_path(), busy_timeout)?;
        info!("Shared photo store ready for group {}", container.group_id);
        Ok(Self {
            backend: Arc::new(Backend::Ready(database)),
            refresher,
            max_photos,
        })
    }

    /// Opens the store, falling back to a degraded store whose operations
    /// all fail with [`StoreError::Unavailable`]. Never retried.
    pub fn open(
        container: &SharedContainer,
        busy_timeout: Duration,
        max_photos: Option<usize>,
        refresher: Arc<dyn WidgetRefresher>,
    ) -> Self {
        match Self::try_open(container, busy_timeout, max_photos, refresher.clone()) {
            Ok(store) => store,
            Err(err) => {
                error!("Shared photo store unavailable, running degraded: {err}");
                Self {
                    backend: Arc::new(Backend::Unavailable {
                        path: container.database_path(),
                        reason: err.to_string(),
                    }),
                    refresher,
                    max_photos,
                }
            }
        }
    }

    pub fn from_config(config: &StoreConfig, refresher: Arc<dyn WidgetRefresher>) -> anyhow::Result<Self> {
        let container = config.container()?;
        Ok(Self::open(
            &container,
            config.busy_timeout(),
            config.max_photos,
            refresher,
        ))
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.backend, Backend::Ready(_))
    }

    pub fn max_photos(&self) -> Option<usize> {
        self.max_photos
    }

    fn db(&self) -> StoreResult<&Database> {
        match &*self.backend {
            Backend::Ready(db) => Ok(db),
            Backend::Unavailable { path, reason } => Err(StoreError::Unavailable {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Inserts or replaces the photo and registers it for rotation.
    ///
    /// Saving the same id twice appends a second intent; the index keeps
    /// both.
    pub async fn save(&self, photo: &PhotoRecord) -> StoreResult<()> {
        self.db()?.save_photo(photo, self.max_photos).await?;
        self.refresher
            .reload_all_timelines(RefreshEvent::PhotoSaved { id: photo.id.clone() });
        Ok(())
    }

    /// All stored photos, in no particular order.
    pub async fn load_all(&self) -> StoreResult<Vec<PhotoRecord>> {
        self.db()?.load_photos().await
    }

    /// Removes the photo and its intents. Deleting a missing photo is a
    /// no-op.
    pub async fn delete(&self, photo: &PhotoRecord) -> StoreResult<()> {
        self.delete_by_id(&photo.id).await
    }

    pub async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        self.db()?.delete_photo(id).await?;
        self.refresher
            .reload_all_timelines(RefreshEvent::PhotoDeleted { id: id.to_string() });
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<PhotoRecord>> {
        self.db()?.get_photo(id).await
    }

    /// The rotation index in registration order.
    pub async fn load_intent_refs(&self) -> StoreResult<Vec<IntentRef>> {
        self.db()?.load_intent_refs().await
    }

    pub async fn count(&self) -> StoreResult<usize> {
        self.db()?.count_photos().await
    }

    pub async fn contains(&self, id: &str) -> StoreResult<bool> {
        self.db()?.contains_photo(id).await
    }

    pub async fn prune_orphaned_intents(&self) -> StoreResult<usize> {
        let removed = self.db()?.prune_orphaned_intents().await?;
        if removed > 0 {
            info!("Pruned {removed} orphaned widget intents");
            let entries = self.db()?.load_intent_refs().await?.len();
            self.refresher
                .reload_all_timelines(RefreshEvent::IndexRepaired { entries });
        }
        Ok(removed)
    }

    pub async fn rebuild_intent_index(&self) -> StoreResult<usize> {
        let entries = self.db()?.rebuild_intent_index().await?;
        info!("Rebuilt widget intent index with {entries} entries");
        self.refresher
            .reload_all_timelines(RefreshEvent::IndexRepaired { entries });
        Ok(entries)
    }

    /// Plans the next widget timeline from the photos currently eligible for
    /// rotation.
    pub async fn plan_timeline(
        &self,
        family: WidgetFamily,
        interval: RotationInterval,
        now: DateTime<Utc>,
    ) -> StoreResult<Timeline> {
        let candidates = self.db()?.intent_photos().await?;
        let mut rng = rand::thread_rng();
        Ok(plan_timeline(family, interval, now, &candidates, &mut rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::{BroadcastRefresher, NoopRefresher};

    fn open_in(dir: &tempfile::TempDir, max_photos: Option<usize>) -> SharedPhotoStore {
        let container = SharedContainer::new("group.test", dir.path());
        SharedPhotoStore::try_open(
            &container,
            Duration::from_millis(500),
            max_photos,
            Arc::new(NoopRefresher),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn capacity_rejects_new_ids_but_allows_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir, Some(2));

        let mut first = PhotoRecord::new("local-1", Some(vec![1]));
        let second = PhotoRecord::new("local-2", None);
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let third = PhotoRecord::new("local-3", None);
        let err = store.save(&third).await.unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { max: 2 }));
        assert!(!store.contains(&third.id).await.unwrap());
        assert_eq!(store.load_intent_refs().await.unwrap().len(), 2);

        first.image_data = Some(vec![9]);
        store.save(&first).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn mutations_fire_refresh_events() {
        let dir = tempfile::tempdir().unwrap();
        let container = SharedContainer::new("group.test", dir.path());
        let refresher = Arc::new(BroadcastRefresher::new(8));
        let mut events = refresher.subscribe();
        let store = SharedPhotoStore::try_open(
            &container,
            Duration::from_millis(500),
            None,
            refresher.clone(),
        )
        .unwrap();

        let photo = PhotoRecord::new("local-1", None);
        store.save(&photo).await.unwrap();
        store.delete(&photo).await.unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            RefreshEvent::PhotoSaved { id: photo.id.clone() }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            RefreshEvent::PhotoDeleted { id: photo.id.clone() }
        );
    }

    #[tokio::test]
    async fn failed_save_does_not_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let container = SharedContainer::new("group.test", dir.path());
        let refresher = Arc::new(BroadcastRefresher::new(8));
        let mut events = refresher.subscribe();
        let store = SharedPhotoStore::try_open(
            &container,
            Duration::from_millis(500),
            Some(0),
            refresher.clone(),
        )
        .unwrap();

        assert!(store.save(&PhotoRecord::new("local-1", None)).await.is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn degraded_store_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"file").unwrap();
        let container = SharedContainer::new("group.test", &blocker);

        let store = SharedPhotoStore::open(
            &container,
            Duration::from_millis(100),
            None,
            Arc::new(NoopRefresher),
        );
        assert!(!store.is_available());
        assert!(matches!(
            store.load_all().await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.save(&PhotoRecord::new("local-1", None)).await,
            Err(StoreError::Unavailable { .. })
        ));
    }

    async fn corrupt_intent_slot(store: &SharedPhotoStore) {
        let db = store.db().unwrap().clone();
        db.execute(|conn| {
            conn.execute(
                "UPDATE preferences SET value = x'ffff' WHERE key = 'widgetIntents'",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();
        assert!(matches!(
            store.load_intent_refs().await,
            Err(StoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn delete_repairs_a_corrupt_intent_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir, None);
        let a = PhotoRecord::new("local-1", None);
        let b = PhotoRecord::new("local-2", None);
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();
        corrupt_intent_slot(&store).await;

        store.delete(&a).await.unwrap();

        let intents = store.load_intent_refs().await.unwrap();
        assert_eq!(intents, vec![IntentRef::from(&b)]);
    }

    #[tokio::test]
    async fn deleting_a_missing_id_still_repairs_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir, None);
        let a = PhotoRecord::new("local-1", None);
        store.save(&a).await.unwrap();
        corrupt_intent_slot(&store).await;

        store.delete_by_id("nonexistent").await.unwrap();

        assert_eq!(store.load_intent_refs().await.unwrap(), vec![IntentRef::from(&a)]);
    }

    #[tokio::test]
    async fn prune_repairs_a_corrupt_intent_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir, None);
        let a = PhotoRecord::new("local-1", None);
        store.save(&a).await.unwrap();
        corrupt_intent_slot(&store).await;

        assert_eq!(store.prune_orphaned_intents().await.unwrap(), 0);
        assert_eq!(store.load_intent_refs().await.unwrap(), vec![IntentRef::from(&a)]);
    }

    #[tokio::test]
    async fn timeline_skips_orphaned_intents() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir, None);
        let photo = PhotoRecord::new("local-1", None);
        store.save(&photo).await.unwrap();

        let db = store.db().unwrap().clone();
        db.execute(|conn| {
            conn.execute("DELETE FROM records", [])?;
            Ok(())
        })
        .await
        .unwrap();

        let timeline = store
            .plan_timeline(WidgetFamily::Single, RotationInterval::OneMinute, Utc::now())
            .await
            .unwrap();
        assert!(timeline.is_empty());

        assert_eq!(store.prune_orphaned_intents().await.unwrap(), 1);
        assert!(store.load_intent_refs().await.unwrap().is_empty());
    }
}
