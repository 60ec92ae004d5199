//! Shared photo storage for the photo widget app.
//!
//! The main app and its widget extension each open a [`SharedPhotoStore`] on
//! the same application-group container. The app saves and deletes photos;
//! the extension reads the rotation index and plans widget timelines.

pub mod config;
pub mod db;
pub mod error;
pub mod refresh;
pub mod store;
pub mod timeline;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::Result;

pub use config::{SharedContainer, StoreConfig};
pub use db::{IntentRef, PhotoRecord, StoreKind, StoredValue};
pub use error::{Absorb, StoreError, StoreResult};
pub use refresh::{BroadcastRefresher, NoopRefresher, RefreshEvent, WidgetRefresher};
pub use store::SharedPhotoStore;
pub use timeline::{RotationInterval, Timeline, TimelineEntry, WidgetFamily};

/// Host entry point: sets up logging, reads the config file and opens the
/// store. A store that cannot be opened comes back degraded rather than
/// failing startup.
pub fn bootstrap(config_path: &Path, refresher: Arc<dyn WidgetRefresher>) -> Result<SharedPhotoStore> {
    utils::logging::init_logging();

    let config = StoreConfig::load(config_path)?;
    log::info!(
        "Photo widget store starting (group {}, limit {:?})",
        config.group_id,
        config.max_photos
    );

    SharedPhotoStore::from_config(&config, refresher)
}
