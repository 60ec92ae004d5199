use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

use crate::error::{StoreError, StoreResult};
use migrations::run_migrations;

pub use models::{IntentRef, PhotoRecord, StoreKind, StoredValue};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Handle to the SQLite file inside the shared container.
///
/// All statements run on one dedicated thread; clones share that thread.
/// Another process may hold its own `Database` on the same file.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf, busy_timeout: Duration) -> StoreResult<Self> {
        let unavailable = |reason: String| StoreError::Unavailable {
            path: db_path.clone(),
            reason,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                unavailable(format!(
                    "failed to create container directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<StoreResult<()>>();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("photo-store-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(StoreError::Unavailable {
                            path: path_for_thread.clone(),
                            reason: err.to_string(),
                        }));
                        return;
                    }
                };

                if let Err(err) = conn.busy_timeout(busy_timeout) {
                    error!("Failed to set busy timeout: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result = run_migrations(&mut conn).map_err(|err| {
                    StoreError::Unavailable {
                        path: path_for_thread.clone(),
                        reason: err.to_string(),
                    }
                });
                let init_failed = init_result.is_err();
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }
                if init_failed {
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .map_err(|err| unavailable(format!("failed to spawn database worker thread: {err}")))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| unavailable("database worker exited before signaling readiness".into()))
            .and_then(|result| result);
        if let Err(err) = ready {
            drop(command_tx);
            if let Err(join_err) = worker.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
            return Err(err);
        }

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender.send(command).map_err(|_| StoreError::WorkerGone)?;

        reply_rx.await.map_err(|_| StoreError::WorkerGone)?
    }
}
