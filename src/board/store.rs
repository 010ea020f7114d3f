use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;

use super::events::Broadcaster;
use super::tasks::TaskStore;
use super::upgrades::UpgradeStore;
use crate::errors::{BoardError, BoardResult};

const LOCK_FILE: &str = ".lock";

/// Everything persisted under one data directory.
pub struct BoardStore {
    pub tasks: TaskStore,
    pub upgrades: UpgradeStore,
}

impl BoardStore {
    pub fn open(data_dir: &Path, task_prefix: &str, events: Arc<dyn Broadcaster>) -> Result<Self> {
        Ok(Self {
            tasks: TaskStore::open(data_dir, task_prefix, events.clone())?,
            upgrades: UpgradeStore::open(data_dir, events)?,
        })
    }
}

/// Async-safe handle to the board store.
///
/// Store operations do synchronous file I/O, so `call` runs them on tokio's
/// blocking pool instead of an async worker thread.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<BoardStore>,
}

impl StoreHandle {
    pub fn new(store: BoardStore) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> BoardResult<R>
    where
        F: FnOnce(&BoardStore) -> BoardResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| BoardError::Other(anyhow::anyhow!("Store task panicked: {}", e)))?
    }

    /// Direct access for synchronous assertions in tests.
    #[cfg(test)]
    pub fn get(&self) -> &BoardStore {
        &self.inner
    }
}

/// Exclusive advisory lock on a data directory, held for the lifetime of
/// the value. Two processes writing the same files would silently drop each
/// other's changes.
pub struct DataDirLock {
    _file: File,
}

impl DataDirLock {
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        let path = data_dir.join(LOCK_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!(
                "Data directory {} is in use by another mission-control process",
                data_dir.display()
            )
        })?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::events::NoopBroadcaster;
    use crate::board::models::NewTask;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_call_runs_store_operations() {
        let dir = TempDir::new().unwrap();
        let store = BoardStore::open(dir.path(), "MC", Arc::new(NoopBroadcaster)).unwrap();
        let handle = StoreHandle::new(store);

        let task = handle
            .call(|s| s.tasks.create(NewTask::default()))
            .await
            .unwrap();
        let fetched = handle
            .call(move |s| s.tasks.get(&task.id))
            .await
            .unwrap();
        assert_eq!(fetched.task_number, "MC-1");
    }

    #[tokio::test]
    async fn test_call_propagates_store_errors() {
        let dir = TempDir::new().unwrap();
        let store = BoardStore::open(dir.path(), "MC", Arc::new(NoopBroadcaster)).unwrap();
        let handle = StoreHandle::new(store);
        let err = handle.call(|s| s.upgrades.get("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_creates_all_data_files() {
        let dir = TempDir::new().unwrap();
        BoardStore::open(dir.path(), "MC", Arc::new(NoopBroadcaster)).unwrap();
        for file in ["tasks.json", "activity.json", "upgrades.json", "meta.json"] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        assert!(dir.path().join("backups").is_dir());
    }

    #[test]
    fn test_data_dir_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let first = DataDirLock::acquire(dir.path()).unwrap();
        assert!(DataDirLock::acquire(dir.path()).is_err());
        drop(first);
        assert!(DataDirLock::acquire(dir.path()).is_ok());
    }
}
