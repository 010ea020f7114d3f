//! Whole-document JSON persistence.
//!
//! Every collection lives in one JSON file that is read fully at startup and
//! rewritten fully after each mutation. [`JsonTable`] keeps the in-memory copy
//! behind its own mutex so tables never contend with each other.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{BoardError, BoardResult};

/// Read a JSON document, treating a missing or unparsable file as the
/// default value. A corrupt file is copied aside before it is ignored so the
/// next write cannot destroy the only copy.
pub fn read_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read data file, using empty collection");
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
            let aside = path.with_extension(format!("json.corrupt-{}", stamp));
            let copied = std::fs::copy(path, &aside).is_ok();
            tracing::warn!(
                path = %path.display(),
                error = %e,
                preserved = copied,
                "data file is not valid JSON, using empty collection"
            );
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and replace the file at `path`.
pub fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON document")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write data file: {}", path.display()))?;
    Ok(())
}

/// One persisted collection: an in-memory document guarded by a mutex and
/// flushed to disk after every successful mutation.
pub struct JsonTable<T> {
    path: PathBuf,
    doc: Mutex<T>,
}

impl<T> JsonTable<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Load the table from `path`, creating the file with the default
    /// document when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let exists = path.exists();
        let doc: T = read_or_default(&path);
        if !exists {
            write_pretty(&path, &doc)?;
        }
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only closure against the current document.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> BoardResult<R> {
        let guard = self.doc.lock().map_err(|_| BoardError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Apply `f` to a working copy, write it to disk, then publish it.
    ///
    /// If `f` returns an error or the write fails, neither the file nor the
    /// in-memory document changes.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> BoardResult<R>) -> BoardResult<R> {
        let mut guard = self.doc.lock().map_err(|_| BoardError::LockPoisoned)?;
        let mut working = guard.clone();
        let out = f(&mut working)?;
        write_pretty(&self.path, &working).map_err(|source| BoardError::Storage {
            path: self.path.clone(),
            source,
        })?;
        *guard = working;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_as_default() {
        let dir = TempDir::new().unwrap();
        let items: Vec<String> = read_or_default(&dir.path().join("nope.json"));
        assert!(items.is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_as_default_and_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{ not json").unwrap();

        let items: Vec<String> = read_or_default(&path);
        assert!(items.is_empty());

        let preserved = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains("corrupt"));
        assert!(preserved, "corrupt file should be copied aside");
    }

    #[test]
    fn test_open_creates_file_with_default_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activity.json");
        let table: JsonTable<Vec<u32>> = JsonTable::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
        assert_eq!(table.read(|d| d.len()).unwrap(), 0);
    }

    #[test]
    fn test_mutate_persists_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nums.json");
        let table: JsonTable<Vec<u32>> = JsonTable::open(&path).unwrap();

        table
            .mutate(|d| {
                d.push(7);
                Ok(())
            })
            .unwrap();

        let on_disk: Vec<u32> = read_or_default(&path);
        assert_eq!(on_disk, vec![7]);

        let reopened: JsonTable<Vec<u32>> = JsonTable::open(&path).unwrap();
        assert_eq!(reopened.read(|d| d.clone()).unwrap(), vec![7]);
    }

    #[test]
    fn test_failed_mutation_leaves_document_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nums.json");
        let table: JsonTable<Vec<u32>> = JsonTable::open(&path).unwrap();

        let result: BoardResult<()> = table.mutate(|d| {
            d.push(1);
            Err(BoardError::task_not_found("x"))
        });
        assert!(result.is_err());
        assert!(table.read(|d| d.is_empty()).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
