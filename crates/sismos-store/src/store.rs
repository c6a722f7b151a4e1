//! Record store backends
//!
//! File backend layout:
//! ```text
//! {root}/
//! └── {collection}/
//!     ├── items/
//!     │   └── {id}.json     # one StoredRecord per file
//!     └── CURRENT           # published generation (JSON)
//! ```
//!
//! Every write lands in a `.tmp` sibling first and is renamed into place,
//! so a reader never sees a half-written item or pointer.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sismos_core::SeismicRecord;

/// A record as persisted: identifier, owning generation, and source rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub generation: String,
    /// Position in the source table (0 = most recent).
    pub rank: usize,
    #[serde(flatten)]
    pub record: SeismicRecord,
}

/// The published generation pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub count: usize,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Key-value collection holding the current batch of records.
///
/// Items of several generations may coexist briefly during a sync; readers
/// go through [`read_current`], which only returns the published one.
pub trait RecordStore {
    /// Collection name, for logs.
    fn collection(&self) -> &str;

    /// Every stored item, all generations.
    fn scan(&self) -> Result<Vec<StoredRecord>>;

    /// Insert or overwrite items by id.
    fn put_batch(&self, items: &[StoredRecord]) -> Result<()>;

    /// Remove items by id; unknown ids are ignored.
    fn delete_batch(&self, ids: &[String]) -> Result<()>;

    fn current_generation(&self) -> Result<Option<Generation>>;

    /// Atomically switch readers to `generation`.
    fn publish_generation(&self, generation: &Generation) -> Result<()>;
}

/// Items of the published generation, in source order.
pub fn read_current<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<StoredRecord>> {
    let Some(current) = store.current_generation()? else {
        return Ok(Vec::new());
    };
    let mut items: Vec<StoredRecord> = store
        .scan()?
        .into_iter()
        .filter(|item| item.generation == current.id)
        .collect();
    items.sort_by_key(|item| item.rank);
    Ok(items)
}

/// Directory-backed store: one JSON file per item.
pub struct FileStore {
    dir: PathBuf,
    collection: String,
}

impl FileStore {
    /// Open (creating if needed) `collection` under `root`.
    pub fn open(root: &Path, collection: &str) -> Result<Self> {
        anyhow::ensure!(
            !collection.is_empty()
                && !collection.contains(['/', '\\'])
                && collection != "."
                && collection != "..",
            "invalid collection name: {collection:?}"
        );
        let dir = root.join(collection);
        let items = dir.join("items");
        fs::create_dir_all(&items)
            .with_context(|| format!("failed to create store dir: {}", items.display()))?;
        let store = Self {
            dir,
            collection: collection.to_string(),
        };
        store.cleanup_tmp()?;
        Ok(store)
    }

    fn items_dir(&self) -> PathBuf {
        self.dir.join("items")
    }

    fn item_path(&self, id: &str) -> PathBuf {
        self.items_dir().join(format!("{id}.json"))
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join("CURRENT")
    }

    /// Remove `.tmp` leftovers of an interrupted write.
    fn cleanup_tmp(&self) -> Result<usize> {
        let mut count = 0;
        for dir in [self.dir.clone(), self.items_dir()] {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    log::warn!("Removing stale tmp file: {}", path.display());
                    fs::remove_file(&path)?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

/// Write `bytes` to `path` through a tmp file + rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} → {}", tmp.display(), path.display()))
}

fn validate_id(id: &str) -> Result<()> {
    anyhow::ensure!(
        !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
        "invalid item id: {id:?}"
    );
    Ok(())
}

impl RecordStore for FileStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn scan(&self) -> Result<Vec<StoredRecord>> {
        let pattern = self.items_dir().join("*.json");
        let pattern_str = pattern.to_string_lossy();

        let mut paths: Vec<_> = glob::glob(&pattern_str)
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .collect();
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let item: StoredRecord = serde_json::from_str(&content)
                .with_context(|| format!("corrupt item {}", path.display()))?;
            items.push(item);
        }
        Ok(items)
    }

    fn put_batch(&self, items: &[StoredRecord]) -> Result<()> {
        for item in items {
            validate_id(&item.id)?;
            let json = serde_json::to_vec_pretty(item)?;
            write_atomic(&self.item_path(&item.id), &json)?;
        }
        Ok(())
    }

    fn delete_batch(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            validate_id(id)?;
            let path = self.item_path(id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to delete {}", path.display()));
                }
            }
        }
        Ok(())
    }

    fn current_generation(&self) -> Result<Option<Generation>> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let generation = serde_json::from_str(&content)
            .with_context(|| format!("corrupt generation pointer {}", path.display()))?;
        Ok(Some(generation))
    }

    fn publish_generation(&self, generation: &Generation) -> Result<()> {
        let json = serde_json::to_vec_pretty(generation)?;
        write_atomic(&self.current_path(), &json)
    }
}

/// Operation a [`MemoryStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Scan,
    Put,
    Delete,
    Publish,
}

/// In-process store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, StoredRecord>>,
    current: Mutex<Option<Generation>>,
    fail_on: Mutex<Option<FailPoint>>,
    calls: Mutex<Vec<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail (`None` clears).
    pub fn fail_on(&self, op: Option<FailPoint>) {
        *lock(&self.fail_on) = op;
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<FailPoint> {
        lock(&self.calls).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enter(&self, op: FailPoint) -> Result<()> {
        lock(&self.calls).push(op);
        if *lock(&self.fail_on) == Some(op) {
            anyhow::bail!("injected {op:?} failure");
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordStore for MemoryStore {
    fn collection(&self) -> &str {
        "memory"
    }

    fn scan(&self) -> Result<Vec<StoredRecord>> {
        self.enter(FailPoint::Scan)?;
        Ok(lock(&self.items).values().cloned().collect())
    }

    fn put_batch(&self, items: &[StoredRecord]) -> Result<()> {
        self.enter(FailPoint::Put)?;
        let mut map = lock(&self.items);
        for item in items {
            map.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    fn delete_batch(&self, ids: &[String]) -> Result<()> {
        self.enter(FailPoint::Delete)?;
        let mut map = lock(&self.items);
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    fn current_generation(&self) -> Result<Option<Generation>> {
        Ok(lock(&self.current).clone())
    }

    fn publish_generation(&self, generation: &Generation) -> Result<()> {
        self.enter(FailPoint::Publish)?;
        *lock(&self.current) = Some(generation.clone());
        Ok(())
    }
}
