//! Replace-all synchronization of the persisted collection
//!
//! The new batch is written as a fresh generation, published through the
//! store's atomic pointer, and only then are the previous items removed.
//! Readers going through [`read_current`](crate::read_current) see either
//! the old set or the new one, never a mix.

use anyhow::{Context, Result};
use sismos_core::SeismicRecord;
use uuid::Uuid;

use crate::store::{Generation, RecordStore, StoredRecord};

/// Items per backend batch call.
pub const BATCH_SIZE: usize = 25;

/// Outcome of a successful sync.
#[derive(Debug)]
pub struct SyncReport {
    pub generation: String,
    /// Newly stored items, in source order.
    pub stored: Vec<StoredRecord>,
    /// Items of earlier runs that were removed.
    pub removed: usize,
}

/// Replaces a collection's contents with a freshly extracted batch.
pub struct DatasetSynchronizer<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> DatasetSynchronizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Replace every stored item with `records`, minting new identifiers.
    ///
    /// Any backend error fails the whole sync; the caller decides on a
    /// fallback. Nothing is retried.
    pub fn sync(&self, records: Vec<SeismicRecord>) -> Result<SyncReport> {
        let collection = self.store.collection();

        let existing = self
            .store
            .scan()
            .with_context(|| format!("{collection}: scan failed"))?;
        let stale_ids: Vec<String> = existing.into_iter().map(|item| item.id).collect();
        log::debug!("{collection}: {} existing items", stale_ids.len());

        let generation = Uuid::new_v4().to_string();
        let stored: Vec<StoredRecord> = records
            .into_iter()
            .enumerate()
            .map(|(rank, record)| StoredRecord {
                id: Uuid::new_v4().to_string(),
                generation: generation.clone(),
                rank,
                record,
            })
            .collect();

        if let Err(e) = self.put_all(&stored) {
            self.rollback(&stored);
            return Err(e).with_context(|| format!("{collection}: insert failed"));
        }

        let pointer = Generation {
            id: generation.clone(),
            count: stored.len(),
            published_at: chrono::Utc::now(),
        };
        if let Err(e) = self.store.publish_generation(&pointer) {
            self.rollback(&stored);
            return Err(e).with_context(|| format!("{collection}: publish failed"));
        }
        log::info!(
            "{collection}: published generation {generation} ({} items)",
            stored.len()
        );

        // Stale items are already invisible to readers; a failure here
        // leaves garbage that the next run's scan picks up.
        for chunk in stale_ids.chunks(BATCH_SIZE) {
            self.store
                .delete_batch(chunk)
                .with_context(|| format!("{collection}: removing previous items failed"))?;
        }

        Ok(SyncReport {
            generation,
            stored,
            removed: stale_ids.len(),
        })
    }

    fn put_all(&self, items: &[StoredRecord]) -> Result<()> {
        for chunk in items.chunks(BATCH_SIZE) {
            self.store.put_batch(chunk)?;
        }
        Ok(())
    }

    /// Best-effort removal of an unpublished generation.
    fn rollback(&self, items: &[StoredRecord]) {
        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        for chunk in ids.chunks(BATCH_SIZE) {
            if let Err(e) = self.store.delete_batch(chunk) {
                log::warn!(
                    "{}: rollback of unpublished items failed: {e:#}",
                    self.store.collection()
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::{FailPoint, FileStore, MemoryStore, read_current};

    fn records(n: usize) -> Vec<SeismicRecord> {
        (0..n)
            .map(|i| SeismicRecord {
                occurred_at: format!("19/10/2026 10:{i:02}:00"),
                latitude: Some("-15.3".into()),
                longitude: Some("-70.1".into()),
                depth: Some("120".into()),
                magnitude: format!("3.{i}"),
                place: format!("{i} km al N de Juliaca"),
                report_url: None,
            })
            .collect()
    }

    fn ids(items: &[StoredRecord]) -> HashSet<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn replaces_existing_items() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);

        let first = sync.sync(records(7)).unwrap();
        let second = sync.sync(records(4)).unwrap();

        assert_eq!(second.removed, 7);
        let current = store.scan().unwrap();
        assert_eq!(current.len(), 4);
        assert!(ids(&current).is_disjoint(&ids(&first.stored)));
        assert_eq!(ids(&current), ids(&second.stored));
    }

    #[test]
    fn identifiers_are_fresh_and_distinct() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);

        let a = sync.sync(records(10)).unwrap();
        let b = sync.sync(records(10)).unwrap();

        assert_eq!(ids(&a.stored).len(), 10);
        assert!(ids(&a.stored).is_disjoint(&ids(&b.stored)));
        assert_ne!(a.generation, b.generation);
    }

    #[test]
    fn preserves_source_order() {
        let store = MemoryStore::new();
        let report = DatasetSynchronizer::new(&store).sync(records(3)).unwrap();

        let current = read_current(&store).unwrap();
        assert_eq!(current, report.stored);
        assert_eq!(current[0].record.magnitude, "3.0");
        assert_eq!(current[2].record.magnitude, "3.2");
    }

    #[test]
    fn empty_batch_clears_collection() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);
        sync.sync(records(5)).unwrap();

        let report = sync.sync(Vec::new()).unwrap();
        assert_eq!(report.removed, 5);
        assert!(store.is_empty());
        assert!(read_current(&store).unwrap().is_empty());
    }

    #[test]
    fn large_batches_are_chunked() {
        let store = MemoryStore::new();
        DatasetSynchronizer::new(&store).sync(records(60)).unwrap();
        let puts = store
            .calls()
            .into_iter()
            .filter(|c| *c == FailPoint::Put)
            .count();
        assert_eq!(puts, 3);
        assert_eq!(store.len(), 60);
    }

    #[test]
    fn insert_failure_keeps_previous_generation() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);
        let first = sync.sync(records(3)).unwrap();

        store.fail_on(Some(FailPoint::Put));
        assert!(sync.sync(records(5)).is_err());
        store.fail_on(None);

        let current = read_current(&store).unwrap();
        assert_eq!(ids(&current), ids(&first.stored));
    }

    #[test]
    fn publish_failure_rolls_back_new_items() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);
        let first = sync.sync(records(2)).unwrap();

        store.fail_on(Some(FailPoint::Publish));
        assert!(sync.sync(records(6)).is_err());
        store.fail_on(None);

        assert_eq!(ids(&store.scan().unwrap()), ids(&first.stored));
        assert_eq!(ids(&read_current(&store).unwrap()), ids(&first.stored));
    }

    #[test]
    fn scan_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.fail_on(Some(FailPoint::Scan));
        assert!(DatasetSynchronizer::new(&store).sync(records(2)).is_err());
        assert_eq!(store.calls(), [FailPoint::Scan]);
    }

    #[test]
    fn delete_failure_reports_error_but_new_set_is_visible() {
        let store = MemoryStore::new();
        let sync = DatasetSynchronizer::new(&store);
        sync.sync(records(2)).unwrap();

        store.fail_on(Some(FailPoint::Delete));
        assert!(sync.sync(records(3)).is_err());
        store.fail_on(None);

        assert_eq!(read_current(&store).unwrap().len(), 3);

        // next run sweeps the leftovers
        let report = sync.sync(records(1)).unwrap();
        assert_eq!(report.removed, 5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn file_store_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), "SismosReportados").unwrap();
        let sync = DatasetSynchronizer::new(&store);

        sync.sync(records(10)).unwrap();
        let report = sync.sync(records(10)).unwrap();

        let on_disk = std::fs::read_dir(dir.path().join("SismosReportados/items"))
            .unwrap()
            .count();
        assert_eq!(on_disk, 10);
        assert_eq!(ids(&read_current(&store).unwrap()), ids(&report.stored));
    }
}
