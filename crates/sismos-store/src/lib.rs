//! sismos-store: persisted collection of the current seismic events
//!
//! A small key-value capability ([`RecordStore`]) with a file-backed and an
//! in-memory backend, the replace-all [`DatasetSynchronizer`], and the CSV
//! file used when the collection cannot be written.

pub mod csv_out;
pub mod store;
pub mod sync;

pub use csv_out::write_csv;
pub use store::{FailPoint, FileStore, Generation, MemoryStore, RecordStore, StoredRecord, read_current};
pub use sync::{BATCH_SIZE, DatasetSynchronizer, SyncReport};
