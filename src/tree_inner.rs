use crate::{
    config::Config,
    generation::{Generation, GenerationCounter},
    memtable::MemTable,
    sstable::SsTable,
    stop_signal::StopSignal,
    wal::Wal,
};
use std::{
    collections::BTreeMap,
    sync::{atomic::AtomicUsize, Arc, Mutex, RwLock},
};

/// Live SSTables by generation; iteration order is oldest first
pub type SsTableMap = BTreeMap<Generation, Arc<SsTable>>;

pub struct TreeInner {
    /// Tree configuration
    pub config: Config,

    /// In-memory table of the latest mutation per key
    ///
    /// Mutations hold this exclusively (the write exclusion), readers
    /// share it.
    pub active_memtable: RwLock<MemTable>,

    /// Write-ahead log; only touched while the memtable is held
    /// exclusively
    pub wal: Mutex<Wal>,

    /// On-disk tables
    ///
    /// Lookups share the lock for their whole probe walk; flushes and
    /// merge passes take it exclusively.
    pub sstables: Arc<RwLock<SsTableMap>>,

    /// Hands out SSTable generations
    pub generations: GenerationCounter,

    /// Stop signal raised when the tree shuts down
    pub stop_signal: StopSignal,

    /// Counter of live background threads
    pub active_background_threads: Arc<AtomicUsize>,
}

impl Drop for TreeInner {
    fn drop(&mut self) {
        log::trace!("Dropping TreeInner");

        self.stop_signal.send();

        while self
            .active_background_threads
            .load(std::sync::atomic::Ordering::Relaxed)
            > 0
        {
            std::thread::sleep(std::time::Duration::from_micros(100));
        }

        let tables = self.sstables.read().expect("lock is poisoned");

        for table in tables.values() {
            table.close();
        }
    }
}
