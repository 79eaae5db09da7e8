use crate::{
    compaction,
    config::Config,
    file::{self, sstable_path, WAL_FILE},
    generation::GenerationCounter,
    memtable::MemTable,
    record::{Record, UserValue, ValueType},
    sstable::SsTable,
    stop_signal::StopSignal,
    tree_inner::{SsTableMap, TreeInner},
    wal::Wal,
};
use std::{
    sync::{atomic::AtomicUsize, Arc, Mutex, RwLock},
    time::Duration,
};

/// How long the merge worker naps when there is nothing to do
const WORKER_IDLE_BACKOFF: Duration = Duration::from_millis(250);

fn ignore_tombstone_value(record: Record) -> Option<Record> {
    if record.is_tombstone() {
        None
    } else {
        Some(record)
    }
}

/// A persistent, embeddable log-structured merge tree
///
/// Keys and values are arbitrary non-empty byte arrays. Every mutation is
/// appended to a write-ahead log before it is applied in memory, so
/// acknowledged writes survive a reopen. The handle is cheap to clone and
/// can be shared across threads; mutations serialize internally, lookups
/// run concurrently.
#[derive(Clone)]
pub struct Tree(Arc<TreeInner>);

impl std::ops::Deref for Tree {
    type Target = TreeInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Tree {
    /// Creates a new, empty tree in the given directory.
    ///
    /// The directory is created if missing.
    ///
    /// # Examples
    ///
    /// ```
    /// # let folder = tempfile::tempdir()?;
    /// use silt::Config;
    ///
    /// let tree = Config::new(&folder).create_new()?;
    /// tree.insert("a", "abc")?;
    /// #
    /// # Ok::<(), silt::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs or a write-ahead log
    /// already exists in the directory.
    pub fn create_new(config: Config) -> crate::Result<Self> {
        log::debug!("Creating LSM-tree at {}", config.path.display());

        std::fs::create_dir_all(&config.path)?;

        let wal = Wal::create_new(config.path.join(WAL_FILE))?;

        let tree = Self::from_parts(
            config,
            MemTable::default(),
            SsTableMap::new(),
            GenerationCounter::default(),
            wal,
        );
        tree.spawn_merge_worker()?;

        Ok(tree)
    }

    /// Opens an existing tree in the given directory.
    ///
    /// Recovers the previous state: scans the directory for SSTables and
    /// replays the write-ahead log. Replayed records are flushed into a
    /// fresh SSTable right away; the log is truncated for reuse only
    /// after that flush has succeeded.
    ///
    /// # Examples
    ///
    /// ```
    /// # let folder = tempfile::tempdir()?;
    /// use silt::Config;
    ///
    /// let tree = Config::new(&folder).create_new()?;
    /// tree.insert("a", "abc")?;
    ///
    /// tree.close();
    /// drop(tree);
    ///
    /// let tree = Config::new(&folder).open()?;
    /// assert_eq!(Some("abc".as_bytes().into()), tree.get("a")?);
    /// #
    /// # Ok::<(), silt::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, no write-ahead log exists
    /// in the directory, or an SSTable is corrupt.
    pub fn open(config: Config) -> crate::Result<Self> {
        log::debug!("Opening LSM-tree at {}", config.path.display());

        std::fs::create_dir_all(&config.path)?;

        let generations = GenerationCounter::default();
        let mut sstables = Self::scan_sstables(&config, &generations)?;

        let wal_path = config.path.join(WAL_FILE);
        let mut memtable = Wal::replay(&wal_path)?;

        // Replayed records only exist in the log, which is truncated
        // below; they are flushed first so a later reopen still sees them
        if !memtable.is_empty() {
            let generation = generations.next();
            let path = sstable_path(&config.path, generation);

            log::debug!(
                "recovery: flushing {} replayed records to {}",
                memtable.len(),
                path.display()
            );

            let table = SsTable::from_memtable(&path, &memtable)?;
            sstables.insert(generation, Arc::new(table));

            compaction::maybe_merge(
                &config.path,
                &generations,
                config.max_sstables,
                &mut sstables,
            )?;

            memtable = MemTable::default();
        }

        let wal = Wal::open_truncated(&wal_path)?;

        let tree = Self::from_parts(config, memtable, sstables, generations, wal);
        tree.spawn_merge_worker()?;

        Ok(tree)
    }

    /// Inserts a key-value pair, overwriting any previous value.
    ///
    /// # Examples
    ///
    /// ```
    /// # let folder = tempfile::tempdir()?;
    /// use silt::Config;
    ///
    /// let tree = Config::new(&folder).create_new()?;
    /// tree.insert("a", "old")?;
    /// tree.insert("a", "new")?;
    ///
    /// assert_eq!(Some("new".as_bytes().into()), tree.get("a")?);
    /// #
    /// # Ok::<(), silt::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Will return [`crate::Error::EmptyKey`] or
    /// [`crate::Error::EmptyValue`] for empty input, or `Err` if an IO
    /// error occurs.
    pub fn insert<K: AsRef<[u8]>, V: AsRef<[u8]>>(&self, key: K, value: V) -> crate::Result<()> {
        if key.as_ref().is_empty() {
            return Err(crate::Error::EmptyKey);
        }

        if value.as_ref().is_empty() {
            return Err(crate::Error::EmptyValue);
        }

        let mut memtable = self.active_memtable.write().expect("lock is poisoned");

        let record = Record::new(key.as_ref(), value.as_ref(), ValueType::Value);

        self.wal.lock().expect("lock is poisoned").append(&record)?;
        memtable.insert(record);

        self.flush_if_full(&mut memtable)
    }

    /// Removes the key by writing a tombstone for it.
    ///
    /// The tombstone shadows any value the key may still have in older
    /// SSTables; removing an absent key is fine.
    ///
    /// # Errors
    ///
    /// Will return [`crate::Error::EmptyKey`] for an empty key, or `Err`
    /// if an IO error occurs.
    pub fn remove<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<()> {
        if key.as_ref().is_empty() {
            return Err(crate::Error::EmptyKey);
        }

        let mut memtable = self.active_memtable.write().expect("lock is poisoned");

        let record = Record::new(key.as_ref(), vec![], ValueType::Tombstone);

        self.wal.lock().expect("lock is poisoned").append(&record)?;
        memtable.insert(record);

        self.flush_if_full(&mut memtable)
    }

    /// Retrieves the value for the key.
    ///
    /// Probes the memtable first, then the SSTables from newest to
    /// oldest; a tombstone anywhere along the way ends the search with
    /// `None`.
    ///
    /// # Errors
    ///
    /// Will return [`crate::Error::EmptyKey`] for an empty key, or `Err`
    /// if an IO error occurs or a table is corrupt.
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<Option<UserValue>> {
        let key = key.as_ref();

        if key.is_empty() {
            return Err(crate::Error::EmptyKey);
        }

        let memtable = self.active_memtable.read().expect("lock is poisoned");

        if let Some(record) = memtable.get(key) {
            return Ok(ignore_tombstone_value(record).map(|record| record.value));
        }

        let sstables = self.sstables.read().expect("lock is poisoned");

        // Newest first; the first table that knows the key decides
        for table in sstables.values().rev() {
            if let Some(record) = table.get(key)? {
                return Ok(ignore_tombstone_value(record).map(|record| record.value));
            }
        }

        Ok(None)
    }

    /// Returns `true` if the tree holds the key.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn contains_key<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<bool> {
        self.get(key).map(|value| value.is_some())
    }

    /// Amount of SSTables currently registered.
    #[doc(hidden)]
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().expect("lock is poisoned").len()
    }

    /// Shuts the tree down: stops background work and closes every file
    /// handle.
    ///
    /// Idempotent; lookups miss afterwards. Dropping the last handle
    /// performs the same shutdown implicitly.
    pub fn close(&self) {
        log::debug!("Closing LSM-tree at {}", self.config.path.display());

        self.stop_signal.send();

        while self
            .active_background_threads
            .load(std::sync::atomic::Ordering::Relaxed)
            > 0
        {
            std::thread::sleep(Duration::from_micros(100));
        }

        let mut sstables = self.sstables.write().expect("lock is poisoned");

        for table in sstables.values() {
            table.close();
        }

        sstables.clear();
    }

    fn from_parts(
        config: Config,
        memtable: MemTable,
        sstables: SsTableMap,
        generations: GenerationCounter,
        wal: Wal,
    ) -> Self {
        Self(Arc::new(TreeInner {
            config,
            active_memtable: RwLock::new(memtable),
            wal: Mutex::new(wal),
            sstables: Arc::new(RwLock::new(sstables)),
            generations,
            stop_signal: StopSignal::default(),
            active_background_threads: Arc::new(AtomicUsize::new(0)),
        }))
    }

    fn scan_sstables(
        config: &Config,
        generations: &GenerationCounter,
    ) -> crate::Result<SsTableMap> {
        let mut sstables = SsTableMap::new();

        for dir_entry in std::fs::read_dir(&config.path)? {
            let dir_entry = dir_entry?;

            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let file_name = dir_entry.file_name();

            let Some(generation) = file_name.to_str().and_then(file::parse_sstable_file_name)
            else {
                continue;
            };

            log::trace!("recovery: opening sstable {}", dir_entry.path().display());

            let table = SsTable::open(&dir_entry.path())?;
            sstables.insert(generation, Arc::new(table));
            generations.observe(generation);
        }

        log::debug!("recovery: found {} sstables", sstables.len());

        Ok(sstables)
    }

    /// Flushes the memtable into a fresh SSTable once it has reached the
    /// configured bound.
    ///
    /// Runs on the mutating thread while the write exclusion is held. The
    /// memtable is reset and the log truncated only after everything else
    /// succeeded, so a failed flush leaves both untouched and the
    /// triggering mutation can simply be retried.
    fn flush_if_full(&self, memtable: &mut MemTable) -> crate::Result<()> {
        if memtable.len() < self.config.max_memtable_entries {
            return Ok(());
        }

        let generation = self.generations.next();
        let path = sstable_path(&self.config.path, generation);

        log::debug!(
            "flush: writing {} records to {}",
            memtable.len(),
            path.display()
        );

        let table = SsTable::from_memtable(&path, memtable)?;

        log::trace!("flush: acquiring sstable map write lock");
        let mut sstables = self.sstables.write().expect("lock is poisoned");

        sstables.insert(generation, Arc::new(table));

        compaction::maybe_merge(
            &self.config.path,
            &self.generations,
            self.config.max_sstables,
            &mut sstables,
        )?;

        drop(sstables);

        *memtable = MemTable::default();
        self.wal.lock().expect("lock is poisoned").truncate()?;

        log::debug!("flush: memtable flushed into generation {generation}");

        Ok(())
    }

    fn spawn_merge_worker(&self) -> crate::Result<()> {
        let folder = self.config.path.clone();
        let max_sstables = self.config.max_sstables;
        let sstables = self.sstables.clone();
        let generations = self.generations.clone();
        let stop_signal = self.stop_signal.clone();
        let thread_counter = self.active_background_threads.clone();

        thread_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let result = std::thread::Builder::new().name("merge".into()).spawn({
            let thread_counter = thread_counter.clone();

            move || {
                while !stop_signal.is_stopped() {
                    let idle = {
                        let mut tables = sstables.write().expect("lock is poisoned");

                        if tables.len() > max_sstables {
                            match compaction::maybe_merge(
                                &folder,
                                &generations,
                                max_sstables,
                                &mut tables,
                            ) {
                                Ok(()) => false,
                                Err(e) => {
                                    log::error!("merge worker: merge pass failed: {e:?}");
                                    true
                                }
                            }
                        } else {
                            true
                        }
                    };

                    if idle {
                        std::thread::sleep(WORKER_IDLE_BACKOFF);
                    }
                }

                log::trace!("merge worker: exiting because tree is closing");
                thread_counter.fetch_sub(1, std::sync::atomic::Ordering::AcqRel);
            }
        });

        if result.is_err() {
            thread_counter.fetch_sub(1, std::sync::atomic::Ordering::AcqRel);
        }

        result.map(|_| ()).map_err(Into::into)
    }
}
