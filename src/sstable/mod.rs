pub mod index;
pub mod merge;
pub mod writer;

use crate::{
    memtable::MemTable,
    record::{Record, RecordReader},
};
use self::index::SparseIndex;
use self::writer::Writer;
use std::{
    fs::File,
    io::{BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

/// An immutable on-disk run of records, sorted and unique by key
///
/// Carries a sparse in-memory index and a retained read-only file handle.
/// Lookups take the handle lock shared, close and erase take it
/// exclusively, so a table can never disappear under a running lookup.
pub struct SsTable {
    path: PathBuf,
    index: SparseIndex,

    /// Lookups hold the outer lock shared and serialize on the inner one;
    /// close and erase hold the outer lock exclusively
    file: RwLock<Option<Mutex<File>>>,
}

impl SsTable {
    /// Writes the memtable into a new file at `path` and opens the result.
    ///
    /// The file is created with exclusive-create semantics; on any failure
    /// after creation the partial file is removed.
    pub fn from_memtable(path: &Path, memtable: &MemTable) -> crate::Result<Self> {
        let writer = Writer::new(path)?;

        let result = write_memtable(writer, memtable).and_then(|()| Self::open(path));

        if result.is_err() {
            log::warn!("sstable: removing partial file {}", path.display());
            let _ = std::fs::remove_file(path);
        }

        result
    }

    /// Opens an existing SSTable file, scanning it once to build the
    /// sparse index.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let index = SparseIndex::from_file(path)?;
        let file = File::open(path)?;

        Ok(Self {
            path: path.into(),
            index,
            file: RwLock::new(Some(Mutex::new(file))),
        })
    }

    /// Point lookup
    ///
    /// Returns the record for the key, tombstones included; the caller
    /// decides what a tombstone means for its search. `None` means the key
    /// is not in this table.
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<Option<Record>> {
        let key = key.as_ref();

        if !self.index.contains(key) {
            return Ok(None);
        }

        let guard = self.file.read().expect("lock is poisoned");

        let Some(file) = guard.as_ref() else {
            // Closed concurrently; the tree no longer references this table
            return Ok(None);
        };

        let mut file = file.lock().expect("lock is poisoned");
        file.seek(SeekFrom::Start(self.index.start_offset(key)))?;

        for record in RecordReader::new(BufReader::new(&mut *file)) {
            let record = record?;

            if &*record.key == key {
                return Ok(Some(record));
            }

            // Keys are sorted, the wanted one cannot come anymore
            if &*record.key > key {
                break;
            }
        }

        Ok(None)
    }

    /// Releases the file handle; the table is unusable afterwards.
    pub fn close(&self) {
        let mut guard = self.file.write().expect("lock is poisoned");
        guard.take();

        log::trace!("sstable: closed {}", self.path.display());
    }

    /// Closes the table and deletes its file.
    pub fn erase(&self) -> crate::Result<()> {
        let mut guard = self.file.write().expect("lock is poisoned");
        guard.take();

        log::debug!("sstable: erasing {}", self.path.display());
        std::fs::remove_file(&self.path)?;

        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

fn write_memtable(mut writer: Writer, memtable: &MemTable) -> crate::Result<()> {
    for entry in &memtable.items {
        writer.write(entry.value())?;
    }

    writer.finish()
}
