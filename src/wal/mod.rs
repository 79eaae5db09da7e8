use crate::{
    memtable::MemTable,
    record::{Record, RecordReader},
    serde::Serializable,
};
use std::{
    fs::{File, OpenOptions},
    io::{BufReader, Seek, SeekFrom, Write},
    path::Path,
};

/// Single-writer write-ahead log
///
/// Every mutation is appended here before it touches the memtable,
/// tombstones included, so the memtable can be rebuilt after a crash. The
/// log is truncated once its contents have been flushed into an SSTable.
///
/// Appends are not fsynced: an acknowledged write survives a process
/// crash, but not power loss.
pub struct Wal {
    file: File,
}

impl Wal {
    /// Creates a fresh log, failing if one already exists.
    pub fn create_new<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = OpenOptions::new().create_new(true).write(true).open(path)?;

        Ok(Self { file })
    }

    /// Reopens the log for appending, discarding its previous contents.
    ///
    /// Only called after [`Wal::replay`], once any flush the replayed
    /// records required has succeeded.
    pub fn open_truncated<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = OpenOptions::new().write(true).truncate(true).open(path)?;

        Ok(Self { file })
    }

    /// Reads the log from the start, building the memtable it describes.
    ///
    /// Replay ends at the first malformed record: a torn tail is expected
    /// after a crash mid-append and is discarded when the log is reopened
    /// for appending.
    pub fn replay<P: AsRef<Path>>(path: P) -> crate::Result<MemTable> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let memtable = MemTable::default();
        let mut count = 0usize;

        for record in RecordReader::new(reader) {
            match record {
                Ok(record) => {
                    memtable.insert(record);
                    count += 1;
                }
                Err(e) => {
                    log::warn!(
                        "wal: stopping replay after {count} records because of malformed content: {e:?}"
                    );
                    break;
                }
            }
        }

        log::debug!("wal: replayed {count} records into {} keys", memtable.len());

        Ok(memtable)
    }

    /// Appends one record.
    ///
    /// The record is serialized into a single buffer and handed to the
    /// operating system in one write, so no partially written state
    /// lingers in user space between appends.
    pub fn append(&mut self, record: &Record) -> crate::Result<()> {
        let mut bytes = Vec::new();
        record.serialize(&mut bytes)?;

        self.file.write_all(&bytes)?;

        Ok(())
    }

    /// Empties the log after a flush.
    pub fn truncate(&mut self) -> crate::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;

        Ok(())
    }
}
