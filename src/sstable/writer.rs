use crate::{record::Record, serde::Serializable};
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Writes records sequentially into a new SSTable file
///
/// The destination is claimed with exclusive-create semantics, so two
/// writers can never race into the same generation. The finished file is
/// not fsynced.
pub struct Writer {
    file: BufWriter<File>,
    path: PathBuf,
    item_count: usize,
}

impl Writer {
    /// Creates the destination file, failing if it already exists.
    pub fn new<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create_new(true).write(true).open(path)?;

        Ok(Self {
            file: BufWriter::with_capacity(512_000, file),
            path: path.into(),
            item_count: 0,
        })
    }

    /// Writes one record.
    ///
    /// Records have to arrive in strictly ascending key order; both
    /// producers (memtable flush and pairwise merge) emit them that way.
    pub fn write(&mut self, record: &Record) -> crate::Result<()> {
        record.serialize(&mut self.file)?;
        self.item_count += 1;

        Ok(())
    }

    /// Flushes buffered data out to the operating system.
    pub fn finish(mut self) -> crate::Result<()> {
        self.file.flush()?;

        log::debug!(
            "sstable writer: wrote {} records into {}",
            self.item_count,
            self.path.display()
        );

        Ok(())
    }
}
