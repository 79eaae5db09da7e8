use super::{writer::Writer, SsTable};
use crate::record::RecordReader;
use std::{cmp::Ordering, fs::File, io::BufReader, path::Path};

/// Merges two sorted tables into a new table at `dest`, the newer side
/// winning on key collisions
///
/// Tombstones in the newer table survive into the output: they may still
/// shadow records in tables older than `older`, so a pairwise merge never
/// drops them. The destination is written with exclusive-create semantics
/// and removed again if anything goes wrong.
pub fn merge(older: &SsTable, newer: &SsTable, dest: &Path) -> crate::Result<SsTable> {
    // Pin both inputs for the duration of the merge
    let _older_guard = older.file.read().expect("lock is poisoned");
    let _newer_guard = newer.file.read().expect("lock is poisoned");

    let writer = Writer::new(dest)?;

    let result = merge_into(writer, older.path(), newer.path()).and_then(|()| SsTable::open(dest));

    if result.is_err() {
        log::warn!("merge: removing partial file {}", dest.display());
        let _ = std::fs::remove_file(dest);
    }

    result
}

fn merge_into(mut writer: Writer, older: &Path, newer: &Path) -> crate::Result<()> {
    let mut older_records = RecordReader::new(BufReader::new(File::open(older)?));
    let mut newer_records = RecordReader::new(BufReader::new(File::open(newer)?));

    let mut next_older = older_records.next().transpose()?;
    let mut next_newer = newer_records.next().transpose()?;

    loop {
        match (next_older.take(), next_newer.take()) {
            (None, None) => break,

            (Some(record), None) => {
                writer.write(&record)?;
                next_older = older_records.next().transpose()?;
            }

            (None, Some(record)) => {
                writer.write(&record)?;
                next_newer = newer_records.next().transpose()?;
            }

            (Some(older_record), Some(newer_record)) => {
                match older_record.key.cmp(&newer_record.key) {
                    Ordering::Less => {
                        writer.write(&older_record)?;
                        next_older = older_records.next().transpose()?;
                        next_newer = Some(newer_record);
                    }
                    Ordering::Greater => {
                        writer.write(&newer_record)?;
                        next_newer = newer_records.next().transpose()?;
                        next_older = Some(older_record);
                    }
                    Ordering::Equal => {
                        // Same key in both runs: the newer record wins
                        writer.write(&newer_record)?;
                        next_older = older_records.next().transpose()?;
                        next_newer = newer_records.next().transpose()?;
                    }
                }
            }
        }
    }

    writer.finish()
}
