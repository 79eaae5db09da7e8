use crate::generation::Generation;
use std::path::{Path, PathBuf};

/// File name of the write-ahead log inside the tree folder
pub const WAL_FILE: &str = "lsm.log";

const SSTABLE_PREFIX: &str = "lsm_";
const SSTABLE_SUFFIX: &str = ".sstable";

/// Builds the path of the SSTable file for the given generation.
pub fn sstable_path<P: AsRef<Path>>(folder: P, generation: Generation) -> PathBuf {
    folder
        .as_ref()
        .join(format!("{SSTABLE_PREFIX}{generation}{SSTABLE_SUFFIX}"))
}

/// Extracts the generation out of an SSTable file name
///
/// Returns `None` for anything that does not match `lsm_<digits>.sstable`.
pub fn parse_sstable_file_name(name: &str) -> Option<Generation> {
    let digits = name
        .strip_prefix(SSTABLE_PREFIX)?
        .strip_suffix(SSTABLE_SUFFIX)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}
