use crate::record::{RecordReader, UserKey};
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

/// Every n-th record of an SSTable is sampled into the sparse index
const INDEX_INTERVAL: usize = 512;

/// Sparse in-memory index over one SSTable file
///
/// Stores the starting offset of every [`INDEX_INTERVAL`]-th record plus
/// the smallest and largest key of the file. Because records are sorted
/// and the index is sparse, a lookup searches for the greatest sample at
/// or below the wanted key and scans forward from its offset; any key not
/// covered by a sample is reachable from the preceding one.
#[derive(Debug, Default)]
pub struct SparseIndex {
    samples: BTreeMap<UserKey, u64>,
    key_range: Option<(UserKey, UserKey)>,
}

impl SparseIndex {
    /// Builds the index by scanning a finished SSTable file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or holds a corrupt record.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut samples = BTreeMap::new();
        let mut first_key: Option<UserKey> = None;
        let mut last_key: Option<UserKey> = None;

        let mut offset = 0u64;

        for (i, record) in RecordReader::new(reader).enumerate() {
            let record = record?;

            if first_key.is_none() {
                first_key = Some(record.key.clone());
            }
            last_key = Some(record.key.clone());

            if i % INDEX_INTERVAL == 0 {
                samples.insert(record.key.clone(), offset);
            }

            offset += record.disk_size();
        }

        Ok(Self {
            samples,
            key_range: first_key.zip(last_key),
        })
    }

    /// Whether the key can be inside the indexed file at all.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.key_range
            .as_ref()
            .is_some_and(|(first, last)| key >= &**first && key <= &**last)
    }

    /// File offset a lookup for `key` should start scanning at.
    #[must_use]
    pub fn start_offset(&self, key: &[u8]) -> u64 {
        let key: UserKey = key.into();

        self.samples
            .range(..=key)
            .next_back()
            .map_or(0, |(_, offset)| *offset)
    }
}
