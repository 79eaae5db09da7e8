use crate::Tree;
use std::path::{Path, PathBuf};

const DEFAULT_FILE_FOLDER: &str = ".silt.data";

/// Tree configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Folder path the tree lives in
    pub path: PathBuf,

    /// Entry count at which the memtable is flushed into an SSTable
    pub max_memtable_entries: usize,

    /// Table count above which a merge pass pairs tables up
    pub max_sstables: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: DEFAULT_FILE_FOLDER.into(),
            max_memtable_entries: 100,
            max_sstables: 8,
        }
    }
}

impl Config {
    /// Initializes a new config
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().into(),
            ..Default::default()
        }
    }

    /// Sets the number of entries the memtable may buffer before it is
    /// flushed to disk.
    ///
    /// Defaults to 100.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    #[must_use]
    pub fn max_memtable_entries(mut self, n: usize) -> Self {
        assert!(n > 0);

        self.max_memtable_entries = n;
        self
    }

    /// Sets the number of SSTables that may amass before a merge pass
    /// pairs them up.
    ///
    /// Defaults to 8.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    #[must_use]
    pub fn max_sstables(mut self, n: usize) -> Self {
        assert!(n > 0);

        self.max_sstables = n;
        self
    }

    /// Opens an existing tree using the config.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs or no tree exists at the
    /// configured path.
    pub fn open(self) -> crate::Result<Tree> {
        Tree::open(self)
    }

    /// Creates a new, empty tree using the config.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs or a tree already exists at
    /// the configured path.
    pub fn create_new(self) -> crate::Result<Tree> {
        Tree::create_new(self)
    }
}
