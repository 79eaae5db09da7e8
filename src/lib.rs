//! A K.I.S.S. implementation of a persistent, embeddable key-value store,
//! built as a log-structured merge tree (LSM-tree/LSMT).
//!
//! ##### About
//!
//! This crate exports a [`Tree`] that binds string-like keys to
//! string-like values and survives restarts.
//!
//! Writes go into an in-memory write buffer (`MemTable`), mirrored by a
//! write-ahead log so no acknowledged write is lost when the process
//! dies. Once the buffer holds enough entries it is flushed into an
//! immutable, sorted disk segment (SSTable) and the log is truncated.
//! Amassing many segments on disk degrades read performance, so segments
//! are periodically merged pairwise, newest data winning.
//!
//! Because maintaining an efficient structure is deferred to the merge
//! process, writing is very fast (one log append plus one in-memory
//! insert).
//!
//! # Example usage
//!
//! ```
//! use silt::Config;
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! // A tree is a single physical keyspace
//! // and supports a map-like API
//! let tree = Config::new(&folder).create_new()?;
//!
//! // Note compared to the BTreeMap API, operations return a Result<T>
//! // so you can handle I/O errors if they occur
//! tree.insert("my_key", "my_value")?;
//!
//! let item = tree.get("my_key")?;
//! assert_eq!(Some("my_value".as_bytes().into()), item);
//!
//! // Removing a key shadows it, even in older disk segments
//! tree.remove("my_key")?;
//! assert!(tree.get("my_key")?.is_none());
//!
//! // Reopening the tree recovers the previous state
//! tree.close();
//! drop(tree);
//!
//! let tree = Config::new(&folder).open()?;
//! assert!(tree.get("my_key")?.is_none());
//! #
//! # Ok::<(), silt::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]

mod compaction;
mod config;
mod error;
mod file;
mod generation;
mod memtable;
mod record;
mod serde;
mod sstable;
mod stop_signal;
mod tree;
mod tree_inner;
mod wal;

pub use {
    config::Config,
    error::{Error, Result},
    record::{UserKey, UserValue},
    serde::{DeserializeError, SerializeError},
    tree::Tree,
};
