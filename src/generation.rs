use std::sync::{
    atomic::{
        AtomicU64,
        Ordering::{AcqRel, Release},
    },
    Arc,
};

/// Monotonically increasing identifier of an SSTable
///
/// A table with a higher generation holds newer data and wins on key
/// collisions during lookups.
pub type Generation = u64;

/// Thread-safe generation counter
///
/// Stays at or above the highest generation ever observed or handed out,
/// so freshly created tables can never collide with existing files.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    /// Folds in a generation found on disk.
    pub fn observe(&self, generation: Generation) {
        self.0.fetch_max(generation, AcqRel);
    }

    /// Hands out the next generation.
    ///
    /// Generations are positive and strictly increasing.
    #[must_use]
    pub fn next(&self) -> Generation {
        self.0.fetch_add(1, Release) + 1
    }
}
