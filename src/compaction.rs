use crate::{
    file::sstable_path,
    generation::{Generation, GenerationCounter},
    sstable::merge::merge,
    tree_inner::SsTableMap,
};
use std::{path::Path, sync::Arc};

/// Runs one pairwise merge pass if the table count exceeds the bound
///
/// Generations are paired ascending, oldest two first; every pair is
/// merged into a brand-new file at a freshly allocated generation, which
/// then replaces the newer input in the map while the older input is
/// dropped. With an odd table count the newest table is left alone.
///
/// The caller holds the map exclusively, so lookups never observe a
/// half-swapped map and no table is erased mid-probe.
pub fn maybe_merge(
    folder: &Path,
    generations: &GenerationCounter,
    max_sstables: usize,
    sstables: &mut SsTableMap,
) -> crate::Result<()> {
    if sstables.len() <= max_sstables {
        return Ok(());
    }

    let ids: Vec<Generation> = sstables.keys().copied().collect();

    for pair in ids.chunks(2) {
        let &[older_id, newer_id] = pair else {
            continue;
        };

        let older = sstables
            .get(&older_id)
            .cloned()
            .expect("table was just listed");
        let newer = sstables
            .get(&newer_id)
            .cloned()
            .expect("table was just listed");

        let output_id = generations.next();
        let output_path = sstable_path(folder, output_id);

        log::debug!("compaction: merge {older_id} + {newer_id} -> {output_id}");

        let merged = merge(&older, &newer, &output_path)?;

        sstables.insert(newer_id, Arc::new(merged));
        sstables.remove(&older_id);

        older.erase()?;
        newer.erase()?;

        log::trace!("compaction: merge {older_id} + {newer_id} -> {output_id} done");
    }

    Ok(())
}
