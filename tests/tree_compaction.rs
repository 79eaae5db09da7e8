use silt::Config;
use test_log::test;

#[test]
fn tree_flush_at_bound() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    let tree = Config::new(&folder).max_memtable_entries(10).create_new()?;

    for i in 0..9 {
        tree.insert(format!("key_{i:02}"), "value")?;
    }
    assert_eq!(0, tree.sstable_count());

    // The tenth entry tips the memtable over
    tree.insert("key_09", "value")?;
    assert_eq!(1, tree.sstable_count());

    // A tombstone counts like any other entry
    for i in 0..9 {
        tree.remove(format!("key_{i:02}"))?;
    }
    assert_eq!(1, tree.sstable_count());

    tree.remove("key_09")?;
    assert_eq!(2, tree.sstable_count());

    Ok(())
}

#[test]
fn tree_merge_caps_table_count() -> silt::Result<()> {
    const ITEM_COUNT: usize = 20;

    let folder = tempfile::tempdir()?;

    // Two entries per segment produces ten segments over the run
    let tree = Config::new(&folder).max_memtable_entries(2).create_new()?;

    for i in 0..ITEM_COUNT {
        tree.insert(format!("key_{i:04}"), format!("value_{i:04}"))?;
    }

    // Merge passes kick in past eight tables and keep the count bounded
    assert!(tree.sstable_count() <= 6, "{} tables", tree.sstable_count());

    for i in 0..ITEM_COUNT {
        assert_eq!(
            Some(format!("value_{i:04}").as_bytes().into()),
            tree.get(format!("key_{i:04}"))?
        );
    }

    Ok(())
}

#[test]
fn tree_merge_keeps_newest_version() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    // Every insert flushes, every second segment triggers a merge
    let tree = Config::new(&folder)
        .max_memtable_entries(1)
        .max_sstables(1)
        .create_new()?;

    tree.insert("a", "1")?;
    tree.insert("b", "2")?;
    tree.insert("a", "3")?;

    assert!(tree.sstable_count() <= 2);

    assert_eq!(Some("3".as_bytes().into()), tree.get("a")?);
    assert_eq!(Some("2".as_bytes().into()), tree.get("b")?);

    Ok(())
}

#[test]
fn tree_merge_keeps_tombstones() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    let tree = Config::new(&folder)
        .max_memtable_entries(1)
        .max_sstables(1)
        .create_new()?;

    tree.insert("a", "1")?;
    tree.insert("b", "2")?;

    // The tombstone segment merges with the value segments
    tree.remove("a")?;

    assert!(tree.get("a")?.is_none());
    assert_eq!(Some("2".as_bytes().into()), tree.get("b")?);

    Ok(())
}

#[test]
fn tree_merge_survives_reload() -> silt::Result<()> {
    const ITEM_COUNT: usize = 30;

    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).max_memtable_entries(2).create_new()?;

        for i in 0..ITEM_COUNT {
            tree.insert(format!("key_{i:04}"), format!("value_{i:04}"))?;
        }

        tree.remove("key_0000")?;
        tree.remove("key_0001")?;

        tree.close();
    }

    let tree = Config::new(&folder).max_memtable_entries(2).open()?;

    assert!(tree.get("key_0000")?.is_none());
    assert!(tree.get("key_0001")?.is_none());

    for i in 2..ITEM_COUNT {
        assert_eq!(
            Some(format!("value_{i:04}").as_bytes().into()),
            tree.get(format!("key_{i:04}"))?
        );
    }

    Ok(())
}
