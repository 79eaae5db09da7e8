use silt::Config;
use test_log::test;

#[test]
fn tree_reload_simple() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).create_new()?;
        tree.insert("alpha", "1")?;
        assert_eq!(Some("1".as_bytes().into()), tree.get("alpha")?);
        tree.close();
    }

    let tree = Config::new(&folder).open()?;
    assert_eq!(Some("1".as_bytes().into()), tree.get("alpha")?);

    Ok(())
}

#[test]
fn tree_reload_bulk() -> silt::Result<()> {
    const ITEM_COUNT: usize = 250;
    const REMOVE_COUNT: usize = 80;

    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).create_new()?;

        for i in 0..ITEM_COUNT {
            tree.insert(format!("key_{i:04}"), format!("value_{i:04}"))?;
        }

        // 250 inserts with the default bound of 100 crossed it twice
        assert!(tree.sstable_count() >= 2);

        for i in 0..REMOVE_COUNT {
            tree.remove(format!("key_{i:04}"))?;
        }

        tree.close();
    }

    let tree = Config::new(&folder).open()?;

    for i in 0..ITEM_COUNT {
        let value = tree.get(format!("key_{i:04}"))?;

        if i < REMOVE_COUNT {
            assert!(value.is_none(), "key_{i:04} should be removed");
        } else {
            assert_eq!(Some(format!("value_{i:04}").as_bytes().into()), value);
        }
    }

    Ok(())
}

#[test]
fn tree_reload_keeps_tombstones() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).max_memtable_entries(4).create_new()?;

        tree.insert("a", "1")?;
        tree.insert("b", "2")?;
        tree.insert("c", "3")?;
        tree.insert("d", "4")?;

        // The values sit in a segment now; the tombstone only in the log
        tree.remove("b")?;
        tree.close();
    }

    let tree = Config::new(&folder).open()?;

    assert_eq!(Some("1".as_bytes().into()), tree.get("a")?);
    assert!(tree.get("b")?.is_none());
    assert_eq!(Some("3".as_bytes().into()), tree.get("c")?);

    Ok(())
}

#[test]
fn tree_reload_flushes_log() -> silt::Result<()> {
    const ITEM_COUNT: usize = 20;

    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder)
            .max_memtable_entries(1_000)
            .create_new()?;

        for i in 0..ITEM_COUNT {
            tree.insert(format!("key_{i:04}"), "value")?;
        }

        // Everything is still buffered, nothing was flushed
        assert_eq!(0, tree.sstable_count());
        tree.close();
    }

    // Reopening flushes the replayed records before truncating the log
    let tree = Config::new(&folder).open()?;

    assert_eq!(1, tree.sstable_count());

    for i in 0..ITEM_COUNT {
        assert!(tree.get(format!("key_{i:04}"))?.is_some());
    }

    Ok(())
}

#[test]
fn tree_reload_twice() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).create_new()?;
        tree.insert("a", "1")?;
        tree.insert("b", "2")?;
        tree.close();
    }

    {
        // Nothing is written in this session at all
        let tree = Config::new(&folder).open()?;
        assert_eq!(Some("1".as_bytes().into()), tree.get("a")?);
        tree.close();
    }

    let tree = Config::new(&folder).open()?;

    assert_eq!(Some("1".as_bytes().into()), tree.get("a")?);
    assert_eq!(Some("2".as_bytes().into()), tree.get("b")?);

    Ok(())
}

#[test]
fn tree_create_new_refuses_existing() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    let tree = Config::new(&folder).create_new()?;
    tree.close();
    drop(tree);

    assert!(Config::new(&folder).create_new().is_err());

    Ok(())
}

#[test]
fn tree_open_requires_existing() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    assert!(Config::new(&folder).open().is_err());

    Ok(())
}
