use silt::Config;
use std::io::Write;
use test_log::test;

#[test]
fn wal_recovery_after_crash() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).create_new()?;

        tree.insert("a", "1")?;
        tree.insert("b", "2")?;
        tree.remove("a")?;

        // Simulate a crash: the tree is never shut down
        std::mem::forget(tree);
    }

    let tree = Config::new(&folder).open()?;

    assert!(tree.get("a")?.is_none());
    assert_eq!(Some("2".as_bytes().into()), tree.get("b")?);

    Ok(())
}

#[test]
fn wal_recovery_discards_torn_tail() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let tree = Config::new(&folder).create_new()?;
        tree.insert("a", "1")?;
        tree.insert("b", "2")?;
        tree.close();
    }

    // A write torn by a crash leaves a partial record at the end of the log
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(folder.path().join("lsm.log"))?;
    file.write_all(&[0xAB; 321])?;
    drop(file);

    let tree = Config::new(&folder).open()?;

    assert_eq!(Some("1".as_bytes().into()), tree.get("a")?);
    assert_eq!(Some("2".as_bytes().into()), tree.get("b")?);

    // The torn tail is gone; the tree keeps working
    tree.insert("c", "3")?;
    tree.close();
    drop(tree);

    let tree = Config::new(&folder).open()?;
    assert_eq!(Some("3".as_bytes().into()), tree.get("c")?);

    Ok(())
}

#[test]
fn wal_recovery_garbage_only_log() -> silt::Result<()> {
    let folder = tempfile::tempdir()?;

    std::fs::create_dir_all(folder.path())?;
    std::fs::write(folder.path().join("lsm.log"), [0xCD; 2_000])?;

    // A log full of garbage opens as an empty tree
    let tree = Config::new(&folder).open()?;

    assert!(tree.get("a")?.is_none());

    tree.insert("a", "1")?;
    assert_eq!(Some("1".as_bytes().into()), tree.get("a")?);

    Ok(())
}
