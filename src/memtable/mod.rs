use crate::record::{Record, UserKey};
use crossbeam_skiplist::SkipMap;

/// The memtable buffers the most recent mutation per key until it is
/// flushed into an SSTable
///
/// There is at most one record per key; a newer mutation replaces the
/// older one, tombstones included. The skip list keeps keys sorted, so a
/// flush can emit records in ascending key order directly.
#[derive(Default)]
pub struct MemTable {
    pub(crate) items: SkipMap<UserKey, Record>,
}

impl MemTable {
    /// Returns the latest record for the key, tombstones included
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<Record> {
        self.items
            .get(key.as_ref())
            .map(|entry| entry.value().clone())
    }

    /// Inserts a record, replacing any previous one for the same key
    pub fn insert(&self, record: Record) {
        self.items.insert(record.key.clone(), record);
    }

    /// Count of buffered entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ValueType;
    use test_log::test;

    #[test]
    fn memtable_get() {
        let memtable = MemTable::default();

        let record = Record::new(*b"abc", *b"abc", ValueType::Value);
        memtable.insert(record.clone());

        assert_eq!(Some(record), memtable.get("abc"));
        assert_eq!(None, memtable.get("def"));
    }

    #[test]
    fn memtable_insert_replaces() {
        let memtable = MemTable::default();

        memtable.insert(Record::new(*b"abc", *b"old", ValueType::Value));
        memtable.insert(Record::new(*b"abc", *b"new", ValueType::Value));

        assert_eq!(1, memtable.len());
        assert_eq!(
            Some(Record::new(*b"abc", *b"new", ValueType::Value)),
            memtable.get("abc")
        );
    }

    #[test]
    fn memtable_tombstone_shadows() {
        let memtable = MemTable::default();

        memtable.insert(Record::new(*b"abc", *b"abc", ValueType::Value));
        memtable.insert(Record::new(*b"abc", vec![], ValueType::Tombstone));

        assert_eq!(1, memtable.len());

        let record = memtable.get("abc").map(|record| record.is_tombstone());
        assert_eq!(Some(true), record);
    }

    #[test]
    fn memtable_iterates_sorted() {
        let memtable = MemTable::default();

        memtable.insert(Record::new(*b"banana", *b"2", ValueType::Value));
        memtable.insert(Record::new(*b"apple", *b"1", ValueType::Value));
        memtable.insert(Record::new(*b"cherry", *b"3", ValueType::Value));

        let keys = memtable
            .items
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                UserKey::from(*b"apple"),
                UserKey::from(*b"banana"),
                UserKey::from(*b"cherry"),
            ],
            keys
        );
    }
}
