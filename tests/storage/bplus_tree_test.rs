use std::collections::BTreeMap;

use lembar::{
    storage::{bplus_tree::BTreeIndex, node::MAX_VALUE_SIZE, page_store::PageStore},
    types::{RowId, error::DatabaseError},
    utils::mock::TempDatabase,
};
use proptest::prelude::*;

fn value_for(key: RowId, len: usize) -> Vec<u8> {
    let seed = key.to_le_bytes();
    (0..len).map(|i| seed[i % 8] ^ (i as u8)).collect()
}

fn collect(index: &BTreeIndex<'_>, low: RowId, high: RowId) -> Vec<(RowId, Vec<u8>)> {
    index.scan(low, high).collect::<Result<Vec<_>, _>>().unwrap()
}

fn new_tree(store: &mut PageStore) -> u64 {
    BTreeIndex::create(store).unwrap()
}

#[test]
fn test_empty_tree() {
    let temp_db = TempDatabase::with_prefix("btree_empty").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    let mut index = BTreeIndex::open(&mut store, root);

    assert_eq!(index.lookup(1).unwrap(), None);
    assert_eq!(index.last_key().unwrap(), None);
    assert_eq!(index.delete(1).unwrap(), None);
    assert!(collect(&index, RowId::MIN, RowId::MAX).is_empty());
}

#[test]
fn test_insert_overwrite_returns_previous() {
    let temp_db = TempDatabase::with_prefix("btree_overwrite").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    let mut index = BTreeIndex::open(&mut store, root);

    assert_eq!(index.insert(7, b"first".to_vec()).unwrap(), None);
    assert_eq!(
        index.insert(7, b"second".to_vec()).unwrap(),
        Some(b"first".to_vec())
    );
    assert_eq!(index.lookup(7).unwrap(), Some(b"second".to_vec()));
    assert_eq!(collect(&index, RowId::MIN, RowId::MAX).len(), 1);
}

#[test]
fn test_value_size_limit() {
    let temp_db = TempDatabase::with_prefix("btree_limit").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    let mut index = BTreeIndex::open(&mut store, root);

    index.insert(1, vec![7; MAX_VALUE_SIZE]).unwrap();
    let result = index.insert(2, vec![7; MAX_VALUE_SIZE + 1]);
    assert!(matches!(
        result,
        Err(DatabaseError::RowTooLarge { size, max }) if size == MAX_VALUE_SIZE + 1 && max == MAX_VALUE_SIZE
    ));
    assert_eq!(index.lookup(2).unwrap(), None);
}

#[test]
fn test_range_scan_bounds() {
    let temp_db = TempDatabase::with_prefix("btree_range").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    let mut index = BTreeIndex::open(&mut store, root);

    for key in (0..2000).step_by(2) {
        index.insert(key, value_for(key, 40)).unwrap();
    }

    let keys: Vec<RowId> = collect(&index, 101, 120).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![102, 104, 106, 108, 110, 112, 114, 116, 118, 120]);

    assert_eq!(collect(&index, 500, 500).len(), 1);
    assert!(collect(&index, 501, 501).is_empty());
    assert!(collect(&index, 900, 100).is_empty());
    assert!(collect(&index, 5000, RowId::MAX).is_empty());
    assert_eq!(collect(&index, RowId::MIN, 0).len(), 1);
}

#[test]
fn test_root_page_id_survives_splits_and_collapse() {
    let temp_db = TempDatabase::with_prefix("btree_root").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    let pages_before = store.page_count();

    {
        let mut index = BTreeIndex::open(&mut store, root);
        for key in 1..=3000 {
            index.insert(key, value_for(key, 100)).unwrap();
        }
        assert_eq!(index.root_page_id(), root);
        assert_eq!(index.last_key().unwrap(), Some(3000));
    }
    let grown_pages = store.page_count();
    assert!(grown_pages > pages_before + 50);

    {
        let mut index = BTreeIndex::open(&mut store, root);
        for key in 1..=3000 {
            assert_eq!(index.delete(key).unwrap(), Some(value_for(key, 100)));
        }
        assert!(collect(&index, RowId::MIN, RowId::MAX).is_empty());
        assert_eq!(index.root_page_id(), root);
    }

    // Every page but the root went back to the free list.
    assert_eq!(store.free_page_count(), grown_pages - pages_before);
}

#[test]
fn test_destroy_frees_every_page() {
    let temp_db = TempDatabase::with_prefix("btree_destroy").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let root = new_tree(&mut store);
    {
        let mut index = BTreeIndex::open(&mut store, root);
        for key in 0..500 {
            index.insert(key, value_for(key, 200)).unwrap();
        }
    }
    let live_pages = store.page_count() - 2;

    let freed = BTreeIndex::open(&mut store, root).destroy().unwrap();
    assert_eq!(freed as u64, live_pages);
    assert_eq!(store.free_page_count(), live_pages);
    assert!(matches!(
        store.read(root),
        Err(DatabaseError::InvalidPageId(_))
    ));
}

#[test]
fn test_tree_survives_flush_and_reopen() {
    let temp_db = TempDatabase::with_prefix("btree_reopen").unwrap();
    let root = {
        let mut store = temp_db.open_store().unwrap();
        let root = new_tree(&mut store);
        {
            let mut index = BTreeIndex::open(&mut store, root);
            for key in (0..800).rev() {
                index.insert(key * 3, value_for(key, 64)).unwrap();
            }
        }
        store.flush().unwrap();
        root
    };

    let mut store = temp_db.open_store().unwrap();
    let index = BTreeIndex::open(&mut store, root);
    let entries = collect(&index, RowId::MIN, RowId::MAX);
    assert_eq!(entries.len(), 800);
    assert!(entries.windows(2).all(|pair| pair[0].0 < pair[1].0));
    assert_eq!(index.lookup(42 * 3).unwrap(), Some(value_for(42, 64)));
}

#[derive(Debug, Clone)]
enum Op {
    Insert(RowId, usize),
    Delete(RowId),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-300i64..300, 0usize..400).prop_map(|(k, len)| Op::Insert(k, len)),
        2 => (-300i64..300).prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_tree_matches_ordered_map(ops in prop::collection::vec(op_strategy(), 1..600)) {
        let temp_db = TempDatabase::with_prefix("btree_prop").unwrap();
        let mut store = temp_db.open_store().unwrap();
        let root = new_tree(&mut store);
        let mut index = BTreeIndex::open(&mut store, root);
        let mut model: BTreeMap<RowId, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, len) => {
                    let value = value_for(key, len);
                    let previous = index.insert(key, value.clone()).unwrap();
                    prop_assert_eq!(previous, model.insert(key, value));
                }
                Op::Delete(key) => {
                    let removed = index.delete(key).unwrap();
                    prop_assert_eq!(removed, model.remove(&key));
                }
            }
        }

        let scanned = collect(&index, RowId::MIN, RowId::MAX);
        let expected: Vec<(RowId, Vec<u8>)> = model.clone().into_iter().collect();
        prop_assert_eq!(scanned, expected);
        prop_assert_eq!(index.last_key().unwrap(), model.keys().next_back().copied());

        for key in [-300, -1, 0, 1, 150, 299] {
            prop_assert_eq!(index.lookup(key).unwrap(), model.get(&key).cloned());
        }
    }

    #[test]
    fn prop_range_scan_matches_model(
        keys in prop::collection::btree_set(-1000i64..1000, 0..400),
        low in -1100i64..1100,
        span in 0i64..600,
    ) {
        let temp_db = TempDatabase::with_prefix("btree_prop_range").unwrap();
        let mut store = temp_db.open_store().unwrap();
        let root = new_tree(&mut store);
        let mut index = BTreeIndex::open(&mut store, root);
        for &key in &keys {
            index.insert(key, value_for(key, 120)).unwrap();
        }

        let high = low + span;
        let scanned: Vec<RowId> = collect(&index, low, high).into_iter().map(|(k, _)| k).collect();
        let expected: Vec<RowId> = keys.range(low..=high).copied().collect();
        prop_assert_eq!(scanned, expected);
    }
}
