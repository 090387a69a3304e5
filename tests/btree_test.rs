//! B+ tree behaviour tests.
//!
//! Most tests use the smallest legal fan-out (4) so a handful of keys is
//! enough to exercise splits, borrows, merges and root changes.

use std::sync::Once;

use bplusdb::{BPlusTree, Error, TreeConfig};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn small_config() -> TreeConfig {
    TreeConfig::default()
        .with_leaf_capacity(4)
        .with_internal_capacity(4)
}

fn create_tree(config: TreeConfig) -> (BPlusTree<u32, u32>, tempfile::TempDir) {
    init_tracing();
    let dir = tempdir().unwrap();
    let tree = BPlusTree::create(dir.path().join("tree.db"), config).unwrap();
    (tree, dir)
}

fn keys(tree: &BPlusTree<u32, u32>) -> Vec<u32> {
    tree.iter().map(|entry| entry.unwrap().0).collect()
}

// ============================================================================
// Splits
// ============================================================================

/// Inserting 1..=9 in order with L = 4: the fifth insert splits 2 + 3.
#[test]
fn test_sequential_insert_splits() {
    let (mut tree, _dir) = create_tree(small_config());

    for k in 1..=4 {
        tree.insert(k, k * 10).unwrap();
    }
    assert_eq!(tree.verify().unwrap().leaf_sizes, vec![4]);

    tree.insert(5, 50).unwrap();
    assert_eq!(tree.verify().unwrap().leaf_sizes, vec![2, 3]);
    assert_eq!(tree.at(&5).unwrap(), 50);
    assert_eq!(tree.find(&5).unwrap().key().unwrap(), 5);

    for k in 6..=9 {
        tree.insert(k, k * 10).unwrap();
    }
    assert_eq!(tree.len(), 9);
    assert_eq!(keys(&tree), (1..=9).collect::<Vec<_>>());
    for k in 1..=9 {
        assert_eq!(tree.at(&k).unwrap(), k * 10);
    }
    tree.verify().unwrap();
}

#[test]
fn test_reverse_insert_keeps_separators() {
    let (mut tree, _dir) = create_tree(small_config());

    for k in (0..200).rev() {
        tree.insert(k, k).unwrap();
    }

    let report = tree.verify().unwrap();
    assert_eq!(report.entries, 200);
    assert!(report.height > 2);
    assert_eq!(keys(&tree), (0..200).collect::<Vec<_>>());
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..10 {
        tree.insert(k, k).unwrap();
    }

    let before = tree.stats().records_written;
    assert!(matches!(tree.insert(4, 99), Err(Error::DuplicateKey)));
    assert_eq!(tree.stats().records_written, before);
    assert_eq!(tree.at(&4).unwrap(), 4);
    assert_eq!(tree.len(), 10);
}

// ============================================================================
// Deletes
// ============================================================================

/// Insert 1..=20, erase 1..=15: five keys remain and every leaf is still at
/// least half full.
#[test]
fn test_erase_down_to_five() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 1..=20 {
        tree.insert(k, k).unwrap();
    }
    for k in 1..=15 {
        assert_eq!(tree.erase(&k).unwrap(), k);
    }

    assert_eq!(tree.len(), 5);
    assert_eq!(keys(&tree), vec![16, 17, 18, 19, 20]);

    let report = tree.verify().unwrap();
    if report.leaf_sizes.len() > 1 {
        assert!(report.leaf_sizes.iter().all(|&n| n >= 2));
    }
    let stats = tree.stats();
    assert!(stats.borrows + stats.merges > 0);
}

#[test]
fn test_erase_is_idempotent() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..30 {
        tree.insert(k, k).unwrap();
    }

    tree.erase(&12).unwrap();
    let written = tree.stats().records_written;
    assert!(matches!(tree.erase(&12), Err(Error::KeyNotFound)));
    assert_eq!(tree.stats().records_written, written);
    assert_eq!(tree.len(), 29);
    assert_eq!(tree.count(&12).unwrap(), 0);
}

#[test]
fn test_erase_everything_then_reuse() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..100 {
        tree.insert(k * 3, k).unwrap();
    }
    for k in (0..100).rev() {
        tree.erase(&(k * 3)).unwrap();
        tree.verify().unwrap();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.verify().unwrap().height, 1);
    assert!(tree.begin().is_end().unwrap());

    tree.insert(42, 1).unwrap();
    tree.insert(7, 2).unwrap();
    assert_eq!(keys(&tree), vec![7, 42]);
}

#[test]
fn test_interleaved_erase_from_middle() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..300 {
        tree.insert(k, k).unwrap();
    }
    for k in (0..300).filter(|k| k % 3 != 0) {
        tree.erase(&k).unwrap();
    }

    tree.verify().unwrap();
    assert_eq!(keys(&tree), (0..300).step_by(3).collect::<Vec<_>>());
}

// ============================================================================
// Cursors
// ============================================================================

#[test]
fn test_cursor_forward_and_backward() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..25 {
        tree.insert(k, k + 100).unwrap();
    }

    let mut forward = Vec::new();
    let mut cursor = tree.begin();
    while !cursor.is_end().unwrap() {
        forward.push(cursor.key().unwrap());
        assert!(cursor.move_next().unwrap());
    }
    assert_eq!(forward, (0..25).collect::<Vec<_>>());
    assert_eq!(cursor, tree.end().unwrap());

    let mut backward = Vec::new();
    while cursor.move_prev().unwrap() {
        backward.push(cursor.value().unwrap() - 100);
    }
    assert_eq!(backward, (0..25).rev().collect::<Vec<_>>());
    assert_eq!(cursor, tree.begin());
}

#[test]
fn test_cursor_stops_at_both_ends() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in [1, 2, 3] {
        tree.insert(k, k).unwrap();
    }

    let mut end = tree.end().unwrap();
    assert!(!end.move_next().unwrap());
    assert_eq!(end, tree.end().unwrap());
    assert!(matches!(end.key(), Err(Error::CursorAtEnd)));

    let mut begin = tree.begin();
    assert!(!begin.move_prev().unwrap());
    assert_eq!(begin.entry().unwrap(), (1, 1));
}

#[test]
fn test_cursor_equality_is_per_tree() {
    let (tree_a, _dir_a) = create_tree(small_config());
    let (tree_b, _dir_b) = create_tree(small_config());

    assert_eq!(tree_a.begin(), tree_a.begin());
    // Both trees have the same layout, so the positions coincide.
    assert_eq!(tree_a.begin().position(), tree_b.begin().position());
    assert_ne!(tree_a.begin(), tree_b.begin());
}

#[test]
fn test_cursor_mut_walk_and_modify() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..20 {
        tree.insert(k, 0).unwrap();
    }

    let mut cursor = tree.begin_mut();
    loop {
        let key = cursor.key().unwrap();
        cursor.modify(key * 2).unwrap();
        if !cursor.move_next().unwrap() || cursor.is_end().unwrap() {
            break;
        }
    }

    for k in 0..20 {
        assert_eq!(tree.at(&k).unwrap(), k * 2);
    }
}

#[test]
fn test_insert_cursor_lands_on_new_entry() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in (0..40).step_by(2) {
        tree.insert(k, k).unwrap();
    }

    for k in (1..39).step_by(2) {
        let mut cursor = tree.insert(k, k * 10).unwrap();
        assert_eq!(cursor.entry().unwrap(), (k, k * 10));
        assert!(cursor.move_next().unwrap());
        assert_eq!(cursor.key().unwrap(), k + 1);
    }
    tree.verify().unwrap();
}

#[test]
fn test_iter_both_ends() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..30 {
        tree.insert(k, k).unwrap();
    }

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 30);
    assert_eq!(iter.next().unwrap().unwrap().0, 0);
    assert_eq!(iter.next_back().unwrap().unwrap().0, 29);
    assert_eq!(iter.next_back().unwrap().unwrap().0, 28);
    assert_eq!(iter.len(), 27);

    let middle: Vec<u32> = iter.map(|e| e.unwrap().0).collect();
    assert_eq!(middle, (1..28).collect::<Vec<_>>());

    let reversed: Vec<u32> = tree.iter().rev().map(|e| e.unwrap().0).collect();
    assert_eq!(reversed, (0..30).rev().collect::<Vec<_>>());

    let mut total = 0;
    for entry in &tree {
        total += entry.unwrap().1;
    }
    assert_eq!(total, (0..30).sum());
}

// ============================================================================
// Clear
// ============================================================================

#[test]
fn test_clear_then_reuse() {
    let (mut tree, _dir) = create_tree(small_config());
    for k in 0..64 {
        tree.insert(k, k).unwrap();
    }

    tree.clear().unwrap();
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert!(matches!(tree.at(&3), Err(Error::KeyNotFound)));

    tree.insert(3, 33).unwrap();
    assert_eq!(tree.at(&3).unwrap(), 33);
    assert_eq!(tree.find(&3).unwrap().value().unwrap(), 33);
    assert_eq!(tree.len(), 1);
    tree.verify().unwrap();
}

// ============================================================================
// Larger workloads
// ============================================================================

#[test]
fn test_twenty_thousand_keys() {
    let (mut tree, _dir) = create_tree(TreeConfig::default());
    const N: u32 = 20_000;

    // 7919 is coprime with N, so this visits every key once.
    for i in 0..N {
        let k = (i * 7919) % N;
        tree.insert(k, k ^ 0x5a5a).unwrap();
    }
    assert_eq!(tree.len(), N as usize);
    for k in 0..N {
        assert_eq!(tree.at(&k).unwrap(), k ^ 0x5a5a);
    }

    for k in (0..N).filter(|k| k % 2 == 0) {
        tree.erase(&k).unwrap();
    }
    assert_eq!(tree.len(), (N / 2) as usize);
    assert_eq!(tree.verify().unwrap().entries, u64::from(N / 2));
    assert!(tree.iter().map(|e| e.unwrap().0).eq((1..N).step_by(2)));

    tree.clear().unwrap();
    assert!(tree.is_empty());
}

#[test]
fn test_wide_values() {
    init_tracing();
    let dir = tempdir().unwrap();
    let config = TreeConfig::default().with_record_size(1024);
    let mut tree =
        BPlusTree::<(u32, u32), [u8; 100]>::create(dir.path().join("wide.db"), config).unwrap();

    assert_eq!(tree.leaf_capacity(), (1024 - 33) / 108);
    for i in 0..200u32 {
        tree.insert((i % 7, i), [i as u8; 100]).unwrap();
    }

    let first = tree.begin().key().unwrap();
    assert_eq!(first, (0, 0));
    assert_eq!(tree.at(&(3, 10)).unwrap(), [10u8; 100]);
    tree.verify().unwrap();
}
