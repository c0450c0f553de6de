use std::fs;

use lembar::{
    storage::{
        page_store::PageStore,
        wal::{FRAME_HEADER_SIZE, WAL_HEADER_SIZE, Wal},
    },
    types::{PAGE_SIZE, PageId, error::DatabaseError, page::Page},
    utils::mock::TempDatabase,
};

const PAGE_FRAME_SIZE: u64 = (FRAME_HEADER_SIZE + 2 * PAGE_SIZE) as u64;
const COMMIT_FRAME_SIZE: u64 = FRAME_HEADER_SIZE as u64;

fn filled_page(byte: u8) -> Page {
    let mut page = Page::new();
    page.as_bytes_mut()[16..].fill(byte);
    page
}

fn open_pair(temp_db: &TempDatabase) -> (PageStore, Wal) {
    let store = temp_db.open_store().unwrap();
    let wal = Wal::open(temp_db.wal_path(), store.header().checkpoint_seq).unwrap();
    (store, wal)
}

/// Allocate a page holding `byte` in one logged transaction.
fn commit_new_page(store: &mut PageStore, wal: &mut Wal, byte: u8) -> PageId {
    store.begin();
    let page_id = store.allocate().unwrap();
    store.write(page_id, filled_page(byte)).unwrap();
    for change in store.pending_changes().unwrap() {
        wal.append(change.page_id, &change.before, &change.after).unwrap();
    }
    wal.commit(true).unwrap();
    store.end_transaction();
    page_id
}

fn wal_len(temp_db: &TempDatabase) -> u64 {
    fs::metadata(temp_db.wal_path()).unwrap().len()
}

#[test]
fn test_new_log_is_just_a_header() {
    let temp_db = TempDatabase::with_prefix("wal_new").unwrap();
    let (_store, mut wal) = open_pair(&temp_db);

    assert_eq!(wal.checkpoint_seq(), 0);
    assert_eq!(wal.frames_since_checkpoint(), 0);
    assert_eq!(wal_len(&temp_db), WAL_HEADER_SIZE as u64);
    assert!(wal.read_committed().unwrap().frames.is_empty());
}

#[test]
fn test_committed_frames_are_read_back_in_order() {
    let temp_db = TempDatabase::with_prefix("wal_order").unwrap();
    let (mut store, mut wal) = open_pair(&temp_db);

    let first = commit_new_page(&mut store, &mut wal, 0xA1);
    let second = commit_new_page(&mut store, &mut wal, 0xB2);

    let scan = wal.read_committed().unwrap();
    // Header page and the new page, per transaction.
    assert_eq!(scan.frames.len(), 4);
    assert_eq!(scan.last_sequence, 6);
    assert_eq!(scan.uncommitted_frames, 0);
    assert_eq!(scan.discarded_bytes, 0);

    let sequences: Vec<u64> = scan.frames.iter().map(|frame| frame.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 4, 5]);
    let pages: Vec<PageId> = scan.frames.iter().map(|frame| frame.page_id).collect();
    assert_eq!(pages, vec![0, first, 0, second]);
    assert_eq!(scan.frames[1].before, Page::new());
    assert_eq!(scan.frames[3].after, filled_page(0xB2));
    assert_eq!(wal.frames_since_checkpoint(), 4);
}

#[test]
fn test_torn_tail_is_discarded() {
    let temp_db = TempDatabase::with_prefix("wal_torn").unwrap();
    let first_end = {
        let (mut store, mut wal) = open_pair(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x01);
        let first_end = wal_len(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x02);
        first_end
    };
    assert_eq!(
        first_end,
        WAL_HEADER_SIZE as u64 + 2 * PAGE_FRAME_SIZE + COMMIT_FRAME_SIZE
    );

    let file = fs::OpenOptions::new()
        .write(true)
        .open(temp_db.wal_path())
        .unwrap();
    file.set_len(first_end + PAGE_FRAME_SIZE + 100).unwrap();
    drop(file);

    let (_store, mut wal) = open_pair(&temp_db);
    let scan = wal.read_committed().unwrap();
    assert_eq!(scan.frames.len(), 2);
    assert_eq!(scan.valid_end, first_end);
    assert_eq!(scan.uncommitted_frames, 1);
    assert_eq!(scan.discarded_bytes, PAGE_FRAME_SIZE + 100);
}

#[test]
fn test_corrupted_frame_stops_the_scan() {
    let temp_db = TempDatabase::with_prefix("wal_corrupt").unwrap();
    let first_end = {
        let (mut store, mut wal) = open_pair(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x01);
        let first_end = wal_len(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x02);
        first_end
    };

    let mut bytes = fs::read(temp_db.wal_path()).unwrap();
    let target = first_end as usize + FRAME_HEADER_SIZE + 10;
    bytes[target] ^= 0xFF;
    fs::write(temp_db.wal_path(), &bytes).unwrap();

    let (_store, mut wal) = open_pair(&temp_db);
    let scan = wal.read_committed().unwrap();
    assert_eq!(scan.frames.len(), 2);
    assert_eq!(scan.valid_end, first_end);
}

#[test]
fn test_discard_pending_rewinds_sequence() {
    let temp_db = TempDatabase::with_prefix("wal_discard").unwrap();
    let (mut store, mut wal) = open_pair(&temp_db);
    commit_new_page(&mut store, &mut wal, 0x01);
    let committed_len = wal_len(&temp_db);

    let page = filled_page(0x09);
    assert_eq!(wal.append(2, &Page::new(), &page).unwrap(), 4);
    wal.discard_pending().unwrap();
    assert_eq!(wal_len(&temp_db), committed_len);

    assert_eq!(wal.append(2, &Page::new(), &page).unwrap(), 4);
    assert_eq!(wal.commit(false).unwrap(), 5);
    assert_eq!(wal.read_committed().unwrap().frames.len(), 3);
}

#[test]
fn test_replay_is_idempotent() {
    let once = TempDatabase::with_prefix("wal_replay_once").unwrap();
    let twice = TempDatabase::with_prefix("wal_replay_twice").unwrap();
    {
        let (mut store, mut wal) = open_pair(&once);
        for byte in 1..=5 {
            commit_new_page(&mut store, &mut wal, byte);
        }
        // Dropped unflushed: the work lives only in the log.
    }
    fs::copy(&once.path, &twice.path).unwrap();
    fs::copy(once.wal_path(), twice.wal_path()).unwrap();

    {
        let (mut store, mut wal) = open_pair(&once);
        assert_eq!(wal.replay(&mut store).unwrap(), 10);
        store.flush().unwrap();
    }
    {
        let (mut store, mut wal) = open_pair(&twice);
        wal.replay(&mut store).unwrap();
        wal.replay(&mut store).unwrap();
        store.flush().unwrap();
    }

    let once_bytes = fs::read(&once.path).unwrap();
    assert_eq!(once_bytes.len(), 7 * PAGE_SIZE);
    assert_eq!(once_bytes, fs::read(&twice.path).unwrap());
}

#[test]
fn test_recover_checkpoints_and_truncates() {
    let temp_db = TempDatabase::with_prefix("wal_recover").unwrap();
    let page_id = {
        let (mut store, mut wal) = open_pair(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x5C)
    };

    let (mut store, mut wal) = open_pair(&temp_db);
    assert_eq!(store.page_count(), 2);

    let report = wal.recover(&mut store).unwrap();
    assert_eq!(report.frames_replayed, 2);
    assert_eq!(report.frames_discarded, 0);
    assert_eq!(store.page_count(), 3);
    assert_eq!(store.read(page_id).unwrap(), filled_page(0x5C));
    assert_eq!(store.header().checkpoint_seq, 1);
    assert_eq!(wal.checkpoint_seq(), 1);
    assert_eq!(wal_len(&temp_db), WAL_HEADER_SIZE as u64);

    // Nothing left to do on a second pass.
    let report = wal.recover(&mut store).unwrap();
    assert_eq!(report.frames_replayed, 0);
}

#[test]
fn test_log_from_another_generation_is_reset() {
    let temp_db = TempDatabase::with_prefix("wal_stale").unwrap();
    {
        let (mut store, mut wal) = open_pair(&temp_db);
        commit_new_page(&mut store, &mut wal, 0x01);
    }

    let mut wal = Wal::open(temp_db.wal_path(), 7).unwrap();
    assert_eq!(wal.checkpoint_seq(), 7);
    assert!(wal.read_committed().unwrap().frames.is_empty());
    assert_eq!(wal_len(&temp_db), WAL_HEADER_SIZE as u64);
}

#[test]
fn test_checkpoint_refused_inside_transaction() {
    let temp_db = TempDatabase::with_prefix("wal_checkpoint_txn").unwrap();
    let (mut store, mut wal) = open_pair(&temp_db);
    store.begin();
    assert!(matches!(
        wal.checkpoint(&mut store),
        Err(DatabaseError::Corruption { .. })
    ));
    store.rollback().unwrap();
    assert_eq!(wal.checkpoint(&mut store).unwrap(), 0);
}
