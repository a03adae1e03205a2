//! Tests for append and delete
//!
//! These tests verify:
//! - Best-effort append keeps the ordered prefix
//! - Transactional append writes nothing on failure
//! - Oversized strings are rejected before any byte is written
//! - Delete by keys / between / before / after / all keep survivors ordered
//! - Access errors on read-only and closed handles

mod common;

use std::io::Cursor;
use std::path::PathBuf;

use common::{all_keys, create_with_keys, setup_temp_file, small_config, Tick};
use fwob::{Config, FwobError, FwobFile};

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_best_effort_commits_prefix() {
    let (_temp, path) = setup_temp_file();
    let mut file = FwobFile::<Tick>::create(&path, "T", small_config()).unwrap();

    let result = file.append_frames(vec![Tick::new(12), Tick::new(100), Tick::new(13)]);
    match result {
        Err(FwobError::KeyOrderViolation { committed, .. }) => assert_eq!(committed, 2),
        other => panic!("expected KeyOrderViolation, got {:?}", other),
    }

    assert_eq!(file.frame_count(), 2);
    assert_eq!(all_keys(&mut file), vec![12, 100]);
    assert_eq!(file.last_key(), Some(100));
}

#[test]
fn test_append_tx_commits_nothing_on_violation() {
    let (_temp, path) = setup_temp_file();
    let mut file = FwobFile::<Tick>::create(&path, "T", small_config()).unwrap();

    let result = file.append_frames_tx(vec![Tick::new(12), Tick::new(100), Tick::new(13)]);
    assert!(matches!(
        result,
        Err(FwobError::KeyOrderViolation { committed: 0, .. })
    ));
    assert_eq!(file.frame_count(), 0);
    assert!(file.first_frame().is_none());
    assert_eq!(file.file_length(), std::fs::metadata(&path).unwrap().len());
}

#[test]
fn test_append_tx_checks_against_existing_last_key() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[10, 20]);

    let result = file.append_frames_tx(vec![Tick::new(25), Tick::new(19)]);
    assert!(result.is_err());
    let result = file.append_frames_tx(vec![Tick::new(15)]);
    assert!(result.is_err());
    assert_eq!(all_keys(&mut file), vec![10, 20]);

    assert_eq!(file.append_frames_tx(vec![Tick::new(20), Tick::new(30)]).unwrap(), 2);
    assert_eq!(all_keys(&mut file), vec![10, 20, 20, 30]);
}

#[test]
fn test_append_zero_frames() {
    let (_temp, path) = setup_temp_file();
    let mut file = FwobFile::<Tick>::create(&path, "T", small_config()).unwrap();

    assert_eq!(file.append_frames(Vec::<Tick>::new()).unwrap(), 0);
    assert_eq!(file.append_frames_tx(Vec::<Tick>::new()).unwrap(), 0);
    assert_eq!(file.frame_count(), 0);
}

#[test]
fn test_append_string_too_long() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1]);
    let length_before = std::fs::metadata(&path).unwrap().len();

    let result = file.append_frame(&Tick::with_sym(2, "abcde"));
    match result {
        Err(FwobError::StringTooLong { field, value, limit }) => {
            assert_eq!(field, "Sym");
            assert_eq!(value, "abcde");
            assert_eq!(limit, 4);
        }
        other => panic!("expected StringTooLong, got {:?}", other),
    }

    assert_eq!(file.frame_count(), 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), length_before);

    // Exactly the declared length is fine
    file.append_frame(&Tick::with_sym(2, "abcd")).unwrap();
    assert_eq!(file.get_frame_at(1).unwrap().unwrap().sym, "abcd");
}

#[test]
fn test_append_many_flushes_in_chunks() {
    let (_temp, path) = setup_temp_file();
    let mut file = FwobFile::<Tick>::create(&path, "T", small_config()).unwrap();

    let appended = file.append_frames((0..50).map(Tick::new)).unwrap();
    assert_eq!(appended, 50);
    drop(file);

    let mut file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    assert_eq!(file.frame_count(), 50);
    assert_eq!(all_keys(&mut file), (0..50).collect::<Vec<_>>());
}

#[test]
fn test_append_persists_across_reopen() {
    let (_temp, path) = setup_temp_file();
    create_with_keys(&path, "T", &[1, 2]).close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    file.append_frame(&Tick::new(3)).unwrap();
    assert!(file.append_frame(&Tick::new(0)).is_err());
    file.close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    assert_eq!(all_keys(&mut file), vec![1, 2, 3]);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_frames_by_keys() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 2, 3, 4, 4, 4, 5, 6]);

    let removed = file.delete_frames(&[0, 2, 4, 6, 9]).unwrap();
    assert_eq!(removed, 6);
    assert_eq!(file.frame_count(), 3);
    assert_eq!(all_keys(&mut file), vec![1, 3, 5]);
    assert_eq!(file.first_key(), Some(1));
    assert_eq!(file.last_key(), Some(5));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), file.file_length());
}

#[test]
fn test_delete_frames_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3]);

    assert!(matches!(
        file.delete_frames(&[2, 1]),
        Err(FwobError::InvalidKeyList(_))
    ));
    assert_eq!(file.frame_count(), 3);
}

#[test]
fn test_delete_frames_large_spans() {
    let (_temp, path) = setup_temp_file();
    let keys: Vec<i64> = (0..40).map(|i| i / 4).collect();
    let mut file = create_with_keys(&path, "T", &keys);

    // Kept spans are bigger than the 64-byte copy chunk
    let removed = file.delete_frames(&[1, 5, 9]).unwrap();
    assert_eq!(removed, 12);

    let expected: Vec<i64> = keys.into_iter().filter(|k| ![1, 5, 9].contains(k)).collect();
    assert_eq!(all_keys(&mut file), expected);
}

#[test]
fn test_delete_frames_between() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3, 4, 5, 6]);

    assert_eq!(file.delete_frames_between(2, 4).unwrap(), 3);
    assert_eq!(all_keys(&mut file), vec![1, 5, 6]);

    assert!(matches!(
        file.delete_frames_between(6, 5),
        Err(FwobError::InvalidRange { .. })
    ));
    assert_eq!(file.delete_frames_between(2, 4).unwrap(), 0);
}

#[test]
fn test_delete_frames_before_and_after() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3, 4, 5, 6]);

    assert_eq!(file.delete_frames_before(2).unwrap(), 2);
    assert_eq!(file.first_key(), Some(3));

    assert_eq!(file.delete_frames_after(5).unwrap(), 2);
    assert_eq!(file.last_key(), Some(4));

    assert_eq!(all_keys(&mut file), vec![3, 4]);
}

#[test]
fn test_delete_all_frames() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3]);

    assert_eq!(file.delete_all_frames().unwrap(), 3);
    assert!(file.is_empty());
    assert!(file.first_frame().is_none());
    assert!(file.last_frame().is_none());

    // Appending after a full delete starts over
    file.append_frame(&Tick::new(0)).unwrap();
    assert_eq!(all_keys(&mut file), vec![0]);
}

#[test]
fn test_delete_on_empty_file_is_noop() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);
    let length = file.file_length();

    assert_eq!(file.delete_frames(&[1, 2]).unwrap(), 0);
    assert_eq!(file.delete_frames_between(0, 10).unwrap(), 0);
    assert_eq!(file.delete_frames_before(10).unwrap(), 0);
    assert_eq!(file.delete_frames_after(0).unwrap(), 0);
    assert_eq!(file.delete_all_frames().unwrap(), 0);
    assert_eq!(file.file_length(), length);
}

// =============================================================================
// Compaction Order Tests
// =============================================================================

/// Duplicate keys carry distinct symbols so reordering is visible
const PAYLOADS: [(i64, &str); 12] = [
    (1, "a"),
    (1, "b"),
    (1, "c"),
    (2, "d"),
    (3, "e"),
    (3, "f"),
    (3, "g"),
    (3, "h"),
    (4, "i"),
    (5, "j"),
    (5, "k"),
    (5, "l"),
];

fn create_with_payloads(path: &PathBuf) -> FwobFile<Tick> {
    let mut file = FwobFile::<Tick>::create(path, "T", small_config()).unwrap();
    file.append_frames(PAYLOADS.iter().map(|&(k, s)| Tick::with_sym(k, s)))
        .unwrap();
    file
}

fn payloads(file: &mut FwobFile<Tick>) -> Vec<(i64, String)> {
    file.get_all_frames()
        .unwrap()
        .map(|f| {
            let tick = f.unwrap();
            (tick.time, tick.sym)
        })
        .collect()
}

fn surviving(removed: &[&str]) -> Vec<(i64, String)> {
    PAYLOADS
        .iter()
        .filter(|(_, s)| !removed.contains(s))
        .map(|&(k, s)| (k, s.to_string()))
        .collect()
}

#[test]
fn test_delete_frames_keeps_duplicate_order() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_payloads(&path);

    // Kept spans of 4 and 3 frames exceed the 64-byte copy chunk
    assert_eq!(file.delete_frames(&[2, 4]).unwrap(), 2);
    assert_eq!(payloads(&mut file), surviving(&["d", "i"]));

    assert_eq!(file.delete_frames(&[1]).unwrap(), 3);
    assert_eq!(payloads(&mut file), surviving(&["a", "b", "c", "d", "i"]));
}

#[test]
fn test_delete_frames_between_keeps_duplicate_order() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_payloads(&path);

    assert_eq!(file.delete_frames_between(2, 3).unwrap(), 5);
    assert_eq!(
        payloads(&mut file),
        surviving(&["d", "e", "f", "g", "h"])
    );
}

#[test]
fn test_delete_frames_before_and_after_keep_duplicate_order() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_payloads(&path);

    assert_eq!(file.delete_frames_before(1).unwrap(), 3);
    assert_eq!(payloads(&mut file), surviving(&["a", "b", "c"]));
    assert_eq!(file.first_frame().map(|t| t.sym.as_str()), Some("d"));

    assert_eq!(file.delete_frames_after(4).unwrap(), 4);
    assert_eq!(
        payloads(&mut file),
        surviving(&["a", "b", "c", "i", "j", "k", "l"])
    );
    assert_eq!(file.last_frame().map(|t| t.sym.as_str()), Some("h"));
}

// =============================================================================
// Access Tests
// =============================================================================

#[test]
fn test_read_only_rejects_mutation() {
    let (_temp, path) = setup_temp_file();
    create_with_keys(&path, "T", &[1, 2]).close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, Config::builder().read_only().build()).unwrap();
    assert!(matches!(
        file.append_frame(&Tick::new(3)),
        Err(FwobError::ReadOnly { .. })
    ));
    assert!(matches!(
        file.delete_all_frames(),
        Err(FwobError::ReadOnly { .. })
    ));
    assert!(matches!(
        file.append_string("x"),
        Err(FwobError::ReadOnly { .. })
    ));
    assert!(matches!(file.set_title("U"), Err(FwobError::ReadOnly { .. })));
    assert_eq!(file.frame_count(), 2);
}

#[test]
fn test_closed_handle() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1]);

    file.close().unwrap();
    file.close().unwrap();
    assert!(file.is_closed());

    assert!(matches!(file.lower_bound(1), Err(FwobError::Closed { .. })));
    assert!(matches!(
        file.append_frame(&Tick::new(2)),
        Err(FwobError::Closed { .. })
    ));
    assert!(matches!(file.get_all_frames(), Err(FwobError::Closed { .. })));
}

#[test]
fn test_title_update() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "Before", &[1]);

    file.set_title("After").unwrap();
    assert!(matches!(
        file.set_title("a title that is far too long"),
        Err(FwobError::TitleTooLong { .. })
    ));
    file.close().unwrap();

    let file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    assert_eq!(file.title(), "After");
    assert_eq!(file.frame_count(), 1);
}

// =============================================================================
// In-memory Storage
// =============================================================================

#[test]
fn test_in_memory_storage() {
    let mut file = FwobFile::<Tick, Cursor<Vec<u8>>>::create_storage(
        Cursor::new(Vec::new()),
        "memory",
        "T",
        small_config(),
    )
    .unwrap();

    file.append_frames((0..10).map(Tick::new)).unwrap();
    file.delete_frames(&[3, 4]).unwrap();
    let bytes = file.into_storage().unwrap().unwrap().into_inner();

    let mut file =
        FwobFile::<Tick, Cursor<Vec<u8>>>::open_storage(Cursor::new(bytes), "memory", small_config())
            .unwrap();
    assert_eq!(file.frame_count(), 8);
    assert_eq!(file.get_keys().unwrap(), vec![0, 1, 2, 5, 6, 7, 8, 9]);
}
