//! Tests for bound searches and frame queries
//!
//! These tests verify:
//! - lower/upper bound and equal range over sorted keys
//! - Point accessors returning `None` past the end
//! - Range accessors (keys, between, before, after, all)
//! - Rejection of unsorted key lists and inverted ranges

mod common;

use common::{all_keys, create_with_keys, setup_temp_file, Tick};
use fwob::{Config, FwobError, FwobFile};

// =============================================================================
// Bound Primitives
// =============================================================================

#[test]
fn test_bounds_scenario() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[12, 13, 100]);

    assert_eq!(file.lower_bound(13).unwrap(), 1);
    assert_eq!(file.upper_bound(13).unwrap(), 2);

    let keys: Vec<i64> = file
        .get_frames_between(12, 99)
        .unwrap()
        .map(|f| f.unwrap().time)
        .collect();
    assert_eq!(keys, vec![12, 13]);
}

#[test]
fn test_bounds_on_duplicates() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 3, 3, 3, 5, 7, 7, 9]);

    for probe in 0..=10 {
        let lower = file.lower_bound(probe).unwrap();
        let upper = file.upper_bound(probe).unwrap();
        assert_eq!(file.equal_range(probe).unwrap(), (lower, upper), "probe {}", probe);

        let present = [1, 3, 5, 7, 9].contains(&probe);
        assert_eq!(lower != upper, present, "probe {}", probe);
    }

    assert_eq!(file.equal_range(3).unwrap(), (1, 4));
    assert_eq!(file.equal_range(7).unwrap(), (5, 7));
    assert_eq!(file.lower_bound(100).unwrap(), 8);
    assert_eq!(file.upper_bound(-1).unwrap(), 0);
}

#[test]
fn test_bounds_on_empty_file() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);

    assert_eq!(file.lower_bound(5).unwrap(), 0);
    assert_eq!(file.upper_bound(5).unwrap(), 0);
    assert_eq!(file.equal_range(5).unwrap(), (0, 0));
    assert!(file.get_frame_at(0).unwrap().is_none());
    assert_eq!(file.get_all_frames().unwrap().count(), 0);
}

// =============================================================================
// Point Accessors
// =============================================================================

#[test]
fn test_get_frame_at() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[10, 20, 30]);

    assert_eq!(file.get_frame_at(1).unwrap(), Some(Tick::new(20)));
    assert_eq!(file.get_key_at(2).unwrap(), Some(30));
    assert!(file.get_frame_at(3).unwrap().is_none());
    assert!(file.get_key_at(99).unwrap().is_none());
}

#[test]
fn test_cached_first_and_last() {
    let (_temp, path) = setup_temp_file();
    let file = create_with_keys(&path, "T", &[4, 8, 15, 16, 23, 42]);

    assert_eq!(file.first_key(), Some(4));
    assert_eq!(file.last_key(), Some(42));
    assert_eq!(file.first_frame(), Some(&Tick::new(4)));
    assert_eq!(file.last_frame(), Some(&Tick::new(42)));
}

// =============================================================================
// Range Accessors
// =============================================================================

#[test]
fn test_get_frames_by_keys() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 2, 4, 6, 6, 6, 9]);

    let frames: Vec<i64> = file
        .get_frames(&[0, 2, 5, 6, 10])
        .unwrap()
        .map(|f| f.unwrap().time)
        .collect();
    assert_eq!(frames, vec![2, 2, 6, 6, 6]);
}

#[test]
fn test_get_frames_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3]);

    let result = file.get_frames(&[3, 1]);
    assert!(matches!(result, Err(FwobError::InvalidKeyList(_))));

    let result = file.get_frames(&[2, 2]);
    assert!(matches!(result, Err(FwobError::InvalidKeyList(_))));
}

#[test]
fn test_get_frames_between_rejects_inverted_range() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2, 3]);

    let result = file.get_frames_between(3, 1);
    assert!(matches!(result, Err(FwobError::InvalidRange { .. })));
}

#[test]
fn test_get_frames_before_and_after() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 3, 3, 5, 7]);

    let before: Vec<i64> = file
        .get_frames_before(3)
        .unwrap()
        .map(|f| f.unwrap().time)
        .collect();
    assert_eq!(before, vec![1, 3, 3]);

    let after: Vec<i64> = file
        .get_frames_after(4)
        .unwrap()
        .map(|f| f.unwrap().time)
        .collect();
    assert_eq!(after, vec![5, 7]);

    assert_eq!(file.get_frames_before(0).unwrap().count(), 0);
    assert_eq!(file.get_frames_after(8).unwrap().count(), 0);
}

#[test]
fn test_iterator_spans_batches() {
    let (_temp, path) = setup_temp_file();
    let keys: Vec<i64> = (0..20).collect();
    let mut file = create_with_keys(&path, "T", &keys);

    let mut frames = file.get_all_frames().unwrap();
    assert_eq!(frames.size_hint(), (20, Some(20)));
    frames.next().unwrap().unwrap();
    assert_eq!(frames.remaining(), 19);

    let rest: Vec<Tick> = frames.collect::<fwob::Result<_>>().unwrap();
    assert_eq!(rest.len(), 19);
    assert_eq!(rest[18], Tick::new(19));
}

#[test]
fn test_get_keys_matches_frames() {
    let (_temp, path) = setup_temp_file();
    let keys: Vec<i64> = (0..10).map(|i| i * i).collect();
    let mut file = create_with_keys(&path, "T", &keys);

    assert_eq!(all_keys(&mut file), keys);
}

#[test]
fn test_queries_on_reopened_read_only_file() {
    let (_temp, path) = setup_temp_file();
    create_with_keys(&path, "T", &[5, 6, 7]).close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, Config::builder().read_only().build()).unwrap();
    assert_eq!(file.frame_count(), 3);
    assert_eq!(file.equal_range(6).unwrap(), (1, 2));
    assert_eq!(file.get_frame_at(2).unwrap(), Some(Tick::new(7)));
}
