//! Tests for the string table
//!
//! These tests verify:
//! - Append-order indices and deduplication
//! - Fixed capacity (`StringTableFull`)
//! - Clearing and persistence across reopen
//! - The optional in-memory cache behaves like the disk scan

mod common;

use common::{create_with_keys, setup_temp_file, small_config, Tick};
use fwob::{Config, FwobError, FwobFile};

#[test]
fn test_append_and_lookup() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);

    assert_eq!(file.append_string("NYSE").unwrap(), 0);
    assert_eq!(file.append_string("NASDAQ").unwrap(), 1);
    assert_eq!(file.string_count(), 2);
    // varint prefix (1 byte) plus UTF-8 bytes
    assert_eq!(file.string_table_length(), 5 + 7);

    assert_eq!(file.get_string(1).unwrap().as_deref(), Some("NASDAQ"));
    assert_eq!(file.get_string(2).unwrap(), None);
    assert_eq!(file.get_string_index("NYSE").unwrap(), Some(0));
    assert!(file.contains_string("NASDAQ").unwrap());
    assert!(!file.contains_string("LSE").unwrap());
}

#[test]
fn test_append_deduplicates() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);

    assert_eq!(file.append_string("a").unwrap(), 0);
    assert_eq!(file.append_string("b").unwrap(), 1);
    assert_eq!(file.append_string("a").unwrap(), 0);
    assert_eq!(file.string_count(), 2);
    assert_eq!(file.strings().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_unicode_strings() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);

    file.append_string("東京").unwrap();
    file.append_string("").unwrap();
    file.close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    assert_eq!(file.strings().unwrap(), vec!["東京", ""]);
}

#[test]
fn test_string_table_full() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[1, 2]);

    // 64 bytes reserved: two 30-byte entries fit, a third does not
    let s1 = "x".repeat(29);
    let s2 = "y".repeat(29);
    file.append_string(&s1).unwrap();
    file.append_string(&s2).unwrap();

    match file.append_string("zzzzz") {
        Err(FwobError::StringTableFull { needed, available, .. }) => {
            assert_eq!(needed, 6);
            assert_eq!(available, 4);
        }
        other => panic!("expected StringTableFull, got {:?}", other),
    }
    assert_eq!(file.string_count(), 2);

    // Strings never push the frame region
    assert_eq!(file.get_frame_at(0).unwrap(), Some(Tick::new(1)));
    assert_eq!(file.frame_count(), 2);
}

#[test]
fn test_clear_strings() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[7]);

    file.append_string("one").unwrap();
    file.append_string("two").unwrap();
    file.clear_strings().unwrap();

    assert_eq!(file.string_count(), 0);
    assert_eq!(file.string_table_length(), 0);
    assert!(file.strings().unwrap().is_empty());
    assert_eq!(file.append_string("two").unwrap(), 0);
    file.close().unwrap();

    let mut file = FwobFile::<Tick>::open(&path, small_config()).unwrap();
    assert_eq!(file.strings().unwrap(), vec!["two"]);
    assert_eq!(file.frame_count(), 1);
}

#[test]
fn test_loaded_cache_matches_disk() {
    let (_temp, path) = setup_temp_file();
    {
        let mut file = create_with_keys(&path, "T", &[]);
        file.append_string("alpha").unwrap();
        file.append_string("beta").unwrap();
    }

    let config = Config::builder().load_string_table(true).build();
    let mut file = FwobFile::<Tick>::open(&path, config).unwrap();
    assert!(file.is_string_table_loaded());

    assert_eq!(file.get_string_index("beta").unwrap(), Some(1));
    assert_eq!(file.append_string("gamma").unwrap(), 2);
    assert_eq!(file.get_string(2).unwrap().as_deref(), Some("gamma"));

    file.unload_string_table();
    assert!(!file.is_string_table_loaded());
    assert_eq!(file.strings().unwrap(), vec!["alpha", "beta", "gamma"]);

    file.load_string_table().unwrap();
    assert_eq!(file.get_string_index("gamma").unwrap(), Some(2));
}

#[test]
fn test_index_field_references_table() {
    let (_temp, path) = setup_temp_file();
    let mut file = create_with_keys(&path, "T", &[]);

    let venue = file.append_string("ARCA").unwrap();
    let tick = Tick {
        venue,
        ..Tick::new(1)
    };
    file.append_frame(&tick).unwrap();

    let stored = file.get_frame_at(0).unwrap().unwrap();
    assert_eq!(file.get_string(stored.venue).unwrap().as_deref(), Some("ARCA"));
}
