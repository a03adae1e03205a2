//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use fwob::schema::{DeclaredType, FieldDecl, FieldValues, Frame, FrameDefinition, Value};
use fwob::{Config, FwobFile};
use tempfile::TempDir;

/// Market tick used across the test suite
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub time: i64,
    pub price: f64,
    pub sym: String,
    pub venue: u32,
}

impl Tick {
    pub fn new(time: i64) -> Self {
        Self {
            time,
            price: time as f64 * 0.5,
            sym: "AB".to_string(),
            venue: 0,
        }
    }

    pub fn with_sym(time: i64, sym: &str) -> Self {
        Self {
            sym: sym.to_string(),
            ..Self::new(time)
        }
    }
}

impl Frame for Tick {
    type Key = i64;

    fn definition() -> FrameDefinition {
        FrameDefinition::new("Tick")
            .field(FieldDecl::new("Time", DeclaredType::I64).key())
            .field(FieldDecl::new("Price", DeclaredType::F64))
            .field(FieldDecl::new("Sym", DeclaredType::String).length(4))
            .field(FieldDecl::new("Venue", DeclaredType::U32).string_table_index())
    }

    fn write_values(&self, values: &mut Vec<Value>) {
        values.push(self.time.into());
        values.push(self.price.into());
        values.push(self.sym.as_str().into());
        values.push(self.venue.into());
    }

    fn read_values(values: &mut FieldValues<'_>) -> fwob::Result<Self> {
        Ok(Self {
            time: values.next()?,
            price: values.next()?,
            sym: values.next()?,
            venue: values.next()?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

pub fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ticks.fwob");
    (temp_dir, path)
}

/// Small batches and copy chunks so multi-chunk paths get exercised
pub fn small_config() -> Config {
    Config::builder()
        .block_copy_size(64)
        .read_batch_frames(3)
        .string_table_preserved_length(64)
        .build()
}

/// Create a file holding one frame per key
pub fn create_with_keys(path: &PathBuf, title: &str, keys: &[i64]) -> FwobFile<Tick> {
    let mut file = FwobFile::<Tick>::create(path, title, small_config()).unwrap();
    file.append_frames(keys.iter().map(|&k| Tick::new(k))).unwrap();
    file
}

/// Every key in the file, in stored order
pub fn all_keys(file: &mut FwobFile<Tick>) -> Vec<i64> {
    file.get_keys().unwrap()
}
