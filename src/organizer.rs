//! File Organizer
//!
//! Whole-file operations composed from the same primitives as the engine:
//! split one file into key-bounded segments, concatenate compatible files,
//! and repair a frame count left stale by an interrupted append.

use std::fs::{self, File, OpenOptions};
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Access, Config};
use crate::error::{FwobError, Result};
use crate::file::{check_ascending_keys, read_string_table, FwobFile};
use crate::format::{FrameCodec, Header, FILE_EXTENSION};
use crate::schema::Frame;
use crate::storage::{copy_block, Storage};

/// What [`fix_file_length`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// Header and file size already agreed
    Unchanged,

    /// All physical frames were ordered; the header count now matches them
    CountUpdated { previous: u64, current: u64 },

    /// Unordered trailing frames past the header count were cut off
    TailTruncated { removed: u64 },
}

/// Path of segment `index` of a split: `<stem>.part<index>.fwob`
pub fn split_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.part{}.{}", stem, index, FILE_EXTENSION))
}

// =============================================================================
// Split
// =============================================================================

/// Split `path` at `boundaries` (strictly ascending keys).
///
/// Segment 0 holds keys below the first boundary, segment `i` holds keys in
/// `[boundaries[i-1], boundaries[i])`, and the last segment holds the rest.
/// Every segment gets a verbatim copy of the header and string table. Returns
/// the created paths, one per segment, including empty ones. Segments are
/// never overwritten; if any segment fails, those already created are removed.
pub fn split<F: Frame>(
    path: impl AsRef<Path>,
    boundaries: &[F::Key],
    config: &Config,
) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    check_ascending_keys(boundaries)?;

    let read_config = Config {
        access: Access::ReadOnly,
        ..config.clone()
    };
    let mut source = FwobFile::<F>::open(path, read_config)?;
    let count = source.frame_count();
    let header = source.header().clone();

    // Step 1: Segment start indices
    let mut starts = vec![0u64];
    {
        let mut searcher = source.searcher()?;
        let mut lo = 0;
        for &boundary in boundaries {
            lo = searcher.lower_bound(boundary, lo, count)?;
            starts.push(lo);
        }
    }
    starts.push(count);

    // Step 2: Header and string table are shared by every segment
    let prefix_len = header.first_frame_position();
    let mut prefix = vec![0u8; prefix_len as usize];
    source.storage_mut()?.read_exact_at(0, &mut prefix)?;

    // Step 3: One output per segment; a failure removes what was created
    let mut outputs = Vec::with_capacity(starts.len() - 1);
    for (i, span) in starts.windows(2).enumerate() {
        let (lo, hi) = (span[0], span[1]);
        let out_path = split_path(path, i);
        let written = write_segment(
            &mut source,
            &header,
            &prefix,
            &out_path,
            lo..hi,
            config.block_copy_size,
            &mut outputs,
        );
        if let Err(e) = written {
            warn!(
                "Split of {} failed at segment {}: {}, removing {} created segments",
                path.display(),
                i,
                e,
                outputs.len()
            );
            remove_outputs(&outputs);
            return Err(e);
        }
        debug!("Split segment {} -> {} ({} frames)", i, out_path.display(), hi - lo);
    }

    info!(
        "Split {} ({} frames) into {} segments",
        path.display(),
        count,
        outputs.len()
    );
    Ok(outputs)
}

/// Create one split segment holding source frames `range`.
///
/// The path is recorded in `created` as soon as the file exists.
fn write_segment<F: Frame>(
    source: &mut FwobFile<F>,
    header: &Header,
    prefix: &[u8],
    out_path: &Path,
    range: Range<u64>,
    chunk_size: usize,
    created: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut out = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(out_path)?;
    created.push(out_path.to_path_buf());

    let count = range.end - range.start;
    out.write_all_at(0, prefix)?;
    copy_block(
        source.storage_mut()?,
        header.frame_position(range.start),
        &mut out,
        prefix.len() as u64,
        count * u64::from(header.frame_length),
        chunk_size,
    )?;
    Header::update_frame_count(&mut out, count)?;
    out.sync()?;
    Ok(())
}

fn remove_outputs(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

// =============================================================================
// Concatenate
// =============================================================================

/// Concatenate `sources` into a new file at `destination`.
///
/// All sources must share a title, follow one another in key order, and have
/// prefix-compatible string tables (equal strings at every index both
/// define). Everything is checked before the destination is created.
pub fn concat<F: Frame, P: AsRef<Path>>(
    destination: impl AsRef<Path>,
    sources: &[P],
    config: &Config,
) -> Result<()> {
    let destination = destination.as_ref();
    if sources.is_empty() {
        return Err(FwobError::InvalidArgument(
            "no files to concatenate".to_string(),
        ));
    }

    let read_config = Config {
        access: Access::ReadOnly,
        ..config.clone()
    };

    // Step 1: Open every source and validate the sequence
    let mut files: Vec<FwobFile<F>> = Vec::with_capacity(sources.len());
    let mut merged: Vec<String> = Vec::new();
    let mut title = String::new();
    let mut preserved = 0u32;
    let mut prev_last: Option<F::Key> = None;

    for source in sources {
        let mut file = FwobFile::<F>::open(source.as_ref(), read_config.clone())?;

        if files.is_empty() {
            title = file.title().to_string();
        } else if file.title() != title {
            return Err(FwobError::TitleMismatch {
                path: file.path().to_path_buf(),
                expected: title,
                actual: file.title().to_string(),
            });
        }

        if let (Some(last), Some(first)) = (prev_last, file.first_key()) {
            if first < last {
                return Err(FwobError::KeyOrderViolation {
                    path: file.path().to_path_buf(),
                    key: format!("{:?}", first),
                    last_key: format!("{:?}", last),
                    committed: 0,
                });
            }
        }
        if let Some(last) = file.last_key() {
            prev_last = Some(last);
        }

        let strings = file.strings()?;
        for (i, (ours, theirs)) in merged.iter().zip(strings.iter()).enumerate() {
            if ours != theirs {
                return Err(FwobError::StringTableIncompatible {
                    path: file.path().to_path_buf(),
                    index: i as u32,
                    reason: format!("{:?} != {:?}", theirs, ours),
                });
            }
        }
        if strings.len() > merged.len() {
            merged.extend(strings.into_iter().skip(merged.len()));
        }

        preserved = preserved.max(file.string_table_preserved_length());
        files.push(file);
    }

    // Step 2: Create the destination with the union of strings
    let dest_config = Config {
        access: Access::ReadWrite,
        string_table_preserved_length: preserved,
        load_string_table: false,
        ..config.clone()
    };
    let mut dest = FwobFile::<F>::create(destination, &title, dest_config)?;
    for s in &merged {
        dest.append_string(s)?;
    }

    // Step 3: Copy each frame region in sequence
    for file in files.iter_mut() {
        let count = file.frame_count();
        if count == 0 {
            continue;
        }
        let src_header = file.header().clone();
        let len = count * u64::from(src_header.frame_length);
        let dst_pos = dest.file_length();

        copy_block(
            file.storage_mut()?,
            src_header.first_frame_position(),
            dest.storage_mut()?,
            dst_pos,
            len,
            config.block_copy_size,
        )?;
        dest.commit_appended(count)?;
        debug!("Concatenated {} ({} frames)", file.path().display(), count);
    }

    info!(
        "Concatenated {} files into {} ({} frames, {} strings)",
        files.len(),
        destination.display(),
        dest.frame_count(),
        dest.string_count()
    );
    dest.close()?;
    Ok(())
}

// =============================================================================
// Fix File Length
// =============================================================================

/// Reconcile a header frame count that disagrees with the file size.
///
/// If every physical frame is in key order the header count is rewritten to
/// match them. If the order breaks exactly at the header count and no more
/// than `max_truncated_frames` frames lie past it, those frames are treated
/// as uncommitted and cut off. Anything else is unrecoverable.
pub fn fix_file_length<F: Frame>(
    path: impl AsRef<Path>,
    max_truncated_frames: u64,
    config: &Config,
) -> Result<FixOutcome> {
    let path = path.as_ref();
    let codec = FrameCodec::<F>::new()?;

    let mut file: File = OpenOptions::new().read(true).write(true).open(path)?;
    let mut header = Header::read(&mut file)?.ok_or_else(|| FwobError::InvalidHeader {
        path: path.to_path_buf(),
    })?;
    header.validate(codec.info(), path)?;
    read_string_table(&mut file, &header, path)?;

    let actual = Storage::len(&mut file)?;
    let expected = header.file_length();
    if actual == expected {
        return Ok(FixOutcome::Unchanged);
    }

    let first_position = header.first_frame_position();
    if actual < first_position {
        return Err(FwobError::FileLengthMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    // Step 1: Scan every whole physical frame for an ordering break
    let frame_length = u64::from(header.frame_length);
    let physical = (actual - first_position) / frame_length;
    let stored = header.frame_count;
    let batch = config.read_batch_frames.max(1) as u64;

    let mut break_at: Option<(u64, F::Key, F::Key)> = None;
    let mut prev: Option<F::Key> = None;
    let mut index = 0u64;
    'scan: while index < physical {
        let n = batch.min(physical - index);
        let mut bytes = vec![0u8; (n * frame_length) as usize];
        file.read_exact_at(header.frame_position(index), &mut bytes)?;
        for (offset, frame) in bytes.chunks_exact(frame_length as usize).enumerate() {
            let key = codec.key_of(frame);
            if let Some(p) = prev {
                if key < p {
                    break_at = Some((index + offset as u64, key, p));
                    break 'scan;
                }
            }
            prev = Some(key);
        }
        index += n;
    }

    // Step 2: Decide
    match break_at {
        None => {
            header.frame_count = physical;
            Header::update_frame_count(&mut file, physical)?;
            Storage::set_len(&mut file, header.file_length())?;
            file.sync()?;
            info!(
                "{}: frame count {} -> {} to match file size",
                path.display(),
                stored,
                physical
            );
            Ok(FixOutcome::CountUpdated {
                previous: stored,
                current: physical,
            })
        }
        Some((at, _, _)) if at == stored && physical - stored <= max_truncated_frames => {
            let removed = physical - stored;
            Storage::set_len(&mut file, expected)?;
            file.sync()?;
            info!(
                "{}: truncated {} uncommitted trailing frames",
                path.display(),
                removed
            );
            Ok(FixOutcome::TailTruncated { removed })
        }
        Some((at, key, last)) => {
            warn!(
                "{}: ordering breaks at frame {} (header count {}, {} physical), not recoverable",
                path.display(),
                at,
                stored,
                physical
            );
            Err(FwobError::KeyOrderViolation {
                path: path.to_path_buf(),
                key: format!("{:?}", key),
                last_key: format!("{:?}", last),
                committed: stored,
            })
        }
    }
}
