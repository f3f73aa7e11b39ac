// src/engine/io.rs
//
// I/O operations: source loading, output naming, atomic writes

use crate::engine::common::EngineResult;
use crate::error::BatchError;
use crate::ops::CollisionPolicy;
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Source bytes - either in memory or memory-mapped from disk
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data (empty files end up here; they cannot be mapped)
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
}

impl Source {
    /// Open `path` read-only and map it into memory.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BatchError::file_not_found(display.clone())
            } else {
                BatchError::file_read_failed(display.clone(), e)
            }
        })?;

        let metadata = file
            .metadata()
            .map_err(|e| BatchError::file_read_failed(display.clone(), e))?;
        if metadata.is_dir() {
            return Err(BatchError::file_read_failed(
                display,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is a directory"),
            ));
        }
        if metadata.len() == 0 {
            return Ok(Source::Memory(Arc::new(Vec::new())));
        }

        // Safety: We assume the file won't be modified externally during processing.
        // If modified, decoding may fail, produce corrupted images, or cause OS-dependent SIGBUS/SIGSEGV.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| BatchError::mmap_failed(display, e))? };
        Ok(Source::Mapped(Arc::new(mmap)))
    }

    /// Get the bytes directly - works for both Memory and Mapped sources
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Source::Memory(data) => data.as_slice(),
            Source::Mapped(mmap) => mmap.as_ref(),
        }
    }
}

/// `<source-stem>.<ext>`: the source's file name with its extension replaced.
///
/// Returns `None` when the path has no file name component (e.g. `..`).
pub fn output_file_name(source: &Path, extension: &str) -> Option<PathBuf> {
    source
        .file_name()
        .map(|name| Path::new(name).with_extension(extension))
}

/// Assigns output paths for one run, applying the collision policy.
///
/// Names must be assigned in source order; only names handed out by this
/// namer count as taken; files already in the directory do not.
#[derive(Debug)]
pub struct OutputNamer {
    dir: PathBuf,
    extension: &'static str,
    policy: CollisionPolicy,
    claimed: HashSet<PathBuf>,
}

impl OutputNamer {
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str, policy: CollisionPolicy) -> Self {
        Self {
            dir: dir.into(),
            extension,
            policy,
            claimed: HashSet::new(),
        }
    }

    /// Claim the output path for `source`.
    pub fn claim(&mut self, source: &Path) -> EngineResult<PathBuf> {
        let file_name = output_file_name(source, self.extension).ok_or_else(|| {
            BatchError::file_read_failed(
                source.display().to_string(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        let path = self.dir.join(&file_name);

        if self.claimed.insert(path.clone()) {
            return Ok(path);
        }

        match self.policy {
            CollisionPolicy::Overwrite => Ok(path),
            CollisionPolicy::Reject => Err(BatchError::output_collision(path.display().to_string())),
            CollisionPolicy::Suffix => {
                let stem = file_name
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut n: u32 = 1;
                loop {
                    let candidate = self.dir.join(format!("{stem}-{n}.{}", self.extension));
                    if self.claimed.insert(candidate.clone()) {
                        return Ok(candidate);
                    }
                    n += 1;
                }
            }
        }
    }
}

/// Write `data` to `path` atomically: temp file in the same directory, fsync, rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> EngineResult<()> {
    // Create temp file in the same directory as the target file
    // This ensures rename() works (cross-filesystem rename can fail)
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(dir)
        .map_err(|e| BatchError::file_write_failed(dir.display().to_string(), e))?;

    let temp_path = temp_file.path().to_path_buf();
    temp_file
        .write_all(data)
        .map_err(|e| BatchError::file_write_failed(temp_path.display().to_string(), e))?;

    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| BatchError::file_write_failed(temp_path.display().to_string(), e))?;

    // Atomic rename: tempfile cleans up the temp file if this fails
    temp_file
        .persist(path)
        .map_err(|e| BatchError::file_write_failed(path.display().to_string(), e.error))?;

    Ok(())
}
