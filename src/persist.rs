//! Disk I/O helpers: load a collection and replace a file atomically.
//!
//! Writes go to a uniquely named temp file next to the target, get fsynced,
//! and are then renamed over the target. A reader opening the target sees
//! either the old bytes or the new bytes, never a mix. The one exception is
//! the cross-device fallback (copy then delete), which is not atomic: a crash
//! mid-copy can leave a torn target and a stray `.tmp-*` file behind.
//!
//! On FAT32 or network shares rename gives no hard guarantees either. Keep
//! backups if that matters to you.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix shared by every temp file this module creates.
pub const TEMP_PREFIX: &str = ".tmp-";

const TOKEN_LEN: usize = 10;

/// Reads and deserializes the collection at `path`.
///
/// A missing or zero-length file yields `empty_default`. Content that is not
/// a well-formed collection is an [`Error::Deserialize`]; it is never
/// papered over with the default.
pub fn load<T, S>(path: &Path, empty_default: Vec<T>, serializer: &S) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: Serializer,
{
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(empty_default),
        Err(e) => return Err(io_error(path, e)),
    };
    if bytes.is_empty() {
        return Ok(empty_default);
    }
    serializer.deserialize(&bytes).map_err(|e| match e {
        Error::Deserialize(msg) => Error::Deserialize(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Replace the contents of `path` with `bytes` via temp file + rename.
///
/// Shorthand for [`stage`] followed by [`StagedWrite::commit`].
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    stage(path, bytes)?.commit()
}

/// Write `bytes` to a fresh temp file in the same directory as `path` and
/// sync it to disk. Nothing visible at `path` changes until
/// [`commit`](StagedWrite::commit).
pub fn stage(path: &Path, bytes: &[u8]) -> Result<StagedWrite> {
    let temp = path.with_file_name(temp_file_name());
    let staged = StagedWrite {
        temp,
        target: path.to_path_buf(),
        finished: false,
    };
    // If any of these fail, dropping `staged` removes the partial temp file.
    let mut file = fs::File::create(&staged.temp).map_err(|e| io_error(&staged.temp, e))?;
    file.write_all(bytes).map_err(|e| io_error(&staged.temp, e))?;
    file.sync_all().map_err(|e| io_error(&staged.temp, e))?;
    Ok(staged)
}

/// A fully written, synced temp file waiting to be renamed over its target.
///
/// Dropping it without calling [`commit`](Self::commit) deletes the temp file
/// and leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
    finished: bool,
}

impl StagedWrite {
    /// Where the new bytes currently live.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// The file this write will replace.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged bytes into place.
    ///
    /// Rename failures are handled in this order:
    /// - cross-device: copy over the target, then delete the temp file;
    /// - destination busy, locked, or in the way: remove the target and retry
    ///   the rename once;
    /// - anything else: delete the temp file and return the error. The target
    ///   keeps its old content.
    ///
    /// Never retried beyond that; whether a failed rename committed is not
    /// knowable in general.
    pub fn commit(self) -> Result<()> {
        self.commit_with(|from, to| fs::rename(from, to))
    }

    /// [`commit`](Self::commit) with the rename step supplied by the caller,
    /// so the fallback paths can be driven by injected errors.
    fn commit_with<F>(mut self, mut rename: F) -> Result<()>
    where
        F: FnMut(&Path, &Path) -> io::Result<()>,
    {
        self.finished = true;
        let err = match rename(&self.temp, &self.target) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match classify_rename_error(&err) {
            RenameFailure::CrossDevice => {
                warn!(path = %self.target.display(), "rename crosses devices, falling back to copy");
                if let Err(e) = fs::copy(&self.temp, &self.target) {
                    let _ = fs::remove_file(&self.temp);
                    return Err(io_error(&self.target, e));
                }
                fs::remove_file(&self.temp).map_err(|e| io_error(&self.temp, e))
            }
            RenameFailure::DestinationBusy => {
                warn!(path = %self.target.display(), error = %err, "destination busy, removing and retrying rename");
                let _ = fs::remove_file(&self.target);
                rename(&self.temp, &self.target).map_err(|e| {
                    let _ = fs::remove_file(&self.temp);
                    io_error(&self.target, e)
                })
            }
            RenameFailure::Other => {
                debug!(path = %self.target.display(), error = %err, "rename failed");
                let _ = fs::remove_file(&self.temp);
                Err(io_error(&self.target, err))
            }
        }
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Build a temp file name: `.tmp-<pid>-<unix millis>-<random token>`.
///
/// The pid and token keep concurrent writers (in this process or another)
/// from colliding even when they target different files in one directory.
pub fn temp_file_name() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "{TEMP_PREFIX}{}-{}-{token}",
        std::process::id(),
        chrono::Utc::now().timestamp_millis()
    )
}

/// `true` if `name` looks like one of our temp files rather than a real
/// collection.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameFailure {
    CrossDevice,
    DestinationBusy,
    Other,
}

#[cfg(unix)]
fn classify_os_code(code: i32) -> Option<RenameFailure> {
    match code {
        libc::EXDEV => Some(RenameFailure::CrossDevice),
        libc::EEXIST | libc::EPERM | libc::ENOTEMPTY | libc::EBUSY => {
            Some(RenameFailure::DestinationBusy)
        }
        _ => None,
    }
}

#[cfg(windows)]
fn classify_os_code(code: i32) -> Option<RenameFailure> {
    // ERROR_NOT_SAME_DEVICE, then ACCESS_DENIED, SHARING_VIOLATION,
    // LOCK_VIOLATION, DIR_NOT_EMPTY, ALREADY_EXISTS.
    match code {
        17 => Some(RenameFailure::CrossDevice),
        5 | 32 | 33 | 145 | 183 => Some(RenameFailure::DestinationBusy),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn classify_os_code(_code: i32) -> Option<RenameFailure> {
    None
}

fn classify_rename_error(err: &io::Error) -> RenameFailure {
    if let Some(kind) = err.raw_os_error().and_then(classify_os_code) {
        return kind;
    }
    match err.kind() {
        io::ErrorKind::AlreadyExists => RenameFailure::DestinationBusy,
        _ => RenameFailure::Other,
    }
}

fn io_error(path: &Path, err: io::Error) -> Error {
    Error::Io(format!("{}: {err}", path.display()))
}
