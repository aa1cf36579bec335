//! Access previously unseen parts of a growing file.
//!
//! `LogTail` builds on [`Cookie`] to hand a check only the lines that
//! appeared since its last invocation. The last read position and the
//! file's inode are saved in the cookie, keyed by the canonical log
//! path, so several `LogTail` instances may share one cookie. When the
//! file was rotated or truncated, scanning restarts from the beginning.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cookie::Cookie;
use crate::error::CheckError;

#[derive(Debug, Serialize, Deserialize)]
struct FilePosition {
    inode: u64,
    pos: u64,
}

/// Resumable reader over a continuously growing log file.
pub struct LogTail {
    path: PathBuf,
    cookie: Cookie,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, cookie: Cookie) -> Self {
        LogTail {
            path: path.into(),
            cookie,
        }
    }

    /// Seeks to the last seen position and hands the new lines to
    /// `body`.
    ///
    /// The new position is committed to the cookie only when `body`
    /// returns successfully; on failure the position is discarded, so
    /// the next run sees the same data again instead of silently
    /// skipping it. The cookie is closed on every exit path.
    pub fn scan<T, F>(mut self, body: F) -> Result<T, CheckError>
    where
        F: FnOnce(&mut LogLines<'_>) -> Result<T, CheckError>,
    {
        let outcome = self.scan_inner(body);
        self.cookie.close();
        outcome
    }

    fn scan_inner<T, F>(&mut self, body: F) -> Result<T, CheckError>
    where
        F: FnOnce(&mut LogLines<'_>) -> Result<T, CheckError>,
    {
        let path = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let key = path.to_string_lossy().to_string();
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let inode = inode_of(&metadata);
        let mut reader = BufReader::new(file);
        if let Some(saved) = self.cookie.get::<FilePosition>(&key) {
            if saved.inode == inode && metadata.len() >= saved.pos {
                reader.seek(SeekFrom::Start(saved.pos))?;
                debug!("resuming {} at byte {}", path.display(), saved.pos);
            } else {
                debug!("{} was rotated or truncated, rereading", path.display());
            }
        }
        let mut lines = LogLines {
            reader: &mut reader,
        };
        let value = body(&mut lines)?;
        let pos = reader.stream_position()?;
        self.cookie.insert(key, json!({ "inode": inode, "pos": pos }));
        self.cookie.commit().map_err(CheckError::from)?;
        Ok(value)
    }
}

/// Iterator-style access to the unseen lines of the log file.
pub struct LogLines<'a> {
    reader: &'a mut BufReader<File>,
}

impl LogLines<'_> {
    /// The next unseen line including its trailing newline, or `None`
    /// at the current end of the file.
    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> u64 {
    0
}
