//! Persistent state between check invocations.
//!
//! Cookies remember file positions, counters and the like between
//! independent runs of the same check. They are not intended for
//! substantial amounts of data. The record is serialized as a plain
//! JSON object so administrators can inspect and edit state files.
//!
//! A sidecar lock file carries an exclusive advisory lock so that at
//! most one invocation of the same check identity has the cookie open.
//! Changes are not reflected on disk until [`Cookie::commit`], which
//! replaces the state file atomically; a concurrent reader never
//! observes a half-written record.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::config::CONFIG;
use crate::error::StorageError;

#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Stable identity of a check, used to derive the state file location
/// deterministically.
#[derive(Debug, Clone)]
pub struct CheckIdentity {
    name: String,
    discriminator: Option<String>,
}

impl CheckIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        CheckIdentity {
            name: name.into(),
            discriminator: None,
        }
    }

    /// Distinguishes several instances of the same check, e.g. one per
    /// monitored interface or log file.
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    /// State file path for this identity inside `dir`.
    pub fn state_file(&self, dir: &Path) -> PathBuf {
        let mut stem = sanitize(&self.name);
        if let Some(discriminator) = &self.discriminator {
            stem.push('_');
            stem.push_str(&sanitize(discriminator));
        }
        dir.join(format!("{}.json", stem))
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(unix)]
type LockHandle = Flock<File>;
#[cfg(not(unix))]
type LockHandle = File;

/// Durable key-value record persisted across runs of the same check.
pub struct Cookie {
    path: Option<PathBuf>,
    data: Map<String, Value>,
    lock: Option<LockHandle>,
    closed: bool,
}

impl Cookie {
    /// Opens the state record for a check identity at the configured
    /// state directory. Creates an empty record if none exists.
    pub fn for_identity(identity: &CheckIdentity) -> Result<Self, StorageError> {
        Self::open_with_lock_wait(identity.state_file(&CONFIG.state_dir), CONFIG.lock_wait)
    }

    /// Opens the state record at an explicit path, creating an empty
    /// record if none exists.
    ///
    /// Fails with [`StorageError::Corrupt`] if the file exists but does
    /// not hold a JSON object; the damaged file is truncated so the
    /// next run starts clean, but the corruption is never silently
    /// reported as "no state". Fails with [`StorageError::Locked`] if
    /// another invocation holds the record longer than the configured
    /// lock wait.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::open_with_lock_wait(path, CONFIG.lock_wait)
    }

    /// Like [`Cookie::open`] with an explicit bound on the lock wait.
    pub fn open_with_lock_wait(
        path: impl Into<PathBuf>,
        lock_wait: Duration,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        let lock = acquire_lock(&path, lock_wait)?;
        let data = load(&path)?;
        debug!("opened cookie {} with {} keys", path.display(), data.len());
        Ok(Cookie {
            path: Some(path),
            data,
            lock: Some(lock),
            closed: false,
        })
    }

    /// A cookie without a backing file. It behaves like a regular
    /// cookie but forgets its contents on drop; useful to explicitly
    /// throw away state between runs.
    pub fn oblivious() -> Self {
        Cookie {
            path: None,
            data: Map::new(),
            lock: None,
            closed: false,
        }
    }

    /// Opens a cookie, runs `body`, commits on success and closes on
    /// every path. The commit-on-success/discard-on-failure sequence of
    /// the scoped acquisition pattern.
    pub fn with_open<T, E, F>(path: impl Into<PathBuf>, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Cookie) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut cookie = Cookie::open(path)?;
        match body(&mut cookie) {
            Ok(value) => {
                cookie.commit()?;
                cookie.close();
                Ok(value)
            }
            Err(e) => {
                cookie.close();
                Err(e)
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads a value. Absent keys and values that do not deserialize
    /// into `T` both read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Sets a value in memory. No I/O happens until [`Cookie::commit`].
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Durably persists the current record.
    ///
    /// The record is serialized to a temporary file in the state
    /// directory, fsynced, and renamed over the canonical path in one
    /// atomic step. On failure the in-memory record remains usable but
    /// durability is not guaranteed until a later commit succeeds.
    pub fn commit(&mut self) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        let payload = serde_json::to_string(&self.data)
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(payload.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        debug!("committed {} keys to {}", self.data.len(), path.display());
        Ok(())
    }

    /// Closes the cookie and releases the lock. Uncommitted changes are
    /// discarded. Closing twice has no effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.lock = None;
        if let Some(path) = &self.path {
            debug!("closed cookie {}", path.display());
        }
    }
}

fn load(path: &Path) -> Result<Map<String, Value>, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    let reason = match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => "does not contain an object".to_string(),
        Err(e) => e.to_string(),
    };
    // Truncate so subsequent runs do not fail repeatedly on the same
    // damaged record; the caller still sees the corruption.
    if let Err(e) = fs::write(path, "") {
        warn!("could not truncate corrupt state file {}: {}", path.display(), e);
    }
    Err(StorageError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })
}

fn lock_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

fn open_lock_file(path: &Path) -> Result<File, StorageError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))
        .map_err(|source| StorageError::Io {
            path: lock_path(path),
            source,
        })
}

/// Takes the single-writer advisory lock for a state file.
///
/// The lock lives on a sidecar `<file>.lock` so the atomic rename in
/// [`Cookie::commit`] never invalidates a held lock. Contention is
/// retried until `lock_wait` elapses, then surfaces as
/// [`StorageError::Locked`].
#[cfg(unix)]
fn acquire_lock(path: &Path, lock_wait: Duration) -> Result<LockHandle, StorageError> {
    use std::time::Instant;

    let deadline = Instant::now() + lock_wait;
    let mut file = open_lock_file(path)?;
    loop {
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => return Ok(lock),
            Err((unlocked, errno)) if errno == nix::errno::Errno::EWOULDBLOCK => {
                if Instant::now() >= deadline {
                    return Err(StorageError::Locked {
                        path: path.to_path_buf(),
                    });
                }
                file = unlocked;
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err((_, errno)) => {
                return Err(StorageError::Io {
                    path: lock_path(path),
                    source: std::io::Error::from_raw_os_error(errno as i32),
                })
            }
        }
    }
}

/// Advisory locking is not available on this platform; the lock file is
/// still created so the discipline stays visible.
#[cfg(not(unix))]
fn acquire_lock(path: &Path, _lock_wait: Duration) -> Result<LockHandle, StorageError> {
    open_lock_file(path)
}
