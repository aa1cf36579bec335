use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use std::{env, fmt};

/// Engine configuration, read from the environment once at first use.
///
/// The check identity is always passed explicitly by the caller; only
/// the directory holding state files and the lock-acquisition budget
/// are ambient.
pub struct Config {
    /// Directory for cookie state files. `CHECKPLUGIN_STATE_DIR`
    /// overrides the system temp directory.
    pub state_dir: PathBuf,
    /// Upper bound on waiting for another invocation's state-file lock.
    /// `CHECKPLUGIN_LOCK_WAIT` in seconds.
    pub lock_wait: Duration,
}

impl Config {
    pub fn new() -> Self {
        let state_dir = env::var("CHECKPLUGIN_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());
        let lock_wait = env::var("CHECKPLUGIN_LOCK_WAIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Config {
            state_dir,
            lock_wait,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("state_dir", &self.state_dir)
            .field("lock_wait", &self.lock_wait)
            .finish()
    }
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::new);
