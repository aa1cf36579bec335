//! Engine for building monitoring-check executables.
//!
//! A check run moves through three phases: *acquisition* measures the
//! monitored system and produces [`Metric`]s, *evaluation* judges each
//! metric against the warning/critical ranges of its [`Context`], and
//! *presentation* renders the status line and performance data. The
//! overall severity is the worst per-metric outcome and maps to the
//! fixed plugin exit codes (0 ok, 1 warning, 2 critical, 3 unknown).
//!
//! Checks are short-lived processes started by a monitoring system.
//! The [`Cookie`] state store persists cursors, offsets and counters
//! between invocations with an atomic commit and a single-writer lock;
//! [`LogTail`] builds on it to scan only the unseen part of a growing
//! log file.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use checkplugin::{Check, CheckError, Context, Metric, Resource, Runtime};
//!
//! struct Load;
//!
//! #[async_trait]
//! impl Resource for Load {
//!     fn name(&self) -> &str {
//!         "load"
//!     }
//!
//!     async fn probe(&self) -> Result<Vec<Metric>, CheckError> {
//!         Ok(vec![Metric::new("load1", 0.7)])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut check = Check::new("load")
//!         .resource(Load)
//!         .context(Context::new("load1").warning("5").unwrap().critical("10").unwrap())
//!         .unwrap();
//!     let outcome = Runtime::new().with_timeout_secs(10).execute(&mut check).await;
//!     outcome.print_and_exit();
//! }
//! ```

pub mod check;
pub mod config;
pub mod context;
pub mod cookie;
pub mod error;
pub mod logtail;
pub mod metric;
pub mod output;
pub mod perfdata;
pub mod range;
pub mod resource;
pub mod result;
pub mod runtime;
pub mod severity;
pub mod summary;

pub use check::{Check, RunPhase};
pub use config::Config;
pub use context::{Context, Contexts};
pub use cookie::{CheckIdentity, Cookie};
pub use error::{CheckError, StorageError};
pub use logtail::{LogLines, LogTail};
pub use metric::Metric;
pub use output::Output;
pub use perfdata::Perfdata;
pub use range::Range;
pub use resource::Resource;
pub use result::{CheckResult, Results};
pub use runtime::{Outcome, Runtime};
pub use severity::{worst, Severity};
pub use summary::{DefaultSummary, Summary};
