//! Counts previously unseen log lines containing a pattern.
//!
//! Demonstrates the full pipeline: resumable acquisition via `LogTail`
//! and `Cookie`, threshold evaluation, and plugin-protocol output.
//!
//! ```text
//! check_log --logfile /var/log/app.log --pattern ERROR -w 1 -c 10
//! ```

use std::path::PathBuf;
use std::process::exit;

use async_trait::async_trait;
use checkplugin::{
    Check, CheckError, CheckIdentity, Context, Cookie, LogTail, Metric, Resource, Runtime,
};
use clap::Parser;
use dotenv::dotenv;
use log::debug;

#[derive(Parser, Debug)]
#[command(name = "check_log")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the log file to scan.
    #[arg(long)]
    logfile: PathBuf,

    /// Count lines containing this text.
    #[arg(long)]
    pattern: String,

    /// Warning range for the number of matching lines.
    #[arg(short = 'w', long)]
    warning: Option<String>,

    /// Critical range for the number of matching lines.
    #[arg(short = 'c', long)]
    critical: Option<String>,

    /// Discard the saved file position and scan from the beginning.
    #[arg(long)]
    reset_state: bool,

    /// Abort the check after this many seconds (0 disables).
    #[arg(short = 't', long, default_value_t = 10)]
    timeout: u64,

    /// Increase output verbosity.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct MatchingLines {
    logfile: PathBuf,
    pattern: String,
    reset_state: bool,
}

#[async_trait]
impl Resource for MatchingLines {
    fn name(&self) -> &str {
        "log"
    }

    async fn probe(&self) -> Result<Vec<Metric>, CheckError> {
        debug!("scanning {} for '{}'", self.logfile.display(), self.pattern);
        let cookie = if self.reset_state {
            Cookie::oblivious()
        } else {
            let identity = CheckIdentity::new("check_log")
                .with_discriminator(self.logfile.to_string_lossy());
            Cookie::for_identity(&identity)?
        };
        let pattern = self.pattern.clone();
        let matches = LogTail::new(&self.logfile, cookie).scan(|lines| {
            let mut matches = 0u64;
            while let Some(line) = lines.next_line()? {
                if String::from_utf8_lossy(&line).contains(&pattern) {
                    matches += 1;
                }
            }
            Ok(matches)
        })?;
        Ok(vec![Metric::new("matches", matches as f64).with_min(0.0)])
    }
}

fn build_check(args: &Cli) -> Result<Check, CheckError> {
    let mut context = Context::new("matches").fmt("{value} matching lines");
    if let Some(warning) = &args.warning {
        context = context.warning(warning)?;
    }
    if let Some(critical) = &args.critical {
        context = context.critical(critical)?;
    }
    Check::new("log")
        .resource(MatchingLines {
            logfile: args.logfile.clone(),
            pattern: args.pattern.clone(),
            reset_state: args.reset_state,
        })
        .context(context)
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let args = Cli::parse();
    debug!("Parsed args: {:?}", args);

    // Malformed ranges are a configuration mistake: fail fast before
    // any acquisition happens.
    let mut check = match build_check(&args) {
        Ok(check) => check,
        Err(e) => {
            println!("LOG UNKNOWN: {}", e);
            exit(3);
        }
    };

    let outcome = Runtime::new()
        .with_timeout_secs(args.timeout)
        .with_verbose(args.verbose)
        .execute(&mut check)
        .await;
    outcome.print_and_exit()
}
