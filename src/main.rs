//! bytetail - Follow a growing file byte for byte
//!
//! Streams every byte appended to a file to stdout, starting from the
//! beginning or from a given offset, until interrupted.
//!
//! Usage:
//!   bytetail <FILE> [START_OFFSET]
//!
//! Example:
//!   bytetail /var/log/capture.bin 4096 > copy.bin

mod error;
mod follow;
mod handle;
mod monitor;
mod relay;
mod seek;
mod watch;

use clap::Parser;
use follow::{FollowConfig, Follower, StartAt};
use handle::FileOpener;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::watch as shutdown;

/// How long a stop request may wait on a blocked write before the process exits anyway
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// bytetail - Stream new bytes of a growing file to stdout
#[derive(Parser, Debug)]
#[command(name = "bytetail")]
#[command(version)]
#[command(about = "Follow a growing file and stream its new bytes to stdout", long_about = None)]
struct Args {
    /// File to follow
    file: PathBuf,

    /// Byte offset to start from (clipped to the file)
    #[arg(allow_negative_numbers = true)]
    start_offset: Option<i64>,

    /// Start this many bytes before the current end of the file
    #[arg(short = 't', long, conflicts_with = "start_offset")]
    tail_bytes: Option<u64>,

    /// Delay between size checks, in milliseconds
    #[arg(long, value_name = "MS", default_value = "500")]
    interval_ms: u64,

    /// Wake up early on filesystem notifications
    #[arg(long, default_value = "false")]
    notify: bool,

    /// Verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Args {
    fn start(&self) -> StartAt {
        match (self.tail_bytes, self.start_offset) {
            (Some(bytes), _) => StartAt::TailBytes(bytes),
            (None, offset) => StartAt::Offset(offset.unwrap_or(0)),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Help and version go to stdout and are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Logs go to stderr; stdout carries the file contents
    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bytetail: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = shutdown::channel(false);

    let config = FollowConfig::new(Duration::from_millis(args.interval_ms));
    let stdout = std::io::stdout().lock();
    let mut follower = Follower::open(
        &args.file,
        FileOpener::read_only(),
        stdout,
        args.start(),
        config,
        stop_rx,
    )?;

    if args.notify {
        match watch::Nudges::watch(&args.file) {
            Ok(nudges) => follower = follower.with_nudges(nudges),
            Err(e) => tracing::warn!("Notifications unavailable ({:#}), polling only", e),
        }
    }

    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(()) => tracing::info!("Shutting down..."),
            Err(e) => tracing::warn!("Signal handling unavailable: {:#}", e),
        }
        let _ = stop_tx.send(true);

        // A write stuck on a stalled pipe never gets back to the loop to see the stop
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        tracing::warn!("Output is blocked, exiting without draining");
        std::process::exit(0);
    });

    follower.run().await?;
    tracing::info!("Last offset {}", follower.position());
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl+C")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_offset() {
        let args = Args::try_parse_from(["bytetail", "data.bin", "2000"]).unwrap();
        assert_eq!(args.start(), StartAt::Offset(2000));
        assert_eq!(args.interval_ms, 500);
    }

    #[test]
    fn test_negative_offset_is_accepted() {
        let args = Args::try_parse_from(["bytetail", "data.bin", "-50"]).unwrap();
        assert_eq!(args.start(), StartAt::Offset(-50));
    }

    #[test]
    fn test_default_start() {
        let args = Args::try_parse_from(["bytetail", "data.bin"]).unwrap();
        assert_eq!(args.start(), StartAt::Offset(0));
        assert!(!args.notify);
    }

    #[test]
    fn test_tail_bytes() {
        let args = Args::try_parse_from(["bytetail", "-t", "64", "data.bin"]).unwrap();
        assert_eq!(args.start(), StartAt::TailBytes(64));
    }

    #[test]
    fn test_usage_errors() {
        assert!(Args::try_parse_from(["bytetail"]).is_err());
        assert!(Args::try_parse_from(["bytetail", "a", "1", "2"]).is_err());
        assert!(Args::try_parse_from(["bytetail", "a", "ten"]).is_err());
        assert!(Args::try_parse_from(["bytetail", "-t", "8", "a", "1"]).is_err());
    }
}
