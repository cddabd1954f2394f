//! The follow loop: poll for growth, reopen, drain, repeat.
//!
//! Similar to `tail -f`, but byte oriented and driven one transition at a time.

use crate::error::FollowError;
use crate::handle::{self, Opener};
use crate::monitor::{self, Growth};
use crate::relay::{self, Relay, RelayError, BUFFER_SIZE};
use crate::seek::{self, SeekTarget};
use crate::watch::Nudges;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

/// Default delay between size checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Follow loop configuration
#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Delay between size checks while the file is not growing
    pub poll_interval: Duration,
}

impl FollowConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Where following begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    /// Byte offset from the start, clipped to the file
    Offset(i64),
    /// This many bytes before the current end, clipped to the file
    TailBytes(u64),
}

impl Default for StartAt {
    fn default() -> Self {
        StartAt::Offset(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    IdlePolling,
    GrowthDetected,
    Draining,
    /// Shutdown was requested. Terminal.
    Stopped,
}

/// Follows one file, writing its new bytes to `sink`.
pub struct Follower<O: Opener, W: Write> {
    path: PathBuf,
    opener: O,
    handle: O::Handle,
    sink: W,
    position: u64,
    last_size: u64,
    buffer: Vec<u8>,
    config: FollowConfig,
    shutdown: watch::Receiver<bool>,
    nudges: Option<Nudges>,
    state: FollowState,
}

impl<O: Opener, W: Write> Follower<O, W> {
    /// Open `path` and position it according to `start`.
    pub fn open(
        path: impl AsRef<Path>,
        opener: O,
        sink: W,
        start: StartAt,
        config: FollowConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, FollowError> {
        let path = path.as_ref().to_path_buf();
        let mut handle = opener
            .open(&path)
            .map_err(|source| FollowError::open(&path, source))?;

        let position = match start {
            StartAt::Offset(offset) => {
                seek::bounded_seek(&mut handle, SeekTarget::Absolute(offset))
            }
            StartAt::TailBytes(bytes) => {
                let back = i64::try_from(bytes).unwrap_or(i64::MAX);
                seek::bounded_seek(&mut handle, SeekTarget::Absolute(i64::MAX)).and_then(|_| {
                    seek::bounded_seek(&mut handle, SeekTarget::Relative(-back))
                })
            }
        }
        .map_err(FollowError::Metadata)?;

        tracing::info!("Following {} from offset {}", path.display(), position);

        Ok(Self {
            path,
            opener,
            handle,
            sink,
            position,
            last_size: 0,
            buffer: vec![0u8; BUFFER_SIZE],
            config,
            shutdown,
            nudges: None,
            state: FollowState::IdlePolling,
        })
    }

    /// Wake the idle poll early on filesystem events.
    pub fn with_nudges(mut self, nudges: Nudges) -> Self {
        self.nudges = Some(nudges);
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> FollowState {
        self.state
    }

    /// Offset of the next byte to be relayed.
    pub fn position(&self) -> u64 {
        self.position
    }

    #[cfg(test)]
    pub fn last_size(&self) -> u64 {
        self.last_size
    }

    /// Follow until shutdown is requested or a fatal error occurs.
    pub async fn run(&mut self) -> Result<(), FollowError> {
        while self.step().await? != FollowState::Stopped {}
        tracing::info!("Stopped following {}", self.path.display());
        Ok(())
    }

    /// Perform one state transition and return the new state.
    pub async fn step(&mut self) -> Result<FollowState, FollowError> {
        let next = match self.state {
            FollowState::IdlePolling => self.poll().await,
            FollowState::GrowthDetected => self.refresh()?,
            FollowState::Draining => self.drain_once().await?,
            FollowState::Stopped => FollowState::Stopped,
        };
        self.state = next;
        Ok(next)
    }

    async fn poll(&mut self) -> FollowState {
        match monitor::check_growth(&self.handle, self.last_size) {
            Ok(Growth::Unchanged) => {}
            Ok(growth) => {
                if let Growth::Shrank { from, to } = growth {
                    tracing::warn!(
                        "{} shrank from {} to {} bytes; truncation is not recovered",
                        self.path.display(),
                        from,
                        to
                    );
                } else {
                    tracing::debug!("Growth detected: {:?}", growth);
                }
                self.last_size = growth.new_size().unwrap_or(self.last_size);
                return FollowState::GrowthDetected;
            }
            Err(e) => {
                tracing::warn!("Size check failed ({}), tailing may not work", e);
            }
        }

        tokio::select! {
            biased;
            _ = stop_requested(&mut self.shutdown) => FollowState::Stopped,
            _ = tokio::time::sleep(self.config.poll_interval) => FollowState::IdlePolling,
            _ = nudged(&mut self.nudges) => FollowState::IdlePolling,
        }
    }

    fn refresh(&mut self) -> Result<FollowState, FollowError> {
        self.position = handle::refresh(&self.opener, &self.path, &mut self.handle)?;
        tracing::debug!("Reopened {} at offset {}", self.path.display(), self.position);
        Ok(FollowState::Draining)
    }

    async fn drain_once(&mut self) -> Result<FollowState, FollowError> {
        // A regular file is always readable; yielding lets a pending shutdown in
        tokio::select! {
            biased;
            _ = stop_requested(&mut self.shutdown) => return Ok(FollowState::Stopped),
            _ = tokio::task::yield_now() => {}
        }

        match relay::relay_chunk(&mut self.handle, &mut self.buffer, &mut self.sink) {
            Ok(Relay::Relayed(n)) => {
                self.position += n as u64;
                Ok(FollowState::Draining)
            }
            Ok(Relay::Drained) => Ok(FollowState::IdlePolling),
            Err(RelayError::Read(source)) => Err(FollowError::Read {
                path: self.path.clone(),
                source,
            }),
            Err(RelayError::Write(source)) => Err(FollowError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Resolves once shutdown is requested; never, if it no longer can be.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn nudged(nudges: &mut Option<Nudges>) {
    if let Some(n) = nudges {
        if n.next().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}
