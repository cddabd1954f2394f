//! Filesystem notifications that wake the idle poll early.
//!
//! A nudge only shortens the wait; the size check still decides whether the
//! file grew.

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use tokio::sync::mpsc;

/// Receives a unit message whenever the followed file is modified or created.
///
/// The watcher stops when this value is dropped.
pub struct Nudges {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<()>,
}

impl Nudges {
    /// Watch the parent directory of `path` for events on that file.
    pub fn watch(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .with_context(|| format!("Not a file path: {}", path.display()))?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    if is_relevant_event(&event, &file_name) {
                        let _ = tx.send(());
                    }
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        // Watch the parent directory so a recreated file is still seen
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        watcher
            .watch(parent, RecursiveMode::NonRecursive)
            .context("Failed to watch directory")?;

        tracing::debug!("Watching {} for changes", parent.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next nudge. Bursts are collapsed into one.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await?;
        while self.rx.try_recv().is_ok() {}
        Some(())
    }
}

fn is_relevant_event(event: &Event, file_name: &OsString) -> bool {
    match event.kind {
        EventKind::Modify(_) | EventKind::Create(_) => event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str())),
        _ => false,
    }
}
