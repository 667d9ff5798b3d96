// src/watch/service.rs

//! The seam between the watcher and the OS notification primitive.
//!
//! `DirWatchService` models the primitive with exactly the operations the
//! poll loop needs: probe for a pending batch, acknowledge it, close the
//! handle. The production implementation wraps `notify`; tests drive the
//! loop with scripted services instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::errors::{Result, WatchError};

/// Upper bound on how long one probe may wait for an event.
///
/// The probe runs on a blocking-capable worker, so a short wait here paces
/// the poll loop without stalling the async runtime.
const PROBE_TIMEOUT: Duration = Duration::from_millis(50);

/// Classification of a directory change, reduced to what the watcher
/// distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Created,
    Removed,
    Other,
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            _ => ChangeKind::Other,
        }
    }
}

/// One directory-entry change: what happened and to which entry.
///
/// `name` is the file-name component only; the registered directory is
/// implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    kind: ChangeKind,
    name: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, name: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn name(&self) -> &Path {
        &self.name
    }
}

/// An ordered batch of buffered change events returned by one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationBatch {
    events: Vec<ChangeEvent>,
}

impl NotificationBatch {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self { events }
    }

    /// Events in OS delivery order.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }
}

/// A registered directory watch.
///
/// Contract: after `poll` returns a batch, the service yields no further
/// batches until that batch is acknowledged. Skipping the acknowledge
/// starves every later notification from the same registration.
pub trait DirWatchService: Send {
    /// Probe for a pending batch. Returns `None` when nothing is buffered
    /// within the probe's bounded wait.
    fn poll(&mut self) -> Option<NotificationBatch>;

    /// Re-arm the registration after consuming `batch`.
    fn acknowledge(&mut self, batch: NotificationBatch);

    /// Release the underlying OS handle.
    fn close(&mut self) -> Result<()>;
}

/// Production `DirWatchService` backed by the `notify` crate.
///
/// notify invokes its handler on an internal thread; the handler strips each
/// event down to (kind, file name) and forwards it over a channel. `poll`
/// then does a bounded `recv_timeout` probe on that channel and drains
/// whatever else is already buffered into a single ordered batch.
pub struct NotifyWatchService {
    watcher: RecommendedWatcher,
    directory: PathBuf,
    event_rx: Receiver<ChangeEvent>,
    armed: bool,
}

impl NotifyWatchService {
    /// Create a watch handle and register `directory` (non-recursively) for
    /// change events.
    ///
    /// A handle created before a failed registration is released again by
    /// drop before the error is returned.
    pub fn register(directory: &Path) -> Result<Self> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded::<ChangeEvent>();

        let mut watcher = RecommendedWatcher::new(
            {
                let event_tx = event_tx.clone();
                move |res: notify::Result<Event>| forward_event(&event_tx, res)
            },
            Config::default(),
        )
        .map_err(WatchError::Init)?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Registration {
                directory: directory.to_path_buf(),
                source,
            })?;

        debug!("registered watch on directory {:?}", directory);

        Ok(Self {
            watcher,
            directory: directory.to_path_buf(),
            event_rx,
            armed: true,
        })
    }
}

/// Closure called synchronously by notify whenever an event arrives.
fn forward_event(event_tx: &Sender<ChangeEvent>, res: notify::Result<Event>) {
    match res {
        Ok(event) => {
            let kind = ChangeKind::from(&event.kind);
            for path in &event.paths {
                let Some(name) = path.file_name() else {
                    continue;
                };
                if event_tx.send(ChangeEvent::new(kind, name)).is_err() {
                    // Receiver gone: the service was dropped.
                    return;
                }
            }
        }
        Err(err) => {
            warn!("watch backend error: {err}");
        }
    }
}

impl DirWatchService for NotifyWatchService {
    fn poll(&mut self) -> Option<NotificationBatch> {
        if !self.armed {
            return None;
        }

        let first = match self.event_rx.recv_timeout(PROBE_TIMEOUT) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
        };

        let mut events = vec![first];
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }

        self.armed = false;
        Some(NotificationBatch::new(events))
    }

    fn acknowledge(&mut self, _batch: NotificationBatch) {
        self.armed = true;
    }

    fn close(&mut self) -> Result<()> {
        self.watcher
            .unwatch(&self.directory)
            .map_err(WatchError::Close)
    }
}

impl std::fmt::Debug for NotifyWatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatchService")
            .field("directory", &self.directory)
            .field("armed", &self.armed)
            .finish()
    }
}
