// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::watch::service::{ChangeKind, DirWatchService, NotifyWatchService};
use crate::watch::target::WatchTarget;

/// Callback invoked on each detected modification.
///
/// `Some(name)` carries the watched file's name component; `None` is the
/// single terminal signal meaning the watcher is not running, emitted both
/// when construction failed and after `close()`.
pub type ModifyHandler = Arc<dyn Fn(Option<PathBuf>) + Send + Sync>;

/// Everything the poll loop needs, present only while the watcher holds a
/// live registration. `close()` takes it out; a failed construction never
/// puts it in.
struct WatchInner {
    service: Box<dyn DirWatchService>,
    file_name: PathBuf,
}

/// Watches a single file for modification and reports each change to a
/// registered callback.
///
/// The watch is registered on the file's parent directory at construction
/// and polled from a self-resubmitting loop: each step runs the bounded
/// probe on `spawn_blocking`, dispatches at most one callback per batch and
/// re-enqueues itself. Exactly one step is outstanding at any time, so
/// callbacks never overlap.
///
/// Construction failures degrade the instance to inert instead of
/// propagating; see [`FileModifyWatcher::watch`].
pub struct FileModifyWatcher {
    scheduler: Handle,
    started: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<WatchInner>>>,
}

enum StepOutcome {
    Continue,
    Stop,
}

impl FileModifyWatcher {
    /// Set up a watcher for `path`.
    ///
    /// `scheduler` hosts the poll loop; poll steps themselves run on its
    /// blocking worker pool. Registration happens here, exactly once. If the
    /// target cannot be resolved or the registration fails, the error is
    /// logged and the instance stays inert: `watch` will then report a
    /// single `None` and never poll.
    pub fn new(scheduler: Handle, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let inner = match WatchTarget::resolve(path) {
            Ok(target) => match NotifyWatchService::register(target.directory()) {
                Ok(service) => {
                    info!("watching {:?} for modifications", path);
                    Some(WatchInner {
                        service: Box::new(service),
                        file_name: target.file_name().to_path_buf(),
                    })
                }
                Err(err) => {
                    error!("failed to register watch for {:?}: {err}", path);
                    None
                }
            },
            Err(err) => {
                error!("failed to initialize watcher: {err}");
                None
            }
        };

        Self {
            scheduler,
            started: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(inner)),
        }
    }

    /// Begin monitoring, reporting each modification to `handler`.
    ///
    /// Start is idempotent: only the first call (the winner of the started
    /// flag's compare-exchange) starts the loop; every other call, racing or
    /// sequential, is a no-op. If the instance is not running (construction
    /// failed, or it was closed), the winning call invokes `handler` once
    /// with `None` and does not poll.
    pub fn watch<F>(&self, handler: F)
    where
        F: Fn(Option<PathBuf>) + Send + Sync + 'static,
    {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("watch() called while already started; ignoring");
            return;
        }

        let handler: ModifyHandler = Arc::new(handler);

        let running = match self.slot.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => {
                warn!("watch state mutex poisoned; treating watcher as stopped");
                false
            }
        };
        if !running {
            handler(None);
            return;
        }

        self.spawn_poll_loop(handler);
    }

    /// Stop monitoring and release the watch registration.
    ///
    /// Safe to call any number of times, from any thread, also while a poll
    /// step is in flight: the flag flips immediately and the loop exits at
    /// its next guard check, emitting the terminal `None`. A close failure
    /// in the backend is logged and swallowed.
    pub fn close(&self) {
        self.started.store(false, Ordering::SeqCst);

        let inner = match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                warn!("watch state mutex poisoned during close");
                None
            }
        };

        if let Some(mut inner) = inner {
            debug!("closing watch on {:?}", inner.file_name);
            if let Err(err) = inner.service.close() {
                error!("error while closing watch service: {err}");
            }
        }
    }

    /// Trampoline: one orchestration task that submits each poll step to the
    /// blocking pool and re-enqueues itself until a step reports `Stop`.
    fn spawn_poll_loop(&self, handler: ModifyHandler) {
        let scheduler = self.scheduler.clone();
        let started = Arc::clone(&self.started);
        let slot = Arc::clone(&self.slot);

        self.scheduler.spawn(async move {
            loop {
                let step = {
                    let started = Arc::clone(&started);
                    let slot = Arc::clone(&slot);
                    let handler = Arc::clone(&handler);
                    scheduler.spawn_blocking(move || poll_step(&started, &slot, &handler))
                };

                match step.await {
                    Ok(StepOutcome::Continue) => {}
                    Ok(StepOutcome::Stop) => break,
                    Err(err) => {
                        error!("poll step did not complete: {err}");
                        break;
                    }
                }
            }
            debug!("poll loop ended");
        });
    }

    #[cfg(test)]
    fn from_parts(
        scheduler: Handle,
        file_name: impl Into<PathBuf>,
        service: Option<Box<dyn DirWatchService>>,
    ) -> Self {
        let inner = service.map(|service| WatchInner {
            service,
            file_name: file_name.into(),
        });
        Self {
            scheduler,
            started: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(inner)),
        }
    }
}

impl std::fmt::Debug for FileModifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileModifyWatcher")
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

/// One iteration of the poll loop, run on a blocking-capable worker.
///
/// Guard first, then probe; the handler is only ever invoked with the state
/// mutex released, so a handler may call `close()` without deadlocking.
fn poll_step(
    started: &AtomicBool,
    slot: &Mutex<Option<WatchInner>>,
    handler: &ModifyHandler,
) -> StepOutcome {
    if !started.load(Ordering::SeqCst) {
        handler(None);
        return StepOutcome::Stop;
    }

    let mut guard = match slot.lock() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("watch state mutex poisoned; stopping poll loop");
            handler(None);
            return StepOutcome::Stop;
        }
    };

    let Some(inner) = guard.as_mut() else {
        drop(guard);
        handler(None);
        return StepOutcome::Stop;
    };

    let Some(batch) = inner.service.poll() else {
        return StepOutcome::Continue;
    };

    // First matching event wins; the rest of the batch is discarded, so a
    // batch produces at most one callback.
    let matched = batch
        .events()
        .iter()
        .find(|event| event.kind() == ChangeKind::Modified && event.name() == inner.file_name)
        .map(|_| inner.file_name.clone());

    // Always re-arm, match or not; skipping this starves every future
    // notification from the registration.
    inner.service.acknowledge(batch);
    drop(guard);

    if let Some(name) = matched {
        debug!("modification detected on {:?}", name);
        handler(Some(name));
    }

    StepOutcome::Continue
}
