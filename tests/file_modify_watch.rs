// tests/file_modify_watch.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::sleep;

use modwatch::FileModifyWatcher;

type TestResult = Result<(), Box<dyn Error>>;

/// Grace period for the OS backend to arm itself / flush buffered events.
const SETTLE: Duration = Duration::from_millis(300);

fn watch_into_channel(watcher: &FileModifyWatcher) -> mpsc::UnboundedReceiver<Option<PathBuf>> {
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.watch(move |value| {
        let _ = tx.send(value);
    });
    rx
}

#[tokio::test]
async fn end_to_end_watch_modify_close() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let hosts = dir.path().join("hosts");
    let other = dir.path().join("other");
    fs::write(&hosts, "127.0.0.1 localhost\n")?;
    fs::write(&other, "unrelated\n")?;

    let watcher = FileModifyWatcher::new(Handle::current(), &hosts);
    let mut rx = watch_into_channel(&watcher);
    sleep(SETTLE).await;

    // A sibling change must never surface; the watched file must.
    fs::write(&other, "still unrelated\n")?;
    fs::write(&hosts, "127.0.0.1 localhost\n::1 localhost\n")?;

    let first = with_timeout(rx.recv()).await.expect("callback stream ended early");
    assert_eq!(first.as_deref(), Some(Path::new("hosts")));

    // One overwrite may be reported by the OS as several events split across
    // batches; every delivery must still carry the watched name.
    sleep(SETTLE).await;
    while let Ok(value) = rx.try_recv() {
        assert_eq!(value.as_deref(), Some(Path::new("hosts")));
    }

    watcher.close();

    // The loop winds down with exactly one terminal None, then the handler
    // (and with it our sender) is dropped.
    let mut terminals = 0;
    while let Some(value) = with_timeout(rx.recv()).await {
        match value {
            None => terminals += 1,
            Some(name) => assert_eq!(name, Path::new("hosts")),
        }
    }
    assert_eq!(terminals, 1);

    // Post-close modifications go nowhere.
    fs::write(&hosts, "back to one line\n")?;
    sleep(SETTLE).await;
    assert!(rx.recv().await.is_none());

    Ok(())
}

#[tokio::test]
async fn sibling_modifications_are_ignored() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let hosts = dir.path().join("hosts");
    let other = dir.path().join("other");
    fs::write(&hosts, "127.0.0.1 localhost\n")?;
    fs::write(&other, "unrelated\n")?;

    let watcher = FileModifyWatcher::new(Handle::current(), &hosts);
    let mut rx = watch_into_channel(&watcher);
    sleep(SETTLE).await;

    fs::write(&other, "still unrelated\n")?;
    sleep(SETTLE).await;
    assert!(rx.try_recv().is_err());

    watcher.close();
    Ok(())
}

#[tokio::test]
async fn repeated_close_before_watch_is_safe() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n")?;

    let watcher = FileModifyWatcher::new(Handle::current(), &hosts);
    watcher.close();
    watcher.close();

    // A later watch() finds the registration gone and reports the single
    // terminal None without polling.
    let mut rx = watch_into_channel(&watcher);
    assert_eq!(with_timeout(rx.recv()).await, Some(None));
    assert!(rx.recv().await.is_none());

    Ok(())
}
