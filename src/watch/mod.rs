// src/watch/mod.rs

//! Single-file modification watching.
//!
//! This module is responsible for:
//! - Splitting the watched path into a parent directory and file name
//!   (`target`).
//! - Wrapping the OS directory-change primitive behind a small service trait
//!   (`service`), with a `notify`-backed production implementation.
//! - Running the self-resubmitting poll loop that turns buffered directory
//!   events into callbacks (`watcher`).
//!
//! It does **not** debounce, follow renames, or watch more than one file;
//! callers wanting richer semantics should layer them on top.

pub mod service;
pub mod target;
pub mod watcher;

pub use service::{ChangeEvent, ChangeKind, DirWatchService, NotificationBatch, NotifyWatchService};
pub use target::WatchTarget;
pub use watcher::{FileModifyWatcher, ModifyHandler};
