// src/lib.rs

//! `modwatch`: watch a single file for modification without blocking an
//! async runtime.
//!
//! A [`FileModifyWatcher`] registers the file's parent directory with the OS
//! change-notification primitive once, at construction, and then drives a
//! poll loop on the runtime's blocking worker pool. Each detected
//! modification of the watched file invokes the registered callback with the
//! file's name; a single `None` callback signals that the watcher is not
//! running (construction failed, or it was closed).
//!
//! ```no_run
//! use modwatch::FileModifyWatcher;
//!
//! #[tokio::main]
//! async fn main() {
//!     let watcher = FileModifyWatcher::new(tokio::runtime::Handle::current(), "/etc/hosts");
//!     watcher.watch(|changed| match changed {
//!         Some(name) => println!("{} was modified", name.display()),
//!         None => println!("watcher stopped"),
//!     });
//!     // ... later:
//!     watcher.close();
//! }
//! ```

pub mod errors;
pub mod logging;
pub mod watch;

pub use errors::WatchError;
pub use watch::{FileModifyWatcher, WatchTarget};
