// src/errors.rs

//! Crate-wide error types.
//!
//! Everything that can go wrong here is absorbed close to where it happens
//! (the watcher degrades to an inert instance instead of propagating), so
//! these types mostly feed log messages and the service trait's signatures.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to create watch backend: {0}")]
    Init(#[source] notify::Error),

    #[error("failed to register directory {directory:?} with watch backend: {source}")]
    Registration {
        directory: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to release watch backend: {0}")]
    Close(#[source] notify::Error),

    #[error("path {0:?} cannot be split into a parent directory and a file name")]
    InvalidTarget(PathBuf),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchError>;
