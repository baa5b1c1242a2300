//! Errors returned by winelog
//!
use std::path::PathBuf;

use snafu::prelude::*;

/// Errors returned by winelog crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WinelogError {
    /// Write would exceed the storage capacity. Nothing was written.
    #[snafu(display("storage full: writing {key} needs {needed} bytes, quota is {quota}"))]
    StorageFull { key: String, needed: u64, quota: u64 },

    /// Filesystem error
    #[snafu(display("file {path:?}: {source}"))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error. unlikely to occur.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Deserialization error, with the json path where decoding failed
    #[snafu(display("Deserialization at {path}: {source}"))]
    Deserialization {
        path: String,
        source: serde_json::Error,
    },

    /// Imported data was not a json array of entries
    #[snafu(display("import failed: {message}"))]
    Import { message: String },

    // Http connection error
    #[snafu(display("HTTP error {method} url:{url}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Remote server responded with a non-success status
    #[snafu(display("server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: u16,
        method: String,
        url: String,
        message: String,
    },

    /// Input rejected before any state change
    #[snafu(display("Validation error: {message}"))]
    Validation { message: String },

    /// No entry with the given id
    #[snafu(display("entry {id} not found"))]
    NotFound { id: String },

    /// A chat request is already in flight
    #[snafu(display("chat is busy waiting for a reply"))]
    ChatBusy,

    /// Image could not be decoded or encoded
    #[snafu(display("image: {source}"))]
    Image { source: image::ImageError },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

impl WinelogError {
    /// True for errors caused by the caller's input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Import { .. } | Self::NotFound { .. }
        )
    }
}
