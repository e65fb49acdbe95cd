//! Error types shared between the service and the client.
//!
//! The `PriceError` enum unifies the failure cases of storage, the price
//! provider, configuration and internal synchronization. Inside the fetcher
//! most of them are recovered by falling back to the cache; only configuration
//! and input errors ever reach a binary's `main`.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by service and client.
#[derive(Error, Debug)]
pub enum PriceError {
    /// I/O error originating from the standard library or the cache files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// The request never produced a response (connection refused, timeout, DNS...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with something other than `200 OK`.
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// The provider answered `200 OK` but the body could not be used.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Error while parsing a symbol or mapping file.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for PriceError {
    fn from(err: PoisonError<T>) -> Self {
        PriceError::MutexLock(err.to_string())
    }
}
