//!
//! Common types and utilities shared by the price service and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `PriceError` used across the workspace.
//! - `result` — handy `Result<T, PriceError>` alias.
//! - `quote` — `PriceQuote` and `PriceSnapshot`, the data handed between fetcher and cache.
//! - `symbols` — supported coins and the symbol ⇄ provider identifier mapping.
//! - `net` — provider endpoint and timing constants.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;

pub use error::PriceError;
pub use quote::{PriceQuote, PriceSnapshot};
pub use result::Result;
pub use symbols::SymbolMapping;
