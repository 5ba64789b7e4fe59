//! Core types for Versa
//!
//! This crate holds the vocabulary shared by every layer:
//! - [`Key`], [`TxnId`], [`Timestamp`], [`ConcurrencyPolicy`] identifiers
//! - [`Value`]: the canonical record value model
//! - [`Error`] / [`Result`]: the unified error surface

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::{ConcurrencyPolicy, Key, Timestamp, TxnId};
pub use value::Value;
