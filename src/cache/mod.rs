//! Cache module for storing typed values under random keys
//!
//! This module provides a `Cache` that writes values to a key-value store under
//! freshly generated UUID keys and reads them back with optional conversion.
//! Writes can be instrumented with call counting and input/output history, which
//! `replay` reads back.

mod instrument;
mod manager;
mod value;

use thiserror::Error;

use crate::store::StoreError;

pub use instrument::{
    inputs_key, outputs_key, replay, CallArgs, CallReplay, CountCalls, Operation, RecordHistory,
    RecordedCall,
};
pub use manager::{Cache, StoreValue, STORE_OPERATION};
pub use value::{to_float, to_int, to_text, ConversionError, StoredValue};

/// Errors returned by cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored value could not be converted to the requested type
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}
