//! Per-key application state shared between handlers.
//!
//! The store is constructed by whoever owns the state (usually the code that
//! registers handlers) and handed to handler closures through an `Arc`. There
//! is no global instance.

mod keyed;
mod record;

pub use keyed::{KeyedStore, WarningZone, AUTO_KEY_START};
pub use record::Record;
