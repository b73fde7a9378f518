//! Feeding record store.
//!
//! # Responsibilities
//! - Validate incoming feeding submissions
//! - Hold records in a concurrent map with monotonically increasing ids
//! - Persist to a JSON file when a path is configured
//! - Summarize records for the stats endpoint

pub mod records;
pub mod validation;

pub use records::{total_quantity, FeedingEntry, FeedingStats, FeedingStore, StoreError, StoreResult};
pub use validation::{NewFeeding, ValidationError};
