//! Shared value types used across the regionworld crates.
//!
//! # Invariants
//! - A `Position` is always finite and in range; malformed input is rejected
//!   at construction, never clamped.

mod types;

pub use types::{EntityId, MAX_COORDINATE, Position, PositionError};
