//! Streaming: region indexing, the per-tick streaming window, draw ordering.
//!
//! # Invariants
//! - A region key is the floor-snapped anchor of its cell; `containing` and
//!   `contains` always agree.
//! - The draw list never holds a duplicate key.
//! - When the player's region is scanned, it is the first entry of the draw list.

mod grid;
mod timer;
mod window;

pub use grid::{KeyError, REGION_SIZE, RegionKey, neighborhood, window_keys};
pub use timer::TickTimer;
pub use window::{StreamConfig, StreamStats, StreamWindow, order_draw_list};
