//! Persistence: JSON text codec for world saves and a file-backed save store.
//!
//! # Invariants
//! - A save is `{ seed, world_data: { column: { row: payload } } }`.
//! - Save files are append-only and hash-chained; a broken chain fails closed.
//! - Loading never partially populates a world.

pub mod codec;
pub mod store;

pub use codec::{CodecError, from_json_str, load_from_serialized, serialize_world, to_json_string};
pub use store::{IntegrityManifest, ManifestEntry, SaveStore, StoreError, StoreMeta};
