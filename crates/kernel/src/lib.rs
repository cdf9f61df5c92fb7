//! World Kernel: region grid, streaming tick, entity migration and save state.
//!
//! # Invariants
//! - At most one region exists per cell; regions are never evicted.
//! - The player's region, when streamed, is first in the draw list.
//! - At most one player entity exists across regions, orphans and the
//!   dormant slot.
//! - Same seed and key always generate the same region.
//! - All state mutations flow through explicit operations.

mod block;
mod camera;
mod canvas;
mod context;
mod entity;
mod error;
mod factory;
mod generator;
mod region;
mod save;
mod world;

pub use block::{
    Block, BlockBehavior, BlockId, BlockRecord, ContainerBlock, EMPTY_BLOCK_ID, SolidBlock, TILE_SIZE,
};
pub use camera::{Camera, Viewport};
pub use canvas::{Canvas, RecordingCanvas};
pub use context::WorldContext;
pub use entity::{ENTITY_SIZE, Entity, PLAYER_KIND, Vitals};
pub use error::WorldError;
pub use factory::{CharacterFactory, DefaultCharacterFactory, FactoryError, SENTINEL_KIND};
pub use generator::{RegionGenerator, SeededGenerator};
pub use region::{Region, RegionError, TILES_PER_SIDE, TileRegion};
pub use save::{RegionPayload, WorldSave};
pub use world::{MigrationReport, Placement, SpawnKind, TickReport, World};
