use glam::DVec2;
use regionworld_common::{EntityId, Position};
use regionworld_stream::{REGION_SIZE, RegionKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Block, BlockBehavior, BlockRecord, TILE_SIZE};
use crate::camera::Camera;
use crate::canvas::Canvas;
use crate::entity::Entity;

/// Tiles along one side of a region.
pub const TILES_PER_SIDE: usize = (REGION_SIZE as f64 / TILE_SIZE) as usize;

/// Errors from encoding or decoding a region payload.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("payload does not decode: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("payload does not encode: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("expected {expected} tile rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("tile row {row} has {found} tiles, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// One fixed-size cell of the world, owning the blocks and entities inside it.
pub trait Region {
    fn key(&self) -> RegionKey;

    /// Resident entities, in insertion order.
    fn entities(&self) -> &[Entity];

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities().iter().find(|e| e.id() == id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity>;

    fn add_entity(&mut self, entity: Entity);

    fn remove_entity(&mut self, id: EntityId) -> Option<Entity>;

    fn contains(&self, position: Position) -> bool {
        self.key().contains(position)
    }

    fn get_block(&self, position: Position) -> Option<&Block>;

    /// Replace the block at `position`. Returns `false` when the position is
    /// outside this region.
    fn set_block(&mut self, position: Position, block: Block) -> bool;

    /// Entities whose hitbox covers `position`.
    fn entities_at(&self, position: Position, ignore_player: bool) -> Vec<&Entity>;

    fn draw_blocks(&self, camera: &Camera, canvas: &mut dyn Canvas);

    fn draw_entities(&self, camera: &Camera, canvas: &mut dyn Canvas);

    /// Advance one tick. Returns entities that left the simulation (killed).
    fn update(&mut self) -> Vec<Entity>;

    fn to_payload(&self) -> Result<Value, RegionError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TilePayload {
    blocks: Vec<Vec<BlockRecord>>,
    #[serde(default)]
    entities: Vec<Entity>,
}

/// Default region: a 20×20 grid of tiles plus its resident entities.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRegion {
    key: RegionKey,
    tiles: Vec<Block>,
    entities: Vec<Entity>,
}

impl TileRegion {
    pub fn empty(key: RegionKey) -> Self {
        Self {
            key,
            tiles: vec![Block::Empty; TILES_PER_SIDE * TILES_PER_SIDE],
            entities: Vec::new(),
        }
    }

    /// Build from a row-major tile closure: `tile(column, row)`.
    pub fn from_fn(key: RegionKey, mut tile: impl FnMut(usize, usize) -> Block) -> Self {
        let mut region = Self::empty(key);
        for row in 0..TILES_PER_SIDE {
            for column in 0..TILES_PER_SIDE {
                region.tiles[row * TILES_PER_SIDE + column] = tile(column, row);
            }
        }
        region
    }

    pub fn from_payload(key: RegionKey, payload: &Value) -> Result<Self, RegionError> {
        let decoded = TilePayload::deserialize(payload).map_err(RegionError::Decode)?;
        if decoded.blocks.len() != TILES_PER_SIDE {
            return Err(RegionError::RowCount {
                expected: TILES_PER_SIDE,
                found: decoded.blocks.len(),
            });
        }

        let mut tiles = Vec::with_capacity(TILES_PER_SIDE * TILES_PER_SIDE);
        for (row, records) in decoded.blocks.into_iter().enumerate() {
            if records.len() != TILES_PER_SIDE {
                return Err(RegionError::RowLength {
                    row,
                    expected: TILES_PER_SIDE,
                    found: records.len(),
                });
            }
            tiles.extend(records.into_iter().map(Block::from_record));
        }

        Ok(Self {
            key,
            tiles,
            entities: decoded.entities,
        })
    }

    fn tile_index(&self, position: Position) -> Option<usize> {
        if !self.key.contains(position) {
            return None;
        }
        let local = (position.as_dvec2() - self.key.anchor()) / TILE_SIZE;
        let column = (local.x.floor() as usize).min(TILES_PER_SIDE - 1);
        let row = (local.y.floor() as usize).min(TILES_PER_SIDE - 1);
        Some(row * TILES_PER_SIDE + column)
    }

    fn tile_origin(&self, index: usize) -> DVec2 {
        let column = (index % TILES_PER_SIDE) as f64;
        let row = (index / TILES_PER_SIDE) as f64;
        self.key.anchor() + DVec2::new(column, row) * TILE_SIZE
    }
}

impl Region for TileRegion {
    fn key(&self) -> RegionKey {
        self.key
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id() == id)?;
        Some(self.entities.remove(index))
    }

    fn get_block(&self, position: Position) -> Option<&Block> {
        self.tile_index(position).map(|i| &self.tiles[i])
    }

    fn set_block(&mut self, position: Position, block: Block) -> bool {
        match self.tile_index(position) {
            Some(i) => {
                self.tiles[i] = block;
                true
            }
            None => false,
        }
    }

    fn entities_at(&self, position: Position, ignore_player: bool) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| !(ignore_player && e.is_player()))
            .filter(|e| e.hit_test(position))
            .collect()
    }

    fn draw_blocks(&self, camera: &Camera, canvas: &mut dyn Canvas) {
        for (i, block) in self.tiles.iter().enumerate() {
            if !block.is_empty() {
                block.draw(camera.project(self.tile_origin(i)), canvas);
            }
        }
    }

    fn draw_entities(&self, camera: &Camera, canvas: &mut dyn Canvas) {
        for entity in self.entities.iter().filter(|e| !e.is_killed()) {
            canvas.draw_entity(entity, camera.project(entity.position().as_dvec2()));
        }
    }

    fn update(&mut self) -> Vec<Entity> {
        for block in &mut self.tiles {
            block.update();
        }

        for entity in self.entities.iter_mut().filter(|e| !e.is_killed()) {
            if let Err(err) = entity.step() {
                tracing::warn!(id = ?entity.id(), %err, "entity step rejected; halting it");
                entity.halt();
            }
        }

        let (departed, alive): (Vec<Entity>, Vec<Entity>) =
            std::mem::take(&mut self.entities).into_iter().partition(Entity::is_killed);
        self.entities = alive;
        departed
    }

    fn to_payload(&self) -> Result<Value, RegionError> {
        let payload = TilePayload {
            blocks: self
                .tiles
                .chunks(TILES_PER_SIDE)
                .map(|row| row.iter().map(Block::to_record).collect())
                .collect(),
            entities: self.entities.clone(),
        };
        serde_json::to_value(&payload).map_err(RegionError::Encode)
    }
}
