use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canvas::Canvas;

/// Side length of one tile, in world units.
pub const TILE_SIZE: f64 = 40.0;

/// Block id that always means "nothing here".
pub const EMPTY_BLOCK_ID: &str = "air";

/// Name of a block type, e.g. `"stone"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What every block variant can do.
pub trait BlockBehavior {
    /// Per-tick hook.
    fn update(&mut self);

    /// Draw at an already projected screen position.
    fn draw(&self, screen: DVec2, canvas: &mut dyn Canvas);

    /// Mutable state worth persisting, if any.
    fn state_data(&self) -> Option<Value>;
}

/// Serialized form of one tile: `{ "block_id": ..., "state_data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_id: String,
    #[serde(default)]
    pub state_data: Option<Value>,
}

/// A plain block with no state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidBlock {
    pub id: BlockId,
    broken: bool,
}

/// A block carrying persistent state (contents, counters, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBlock {
    pub id: BlockId,
    pub state: Value,
    broken: bool,
}

/// The closed set of tile variants.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Block {
    #[default]
    Empty,
    Solid(SolidBlock),
    Container(ContainerBlock),
}

impl Block {
    /// Build a block from an id and optional state. `"air"` is always empty;
    /// any non-null state makes a container.
    pub fn new(id: &str, state: Option<Value>) -> Self {
        if id == EMPTY_BLOCK_ID {
            return Block::Empty;
        }
        match state {
            Some(state) if !state.is_null() => Block::Container(ContainerBlock {
                id: BlockId::new(id),
                state,
                broken: false,
            }),
            _ => Block::Solid(SolidBlock {
                id: BlockId::new(id),
                broken: false,
            }),
        }
    }

    pub fn from_record(record: BlockRecord) -> Self {
        Self::new(&record.block_id, record.state_data)
    }

    pub fn to_record(&self) -> BlockRecord {
        match self.id() {
            Some(id) => BlockRecord {
                block_id: id.to_string(),
                state_data: self.state_data(),
            },
            None => BlockRecord {
                block_id: EMPTY_BLOCK_ID.to_string(),
                state_data: None,
            },
        }
    }

    /// Id of a live block; `None` for empty or broken tiles.
    pub fn id(&self) -> Option<&BlockId> {
        match self {
            Block::Solid(b) if !b.broken => Some(&b.id),
            Block::Container(b) if !b.broken => Some(&b.id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id().is_none()
    }

    pub fn is_broken(&self) -> bool {
        match self {
            Block::Solid(b) => b.broken,
            Block::Container(b) => b.broken,
            Block::Empty => false,
        }
    }

    /// Break the block. It reads back as empty from now on.
    pub fn kill(&mut self) {
        match self {
            Block::Solid(b) => b.broken = true,
            Block::Container(b) => b.broken = true,
            Block::Empty => {}
        }
    }
}

impl BlockBehavior for Block {
    fn update(&mut self) {
        if self.is_broken() {
            *self = Block::Empty;
        }
    }

    fn draw(&self, screen: DVec2, canvas: &mut dyn Canvas) {
        if let Some(id) = self.id() {
            canvas.draw_tile(id, screen);
        }
    }

    fn state_data(&self) -> Option<Value> {
        match self {
            Block::Container(b) if !b.broken => Some(b.state.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use serde_json::json;

    #[test]
    fn air_is_always_empty() {
        assert_eq!(Block::new("air", Some(json!({"x": 1}))), Block::Empty);
        assert!(Block::Empty.is_empty());
    }

    #[test]
    fn state_picks_container_variant() {
        assert!(matches!(Block::new("stone", None), Block::Solid(_)));
        assert!(matches!(Block::new("stone", Some(Value::Null)), Block::Solid(_)));
        let chest = Block::new("chest", Some(json!({"loot": ["gem"]})));
        assert!(matches!(chest, Block::Container(_)));
        assert_eq!(chest.state_data(), Some(json!({"loot": ["gem"]})));
    }

    #[test]
    fn record_shape_matches_save_layout() {
        let record = Block::new("chest", Some(json!(3))).to_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"block_id": "chest", "state_data": 3}));

        let parsed: BlockRecord = serde_json::from_value(json!({"block_id": "stone"})).unwrap();
        assert_eq!(Block::from_record(parsed), Block::new("stone", None));
    }

    #[test]
    fn broken_block_clears_on_update() {
        let mut block = Block::new("stone", None);
        block.kill();
        assert!(block.is_empty());
        assert_eq!(block.to_record().block_id, EMPTY_BLOCK_ID);
        block.update();
        assert_eq!(block, Block::Empty);
    }

    #[test]
    fn only_live_blocks_draw() {
        let mut canvas = RecordingCanvas::default();
        Block::new("stone", None).draw(DVec2::new(5.0, 6.0), &mut canvas);
        Block::Empty.draw(DVec2::ZERO, &mut canvas);
        assert_eq!(canvas.tiles, vec![(BlockId::new("stone"), DVec2::new(5.0, 6.0))]);
    }
}
