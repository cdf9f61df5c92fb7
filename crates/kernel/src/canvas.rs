use glam::DVec2;
use regionworld_common::EntityId;

use crate::block::BlockId;
use crate::entity::Entity;

/// Draw target for the read-only draw passes. Positions are screen space.
pub trait Canvas {
    fn draw_tile(&mut self, block: &BlockId, screen: DVec2);
    fn draw_entity(&mut self, entity: &Entity, screen: DVec2);
}

/// Canvas that just records what it was asked to draw.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pub tiles: Vec<(BlockId, DVec2)>,
    pub entities: Vec<(EntityId, DVec2)>,
}

impl Canvas for RecordingCanvas {
    fn draw_tile(&mut self, block: &BlockId, screen: DVec2) {
        self.tiles.push((block.clone(), screen));
    }

    fn draw_entity(&mut self, entity: &Entity, screen: DVec2) {
        self.entities.push((entity.id(), screen));
    }
}
