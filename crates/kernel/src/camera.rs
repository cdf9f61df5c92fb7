use glam::DVec2;
use regionworld_common::{MAX_COORDINATE, Position};
use regionworld_stream::REGION_SIZE;
use serde::{Deserialize, Serialize};

/// Screen size the camera projects into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    pub fn half_extent(&self) -> DVec2 {
        DVec2::new(self.width, self.height) / 2.0
    }
}

/// 2D viewpoint. `position` is the world point at the top-left of the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Position,
    viewport: Viewport,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            position: Position::ORIGIN,
            viewport,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x()
    }

    pub fn y(&self) -> f64 {
        self.position.y()
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn reset(&mut self) {
        self.position = Position::ORIGIN;
    }

    /// Put `target` at the middle of the screen. Near the world edge the
    /// camera stops at the edge instead.
    pub fn focus_on(&mut self, target: Position) {
        self.position = target.saturating_translate(-self.viewport.half_extent());
    }

    /// World space to screen space.
    pub fn project(&self, world: DVec2) -> DVec2 {
        world - self.position.as_dvec2()
    }

    /// Whether a region anchored at `anchor` can overlap the screen.
    pub fn is_region_visible(&self, anchor: DVec2) -> bool {
        let screen = self.project(anchor);
        let margin = -(REGION_SIZE as f64);
        (margin..=self.viewport.width).contains(&screen.x)
            && (margin..=self.viewport.height).contains(&screen.y)
    }
}
