use glam::DVec2;
use regionworld_common::{EntityId, Position, PositionError};
use serde::{Deserialize, Serialize};

/// Reserved identity of the single player entity.
pub const PLAYER_KIND: &str = "player";

/// Side length of an entity's square hitbox, in world units.
pub const ENTITY_SIZE: f64 = 40.0;

/// Health bookkeeping for living entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: i32,
    pub max_health: i32,
    pub is_killed: bool,
}

impl Vitals {
    pub fn full(max_health: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            is_killed: false,
        }
    }

    pub fn damage(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount);
        if self.health <= 0 {
            self.kill();
        }
    }

    pub fn kill(&mut self) {
        self.health = 0;
        self.is_killed = true;
    }

    /// Restore full health and clear the killed flag.
    pub fn revive(&mut self) {
        self.health = self.max_health;
        self.is_killed = false;
    }
}

/// A mobile thing living inside a region.
///
/// `kind` is the stable identity string the character factory built it from;
/// `"player"` is reserved for the one player entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    kind: String,
    position: Position,
    #[serde(default)]
    velocity: DVec2,
    vitals: Vitals,
}

impl Entity {
    pub fn new(kind: impl Into<String>, vitals: Vitals) -> Self {
        Self {
            id: EntityId::new(),
            kind: kind.into(),
            position: Position::ORIGIN,
            velocity: DVec2::ZERO,
            vitals,
        }
    }

    pub fn at(kind: impl Into<String>, position: Position, vitals: Vitals) -> Self {
        Self {
            position,
            ..Self::new(kind, vitals)
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_player(&self) -> bool {
        self.kind == PLAYER_KIND
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    /// Set the per-tick displacement. Non-finite components are rejected.
    pub fn set_velocity(&mut self, velocity: DVec2) -> Result<(), PositionError> {
        if !velocity.x.is_finite() {
            return Err(PositionError::NotFinite {
                axis: 'x',
                value: velocity.x,
            });
        }
        if !velocity.y.is_finite() {
            return Err(PositionError::NotFinite {
                axis: 'y',
                value: velocity.y,
            });
        }
        self.velocity = velocity;
        Ok(())
    }

    /// Stop moving.
    pub(crate) fn halt(&mut self) {
        self.velocity = DVec2::ZERO;
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    pub fn is_killed(&self) -> bool {
        self.vitals.is_killed
    }

    /// Advance one tick along the current velocity.
    pub fn step(&mut self) -> Result<(), PositionError> {
        if self.velocity != DVec2::ZERO {
            self.position = self.position.translate(self.velocity)?;
        }
        Ok(())
    }

    /// Whether `point` falls inside this entity's hitbox.
    pub fn hit_test(&self, point: Position) -> bool {
        let min = self.position.as_dvec2();
        let p = point.as_dvec2();
        p.x >= min.x && p.x < min.x + ENTITY_SIZE && p.y >= min.y && p.y < min.y + ENTITY_SIZE
    }
}
