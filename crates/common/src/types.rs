use glam::DVec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest magnitude accepted on either axis.
///
/// Keeps snapped region anchors well inside `i64` range.
pub const MAX_COORDINATE: f64 = 1.0e15;

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected input at a position boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("position component {axis} is not finite: {value}")]
    NotFinite { axis: char, value: f64 },
    #[error("position component {axis} is out of range: {value}")]
    OutOfRange { axis: char, value: f64 },
    #[error("position needs exactly 2 components, got {0}")]
    WrongArity(usize),
}

/// A validated point in world space.
///
/// Both components are finite and within [`MAX_COORDINATE`]. The only way to
/// build one is through [`Position::new`] or a `TryFrom` conversion, so every
/// `Position` in the engine is well formed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position(DVec2);

impl Position {
    pub const ORIGIN: Self = Self(DVec2::ZERO);

    pub fn new(x: f64, y: f64) -> Result<Self, PositionError> {
        check_axis('x', x)?;
        check_axis('y', y)?;
        Ok(Self(DVec2::new(x, y)))
    }

    pub fn x(self) -> f64 {
        self.0.x
    }

    pub fn y(self) -> f64 {
        self.0.y
    }

    pub fn as_dvec2(self) -> DVec2 {
        self.0
    }

    /// Shift by a world-space delta, re-validating the result.
    pub fn translate(self, delta: DVec2) -> Result<Self, PositionError> {
        let moved = self.0 + delta;
        Self::new(moved.x, moved.y)
    }

    /// Shift by a world-space delta, clamping each axis into range. An axis
    /// whose sum is NaN stays where it was.
    pub fn saturating_translate(self, delta: DVec2) -> Self {
        let axis = |from: f64, by: f64| {
            let moved = from + by;
            if moved.is_nan() {
                from
            } else {
                moved.clamp(-MAX_COORDINATE, MAX_COORDINATE)
            }
        };
        Self(DVec2::new(axis(self.0.x, delta.x), axis(self.0.y, delta.y)))
    }

    pub fn distance(self, other: Position) -> f64 {
        self.0.distance(other.0)
    }
}

fn check_axis(axis: char, value: f64) -> Result<(), PositionError> {
    if !value.is_finite() {
        return Err(PositionError::NotFinite { axis, value });
    }
    if value.abs() > MAX_COORDINATE {
        return Err(PositionError::OutOfRange { axis, value });
    }
    Ok(())
}

impl TryFrom<(f64, f64)> for Position {
    type Error = PositionError;

    fn try_from((x, y): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(x, y)
    }
}

impl TryFrom<[f64; 2]> for Position {
    type Error = PositionError;

    fn try_from([x, y]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(x, y)
    }
}

impl TryFrom<&[f64]> for Position {
    type Error = PositionError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        match values {
            [x, y] => Self::new(*x, *y),
            other => Err(PositionError::WrongArity(other.len())),
        }
    }
}

impl TryFrom<DVec2> for Position {
    type Error = PositionError;

    fn try_from(v: DVec2) -> Result<Self, Self::Error> {
        Self::new(v.x, v.y)
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.0.x, p.0.y]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0.x, self.0.y)
    }
}
