use glam::DVec2;
use regionworld_common::{MAX_COORDINATE, Position};

/// Side length of one region, in world units.
pub const REGION_SIZE: i64 = 800;

/// Errors from parsing or validating region keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("region key component {0:?} is not an integer")]
    NotAnInteger(String),
    #[error("region key component {0} is not a multiple of the region size (800)")]
    NotSnapped(i64),
    #[error("region key component {0} is out of range")]
    OutOfRange(i64),
}

/// Snapped anchor of a region: the minimum corner of its cell.
///
/// Both components are always multiples of [`REGION_SIZE`]. Two positions map
/// to the same key iff they fall in the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey {
    x: i64,
    y: i64,
}

impl RegionKey {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Key of the cell containing `position`, using true floor division so
    /// `(-1, -1)` lands in `(-800, -800)`.
    pub fn containing(position: Position) -> Self {
        Self {
            x: snap_axis(position.x()),
            y: snap_axis(position.y()),
        }
    }

    /// Build a key from an anchor that is already snapped.
    pub fn from_anchor(x: i64, y: i64) -> Result<Self, KeyError> {
        Ok(Self {
            x: check_anchor(x)?,
            y: check_anchor(y)?,
        })
    }

    /// Parse the canonical column/row string pair used by the save layout.
    pub fn from_keys(column: &str, row: &str) -> Result<Self, KeyError> {
        let parse = |s: &str| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| KeyError::NotAnInteger(s.to_owned()))
        };
        Self::from_anchor(parse(column)?, parse(row)?)
    }

    pub fn x(self) -> i64 {
        self.x
    }

    pub fn y(self) -> i64 {
        self.y
    }

    /// Canonical string form of the column (x) component.
    pub fn column_key(self) -> String {
        self.x.to_string()
    }

    /// Canonical string form of the row (y) component.
    pub fn row_key(self) -> String {
        self.y.to_string()
    }

    /// Anchor as a world-space vector.
    pub fn anchor(self) -> DVec2 {
        DVec2::new(self.x as f64, self.y as f64)
    }

    /// Whether `position` lies inside this cell (half-open on both axes).
    pub fn contains(self, position: Position) -> bool {
        let min = self.anchor();
        let max = min + DVec2::splat(REGION_SIZE as f64);
        position.x() >= min.x && position.x() < max.x && position.y() >= min.y && position.y() < max.y
    }

    /// Key `dx` regions across and `dy` regions down from this one, or
    /// `None` when that cell lies outside the addressable world.
    pub fn offset(self, dx: i64, dy: i64) -> Option<Self> {
        let shift = |base: i64, by: i64| {
            let v = by.checked_mul(REGION_SIZE)?.checked_add(base)?;
            check_anchor(v).ok()
        };
        Some(Self {
            x: shift(self.x, dx)?,
            y: shift(self.y, dy)?,
        })
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn snap_axis(value: f64) -> i64 {
    let size = REGION_SIZE as f64;
    let mut cell = (value / size).floor() as i64;
    // Division can round across a cell edge; settle on the cell that
    // `RegionKey::contains` agrees with.
    if (cell * REGION_SIZE) as f64 > value {
        cell -= 1;
    } else if ((cell + 1) * REGION_SIZE) as f64 <= value {
        cell += 1;
    }
    cell * REGION_SIZE
}

fn check_anchor(v: i64) -> Result<i64, KeyError> {
    if v.rem_euclid(REGION_SIZE) != 0 {
        return Err(KeyError::NotSnapped(v));
    }
    if v.unsigned_abs() as f64 > MAX_COORDINATE + REGION_SIZE as f64 {
        return Err(KeyError::OutOfRange(v));
    }
    Ok(v)
}

/// The keys of the 3×3 block around `center`, column by column.
pub fn neighborhood(center: RegionKey) -> impl Iterator<Item = RegionKey> {
    window_keys(center, 1)
}

/// Keys of the square window of `radius` regions around `center`.
///
/// Scan order is fixed: outer axis x, inner axis y. Cells past the
/// addressable edge are skipped, so every key yielded can be saved and
/// parsed back.
pub fn window_keys(center: RegionKey, radius: i64) -> impl Iterator<Item = RegionKey> {
    (-radius..=radius)
        .flat_map(move |dx| (-radius..=radius).filter_map(move |dy| center.offset(dx, dy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pos(x: f64, y: f64) -> Position {
        Position::new(x, y).unwrap()
    }

    #[test]
    fn containing_snaps_positive_coordinates() {
        let key = RegionKey::containing(pos(850.0, 10.0));
        assert_eq!(key.column_key(), "800");
        assert_eq!(key.row_key(), "0");
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        let key = RegionKey::containing(pos(-10.0, 10.0));
        assert_eq!((key.column_key().as_str(), key.row_key().as_str()), ("-800", "0"));

        let key = RegionKey::containing(pos(-1.0, -1.0));
        assert_eq!(key, RegionKey::from_anchor(-800, -800).unwrap());

        let key = RegionKey::containing(pos(-800.0, -1600.0));
        assert_eq!(key, RegionKey::from_anchor(-800, -1600).unwrap());
    }

    #[test]
    fn containing_agrees_with_contains() {
        let samples = [
            0.0,
            799.0,
            799.999_999_999_9,
            800.0,
            -0.000_001,
            -799.5,
            -800.0,
            1_599.999_999_999_999_8,
            123_456.789,
            -987_654.321,
        ];
        for &x in &samples {
            for &y in &samples {
                let p = pos(x, y);
                let key = RegionKey::containing(p);
                assert!(key.contains(p), "{p} should be inside {key}");
                assert!(key.anchor().x <= x && x < key.anchor().x + REGION_SIZE as f64);
                assert!(key.anchor().y <= y && y < key.anchor().y + REGION_SIZE as f64);
            }
        }
    }

    #[test]
    fn contains_is_half_open() {
        let key = RegionKey::ORIGIN;
        assert!(key.contains(pos(0.0, 0.0)));
        assert!(key.contains(pos(799.0, 799.0)));
        assert!(!key.contains(pos(800.0, 10.0)));
        assert!(!key.contains(pos(10.0, -0.5)));
    }

    #[test]
    fn from_keys_parses_canonical_strings() {
        let key = RegionKey::from_keys("-800", "1600").unwrap();
        assert_eq!((key.x(), key.y()), (-800, 1600));
        assert_eq!(
            RegionKey::from_keys("12", "0").unwrap_err(),
            KeyError::NotSnapped(12)
        );
        assert!(matches!(
            RegionKey::from_keys("abc", "0"),
            Err(KeyError::NotAnInteger(_))
        ));
    }

    #[test]
    fn neighborhood_covers_all_nine_cells() {
        let center = RegionKey::from_anchor(800, -800).unwrap();
        let cells: HashSet<RegionKey> = neighborhood(center).collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&RegionKey::from_anchor(0, 0).unwrap()));
        assert!(cells.contains(&RegionKey::from_anchor(1600, -1600).unwrap()));
        // Off-diagonal cells are part of the set.
        assert!(cells.contains(&RegionKey::from_anchor(0, -1600).unwrap()));
        assert!(cells.contains(&RegionKey::from_anchor(1600, 0).unwrap()));
    }

    #[test]
    fn window_scan_order_is_outer_x_inner_y() {
        let keys: Vec<RegionKey> = window_keys(RegionKey::ORIGIN, 1).collect();
        assert_eq!(keys.len(), 9);
        assert_eq!(keys[0], RegionKey::from_anchor(-800, -800).unwrap());
        assert_eq!(keys[1], RegionKey::from_anchor(-800, 0).unwrap());
        assert_eq!(keys[3], RegionKey::from_anchor(0, -800).unwrap());
        assert_eq!(keys[8], RegionKey::from_anchor(800, 800).unwrap());
    }

    #[test]
    fn window_stops_at_addressable_edge() {
        let edge = RegionKey::containing(pos(MAX_COORDINATE - 10.0, 0.0));
        let keys: Vec<RegionKey> = window_keys(edge, 3).collect();
        assert!(keys.len() < 49);
        for key in keys {
            let parsed = RegionKey::from_keys(&key.column_key(), &key.row_key()).unwrap();
            assert_eq!(parsed, key);
        }
        assert_eq!(RegionKey::ORIGIN.offset(2, -1), RegionKey::from_anchor(1600, -800).ok());
        assert_eq!(edge.offset(i64::MAX, 0), None);
    }
}
