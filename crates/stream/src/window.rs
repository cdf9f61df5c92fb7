use std::collections::HashSet;

use regionworld_common::Position;
use serde::{Deserialize, Serialize};

use crate::grid::{RegionKey, window_keys};

/// Streaming configuration: how far around the camera regions are streamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Radius (in regions) of the square window around the camera's region.
    pub radius: i64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { radius: 3 }
    }
}

impl StreamConfig {
    /// Regions along one side of the window.
    pub fn side(&self) -> usize {
        (self.radius.max(0) * 2 + 1) as usize
    }

    /// Total number of regions in the window.
    pub fn cell_count(&self) -> usize {
        self.side() * self.side()
    }
}

/// Per-tick streaming statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub scanned: usize,
    pub generated_this_tick: usize,
    pub total_regions: usize,
    pub player_first: bool,
}

/// The set of regions simulated and drawn this tick, in draw order.
///
/// The window does not own regions. The caller scans it, makes sure each
/// scanned region exists, then commits the result along with the region
/// currently holding the player.
#[derive(Debug, Clone)]
pub struct StreamWindow {
    pub config: StreamConfig,
    draw_list: Vec<RegionKey>,
    player_region: Option<RegionKey>,
    stats: StreamStats,
}

impl StreamWindow {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            draw_list: Vec::new(),
            player_region: None,
            stats: StreamStats::default(),
        }
    }

    /// Keys in the window centered on `center`, in scan order.
    pub fn scan(&self, center: Position) -> Vec<RegionKey> {
        window_keys(RegionKey::containing(center), self.config.radius).collect()
    }

    /// Replace the draw list with `scanned`, moving `player_region` to the
    /// front when it is part of the scan.
    pub fn commit(
        &mut self,
        scanned: &[RegionKey],
        player_region: Option<RegionKey>,
        generated: usize,
        total_regions: usize,
    ) -> &[RegionKey] {
        self.draw_list = order_draw_list(scanned, player_region);
        self.player_region = player_region.filter(|k| self.draw_list.first() == Some(k));

        self.stats = StreamStats {
            scanned: scanned.len(),
            generated_this_tick: generated,
            total_regions,
            player_first: self.player_region.is_some(),
        };
        tracing::trace!(
            scanned = scanned.len(),
            generated,
            total_regions,
            player_first = self.stats.player_first,
            "stream window committed"
        );

        &self.draw_list
    }

    /// Current draw list: player's region first (when streamed), then scan order.
    pub fn draw_list(&self) -> &[RegionKey] {
        &self.draw_list
    }

    /// The player's region, if it sits at the head of the draw list.
    pub fn player_region(&self) -> Option<RegionKey> {
        self.player_region
    }

    /// Get statistics from the last commit.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Forget the current window entirely.
    pub fn clear(&mut self) {
        self.draw_list.clear();
        self.player_region = None;
        self.stats = StreamStats::default();
    }
}

/// Order scanned keys for drawing.
///
/// Keys keep their scan order with duplicates dropped. If `player_region`
/// was scanned, it is taken out of its natural slot and placed first.
pub fn order_draw_list(scanned: &[RegionKey], player_region: Option<RegionKey>) -> Vec<RegionKey> {
    let mut seen = HashSet::with_capacity(scanned.len());
    let mut ordered = Vec::with_capacity(scanned.len());
    let mut player_seen = false;

    for &key in scanned {
        if !seen.insert(key) {
            continue;
        }
        if Some(key) == player_region {
            player_seen = true;
        } else {
            ordered.push(key);
        }
    }

    if let (true, Some(key)) = (player_seen, player_region) {
        ordered.insert(0, key);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i64, y: i64) -> RegionKey {
        RegionKey::from_anchor(x, y).unwrap()
    }

    #[test]
    fn stream_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.radius, 3);
        assert_eq!(config.side(), 7);
        assert_eq!(config.cell_count(), 49);
    }

    #[test]
    fn stream_config_deserializes_with_defaults() {
        let config: StreamConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StreamConfig::default());
        let config: StreamConfig = serde_json::from_str(r#"{"radius": 1}"#).unwrap();
        assert_eq!(config.cell_count(), 9);
    }

    #[test]
    fn scan_covers_seven_by_seven_around_camera() {
        let window = StreamWindow::new(StreamConfig::default());
        let keys = window.scan(Position::new(-600.0, -400.0).unwrap());
        assert_eq!(keys.len(), 49);
        // Camera sits in (-800, -800); window spans three regions either side.
        assert_eq!(keys[0], key(-3200, -3200));
        assert_eq!(keys[48], key(1600, 1600));
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 49);
    }

    #[test]
    fn player_region_moves_to_front() {
        let scanned = vec![key(0, 0), key(0, 800), key(800, 0), key(800, 800)];
        let ordered = order_draw_list(&scanned, Some(key(800, 0)));
        assert_eq!(ordered, vec![key(800, 0), key(0, 0), key(0, 800), key(800, 800)]);
    }

    #[test]
    fn player_outside_scan_is_not_inserted() {
        let scanned = vec![key(0, 0), key(0, 800)];
        let ordered = order_draw_list(&scanned, Some(key(8000, 8000)));
        assert_eq!(ordered, scanned);
    }

    #[test]
    fn duplicates_are_dropped() {
        let scanned = vec![key(0, 0), key(0, 0), key(800, 0), key(800, 0)];
        let ordered = order_draw_list(&scanned, Some(key(800, 0)));
        assert_eq!(ordered, vec![key(800, 0), key(0, 0)]);
    }

    #[test]
    fn commit_orders_and_records_stats() {
        let mut window = StreamWindow::new(StreamConfig { radius: 1 });
        let scanned = window.scan(Position::ORIGIN);
        window.commit(&scanned, Some(RegionKey::ORIGIN), 9, 9);

        assert_eq!(window.draw_list()[0], RegionKey::ORIGIN);
        assert_eq!(window.player_region(), Some(RegionKey::ORIGIN));
        assert!(window.draw_list().contains(&key(-800, 800)));
        assert!(!window.draw_list().contains(&key(1600, 0)));
        assert_eq!(
            window.stats(),
            &StreamStats {
                scanned: 9,
                generated_this_tick: 9,
                total_regions: 9,
                player_first: true,
            }
        );

        window.clear();
        assert!(window.draw_list().is_empty());
        assert_eq!(window.player_region(), None);
    }
}
