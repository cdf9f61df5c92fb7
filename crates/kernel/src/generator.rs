use regionworld_stream::RegionKey;
use serde_json::{Value, json};

use crate::block::Block;
use crate::region::{Region, RegionError, TileRegion};

/// Produces regions: procedurally from the seed, or from a saved payload.
pub trait RegionGenerator {
    type Region: Region;

    fn seed(&self) -> u64;

    fn set_seed(&mut self, seed: u64);

    fn randomize_seed(&mut self);

    /// Same seed and key always yield the same content.
    fn create_generated(&mut self, key: RegionKey) -> Self::Region;

    /// Rebuild a region from a payload produced by [`Region::to_payload`].
    fn create_from_payload(&mut self, key: RegionKey, payload: &Value) -> Result<Self::Region, RegionError>;
}

/// Scatters a few stone and chest tiles over otherwise empty regions.
///
/// Tile choice is a pure hash of seed and tile coordinate.
#[derive(Debug, Clone)]
pub struct SeededGenerator {
    seed: u64,
    /// Out of 1000: chance a tile is stone.
    pub stone_per_mille: u64,
    /// Out of 1000: chance a tile is a chest (checked after stone).
    pub chest_per_mille: u64,
}

impl SeededGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            stone_per_mille: 60,
            chest_per_mille: 5,
        }
    }

    fn tile_hash(&self, key: RegionKey, column: usize, row: usize) -> u64 {
        let mut h = splitmix64(self.seed);
        h = splitmix64(h ^ key.x() as u64);
        h = splitmix64(h ^ key.y() as u64);
        splitmix64(h ^ (((column as u64) << 32) | row as u64))
    }
}

impl Default for SeededGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RegionGenerator for SeededGenerator {
    type Region = TileRegion;

    fn seed(&self) -> u64 {
        self.seed
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn randomize_seed(&mut self) {
        self.seed = rand::random();
        tracing::debug!(seed = self.seed, "randomized generator seed");
    }

    fn create_generated(&mut self, key: RegionKey) -> TileRegion {
        TileRegion::from_fn(key, |column, row| {
            let h = self.tile_hash(key, column, row);
            let roll = h % 1000;
            if roll < self.stone_per_mille {
                Block::new("stone", None)
            } else if roll < self.stone_per_mille + self.chest_per_mille {
                Block::new("chest", Some(json!({ "coins": (h >> 32) % 10 })))
            } else {
                Block::Empty
            }
        })
    }

    fn create_from_payload(&mut self, key: RegionKey, payload: &Value) -> Result<TileRegion, RegionError> {
        TileRegion::from_payload(key, payload)
    }
}

/// Splitmix64 step: fast, platform-independent mixing for tile hashes.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i64, y: i64) -> RegionKey {
        RegionKey::from_anchor(x, y).unwrap()
    }

    #[test]
    fn same_seed_same_content() {
        let mut a = SeededGenerator::new(42);
        let mut b = SeededGenerator::new(42);
        let k = key(-1600, 800);
        assert_eq!(
            a.create_generated(k).to_payload().unwrap(),
            b.create_generated(k).to_payload().unwrap()
        );
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededGenerator::new(1);
        let mut b = SeededGenerator::new(2);
        assert_ne!(
            a.create_generated(RegionKey::ORIGIN).to_payload().unwrap(),
            b.create_generated(RegionKey::ORIGIN).to_payload().unwrap()
        );
    }

    #[test]
    fn generated_region_has_its_key_and_no_entities() {
        let mut generator = SeededGenerator::new(9);
        let region = generator.create_generated(key(800, 0));
        assert_eq!(region.key(), key(800, 0));
        assert!(region.entities().is_empty());
    }

    #[test]
    fn seed_accessors() {
        let mut generator = SeededGenerator::default();
        generator.set_seed(77);
        assert_eq!(generator.seed(), 77);
    }

    #[test]
    fn payload_path_rebuilds_region() {
        let mut generator = SeededGenerator::new(5);
        let original = generator.create_generated(key(0, -800));
        let payload = original.to_payload().unwrap();
        let rebuilt = generator.create_from_payload(key(0, -800), &payload).unwrap();
        assert_eq!(rebuilt, original);
    }
}
