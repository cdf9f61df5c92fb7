use std::collections::BTreeMap;

use regionworld_stream::RegionKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque region payload; only the region type knows its shape.
pub type RegionPayload = Value;

/// Persisted world: the generator seed plus every region ever created,
/// keyed `world_data[column][row]` by snapped anchor strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSave {
    pub seed: u64,
    pub world_data: BTreeMap<String, BTreeMap<String, RegionPayload>>,
}

impl WorldSave {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            world_data: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: RegionKey, payload: RegionPayload) {
        self.world_data
            .entry(key.column_key())
            .or_default()
            .insert(key.row_key(), payload);
    }

    pub fn payload(&self, key: RegionKey) -> Option<&RegionPayload> {
        self.world_data.get(&key.column_key())?.get(&key.row_key())
    }

    pub fn region_count(&self) -> usize {
        self.world_data.values().map(BTreeMap::len).sum()
    }
}
