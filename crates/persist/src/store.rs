//! File-backed save store.
//!
//! Layout inside the store directory:
//! ```text
//! world.meta.json              - metadata and schema version
//! saves/
//!   000001.world.cbor.zst      - CBOR+zstd compressed world saves
//! integrity/
//!   manifest.json              - hash chain manifest
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use regionworld_kernel::{CharacterFactory, RegionGenerator, World, WorldSave};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SAVE_SCHEMA_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    World(#[from] regionworld_kernel::WorldError),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no saves found")]
    NoSaves,
    #[error("save slot {0} does not exist")]
    MissingSlot(u32),
}

/// Metadata stored in world.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub save_schema_version: u32,
    pub save_count: u32,
    /// Seed of the most recent save, for listing without decoding it.
    #[serde(default)]
    pub latest_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Every save file's hash, each entry chained to the previous one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// Numbered world saves on disk. Slot numbers start at 1.
pub struct SaveStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl SaveStore {
    /// Open or create a save store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("saves"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("world.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.save_schema_version != SAVE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.save_schema_version,
                    expected_version: SAVE_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                save_schema_version: SAVE_SCHEMA_VERSION,
                save_count: 0,
                latest_seed: None,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            tracing::debug!(root = %root.display(), "created save store");
            (meta, manifest)
        };

        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Append `save` as a new slot. Returns the slot number.
    pub fn write(&mut self, save: &WorldSave) -> Result<u32, StoreError> {
        let slot = self.meta.save_count + 1;
        let filename = slot_filename(slot);

        let cbor_bytes = cbor_serialize(save)?;
        let compressed = zstd_compress(&cbor_bytes)?;
        let hash = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join("saves").join(&filename), &compressed)?;

        self.manifest.entries.push(ManifestEntry {
            filename,
            sha256: hash,
            prev_hash,
        });
        self.meta.save_count = slot;
        self.meta.latest_seed = Some(save.seed);
        self.save_meta()?;
        self.save_manifest()?;

        tracing::info!(
            slot,
            seed = save.seed,
            regions = save.region_count(),
            bytes = compressed.len(),
            "world saved"
        );
        Ok(slot)
    }

    /// Serialize `world` and append it as a new slot.
    pub fn write_world<G, F>(&mut self, world: &World<G, F>) -> Result<u32, StoreError>
    where
        G: RegionGenerator,
        F: CharacterFactory,
    {
        let save = world.serialize()?;
        self.write(&save)
    }

    /// Read a specific slot, checking its hash against the manifest.
    pub fn read(&self, slot: u32) -> Result<WorldSave, StoreError> {
        if slot == 0 || slot > self.meta.save_count {
            return Err(StoreError::MissingSlot(slot));
        }
        let filename = slot_filename(slot);
        let compressed = std::fs::read(self.root.join("saves").join(&filename))?;
        self.verify_file_hash(&filename, &compressed)?;

        let cbor_bytes = zstd_decompress(&compressed)?;
        cbor_deserialize(&cbor_bytes)
    }

    pub fn load_latest(&self) -> Result<WorldSave, StoreError> {
        if self.meta.save_count == 0 {
            return Err(StoreError::NoSaves);
        }
        self.read(self.meta.save_count)
    }

    /// Load the latest save into `world`. The world is untouched on error.
    pub fn restore_latest<G, F>(&self, world: &mut World<G, F>) -> Result<u32, StoreError>
    where
        G: RegionGenerator,
        F: CharacterFactory,
    {
        let save = self.load_latest()?;
        world.load(&save)?;
        Ok(self.meta.save_count)
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.root.join("saves").join(&entry.filename))?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        let entry = self
            .manifest
            .entries
            .iter()
            .find(|e| e.filename == filename)
            .ok_or_else(|| StoreError::IntegrityMismatch {
                expected: format!("manifest entry for {filename}"),
                actual: "none".into(),
            })?;
        if entry.sha256 != actual {
            return Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("world.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn slot_filename(slot: u32) -> String {
    format!("{slot:06}.world.cbor.zst")
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionworld_common::Position;
    use regionworld_kernel::{DefaultCharacterFactory, SeededGenerator, WorldContext};
    use serde_json::json;

    type TestWorld = World<SeededGenerator, DefaultCharacterFactory>;

    fn world(seed: u64) -> TestWorld {
        World::new(WorldContext::new(SeededGenerator::new(seed), DefaultCharacterFactory)).unwrap()
    }

    fn explored(seed: u64) -> TestWorld {
        let mut w = world(seed);
        w.update().unwrap();
        w.set_block(Position::new(15.0, 15.0).unwrap(), "chest", Some(json!({"coins": 9})));
        w
    }

    #[test]
    fn open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SaveStore::open(tmp.path().join("world_data")).unwrap();
        assert_eq!(store.meta().save_count, 0);
        assert_eq!(store.meta().save_schema_version, SAVE_SCHEMA_VERSION);
        assert!(store.root().join("saves").is_dir());
        assert!(store.root().join("integrity").join("manifest.json").is_file());
        assert!(matches!(store.load_latest(), Err(StoreError::NoSaves)));
    }

    #[test]
    fn write_and_reopen_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let w = explored(42);
        let save = w.serialize().unwrap();
        {
            let mut store = SaveStore::open(&path).unwrap();
            assert_eq!(store.write(&save).unwrap(), 1);
        }

        let store = SaveStore::open(&path).unwrap();
        assert_eq!(store.meta().save_count, 1);
        assert_eq!(store.meta().latest_seed, Some(42));
        assert_eq!(store.load_latest().unwrap(), save);
    }

    #[test]
    fn restore_latest_rebuilds_world() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SaveStore::open(tmp.path()).unwrap();
        let w = explored(5);
        store.write_world(&w).unwrap();

        let mut restored = world(99);
        assert_eq!(store.restore_latest(&mut restored).unwrap(), 1);
        assert_eq!(restored.seed(), 5);
        assert_eq!(restored.region_count(), w.region_count());
        assert_eq!(restored.serialize().unwrap(), w.serialize().unwrap());
    }

    #[test]
    fn older_slots_stay_readable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SaveStore::open(tmp.path()).unwrap();
        let first = WorldSave::new(1);
        let second = explored(2).serialize().unwrap();
        store.write(&first).unwrap();
        store.write(&second).unwrap();

        assert_eq!(store.read(1).unwrap(), first);
        assert_eq!(store.load_latest().unwrap(), second);
        assert!(matches!(store.read(3), Err(StoreError::MissingSlot(3))));
        assert!(matches!(store.read(0), Err(StoreError::MissingSlot(0))));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn manifest_is_hash_chained() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SaveStore::open(tmp.path()).unwrap();
        store.write(&WorldSave::new(1)).unwrap();
        store.write(&WorldSave::new(2)).unwrap();

        let entries = &store.manifest().entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prev_hash, None);
        assert_eq!(entries[1].prev_hash.as_deref(), Some(entries[0].sha256.as_str()));
    }

    #[test]
    fn corruption_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = SaveStore::open(&path).unwrap();
        store.write_world(&explored(7)).unwrap();

        let file = path.join("saves").join("000001.world.cbor.zst");
        let mut data = std::fs::read(&file).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&file, &data).unwrap();

        let store = SaveStore::open(&path).unwrap();
        assert!(matches!(
            store.verify_integrity(),
            Err(StoreError::IntegrityMismatch { .. })
        ));
        assert!(matches!(
            store.load_latest(),
            Err(StoreError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn schema_mismatch_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let _store = SaveStore::open(&path).unwrap();

        let meta_path = path.join("world.meta.json");
        let mut meta: StoreMeta =
            serde_json::from_reader(std::fs::File::open(&meta_path).unwrap()).unwrap();
        meta.save_schema_version = 999;
        serde_json::to_writer_pretty(std::fs::File::create(&meta_path).unwrap(), &meta).unwrap();

        match SaveStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, SAVE_SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
