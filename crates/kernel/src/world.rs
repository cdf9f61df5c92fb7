use std::collections::BTreeMap;

use regionworld_common::{EntityId, Position};
use regionworld_stream::{RegionKey, StreamStats, StreamWindow, neighborhood};
use serde_json::Value;

use crate::block::Block;
use crate::camera::Camera;
use crate::canvas::Canvas;
use crate::context::WorldContext;
use crate::entity::{Entity, PLAYER_KIND};
use crate::error::WorldError;
use crate::factory::{CharacterFactory, FactoryError, SENTINEL_KIND};
use crate::generator::RegionGenerator;
use crate::region::Region;
use crate::save::WorldSave;

type Grid<R> = BTreeMap<i64, BTreeMap<i64, R>>;

/// How the player came to exist this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    /// First player, built by the character factory.
    Created,
    /// The existing player, revived in place.
    Respawned,
}

/// Where an entity handed to [`World::spawn_entity`] ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Resident(RegionKey),
    /// Its cell has not streamed in; it waits in the orphan ledger.
    Parked(RegionKey),
}

/// Outcome of one migration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub moved: usize,
    pub orphaned: usize,
}

/// What one call to [`World::update`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub spawned: Option<SpawnKind>,
    pub migration: MigrationReport,
    pub generated: usize,
    pub rehomed: usize,
    pub updated: usize,
    pub departed: usize,
}

/// Non-owning link to the player. The region holding it owns the entity.
#[derive(Debug, Clone, Default)]
struct PlayerLink {
    id: Option<EntityId>,
    /// Cached home region; checked before falling back to a full scan.
    home: Option<RegionKey>,
    last_position: Position,
    /// A killed player, kept for respawn.
    dormant: Option<Entity>,
}

/// The region grid and everything that moves through it.
///
/// All mutations happen inside explicit operations. [`World::update`] runs a
/// full tick (player, migration, streaming, region updates, camera) before
/// any draw pass reads the draw list.
pub struct World<G: RegionGenerator, F: CharacterFactory> {
    regions: Grid<G::Region>,
    window: StreamWindow,
    camera: Camera,
    generator: G,
    characters: F,
    player: PlayerLink,
    orphans: BTreeMap<RegionKey, Vec<Entity>>,
    sentinel: Entity,
    tick: u64,
    rehomed: usize,
}

impl<G: RegionGenerator, F: CharacterFactory> World<G, F> {
    /// Build a world around its collaborators. The origin region is created
    /// immediately.
    pub fn new(ctx: WorldContext<G, F>) -> Result<Self, WorldError> {
        let WorldContext {
            camera,
            generator,
            mut characters,
            stream,
        } = ctx;
        let sentinel = characters.create(SENTINEL_KIND)?;

        let mut world = Self {
            regions: Grid::new(),
            window: StreamWindow::new(stream),
            camera,
            generator,
            characters,
            player: PlayerLink::default(),
            orphans: BTreeMap::new(),
            sentinel,
            tick: 0,
            rehomed: 0,
        };
        world.ensure_region(RegionKey::ORIGIN);
        Ok(world)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Region keys in draw order, as computed by the last tick.
    pub fn draw_list(&self) -> &[RegionKey] {
        self.window.draw_list()
    }

    pub fn stream_stats(&self) -> &StreamStats {
        self.window.stats()
    }

    pub fn region_count(&self) -> usize {
        self.regions.values().map(BTreeMap::len).sum()
    }

    pub fn has_region(&self, key: RegionKey) -> bool {
        self.region(key).is_some()
    }

    pub fn region(&self, key: RegionKey) -> Option<&G::Region> {
        self.regions.get(&key.x())?.get(&key.y())
    }

    pub fn region_mut(&mut self, key: RegionKey) -> Option<&mut G::Region> {
        self.regions.get_mut(&key.x())?.get_mut(&key.y())
    }

    /// Region holding `position`, if it has streamed in.
    pub fn region_at(&self, position: Position) -> Option<&G::Region> {
        self.region(RegionKey::containing(position))
    }

    /// Every region ever created, column by column.
    pub fn regions(&self) -> impl Iterator<Item = &G::Region> {
        self.regions.values().flat_map(BTreeMap::values)
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.values().map(Vec::len).sum()
    }

    /// Entities waiting for the region at `key` to stream in.
    pub fn orphans_for(&self, key: RegionKey) -> &[Entity] {
        self.orphans.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn sentinel_id(&self) -> EntityId {
        self.sentinel.id()
    }

    /// The live player, whether resident in a region or parked as an orphan.
    pub fn player(&self) -> Option<&Entity> {
        let id = self.player.id?;
        if let Some(found) = self.player.home.and_then(|k| self.region(k)?.entity(id)) {
            return Some(found);
        }
        self.orphans.values().flatten().find(|e| e.id() == id)
    }

    pub fn player_mut(&mut self) -> Option<&mut Entity> {
        let id = self.player.id?;
        let home = self.player.home;
        if home.is_some_and(|k| self.region(k).is_some_and(|r| r.entity(id).is_some())) {
            return home.and_then(|k| self.region_mut(k)?.entity_mut(id));
        }
        self.orphans.values_mut().flatten().find(|e| e.id() == id)
    }

    /// Region currently holding the player, if any.
    pub fn player_region(&self) -> Option<RegionKey> {
        let id = self.player.id?;
        self.player
            .home
            .filter(|k| self.region(*k).is_some_and(|r| r.entity(id).is_some()))
    }

    /// Make sure a region exists at `key`, generating it if needed. Parked
    /// orphans for that cell move in right away. Returns whether it was created.
    pub fn ensure_region(&mut self, key: RegionKey) -> bool {
        if self.has_region(key) {
            return false;
        }

        let mut region = self.generator.create_generated(key);
        tracing::debug!(%key, "generated region");

        if let Some(parked) = self.orphans.remove(&key) {
            tracing::debug!(%key, count = parked.len(), "re-homing parked entities");
            self.rehomed += parked.len();
            for entity in parked {
                if Some(entity.id()) == self.player.id {
                    self.player.home = Some(key);
                }
                region.add_entity(entity);
            }
        }

        self.regions.entry(key.x()).or_default().insert(key.y(), region);
        true
    }

    /// Randomize the seed and start over from a lone origin region.
    pub fn reset(&mut self) {
        self.generator.randomize_seed();
        self.clear_state();
        self.ensure_region(RegionKey::ORIGIN);
        self.insert_sentinel();
        tracing::info!(seed = self.generator.seed(), "world reset");
    }

    fn clear_state(&mut self) {
        self.regions.clear();
        self.window.clear();
        self.orphans.clear();
        self.camera.reset();
        self.player = PlayerLink::default();
        self.rehomed = 0;
    }

    fn insert_sentinel(&mut self) {
        let id = self.sentinel.id();
        if self.regions().any(|r| r.entity(id).is_some()) {
            tracing::debug!("sentinel already present; not inserting another");
            return;
        }
        let sentinel = self.sentinel.clone();
        if let Some(origin) = self.region_mut(RegionKey::ORIGIN) {
            origin.add_entity(sentinel);
        }
    }

    /// Add an entity to the region at its position. Refuses an id that is
    /// already resident or parked, and a second player. The dormant player
    /// may be spawned back in, which empties the dormant slot.
    pub fn spawn_entity(&mut self, entity: Entity) -> Result<Placement, WorldError> {
        let id = entity.id();
        if self.has_entity(id) {
            return Err(WorldError::DuplicateEntity(id));
        }
        if entity.is_player() {
            let reviving = self.player.dormant.as_ref().is_some_and(|d| d.id() == id);
            let other_dormant = self.player.dormant.is_some() && !reviving;
            let players = self.live_player_count() + usize::from(other_dormant);
            if players > 0 {
                return Err(WorldError::DuplicatePlayer { count: players + 1 });
            }
            if reviving {
                self.player.dormant = None;
            }
            self.player.id = Some(id);
            self.player.last_position = entity.position();
        }

        let key = RegionKey::containing(entity.position());
        let is_player = entity.is_player();
        match self.region_mut(key) {
            Some(region) => {
                region.add_entity(entity);
                if is_player {
                    self.player.home = Some(key);
                }
                Ok(Placement::Resident(key))
            }
            None => {
                self.orphans.entry(key).or_default().push(entity);
                if is_player {
                    self.player.home = None;
                }
                Ok(Placement::Parked(key))
            }
        }
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.regions().any(|r| r.entity(id).is_some())
            || self.orphans.values().flatten().any(|e| e.id() == id)
    }

    /// Players resident in any region or parked in the ledger.
    fn live_player_count(&self) -> usize {
        let resident = self.regions().flat_map(|r| r.entities()).filter(|e| e.is_player());
        let parked = self.orphans.values().flatten().filter(|e| e.is_player());
        resident.count() + parked.count()
    }

    /// Remove an entity from wherever it lives.
    pub fn despawn_entity(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self
            .regions
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .find_map(|r| r.remove_entity(id))
            .or_else(|| {
                self.orphans.values_mut().find_map(|parked| {
                    let index = parked.iter().position(|e| e.id() == id)?;
                    Some(parked.remove(index))
                })
            });
        self.orphans.retain(|_, parked| !parked.is_empty());
        if removed.is_some() && self.player.id == Some(id) {
            self.player = PlayerLink::default();
        }
        removed
    }

    /// Find the player, refreshing the cached link. Tries the cached home
    /// first, then every region, then the orphan ledger.
    fn locate_player(&mut self) -> Option<EntityId> {
        if let Some(id) = self.player_region().and(self.player.id) {
            return Some(id);
        }

        let resident = self.regions().find_map(|region| {
            region
                .entities()
                .iter()
                .find(|e| e.kind() == PLAYER_KIND)
                .map(|e| (region.key(), e.id(), e.position()))
        });
        if let Some((key, id, position)) = resident {
            self.player.id = Some(id);
            self.player.home = Some(key);
            self.player.last_position = position;
            return Some(id);
        }

        self.player.home = None;
        let parked = self.orphans.values().flatten().find(|e| e.is_player());
        let (id, position) = parked.map(|e| (e.id(), e.position()))?;
        self.player.id = Some(id);
        self.player.last_position = position;
        Some(id)
    }

    /// Bring the player back: revive the dormant one, or build the first.
    fn spawn_player(&mut self) -> Result<SpawnKind, WorldError> {
        let (mut player, kind) = match self.player.dormant.take() {
            Some(mut dormant) => {
                dormant.vitals_mut().revive();
                (dormant, SpawnKind::Respawned)
            }
            None => {
                if self.player.id.is_some() {
                    tracing::warn!("player entity was lost; building a replacement");
                }
                let player = self.characters.create(PLAYER_KIND)?;
                if !player.is_player() {
                    return Err(FactoryError::WrongKind {
                        requested: PLAYER_KIND.to_owned(),
                        built: player.kind().to_owned(),
                    }
                    .into());
                }
                (player, SpawnKind::Created)
            }
        };
        if kind == SpawnKind::Created {
            player.set_position(self.player.last_position);
        }

        let position = player.position();
        let key = RegionKey::containing(position);
        self.ensure_region(key);
        self.player.id = Some(player.id());
        self.player.home = Some(key);
        self.player.last_position = position;
        if let Some(region) = self.region_mut(key) {
            region.add_entity(player);
        }
        self.camera.focus_on(position);

        tracing::debug!(?kind, %key, %position, "player spawned");
        Ok(kind)
    }

    /// Move entities that left their region's bounds into the region that
    /// now contains them. Only regions in the current window are visited;
    /// entities heading into a cell that does not exist yet are parked.
    pub fn migrate_entities(&mut self) -> MigrationReport {
        let mut report = MigrationReport::default();
        let keys = self.window.draw_list().to_vec();

        for key in keys {
            let Some(region) = self.region_mut(key) else {
                continue;
            };
            let stray_ids: Vec<EntityId> = {
                let region: &G::Region = region;
                region
                    .entities()
                    .iter()
                    .filter(|e| !region.contains(e.position()))
                    .map(Entity::id)
                    .collect()
            };
            let strays: Vec<Entity> = stray_ids
                .into_iter()
                .filter_map(|id| region.remove_entity(id))
                .collect();

            for entity in strays {
                let dest = RegionKey::containing(entity.position());
                let is_player = Some(entity.id()) == self.player.id;
                if is_player {
                    self.player.last_position = entity.position();
                }
                match self.region_mut(dest) {
                    Some(target) => {
                        tracing::debug!(id = ?entity.id(), from = %key, to = %dest, "entity migrated");
                        target.add_entity(entity);
                        report.moved += 1;
                        if is_player {
                            self.player.home = Some(dest);
                        }
                    }
                    None => {
                        tracing::warn!(
                            id = ?entity.id(),
                            from = %key,
                            to = %dest,
                            "entity left streamed area; parked until its region streams in"
                        );
                        self.orphans.entry(dest).or_default().push(entity);
                        report.orphaned += 1;
                        if is_player {
                            self.player.home = None;
                        }
                    }
                }
            }
        }
        report
    }

    /// Recompute the streaming window around the camera, generating any
    /// missing regions. Returns how many regions were generated.
    pub fn refresh_window(&mut self) -> usize {
        let scanned = self.window.scan(self.camera.position());
        let generated = scanned
            .iter()
            .filter(|&&key| self.ensure_region(key))
            .count();
        let player_region = self.player_region();
        let total = self.region_count();
        self.window.commit(&scanned, player_region, generated, total);
        generated
    }

    /// Run one tick.
    pub fn update(&mut self) -> Result<TickReport, WorldError> {
        self.tick += 1;
        let _span = tracing::info_span!("world_update", tick = self.tick).entered();
        self.rehomed = 0;

        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        if self.locate_player().is_none() {
            report.spawned = Some(self.spawn_player()?);
        }

        // Migration reads last tick's window, so it only touches regions
        // that already streamed in.
        report.migration = self.migrate_entities();
        self.recover_parked_player();
        report.generated = self.refresh_window();

        let draw_list = self.window.draw_list().to_vec();
        let player_first = self.window.player_region();
        for (index, key) in draw_list.into_iter().enumerate() {
            let Some(region) = self.region_mut(key) else {
                continue;
            };
            let departed = region.update();
            report.updated += 1;
            report.departed += departed.len();
            self.absorb_departed(departed);

            if index == 0 && player_first == Some(key) {
                self.follow_player();
            }
        }

        report.rehomed = self.rehomed;
        tracing::trace!(
            generated = report.generated,
            moved = report.migration.moved,
            orphaned = report.migration.orphaned,
            updated = report.updated,
            "tick complete"
        );
        Ok(report)
    }

    fn absorb_departed(&mut self, departed: Vec<Entity>) {
        for entity in departed {
            if Some(entity.id()) == self.player.id {
                tracing::info!(position = %entity.position(), "player killed");
                self.player.home = None;
                self.player.last_position = entity.position();
                self.player.dormant = Some(entity);
            } else {
                tracing::debug!(id = ?entity.id(), kind = entity.kind(), "entity left simulation");
            }
        }
    }

    fn follow_player(&mut self) {
        if let Some(position) = self.player().map(Entity::position) {
            self.player.last_position = position;
            self.camera.focus_on(position);
        }
    }

    /// A parked player pulls its own cell in and takes the camera with it,
    /// so the window streams around it again.
    fn recover_parked_player(&mut self) {
        if self.player_region().is_some() {
            return;
        }
        let Some(position) = self.player().map(Entity::position) else {
            return;
        };
        let key = RegionKey::containing(position);
        self.ensure_region(key);
        self.player.last_position = position;
        self.camera.focus_on(position);
        tracing::debug!(%key, %position, "parked player re-homed");
    }

    /// Block at `position`, or `None` if its region has not streamed in.
    pub fn get_block(&self, position: Position) -> Option<&Block> {
        self.region_at(position)?.get_block(position)
    }

    /// Place a block. A position in an unstreamed region is a no-op and
    /// returns `false`.
    pub fn set_block(&mut self, position: Position, block_id: &str, state: Option<Value>) -> bool {
        let key = RegionKey::containing(position);
        match self.region_mut(key) {
            Some(region) => region.set_block(position, Block::new(block_id, state)),
            None => {
                tracing::debug!(%key, "set_block on unstreamed region ignored");
                false
            }
        }
    }

    /// Entities whose hitbox covers `position`, gathered from the 3×3
    /// regions around it.
    pub fn entities_near(&self, position: Position, ignore_player: bool) -> Vec<&Entity> {
        neighborhood(RegionKey::containing(position))
            .filter_map(|key| self.region(key))
            .flat_map(|region| region.entities_at(position, ignore_player))
            .collect()
    }

    /// Draw blocks of streamed regions that overlap the screen. Returns the
    /// number of regions drawn.
    pub fn draw_blocks(&self, canvas: &mut dyn Canvas) -> usize {
        let mut drawn = 0;
        for &key in self.window.draw_list() {
            if !self.camera.is_region_visible(key.anchor()) {
                continue;
            }
            if let Some(region) = self.region(key) {
                region.draw_blocks(&self.camera, canvas);
                drawn += 1;
            }
        }
        drawn
    }

    pub fn draw_entities(&self, canvas: &mut dyn Canvas) {
        for &key in self.window.draw_list() {
            if let Some(region) = self.region(key) {
                region.draw_entities(&self.camera, canvas);
            }
        }
    }

    /// Snapshot the seed and every region's payload.
    pub fn serialize(&self) -> Result<WorldSave, WorldError> {
        let mut save = WorldSave::new(self.generator.seed());
        for region in self.regions() {
            let key = region.key();
            let payload = region
                .to_payload()
                .map_err(|source| WorldError::Encode { key, source })?;
            save.insert(key, payload);
        }
        if !self.orphans.is_empty() {
            tracing::warn!(count = self.orphan_count(), "parked entities are not part of the save");
        }
        Ok(save)
    }

    /// Replace the whole world with `save`. Saved regions win over procedural
    /// generation; cells not in the save stream in later from the seed.
    ///
    /// Every payload is decoded before anything is touched, so a failed load
    /// leaves the world exactly as it was.
    pub fn load(&mut self, save: &WorldSave) -> Result<(), WorldError> {
        let previous_seed = self.generator.seed();
        self.generator.set_seed(save.seed);
        let staged = match self.decode_regions(save) {
            Ok(staged) => staged,
            Err(err) => {
                self.generator.set_seed(previous_seed);
                return Err(err);
            }
        };

        self.clear_state();
        self.regions = staged;
        if self.ensure_region(RegionKey::ORIGIN) {
            self.insert_sentinel();
        }

        tracing::info!(seed = save.seed, regions = self.region_count(), "world loaded");
        Ok(())
    }

    fn decode_regions(&mut self, save: &WorldSave) -> Result<Grid<G::Region>, WorldError> {
        let mut staged: Grid<G::Region> = Grid::new();
        let mut players = 0;

        for (column, rows) in &save.world_data {
            for (row, payload) in rows {
                let key = RegionKey::from_keys(column, row).map_err(|source| WorldError::BadKey {
                    column: column.clone(),
                    row: row.clone(),
                    source,
                })?;
                let region = self
                    .generator
                    .create_from_payload(key, payload)
                    .map_err(|source| WorldError::MalformedRegion {
                        column: column.clone(),
                        row: row.clone(),
                        source,
                    })?;
                players += region.entities().iter().filter(|e| e.is_player()).count();

                let slot = staged.entry(key.x()).or_default();
                if slot.contains_key(&key.y()) {
                    return Err(WorldError::DuplicateRegion(key));
                }
                slot.insert(key.y(), region);
            }
        }

        if players > 1 {
            return Err(WorldError::DuplicatePlayer { count: players });
        }
        Ok(staged)
    }
}
