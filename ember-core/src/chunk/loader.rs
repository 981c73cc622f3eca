//! Dependency-aware chunk streaming.
//!
//! The loader drives every chunk through the phase pipeline by submitting
//! load and lighting tasks to the shared scheduler. Lighting a chunk is only
//! correct once the chunk and its neighbours have block data in the raster,
//! so `begin_lighting` loads the whole dependency neighbourhood (blocking on
//! the loads) before the lighting task is queued.

use std::sync::{Arc, Weak};

use ember_utils::{ChunkPos, math::Vector2};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Chunk, ChunkPhase};
use crate::config::EngineConfig;
use crate::light::LightEngine;
use crate::scheduler::{TaskOutput, TaskScheduler, TaskTag};
use crate::world::{Cell, Region, WorldRaster, WorldStore};

/// Priority for block-loading tasks. Loads run before lighting so that a
/// mixed backlog settles dependencies first.
pub const PRIORITY_LOAD: i32 = 64;
/// Priority for lighting tasks.
pub const PRIORITY_LIGHT: i32 = 96;

/// Streams chunks from a [`WorldStore`] into the raster and lights them.
pub struct ChunkLoader {
    scheduler: Arc<TaskScheduler>,
    raster: Arc<WorldRaster>,
    store: Arc<dyn WorldStore>,
    lights: Arc<LightEngine>,
    chunk_size: i32,
    diagonal_dependencies: bool,
    world_chunks: Vector2<i32>,
    chunks: RwLock<FxHashMap<ChunkPos, Arc<Chunk>>>,
    phase_events: Arc<Mutex<Vec<(ChunkPos, ChunkPhase)>>>,
}

impl ChunkLoader {
    /// Creates a loader over the given backing pieces.
    #[must_use]
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        raster: Arc<WorldRaster>,
        store: Arc<dyn WorldStore>,
        lights: Arc<LightEngine>,
        config: &EngineConfig,
    ) -> Self {
        let chunk_size = config.chunk_size as i32;
        let size = raster.size();
        // Partial chunks on the far edges still get their own entry.
        let world_chunks = Vector2::new(
            (size.x + chunk_size - 1) / chunk_size,
            (size.y + chunk_size - 1) / chunk_size,
        );

        Self {
            scheduler,
            raster,
            store,
            lights,
            chunk_size,
            diagonal_dependencies: config.diagonal_dependencies,
            world_chunks,
            chunks: RwLock::new(FxHashMap::default()),
            phase_events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The world extent in whole chunks.
    #[must_use]
    #[inline]
    pub const fn world_chunks(&self) -> Vector2<i32> {
        self.world_chunks
    }

    /// Checks whether a chunk position exists in this world.
    #[must_use]
    #[inline]
    pub fn in_bounds(&self, pos: ChunkPos) -> bool {
        pos.0.x >= 0 && pos.0.y >= 0 && pos.0.x < self.world_chunks.x && pos.0.y < self.world_chunks.y
    }

    /// Returns the tracked chunk at `pos`, if the loader has seen it.
    #[must_use]
    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.read().get(&pos).cloned()
    }

    /// The current phase of a chunk. Untracked chunks report
    /// [`ChunkPhase::NeedsLoading`].
    #[must_use]
    pub fn phase(&self, pos: ChunkPos) -> ChunkPhase {
        self.chunk(pos)
            .map_or(ChunkPhase::NeedsLoading, |chunk| chunk.phase())
    }

    /// Drains the phase transition events recorded since the last poll.
    #[must_use]
    pub fn poll_phase_events(&self) -> Vec<(ChunkPos, ChunkPhase)> {
        std::mem::take(&mut *self.phase_events.lock())
    }

    /// Stops tracking a chunk.
    ///
    /// Tasks already in flight for it keep running against the raster but
    /// find their target gone on completion and finish without effect.
    pub fn remove_chunk(&self, pos: ChunkPos) {
        self.chunks.write().remove(&pos);
    }

    fn chunk_or_insert(&self, pos: ChunkPos) -> Arc<Chunk> {
        if let Some(chunk) = self.chunk(pos) {
            return chunk;
        }
        Arc::clone(
            self.chunks
                .write()
                .entry(pos)
                .or_insert_with(|| Arc::new(Chunk::new(pos, self.chunk_size))),
        )
    }

    /// The chunk positions whose block data must be present before `pos`
    /// can be lit: the chunk itself plus its 8- or 4-neighbourhood, clipped
    /// to the world.
    fn dependency_set(&self, pos: ChunkPos) -> SmallVec<[ChunkPos; 9]> {
        let mut deps = SmallVec::new();
        deps.push(pos);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if !self.diagonal_dependencies && dx != 0 && dy != 0 {
                    continue;
                }
                let neighbour = ChunkPos::new(pos.0.x + dx, pos.0.y + dy);
                if self.in_bounds(neighbour) {
                    deps.push(neighbour);
                }
            }
        }
        deps
    }

    /// Queues the block-load for a chunk.
    ///
    /// A no-op when the position is outside the world, the chunk is already
    /// loaded, or a load is already in flight.
    pub fn begin_loading(&self, pos: ChunkPos) {
        if !self.in_bounds(pos) {
            return;
        }
        let chunk = self.chunk_or_insert(pos);
        if !chunk.try_claim_load() {
            return;
        }

        let raster = Arc::clone(&self.raster);
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.phase_events);
        let target = Arc::downgrade(&chunk);
        let region = chunk.region();

        self.scheduler.submit_tracked(
            move || Self::run_load(&target, &raster, store.as_ref(), &events, region),
            PRIORITY_LOAD,
            TaskTag::ChunkLoad,
            pos,
        );
    }

    fn run_load(
        target: &Weak<Chunk>,
        raster: &WorldRaster,
        store: &dyn WorldStore,
        events: &Mutex<Vec<(ChunkPos, ChunkPhase)>>,
        region: Region,
    ) -> anyhow::Result<TaskOutput> {
        let Some(chunk) = target.upgrade() else {
            log::debug!("chunk freed before its load ran, skipping");
            return Ok(TaskOutput::Empty);
        };
        let pos = chunk.pos();

        let stored: Vec<_> = region
            .iter()
            .map(|tile| store.read_cell(tile).unwrap_or_default())
            .collect();

        {
            let mut layers = chunk.layers_mut();
            for (slot, cell) in stored.iter().enumerate() {
                layers.blocks[slot] = cell.block;
                layers.walls[slot] = cell.wall;
            }
        }

        {
            let mut writer = raster.write();
            for (tile, cell) in region.iter().zip(&stored) {
                writer.set_cell(
                    tile,
                    Cell {
                        block: cell.block,
                        block_paint: cell.block_paint,
                        wall: cell.wall,
                        wall_paint: cell.wall_paint,
                        light: 0.0,
                        source: false,
                    },
                );
            }
        }

        chunk.finish_load();
        events.lock().push((pos, ChunkPhase::NeedsLighting));
        Ok(TaskOutput::Chunk(pos))
    }

    /// Queues the lighting pass for a chunk, after first forcing every
    /// dependency chunk through loading on the calling thread.
    ///
    /// A no-op when the position is outside the world, the chunk is already
    /// lit, or lighting is already in flight.
    pub fn begin_lighting(&self, pos: ChunkPos) {
        if !self.in_bounds(pos) {
            return;
        }
        let chunk = self.chunk_or_insert(pos);
        if !chunk.try_claim_light() {
            return;
        }

        let deps = self.dependency_set(pos);
        for &dep in &deps {
            self.begin_loading(dep);
        }
        for &dep in &deps {
            self.finish_loading_forcefully(dep);
        }

        let lights = Arc::clone(&self.lights);
        let events = Arc::clone(&self.phase_events);
        let target = Arc::downgrade(&chunk);
        let region = chunk.region();

        self.scheduler.submit_tracked(
            move || {
                let Some(chunk) = target.upgrade() else {
                    log::debug!("chunk freed before its lighting ran, skipping");
                    return Ok(TaskOutput::Empty);
                };
                lights.light_chunk(region);
                chunk.finish_light();
                events.lock().push((chunk.pos(), ChunkPhase::ReadyToDraw));
                Ok(TaskOutput::Chunk(chunk.pos()))
            },
            PRIORITY_LIGHT,
            TaskTag::ChunkLight,
            pos,
        );
    }

    /// Blocks until the in-flight load for `pos` has completed. Returns
    /// immediately when no load is in flight.
    pub fn finish_loading_forcefully(&self, pos: ChunkPos) {
        let Some(chunk) = self.chunk(pos) else {
            return;
        };
        if !chunk.is_load_in_flight() {
            return;
        }
        self.scheduler.wait_for(TaskTag::ChunkLoad, pos);
    }

    /// Blocks until the in-flight lighting for `pos` has completed,
    /// forcing its load dependencies through first. Returns immediately
    /// when no lighting is in flight.
    pub fn finish_lighting_forcefully(&self, pos: ChunkPos) {
        let Some(chunk) = self.chunk(pos) else {
            return;
        };
        if !chunk.is_light_in_flight() {
            return;
        }
        for dep in self.dependency_set(pos) {
            self.finish_loading_forcefully(dep);
        }
        self.scheduler.wait_for(TaskTag::ChunkLight, pos);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tile::TileCatalogue;

    fn loader_with(config: &EngineConfig, world_tiles: Vector2<i32>) -> ChunkLoader {
        let scheduler = Arc::new(TaskScheduler::new(1));
        let raster = Arc::new(WorldRaster::new(world_tiles));
        let store = Arc::new(crate::world::MemoryStore::new(world_tiles));
        let catalogue = Arc::new(TileCatalogue::with_defaults());
        let lights = Arc::new(LightEngine::new(
            Arc::clone(&raster),
            catalogue,
            config.light_decay,
            config.light_cutoff,
        ));
        ChunkLoader::new(scheduler, raster, store, lights, config)
    }

    #[test]
    fn test_dependency_set_interior_and_clipped() {
        let config = EngineConfig {
            chunk_size: 32,
            ..EngineConfig::default()
        };
        let loader = loader_with(&config, Vector2::new(96, 96));

        let interior = loader.dependency_set(ChunkPos::new(1, 1));
        assert_eq!(interior.len(), 9);
        assert_eq!(interior[0], ChunkPos::new(1, 1));

        // Corner chunk: only the in-world part of the neighbourhood.
        let corner = loader.dependency_set(ChunkPos::new(0, 0));
        assert_eq!(corner.len(), 4);
        for dep in &corner {
            assert!(loader.in_bounds(*dep));
        }
    }

    #[test]
    fn test_dependency_set_without_diagonals() {
        let config = EngineConfig {
            chunk_size: 32,
            diagonal_dependencies: false,
            ..EngineConfig::default()
        };
        let loader = loader_with(&config, Vector2::new(96, 96));

        let deps = loader.dependency_set(ChunkPos::new(1, 1));
        assert_eq!(deps.len(), 5);
        assert!(!deps.contains(&ChunkPos::new(0, 0)));
        assert!(deps.contains(&ChunkPos::new(0, 1)));
    }

    #[test]
    fn test_world_chunks_rounds_partial_edges_up() {
        let config = EngineConfig {
            chunk_size: 32,
            ..EngineConfig::default()
        };
        let loader = loader_with(&config, Vector2::new(70, 33));
        assert_eq!(loader.world_chunks(), Vector2::new(3, 2));
        assert!(loader.in_bounds(ChunkPos::new(2, 1)));
        assert!(!loader.in_bounds(ChunkPos::new(3, 0)));
    }

    #[test]
    fn test_untracked_chunk_reports_needs_loading() {
        let config = EngineConfig::default();
        let loader = loader_with(&config, Vector2::new(64, 64));
        assert_eq!(loader.phase(ChunkPos::new(1, 1)), ChunkPhase::NeedsLoading);
        assert!(loader.chunk(ChunkPos::new(1, 1)).is_none());
    }

    #[test]
    fn test_out_of_bounds_requests_are_ignored() {
        let config = EngineConfig::default();
        let loader = loader_with(&config, Vector2::new(64, 64));

        loader.begin_loading(ChunkPos::new(-1, 0));
        loader.begin_lighting(ChunkPos::new(5, 5));

        assert!(loader.chunks.read().is_empty());
        assert!(loader.poll_phase_events().is_empty());
    }
}
