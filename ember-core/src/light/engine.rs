//! The light propagation engine.
//!
//! The engine owns the pending add/remove queues and runs breadth-first
//! passes over the shared world raster. Producers only ever enqueue update
//! requests behind a small mutex; every pass takes the raster write guard
//! for its whole drain, so two passes can never interleave on the raster.
//!
//! Execution order inside one pass: all removals first, then the re-add
//! candidates those removals produced, then external additions. This keeps
//! other readers from observing a transiently under-lit world between a
//! removal and its cascading repair.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ember_utils::{QueueSet, TilePos};
use parking_lot::Mutex;

use crate::tile::TileCatalogue;
use crate::world::{RasterWriter, Region, WorldRaster};

use super::direction::Direction;
use super::queue::LightQueue;

/// The brightest intensity a source can request.
pub const MAX_LIGHT: f32 = 1.0;

/// Pending updates, deduplicated per position.
#[derive(Default)]
struct PendingUpdates {
    /// Brightest-wins per position.
    adds: QueueSet<TilePos, f32>,
    /// Keyed purely by position; the payload is the intensity that was
    /// stored there when the removal was requested.
    removes: QueueSet<TilePos, f32>,
}

/// Incremental flood-fill light engine over the world raster.
pub struct LightEngine {
    raster: Arc<WorldRaster>,
    catalogue: Arc<TileCatalogue>,
    decay: f32,
    cutoff: f32,
    pending: Mutex<PendingUpdates>,
    tick_elapsed: AtomicBool,
}

impl LightEngine {
    /// Creates an engine over the given raster and catalogue.
    #[must_use]
    pub fn new(
        raster: Arc<WorldRaster>,
        catalogue: Arc<TileCatalogue>,
        decay: f32,
        cutoff: f32,
    ) -> Self {
        Self {
            raster,
            catalogue,
            decay,
            cutoff,
            pending: Mutex::new(PendingUpdates::default()),
            tick_elapsed: AtomicBool::new(false),
        }
    }

    /// Requests a light source addition.
    ///
    /// No-op when the position is out of bounds or the raster is already at
    /// least that bright there. A pending add at the same position keeps
    /// only the brightest requested intensity.
    pub fn add_light(&self, pos: TilePos, intensity: f32) {
        let intensity = intensity.min(MAX_LIGHT);
        if !self.raster.in_bounds(pos) || intensity <= 0.0 {
            return;
        }
        if self.raster.read().light(pos) >= intensity {
            return;
        }

        let mut pending = self.pending.lock();
        if pending.adds.get(&pos).is_some_and(|&queued| queued >= intensity) {
            return;
        }
        pending.adds.push(pos, intensity);
    }

    /// Requests a light removal at a position.
    ///
    /// No-op when the position is out of bounds or already dark. The cell's
    /// current intensity is captured now; the removal flood needs it.
    pub fn remove_light(&self, pos: TilePos) {
        if !self.raster.in_bounds(pos) {
            return;
        }
        let current = self.raster.read().light(pos);
        if current <= 0.0 {
            return;
        }
        self.pending.lock().removes.push(pos, current);
    }

    /// Signals that a simulation tick has elapsed; the lighting thread runs
    /// one pass per tick.
    pub fn notify_tick(&self) {
        self.tick_elapsed.store(true, Ordering::Release);
    }

    /// Consumes the pending tick signal, if any.
    pub(crate) fn take_tick(&self) -> bool {
        self.tick_elapsed.swap(false, Ordering::AcqRel)
    }

    /// Checks whether any update requests are queued.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        let pending = self.pending.lock();
        !pending.adds.is_empty() || !pending.removes.is_empty()
    }

    /// Drains all queued updates in one pass: removals, then their re-add
    /// repairs, then external additions.
    pub fn process_pass(&self) {
        let (mut adds, mut removes) = {
            let mut pending = self.pending.lock();
            (
                std::mem::take(&mut pending.adds),
                std::mem::take(&mut pending.removes),
            )
        };

        let mut raster = self.raster.write();
        let mut frontier = LightQueue::new();
        let mut removal_frontier = LightQueue::new();

        // Removals first; each may feed re-add candidates into `frontier`.
        while let Some((pos, level)) = removes.pop() {
            self.propagate_removal(&mut raster, pos, level, &mut removal_frontier, &mut frontier);
        }

        // Re-add repairs strictly precede unrelated pending additions.
        self.propagate_additions(&mut raster, &mut frontier);

        while let Some((pos, intensity)) = adds.pop() {
            if raster.light(pos) < intensity {
                raster.set_light(pos, intensity);
                raster.set_source(pos, true);
                frontier.enqueue(pos, intensity);
            }
        }
        self.propagate_additions(&mut raster, &mut frontier);
    }

    /// Runs the initial lighting pass for one chunk's region.
    ///
    /// Seeds from luminous tiles inside the region and, so that already-lit
    /// neighbours spill across the border without being recomputed, from the
    /// one-tile ring of cached light around it.
    pub fn light_chunk(&self, region: Region) {
        let mut raster = self.raster.write();
        let mut frontier = LightQueue::new();

        for pos in region.iter() {
            let Some(cell) = raster.cell(pos).copied() else {
                continue;
            };
            let emitted = self.catalogue.luminance(cell.block);
            if emitted > 0.0 {
                let emitted = emitted.min(MAX_LIGHT);
                raster.set_source(pos, true);
                if raster.light(pos) < emitted {
                    raster.set_light(pos, emitted);
                }
                frontier.enqueue(pos, emitted);
            } else if cell.source && cell.light > 0.0 {
                // A dynamic source placed before this region was (re)lit.
                frontier.enqueue(pos, cell.light);
            }
        }

        for pos in region.ring() {
            let cached = raster.light(pos);
            if cached > self.cutoff {
                frontier.enqueue(pos, cached);
            }
        }

        self.propagate_additions(&mut raster, &mut frontier);
    }

    /// The addition BFS: drains `frontier`, brightening cells outward while
    /// the attenuated intensity stays above the cutoff.
    fn propagate_additions(&self, raster: &mut RasterWriter<'_>, frontier: &mut LightQueue) {
        while let Some((pos, level)) = frontier.dequeue() {
            let Some(cell) = raster.cell(pos).copied() else {
                continue;
            };
            if level < cell.light {
                // Something brighter got here first.
                continue;
            }
            if level > cell.light {
                raster.set_light(pos, level);
            }

            // One attenuation step per node: the fixed decay, scaled by the
            // occupying tile's opacity.
            let attenuated = level * self.decay * (1.0 - self.catalogue.opacity(cell.block));
            if attenuated <= self.cutoff {
                continue;
            }

            for dir in Direction::ALL {
                let next = dir.relative(pos);
                if raster.cell(next).is_some_and(|cell| cell.light < attenuated) {
                    frontier.enqueue(next, attenuated);
                }
            }
        }
    }

    /// The removal BFS: darkens every cell lit solely through the removed
    /// source and collects independently-lit boundary cells as re-add
    /// candidates.
    fn propagate_removal(
        &self,
        raster: &mut RasterWriter<'_>,
        seed: TilePos,
        seed_level: f32,
        frontier: &mut LightQueue,
        readds: &mut LightQueue,
    ) {
        frontier.clear();
        frontier.enqueue(seed, seed_level);
        raster.set_light(seed, 0.0);
        raster.set_source(seed, false);

        while let Some((pos, level)) = frontier.dequeue() {
            for dir in Direction::ALL {
                let next = dir.relative(pos);
                let next_level = raster.light(next);
                if next_level <= 0.0 {
                    continue;
                }
                if next_level < level {
                    // Lit solely through the removed path: darken and keep
                    // flooding.
                    raster.set_light(next, 0.0);
                    raster.set_source(next, false);
                    frontier.enqueue(next, next_level);
                } else {
                    // Reached an independent or stronger source; re-fill
                    // from it after the removal finishes.
                    readds.enqueue(next, next_level);
                }
            }
        }
    }
}
