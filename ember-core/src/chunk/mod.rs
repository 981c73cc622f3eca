//! Chunks: the unit of world streaming.

pub mod loader;

pub use loader::{ChunkLoader, PRIORITY_LIGHT, PRIORITY_LOAD};

use ember_utils::{ChunkPos, TileId, WallId, math::Vector2};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::world::Region;

/// A chunk's progress through the streaming pipeline.
///
/// Phases only ever advance; the ordering of the variants is the ordering
/// of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChunkPhase {
    /// Block data has not been decoded yet.
    NeedsLoading,
    /// Blocks are in place; derived lighting has not been computed.
    NeedsLighting,
    /// Fully streamed in; safe for the presentation layer to draw.
    ReadyToDraw,
}

/// The structured per-chunk tile layers, decoded from the raw store.
#[derive(Debug)]
pub struct ChunkLayers {
    /// Foreground tile materials, row-major over the chunk rectangle.
    pub blocks: Box<[TileId]>,
    /// Background wall materials, row-major over the chunk rectangle.
    pub walls: Box<[WallId]>,
}

/// One streamed chunk.
///
/// The phase is never stored: it is recomputed on read from the two one-way
/// `loaded` / `lit` booleans, which makes regression impossible by
/// construction. The in-flight flags are the submission locks that keep a
/// chunk from being queued twice for the same transition.
#[derive(Debug)]
pub struct Chunk {
    pos: ChunkPos,
    size: i32,
    layers: RwLock<ChunkLayers>,
    loaded: AtomicBool,
    lit: AtomicBool,
    load_in_flight: AtomicBool,
    light_in_flight: AtomicBool,
}

impl Chunk {
    /// Creates an unloaded chunk of `size * size` tiles.
    #[must_use]
    pub fn new(pos: ChunkPos, size: i32) -> Self {
        let area = (size * size) as usize;
        Self {
            pos,
            size,
            layers: RwLock::new(ChunkLayers {
                blocks: vec![TileId::default(); area].into_boxed_slice(),
                walls: vec![WallId::default(); area].into_boxed_slice(),
            }),
            loaded: AtomicBool::new(false),
            lit: AtomicBool::new(false),
            load_in_flight: AtomicBool::new(false),
            light_in_flight: AtomicBool::new(false),
        }
    }

    /// The chunk's grid position.
    #[must_use]
    #[inline]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// The raster region this chunk covers.
    #[must_use]
    pub fn region(&self) -> Region {
        Region::new(self.pos.origin(self.size), Vector2::new(self.size, self.size))
    }

    /// The chunk's current phase, derived from the completion booleans.
    #[must_use]
    pub fn phase(&self) -> ChunkPhase {
        if !self.loaded.load(Ordering::Acquire) {
            ChunkPhase::NeedsLoading
        } else if !self.lit.load(Ordering::Acquire) {
            ChunkPhase::NeedsLighting
        } else {
            ChunkPhase::ReadyToDraw
        }
    }

    /// Whether block data has been decoded.
    #[must_use]
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Whether lighting has been computed.
    #[must_use]
    #[inline]
    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::Acquire)
    }

    /// Whether a load task is currently queued or running.
    #[must_use]
    #[inline]
    pub fn is_load_in_flight(&self) -> bool {
        self.load_in_flight.load(Ordering::Acquire)
    }

    /// Whether a lighting task is currently queued or running.
    #[must_use]
    #[inline]
    pub fn is_light_in_flight(&self) -> bool {
        self.light_in_flight.load(Ordering::Acquire)
    }

    /// Shared access to the decoded layers.
    #[must_use]
    pub fn layers(&self) -> RwLockReadGuard<'_, ChunkLayers> {
        self.layers.read()
    }

    pub(crate) fn layers_mut(&self) -> RwLockWriteGuard<'_, ChunkLayers> {
        self.layers.write()
    }

    /// Claims the load submission lock. `false` means the chunk is already
    /// loaded or a load is already in flight, and the caller must not
    /// submit.
    pub(crate) fn try_claim_load(&self) -> bool {
        if self.is_loaded() {
            return false;
        }
        self.load_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claims the lighting submission lock; same contract as
    /// [`Self::try_claim_load`].
    pub(crate) fn try_claim_light(&self) -> bool {
        if self.is_lit() {
            return false;
        }
        self.light_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the load complete and releases its submission lock.
    ///
    /// Completing a phase that was never claimed means the lock discipline
    /// was bypassed; that is a programming error, fatal in debug builds.
    pub(crate) fn finish_load(&self) {
        self.loaded.store(true, Ordering::Release);
        let was_in_flight = self.load_in_flight.swap(false, Ordering::AcqRel);
        debug_assert!(was_in_flight, "load finished without a claimed lock");
        if !was_in_flight {
            log::error!("chunk {:?}: load finished without a claimed lock", self.pos);
        }
    }

    /// Marks lighting complete and releases its submission lock.
    pub(crate) fn finish_light(&self) {
        self.lit.store(true, Ordering::Release);
        let was_in_flight = self.light_in_flight.swap(false, Ordering::AcqRel);
        debug_assert!(was_in_flight, "lighting finished without a claimed lock");
        if !was_in_flight {
            log::error!(
                "chunk {:?}: lighting finished without a claimed lock",
                self.pos
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_is_derived_and_monotonic() {
        let chunk = Chunk::new(ChunkPos::new(0, 0), 32);
        assert_eq!(chunk.phase(), ChunkPhase::NeedsLoading);

        assert!(chunk.try_claim_load());
        // Claiming does not advance the phase.
        assert_eq!(chunk.phase(), ChunkPhase::NeedsLoading);

        chunk.finish_load();
        assert_eq!(chunk.phase(), ChunkPhase::NeedsLighting);

        assert!(chunk.try_claim_light());
        chunk.finish_light();
        assert_eq!(chunk.phase(), ChunkPhase::ReadyToDraw);

        assert!(ChunkPhase::NeedsLoading < ChunkPhase::NeedsLighting);
        assert!(ChunkPhase::NeedsLighting < ChunkPhase::ReadyToDraw);
    }

    #[test]
    fn test_double_claim_is_rejected() {
        let chunk = Chunk::new(ChunkPos::new(0, 0), 32);

        assert!(chunk.try_claim_load());
        assert!(!chunk.try_claim_load());
        chunk.finish_load();
        // Already loaded: no further claims.
        assert!(!chunk.try_claim_load());

        assert!(chunk.try_claim_light());
        assert!(!chunk.try_claim_light());
    }

    #[test]
    fn test_region() {
        let chunk = Chunk::new(ChunkPos::new(2, 1), 32);
        let region = chunk.region();
        assert_eq!(region.origin, ember_utils::TilePos::new(64, 32));
        assert_eq!(region.size, Vector2::new(32, 32));
    }
}
