//! The world raster store boundary.
//!
//! On-disk formats live behind this trait; the core only ever reads raw
//! cells from it during chunk loading. The bundled [`MemoryStore`] keeps
//! everything in RAM for tests and tooling.

use ember_utils::{TileId, TilePos, WallId, math::Vector2};
use parking_lot::RwLock;

/// The raw, undecoded content of one stored cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredCell {
    /// Foreground tile material.
    pub block: TileId,
    /// Decorative paint index for the block layer.
    pub block_paint: u8,
    /// Background wall material.
    pub wall: WallId,
    /// Decorative paint index for the wall layer.
    pub wall_paint: u8,
}

/// Source of raw world content, consumed by chunk load tasks.
pub trait WorldStore: Send + Sync {
    /// Reads the stored cell at a position, `None` out of bounds.
    fn read_cell(&self, pos: TilePos) -> Option<StoredCell>;

    /// Writes a cell back. Out of bounds is a no-op.
    fn write_cell(&self, pos: TilePos, cell: StoredCell);

    /// The stored world dimensions in tiles.
    fn dimensions(&self) -> Vector2<i32>;
}

/// A RAM-backed store.
#[derive(Debug)]
pub struct MemoryStore {
    size: Vector2<i32>,
    cells: RwLock<Box<[StoredCell]>>,
}

impl MemoryStore {
    /// Creates an all-air store of the given dimensions.
    ///
    /// # Panics
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(size: Vector2<i32>) -> Self {
        assert!(size.x > 0 && size.y > 0, "store dimensions must be positive");
        let cells = vec![StoredCell::default(); (size.x as usize) * (size.y as usize)];
        Self {
            size,
            cells: RwLock::new(cells.into_boxed_slice()),
        }
    }

    /// Sets the block layer of a cell; used to seed test and tool worlds.
    pub fn place_block(&self, pos: TilePos, block: TileId) {
        let mut cell = self.read_cell(pos).unwrap_or_default();
        cell.block = block;
        self.write_cell(pos, cell);
    }

    #[inline]
    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.0.x < 0 || pos.0.y < 0 || pos.0.x >= self.size.x || pos.0.y >= self.size.y {
            None
        } else {
            Some((pos.0.y * self.size.x + pos.0.x) as usize)
        }
    }
}

impl WorldStore for MemoryStore {
    fn read_cell(&self, pos: TilePos) -> Option<StoredCell> {
        self.index(pos).map(|index| self.cells.read()[index])
    }

    fn write_cell(&self, pos: TilePos, cell: StoredCell) {
        if let Some(index) = self.index(pos) {
            self.cells.write()[index] = cell;
        }
    }

    fn dimensions(&self) -> Vector2<i32> {
        self.size
    }
}
