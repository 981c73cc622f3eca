//! The world raster: one shared 2D grid with a cell per tile.
//!
//! All access goes through the scoped [`RasterReader`] / [`RasterWriter`]
//! guards; there is no way to reach the cell buffer while forgetting to
//! release it.

use ember_utils::{TileId, TilePos, WallId, math::Vector2};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One cell of the world raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cell {
    /// Foreground tile material.
    pub block: TileId,
    /// Decorative paint index for the block layer.
    pub block_paint: u8,
    /// Background wall material.
    pub wall: WallId,
    /// Decorative paint index for the wall layer.
    pub wall_paint: u8,
    /// Current light intensity, `0.0..=1.0`. Derived data, owned by the
    /// light engine.
    pub light: f32,
    /// Whether this cell is an active light source.
    pub source: bool,
}

/// A rectangular region of tile positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Top-left corner.
    pub origin: TilePos,
    /// Width and height in tiles.
    pub size: Vector2<i32>,
}

impl Region {
    /// Creates a region from its corner and extent.
    #[must_use]
    pub const fn new(origin: TilePos, size: Vector2<i32>) -> Self {
        Self { origin, size }
    }

    /// Checks whether a tile position falls inside the region.
    #[must_use]
    pub fn contains(&self, pos: TilePos) -> bool {
        pos.0.x >= self.origin.0.x
            && pos.0.y >= self.origin.0.y
            && pos.0.x < self.origin.0.x + self.size.x
            && pos.0.y < self.origin.0.y + self.size.y
    }

    /// Iterates the region row by row.
    pub fn iter(&self) -> impl Iterator<Item = TilePos> + use<> {
        let origin = self.origin;
        let size = self.size;
        (0..size.y).flat_map(move |dy| (0..size.x).map(move |dx| origin.offset(dx, dy)))
    }

    /// Iterates the one-tile ring immediately outside the region.
    pub fn ring(&self) -> impl Iterator<Item = TilePos> + use<> {
        let origin = self.origin;
        let size = self.size;
        let horizontal = (-1..=size.x).flat_map(move |dx| {
            [origin.offset(dx, -1), origin.offset(dx, size.y)]
        });
        let vertical = (0..size.y).flat_map(move |dy| {
            [origin.offset(-1, dy), origin.offset(size.x, dy)]
        });
        horizontal.chain(vertical)
    }
}

/// A read-only copy of the light levels in a region, for the presentation
/// layer. Cells outside the world read as dark.
#[derive(Debug, Clone)]
pub struct LightSnapshot {
    /// The region the snapshot covers.
    pub region: Region,
    levels: Vec<f32>,
}

impl LightSnapshot {
    /// Returns the sampled intensity at a world tile position, `0.0` when
    /// the position is outside the snapshot.
    #[must_use]
    pub fn light(&self, pos: TilePos) -> f32 {
        if !self.region.contains(pos) {
            return 0.0;
        }
        let dx = pos.0.x - self.region.origin.0.x;
        let dy = pos.0.y - self.region.origin.0.y;
        self.levels[(dy * self.region.size.x + dx) as usize]
    }
}

/// The shared world grid.
///
/// Writes during chunk loading are partitioned by convention (each load task
/// touches only its own rectangle); lighting passes take the write guard for
/// their whole drain, which serializes them against each other and against
/// loads.
#[derive(Debug)]
pub struct WorldRaster {
    size: Vector2<i32>,
    cells: RwLock<Box<[Cell]>>,
}

impl WorldRaster {
    /// Creates a dark, empty raster of the given dimensions in tiles.
    ///
    /// # Panics
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(size: Vector2<i32>) -> Self {
        assert!(size.x > 0 && size.y > 0, "raster dimensions must be positive");
        let cells = vec![Cell::default(); (size.x as usize) * (size.y as usize)];
        Self {
            size,
            cells: RwLock::new(cells.into_boxed_slice()),
        }
    }

    /// The raster dimensions in tiles.
    #[must_use]
    #[inline]
    pub const fn size(&self) -> Vector2<i32> {
        self.size
    }

    /// Checks whether a tile position is inside the raster.
    #[must_use]
    #[inline]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.0.x >= 0 && pos.0.y >= 0 && pos.0.x < self.size.x && pos.0.y < self.size.y
    }

    /// Acquires shared read access.
    #[must_use]
    pub fn read(&self) -> RasterReader<'_> {
        RasterReader {
            size: self.size,
            cells: self.cells.read(),
        }
    }

    /// Acquires exclusive write access.
    #[must_use]
    pub fn write(&self) -> RasterWriter<'_> {
        RasterWriter {
            size: self.size,
            cells: self.cells.write(),
        }
    }

    #[inline]
    fn index(size: Vector2<i32>, pos: TilePos) -> Option<usize> {
        if pos.0.x < 0 || pos.0.y < 0 || pos.0.x >= size.x || pos.0.y >= size.y {
            None
        } else {
            Some((pos.0.y * size.x + pos.0.x) as usize)
        }
    }
}

/// Scoped shared access to the raster cells.
pub struct RasterReader<'a> {
    size: Vector2<i32>,
    cells: RwLockReadGuard<'a, Box<[Cell]>>,
}

impl RasterReader<'_> {
    /// Returns the cell at a position, `None` out of bounds.
    #[must_use]
    pub fn cell(&self, pos: TilePos) -> Option<&Cell> {
        WorldRaster::index(self.size, pos).map(|index| &self.cells[index])
    }

    /// Returns the light level at a position, `0.0` out of bounds.
    #[must_use]
    #[inline]
    pub fn light(&self, pos: TilePos) -> f32 {
        self.cell(pos).map_or(0.0, |cell| cell.light)
    }

    /// Copies the light levels of a region. Out-of-world cells read as dark.
    #[must_use]
    pub fn light_snapshot(&self, region: Region) -> LightSnapshot {
        let levels = region.iter().map(|pos| self.light(pos)).collect();
        LightSnapshot { region, levels }
    }
}

/// Scoped exclusive access to the raster cells.
pub struct RasterWriter<'a> {
    size: Vector2<i32>,
    cells: RwLockWriteGuard<'a, Box<[Cell]>>,
}

impl RasterWriter<'_> {
    /// Returns the cell at a position, `None` out of bounds.
    #[must_use]
    pub fn cell(&self, pos: TilePos) -> Option<&Cell> {
        WorldRaster::index(self.size, pos).map(|index| &self.cells[index])
    }

    /// Returns the light level at a position, `0.0` out of bounds.
    #[must_use]
    #[inline]
    pub fn light(&self, pos: TilePos) -> f32 {
        self.cell(pos).map_or(0.0, |cell| cell.light)
    }

    /// Overwrites the cell at a position. Out of bounds is a no-op.
    pub fn set_cell(&mut self, pos: TilePos, cell: Cell) {
        if let Some(index) = WorldRaster::index(self.size, pos) {
            self.cells[index] = cell;
        }
    }

    /// Sets the light level at a position. Out of bounds is a no-op.
    #[inline]
    pub fn set_light(&mut self, pos: TilePos, light: f32) {
        if let Some(index) = WorldRaster::index(self.size, pos) {
            self.cells[index].light = light;
        }
    }

    /// Sets the light-source flag at a position. Out of bounds is a no-op.
    #[inline]
    pub fn set_source(&mut self, pos: TilePos, source: bool) {
        if let Some(index) = WorldRaster::index(self.size, pos) {
            self.cells[index].source = source;
        }
    }

    /// Returns a mutable cell reference, `None` out of bounds.
    pub fn cell_mut(&mut self, pos: TilePos) -> Option<&mut Cell> {
        WorldRaster::index(self.size, pos).map(|index| &mut self.cells[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let raster = WorldRaster::new(Vector2::new(8, 4));

        assert!(raster.in_bounds(TilePos::new(0, 0)));
        assert!(raster.in_bounds(TilePos::new(7, 3)));
        assert!(!raster.in_bounds(TilePos::new(8, 0)));
        assert!(!raster.in_bounds(TilePos::new(0, -1)));
    }

    #[test]
    fn test_guarded_read_write() {
        let raster = WorldRaster::new(Vector2::new(8, 4));
        let pos = TilePos::new(3, 2);

        {
            let mut writer = raster.write();
            writer.set_light(pos, 0.75);
            writer.set_source(pos, true);
            // Out of bounds writes are dropped.
            writer.set_light(TilePos::new(100, 100), 1.0);
        }

        let reader = raster.read();
        assert!((reader.light(pos) - 0.75).abs() < f32::EPSILON);
        assert!(reader.cell(pos).is_some_and(|cell| cell.source));
        assert_eq!(reader.light(TilePos::new(100, 100)), 0.0);
    }

    #[test]
    fn test_snapshot_covers_region_and_clips() {
        let raster = WorldRaster::new(Vector2::new(8, 4));
        raster.write().set_light(TilePos::new(1, 1), 0.5);

        let region = Region::new(TilePos::new(0, 0), Vector2::new(10, 10));
        let snapshot = raster.read().light_snapshot(region);

        assert!((snapshot.light(TilePos::new(1, 1)) - 0.5).abs() < f32::EPSILON);
        // Inside the snapshot but outside the world: dark.
        assert_eq!(snapshot.light(TilePos::new(9, 9)), 0.0);
        // Outside the snapshot entirely: dark.
        assert_eq!(snapshot.light(TilePos::new(-1, 0)), 0.0);
    }
}
