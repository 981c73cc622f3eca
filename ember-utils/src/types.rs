// Wrapper types making it harder to accidentally use the wrong underlying type.

use crate::math::Vector2;

/// A raw block (foreground tile) identifier, resolved through the tile catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileId(pub u16);

/// A raw wall (background tile) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WallId(pub u16);

/// A tile position: one cell of the world raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePos(pub Vector2<i32>);

/// A chunk position: one cell of the streaming grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos(pub Vector2<i32>);

impl TilePos {
    /// Creates a tile position from its coordinates.
    #[must_use]
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self(Vector2::new(x, y))
    }

    /// Returns the position offset by the given deltas.
    #[must_use]
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self(Vector2::new(self.0.x + dx, self.0.y + dy))
    }

    /// Returns the chunk containing this tile, for the given chunk size in tiles.
    #[must_use]
    #[inline]
    pub const fn chunk(self, chunk_size: i32) -> ChunkPos {
        ChunkPos(Vector2::new(
            self.0.x.div_euclid(chunk_size),
            self.0.y.div_euclid(chunk_size),
        ))
    }
}

impl ChunkPos {
    /// Creates a chunk position from its coordinates.
    #[must_use]
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self(Vector2::new(x, y))
    }

    /// Returns the tile position of this chunk's top-left corner.
    #[must_use]
    #[inline]
    pub const fn origin(self, chunk_size: i32) -> TilePos {
        TilePos(Vector2::new(self.0.x * chunk_size, self.0.y * chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_to_chunk() {
        assert_eq!(TilePos::new(0, 0).chunk(32), ChunkPos::new(0, 0));
        assert_eq!(TilePos::new(31, 31).chunk(32), ChunkPos::new(0, 0));
        assert_eq!(TilePos::new(32, 0).chunk(32), ChunkPos::new(1, 0));
        assert_eq!(TilePos::new(-1, -1).chunk(32), ChunkPos::new(-1, -1));
    }

    #[test]
    fn test_chunk_origin() {
        assert_eq!(ChunkPos::new(2, 1).origin(32), TilePos::new(64, 32));
        assert_eq!(ChunkPos::new(0, 0).origin(32), TilePos::new(0, 0));
    }
}
