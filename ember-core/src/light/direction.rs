//! Axis directions for light propagation.

use ember_utils::TilePos;

/// The four axis directions light propagates along.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Upward (-Y, towards the sky).
    Up = 0,
    /// Downward (+Y, towards the underworld).
    Down = 1,
    /// Leftward (-X).
    Left = 2,
    /// Rightward (+X).
    Right = 3,
}

impl Direction {
    /// All four directions in array form for iteration.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Gets the `(dx, dy)` offset for this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Returns the neighbouring position in this direction.
    #[must_use]
    pub const fn relative(self, pos: TilePos) -> TilePos {
        let (dx, dy) = self.offset();
        pos.offset(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn test_relative() {
        let pos = TilePos::new(4, 4);
        assert_eq!(Direction::Up.relative(pos), TilePos::new(4, 3));
        assert_eq!(Direction::Down.relative(pos), TilePos::new(4, 5));
        assert_eq!(Direction::Left.relative(pos), TilePos::new(3, 4));
        assert_eq!(Direction::Right.relative(pos), TilePos::new(5, 4));
    }
}
