//! Grid Points and Directions
//!
//! Integer tile coordinates and the 8-way compass rose. All distance
//! metrics are integral so geometry stays deterministic everywhere.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A tile coordinate on a level grid.
///
/// Implements `Ord` (row-major: y, then x) so points can key a `BTreeMap`
/// with deterministic iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column, 0 at the left edge
    pub x: i32,
    /// Row, 0 at the top edge
    pub y: i32,
}

impl Point {
    /// Origin tile.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a raw offset.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Translate one step in a direction.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Chebyshev (king-move) distance: the number of 8-way steps between
    /// two tiles.
    #[inline]
    pub fn chebyshev(self, other: Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Manhattan (taxicab) distance.
    #[inline]
    pub fn manhattan(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Squared Euclidean distance, for radius checks without a sqrt.
    #[inline]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// True if `other` is one 8-way step away (and not the same tile).
    #[inline]
    pub fn adjacent(self, other: Self) -> bool {
        self != other && self.chebyshev(other) == 1
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major: y first, then x
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The 8-way compass rose.
///
/// Discriminant order is the canonical neighbor enumeration order used by
/// geometry queries and the monster policies, so changing it changes
/// simulation results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Up
    North = 0,
    /// Down
    South = 1,
    /// Right
    East = 2,
    /// Left
    West = 3,
    /// Up-right
    NorthEast = 4,
    /// Up-left
    NorthWest = 5,
    /// Down-right
    SouthEast = 6,
    /// Down-left
    SouthWest = 7,
}

impl Direction {
    /// The four cardinal directions, in canonical order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// All eight directions, cardinals first.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// Tile offset for one step in this direction.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ordering_row_major() {
        let a = Point::new(5, 1);
        let b = Point::new(0, 2);
        let c = Point::new(1, 2);

        assert!(a < b, "lower row sorts first");
        assert!(b < c, "same row sorts by column");
    }

    #[test]
    fn test_chebyshev_distance() {
        let origin = Point::ZERO;
        assert_eq!(origin.chebyshev(Point::new(3, -2)), 3);
        assert_eq!(origin.chebyshev(Point::new(-1, 1)), 1);
        assert_eq!(origin.chebyshev(origin), 0);
    }

    #[test]
    fn test_adjacency() {
        let p = Point::new(4, 4);
        assert!(p.adjacent(Point::new(5, 5)));
        assert!(p.adjacent(Point::new(4, 3)));
        assert!(!p.adjacent(p));
        assert!(!p.adjacent(Point::new(6, 4)));
    }

    #[test]
    fn test_step_and_opposite_cancel() {
        let p = Point::new(10, 7);
        for dir in Direction::ALL {
            assert_eq!(p.step(dir).step(dir.opposite()), p);
        }
    }

    #[test]
    fn test_direction_deltas_are_unit_steps() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!((dx, dy) != (0, 0));
        }
    }
}
