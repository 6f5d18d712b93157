//! Level Grid and Geometry
//!
//! Fixed-size tile grid with terrain, occupant back-references, and the
//! geometric queries the visibility engine and action resolver build on:
//! bounds-checked cell access, line tracing, neighbor enumeration.

use serde::{Serialize, Deserialize};

use crate::core::point::{Direction, Point};
use crate::game::entity::EntityId;
use crate::game::error::CoreError;

/// What a tile is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    /// Open room or corridor floor
    Floor,
    /// Solid rock
    Wall,
    /// Room entrance carved by a corridor
    Door {
        /// Closed doors may block sight; movement opens them
        open: bool,
    },
    /// Way back up to the previous level
    StairsUp,
    /// Way down to the next level
    StairsDown,
}

impl Terrain {
    /// Whether creatures can enter this tile. Closed doors are passable;
    /// entering one opens it.
    #[inline]
    pub fn passable(self) -> bool {
        !matches!(self, Terrain::Wall)
    }

    /// Whether sight passes through this tile. `closed_doors_block` comes
    /// from the vision configuration.
    #[inline]
    pub fn transparent(self, closed_doors_block: bool) -> bool {
        match self {
            Terrain::Wall => false,
            Terrain::Door { open } => open || !closed_doors_block,
            _ => true,
        }
    }
}

/// One tile of a level.
///
/// The occupant is a convenience back-reference maintained by the entity
/// registry; the registry's own index is authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Terrain kind
    pub terrain: Terrain,
    /// Blocking entity currently standing here, if any
    pub occupant: Option<EntityId>,
}

impl Cell {
    /// A plain wall cell.
    pub const WALL: Self = Self {
        terrain: Terrain::Wall,
        occupant: None,
    };
}

/// A placed room rectangle, wall ring included.
///
/// The interior (floor) is the rectangle shrunk by one on each side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Left edge (wall ring)
    pub x: i32,
    /// Top edge (wall ring)
    pub y: i32,
    /// Total width including walls
    pub w: i32,
    /// Total height including walls
    pub h: i32,
}

impl Room {
    /// Center tile of the room interior.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// True if the point lies in the floor interior.
    pub fn contains_interior(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.x + self.w - 1 && p.y > self.y && p.y < self.y + self.h - 1
    }

    /// True if the point lies on the wall ring.
    pub fn on_perimeter(&self, p: Point) -> bool {
        let inside = p.x >= self.x
            && p.x <= self.x + self.w - 1
            && p.y >= self.y
            && p.y <= self.y + self.h - 1;
        inside && !self.contains_interior(p)
    }

    /// True if this rectangle, grown by `margin`, overlaps `other`.
    pub fn intersects(&self, other: &Room, margin: i32) -> bool {
        self.x - margin < other.x + other.w
            && self.x + self.w + margin > other.x
            && self.y - margin < other.y + other.h
            && self.y + self.h + margin > other.y
    }
}

/// The fixed-size tile map of one dungeon level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    /// Tile the player arrives on when entering the level
    pub entry: Point,
    /// The level's single stairs-down tile
    pub stairs_down: Point,
    /// Stairs back up; absent on the first level
    pub stairs_up: Option<Point>,
    /// Room rectangles, in placement order (entry room first)
    pub rooms: Vec<Room>,
}

impl Grid {
    /// Create a grid filled with solid wall.
    pub fn filled(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            cells: vec![Cell::WALL; (width * height) as usize],
            entry: Point::ZERO,
            stairs_down: Point::ZERO,
            stairs_up: None,
            rooms: Vec::new(),
        }
    }

    /// Grid width in tiles.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in tiles.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether the coordinate lies within `[0,w) x [0,h)`.
    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    #[inline]
    fn index(&self, p: Point) -> usize {
        (p.y * self.width + p.x) as usize
    }

    /// Bounds-checked cell access.
    pub fn cell(&self, p: Point) -> Result<&Cell, CoreError> {
        if self.in_bounds(p) {
            Ok(&self.cells[self.index(p)])
        } else {
            Err(CoreError::OutOfBounds { x: p.x, y: p.y })
        }
    }

    /// Bounds-checked mutable cell access.
    pub fn cell_mut(&mut self, p: Point) -> Result<&mut Cell, CoreError> {
        if self.in_bounds(p) {
            let idx = self.index(p);
            Ok(&mut self.cells[idx])
        } else {
            Err(CoreError::OutOfBounds { x: p.x, y: p.y })
        }
    }

    /// Terrain at a tile, or `Wall` outside bounds.
    #[inline]
    pub fn terrain(&self, p: Point) -> Terrain {
        self.cell(p).map(|c| c.terrain).unwrap_or(Terrain::Wall)
    }

    /// Overwrite terrain at a tile. Out-of-bounds writes are a
    /// programming error.
    pub fn set_terrain(&mut self, p: Point, terrain: Terrain) -> Result<(), CoreError> {
        self.cell_mut(p)?.terrain = terrain;
        Ok(())
    }

    /// Pure passability query; out-of-bounds tiles are impassable.
    #[inline]
    pub fn is_passable(&self, p: Point) -> bool {
        self.terrain(p).passable()
    }

    /// Pure transparency query; out-of-bounds tiles are opaque.
    #[inline]
    pub fn is_transparent(&self, p: Point, closed_doors_block: bool) -> bool {
        self.terrain(p).transparent(closed_doors_block)
    }

    /// Blocking entity standing on a tile, if any.
    #[inline]
    pub fn occupant(&self, p: Point) -> Option<EntityId> {
        self.cell(p).ok().and_then(|c| c.occupant)
    }

    /// Maintain the occupant back-reference. Called by the entity
    /// registry only.
    pub(crate) fn set_occupant(&mut self, p: Point, occupant: Option<EntityId>) {
        if let Ok(cell) = self.cell_mut(p) {
            cell.occupant = occupant;
        }
    }

    /// Open the door at `p` if there is a closed one. Returns whether a
    /// door was opened.
    pub fn open_door(&mut self, p: Point) -> bool {
        if let Ok(cell) = self.cell_mut(p) {
            if cell.terrain == (Terrain::Door { open: false }) {
                cell.terrain = Terrain::Door { open: true };
                return true;
            }
        }
        false
    }

    /// Ordered sequence of tiles a sightline crosses, endpoints included.
    ///
    /// The cell set is stable under endpoint swap: the line is always
    /// traced from the lesser endpoint and reversed when needed, so
    /// occlusion tests agree in both directions.
    pub fn trace_line(&self, from: Point, to: Point) -> Vec<Point> {
        let swapped = to < from;
        let (a, b) = if swapped { (to, from) } else { (from, to) };
        let mut line = bresenham(a, b);
        if swapped {
            line.reverse();
        }
        line
    }

    /// In-bounds neighbors of a tile, in canonical direction order.
    pub fn neighbors(
        &self,
        p: Point,
        include_diagonals: bool,
    ) -> impl Iterator<Item = Point> + '_ {
        let dirs: &'static [Direction] = if include_diagonals {
            &Direction::ALL
        } else {
            &Direction::CARDINAL
        };
        dirs.iter()
            .map(move |d| p.step(*d))
            .filter(|q| self.in_bounds(*q))
    }

    /// Iterate all tile coordinates in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |y| (0..w).map(move |x| Point::new(x, y)))
    }
}

/// Integer Bresenham line, endpoints included.
fn bresenham(a: Point, b: Point) -> Vec<Point> {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };

    let mut err = dx + dy;
    let mut x = a.x;
    let mut y = a.y;

    let mut line = Vec::with_capacity((dx - dy) as usize + 1);
    loop {
        line.push(Point::new(x, y));
        if x == b.x && y == b.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    line
}

// =============================================================================
// TESTS
// =============================================================================
