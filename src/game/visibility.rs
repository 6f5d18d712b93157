//! Visibility Engine
//!
//! Computes the set of tiles currently visible from a viewpoint and
//! remembers every tile the viewpoint has ever seen. Current visibility
//! is recomputed from scratch on each refresh; the ever-seen memory only
//! grows for the lifetime of a level.

use serde::{Serialize, Deserialize};

use crate::core::point::Point;
use crate::game::grid::Grid;

/// Sight rules for a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Maximum Euclidean tile distance considered
    pub radius: u32,
    /// Whether closed doors stop sight
    pub closed_doors_block: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            closed_doors_block: true,
        }
    }
}

/// Visibility bits for one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileVisibility {
    /// In the viewpoint's current field of view
    pub visible: bool,
    /// Observed at least once this level
    pub seen: bool,
}

/// Per-level visibility map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityState {
    width: i32,
    height: i32,
    tiles: Vec<TileVisibility>,
}

impl VisibilityState {
    /// Fresh, fully-unseen map for a level.
    pub fn for_grid(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            tiles: vec![TileVisibility::default(); (grid.width() * grid.height()) as usize],
        }
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height {
            Some((p.y * self.width + p.x) as usize)
        } else {
            None
        }
    }

    /// Whether a tile is in the current field of view. Out-of-bounds
    /// tiles are never visible.
    #[inline]
    pub fn visible(&self, p: Point) -> bool {
        self.index(p).map(|i| self.tiles[i].visible).unwrap_or(false)
    }

    /// Whether a tile has ever been observed this level.
    #[inline]
    pub fn seen(&self, p: Point) -> bool {
        self.index(p).map(|i| self.tiles[i].seen).unwrap_or(false)
    }

    /// Visibility bits for a tile (default bits out of bounds).
    #[inline]
    pub fn tile(&self, p: Point) -> TileVisibility {
        self.index(p).map(|i| self.tiles[i]).unwrap_or_default()
    }

    fn mark(&mut self, p: Point) {
        if let Some(i) = self.index(p) {
            self.tiles[i].visible = true;
            self.tiles[i].seen = true;
        }
    }

    fn clear_visible(&mut self) {
        for tile in &mut self.tiles {
            tile.visible = false;
        }
    }

    /// Recompute the field of view from `viewpoint`.
    ///
    /// A tile within the radius is visible when its traced sightline
    /// contains no opaque cell strictly before it; the first opaque cell
    /// on a line is itself visible (that is how walls get drawn). Marked
    /// tiles also set `seen`, which is never cleared.
    pub fn refresh(&mut self, grid: &Grid, viewpoint: Point, config: &VisionConfig) {
        self.clear_visible();
        self.mark(viewpoint);

        let radius_sq = (config.radius as i64) * (config.radius as i64);
        for p in grid.points() {
            if p == viewpoint || viewpoint.distance_squared(p) > radius_sq {
                continue;
            }

            let line = grid.trace_line(viewpoint, p);
            // Skip the viewpoint itself; stop at the first opaque cell
            let blocked = line[1..line.len() - 1]
                .iter()
                .any(|q| !grid.is_transparent(*q, config.closed_doors_block));
            if !blocked {
                self.mark(p);
            }
        }
    }

    /// Reveal the whole level layout (scroll of magic mapping). Only the
    /// monotone `seen` bits are touched.
    pub fn reveal_all(&mut self) {
        for tile in &mut self.tiles {
            tile.seen = true;
        }
    }

    /// Count of currently visible tiles.
    pub fn visible_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.visible).count()
    }

    /// Count of ever-seen tiles.
    pub fn seen_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.seen).count()
    }
}

/// Whether `to` is in unobstructed line of sight from `from`, ignoring
/// distance. Both the monster policies and perception checks share this.
pub fn line_clear(grid: &Grid, from: Point, to: Point, closed_doors_block: bool) -> bool {
    if from == to {
        return true;
    }
    let line = grid.trace_line(from, to);
    line[1..line.len() - 1]
        .iter()
        .all(|q| grid.is_transparent(*q, closed_doors_block))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Terrain;

    fn corridor_grid() -> Grid {
        // A 1-tile-wide corridor along y = 1 with an opaque wall at x = 4
        let mut grid = Grid::filled(12, 3);
        for x in 1..11 {
            grid.set_terrain(Point::new(x, 1), Terrain::Floor).unwrap();
        }
        grid.set_terrain(Point::new(4, 1), Terrain::Wall).unwrap();
        grid
    }

    #[test]
    fn test_corridor_occlusion() {
        let grid = corridor_grid();
        let mut vis = VisibilityState::for_grid(&grid);
        let config = VisionConfig {
            radius: 5,
            closed_doors_block: true,
        };

        let viewpoint = Point::new(1, 1);
        vis.refresh(&grid, viewpoint, &config);

        // Tiles before the wall are visible, the wall itself included
        assert!(vis.visible(Point::new(2, 1)));
        assert!(vis.visible(Point::new(3, 1)));
        assert!(vis.visible(Point::new(4, 1)));

        // Tiles beyond the wall along the sightline are not
        assert!(!vis.visible(Point::new(5, 1)));
        assert!(!vis.visible(Point::new(6, 1)));

        // And tiles past the radius are not, either
        assert!(!vis.visible(Point::new(7, 1)));
    }

    #[test]
    fn test_ever_seen_is_monotone() {
        let grid = corridor_grid();
        let mut vis = VisibilityState::for_grid(&grid);
        let config = VisionConfig::default();

        vis.refresh(&grid, Point::new(1, 1), &config);
        let seen_before = vis.seen_count();
        assert!(vis.seen(Point::new(2, 1)));

        // Move the viewpoint behind the wall; old tiles leave the fov
        // but stay seen
        vis.refresh(&grid, Point::new(8, 1), &config);
        assert!(!vis.visible(Point::new(2, 1)));
        assert!(vis.seen(Point::new(2, 1)));
        assert!(vis.seen_count() >= seen_before);
    }

    #[test]
    fn test_closed_door_blocks_when_configured() {
        let mut grid = corridor_grid();
        grid.set_terrain(Point::new(4, 1), Terrain::Door { open: false })
            .unwrap();
        let mut vis = VisibilityState::for_grid(&grid);

        let blocking = VisionConfig {
            radius: 8,
            closed_doors_block: true,
        };
        vis.refresh(&grid, Point::new(1, 1), &blocking);
        assert!(vis.visible(Point::new(4, 1)));
        assert!(!vis.visible(Point::new(5, 1)));

        let permissive = VisionConfig {
            radius: 8,
            closed_doors_block: false,
        };
        vis.refresh(&grid, Point::new(1, 1), &permissive);
        assert!(vis.visible(Point::new(5, 1)));
    }

    #[test]
    fn test_reveal_all_only_touches_seen() {
        let grid = corridor_grid();
        let mut vis = VisibilityState::for_grid(&grid);

        vis.reveal_all();
        assert_eq!(vis.seen_count(), (grid.width() * grid.height()) as usize);
        assert_eq!(vis.visible_count(), 0);
    }

    #[test]
    fn test_line_clear() {
        let grid = corridor_grid();

        assert!(line_clear(&grid, Point::new(1, 1), Point::new(3, 1), true));
        // The wall at x = 4 sits strictly between the endpoints
        assert!(!line_clear(&grid, Point::new(1, 1), Point::new(6, 1), true));
        // Endpoint opacity does not block sight of the endpoint itself
        assert!(line_clear(&grid, Point::new(3, 1), Point::new(4, 1), true));
    }
}
