//! Dungeon Generation
//!
//! Seeded, retry-bounded level construction: rejection-sampled room
//! rectangles, a minimum spanning tree over room centers with extra loop
//! edges, L-shaped corridors, doors where corridors pierce room walls,
//! and stairs placed by graph distance. Identical `(seed, depth)` always
//! produces an identical grid.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::point::Point;
use crate::core::rng::{derive_level_seed, DeterministicRng};
use crate::game::error::CoreError;
use crate::game::grid::{Grid, Room, Terrain};

/// Tunables for level construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Grid width in tiles
    pub width: i32,
    /// Grid height in tiles
    pub height: i32,
    /// A layout with fewer rooms than this is rejected
    pub min_rooms: usize,
    /// Placement stops once this many rooms exist
    pub max_rooms: usize,
    /// Smallest room width, wall ring included
    pub room_min_w: i32,
    /// Largest room width, wall ring included
    pub room_max_w: i32,
    /// Smallest room height, wall ring included
    pub room_min_h: i32,
    /// Largest room height, wall ring included
    pub room_max_h: i32,
    /// Rectangle samples per layout attempt
    pub placement_attempts: u32,
    /// Fresh-sub-seed retries before `GenerationFailed`
    pub retry_cap: u32,
    /// Extra loop corridors, as a percentage of the room count
    pub extra_corridor_percent: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            min_rooms: 5,
            max_rooms: 9,
            room_min_w: 6,
            room_max_w: 12,
            room_min_h: 4,
            room_max_h: 7,
            placement_attempts: 200,
            retry_cap: 8,
            extra_corridor_percent: 25,
        }
    }
}

/// Build the grid for one dungeon level.
///
/// Each attempt runs on a SHA-256-derived sub-seed of
/// `(seed, depth, attempt)`, so a failed layout never replays itself and
/// the whole procedure stays reproducible. A grid is only returned after
/// passing the connectivity check; on exhaustion the caller gets
/// `GenerationFailed` and no partial grid ever escapes.
pub fn generate(seed: u64, depth: u32, config: &GeneratorConfig) -> Result<Grid, CoreError> {
    for attempt in 0..config.retry_cap {
        let sub_seed = derive_level_seed(seed, depth, attempt);
        let mut rng = DeterministicRng::new(sub_seed);

        if let Some(grid) = try_generate(&mut rng, depth, config) {
            debug!(depth, attempt, rooms = grid.rooms.len(), "level generated");
            return Ok(grid);
        }
        debug!(depth, attempt, "layout rejected, retrying with derived sub-seed");
    }

    Err(CoreError::GenerationFailed {
        depth,
        attempts: config.retry_cap,
    })
}

/// One full layout attempt. `None` means the attempt is rejected and the
/// caller should retry with a fresh sub-seed.
fn try_generate(rng: &mut DeterministicRng, depth: u32, config: &GeneratorConfig) -> Option<Grid> {
    let mut grid = Grid::filled(config.width, config.height);

    let rooms = place_rooms(rng, config)?;
    carve_rooms(&mut grid, &rooms);

    let mut edges = spanning_edges(&rooms);
    add_loop_edges(rng, &rooms, &mut edges, config.extra_corridor_percent);

    for (i, j) in &edges {
        carve_corridor(&mut grid, &rooms, rooms[*i].center(), rooms[*j].center(), rng);
    }

    place_stairs(&mut grid, &rooms, &edges, depth);
    grid.rooms = rooms;

    if !validate_connectivity(&grid) {
        return None;
    }
    Some(grid)
}

/// Rejection-sampled non-overlapping room rectangles. Rooms keep a
/// one-tile gap from each other and from the map border.
fn place_rooms(rng: &mut DeterministicRng, config: &GeneratorConfig) -> Option<Vec<Room>> {
    let mut rooms: Vec<Room> = Vec::new();

    for _ in 0..config.placement_attempts {
        if rooms.len() >= config.max_rooms {
            break;
        }

        let w = rng.next_range(config.room_min_w, config.room_max_w);
        let h = rng.next_range(config.room_min_h, config.room_max_h);
        let x = rng.next_range(1, config.width - w - 1);
        let y = rng.next_range(1, config.height - h - 1);
        let candidate = Room { x, y, w, h };

        if rooms.iter().all(|r| !candidate.intersects(r, 1)) {
            rooms.push(candidate);
        }
    }

    if rooms.len() < config.min_rooms {
        return None;
    }
    Some(rooms)
}

fn carve_rooms(grid: &mut Grid, rooms: &[Room]) {
    for room in rooms {
        for y in room.y + 1..room.y + room.h - 1 {
            for x in room.x + 1..room.x + room.w - 1 {
                // Interior carving stays in bounds by construction
                let _ = grid.set_terrain(Point::new(x, y), Terrain::Floor);
            }
        }
    }
}

/// Prim's minimum spanning tree over room centers by Manhattan distance.
/// Ties break on (distance, from, to) so the tree is deterministic.
fn spanning_edges(rooms: &[Room]) -> Vec<(usize, usize)> {
    let n = rooms.len();
    let mut in_tree = vec![false; n];
    in_tree[0] = true;

    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    for _ in 1..n {
        let mut best: Option<(u32, usize, usize)> = None;
        for i in 0..n {
            if !in_tree[i] {
                continue;
            }
            for j in 0..n {
                if in_tree[j] {
                    continue;
                }
                let d = rooms[i].center().manhattan(rooms[j].center());
                if best.map_or(true, |b| (d, i, j) < b) {
                    best = Some((d, i, j));
                }
            }
        }
        let (_, i, j) = best.expect("tree grows by one room per step");
        in_tree[j] = true;
        edges.push((i, j));
    }
    edges
}

/// Append a configured fraction of non-tree edges so corridors form
/// loops instead of a pure tree.
fn add_loop_edges(
    rng: &mut DeterministicRng,
    rooms: &[Room],
    edges: &mut Vec<(usize, usize)>,
    extra_percent: u32,
) {
    let n = rooms.len();
    let mut candidates: Vec<(usize, usize)> = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            let taken = edges
                .iter()
                .any(|(a, b)| (*a == i && *b == j) || (*a == j && *b == i));
            if !taken {
                candidates.push((i, j));
            }
        }
    }

    rng.shuffle(&mut candidates);
    let extra = (n as u32 * extra_percent / 100) as usize;
    edges.extend(candidates.into_iter().take(extra));
}

/// Carve an L-shaped corridor between two room centers. Wall cells on a
/// room perimeter become closed doors; other wall cells become floor.
fn carve_corridor(
    grid: &mut Grid,
    rooms: &[Room],
    from: Point,
    to: Point,
    rng: &mut DeterministicRng,
) {
    let elbow = if rng.chance(50) {
        Point::new(to.x, from.y)
    } else {
        Point::new(from.x, to.y)
    };

    for p in orthogonal_path(from, elbow).chain(orthogonal_path(elbow, to)) {
        carve_corridor_cell(grid, rooms, p);
    }
}

fn carve_corridor_cell(grid: &mut Grid, rooms: &[Room], p: Point) {
    if grid.terrain(p) != Terrain::Wall {
        return;
    }
    let terrain = if rooms.iter().any(|r| r.on_perimeter(p)) {
        Terrain::Door { open: false }
    } else {
        Terrain::Floor
    };
    let _ = grid.set_terrain(p, terrain);
}

/// Tiles of a straight horizontal or vertical segment, endpoints included.
fn orthogonal_path(from: Point, to: Point) -> impl Iterator<Item = Point> {
    let steps = from.manhattan(to) as i32;
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    (0..=steps).map(move |k| Point::new(from.x + dx * k, from.y + dy * k))
}

/// Stairs-down goes to the room farthest (by corridor-graph hops) from
/// the entry room; stairs-up goes to the entry room on every level but
/// the first.
fn place_stairs(grid: &mut Grid, rooms: &[Room], edges: &[(usize, usize)], depth: u32) {
    let farthest = farthest_room(rooms.len(), edges);

    let entry = rooms[0].center();
    let down = rooms[farthest].center();

    grid.entry = entry;
    grid.stairs_down = down;
    let _ = grid.set_terrain(down, Terrain::StairsDown);

    if depth > 1 {
        grid.stairs_up = Some(entry);
        let _ = grid.set_terrain(entry, Terrain::StairsUp);
    }
}

/// BFS over the room graph from room 0; returns the index with the
/// largest hop count (lowest index on ties).
fn farthest_room(room_count: usize, edges: &[(usize, usize)]) -> usize {
    let mut adjacency = vec![Vec::new(); room_count];
    for (i, j) in edges {
        adjacency[*i].push(*j);
        adjacency[*j].push(*i);
    }
    for list in &mut adjacency {
        list.sort_unstable();
    }

    let mut dist = vec![u32::MAX; room_count];
    dist[0] = 0;
    let mut queue = std::collections::VecDeque::from([0usize]);
    while let Some(i) = queue.pop_front() {
        for &j in &adjacency[i] {
            if dist[j] == u32::MAX {
                dist[j] = dist[i] + 1;
                queue.push_back(j);
            }
        }
    }

    let mut farthest = 0;
    for (i, d) in dist.iter().enumerate() {
        if *d != u32::MAX && *d > dist[farthest] {
            farthest = i;
        }
    }
    farthest
}

/// Flood-fill from the entry tile over passable cells; the level is
/// playable only if the stairs-down and every room center are reached.
fn validate_connectivity(grid: &Grid) -> bool {
    let mut visited = vec![false; (grid.width() * grid.height()) as usize];
    let index = |p: Point| (p.y * grid.width() + p.x) as usize;

    let mut queue = std::collections::VecDeque::from([grid.entry]);
    visited[index(grid.entry)] = true;

    while let Some(p) = queue.pop_front() {
        for q in grid.neighbors(p, false) {
            if !visited[index(q)] && grid.is_passable(q) {
                visited[index(q)] = true;
                queue.push_back(q);
            }
        }
    }

    visited[index(grid.stairs_down)] && grid.rooms.iter().all(|r| visited[index(r.center())])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_deterministic() {
        let config = GeneratorConfig::default();

        let grid1 = generate(12345, 1, &config).unwrap();
        let grid2 = generate(12345, 1, &config).unwrap();

        assert_eq!(grid1, grid2);
    }

    #[test]
    fn test_generate_depths_differ() {
        let config = GeneratorConfig::default();

        let level1 = generate(12345, 1, &config).unwrap();
        let level2 = generate(12345, 2, &config).unwrap();

        assert_ne!(level1.rooms, level2.rooms);
    }

    #[test]
    fn test_different_seeds_differ() {
        let config = GeneratorConfig::default();

        let a = generate(1, 1, &config).unwrap();
        let b = generate(2, 1, &config).unwrap();

        // Overwhelmingly likely; both still satisfy connectivity below
        assert_ne!(a.rooms, b.rooms);
        assert!(validate_connectivity(&a));
        assert!(validate_connectivity(&b));
    }

    #[test]
    fn test_stairs_placement() {
        let config = GeneratorConfig::default();

        let first = generate(777, 1, &config).unwrap();
        assert_eq!(first.terrain(first.stairs_down), Terrain::StairsDown);
        assert!(first.stairs_up.is_none());

        let deeper = generate(777, 2, &config).unwrap();
        let up = deeper.stairs_up.expect("stairs-up below the first level");
        assert_eq!(deeper.terrain(up), Terrain::StairsUp);
        assert_eq!(up, deeper.entry);
        assert_ne!(deeper.stairs_down, up);
    }

    #[test]
    fn test_room_count_within_bounds() {
        let config = GeneratorConfig::default();

        for seed in 0..20u64 {
            let grid = generate(seed, 1, &config).unwrap();
            assert!(grid.rooms.len() >= config.min_rooms);
            assert!(grid.rooms.len() <= config.max_rooms);
        }
    }

    #[test]
    fn test_impossible_config_fails_cleanly() {
        let config = GeneratorConfig {
            // More rooms than the grid can hold
            width: 20,
            height: 10,
            min_rooms: 30,
            max_rooms: 40,
            ..GeneratorConfig::default()
        };

        let err = generate(1, 1, &config).unwrap_err();
        assert_eq!(
            err,
            CoreError::GenerationFailed {
                depth: 1,
                attempts: config.retry_cap
            }
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_generate_deterministic(seed in any::<u64>(), depth in 1u32..8) {
            let config = GeneratorConfig::default();
            let a = generate(seed, depth, &config).unwrap();
            let b = generate(seed, depth, &config).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_entry_reaches_stairs(seed in any::<u64>()) {
            let config = GeneratorConfig::default();
            let grid = generate(seed, 1, &config).unwrap();
            prop_assert!(validate_connectivity(&grid));
        }
    }
}
