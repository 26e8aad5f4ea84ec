//! Uniform-cell spatial hash for local neighbor queries.
//!
//! Points are binned by `floor(coordinate / cell_size)` on each axis and the
//! three cell coordinates are hashed into a bucket key. A neighborhood query
//! unions the 27 buckets around the query cell, so candidates stay local
//! instead of spanning the whole entity set.
//!
//! Pick `cell_size` relative to the largest interaction distance (the
//! collision resolver uses `2.5 * max_radius`) so true neighbors never sit
//! further than one cell away.

use std::collections::HashMap;

use crate::{EntityId, Position};

/// Smallest usable cell size.
const MIN_CELL_SIZE: f32 = 1e-6;

/// Large primes for the cell hash.
const HASH_PRIMES: [i64; 3] = [73_856_093, 19_349_663, 83_492_791];

type CellCoord = (i64, i64, i64);

/// Hash grid over `(id, position)` pairs.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid<K> {
    cell_size: f32,
    buckets: HashMap<i64, Vec<(K, Position)>>,
    /// Where each id currently lives, for updates and removals.
    locations: HashMap<K, (i64, Position)>,
}

impl<K: EntityId> SpatialHashGrid<K> {
    /// Create an empty grid. Non-positive sizes are clamped to a tiny minimum.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };
        Self {
            cell_size,
            buckets: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Drop every point but keep allocations for reuse.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.locations.clear();
    }

    /// Place `id` at `position`. Inserting an id that is already present moves it.
    pub fn insert(&mut self, id: K, position: Position) {
        self.remove(&id);
        let key = Self::hash_cell(self.cell_of(&position));
        self.buckets
            .entry(key)
            .or_default()
            .push((id.clone(), position));
        self.locations.insert(id, (key, position));
    }

    /// Move `id` to `position`.
    pub fn update(&mut self, id: K, position: Position) {
        self.insert(id, position);
    }

    /// Remove `id`, returning its last position.
    pub fn remove(&mut self, id: &K) -> Option<Position> {
        let (key, position) = self.locations.remove(id)?;
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.retain(|(other, _)| other != id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        Some(position)
    }

    /// Current position of `id`.
    pub fn position_of(&self, id: &K) -> Option<Position> {
        self.locations.get(id).map(|(_, position)| *position)
    }

    /// All points in the 3×3×3 block of cells around `position`.
    ///
    /// These are candidates: hash collisions can add points from unrelated
    /// cells, so callers still filter by distance.
    pub fn nearby(&self, position: &Position) -> Vec<(K, Position)> {
        self.collect_cells(self.cell_of(position), 1)
    }

    /// Ids strictly within `radius` of `id`, excluding `id` itself.
    ///
    /// Once the block of cells the radius spans outnumbers the occupied
    /// buckets, every stored point is scanned instead. An infinite radius
    /// returns every other id; a NaN or non-positive one returns none.
    pub fn neighbors_of(&self, id: &K, radius: f32) -> Vec<K> {
        let Some(center) = self.position_of(id) else {
            return Vec::new();
        };
        if radius.is_nan() || radius <= 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let within = |other: &K, p: &Position| {
            other != id && (radius.is_infinite() || (*p - center).norm_squared() < radius_sq)
        };

        let reach = (radius / self.cell_size).ceil().max(1.0);
        let stencil = (2.0 * reach + 1.0).powi(3);
        if !stencil.is_finite() || stencil > self.buckets.len() as f32 {
            return self
                .locations
                .iter()
                .filter(|(other, (_, p))| within(*other, p))
                .map(|(other, _)| other.clone())
                .collect();
        }

        self.collect_cells(self.cell_of(&center), reach as i64)
            .into_iter()
            .filter(|(other, p)| within(other, p))
            .map(|(other, _)| other)
            .collect()
    }

    fn collect_cells(&self, (cx, cy, cz): CellCoord, reach: i64) -> Vec<(K, Position)> {
        let side = reach.saturating_mul(2).saturating_add(1);
        let volume = side.saturating_mul(side).saturating_mul(side);
        let mut keys = Vec::with_capacity(usize::try_from(volume).unwrap_or(0));
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    keys.push(Self::hash_cell((
                        cx.wrapping_add(dx),
                        cy.wrapping_add(dy),
                        cz.wrapping_add(dz),
                    )));
                }
            }
        }
        // Distinct cells may share a bucket; visit each bucket once.
        keys.sort_unstable();
        keys.dedup();

        keys.iter()
            .filter_map(|key| self.buckets.get(key))
            .flatten()
            .cloned()
            .collect()
    }

    fn cell_of(&self, position: &Position) -> CellCoord {
        let axis = |c: f32| (c / self.cell_size).floor() as i64;
        (axis(position.x), axis(position.y), axis(position.z))
    }

    fn hash_cell((x, y, z): CellCoord) -> i64 {
        x.wrapping_mul(HASH_PRIMES[0])
            ^ y.wrapping_mul(HASH_PRIMES[1])
            ^ z.wrapping_mul(HASH_PRIMES[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn ids(mut found: Vec<(u32, Position)>) -> Vec<u32> {
        found.sort_by_key(|(id, _)| *id);
        found.into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn test_cell_size_is_kept() {
        let grid: SpatialHashGrid<u32> = SpatialHashGrid::new(0.5);
        assert_eq!(grid.cell_size(), 0.5);

        let degenerate: SpatialHashGrid<u32> = SpatialHashGrid::new(0.0);
        assert!(degenerate.cell_size() > 0.0);
    }

    #[test]
    fn test_nearby_covers_adjacent_cells_only() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.1, 0.1, 0.1));
        grid.insert(2, Point3::new(1.9, 0.5, -0.5));
        grid.insert(3, Point3::new(5.0, 5.0, 5.0));
        grid.insert(4, Point3::new(-0.9, -0.9, -0.9));

        let found = ids(grid.nearby(&Point3::new(0.5, 0.5, 0.5)));
        assert_eq!(found, vec![1, 2, 4]);
    }

    #[test]
    fn test_negative_coordinates_floor() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(-0.5, 0.0, 0.0));
        grid.insert(2, Point3::new(-2.5, 0.0, 0.0));

        // -0.5 is cell -1, -2.5 is cell -3: two cells apart.
        let found = ids(grid.nearby(&Point3::new(-0.5, 0.0, 0.0)));
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_neighbors_of_excludes_self_and_far_points() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.insert(2, Point3::new(0.5, 0.5, 0.5));
        grid.insert(3, Point3::new(5.0, 5.0, 5.0));

        let neighbors = grid.neighbors_of(&1, 1.5);
        assert_eq!(neighbors, vec![2]);
    }

    #[test]
    fn test_neighbors_of_wide_radius() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.insert(2, Point3::new(3.5, 0.0, 0.0));

        assert_eq!(grid.neighbors_of(&1, 4.0), vec![2]);
        assert!(grid.neighbors_of(&1, 3.0).is_empty());
    }

    #[test]
    fn test_neighbors_of_radius_far_beyond_cell_size() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.insert(2, Point3::new(2.0e6, 0.0, 0.0));

        assert_eq!(grid.neighbors_of(&1, 3.0e6), vec![2]);
        assert!(grid.neighbors_of(&1, 1.0e6).is_empty());
    }

    #[test]
    fn test_neighbors_of_degenerate_radius() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.insert(2, Point3::new(1.0e20, -1.0e20, 3.0));
        grid.insert(3, Point3::new(0.1, 0.0, 0.0));

        let mut everyone = grid.neighbors_of(&1, f32::INFINITY);
        everyone.sort_unstable();
        assert_eq!(everyone, vec![2, 3]);
        assert!(grid.neighbors_of(&1, f32::NAN).is_empty());
        assert!(grid.neighbors_of(&1, 0.0).is_empty());
        assert!(grid.neighbors_of(&1, -2.0).is_empty());
    }

    #[test]
    fn test_neighbors_of_dense_lattice_matches_brute_force() {
        // 200 occupied cells, so a reach of 2 (125 cells) stays on the stencil path.
        let mut grid = SpatialHashGrid::new(1.0);
        let mut points = Vec::new();
        for x in 0..10 {
            for y in 0..10 {
                for z in 0..2 {
                    let id = (x * 100 + y * 10 + z) as u32;
                    let p = Point3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                    grid.insert(id, p);
                    points.push((id, p));
                }
            }
        }

        for &(id, center) in &points {
            let mut found = grid.neighbors_of(&id, 1.5);
            found.sort_unstable();
            let mut expected: Vec<u32> = points
                .iter()
                .filter(|(other, p)| *other != id && (*p - center).norm_squared() < 2.25)
                .map(|(other, _)| *other)
                .collect();
            expected.sort_unstable();
            assert_eq!(found, expected, "neighbors of {id}");
        }
    }

    #[test]
    fn test_clear() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.insert(2, Point3::new(1.0, 1.0, 1.0));

        grid.clear();
        assert!(grid.is_empty());

        grid.insert(3, Point3::new(0.0, 0.0, 0.0));
        assert!(grid.neighbors_of(&3, 10.0).is_empty());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_update_moves_point() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.0, 0.0, 0.0));
        grid.update(1, Point3::new(10.0, 10.0, 10.0));
        grid.insert(2, Point3::new(0.0, 0.0, 0.0));

        assert!(grid.neighbors_of(&2, 1.0).is_empty());
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.position_of(&1), Some(Point3::new(10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_remove() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1u32, Point3::new(0.2, 0.2, 0.2));
        assert_eq!(grid.remove(&1), Some(Point3::new(0.2, 0.2, 0.2)));
        assert_eq!(grid.remove(&1), None);
        assert!(grid.nearby(&Point3::new(0.2, 0.2, 0.2)).is_empty());
    }
}
