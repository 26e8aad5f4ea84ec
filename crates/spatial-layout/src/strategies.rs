//! Deterministic placement strategies: radial, grid and hierarchical.
//!
//! These run in a single pass with no simulation. Each returns one position
//! per distinct id, in the order ids were first seen.

use std::collections::HashSet;
use std::f32::consts::TAU;

use indexmap::IndexMap;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EntityId, Position, PositionMap};

/// Ring placement around a center point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialOptions {
    pub radius: f32,
    pub center: Position,
    /// Lifts the whole ring by `radius * tan(elevation_angle)`.
    pub elevation_angle: f32,
}

impl Default for RadialOptions {
    fn default() -> Self {
        Self {
            radius: 2.0,
            center: Point3::new(0.0, 0.0, -1.5),
            elevation_angle: -0.26,
        }
    }
}

/// Row-major wall of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Entities per row. Must be non-zero.
    pub columns: usize,
    pub spacing: f32,
    /// Position of the first entity; rows stack downward from here.
    pub start: Position,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            columns: 5,
            spacing: 0.5,
            start: Point3::new(-1.0, 0.0, -2.0),
        }
    }
}

/// Level-by-level tree placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyOptions {
    /// Vertical drop between levels.
    pub level_spacing: f32,
    /// Horizontal gap between siblings on one level.
    pub node_spacing: f32,
    /// Where the root level is centered.
    pub start: Position,
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self {
            level_spacing: 0.8,
            node_spacing: 0.4,
            start: Point3::new(0.0, 1.0, -2.0),
        }
    }
}

/// Spread `ids` evenly on a horizontal circle.
///
/// Entity `i` of `n` sits at angle `i * 2π / n`, measured from +x toward +z.
///
/// The ring is centered on all three coordinates of `center`, so x is offset
/// by `center.x` as well. Layouts that shift only y and z agree with this one
/// only when `center.x == 0`.
///
/// ```rust
/// use spatial_layout::{radial_layout, RadialOptions};
///
/// let positions = radial_layout(&["a", "b", "c"], &RadialOptions::default());
/// assert_eq!(positions.len(), 3);
/// ```
pub fn radial_layout<K: EntityId>(ids: &[K], options: &RadialOptions) -> PositionMap<K> {
    let ids = distinct(ids);
    if ids.is_empty() {
        return PositionMap::new();
    }

    let step = TAU / ids.len() as f32;
    let RadialOptions {
        radius,
        center,
        elevation_angle,
    } = *options;
    let lift = radius * elevation_angle.tan();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = i as f32 * step;
            let position = Point3::new(
                center.x + radius * angle.cos(),
                center.y + lift,
                center.z + radius * angle.sin(),
            );
            (id, position)
        })
        .collect()
}

/// Place `ids` on a grid, `columns` per row, each row `spacing` below the last.
///
/// # Panics
///
/// Panics if `options.columns` is zero.
pub fn grid_layout<K: EntityId>(ids: &[K], options: &GridOptions) -> PositionMap<K> {
    assert!(options.columns > 0, "grid layout needs at least one column");

    let GridOptions {
        columns,
        spacing,
        start,
    } = *options;

    distinct(ids)
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let row = (i / columns) as f32;
            let col = (i % columns) as f32;
            let position = Point3::new(start.x + col * spacing, start.y - row * spacing, start.z);
            (id, position)
        })
        .collect()
}

/// Lay out a parent → children map as a top-down tree.
///
/// Roots are the keys that never appear as anybody's child. Levels are found
/// breadth-first; each level is a row centered on `start.x`, `level_spacing`
/// below the previous one. A node reachable along several paths is placed once,
/// at its shallowest level, so cycles terminate. Within a level, nodes keep the
/// order in which the traversal discovered them.
///
/// Nodes that only sit on cycles have no root above them and are not placed.
pub fn hierarchical_layout<K: EntityId>(
    tree: &IndexMap<K, Vec<K>>,
    options: &HierarchyOptions,
) -> PositionMap<K> {
    let children: HashSet<&K> = tree.values().flatten().collect();
    let mut level: Vec<&K> = tree.keys().filter(|id| !children.contains(id)).collect();

    let mut seen: HashSet<&K> = level.iter().copied().collect();
    let mut positions = PositionMap::with_capacity(tree.len());
    let mut depth = 0usize;

    while !level.is_empty() {
        let width = (level.len() - 1) as f32 * options.node_spacing;
        let left = options.start.x - width / 2.0;
        let y = options.start.y - depth as f32 * options.level_spacing;

        for (i, id) in level.iter().enumerate() {
            let x = left + i as f32 * options.node_spacing;
            positions.insert((*id).clone(), Point3::new(x, y, options.start.z));
        }

        let mut next = Vec::new();
        for id in &level {
            for child in tree.get(*id).into_iter().flatten() {
                if seen.insert(child) {
                    next.push(child);
                }
            }
        }
        level = next;
        depth += 1;
    }

    if positions.len() < tree.len() {
        debug!(
            placed = positions.len(),
            keys = tree.len(),
            "hierarchical_layout_unreachable_nodes"
        );
    }
    positions
}

/// First occurrence of each id, in input order.
fn distinct<K: EntityId>(ids: &[K]) -> Vec<K> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_radial_four_entities() {
        let options = RadialOptions {
            radius: 2.0,
            center: Point3::new(0.0, 0.0, -1.5),
            elevation_angle: 0.0,
        };
        let positions = radial_layout(&['a', 'b', 'c', 'd'], &options);

        assert_relative_eq!(positions[&'a'], Point3::new(2.0, 0.0, -1.5), epsilon = 1e-5);
        assert_relative_eq!(positions[&'b'], Point3::new(0.0, 0.0, 0.5), epsilon = 1e-5);
        assert_relative_eq!(positions[&'c'], Point3::new(-2.0, 0.0, -1.5), epsilon = 1e-5);
        assert_relative_eq!(positions[&'d'], Point3::new(0.0, 0.0, -3.5), epsilon = 1e-5);
    }

    #[test]
    fn test_radial_elevation_lifts_ring() {
        let options = RadialOptions::default();
        let positions = radial_layout(&[1u32, 2, 3], &options);
        let expected_y = options.center.y + options.radius * options.elevation_angle.tan();
        for position in positions.values() {
            assert_relative_eq!(position.y, expected_y, epsilon = 1e-6);
        }
        assert!(expected_y < 0.0);
    }

    #[test]
    fn test_radial_empty_and_duplicates() {
        assert!(radial_layout::<u32>(&[], &RadialOptions::default()).is_empty());

        let positions = radial_layout(&[7u32, 7, 8], &RadialOptions::default());
        assert_eq!(positions.keys().copied().collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn test_grid_rows_and_columns() {
        let options = GridOptions {
            columns: 2,
            spacing: 1.0,
            start: Point3::origin(),
        };
        let positions = grid_layout(&[0u32, 1, 2, 3, 4], &options);

        // With unit spacing from the origin, x is the column and -y the row.
        let rows: Vec<i32> = positions.values().map(|p| (-p.y).round() as i32).collect();
        let cols: Vec<i32> = positions.values().map(|p| p.x.round() as i32).collect();
        assert_eq!(rows, vec![0, 0, 1, 1, 2]);
        assert_eq!(cols, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_grid_defaults_anchor_at_start() {
        let options = GridOptions::default();
        let positions = grid_layout(&["x", "y"], &options);
        assert_eq!(positions["x"], options.start);
        assert_relative_eq!(positions["y"], Point3::new(-0.5, 0.0, -2.0));
    }

    #[test]
    #[should_panic(expected = "at least one column")]
    fn test_grid_zero_columns_panics() {
        let options = GridOptions {
            columns: 0,
            ..Default::default()
        };
        grid_layout(&[1u32], &options);
    }

    #[test]
    fn test_hierarchical_single_root() {
        let mut tree = IndexMap::new();
        tree.insert("root", Vec::new());

        let options = HierarchyOptions::default();
        let positions = hierarchical_layout(&tree, &options);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions["root"], options.start);
    }

    #[test]
    fn test_hierarchical_levels() {
        let mut tree = IndexMap::new();
        tree.insert("root", vec!["a", "b"]);
        tree.insert("a", vec!["c"]);

        let options = HierarchyOptions {
            level_spacing: 1.0,
            node_spacing: 2.0,
            start: Point3::new(0.0, 0.0, -2.0),
        };
        let positions = hierarchical_layout(&tree, &options);

        assert_eq!(positions.len(), 4);
        assert_relative_eq!(positions["root"], Point3::new(0.0, 0.0, -2.0));
        assert_relative_eq!(positions["a"], Point3::new(-1.0, -1.0, -2.0));
        assert_relative_eq!(positions["b"], Point3::new(1.0, -1.0, -2.0));
        assert_relative_eq!(positions["c"], Point3::new(0.0, -2.0, -2.0));
    }

    #[test]
    fn test_hierarchical_shared_child_placed_once() {
        let mut tree = IndexMap::new();
        tree.insert(1u32, vec![2, 3]);
        tree.insert(2, vec![4]);
        tree.insert(3, vec![4, 1]);
        tree.insert(4, vec![2]);
        tree.insert(10, vec![4]);

        let options = HierarchyOptions::default();
        let positions = hierarchical_layout(&tree, &options);

        // 10 is the only root; 1 is a child of 3 so it is not.
        assert_eq!(positions[&10u32], options.start);
        assert_relative_eq!(
            positions[&4u32].y,
            options.start.y - options.level_spacing,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            positions[&2u32].y,
            options.start.y - 2.0 * options.level_spacing,
            epsilon = 1e-6
        );
        // 1 and 3 hang off the 1 <-> 3 cycle with no path from a root.
        assert!(!positions.contains_key(&1u32));
        assert!(!positions.contains_key(&3u32));
    }

    #[test]
    fn test_options_from_partial_json() {
        let grid: GridOptions = serde_json::from_str(r#"{ "columns": 3 }"#).unwrap();
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.spacing, 0.5);

        let radial: RadialOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(radial, RadialOptions::default());
    }
}
