//! Sphere overlap removal.
//!
//! Each pass rebuilds a [`SpatialHashGrid`] from the current positions and
//! pushes every overlapping pair apart by half the overlap each. This is a
//! relaxation: dense clusters may still overlap when the iteration budget runs
//! out.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::spatial_hash::SpatialHashGrid;
use crate::{EntityId, Position, PositionMap, EPSILON_DISTANCE};

/// Radius assumed for cell sizing when no radii are given.
const DEFAULT_MAX_RADIUS: f32 = 0.5;

/// Cell size as a multiple of the largest radius.
const CELL_SIZE_FACTOR: f32 = 2.5;

/// Summary of a [`resolve_collisions`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Passes actually run. Stops early once a pass moves nothing.
    pub iterations: usize,
    /// Push-apart operations over all passes.
    pub separated_pairs: usize,
}

/// Whether two spheres overlap. Touching spheres do not.
pub fn check_collision(p1: &Position, r1: f32, p2: &Position, r2: f32) -> bool {
    (*p1 - *p2).norm() < r1 + r2
}

/// Push overlapping entities apart in place.
///
/// Entities without an entry in `radii` neither move nor block others. Each
/// unordered pair is handled once per pass, against positions as already
/// updated earlier in the same pass. Pairs closer than 0.001 have no usable
/// direction and are left alone.
pub fn resolve_collisions<K: EntityId>(
    positions: &mut PositionMap<K>,
    radii: &HashMap<K, f32>,
    iterations: usize,
) -> CollisionReport {
    let mut report = CollisionReport::default();
    if positions.is_empty() {
        return report;
    }

    let max_radius = radii
        .values()
        .copied()
        .reduce(f32::max)
        .unwrap_or(DEFAULT_MAX_RADIUS);
    let mut grid = SpatialHashGrid::new(max_radius * CELL_SIZE_FACTOR);

    let mut points: Vec<Position> = positions.values().copied().collect();
    let entity_radii: Vec<Option<f32>> = positions.keys().map(|id| radii.get(id).copied()).collect();

    let mut candidates = Vec::new();
    while report.iterations < iterations {
        grid.clear();
        for (i, point) in points.iter().enumerate() {
            grid.insert(i, *point);
        }

        let mut separated = 0;
        for i in 0..points.len() {
            let Some(r1) = entity_radii[i] else {
                continue;
            };

            candidates.clear();
            candidates.extend(
                grid.nearby(&points[i])
                    .into_iter()
                    .filter(|&(j, _)| j > i)
                    .filter_map(|(j, _)| Some((j, entity_radii[j]?))),
            );
            // Bucket order depends on the hash; index order keeps passes deterministic.
            candidates.sort_unstable_by_key(|&(j, _)| j);

            for &(j, r2) in &candidates {
                if push_apart(&mut points, i, r1, j, r2) {
                    separated += 1;
                }
            }
        }

        report.iterations += 1;
        report.separated_pairs += separated;
        trace!(
            iteration = report.iterations,
            separated,
            "collision_pass"
        );
        if separated == 0 {
            break;
        }
    }

    for (slot, point) in positions.values_mut().zip(points) {
        *slot = point;
    }

    debug!(
        entities = positions.len(),
        iterations = report.iterations,
        separated_pairs = report.separated_pairs,
        cell_size = grid.cell_size(),
        "collision_resolution_complete"
    );
    report
}

/// Move `i` and `j` apart if they overlap. Returns whether anything moved.
fn push_apart(points: &mut [Position], i: usize, r1: f32, j: usize, r2: f32) -> bool {
    let delta = points[i] - points[j];
    let distance = delta.norm();
    let reach = r1 + r2;
    if distance >= reach || distance <= EPSILON_DISTANCE || distance.is_nan() {
        return false;
    }

    let shift = delta * ((reach - distance) * 0.5 / distance);
    points[i] += shift;
    points[j] -= shift;
    true
}
