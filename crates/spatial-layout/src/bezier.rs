//! Arced connector paths between laid-out entities.

use tracing::debug;

use crate::{EntityId, Position, PositionMap};

/// Point on the cubic Bezier curve `p0 → p3` with controls `p1`, `p2`.
///
/// Returns `p0` exactly at `t = 0` and `p3` exactly at `t = 1`.
pub fn bezier_point(t: f32, p0: &Position, p1: &Position, p2: &Position, p3: &Position) -> Position {
    let u = 1.0 - t;
    let (u2, t2) = (u * u, t * t);

    let coords = p0.coords * (u2 * u)
        + p1.coords * (3.0 * u2 * t)
        + p2.coords * (3.0 * u * t2)
        + p3.coords * (t2 * t);
    Position::from(coords)
}

/// Sample `steps + 1` points along an arc from `from` to `to`.
///
/// Both control points sit `arc_height` above their endpoint, so the curve
/// bulges upward (downward for a negative height). With `steps == 0` the path
/// is just `[from]`.
pub fn generate_path(from: &Position, to: &Position, arc_height: f32, steps: usize) -> Vec<Position> {
    if steps == 0 {
        return vec![*from];
    }

    let mut lift = *from;
    lift.y += arc_height;
    let mut land = *to;
    land.y += arc_height;

    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            bezier_point(t, from, &lift, &land, to)
        })
        .collect()
}

/// One path per edge whose endpoints both have a position.
///
/// Paths come back in edge order; edges with an unplaced endpoint are skipped.
pub fn edge_paths<K: EntityId>(
    positions: &PositionMap<K>,
    edges: &[(K, K)],
    arc_height: f32,
    steps: usize,
) -> Vec<((K, K), Vec<Position>)> {
    let paths: Vec<_> = edges
        .iter()
        .filter_map(|(source, target)| {
            let from = positions.get(source)?;
            let to = positions.get(target)?;
            let path = generate_path(from, to, arc_height, steps);
            Some(((source.clone(), target.clone()), path))
        })
        .collect();

    if paths.len() < edges.len() {
        debug!(
            skipped = edges.len() - paths.len(),
            "edge_paths_unplaced_endpoints"
        );
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_bezier_endpoints_exact() {
        let p0 = Point3::new(0.3, -1.7, 2.2);
        let p1 = Point3::new(5.0, 5.0, 5.0);
        let p2 = Point3::new(-4.0, 9.0, 1.0);
        let p3 = Point3::new(1.1, 0.4, -3.9);

        assert_eq!(bezier_point(0.0, &p0, &p1, &p2, &p3), p0);
        assert_eq!(bezier_point(1.0, &p0, &p1, &p2, &p3), p3);
    }

    #[test]
    fn test_bezier_straight_line_midpoint() {
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p3 = Point3::new(3.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(2.0, 0.0, 0.0);
        assert_relative_eq!(
            bezier_point(0.5, &p0, &p1, &p2, &p3),
            Point3::new(1.5, 0.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_generate_path_shape() {
        let from = Point3::new(0.0, 0.0, -2.0);
        let to = Point3::new(2.0, 0.0, -2.0);
        let path = generate_path(&from, &to, 0.5, 20);

        assert_eq!(path.len(), 21);
        assert_eq!(path[0], from);
        assert_eq!(path[20], to);
        // Both controls are raised by 0.5, so the midpoint peaks at 0.75 * 0.5.
        assert_relative_eq!(path[10].y, 0.375, epsilon = 1e-5);
        assert_relative_eq!(path[10].x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_generate_path_zero_steps() {
        let from = Point3::new(1.0, 2.0, 3.0);
        let path = generate_path(&from, &Point3::origin(), 0.5, 0);
        assert_eq!(path, vec![from]);
    }

    #[test]
    fn test_edge_paths_skip_unplaced() {
        let mut positions = PositionMap::new();
        positions.insert("a", Point3::new(0.0, 0.0, 0.0));
        positions.insert("b", Point3::new(1.0, 0.0, 0.0));

        let edges = [("a", "b"), ("a", "ghost"), ("b", "a")];
        let paths = edge_paths(&positions, &edges, 0.2, 4);

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].0, ("a", "b"));
        assert_eq!(paths[0].1.len(), 5);
        assert_eq!(paths[1].1[0], positions["b"]);
        assert_eq!(paths[1].1[4], positions["a"]);
    }
}
