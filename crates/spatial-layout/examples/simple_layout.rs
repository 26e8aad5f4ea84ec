//! Lay out a random graph with Barnes-Hut, then clear overlaps and build paths.
//!
//! Run with: cargo run --example simple_layout --features parallel
//! Set RUST_LOG=spatial_layout=trace to see every iteration.

use std::collections::HashMap;
use std::time::Instant;

use spatial_layout::{edge_paths, resolve_collisions, ForceSimulation, LayoutConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spatial_layout=debug")),
        )
        .with_target(false)
        .init();

    let node_count = 1000u32;
    let edge_count = 2000u32;

    println!("Creating random graph with {node_count} nodes and {edge_count} edges...");

    let nodes: Vec<u32> = (0..node_count).collect();
    // A path keeps the graph connected; the rest are scattered chords.
    let mut edges: Vec<(u32, u32)> = (1..node_count).map(|i| (i - 1, i)).collect();
    for i in 0..(edge_count - node_count + 1) {
        let source = (i * 17) % node_count;
        let target = (i * 31 + 7) % node_count;
        if source != target {
            edges.push((source, target));
        }
    }

    let config = LayoutConfig {
        initial_radius: 20.0,
        repulsion_strength: 0.02,
        ..LayoutConfig::high_performance()
    };
    let iterations = config.iterations;
    let mut simulation = ForceSimulation::new(&nodes, &edges, config);
    println!("Repulsion mode: {:?}", simulation.mode());

    let start = Instant::now();
    for i in 0..iterations {
        simulation.step();

        if i % 10 == 0 {
            let positions = simulation.positions();
            let (min, max) = positions.values().fold(
                ([f32::MAX; 3], [f32::MIN; 3]),
                |(mut min, mut max), p| {
                    for axis in 0..3 {
                        min[axis] = min[axis].min(p[axis]);
                        max[axis] = max[axis].max(p[axis]);
                    }
                    (min, max)
                },
            );
            println!(
                "Iteration {i}: bounds = ({:.1}, {:.1}, {:.1}) to ({:.1}, {:.1}, {:.1})",
                min[0], min[1], min[2], max[0], max[1], max[2]
            );
        }
    }

    let elapsed = start.elapsed();
    let rate = iterations as f64 / elapsed.as_secs_f64();
    println!("\nCompleted {iterations} iterations in {elapsed:.2?}");
    println!("Average: {rate:.1} iterations/sec ({:.2} ms/iteration)", 1000.0 / rate);

    let mut positions = simulation.into_positions();
    let radii: HashMap<u32, f32> = nodes.iter().map(|id| (*id, 0.1)).collect();
    let report = resolve_collisions(&mut positions, &radii, 10);
    println!(
        "Collision pass: {} pairs separated over {} iterations",
        report.separated_pairs, report.iterations
    );

    let paths = edge_paths(&positions, &edges, 0.5, 20);
    println!("Built {} edge paths", paths.len());

    println!("\nFinal positions (first 5 nodes):");
    for (id, p) in positions.iter().take(5) {
        println!("  Node {id}: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
    }
}
