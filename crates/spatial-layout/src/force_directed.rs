//! Force-directed layout.
//!
//! Entities repel each other like charged particles and edges pull their
//! endpoints together like springs. Repulsion is computed either pairwise
//! (O(n²)) or through a Barnes-Hut [`Octree`] (O(n log n)); the choice is made
//! once per run by [`RepulsionMode::select`].
//!
//! Internally every entity gets a stable index at construction time, and
//! positions, velocities and forces are parallel vectors over that index.

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::octree::Octree;
use crate::{
    Displacement, EntityId, Interrupt, InterruptReason, LayoutConfig, LayoutError, Position,
    PositionMap, Result, EPSILON_DISTANCE,
};

/// Floor applied to pair distances in naive repulsion.
const NAIVE_MIN_DISTANCE: f32 = 0.01;

/// Naive repulsion ignores pairs further apart than this many `min_distance`s.
const NAIVE_CUTOFF_FACTOR: f32 = 5.0;

/// How repulsion forces are computed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepulsionMode {
    /// Every pair, with a short-range cutoff.
    Naive,
    /// Octree approximation controlled by `theta`.
    BarnesHut,
}

impl RepulsionMode {
    /// Barnes-Hut iff it is enabled and `node_count` reaches the threshold.
    pub fn select(config: &LayoutConfig, node_count: usize) -> Self {
        if config.use_barnes_hut && node_count >= config.barnes_hut_threshold {
            RepulsionMode::BarnesHut
        } else {
            RepulsionMode::Naive
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct LayoutOutcome<K> {
    /// Final positions, one per distinct input id, in input order.
    pub positions: PositionMap<K>,
    /// Repulsion strategy that was used.
    pub mode: RepulsionMode,
    /// Iterations actually executed.
    pub iterations: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Stepwise force-directed simulation over one set of entities.
///
/// ```rust
/// use spatial_layout::{ForceSimulation, Interrupt, LayoutConfig, RepulsionMode};
///
/// let nodes: Vec<u32> = (0..10).collect();
/// let edges = vec![(0, 1), (1, 2)];
/// let simulation = ForceSimulation::new(&nodes, &edges, LayoutConfig::default());
/// assert_eq!(simulation.mode(), RepulsionMode::Naive);
///
/// let outcome = simulation.run(&Interrupt::none()).unwrap();
/// assert_eq!(outcome.positions.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ForceSimulation<K> {
    ids: Vec<K>,
    index: HashMap<K, usize>,
    edges: Vec<(usize, usize)>,
    positions: Vec<Position>,
    velocities: Vec<Displacement>,
    forces: Vec<Displacement>,
    config: LayoutConfig,
    mode: RepulsionMode,
    iteration: usize,
}

impl<K: EntityId> ForceSimulation<K> {
    /// Set up a simulation, picking the repulsion mode from the node count.
    ///
    /// Duplicate ids are kept once; edges naming unknown ids are dropped.
    pub fn new(nodes: &[K], edges: &[(K, K)], config: LayoutConfig) -> Self {
        let mut simulation = Self::with_mode(nodes, edges, config, RepulsionMode::Naive);
        simulation.mode = RepulsionMode::select(&simulation.config, simulation.ids.len());
        simulation
    }

    /// Set up a simulation with an explicit repulsion mode.
    pub fn with_mode(
        nodes: &[K],
        edges: &[(K, K)],
        config: LayoutConfig,
        mode: RepulsionMode,
    ) -> Self {
        let mut ids = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for id in nodes {
            if !index.contains_key(id) {
                index.insert(id.clone(), ids.len());
                ids.push(id.clone());
            }
        }

        let resolved: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|(source, target)| Some((*index.get(source)?, *index.get(target)?)))
            .collect();
        if resolved.len() < edges.len() {
            debug!(
                skipped = edges.len() - resolved.len(),
                "force_layout_unknown_edges_skipped"
            );
        }

        let count = ids.len();
        let positions = (0..count)
            .map(|i| {
                let angle = (i as f32 / count as f32) * TAU;
                config.origin
                    + Vector3::new(
                        config.initial_radius * angle.cos(),
                        0.0,
                        config.initial_radius * angle.sin(),
                    )
            })
            .collect();

        Self {
            ids,
            index,
            edges: resolved,
            positions,
            velocities: vec![Vector3::zeros(); count],
            forces: vec![Vector3::zeros(); count],
            config,
            mode,
            iteration: 0,
        }
    }

    pub fn mode(&self) -> RepulsionMode {
        self.mode
    }

    /// Iterations executed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Current position of `id`.
    pub fn position(&self, id: &K) -> Option<Position> {
        self.index.get(id).map(|&i| self.positions[i])
    }

    /// Snapshot of all current positions.
    pub fn positions(&self) -> PositionMap<K> {
        self.ids
            .iter()
            .cloned()
            .zip(self.positions.iter().copied())
            .collect()
    }

    pub fn into_positions(self) -> PositionMap<K> {
        self.ids.into_iter().zip(self.positions).collect()
    }

    /// Advance the simulation by one iteration.
    ///
    /// All forces are computed from the positions at the start of the step
    /// before any position moves.
    pub fn step(&mut self) {
        let repulsion = self.repulsion();
        for (force, push) in self.forces.iter_mut().zip(repulsion) {
            *force = push;
        }

        self.apply_attraction();
        self.apply_centering();

        let damping = self.config.damping;
        for ((position, velocity), force) in self
            .positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .zip(self.forces.iter())
        {
            *velocity = (*velocity + force) * damping;
            *position += *velocity;
        }

        self.iteration += 1;
        trace!(iteration = self.iteration, "force_layout_iteration");
    }

    /// Run the remaining iterations, checking `interrupt` before each one.
    pub fn run(mut self, interrupt: &Interrupt) -> Result<LayoutOutcome<K>> {
        let started = Instant::now();
        if let Some(reason) = self.drive(|| interrupt.check()) {
            warn!(
                iteration = self.iteration,
                reason = ?reason,
                "force_layout_interrupted"
            );
            return Err(match reason {
                InterruptReason::Cancelled => LayoutError::Cancelled {
                    iteration: self.iteration,
                },
                InterruptReason::DeadlineExceeded => LayoutError::DeadlineExceeded {
                    iteration: self.iteration,
                },
            });
        }
        Ok(self.finish(started))
    }

    /// Run the remaining iterations without any interrupt.
    pub fn run_to_completion(mut self) -> LayoutOutcome<K> {
        let started = Instant::now();
        self.drive(|| None);
        self.finish(started)
    }

    fn drive(
        &mut self,
        mut should_stop: impl FnMut() -> Option<InterruptReason>,
    ) -> Option<InterruptReason> {
        debug!(
            nodes = self.ids.len(),
            edges = self.edges.len(),
            mode = ?self.mode,
            iterations = self.config.iterations,
            "force_layout_start"
        );
        while self.iteration < self.config.iterations {
            if let Some(reason) = should_stop() {
                return Some(reason);
            }
            self.step();
        }
        None
    }

    fn finish(self, started: Instant) -> LayoutOutcome<K> {
        let elapsed = started.elapsed();
        debug!(
            iterations = self.iteration,
            elapsed_ms = elapsed.as_millis() as u64,
            "force_layout_complete"
        );
        LayoutOutcome {
            mode: self.mode,
            iterations: self.iteration,
            elapsed,
            positions: self.into_positions(),
        }
    }

    fn repulsion(&self) -> Vec<Displacement> {
        let positions = &self.positions;
        let strength = self.config.repulsion_strength;

        match self.mode {
            RepulsionMode::BarnesHut => {
                let mut tree = Octree::enclosing(positions);
                for (i, position) in positions.iter().enumerate() {
                    tree.insert(i, *position, 1.0);
                }
                let theta = self.config.theta;
                per_entity(positions.len(), |i| {
                    tree.calculate_force(positions[i], strength, theta)
                })
            }
            RepulsionMode::Naive => {
                let cutoff = self.config.min_distance * NAIVE_CUTOFF_FACTOR;
                per_entity(positions.len(), |i| {
                    naive_repulsion(positions, i, strength, cutoff)
                })
            }
        }
    }

    fn apply_attraction(&mut self) {
        let strength = self.config.attraction_strength;
        for &(source, target) in &self.edges {
            let delta = self.positions[target] - self.positions[source];
            let distance = delta.norm();
            if distance.is_nan() || distance <= EPSILON_DISTANCE {
                continue;
            }
            // Spring pull grows with length: |f| = strength * d².
            let force = delta * (strength * distance);
            self.forces[source] += force;
            self.forces[target] -= force;
        }
    }

    fn apply_centering(&mut self) {
        let strength = self.config.centering_strength;
        if strength <= 0.0 {
            return;
        }
        let origin = self.config.origin;
        for (force, position) in self.forces.iter_mut().zip(&self.positions) {
            *force += (origin - *position) * strength;
        }
    }
}

/// Lay out `nodes` with the force-directed algorithm.
///
/// Returns one position per distinct id. Never fails: empty input gives an
/// empty map and edges with unknown ids are ignored.
pub fn force_directed_layout<K: EntityId>(
    nodes: &[K],
    edges: &[(K, K)],
    config: &LayoutConfig,
) -> PositionMap<K> {
    ForceSimulation::new(nodes, edges, config.clone())
        .run_to_completion()
        .positions
}

/// Sum of pairwise repulsion on entity `i`, ignoring pairs beyond `cutoff`.
fn naive_repulsion(positions: &[Position], i: usize, strength: f32, cutoff: f32) -> Displacement {
    let here = positions[i];
    positions
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .fold(Vector3::zeros(), |acc, (_, other)| {
            let delta = here - *other;
            let raw = delta.norm();
            if raw.is_nan() || raw <= EPSILON_DISTANCE {
                return acc;
            }
            let distance = raw.max(NAIVE_MIN_DISTANCE);
            if distance >= cutoff {
                return acc;
            }
            acc + delta * (strength / (distance * distance * raw))
        })
}

#[cfg(feature = "parallel")]
fn per_entity<F>(count: usize, force_on: F) -> Vec<Displacement>
where
    F: Fn(usize) -> Displacement + Sync + Send,
{
    (0..count).into_par_iter().map(force_on).collect()
}

#[cfg(not(feature = "parallel"))]
fn per_entity<F>(count: usize, force_on: F) -> Vec<Displacement>
where
    F: Fn(usize) -> Displacement,
{
    (0..count).map(force_on).collect()
}
