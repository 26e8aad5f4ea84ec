//! 3D spatial layout kernel.
//!
//! This crate computes positions for opaque entities so they can be placed in a
//! spatial scene. It owns no domain model: callers hand in identifiers, edges
//! and configuration, and get back a map from identifier to position.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Layout strategies                     │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────────┐  ┌─────────┐  │
//! │  │  Radial  │  │   Grid   │  │ Hierarchical │  │  Force  │  │
//! │  └──────────┘  └──────────┘  └──────────────┘  └────┬────┘  │
//! └──────────────────────────────────────────────────────┼──────┘
//!                                                        │
//!                         ┌──────────────────────────────┤
//!                         ▼                              ▼
//!                ┌─────────────────┐            ┌─────────────────┐
//!                │ Naive O(n²)     │            │ Octree          │
//!                │ pairwise        │            │ (Barnes-Hut)    │
//!                └─────────────────┘            └─────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collision resolver (spatial hash grid)  →  Bezier paths    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Performance
//!
//! - Naive repulsion: O(n²) per iteration, used below `barnes_hut_threshold`
//! - Barnes-Hut approximation: O(n log n) per iteration
//! - Collision resolution: O(n) average per iteration via the 27-cell stencil
//!
//! ## Example
//!
//! ```rust
//! use spatial_layout::{force_directed_layout, resolve_collisions, LayoutConfig};
//! use std::collections::HashMap;
//!
//! let nodes = ["a", "b", "c"];
//! let edges = [("a", "b"), ("b", "c")];
//! let mut positions = force_directed_layout(&nodes, &edges, &LayoutConfig::default());
//!
//! let radii: HashMap<_, _> = nodes.iter().map(|id| (*id, 0.2)).collect();
//! resolve_collisions(&mut positions, &radii, 10);
//! assert_eq!(positions.len(), 3);
//! ```

use std::hash::Hash;

use indexmap::IndexMap;
use nalgebra::{Point3, Vector3};

mod bezier;
mod collision;
mod config;
mod error;
mod force_directed;
mod interrupt;
pub mod octree;
pub mod spatial_hash;
mod strategies;

pub use bezier::{bezier_point, edge_paths, generate_path};
pub use collision::{check_collision, resolve_collisions, CollisionReport};
pub use config::LayoutConfig;
pub use error::LayoutError;
pub use force_directed::{force_directed_layout, ForceSimulation, LayoutOutcome, RepulsionMode};
pub use interrupt::{Interrupt, InterruptReason};
pub use octree::{Bounds, Octree};
pub use spatial_hash::SpatialHashGrid;
pub use strategies::{
    grid_layout, hierarchical_layout, radial_layout, GridOptions, HierarchyOptions, RadialOptions,
};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// A point in layout space.
pub type Position = Point3<f32>;

/// A force, velocity or offset in layout space.
pub type Displacement = Vector3<f32>;

/// Positions keyed by entity id, in input order.
pub type PositionMap<K> = IndexMap<K, Position>;

/// Anything usable as an entity identifier.
///
/// The engine never interprets ids; it only hashes and compares them.
pub trait EntityId: Clone + Eq + Hash {}

impl<T: Clone + Eq + Hash> EntityId for T {}

/// Distances below this are treated as coincident points.
pub(crate) const EPSILON_DISTANCE: f32 = 0.001;
