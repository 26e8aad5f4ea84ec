//! Force-directed layout configuration.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{LayoutError, Position, Result};

/// Configuration for the force-directed layout.
///
/// Every field has a default, so callers only override what they need:
///
/// ```rust
/// use spatial_layout::LayoutConfig;
///
/// let config = LayoutConfig {
///     iterations: 250,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of simulation steps.
    pub iterations: usize,
    /// Radius of the circle the simulation starts from.
    pub initial_radius: f32,
    /// Repulsion strength (inverse-square).
    pub repulsion_strength: f32,
    /// Spring strength along edges.
    pub attraction_strength: f32,
    /// Velocity decay per step (0-1).
    pub damping: f32,
    /// Interaction cutoff for naive repulsion is `5 * min_distance`.
    pub min_distance: f32,
    /// Barnes-Hut accuracy. Lower is more accurate and slower.
    pub theta: f32,
    /// Use Barnes-Hut (true) or always the O(n²) path (false).
    pub use_barnes_hut: bool,
    /// Node count at which Barnes-Hut kicks in.
    pub barnes_hut_threshold: usize,
    /// Pull toward `origin`. Zero disables it.
    pub centering_strength: f32,
    /// Center of the initial circle and target of the centering pull.
    pub origin: Position,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            initial_radius: 2.0,
            repulsion_strength: 0.1,
            attraction_strength: 0.01,
            damping: 0.9,
            min_distance: 0.1,
            theta: 0.5,
            use_barnes_hut: true,
            barnes_hut_threshold: 50,
            centering_strength: 0.0,
            origin: Point3::new(0.0, 0.0, -2.0),
        }
    }
}

impl LayoutConfig {
    /// Coarser approximation for large graphs.
    pub fn high_performance() -> Self {
        Self {
            iterations: 60,
            theta: 0.7,
            barnes_hut_threshold: 50,
            ..Default::default()
        }
    }

    /// Tighter approximation and a longer run.
    pub fn precise() -> Self {
        Self {
            iterations: 300,
            theta: 0.3,
            ..Default::default()
        }
    }

    /// Check that every numeric field is usable.
    ///
    /// The kernel itself only guards its internal math; this is for callers
    /// that load configuration from outside.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("initial_radius", self.initial_radius),
            ("repulsion_strength", self.repulsion_strength),
            ("attraction_strength", self.attraction_strength),
            ("min_distance", self.min_distance),
            ("centering_strength", self.centering_strength),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::invalid(
                    field,
                    format!("{value} (must be finite and >= 0)"),
                ));
            }
        }

        if !self.damping.is_finite() || !(0.0..=1.0).contains(&self.damping) {
            return Err(LayoutError::invalid(
                "damping",
                format!("{} (must be within 0..=1)", self.damping),
            ));
        }

        if !self.theta.is_finite() || self.theta <= 0.0 {
            return Err(LayoutError::invalid(
                "theta",
                format!("{} (must be finite and > 0)", self.theta),
            ));
        }

        if !self.origin.coords.iter().all(|c| c.is_finite()) {
            return Err(LayoutError::invalid("origin", "coordinates must be finite"));
        }

        Ok(())
    }
}
