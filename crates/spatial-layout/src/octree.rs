//! Barnes-Hut octree for O(n log n) repulsion approximation.
//!
//! The octree recursively subdivides a cubic region into eight octants and
//! keeps the total mass and center of mass of every subtree. Distant subtrees
//! are approximated as a single point mass, reducing the O(n²) pairwise force
//! calculation to O(n log n).
//!
//! Nodes live in a flat arena and refer to their children by [`NodeIndex`],
//! so a tree is one allocation that is rebuilt from scratch every simulation
//! iteration and dropped afterwards.
//!
//! ```rust
//! use nalgebra::Point3;
//! use spatial_layout::Octree;
//!
//! let mut tree = Octree::new(Point3::origin(), 4.0);
//! tree.insert("a", Point3::new(1.0, 1.0, 1.0), 1.0);
//! tree.insert("b", Point3::new(-1.0, -1.0, -1.0), 1.0);
//!
//! let force = tree.calculate_force(Point3::new(3.0, 0.0, 0.0), 0.1, 0.5);
//! assert!(force.x > 0.0); // pushed away from the pair
//! ```

use nalgebra::{Point3, Vector3};

use crate::{Displacement, Position, EPSILON_DISTANCE};

/// Root margin applied on top of the tight bounding cube.
const ROOT_MARGIN: f32 = 1.5;

/// Smallest root half size built from positions.
const MIN_HALF_SIZE: f32 = 1.0;

/// Root half size used when there are no positions at all.
const EMPTY_HALF_SIZE: f32 = 5.0;

/// Largest root half size built from positions; keeps the margin finite.
const MAX_HALF_SIZE: f32 = 1.0e30;

/// Depth at which leaves stop subdividing and pool their bodies.
///
/// Coincident points would otherwise split forever.
pub const MAX_DEPTH: u16 = 24;

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Midpoint of the box.
    pub center: Position,
    /// Full extent along each axis.
    pub size: Vector3<f32>,
}

impl Bounds {
    /// Bounds of `points`. An empty set yields a zero box at the origin.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self {
                center: Point3::origin(),
                size: Vector3::zeros(),
            };
        };

        let (min, max) = points.fold((*first, *first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        });

        Self {
            center: nalgebra::center(&min, &max),
            size: max - min,
        }
    }

    /// Half the largest extent, i.e. the half size of the enclosing cube.
    pub fn half_extent(&self) -> f32 {
        self.size.max() / 2.0
    }
}

/// Index into the node arena.
///
/// `u32` keeps the eight child slots of a node compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// The root is always the first node in the arena.
    pub const ROOT: NodeIndex = NodeIndex(0);

    fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "NodeIndex overflow");
        NodeIndex(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A body stored in a leaf.
#[derive(Debug, Clone, Copy)]
struct Body<E> {
    entity: E,
    position: Position,
    mass: f32,
}

/// What a node holds directly (as opposed to through its children).
#[derive(Debug, Clone, Copy)]
enum Occupant<E> {
    /// Nothing stored here; either empty or an internal node.
    Vacant,
    /// Exactly one body.
    Single(Body<E>),
    /// Several bodies pooled at [`MAX_DEPTH`]; only the aggregate is kept.
    Crowded { count: u32 },
}

/// One cubic region of the octree.
#[derive(Debug, Clone)]
pub struct OctreeNode<E> {
    center: Position,
    half_size: f32,
    depth: u16,
    total_mass: f32,
    center_of_mass: Position,
    occupant: Occupant<E>,
    children: [Option<NodeIndex>; 8],
}

impl<E: Copy> OctreeNode<E> {
    fn new(center: Position, half_size: f32, depth: u16) -> Self {
        Self {
            center,
            half_size,
            depth,
            total_mass: 0.0,
            center_of_mass: Point3::origin(),
            occupant: Occupant::Vacant,
            children: [None; 8],
        }
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn half_size(&self) -> f32 {
        self.half_size
    }

    pub fn total_mass(&self) -> f32 {
        self.total_mass
    }

    pub fn center_of_mass(&self) -> Position {
        self.center_of_mass
    }

    pub fn children(&self) -> &[Option<NodeIndex>; 8] {
        &self.children
    }

    /// The entity held by an unsubdivided single-body leaf.
    pub fn entity(&self) -> Option<E> {
        match self.occupant {
            Occupant::Single(body) => Some(body.entity),
            _ => None,
        }
    }

    /// A node is a leaf iff it has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Octant of `position` relative to this node's center.
    ///
    /// Bit 0 is set for `x >= center.x`, bit 1 for y, bit 2 for z.
    pub fn octant_index(&self, position: &Position) -> usize {
        let mut index = 0;
        if position.x >= self.center.x {
            index |= 1;
        }
        if position.y >= self.center.y {
            index |= 2;
        }
        if position.z >= self.center.z {
            index |= 4;
        }
        index
    }

    fn child_center(&self, octant: usize) -> Position {
        let offset = self.half_size / 2.0;
        let signed = |bit: usize| if octant & bit != 0 { offset } else { -offset };
        Point3::new(
            self.center.x + signed(1),
            self.center.y + signed(2),
            self.center.z + signed(4),
        )
    }

    /// Fold a point mass into the running aggregates.
    fn absorb(&mut self, position: &Position, mass: f32) {
        let new_total = self.total_mass + mass;
        if new_total > 0.0 {
            self.center_of_mass = Point3::from(
                (self.center_of_mass.coords * self.total_mass + position.coords * mass)
                    / new_total,
            );
        }
        self.total_mass = new_total;
    }
}

/// Arena-based Barnes-Hut octree over entities of type `E`.
#[derive(Debug, Clone)]
pub struct Octree<E> {
    nodes: Vec<OctreeNode<E>>,
}

impl<E: Copy> Octree<E> {
    /// Create an empty tree over the cube `center ± half_size`.
    ///
    /// # Panics
    ///
    /// Panics if `half_size` is negative or not finite.
    pub fn new(center: Position, half_size: f32) -> Self {
        assert!(
            half_size.is_finite() && half_size >= 0.0,
            "octree half size must be finite and non-negative, got {half_size}"
        );
        Self {
            nodes: vec![OctreeNode::new(center, half_size, 0)],
        }
    }

    /// Create an empty tree whose root cube encloses `positions` with margin.
    ///
    /// Non-finite positions are left out of the bounds. If nothing finite is
    /// left, or the extent overflows, the root falls back to a finite cube.
    pub fn enclosing<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut finite = positions
            .into_iter()
            .filter(|p| p.coords.iter().all(|c| c.is_finite()))
            .peekable();
        if finite.peek().is_none() {
            return Self::new(Point3::origin(), EMPTY_HALF_SIZE);
        }

        let bounds = Bounds::from_points(finite);
        let center = if bounds.center.coords.iter().all(|c| c.is_finite()) {
            bounds.center
        } else {
            Point3::origin()
        };
        let half_size = bounds.half_extent();
        let half_size = if half_size.is_finite() {
            half_size.clamp(MIN_HALF_SIZE, MAX_HALF_SIZE)
        } else {
            MAX_HALF_SIZE
        };
        Self::new(center, half_size * ROOT_MARGIN)
    }

    /// Number of allocated nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &OctreeNode<E> {
        &self.nodes[NodeIndex::ROOT.index()]
    }

    pub fn node(&self, index: NodeIndex) -> &OctreeNode<E> {
        &self.nodes[index.index()]
    }

    pub fn total_mass(&self) -> f32 {
        self.root().total_mass
    }

    pub fn center_of_mass(&self) -> Position {
        self.root().center_of_mass
    }

    /// Insert one point mass.
    ///
    /// Aggregates are updated on every node along the path before any
    /// subdivision happens. A leaf that already holds a body is split: the
    /// held body moves into its octant child, then the new body follows.
    pub fn insert(&mut self, entity: E, position: Position, mass: f32) {
        self.insert_at(
            NodeIndex::ROOT,
            Body {
                entity,
                position,
                mass,
            },
        );
    }

    fn insert_at(&mut self, index: NodeIndex, body: Body<E>) {
        let node = &mut self.nodes[index.index()];
        node.absorb(&body.position, body.mass);

        if node.is_leaf() {
            let occupant = node.occupant;
            match occupant {
                Occupant::Vacant => {
                    node.occupant = Occupant::Single(body);
                    return;
                }
                Occupant::Crowded { count } => {
                    node.occupant = Occupant::Crowded { count: count + 1 };
                    return;
                }
                Occupant::Single(_) if node.depth >= MAX_DEPTH => {
                    node.occupant = Occupant::Crowded { count: 2 };
                    return;
                }
                Occupant::Single(existing) => {
                    node.occupant = Occupant::Vacant;
                    self.insert_into_child(index, existing);
                }
            }
        }

        self.insert_into_child(index, body);
    }

    fn insert_into_child(&mut self, index: NodeIndex, body: Body<E>) {
        let node = &self.nodes[index.index()];
        let octant = node.octant_index(&body.position);
        let existing = node.children[octant];

        let child = match existing {
            Some(child) => child,
            None => {
                let child_node =
                    OctreeNode::new(node.child_center(octant), node.half_size / 2.0, node.depth + 1);
                let child = NodeIndex::new(self.nodes.len());
                self.nodes.push(child_node);
                self.nodes[index.index()].children[octant] = Some(child);
                child
            }
        };

        self.insert_at(child, body);
    }

    /// Net repulsive force on `position` from every mass in the tree.
    ///
    /// A node is used as a single pseudo-body when it is a leaf or when its
    /// size-to-distance ratio `(2 * half_size) / distance` is below `theta`;
    /// otherwise its children are summed. Magnitude is
    /// `repulsion_strength * mass / distance²`, directed away from the mass.
    /// Pseudo-bodies closer than 0.001 contribute nothing.
    pub fn calculate_force(
        &self,
        position: Position,
        repulsion_strength: f32,
        theta: f32,
    ) -> Displacement {
        self.force_from(NodeIndex::ROOT, &position, repulsion_strength, theta)
    }

    fn force_from(
        &self,
        index: NodeIndex,
        position: &Position,
        repulsion_strength: f32,
        theta: f32,
    ) -> Displacement {
        let node = &self.nodes[index.index()];
        if node.total_mass <= 0.0 {
            return Vector3::zeros();
        }

        let delta = node.center_of_mass - *position;
        let distance = delta.norm();

        // Barnes-Hut criterion: s/d < θ
        if node.is_leaf() || (node.half_size * 2.0) / distance < theta {
            if distance.is_nan() || distance <= EPSILON_DISTANCE {
                return Vector3::zeros();
            }
            let magnitude = repulsion_strength * node.total_mass / (distance * distance);
            return delta * (-magnitude / distance);
        }

        node.children
            .iter()
            .flatten()
            .map(|&child| self.force_from(child, position, repulsion_strength, theta))
            .fold(Vector3::zeros(), |a, b| a + b)
    }
}
