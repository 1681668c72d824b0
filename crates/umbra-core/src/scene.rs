//! Scene description records and the validated scene graph
//!
//! Input arrives as a flat list of [`PrimitiveRecord`]s. Each record may
//! point at the next node of its chain (`sibling`) and at the head of its
//! own children chain (`children`). The [`crate::builder`] turns that list
//! into a [`SceneGraph`]: an arena of [`SceneNode`]s that is read-only for
//! the rest of the render.

use crate::material::Material;
use crate::operations::{self, BlendType, Transform};
use crate::params::ShapeKind;
use crate::shape::Shape;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Input Records
// ============================================================================

/// Placement of a primitive in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRecord {
    pub translate: Vec3,
    /// XYZ Euler angles in radians
    pub rotate: Vec3,
    pub scale: f32,
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            rotate: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

/// Domain repetition applied to the query point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Repetition {
    #[default]
    None,
    /// `extent` copies on each side of the original along each axis
    Finite { extent: Vec3, spacing: Vec3 },
    Infinite { spacing: Vec3 },
}

impl Repetition {
    pub fn apply(&self, p: Vec3) -> Vec3 {
        match *self {
            Repetition::None => p,
            Repetition::Finite { extent, spacing } => {
                operations::repeat_finite(p, extent, spacing)
            }
            Repetition::Infinite { spacing } => operations::repeat_infinite(p, spacing),
        }
    }
}

/// One primitive as supplied by the scene description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveRecord {
    pub name: Option<String>,
    pub shape: ShapeKind,
    /// Dimension slots x, y, z, w; missing slots take the shape defaults
    pub dimensions: Vec<f32>,
    pub transform: TransformRecord,
    pub material: Material,
    pub hollow: bool,
    pub wall_thickness: f32,
    pub elongate: bool,
    pub elongation: Vec3,
    pub repetition: Repetition,
    /// Mirror across the x, y and z planes
    pub mirror: [bool; 3],
    pub edge_radius: f32,
    pub blend_type: BlendType,
    pub blend_strength: f32,
    pub is_bound: bool,
    /// Index of the next record in this record's chain
    pub sibling: Option<usize>,
    /// Index of the first record of this record's children chain
    pub children: Option<usize>,
}

impl Default for PrimitiveRecord {
    fn default() -> Self {
        Self {
            name: None,
            shape: ShapeKind::Sphere,
            dimensions: Vec::new(),
            transform: TransformRecord::default(),
            material: Material::default(),
            hollow: false,
            wall_thickness: 0.01,
            elongate: false,
            elongation: Vec3::ZERO,
            repetition: Repetition::None,
            mirror: [false; 3],
            edge_radius: 0.0,
            blend_type: BlendType::Union,
            blend_strength: 0.0,
            is_bound: false,
            sibling: None,
            children: None,
        }
    }
}

impl PrimitiveRecord {
    /// A record for `shape` with default dimensions
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, dimensions: &[f32]) -> Self {
        self.dimensions = dimensions.to_vec();
        self
    }

    pub fn at(mut self, translate: Vec3) -> Self {
        self.transform.translate = translate;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_blend(mut self, blend_type: BlendType, strength: f32) -> Self {
        self.blend_type = blend_type;
        self.blend_strength = strength;
        self
    }

    pub fn bound(mut self) -> Self {
        self.is_bound = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

// ============================================================================
// Scene Graph
// ============================================================================

/// Index of a node inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point and distance modifiers of a node, in application order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Modifiers {
    pub repetition: Repetition,
    /// Half-extents of the elongated core
    pub elongation: Option<Vec3>,
    pub mirror: [bool; 3],
    /// Wall thickness when hollowed
    pub hollow: Option<f32>,
    pub edge_radius: f32,
}

impl Modifiers {
    /// Repetition, then elongation, then mirroring
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        let mut q = self.repetition.apply(p);
        if let Some(h) = self.elongation {
            q = operations::elongate(q, h);
        }
        operations::mirror(q, self.mirror)
    }

    /// Hollowing, then edge rounding
    pub fn apply_distance(&self, d: f32) -> f32 {
        let d = match self.hollow {
            Some(thickness) => operations::hollow(d, thickness),
            None => d,
        };
        operations::round_edges(d, self.edge_radius)
    }
}

/// A validated node with clamped parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub shape: Shape,
    pub transform: Transform,
    pub modifiers: Modifiers,
    pub material: Material,
    pub blend: BlendType,
    pub blend_strength: f32,
    pub is_bound: bool,
    pub sibling: Option<NodeId>,
    pub children: Option<NodeId>,
}

impl SceneNode {
    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }
}

/// A recoverable adjustment made while building the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub node: NodeId,
    pub field: &'static str,
    pub original: f32,
    pub clamped: f32,
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: {} {} -> {}",
            self.node, self.field, self.original, self.clamped
        )
    }
}

/// Immutable forest of scene nodes
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub(crate) nodes: Vec<SceneNode>,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) normalizations: Vec<Normalization>,
}

impl SceneGraph {
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    /// Heads of the top-level chains, in record order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adjustments made while building
    pub fn normalizations(&self) -> &[Normalization] {
        &self.normalizations
    }

    /// Walk a chain from `head` along sibling links
    pub fn chain(&self, head: NodeId) -> Chain<'_> {
        Chain {
            graph: self,
            next: Some(head),
        }
    }

    /// The children chain of `id`
    pub fn children(&self, id: NodeId) -> Chain<'_> {
        Chain {
            graph: self,
            next: self.node(id).children,
        }
    }
}

/// Iterator over a sibling chain
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeId>,
}

impl Iterator for Chain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.graph.get(current).and_then(|node| node.sibling);
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_fill_missing_fields() {
        let record: PrimitiveRecord =
            serde_json::from_str(r#"{ "shape": "torus", "children": 2 }"#).unwrap();
        assert_eq!(record.shape, ShapeKind::Torus);
        assert_eq!(record.children, Some(2));
        assert!(record.dimensions.is_empty());
        assert_eq!(record.transform.scale, 1.0);
        assert_eq!(record.blend_type, BlendType::Union);
    }

    #[test]
    fn repetition_is_tagged_by_mode() {
        let rep: Repetition =
            serde_json::from_str(r#"{ "mode": "infinite", "spacing": [1.0, 0.0, 2.0] }"#)
                .unwrap();
        assert_eq!(
            rep,
            Repetition::Infinite {
                spacing: Vec3::new(1.0, 0.0, 2.0)
            }
        );
    }

    #[test]
    fn modifiers_apply_in_order() {
        let modifiers = Modifiers {
            repetition: Repetition::Infinite {
                spacing: Vec3::new(4.0, 0.0, 0.0),
            },
            elongation: Some(Vec3::new(0.5, 0.0, 0.0)),
            mirror: [false, true, false],
            hollow: None,
            edge_radius: 0.0,
        };
        // 4.9 wraps to 0.9, elongation leaves 0.4, y is mirrored
        let q = modifiers.apply_point(Vec3::new(4.9, -1.0, 0.0));
        assert!((q.x - 0.4).abs() < 1e-5);
        assert!((q.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distance_modifiers_hollow_then_round() {
        let modifiers = Modifiers {
            hollow: Some(0.1),
            edge_radius: 0.05,
            ..Modifiers::default()
        };
        // -0.5 is carved out by hollowing (0.4) then rounded (0.35)
        assert!((modifiers.apply_distance(-0.5) - 0.35).abs() < 1e-6);
    }
}
