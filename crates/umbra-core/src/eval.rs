//! Distance-field evaluation over a scene graph
//!
//! Top-level chains combine by hard union. Inside a node the order is:
//! world point to local frame, repetition, elongation, mirroring, shape
//! distance at unit scale, hollowing, edge rounding, then each child is
//! blended in with the node's operator.
//!
//! Sibling chains are walked iteratively; recursion only descends into
//! children, so depth is bounded by the nesting of the scene.

use crate::material::MaterialSample;
use crate::operations::BlendType;
use crate::scene::{NodeId, SceneGraph, SceneNode};
use glam::Vec3;

/// Default distance outside a bound at which its subtree is skipped
pub const DEFAULT_BOUND_MARGIN: f32 = 0.05;

/// Distance and material at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    pub distance: f32,
    /// `None` far from all geometry or when only a bounding distance is known
    pub material: Option<MaterialSample<'a>>,
}

impl Sample<'_> {
    const EMPTY: Sample<'static> = Sample {
        distance: f32::INFINITY,
        material: None,
    };
}

/// Evaluates the distance field of a borrowed, immutable scene graph
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    graph: &'a SceneGraph,
    bound_margin: f32,
}

impl<'a> Evaluator<'a> {
    pub fn new(graph: &'a SceneGraph) -> Self {
        Self {
            graph,
            bound_margin: DEFAULT_BOUND_MARGIN,
        }
    }

    /// Distance outside a bound beyond which its children are not evaluated.
    ///
    /// Must exceed the marcher's hit tolerance so a culled bound can never
    /// register as a hit.
    pub fn with_bound_margin(mut self, margin: f32) -> Self {
        self.bound_margin = margin.max(0.0);
        self
    }

    pub fn bound_margin(&self) -> f32 {
        self.bound_margin
    }

    /// Signed distance and nearest material at `p`
    pub fn sample(&self, p: Vec3) -> Sample<'a> {
        let mut best = Sample::EMPTY;
        for &root in self.graph.roots() {
            best = self.union_chain(root, p, best);
        }
        best
    }

    pub fn distance(&self, p: Vec3) -> f32 {
        self.sample(p).distance
    }

    /// Surface normal from four tetrahedral samples
    pub fn normal(&self, p: Vec3, eps: f32) -> Vec3 {
        const K0: Vec3 = Vec3::new(1.0, -1.0, -1.0);
        const K1: Vec3 = Vec3::new(-1.0, -1.0, 1.0);
        const K2: Vec3 = Vec3::new(-1.0, 1.0, -1.0);
        const K3: Vec3 = Vec3::new(1.0, 1.0, 1.0);

        let gradient = K0 * self.distance(p + K0 * eps)
            + K1 * self.distance(p + K1 * eps)
            + K2 * self.distance(p + K2 * eps)
            + K3 * self.distance(p + K3 * eps);
        finite_normal(gradient)
    }

    /// Surface normal from six central differences
    pub fn normal_central(&self, p: Vec3, eps: f32) -> Vec3 {
        let dx = Vec3::new(eps, 0.0, 0.0);
        let dy = Vec3::new(0.0, eps, 0.0);
        let dz = Vec3::new(0.0, 0.0, eps);
        let gradient = Vec3::new(
            self.distance(p + dx) - self.distance(p - dx),
            self.distance(p + dy) - self.distance(p - dy),
            self.distance(p + dz) - self.distance(p - dz),
        );
        finite_normal(gradient)
    }

    /// Union every node of a chain into `best`; earlier nodes win ties
    fn union_chain(&self, head: NodeId, p: Vec3, mut best: Sample<'a>) -> Sample<'a> {
        for id in self.graph.chain(head) {
            let sample = self.node(id, p, best.distance, 0.0);
            if sample.distance < best.distance {
                best = sample;
            }
        }
        best
    }

    /// Evaluate one node and its children.
    ///
    /// `nearest` is the best distance already known in an enclosing union;
    /// a bound whose distance cannot beat it is skipped. `smoothing` is the
    /// blend radius of the enclosing operator. A bound is only culled once it
    /// lies beyond that radius, where the operator no longer reads the
    /// child's value and the culling distance cannot move the surface.
    fn node(&self, id: NodeId, p: Vec3, nearest: f32, smoothing: f32) -> Sample<'a> {
        let node = self.graph.node(id);
        let (distance, trap) = own_distance(node, p);

        if node.is_bound {
            let skip = distance > self.bound_margin + smoothing
                || (distance > 0.0 && distance >= nearest + smoothing);
            return match node.children {
                Some(head) if !skip => self.union_chain(head, p, Sample::EMPTY),
                _ => Sample {
                    distance,
                    material: None,
                },
            };
        }

        let mut acc = Sample {
            distance,
            material: Some(MaterialSample {
                node: id,
                material: &node.material,
                trap,
                trap_blend: node.shape.trap_blend(),
            }),
        };

        let Some(head) = node.children else {
            return acc;
        };
        let unioning = node.blend.hard() == BlendType::Union;
        let smoothing = if node.blend.is_smooth() {
            node.blend_strength.max(0.0)
        } else {
            0.0
        };
        for child in self.graph.chain(head) {
            let nearest = if unioning { acc.distance } else { f32::INFINITY };
            let sample = self.node(child, p, nearest, smoothing);
            let blended = node
                .blend
                .apply(acc.distance, sample.distance, node.blend_strength);
            acc = Sample {
                distance: blended.distance,
                material: if blended.child_wins {
                    sample.material
                } else {
                    acc.material
                },
            };
        }
        acc
    }
}

/// Distance to the node's own modified shape
fn own_distance(node: &SceneNode, p: Vec3) -> (f32, Option<Vec3>) {
    let local = node.modifiers.apply_point(node.transform.to_local(p));
    let scale = node.transform.scale;
    let (d, trap) = node.shape.distance_with_trap(local / scale);
    (node.modifiers.apply_distance(d * scale), trap)
}

fn finite_normal(gradient: Vec3) -> Vec3 {
    gradient.try_normalize().unwrap_or(Vec3::Y)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;
    use crate::material::Material;
    use crate::params::ShapeKind;
    use crate::scene::{PrimitiveRecord, Repetition};
    use approx::assert_relative_eq;

    fn sphere(radius: f32, at: Vec3) -> PrimitiveRecord {
        PrimitiveRecord::new(ShapeKind::Sphere)
            .with_dimensions(&[radius])
            .at(at)
    }

    fn coloured(record: PrimitiveRecord, colour: Vec3) -> PrimitiveRecord {
        record.with_material(Material::diffuse(colour))
    }

    // ------------------------------------------------------------------------
    // Basics
    // ------------------------------------------------------------------------

    #[test]
    fn empty_scene_is_infinitely_far() {
        let graph = SceneGraph::default();
        let sample = Evaluator::new(&graph).sample(Vec3::ZERO);
        assert!(sample.distance.is_infinite());
        assert!(sample.material.is_none());
    }

    #[test]
    fn single_sphere_matches_closed_form() {
        let graph = SceneGraph::from_records(&[sphere(1.0, Vec3::new(0.0, 0.0, 5.0))]).unwrap();
        let eval = Evaluator::new(&graph);
        assert_relative_eq!(eval.distance(Vec3::ZERO), 4.0, epsilon = 1e-5);
        assert_eq!(eval.sample(Vec3::ZERO).material.unwrap().node, NodeId(0));
    }

    #[test]
    fn separate_roots_are_unioned_nearest_first() {
        let graph = SceneGraph::from_records(&[
            sphere(0.5, Vec3::new(-2.0, 0.0, 0.0)),
            sphere(0.5, Vec3::new(2.0, 0.0, 0.0)),
        ])
        .unwrap();
        let eval = Evaluator::new(&graph);
        let left = eval.sample(Vec3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(left.distance, 0.5, epsilon = 1e-5);
        assert_eq!(left.material.unwrap().node, NodeId(0));
        let right = eval.sample(Vec3::new(1.2, 0.0, 0.0));
        assert_eq!(right.material.unwrap().node, NodeId(1));
    }

    #[test]
    fn scale_preserves_metric_distance() {
        let mut record = sphere(0.5, Vec3::ZERO);
        record.transform.scale = 2.0;
        let graph = SceneGraph::from_records(&[record]).unwrap();
        assert_relative_eq!(
            Evaluator::new(&graph).distance(Vec3::new(3.0, 0.0, 0.0)),
            2.0,
            epsilon = 1e-5
        );
    }

    // ------------------------------------------------------------------------
    // Children and blending
    // ------------------------------------------------------------------------

    #[test]
    fn subtraction_child_carves_parent() {
        let mut builder = SceneBuilder::new();
        let parent = builder.push(
            coloured(sphere(1.0, Vec3::ZERO), Vec3::X)
                .with_blend(BlendType::Subtraction, 0.0),
        );
        let child = builder.push(coloured(sphere(0.5, Vec3::new(1.0, 0.0, 0.0)), Vec3::Y));
        builder.add_child(parent, child);
        let graph = builder.build().unwrap();
        let eval = Evaluator::new(&graph);

        // Inside the child: carved away
        assert!(eval.distance(Vec3::new(0.9, 0.0, 0.0)) > 0.0);
        // Far side of the parent is untouched
        assert_relative_eq!(eval.distance(Vec3::new(-2.0, 0.0, 0.0)), 1.0, epsilon = 1e-5);
        // Carved face takes the child's material
        let face = eval.sample(Vec3::new(0.45, 0.0, 0.0));
        assert_eq!(face.material.unwrap().node, NodeId(child));
    }

    #[test]
    fn smooth_union_at_zero_strength_equals_union() {
        let build = |blend| {
            let mut builder = SceneBuilder::new();
            let parent = builder.push(sphere(0.5, Vec3::ZERO).with_blend(blend, 0.0));
            let child = builder.push(sphere(0.5, Vec3::new(0.8, 0.0, 0.0)));
            builder.add_child(parent, child);
            builder.build().unwrap()
        };
        let hard = build(BlendType::Union);
        let smooth = build(BlendType::SmoothUnion);
        for p in [Vec3::new(0.4, 0.6, 0.0), Vec3::new(-1.0, 0.0, 0.3), Vec3::ZERO] {
            assert_eq!(
                Evaluator::new(&hard).distance(p),
                Evaluator::new(&smooth).distance(p)
            );
        }
    }

    #[test]
    fn nested_children_evaluate_recursively() {
        let mut builder = SceneBuilder::new();
        let a = builder.push(sphere(0.2, Vec3::ZERO));
        let b = builder.push(sphere(0.2, Vec3::new(1.0, 0.0, 0.0)));
        let c = builder.push(sphere(0.2, Vec3::new(2.0, 0.0, 0.0)));
        builder.add_child(a, b).add_child(b, c);
        let graph = builder.build().unwrap();
        let sample = Evaluator::new(&graph).sample(Vec3::new(2.0, 0.5, 0.0));
        assert_eq!(sample.material.unwrap().node, NodeId(c));
        assert_relative_eq!(sample.distance, 0.3, epsilon = 1e-5);
    }

    // ------------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------------

    fn bounded_scene() -> (SceneGraph, usize, usize) {
        let mut builder = SceneBuilder::new();
        let bound = builder.push(
            PrimitiveRecord::new(ShapeKind::RectangularPrism)
                .with_dimensions(&[2.0, 2.0, 2.0])
                .bound(),
        );
        let inner = builder.push(sphere(0.5, Vec3::ZERO));
        builder.add_child(bound, inner);
        (builder.build().unwrap(), bound, inner)
    }

    #[test]
    fn bound_returns_culling_distance_far_away() {
        let (graph, _, _) = bounded_scene();
        let sample = Evaluator::new(&graph).sample(Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(sample.distance, 4.0, epsilon = 1e-5);
        assert!(sample.material.is_none());
    }

    #[test]
    fn bound_evaluates_children_when_close() {
        let (graph, _, inner) = bounded_scene();
        let sample = Evaluator::new(&graph).sample(Vec3::new(0.8, 0.0, 0.0));
        assert_relative_eq!(sample.distance, 0.3, epsilon = 1e-5);
        assert_eq!(sample.material.unwrap().node, NodeId(inner));
    }

    #[test]
    fn bound_is_never_the_material_source() {
        let (graph, bound, _) = bounded_scene();
        let eval = Evaluator::new(&graph);
        for x in [0.0, 0.3, 0.5, 0.9, 1.0, 1.02, 3.0] {
            if let Some(material) = eval.sample(Vec3::new(x, 0.1, 0.0)).material {
                assert_ne!(material.node, NodeId(bound));
            }
        }
    }

    #[test]
    fn bound_is_skipped_behind_a_nearer_surface() {
        let (graph, _, _) = bounded_scene();
        let eval = Evaluator::new(&graph);
        // Without a competitor the bound is close enough to open
        let opened = eval.node(NodeId(0), Vec3::new(1.03, 0.0, 0.0), f32::INFINITY, 0.0);
        assert!(opened.material.is_some());
        // A nearer surface elsewhere makes the subtree irrelevant
        let skipped = eval.node(NodeId(0), Vec3::new(1.03, 0.0, 0.0), 0.01, 0.0);
        assert!(skipped.material.is_none());
        // Unless a smooth blend around that surface can still reach it
        let reached = eval.node(NodeId(0), Vec3::new(1.03, 0.0, 0.0), 0.01, 0.1);
        assert!(reached.material.is_some());
    }

    #[test]
    fn bound_margin_is_never_negative() {
        let (graph, _, _) = bounded_scene();
        assert_eq!(Evaluator::new(&graph).bound_margin(), DEFAULT_BOUND_MARGIN);
        assert_eq!(
            Evaluator::new(&graph).with_bound_margin(-1.0).bound_margin(),
            0.0
        );
    }

    /// A parent sphere blended with a small sphere, optionally wrapped in a
    /// bounding sphere of radius 1
    fn blended_pair(
        blend: BlendType,
        inner_at: Vec3,
        bound_at: Vec3,
        bounded: bool,
    ) -> SceneGraph {
        let mut builder = SceneBuilder::new();
        let parent = builder.push(sphere(0.5, Vec3::ZERO).with_blend(blend, 0.5));
        let child = if bounded {
            let bound = builder.push(sphere(1.0, bound_at).bound());
            let inner = builder.push(sphere(0.1, inner_at));
            builder.add_child(bound, inner);
            bound
        } else {
            builder.push(sphere(0.1, inner_at))
        };
        builder.add_child(parent, child);
        builder.build().unwrap()
    }

    #[test]
    fn bound_leaves_smooth_union_surface_in_place() {
        let at = Vec3::new(1.7, 0.0, 0.0);
        let bounded = blended_pair(BlendType::SmoothUnion, at, at, true);
        let plain = blended_pair(BlendType::SmoothUnion, at, at, false);
        let p = Vec3::new(0.55, 0.0, 0.0);
        assert_relative_eq!(
            Evaluator::new(&bounded).distance(p),
            Evaluator::new(&plain).distance(p),
            epsilon = 1e-5
        );
        assert!(Evaluator::new(&bounded).distance(p) > 0.0);
    }

    #[test]
    fn bound_never_moves_a_smoothly_blended_surface() {
        let layouts = [
            // Bound well clear of the parent
            (Vec3::new(1.7, 0.0, 0.0), Vec3::new(1.7, 0.0, 0.0)),
            // Child overlapping the parent, off-centre in its bound
            (Vec3::new(0.6, 0.0, 0.0), Vec3::new(0.9, 0.0, 0.0)),
        ];
        let blends = [
            BlendType::SmoothUnion,
            BlendType::SmoothSubtraction,
            BlendType::SmoothIntersection,
        ];
        for blend in blends {
            for (inner_at, bound_at) in layouts {
                let bounded = blended_pair(blend, inner_at, bound_at, true);
                let plain = blended_pair(blend, inner_at, bound_at, false);
                let (bounded, plain) = (Evaluator::new(&bounded), Evaluator::new(&plain));
                for i in 0..=80 {
                    for y in [0.0, 0.3] {
                        let p = Vec3::new(-1.0 + 0.05 * i as f32, y, 0.0);
                        let (with_bound, without) = (bounded.distance(p), plain.distance(p));
                        // Where culling kicks in both fields agree on the side
                        // and stay clear of the hit band
                        let same = (with_bound - without).abs() < 1e-5;
                        let clear = with_bound.signum() == without.signum()
                            && with_bound.abs() > DEFAULT_BOUND_MARGIN;
                        assert!(
                            same || clear,
                            "{blend:?} at {p}: bounded {with_bound}, unbounded {without}"
                        );
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------------

    #[test]
    fn infinite_repetition_is_periodic_through_the_graph() {
        let mut record = sphere(0.3, Vec3::ZERO);
        record.repetition = Repetition::Infinite {
            spacing: Vec3::new(2.0, 0.0, 0.0),
        };
        let graph = SceneGraph::from_records(&[record]).unwrap();
        let eval = Evaluator::new(&graph);
        let p = Vec3::new(0.4, 0.5, 0.1);
        for k in [-2.0, 1.0, 3.0] {
            assert_relative_eq!(
                eval.distance(p),
                eval.distance(p + Vec3::new(2.0 * k, 0.0, 0.0)),
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn hollow_node_is_empty_inside() {
        let mut record = sphere(1.0, Vec3::ZERO);
        record.hollow = true;
        record.wall_thickness = 0.1;
        let graph = SceneGraph::from_records(&[record]).unwrap();
        let eval = Evaluator::new(&graph);
        assert!(eval.distance(Vec3::ZERO) > 0.0);
        assert!(eval.distance(Vec3::new(0.95, 0.0, 0.0)) < 0.0);
    }

    // ------------------------------------------------------------------------
    // Normals
    // ------------------------------------------------------------------------

    #[test]
    fn sphere_normals_point_outward() {
        let graph = SceneGraph::from_records(&[sphere(1.0, Vec3::ZERO)]).unwrap();
        let eval = Evaluator::new(&graph);
        let p = Vec3::new(0.0, 1.0, 0.0);
        let n = eval.normal(p, 1e-3);
        assert_relative_eq!(n.y, 1.0, epsilon = 1e-3);
        let n = eval.normal_central(Vec3::new(1.0, 0.0, 0.0), 1e-3);
        assert_relative_eq!(n.x, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn flat_field_falls_back_to_up() {
        let graph = SceneGraph::default();
        let eval = Evaluator::new(&graph);
        assert_eq!(eval.normal(Vec3::ZERO, 1e-3), Vec3::Y);
    }
}
