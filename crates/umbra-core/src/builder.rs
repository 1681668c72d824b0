//! Scene graph construction and validation
//!
//! Structural problems (dangling, shared or cyclic links) are fatal and
//! produce [`Error::MalformedGraph`] without a partial graph. Out-of-range
//! numbers are clamped and recorded as [`Normalization`]s.

use crate::error::{Error, Result};
use crate::operations::{BlendType, Transform};
use crate::params::{
    ParamSpec, BLEND_STRENGTH, EDGE_RADIUS, ELONGATION, REPETITION_EXTENT, REPETITION_SPACING,
    UNIFORM_SCALE, WALL_THICKNESS,
};
use crate::scene::{
    Modifiers, NodeId, Normalization, PrimitiveRecord, Repetition, SceneGraph, SceneNode,
};
use crate::shape::Shape;
use glam::Vec3;
use tracing::{debug, warn};

/// Incremental construction of a scene from primitive records
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    records: Vec<PrimitiveRecord>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record and return its index
    pub fn push(&mut self, record: PrimitiveRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Make `next` follow `index` in its chain
    pub fn link_sibling(&mut self, index: usize, next: usize) -> &mut Self {
        if let Some(record) = self.records.get_mut(index) {
            record.sibling = Some(next);
        }
        self
    }

    /// Append `child` to the end of `parent`'s children chain
    pub fn add_child(&mut self, parent: usize, child: usize) -> &mut Self {
        let Some(head) = self.records.get(parent).map(|record| record.children) else {
            return self;
        };
        match head {
            None => self.records[parent].children = Some(child),
            Some(mut tail) => {
                // Bounded walk so a cyclic chain cannot hang the builder
                for _ in 0..self.records.len() {
                    match self.records.get(tail).and_then(|record| record.sibling) {
                        Some(next) => tail = next,
                        None => break,
                    }
                }
                if let Some(record) = self.records.get_mut(tail) {
                    record.sibling = Some(child);
                }
            }
        }
        self
    }

    pub fn records(&self) -> &[PrimitiveRecord] {
        &self.records
    }

    pub fn build(&self) -> Result<SceneGraph> {
        SceneGraph::from_records(&self.records)
    }
}

impl SceneGraph {
    /// Validate the linkage of `records` and build the graph
    pub fn from_records(records: &[PrimitiveRecord]) -> Result<SceneGraph> {
        let roots = validate_links(records)?;

        let mut normalizations = Vec::new();
        let nodes = records
            .iter()
            .enumerate()
            .map(|(index, record)| normalize(NodeId(index), record, &mut normalizations))
            .collect();

        for n in &normalizations {
            warn!(
                node = n.node.0,
                field = n.field,
                original = n.original,
                clamped = n.clamped,
                "parameter normalized"
            );
        }
        debug!(
            nodes = records.len(),
            roots = roots.len(),
            normalizations = normalizations.len(),
            "scene graph built"
        );

        Ok(SceneGraph {
            nodes,
            roots,
            normalizations,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check every link and return the chain heads no record references
fn validate_links(records: &[PrimitiveRecord]) -> Result<Vec<NodeId>> {
    let count = records.len();
    let mut parent: Vec<Option<usize>> = vec![None; count];

    for (index, record) in records.iter().enumerate() {
        for (kind, target) in [("sibling", record.sibling), ("children", record.children)] {
            let Some(target) = target else { continue };
            if target >= count {
                return Err(Error::MalformedGraph(format!(
                    "node {index} has {kind} link to missing node {target}"
                )));
            }
            if target == index {
                return Err(Error::MalformedGraph(format!(
                    "node {index} links to itself as {kind}"
                )));
            }
            if let Some(other) = parent[target] {
                return Err(Error::MalformedGraph(format!(
                    "node {target} is linked from both node {other} and node {index}"
                )));
            }
            parent[target] = Some(index);
        }
    }

    let roots: Vec<NodeId> = (0..count)
        .filter(|&index| parent[index].is_none())
        .map(NodeId)
        .collect();

    // With at most one incoming link per node, anything unreachable from a
    // root sits on a cycle.
    let mut visited = vec![false; count];
    let mut stack: Vec<usize> = roots.iter().map(|id| id.0).collect();
    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        let record = &records[index];
        stack.extend(record.sibling);
        stack.extend(record.children);
    }
    if let Some(index) = visited.iter().position(|seen| !seen) {
        return Err(Error::MalformedGraph(format!(
            "node {index} is part of a sibling/child cycle"
        )));
    }

    Ok(roots)
}

// ============================================================================
// Normalization
// ============================================================================

struct Normalizer<'a> {
    node: NodeId,
    out: &'a mut Vec<Normalization>,
}

impl Normalizer<'_> {
    fn note(&mut self, field: &'static str, original: f32, clamped: f32) {
        self.out.push(Normalization {
            node: self.node,
            field,
            original,
            clamped,
        });
    }

    fn scalar(&mut self, spec: &ParamSpec, field: &'static str, value: f32) -> f32 {
        let (clamped, changed) = spec.clamp(value);
        if changed {
            self.note(field, value, clamped);
        }
        clamped
    }

    fn vector(&mut self, spec: &ParamSpec, field: &'static str, value: Vec3) -> Vec3 {
        Vec3::new(
            self.scalar(spec, field, value.x),
            self.scalar(spec, field, value.y),
            self.scalar(spec, field, value.z),
        )
    }

    fn finite(&mut self, field: &'static str, value: Vec3) -> Vec3 {
        if value.is_finite() {
            return value;
        }
        let finite_or_zero = |c: f32| if c.is_finite() { c } else { 0.0 };
        self.note(field, f32::NAN, 0.0);
        Vec3::new(
            finite_or_zero(value.x),
            finite_or_zero(value.y),
            finite_or_zero(value.z),
        )
    }
}

fn normalize(id: NodeId, record: &PrimitiveRecord, out: &mut Vec<Normalization>) -> SceneNode {
    let mut n = Normalizer { node: id, out };
    let has_children = record.children.is_some();

    let kind = record.shape;
    let mut dimensions = [0.0; 4];
    for (slot, spec) in kind.params().iter().enumerate() {
        let value = record.dimensions.get(slot).copied().unwrap_or(spec.default);
        dimensions[slot] = n.scalar(spec, spec.name, value);
    }
    let shape = Shape::from_params(kind, dimensions);

    let translate = n.finite("translate", record.transform.translate);
    let rotate = n.finite("rotate", record.transform.rotate);
    let scale = n.scalar(&UNIFORM_SCALE, "scale", record.transform.scale);
    let transform = Transform::new(translate, rotate, scale);

    let repetition = match record.repetition {
        Repetition::None => Repetition::None,
        Repetition::Finite { extent, spacing } => Repetition::Finite {
            extent: n.vector(&REPETITION_EXTENT, "repetition_extent", extent),
            spacing: n.vector(&REPETITION_SPACING, "repetition_spacing", spacing),
        },
        Repetition::Infinite { spacing } => Repetition::Infinite {
            spacing: n.vector(&REPETITION_SPACING, "repetition_spacing", spacing),
        },
    };
    let modifiers = Modifiers {
        repetition,
        elongation: record
            .elongate
            .then(|| n.vector(&ELONGATION, "elongation", record.elongation)),
        mirror: record.mirror,
        hollow: record
            .hollow
            .then(|| n.scalar(&WALL_THICKNESS, "wall_thickness", record.wall_thickness)),
        edge_radius: n.scalar(&EDGE_RADIUS, "edge_radius", record.edge_radius),
    };

    let mut material = record.material;
    for (field, original, clamped) in material.clamp_terms() {
        n.note(field, original, clamped);
    }

    let mut is_bound = record.is_bound;
    let mut blend = record.blend_type;
    let mut blend_strength = n.scalar(&BLEND_STRENGTH, "blend_strength", record.blend_strength);

    // Bounding and blending only mean something for a node with children;
    // a bound node never blends.
    if is_bound && !has_children {
        n.note("is_bound", 1.0, 0.0);
        is_bound = false;
    }
    if !has_children || is_bound {
        if blend != BlendType::Union {
            n.note("blend_type", blend_index(blend), 0.0);
            blend = BlendType::Union;
        }
        if blend_strength != 0.0 {
            n.note("blend_strength", blend_strength, 0.0);
            blend_strength = 0.0;
        }
    }

    SceneNode {
        name: record
            .name
            .clone()
            .unwrap_or_else(|| kind.name().to_string()),
        shape,
        transform,
        modifiers,
        material,
        blend,
        blend_strength,
        is_bound,
        sibling: record.sibling.map(NodeId),
        children: record.children.map(NodeId),
    }
}

fn blend_index(blend: BlendType) -> f32 {
    BlendType::ALL
        .iter()
        .position(|candidate| *candidate == blend)
        .unwrap_or(0) as f32
}
