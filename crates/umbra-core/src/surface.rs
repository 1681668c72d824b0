//! Editable parameter surfaces
//!
//! A [`ParamSurface`] is the typed knob set of one node kind: a primitive,
//! a light or the ray-march settings. Setting a value runs a fixed reaction
//! table and returns the resulting [`SurfaceEffect`]s so any front end can
//! mirror them. Selecting a shape relabels the dimension knobs, toggling
//! `hollow` enables the wall thickness, and so on.
//!
//! The surface never touches a scene graph. [`ParamSurface::to_record`]
//! turns a primitive surface into a [`PrimitiveRecord`] for the builder.

use crate::error::{Error, Result};
use crate::material::Material;
use crate::operations::BlendType;
use crate::params::{
    LightKind, LightParam, ParamSpec, ShapeKind, BLEND_STRENGTH, EDGE_RADIUS, ELONGATION,
    FALLOFF, REPETITION_EXTENT, REPETITION_SPACING, SHADOW_HARDNESS, UNIFORM_SCALE, UNIT_INTERVAL,
    WALL_THICKNESS,
};
use crate::scene::{PrimitiveRecord, Repetition, TransformRecord};
use glam::Vec3;
use std::fmt;
use std::mem;
use tracing::trace;

const DIMENSION_KNOBS: [&str; 4] = ["dimension_x", "dimension_y", "dimension_z", "dimension_w"];
const REPETITION_MODES: [&str; 3] = ["none", "finite", "infinite"];

/// A knob value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Number(f32),
    Vector(Vec3),
    Colour(Vec3),
    /// One entry of a menu, by label
    Choice(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
            ParamValue::Vector(_) => "vector",
            ParamValue::Colour(_) => "colour",
            ParamValue::Choice(_) => "choice",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value as f32)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Choice(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Vector(v) | ParamValue::Colour(v) => {
                write!(f, "[{}, {}, {}]", v.x, v.y, v.z)
            }
            ParamValue::Choice(c) => f.write_str(c),
        }
    }
}

/// Current state of one knob
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub label: String,
    pub tooltip: String,
    pub value: ParamValue,
    pub enabled: bool,
    pub visible: bool,
    /// Inclusive numeric range, applied per component for vectors
    pub range: Option<(f32, f32)>,
}

impl ParamDescriptor {
    fn new(name: &'static str, value: impl Into<ParamValue>) -> Self {
        Self {
            name,
            label: name.replace('_', " "),
            tooltip: String::new(),
            value: value.into(),
            enabled: true,
            visible: true,
            range: None,
        }
    }

    fn vector(name: &'static str, value: Vec3) -> Self {
        Self::new(name, ParamValue::Vector(value))
    }

    fn colour(name: &'static str, value: Vec3) -> Self {
        Self::new(name, ParamValue::Colour(value))
    }

    fn ranged(mut self, spec: &ParamSpec) -> Self {
        self.range = Some((spec.min, spec.max));
        self.tooltip = spec.tooltip.to_string();
        self
    }

    fn tip(mut self, tooltip: &str) -> Self {
        self.tooltip = tooltip.to_string();
        self
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A change the front end should mirror
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEffect {
    Enable {
        name: &'static str,
        enabled: bool,
    },
    Show {
        name: &'static str,
        visible: bool,
    },
    Relabel {
        name: &'static str,
        label: String,
        tooltip: String,
    },
    SetValue {
        name: &'static str,
        value: ParamValue,
    },
    /// Label of the node itself
    NodeLabel(String),
    /// Node swatch as `0xRRGGBBAA`
    TileColour(u32),
}

/// Which node a surface describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Primitive,
    Light,
    RayMarch,
}

/// Knob set and reaction table for one node
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSurface {
    kind: SurfaceKind,
    params: Vec<ParamDescriptor>,
    node_label: String,
    tile_colour: u32,
    has_children: bool,
}

impl ParamSurface {
    /// Knobs of a primitive node, showing the default sphere
    pub fn primitive() -> Self {
        let mut params = vec![
            ParamDescriptor::new("shape", ShapeKind::default().name()),
            ParamDescriptor::vector("translate", Vec3::ZERO),
            ParamDescriptor::vector("rotate", Vec3::ZERO).tip("XYZ rotation in radians."),
            ParamDescriptor::new("scale", UNIFORM_SCALE.default).ranged(&UNIFORM_SCALE),
        ];
        params.extend(DIMENSION_KNOBS.map(|name| ParamDescriptor::new(name, 0.0_f32)));
        params.extend([
            ParamDescriptor::new("hollow", false),
            ParamDescriptor::new("wall_thickness", WALL_THICKNESS.default)
                .ranged(&WALL_THICKNESS)
                .disabled(),
            ParamDescriptor::new("elongate", false),
            ParamDescriptor::vector("elongation", Vec3::ZERO)
                .ranged(&ELONGATION)
                .disabled(),
            ParamDescriptor::new("edge_radius", EDGE_RADIUS.default).ranged(&EDGE_RADIUS),
            ParamDescriptor::colour("colour", Vec3::ONE),
            ParamDescriptor::new("specular", 0.0_f32)
                .ranged(&UNIT_INTERVAL)
                .tip("The fraction of light reflected specularly."),
            ParamDescriptor::new("transmission", 0.0_f32)
                .ranged(&UNIT_INTERVAL)
                .tip("The fraction of light transmitted through the surface."),
            ParamDescriptor::new("is_bound", false)
                .tip("Use this shape only to skip evaluating its children.")
                .disabled(),
            ParamDescriptor::new("blend_type", BlendType::default().name()).disabled(),
            ParamDescriptor::new("blend_strength", BLEND_STRENGTH.default)
                .ranged(&BLEND_STRENGTH)
                .disabled(),
            ParamDescriptor::new("repetition", REPETITION_MODES[0]),
            ParamDescriptor::vector("repetition_extent", Vec3::splat(REPETITION_EXTENT.default))
                .ranged(&REPETITION_EXTENT)
                .disabled(),
            ParamDescriptor::vector(
                "repetition_spacing",
                Vec3::splat(REPETITION_SPACING.default),
            )
            .ranged(&REPETITION_SPACING)
            .disabled(),
        ]);

        let mut surface = Self::with_params(SurfaceKind::Primitive, params);
        surface.shape_changed(&mut Vec::new());
        surface
    }

    /// Knobs of a light node, showing the default directional light
    pub fn light() -> Self {
        let params = vec![
            ParamDescriptor::new("type", LightKind::default().name()),
            ParamDescriptor::vector("dimension_x", Vec3::ZERO),
            ParamDescriptor::new("dimension_y", 0.0_f32),
            ParamDescriptor::colour("colour", Vec3::ONE),
            ParamDescriptor::new("falloff", FALLOFF.default).ranged(&FALLOFF),
            ParamDescriptor::new("soften_shadows", false),
            ParamDescriptor::new("shadow_hardness", SHADOW_HARDNESS.default)
                .ranged(&SHADOW_HARDNESS)
                .disabled(),
        ];
        let mut surface = Self::with_params(SurfaceKind::Light, params);
        surface.light_type_changed(&mut Vec::new());
        surface
    }

    /// Knobs of the ray-march settings node
    pub fn ray_march() -> Self {
        let params = vec![
            ParamDescriptor::new("soften_shadows", false),
            ParamDescriptor::new("hdri_shadow_hardness", SHADOW_HARDNESS.default)
                .ranged(&SHADOW_HARDNESS)
                .disabled(),
        ];
        Self::with_params(SurfaceKind::RayMarch, params)
    }

    fn with_params(kind: SurfaceKind, params: Vec<ParamDescriptor>) -> Self {
        Self {
            kind,
            params,
            node_label: String::new(),
            tile_colour: tile_colour(Vec3::ONE),
            has_children: false,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|param| param.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.get(name).map(|param| &param.value)
    }

    pub fn node_label(&self) -> &str {
        &self.node_label
    }

    pub fn tile_colour(&self) -> u32 {
        self.tile_colour
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Set a knob and apply the reaction table.
    ///
    /// Numbers and vectors are clamped into range; a clamped value is
    /// reported back as a [`SurfaceEffect::SetValue`] for the edited knob.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<Vec<SurfaceEffect>> {
        let value = value.into();
        let Some(index) = self.params.iter().position(|param| param.name == name) else {
            return Err(Error::InvalidParameter(format!(
                "{:?} surface has no parameter '{name}'",
                self.kind
            )));
        };

        let descriptor = &self.params[index];
        let key = descriptor.name;
        let (value, adjusted) = self.accept(descriptor, value)?;

        let mut effects = Vec::new();
        if adjusted {
            effects.push(SurfaceEffect::SetValue {
                name: key,
                value: value.clone(),
            });
        }
        trace!(surface = ?self.kind, param = key, value = %value, "parameter set");
        self.params[index].value = value;
        self.react(key, &mut effects);
        Ok(effects)
    }

    /// Children were connected or disconnected.
    ///
    /// Bound and blend knobs only mean something on a node with children.
    pub fn set_has_children(&mut self, has_children: bool) -> Vec<SurfaceEffect> {
        let mut effects = Vec::new();
        if self.kind == SurfaceKind::Primitive {
            self.has_children = has_children;
            self.update_blend_knobs(&mut effects);
        }
        effects
    }

    /// The primitive record described by the current knob values
    pub fn to_record(&self) -> Result<PrimitiveRecord> {
        if self.kind != SurfaceKind::Primitive {
            return Err(Error::InvalidParameter(format!(
                "{:?} surface does not describe a primitive",
                self.kind
            )));
        }

        let shape = ShapeKind::from_name(self.choice("shape")).unwrap_or_default();
        let dimensions = DIMENSION_KNOBS[..shape.params().len()]
            .iter()
            .map(|knob| self.number(knob))
            .collect();

        let mut material = Material {
            colour: self.vector("colour"),
            ..Material::default()
        };
        material.set_specular(self.number("specular"));
        material.set_transmission(self.number("transmission"));

        let spacing = self.vector("repetition_spacing");
        let repetition = match self.choice("repetition") {
            "finite" => Repetition::Finite {
                extent: self.vector("repetition_extent"),
                spacing,
            },
            "infinite" => Repetition::Infinite { spacing },
            _ => Repetition::None,
        };

        Ok(PrimitiveRecord {
            name: Some(self.node_label.clone()),
            shape,
            dimensions,
            transform: TransformRecord {
                translate: self.vector("translate"),
                rotate: self.vector("rotate"),
                scale: self.number("scale"),
            },
            material,
            hollow: self.flag("hollow"),
            wall_thickness: self.number("wall_thickness"),
            elongate: self.flag("elongate"),
            elongation: self.vector("elongation"),
            repetition,
            mirror: [false; 3],
            edge_radius: self.number("edge_radius"),
            blend_type: BlendType::from_name(self.choice("blend_type")).unwrap_or_default(),
            blend_strength: self.number("blend_strength"),
            is_bound: self.flag("is_bound"),
            sibling: None,
            children: None,
        })
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Type-check, canonicalise and clamp an incoming value
    fn accept(&self, descriptor: &ParamDescriptor, value: ParamValue) -> Result<(ParamValue, bool)> {
        if mem::discriminant(&descriptor.value) != mem::discriminant(&value) {
            return Err(Error::InvalidParameter(format!(
                "'{}' expects a {}, got a {}",
                descriptor.name,
                descriptor.value.type_name(),
                value.type_name()
            )));
        }
        let not_a_number =
            || Error::InvalidParameter(format!("'{}' must be a finite number", descriptor.name));

        match value {
            ParamValue::Number(n) => {
                if n.is_nan() {
                    return Err(not_a_number());
                }
                let clamped = match descriptor.range {
                    Some((min, max)) => n.clamp(min, max),
                    None => n,
                };
                Ok((ParamValue::Number(clamped), clamped != n))
            }
            ParamValue::Vector(v) => {
                if v.is_nan() {
                    return Err(not_a_number());
                }
                let clamped = match descriptor.range {
                    Some((min, max)) => v.clamp(Vec3::splat(min), Vec3::splat(max)),
                    None => v,
                };
                Ok((ParamValue::Vector(clamped), clamped != v))
            }
            ParamValue::Colour(c) if c.is_nan() => Err(not_a_number()),
            ParamValue::Choice(choice) => {
                let canonical = self.canonical_choice(descriptor.name, &choice).ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "'{choice}' is not an option of '{}'",
                        descriptor.name
                    ))
                })?;
                Ok((ParamValue::Choice(canonical.to_string()), false))
            }
            other => Ok((other, false)),
        }
    }

    fn canonical_choice(&self, name: &str, choice: &str) -> Option<&'static str> {
        match (self.kind, name) {
            (SurfaceKind::Primitive, "shape") => ShapeKind::from_name(choice).map(ShapeKind::name),
            (SurfaceKind::Primitive, "blend_type") => {
                BlendType::from_name(choice).map(BlendType::name)
            }
            (SurfaceKind::Primitive, "repetition") => {
                let wanted = choice.trim().to_lowercase();
                REPETITION_MODES.into_iter().find(|mode| *mode == wanted)
            }
            (SurfaceKind::Light, "type") => LightKind::from_name(choice).map(LightKind::name),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------------

    fn react(&mut self, key: &'static str, effects: &mut Vec<SurfaceEffect>) {
        match (self.kind, key) {
            (SurfaceKind::Primitive, "shape") => self.shape_changed(effects),
            (SurfaceKind::Primitive, "hollow") => {
                self.enable("wall_thickness", self.flag("hollow"), effects);
            }
            (SurfaceKind::Primitive, "elongate") => {
                self.enable("elongation", self.flag("elongate"), effects);
            }
            (SurfaceKind::Primitive, "specular") => {
                self.share_unit("specular", "transmission", effects);
            }
            (SurfaceKind::Primitive, "transmission") => {
                self.share_unit("transmission", "specular", effects);
            }
            (SurfaceKind::Primitive, "is_bound" | "blend_type") => {
                self.update_blend_knobs(effects);
            }
            (SurfaceKind::Primitive, "repetition") => self.update_repetition_knobs(effects),
            (SurfaceKind::Primitive | SurfaceKind::Light, "colour") => {
                self.tile_colour = tile_colour(self.vector("colour"));
                effects.push(SurfaceEffect::TileColour(self.tile_colour));
            }
            (SurfaceKind::Light, "type") => self.light_type_changed(effects),
            (SurfaceKind::Light, "soften_shadows") => self.update_shadow_knobs(effects),
            (SurfaceKind::RayMarch, "soften_shadows") => {
                self.enable("hdri_shadow_hardness", self.flag("soften_shadows"), effects);
            }
            _ => {}
        }
    }

    fn shape_changed(&mut self, effects: &mut Vec<SurfaceEffect>) {
        let kind = ShapeKind::from_name(self.choice("shape")).unwrap_or_default();
        self.set_node_label(kind.name(), effects);

        let specs = kind.params();
        for (slot, knob) in DIMENSION_KNOBS.into_iter().enumerate() {
            match specs.get(slot) {
                Some(spec) => {
                    self.show(knob, true, effects);
                    self.relabel(knob, spec.name, spec.tooltip, effects);
                    if let Some(param) = self.param_mut(knob) {
                        param.range = Some((spec.min, spec.max));
                    }
                    self.assign(knob, ParamValue::Number(spec.default), effects);
                }
                None => self.show(knob, false, effects),
            }
        }
    }

    fn light_type_changed(&mut self, effects: &mut Vec<SurfaceEffect>) {
        let kind = LightKind::from_name(self.choice("type")).unwrap_or_default();
        self.set_node_label(kind.name(), effects);

        match kind.param() {
            Some(LightParam::Vector {
                name,
                default,
                tooltip,
            }) => {
                self.show("dimension_x", true, effects);
                self.relabel("dimension_x", name, tooltip, effects);
                self.assign("dimension_x", ParamValue::Vector(default.into()), effects);
                self.show("dimension_y", false, effects);
            }
            Some(LightParam::Scalar(spec)) => {
                self.show("dimension_x", false, effects);
                self.show("dimension_y", true, effects);
                self.relabel("dimension_y", spec.name, spec.tooltip, effects);
                if let Some(param) = self.param_mut("dimension_y") {
                    param.range = Some((spec.min, spec.max));
                }
                self.assign("dimension_y", ParamValue::Number(spec.default), effects);
            }
            None => {
                self.show("dimension_x", false, effects);
                self.show("dimension_y", false, effects);
            }
        }
        self.update_shadow_knobs(effects);
    }

    /// Ambient lights have no falloff and cast no shadows
    fn update_shadow_knobs(&mut self, effects: &mut Vec<SurfaceEffect>) {
        let positional = !LightKind::from_name(self.choice("type"))
            .unwrap_or_default()
            .is_ambient();
        self.enable("falloff", positional, effects);
        self.enable("soften_shadows", positional, effects);
        let soft = positional && self.flag("soften_shadows");
        self.enable("shadow_hardness", soft, effects);
    }

    fn update_blend_knobs(&mut self, effects: &mut Vec<SurfaceEffect>) {
        let parent = self.has_children;
        let blending = parent && !self.flag("is_bound");
        let smooth = BlendType::from_name(self.choice("blend_type")).is_some_and(BlendType::is_smooth);
        self.enable("is_bound", parent, effects);
        self.enable("blend_type", blending, effects);
        self.enable("blend_strength", blending && smooth, effects);
    }

    fn update_repetition_knobs(&mut self, effects: &mut Vec<SurfaceEffect>) {
        let mode = self.choice("repetition");
        let finite = mode == "finite";
        let repeating = mode != "none";
        self.enable("repetition_extent", finite, effects);
        self.enable("repetition_spacing", repeating, effects);
    }

    /// Lower `other` so the two unit terms never sum past 1
    fn share_unit(&mut self, edited: &str, other: &'static str, effects: &mut Vec<SurfaceEffect>) {
        let budget = 1.0 - self.number(edited);
        if self.number(other) > budget {
            self.assign(other, ParamValue::Number(budget.max(0.0)), effects);
        }
    }

    // ------------------------------------------------------------------------
    // Knob helpers
    // ------------------------------------------------------------------------

    fn param_mut(&mut self, name: &str) -> Option<&mut ParamDescriptor> {
        self.params.iter_mut().find(|param| param.name == name)
    }

    fn enable(&mut self, name: &'static str, enabled: bool, effects: &mut Vec<SurfaceEffect>) {
        match self.param_mut(name) {
            Some(param) if param.enabled != enabled => {
                param.enabled = enabled;
                effects.push(SurfaceEffect::Enable { name, enabled });
            }
            _ => {}
        }
    }

    fn show(&mut self, name: &'static str, visible: bool, effects: &mut Vec<SurfaceEffect>) {
        match self.param_mut(name) {
            Some(param) if param.visible != visible => {
                param.visible = visible;
                effects.push(SurfaceEffect::Show { name, visible });
            }
            _ => {}
        }
    }

    fn relabel(
        &mut self,
        name: &'static str,
        label: &str,
        tooltip: &str,
        effects: &mut Vec<SurfaceEffect>,
    ) {
        match self.param_mut(name) {
            Some(param) if param.label != label || param.tooltip != tooltip => {
                param.label = label.to_string();
                param.tooltip = tooltip.to_string();
                effects.push(SurfaceEffect::Relabel {
                    name,
                    label: param.label.clone(),
                    tooltip: param.tooltip.clone(),
                });
            }
            _ => {}
        }
    }

    fn assign(&mut self, name: &'static str, value: ParamValue, effects: &mut Vec<SurfaceEffect>) {
        match self.param_mut(name) {
            Some(param) if param.value != value => {
                param.value = value.clone();
                effects.push(SurfaceEffect::SetValue { name, value });
            }
            _ => {}
        }
    }

    fn set_node_label(&mut self, label: &str, effects: &mut Vec<SurfaceEffect>) {
        if self.node_label != label {
            self.node_label = label.to_string();
            effects.push(SurfaceEffect::NodeLabel(self.node_label.clone()));
        }
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.value(name), Some(ParamValue::Bool(true)))
    }

    fn number(&self, name: &str) -> f32 {
        match self.value(name) {
            Some(ParamValue::Number(n)) => *n,
            _ => 0.0,
        }
    }

    fn vector(&self, name: &str) -> Vec3 {
        match self.value(name) {
            Some(ParamValue::Vector(v) | ParamValue::Colour(v)) => *v,
            _ => Vec3::ZERO,
        }
    }

    fn choice(&self, name: &str) -> &str {
        match self.value(name) {
            Some(ParamValue::Choice(c)) => c,
            _ => "",
        }
    }
}

/// Pack an RGB colour into an opaque `0xRRGGBBAA` swatch
pub fn tile_colour(colour: Vec3) -> u32 {
    let channel = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u32;
    (channel(colour.x) << 24) | (channel(colour.y) << 16) | (channel(colour.z) << 8) | 0xFF
}

/// Every menu entry of a choice knob
pub fn choices(kind: SurfaceKind, name: &str) -> Vec<&'static str> {
    match (kind, name) {
        (SurfaceKind::Primitive, "shape") => ShapeKind::ALL.map(ShapeKind::name).to_vec(),
        (SurfaceKind::Primitive, "blend_type") => BlendType::ALL.map(BlendType::name).to_vec(),
        (SurfaceKind::Primitive, "repetition") => REPETITION_MODES.to_vec(),
        (SurfaceKind::Light, "type") => LightKind::ALL.map(LightKind::name).to_vec(),
        _ => Vec::new(),
    }
}

/// Parameter table for a shape, as shown on the dimension knobs
pub fn shape_knobs(kind: ShapeKind) -> impl Iterator<Item = (&'static str, &'static ParamSpec)> {
    DIMENSION_KNOBS.into_iter().zip(kind.params())
}
