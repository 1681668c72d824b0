//! Static parameter registry for shapes and lights
//!
//! Every shape family exposes up to four named dimensions, each with a
//! default, a valid range and a tooltip. The tables here are the single
//! source for those values: the builder clamps against them, the parameter
//! surface relabels its knobs from them and the CLI prints them.
//!
//! Angles are in radians.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

/// Description of a single numeric parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Human readable name, used as the knob label
    pub name: &'static str,
    /// Value used when the parameter is missing or not a number
    pub default: f32,
    /// Inclusive lower bound
    pub min: f32,
    /// Inclusive upper bound
    pub max: f32,
    /// Help text shown next to the parameter
    pub tooltip: &'static str,
}

impl ParamSpec {
    const fn new(
        name: &'static str,
        default: f32,
        min: f32,
        max: f32,
        tooltip: &'static str,
    ) -> Self {
        Self {
            name,
            default,
            min,
            max,
            tooltip,
        }
    }

    /// Clamp a value into this parameter's range.
    ///
    /// Returns the usable value and whether it differs from the input.
    /// NaN resolves to the default.
    pub fn clamp(&self, value: f32) -> (f32, bool) {
        if value.is_nan() {
            return (self.default, true);
        }
        let clamped = value.clamp(self.min, self.max);
        (clamped, clamped != value)
    }

    /// Whether a value lies inside the declared range
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

// ============================================================================
// Shape Kinds
// ============================================================================

/// Shape families known to the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Sphere,
    Ellipsoid,
    CutSphere,
    HollowSphere,
    DeathStar,
    SolidAngle,
    RectangularPrism,
    RectangularPrismFrame,
    Rhombus,
    TriangularPrism,
    Cylinder,
    InfiniteCylinder,
    Plane,
    Capsule,
    Cone,
    InfiniteCone,
    CappedCone,
    RoundedCone,
    Torus,
    CappedTorus,
    Link,
    HexagonalPrism,
    Octahedron,
    Mandelbulb,
    Mandelbox,
}

impl ShapeKind {
    /// Every shape kind, in menu order
    pub const ALL: [ShapeKind; 25] = [
        ShapeKind::Sphere,
        ShapeKind::Ellipsoid,
        ShapeKind::CutSphere,
        ShapeKind::HollowSphere,
        ShapeKind::DeathStar,
        ShapeKind::SolidAngle,
        ShapeKind::RectangularPrism,
        ShapeKind::RectangularPrismFrame,
        ShapeKind::Rhombus,
        ShapeKind::TriangularPrism,
        ShapeKind::Cylinder,
        ShapeKind::InfiniteCylinder,
        ShapeKind::Plane,
        ShapeKind::Capsule,
        ShapeKind::Cone,
        ShapeKind::InfiniteCone,
        ShapeKind::CappedCone,
        ShapeKind::RoundedCone,
        ShapeKind::Torus,
        ShapeKind::CappedTorus,
        ShapeKind::Link,
        ShapeKind::HexagonalPrism,
        ShapeKind::Octahedron,
        ShapeKind::Mandelbulb,
        ShapeKind::Mandelbox,
    ];

    /// Label shown in menus and used as the node label
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Ellipsoid => "ellipsoid",
            ShapeKind::CutSphere => "cut sphere",
            ShapeKind::HollowSphere => "hollow sphere",
            ShapeKind::DeathStar => "death star",
            ShapeKind::SolidAngle => "solid angle",
            ShapeKind::RectangularPrism => "rectangular prism",
            ShapeKind::RectangularPrismFrame => "rectangular prism frame",
            ShapeKind::Rhombus => "rhombus",
            ShapeKind::TriangularPrism => "triangular prism",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::InfiniteCylinder => "infinite cylinder",
            ShapeKind::Plane => "plane",
            ShapeKind::Capsule => "capsule",
            ShapeKind::Cone => "cone",
            ShapeKind::InfiniteCone => "infinite cone",
            ShapeKind::CappedCone => "capped cone",
            ShapeKind::RoundedCone => "rounded cone",
            ShapeKind::Torus => "torus",
            ShapeKind::CappedTorus => "capped torus",
            ShapeKind::Link => "link",
            ShapeKind::HexagonalPrism => "hexagonal prism",
            ShapeKind::Octahedron => "octahedron",
            ShapeKind::Mandelbulb => "mandelbulb",
            ShapeKind::Mandelbox => "mandelbox",
        }
    }

    /// Look up a kind by its label ("capped torus") or serde tag ("capped_torus")
    pub fn from_name(name: &str) -> Option<ShapeKind> {
        let wanted = name.trim().replace('_', " ").to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == wanted)
    }

    /// Dimensional parameters, in slot order x, y, z, w
    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            ShapeKind::Sphere => SPHERE,
            ShapeKind::Ellipsoid => ELLIPSOID,
            ShapeKind::CutSphere => CUT_SPHERE,
            ShapeKind::HollowSphere => HOLLOW_SPHERE,
            ShapeKind::DeathStar => DEATH_STAR,
            ShapeKind::SolidAngle => SOLID_ANGLE,
            ShapeKind::RectangularPrism => RECTANGULAR_PRISM,
            ShapeKind::RectangularPrismFrame => RECTANGULAR_PRISM_FRAME,
            ShapeKind::Rhombus => RHOMBUS,
            ShapeKind::TriangularPrism => TRIANGULAR_PRISM,
            ShapeKind::Cylinder => CYLINDER,
            ShapeKind::InfiniteCylinder => INFINITE_CYLINDER,
            ShapeKind::Plane => PLANE,
            ShapeKind::Capsule => CAPSULE,
            ShapeKind::Cone => CONE,
            ShapeKind::InfiniteCone => INFINITE_CONE,
            ShapeKind::CappedCone => CAPPED_CONE,
            ShapeKind::RoundedCone => ROUNDED_CONE,
            ShapeKind::Torus => TORUS,
            ShapeKind::CappedTorus => CAPPED_TORUS,
            ShapeKind::Link => LINK,
            ShapeKind::HexagonalPrism => HEXAGONAL_PRISM,
            ShapeKind::Octahedron => OCTAHEDRON,
            ShapeKind::Mandelbulb => MANDELBULB,
            ShapeKind::Mandelbox => MANDELBOX,
        }
    }

    /// Default dimensions with unused slots zeroed
    pub fn defaults(self) -> [f32; 4] {
        let mut values = [0.0; 4];
        for (slot, spec) in values.iter_mut().zip(self.params()) {
            *slot = spec.default;
        }
        values
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Shape Tables
// ============================================================================

const SPHERE: &[ParamSpec] = &[ParamSpec::new(
    "radius",
    0.5,
    0.0,
    10.0,
    "The radius of the sphere.",
)];

const ELLIPSOID: &[ParamSpec] = &[
    ParamSpec::new(
        "x radius",
        0.5,
        0.0,
        10.0,
        "The radius along the x-axis of the ellipsoid.",
    ),
    ParamSpec::new(
        "y radius",
        0.25,
        0.0,
        10.0,
        "The radius along the y-axis of the ellipsoid.",
    ),
    ParamSpec::new(
        "z radius",
        0.25,
        0.0,
        10.0,
        "The radius along the z-axis of the ellipsoid.",
    ),
];

const CUT_SPHERE: &[ParamSpec] = &[
    ParamSpec::new("radius", 0.5, 0.0, 10.0, "The radius of the sphere."),
    ParamSpec::new(
        "height",
        0.25,
        0.0,
        10.0,
        "The height (y-axis) above which the sphere is cut away.",
    ),
];

const HOLLOW_SPHERE: &[ParamSpec] = &[
    ParamSpec::new("radius", 0.5, 0.0, 10.0, "The radius of the sphere."),
    ParamSpec::new(
        "height",
        0.25,
        0.0,
        10.0,
        "The height (y-axis) at which an opening is created.",
    ),
    ParamSpec::new(
        "thickness",
        0.05,
        0.0,
        1.0,
        "The thickness of the walls of the hollow sphere.",
    ),
];

const DEATH_STAR: &[ParamSpec] = &[
    ParamSpec::new(
        "solid radius",
        0.5,
        0.0,
        10.0,
        "The radius of the sphere that remains solid.",
    ),
    ParamSpec::new(
        "hollow radius",
        0.5,
        0.0,
        10.0,
        "The radius of the sphere that is cut from the solid.",
    ),
    ParamSpec::new(
        "hollow height",
        0.75,
        0.0,
        10.0,
        "The height (y-axis) of the center of the sphere that is cut from the solid. \
         Above solid radius + hollow radius the result is a plain sphere.",
    ),
];

const SOLID_ANGLE: &[ParamSpec] = &[
    ParamSpec::new(
        "radius",
        0.5,
        0.0,
        10.0,
        "The radius of the sphere to cut the angle out of.",
    ),
    ParamSpec::new(
        "angle",
        1.0,
        0.0,
        PI,
        "The angle on [0, PI] measured between the y-axis and the wall of the solid angle.",
    ),
];

const RECTANGULAR_PRISM: &[ParamSpec] = &[
    ParamSpec::new("width", 0.5, 0.0, 10.0, "The width (x) of the prism."),
    ParamSpec::new("height", 0.75, 0.0, 10.0, "The height (y) of the prism."),
    ParamSpec::new("depth", 0.25, 0.0, 10.0, "The depth (z) of the prism."),
];

const RECTANGULAR_PRISM_FRAME: &[ParamSpec] = &[
    ParamSpec::new("width", 0.5, 0.0, 10.0, "The width (x) of the frame."),
    ParamSpec::new("height", 0.75, 0.0, 10.0, "The height (y) of the frame."),
    ParamSpec::new("depth", 0.25, 0.0, 10.0, "The depth (z) of the frame."),
    ParamSpec::new("thickness", 0.05, 0.0, 1.0, "The thickness of the frame."),
];

const RHOMBUS: &[ParamSpec] = &[
    ParamSpec::new("width", 0.5, 0.0, 10.0, "The width (x) of the rhombus."),
    ParamSpec::new("height", 0.75, 0.0, 10.0, "The height (y) of the rhombus."),
    ParamSpec::new(
        "depth",
        0.25,
        0.0,
        10.0,
        "The depth (z) of the rhombus, the extruded thickness.",
    ),
    ParamSpec::new(
        "corner radius",
        0.05,
        0.0,
        1.0,
        "The radius of the corners of the rhombus' xy-plane parallel face.",
    ),
];

const TRIANGULAR_PRISM: &[ParamSpec] = &[
    ParamSpec::new(
        "base",
        0.5,
        0.0,
        10.0,
        "The equilateral triangle's edge length (xy-plane).",
    ),
    ParamSpec::new("depth", 0.75, 0.0, 10.0, "The depth (z-axis) of the prism."),
];

const CYLINDER: &[ParamSpec] = &[
    ParamSpec::new(
        "radius",
        0.5,
        0.0,
        10.0,
        "The radius (xz-plane) of the cylinder.",
    ),
    ParamSpec::new(
        "height",
        0.75,
        0.0,
        10.0,
        "The height (y-axis) of the cylinder.",
    ),
];

const INFINITE_CYLINDER: &[ParamSpec] = &[ParamSpec::new(
    "radius",
    0.5,
    0.0,
    10.0,
    "The radius (xz-plane) of the cylinder.",
)];

const PLANE: &[ParamSpec] = &[
    ParamSpec::new(
        "normal x",
        0.0,
        0.0,
        1.0,
        "The x component of the normal direction of the plane.",
    ),
    ParamSpec::new(
        "normal y",
        0.0,
        0.0,
        1.0,
        "The y component of the normal direction of the plane.",
    ),
    ParamSpec::new(
        "normal z",
        1.0,
        0.0,
        1.0,
        "The z component of the normal direction of the plane.",
    ),
];

const CAPSULE: &[ParamSpec] = &[
    ParamSpec::new("radius", 0.25, 0.0, 10.0, "The radius of the capsule."),
    ParamSpec::new(
        "negative height",
        0.25,
        0.0,
        10.0,
        "The distance along the negative y-axis before entering the dome.",
    ),
    ParamSpec::new(
        "positive height",
        0.25,
        0.0,
        10.0,
        "The distance along the positive y-axis before entering the dome.",
    ),
];

const CONE: &[ParamSpec] = &[
    ParamSpec::new(
        "angle",
        0.5,
        0.0,
        FRAC_PI_2,
        "The angle on [0, PI/2) measured between the y-axis and the wall of the cone.",
    ),
    ParamSpec::new(
        "height",
        0.33,
        0.0,
        10.0,
        "The height (y-axis) of the cone. Cannot be 0.",
    ),
];

const INFINITE_CONE: &[ParamSpec] = &[ParamSpec::new(
    "angle",
    0.5,
    0.0,
    FRAC_PI_2,
    "The angle on [0, PI/2) measured between the y-axis and the wall of the cone.",
)];

const CAPPED_CONE: &[ParamSpec] = &[
    ParamSpec::new(
        "height",
        0.5,
        0.0,
        10.0,
        "The height (y-axis) of the cone, centered at the origin. Cannot be 0.",
    ),
    ParamSpec::new(
        "lower radius",
        0.5,
        0.0,
        10.0,
        "The radius of the cone at y = -height/2.",
    ),
    ParamSpec::new(
        "upper radius",
        0.25,
        0.0,
        10.0,
        "The radius of the cone at y = height/2.",
    ),
];

const ROUNDED_CONE: &[ParamSpec] = &[
    ParamSpec::new(
        "height",
        0.3,
        0.0,
        10.0,
        "The height (y-axis) of the rounded cone.",
    ),
    ParamSpec::new(
        "lower radius",
        0.2,
        0.0,
        10.0,
        "The radius of the cone at y = 0.",
    ),
    ParamSpec::new(
        "upper radius",
        0.1,
        0.0,
        10.0,
        "The radius of the cone at y = height.",
    ),
];

const TORUS: &[ParamSpec] = &[
    ParamSpec::new(
        "ring radius",
        0.3,
        0.0,
        10.0,
        "The radius (xy-plane) of the ring of the torus.",
    ),
    ParamSpec::new(
        "tube radius",
        0.2,
        0.0,
        5.0,
        "The radius of the tube of the torus.",
    ),
];

const CAPPED_TORUS: &[ParamSpec] = &[
    ParamSpec::new(
        "ring radius",
        0.3,
        0.0,
        10.0,
        "The radius (xy-plane) of the ring of the torus.",
    ),
    ParamSpec::new(
        "tube radius",
        0.2,
        0.0,
        5.0,
        "The radius of the tube of the torus.",
    ),
    ParamSpec::new(
        "cap angle",
        1.0,
        0.0,
        PI,
        "The angle (xy-plane, symmetric about the y-axis) to cap at, on (0, PI).",
    ),
];

const LINK: &[ParamSpec] = &[
    ParamSpec::new(
        "ring radius",
        0.3,
        0.0,
        10.0,
        "The radius (xy-plane) of the ring of the torus that is stretched into the link.",
    ),
    ParamSpec::new(
        "tube radius",
        0.2,
        0.0,
        5.0,
        "The radius of the tube that makes the link.",
    ),
    ParamSpec::new(
        "height",
        0.1,
        0.0,
        10.0,
        "The height (y-axis) to elongate the torus.",
    ),
];

const HEXAGONAL_PRISM: &[ParamSpec] = &[
    ParamSpec::new("height", 0.5, 0.0, 10.0, "The height (y) of the prism."),
    ParamSpec::new("depth", 0.5, 0.0, 10.0, "The depth (z) of the prism."),
];

const OCTAHEDRON: &[ParamSpec] = &[ParamSpec::new(
    "radial extent",
    0.5,
    0.0,
    10.0,
    "The maximum distance along the x, y and z axes; the vertices sit at +/- this value.",
)];

const MANDELBULB: &[ParamSpec] = &[
    ParamSpec::new(
        "power",
        8.0,
        2.0,
        30.0,
        "One greater than the axes of symmetry in the xy-plane.",
    ),
    ParamSpec::new(
        "iterations",
        10.0,
        1.0,
        30.0,
        "The number of iterations to compute. More iterations are slower but add detail.",
    ),
    ParamSpec::new(
        "max square radius",
        4.0,
        1.0,
        9.0,
        "When the square radius has reached this length, stop iterating.",
    ),
    ParamSpec::new(
        "orbital trap blend strength",
        1.0,
        0.0,
        1.0,
        "Transition between orbital trap based colouring and the material colour.",
    ),
];

const MANDELBOX: &[ParamSpec] = &[
    ParamSpec::new(
        "scale",
        -1.75,
        -5.0,
        5.0,
        "The amount to scale the position between folds. Can be negative or positive.",
    ),
    ParamSpec::new(
        "iterations",
        12.0,
        1.0,
        30.0,
        "The number of iterations to compute. More iterations are slower but add detail.",
    ),
    ParamSpec::new(
        "min square radius",
        0.001,
        0.000_01,
        0.1,
        "The minimum square radius to use when spherically folding.",
    ),
    ParamSpec::new(
        "folding limit",
        0.8,
        0.01,
        2.0,
        "Clamp the position between +/- this value when performing the box fold.",
    ),
];

// ============================================================================
// Modifier Ranges
// ============================================================================

/// Wall thickness of hollowed shapes
pub const WALL_THICKNESS: ParamSpec = ParamSpec::new(
    "wall thickness",
    0.01,
    0.0,
    1.0,
    "The thickness of the walls left behind when hollowing.",
);

/// Per-axis elongation
pub const ELONGATION: ParamSpec = ParamSpec::new(
    "elongation",
    0.0,
    0.0,
    10.0,
    "The distance to stretch the shape along each axis.",
);

/// Blend strength of smooth operators
pub const BLEND_STRENGTH: ParamSpec = ParamSpec::new(
    "blend strength",
    0.0,
    0.0,
    1.0,
    "The amount to smooth the blend between this object and its children.",
);

/// Edge rounding radius
pub const EDGE_RADIUS: ParamSpec = ParamSpec::new(
    "edge radius",
    0.0,
    0.0,
    1.0,
    "The radius to round the edges of the shape by.",
);

/// Uniform scale
pub const UNIFORM_SCALE: ParamSpec = ParamSpec::new(
    "uniform scale",
    1.0,
    0.001,
    100.0,
    "Scale the object uniformly, preserving the distance field.",
);

/// Per-axis repeat count for finite repetition
pub const REPETITION_EXTENT: ParamSpec = ParamSpec::new(
    "repetition extent",
    1.0,
    0.0,
    100.0,
    "The number of copies on each side of the original along each axis.",
);

/// Per-axis cell size for repetition
pub const REPETITION_SPACING: ParamSpec = ParamSpec::new(
    "repetition spacing",
    1.0,
    0.0,
    100.0,
    "The size of one repetition cell along each axis. 0 disables the axis.",
);

/// Material scalar terms such as specular and transmission
pub const UNIT_INTERVAL: ParamSpec = ParamSpec::new("unit", 0.0, 0.0, 1.0, "A value on [0, 1].");

/// Refractive index of transmissive materials
pub const REFRACTIVE_INDEX: ParamSpec = ParamSpec::new(
    "refractive index",
    1.5,
    1.0,
    5.0,
    "The refractive index of the material.",
);

/// Emission strength multiplier
pub const EMISSION_STRENGTH: ParamSpec = ParamSpec::new(
    "emission",
    0.0,
    0.0,
    100.0,
    "The intensity of light emitted by the material.",
);

// ============================================================================
// Light Kinds
// ============================================================================

/// Light families understood by the shading stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    #[default]
    Directional,
    Point,
    Ambient,
    AmbientOcclusion,
}

/// The one dimensional parameter a light kind exposes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightParam {
    /// Direction or position
    Vector {
        name: &'static str,
        default: [f32; 3],
        tooltip: &'static str,
    },
    /// A ranged scalar
    Scalar(ParamSpec),
}

impl LightKind {
    /// Every light kind, in menu order
    pub const ALL: [LightKind; 4] = [
        LightKind::Directional,
        LightKind::Point,
        LightKind::Ambient,
        LightKind::AmbientOcclusion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LightKind::Directional => "directional",
            LightKind::Point => "point",
            LightKind::Ambient => "ambient",
            LightKind::AmbientOcclusion => "ambient occlusion",
        }
    }

    pub fn from_name(name: &str) -> Option<LightKind> {
        let wanted = name.trim().replace('_', " ").to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == wanted)
    }

    /// Ambient variants are not positional: no falloff and no shadows
    pub fn is_ambient(self) -> bool {
        matches!(self, LightKind::Ambient | LightKind::AmbientOcclusion)
    }

    pub fn param(self) -> Option<LightParam> {
        match self {
            LightKind::Directional => Some(LightParam::Vector {
                name: "direction",
                default: [0.0, -1.0, 0.0],
                tooltip: "The direction of the light.",
            }),
            LightKind::Point => Some(LightParam::Vector {
                name: "position",
                default: [0.0, 1.0, 0.0],
                tooltip: "The position of the light.",
            }),
            LightKind::Ambient => None,
            LightKind::AmbientOcclusion => Some(LightParam::Scalar(AO_ITERATIONS)),
        }
    }
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample count of ambient occlusion lights
pub const AO_ITERATIONS: ParamSpec = ParamSpec::new(
    "iterations",
    5.0,
    1.0,
    10.0,
    "The number of iterations to compute.",
);

/// Sharpness of soft shadows
pub const SHADOW_HARDNESS: ParamSpec = ParamSpec::new(
    "shadow hardness",
    1.0,
    1.0,
    100.0,
    "The hardness of softened shadows.",
);

/// Falloff power of point lights
pub const FALLOFF: ParamSpec = ParamSpec::new(
    "falloff",
    0.0,
    0.0,
    4.0,
    "The power of the distance attenuation of positional lights. 2 is physical.",
);
