//! # Umbra Core
//!
//! Signed distance field scenes: primitive records, a validated scene
//! graph and the distance evaluator that a renderer marches through.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use umbra_core::prelude::*;
//!
//! let mut builder = SceneBuilder::new();
//! let body = builder.push(
//!     PrimitiveRecord::new(ShapeKind::Cylinder).with_blend(BlendType::SmoothUnion, 0.1),
//! );
//! let rim = builder.push(PrimitiveRecord::new(ShapeKind::Torus).at(Vec3::Y * 0.5));
//! builder.add_child(body, rim);
//!
//! let graph = builder.build()?;
//! let d = Evaluator::new(&graph).distance(Vec3::new(0.0, 0.0, 2.0));
//! ```
//!
//! ## Units and Conventions
//!
//! - **Distances**: Arbitrary world units. Negative inside a surface.
//! - **Angles**: All rotations and angular parameters use **radians**
//! - **Precision**: `f32` throughout
//! - **Coordinate system**: Right-handed, Y-up

pub mod builder;
pub mod eval;
pub mod material;
pub mod operations;
pub mod params;
pub mod scene;
pub mod shape;
pub mod surface;

mod error;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Scene construction
    pub use crate::builder::SceneBuilder;
    pub use crate::scene::{
        NodeId, PrimitiveRecord, Repetition, SceneGraph, SceneNode, TransformRecord,
    };

    // Evaluation
    pub use crate::eval::{Evaluator, Sample};
    pub use crate::material::{Material, MaterialSample};
    pub use crate::operations::{BlendType, Transform};
    pub use crate::shape::Shape;

    // Parameters
    pub use crate::params::{LightKind, ParamSpec, ShapeKind};
    pub use crate::surface::{ParamSurface, ParamValue, SurfaceEffect};

    // Math (re-export glam)
    pub use glam::{Vec2, Vec3};

    // Error handling
    pub use crate::{Error, Result};
}
