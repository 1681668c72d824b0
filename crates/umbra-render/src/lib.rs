//! Umbra Render - CPU ray marching for Umbra scenes
//!
//! This crate turns a [`umbra_core::scene::SceneGraph`] into images by
//! sphere tracing its distance field on the CPU.
//!
//! ## Features
//!
//! - Row-parallel rendering with rayon, cancellable through an `AtomicBool`
//! - Directional, point, ambient and ambient-occlusion lights
//! - Hard and soft shadows
//! - Pluggable compositing of diffuse, specular, transmission and emission
//! - Colour, depth and normal image output
//! - JSON scene description files
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::atomic::AtomicBool;
//! use umbra_render::{Renderer, SceneDescription};
//!
//! let description = SceneDescription::load("scenes/barrel.json")?;
//! let (graph, lights) = description.build()?;
//! let frame = Renderer::new(description.settings.clone())
//!     .render(&graph, &lights, &description.camera(), &AtomicBool::new(false))?;
//! frame.save_png("barrel.png")?;
//! ```

pub mod camera;
pub mod description;
pub mod light;
pub mod march;
pub mod render;
pub mod shading;

mod error;

pub use camera::{Camera, CameraRecord, Ray};
pub use description::{SceneDescription, default_lights};
pub use error::{RenderError, Result};
pub use light::{Light, LightRecord, LightSample, LightSource, ShadowSettings};
pub use march::{Hit, MarchOutcome, MarchSettings, MarchState, march};
pub use render::{Frame, RenderSettings, RenderStats, Renderer};
pub use shading::{Compositor, ShadingTerms, StandardCompositor, SurfacePoint, shade};
