//! Parallel CPU renderer
//!
//! Every row of the image is an independent unit of work for rayon. Workers
//! share the scene graph and lights by immutable reference; the only shared
//! mutable state is the per-outcome counters and the abort flag.

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::light::{Light, ShadowSettings};
use crate::march::{MarchOutcome, MarchSettings, march};
use crate::shading::{Compositor, StandardCompositor, SurfacePoint, shade};
use glam::Vec3;
use image::{ImageBuffer, ImageFormat, Luma, Rgb, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};
use umbra_core::eval::{DEFAULT_BOUND_MARGIN, Evaluator};
use umbra_core::scene::SceneGraph;

// ============================================================================
// Settings
// ============================================================================

/// Everything that controls a render apart from the scene itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Rays that travel this far without a hit are misses
    pub max_distance: f32,
    pub max_iterations: u32,
    /// Hit tolerance at the camera; grows linearly with distance
    pub min_step: f32,
    /// Offset used when sampling the field gradient
    pub normal_epsilon: f32,
    /// Distance outside a bound before its children are skipped
    pub bound_margin: f32,
    pub shadow_iterations: u32,
    pub shadow_bias: f32,
    pub ao_step: f32,
    /// Linear colour of rays that hit nothing
    pub background: Vec3,
    /// Worker threads; rayon's global pool when `None`
    pub threads: Option<usize>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            max_distance: 100.0,
            max_iterations: 512,
            min_step: 1e-4,
            normal_epsilon: 1e-3,
            bound_margin: DEFAULT_BOUND_MARGIN,
            shadow_iterations: 128,
            shadow_bias: 1e-2,
            ao_step: 0.05,
            background: Vec3::new(0.05, 0.05, 0.08),
            threads: None,
        }
    }
}

impl RenderSettings {
    /// Reject settings no render could satisfy
    pub fn validate(&self) -> Result<()> {
        let invalid =
            |message: &str| -> Result<()> { Err(RenderError::InvalidSettings(message.to_string())) };

        if self.width == 0 || self.height == 0 {
            return invalid("image dimensions must be non-zero");
        }
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return invalid("max_distance must be positive and finite");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1");
        }
        if self.min_step.is_nan() || self.min_step <= 0.0 {
            return invalid("min_step must be positive");
        }
        if self.normal_epsilon.is_nan() || self.normal_epsilon <= 0.0 {
            return invalid("normal_epsilon must be positive");
        }
        if self.shadow_bias.is_nan() || self.shadow_bias < 0.0 {
            return invalid("shadow_bias must be non-negative");
        }
        if self.ao_step.is_nan() || self.ao_step <= 0.0 {
            return invalid("ao_step must be positive");
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1");
        }
        Ok(())
    }

    pub fn march(&self) -> MarchSettings {
        MarchSettings {
            max_distance: self.max_distance,
            max_iterations: self.max_iterations,
            min_step: self.min_step,
        }
    }

    pub fn shadows(&self) -> ShadowSettings {
        ShadowSettings {
            max_iterations: self.shadow_iterations,
            bias: self.shadow_bias,
            min_step: self.min_step,
            max_distance: self.max_distance,
            ao_step: self.ao_step,
        }
    }

    /// Bound margin large enough that a skipped subtree is never a hit
    pub fn effective_bound_margin(&self) -> f32 {
        self.bound_margin
            .max(2.0 * self.min_step * (1.0 + self.max_distance))
    }
}

// ============================================================================
// Frame
// ============================================================================

/// How the rays of a frame ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub hits: u64,
    pub misses: u64,
    pub budget_exceeded: u64,
}

impl RenderStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses + self.budget_exceeded
    }
}

/// A finished render, row-major with row 0 at the top
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Linear RGB
    pub colour: Vec<Vec3>,
    /// Distance along the primary ray; infinite where nothing was hit
    pub depth: Vec<f32>,
    /// World-space normals; zero where nothing was hit
    pub normals: Vec<Vec3>,
    pub stats: RenderStats,
}

impl Frame {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.colour[self.index(x, y)]
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    pub fn normal_at(&self, x: u32, y: u32) -> Vec3 {
        self.normals[self.index(x, y)]
    }

    /// 8-bit sRGB-ish image with a 2.2 gamma
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = self.pixel(x, y);
            image::Rgba([encode(c.x), encode(c.y), encode(c.z), 255])
        })
    }

    /// Depth normalised to the farthest hit; misses are white
    pub fn depth_image(&self) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        let far = self
            .depth
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0_f32, f32::max);
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let d = self.depth_at(x, y);
            let value = if d.is_finite() && far > 0.0 {
                ((d / far).clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
            } else {
                u16::MAX
            };
            Luma([value])
        })
    }

    /// Normals mapped from [-1, 1] to the full 16-bit range
    pub fn normal_image(&self) -> ImageBuffer<Rgb<u16>, Vec<u16>> {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let n = self.normal_at(x, y);
            if n == Vec3::ZERO {
                return Rgb([0, 0, 0]);
            }
            let m = (n * 0.5 + 0.5).clamp(Vec3::ZERO, Vec3::ONE) * f32::from(u16::MAX);
            Rgb([m.x.round() as u16, m.y.round() as u16, m.z.round() as u16])
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_rgba_image()
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }
}

fn encode(linear: f32) -> u8 {
    let v = if linear.is_nan() { 0.0 } else { linear.clamp(0.0, 1.0) };
    (v.powf(1.0 / 2.2) * 255.0).round() as u8
}

// ============================================================================
// Renderer
// ============================================================================

/// Renders scene graphs with a fixed set of settings and a compositing policy
#[derive(Debug, Clone)]
pub struct Renderer<C: Compositor = StandardCompositor> {
    settings: RenderSettings,
    compositor: C,
}

impl Renderer<StandardCompositor> {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            compositor: StandardCompositor,
        }
    }
}

impl<C: Compositor> Renderer<C> {
    /// Replace how shading terms become pixel colours
    pub fn with_compositor<D: Compositor>(self, compositor: D) -> Renderer<D> {
        Renderer {
            settings: self.settings,
            compositor,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render a frame, returning [`RenderError::Cancelled`] if `abort` is
    /// raised before it completes
    pub fn render(
        &self,
        graph: &SceneGraph,
        lights: &[Light],
        camera: &Camera,
        abort: &AtomicBool,
    ) -> Result<Frame> {
        self.settings.validate()?;

        match self.settings.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| RenderError::InvalidSettings(e.to_string()))?;
                pool.install(|| self.render_rows(graph, lights, camera, abort))
            }
            None => self.render_rows(graph, lights, camera, abort),
        }
    }

    fn render_rows(
        &self,
        graph: &SceneGraph,
        lights: &[Light],
        camera: &Camera,
        abort: &AtomicBool,
    ) -> Result<Frame> {
        let settings = &self.settings;
        let (width, height) = (settings.width, settings.height);
        let pixels = width as usize * height as usize;
        let started = Instant::now();

        info!(
            width,
            height,
            nodes = graph.len(),
            lights = lights.len(),
            "Rendering frame"
        );

        let margin = settings.effective_bound_margin();
        if margin > settings.bound_margin {
            debug!(
                requested = settings.bound_margin,
                margin, "bound margin raised above hit tolerance"
            );
        }
        let evaluator = Evaluator::new(graph).with_bound_margin(margin);
        let camera = camera.clone().with_aspect(width as f32 / height as f32);
        let march_settings = settings.march();
        let shadow_settings = settings.shadows();

        let hits = AtomicU64::new(0);
        let misses = AtomicU64::new(0);
        let exhausted = AtomicU64::new(0);

        let mut colour = vec![settings.background; pixels];
        let mut depth = vec![f32::INFINITY; pixels];
        let mut normals = vec![Vec3::ZERO; pixels];

        colour
            .par_chunks_mut(width as usize)
            .zip(depth.par_chunks_mut(width as usize))
            .zip(normals.par_chunks_mut(width as usize))
            .enumerate()
            .for_each(|(y, ((colour_row, depth_row), normal_row))| {
                let mut row = RenderStats::default();
                for x in 0..width {
                    if abort.load(Ordering::Relaxed) {
                        return;
                    }
                    let ray = camera.pixel_ray(x, y as u32, width, height);
                    let outcome = march(
                        &evaluator,
                        ray.origin,
                        ray.direction,
                        &march_settings,
                        abort,
                    );
                    let i = x as usize;
                    match outcome {
                        MarchOutcome::Hit(hit) => {
                            row.hits += 1;
                            let normal = evaluator.normal(hit.position, settings.normal_epsilon);
                            let point = SurfacePoint {
                                position: hit.position,
                                normal,
                                view: -ray.direction,
                                material: hit.material,
                            };
                            let terms = shade(&evaluator, &point, lights, &shadow_settings);
                            colour_row[i] = self.compositor.composite(&terms, settings.background);
                            depth_row[i] = hit.travelled;
                            normal_row[i] = normal;
                        }
                        MarchOutcome::Miss(_) => row.misses += 1,
                        MarchOutcome::BudgetExceeded(_) => row.budget_exceeded += 1,
                        MarchOutcome::Cancelled => return,
                    }
                }
                hits.fetch_add(row.hits, Ordering::Relaxed);
                misses.fetch_add(row.misses, Ordering::Relaxed);
                exhausted.fetch_add(row.budget_exceeded, Ordering::Relaxed);
            });

        if abort.load(Ordering::Relaxed) {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "Render cancelled");
            return Err(RenderError::Cancelled);
        }

        let stats = RenderStats {
            hits: hits.into_inner(),
            misses: misses.into_inner(),
            budget_exceeded: exhausted.into_inner(),
        };
        info!(
            hits = stats.hits,
            misses = stats.misses,
            budget_exceeded = stats.budget_exceeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame complete"
        );

        Ok(Frame {
            width,
            height,
            colour,
            depth,
            normals,
            stats,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shading::ShadingTerms;
    use approx::assert_relative_eq;
    use umbra_core::params::ShapeKind;
    use umbra_core::scene::PrimitiveRecord;

    fn unit_sphere() -> SceneGraph {
        SceneGraph::from_records(&[PrimitiveRecord::new(ShapeKind::Sphere).with_dimensions(&[1.0])])
            .unwrap()
    }

    fn tiny(width: u32, height: u32) -> RenderSettings {
        RenderSettings {
            width,
            height,
            ..RenderSettings::default()
        }
    }

    fn front_camera() -> Camera {
        Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    #[test]
    fn default_settings_are_valid() {
        assert!(RenderSettings::default().validate().is_ok());
    }

    #[test]
    fn degenerate_settings_are_rejected() {
        for settings in [
            tiny(0, 4),
            RenderSettings {
                min_step: 0.0,
                ..RenderSettings::default()
            },
            RenderSettings {
                max_distance: f32::INFINITY,
                ..RenderSettings::default()
            },
            RenderSettings {
                threads: Some(0),
                ..RenderSettings::default()
            },
        ] {
            assert!(matches!(
                settings.validate(),
                Err(RenderError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn bound_margin_never_drops_below_hit_tolerance() {
        let settings = RenderSettings {
            bound_margin: 0.0,
            min_step: 1e-3,
            max_distance: 50.0,
            ..RenderSettings::default()
        };
        assert_relative_eq!(settings.effective_bound_margin(), 0.102, epsilon = 1e-6);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    #[test]
    fn sphere_fills_the_centre() {
        let graph = unit_sphere();
        let renderer = Renderer::new(tiny(9, 9));
        let lights = [Light::directional(Vec3::NEG_Z)];
        let frame = renderer
            .render(&graph, &lights, &front_camera(), &AtomicBool::new(false))
            .unwrap();

        assert_relative_eq!(frame.depth_at(4, 4), 4.0, epsilon = 1e-2);
        assert_relative_eq!(frame.normal_at(4, 4).z, 1.0, epsilon = 1e-2);
        assert!(frame.pixel(4, 4).x > 0.95);

        assert!(frame.depth_at(0, 0).is_infinite());
        assert_eq!(frame.pixel(0, 0), renderer.settings().background);
        assert_eq!(frame.stats.total(), 81);
        assert!(frame.stats.hits > 0 && frame.stats.misses > 0);
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let graph = unit_sphere();
        let lights = [Light::directional(Vec3::new(-1.0, -1.0, -1.0)), Light::ambient()];
        let abort = AtomicBool::new(false);

        let global = Renderer::new(tiny(12, 8))
            .render(&graph, &lights, &front_camera(), &abort)
            .unwrap();
        let pooled = Renderer::new(RenderSettings {
            threads: Some(2),
            ..tiny(12, 8)
        })
        .render(&graph, &lights, &front_camera(), &abort)
        .unwrap();

        assert_eq!(global.colour, pooled.colour);
        assert_eq!(global.stats, pooled.stats);
    }

    #[test]
    fn raised_abort_flag_cancels_the_frame() {
        let graph = unit_sphere();
        let result = Renderer::new(tiny(4, 4)).render(
            &graph,
            &[],
            &front_camera(),
            &AtomicBool::new(true),
        );
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }

    #[test]
    fn empty_scene_renders_background() {
        let graph = SceneGraph::default();
        let frame = Renderer::new(tiny(3, 2))
            .render(&graph, &[], &Camera::default(), &AtomicBool::new(false))
            .unwrap();
        assert_eq!(frame.stats.misses, 6);
        assert!(frame.normals.iter().all(|n| *n == Vec3::ZERO));
    }

    #[test]
    fn custom_compositor_is_used() {
        struct Flat;
        impl Compositor for Flat {
            fn composite(&self, _terms: &ShadingTerms, _background: Vec3) -> Vec3 {
                Vec3::new(1.0, 0.0, 0.0)
            }
        }
        let graph = unit_sphere();
        let frame = Renderer::new(tiny(5, 5))
            .with_compositor(Flat)
            .render(&graph, &[], &front_camera(), &AtomicBool::new(false))
            .unwrap();
        assert_eq!(frame.pixel(2, 2), Vec3::new(1.0, 0.0, 0.0));
    }

    // ------------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------------

    #[test]
    fn images_encode_each_pass() {
        let frame = Frame {
            width: 2,
            height: 1,
            colour: vec![Vec3::ONE, Vec3::splat(0.5)],
            depth: vec![2.0, f32::INFINITY],
            normals: vec![Vec3::Z, Vec3::ZERO],
            stats: RenderStats::default(),
        };

        let rgba = frame.to_rgba_image();
        assert_eq!(rgba.get_pixel(0, 0).0, [255, 255, 255, 255]);
        // 0.5 ^ (1 / 2.2) = 0.7297
        assert_eq!(rgba.get_pixel(1, 0).0[0], 186);

        let depth = frame.depth_image();
        assert_eq!(depth.get_pixel(0, 0).0, [u16::MAX]);
        assert_eq!(depth.get_pixel(1, 0).0, [u16::MAX]);

        let normals = frame.normal_image();
        assert_eq!(normals.get_pixel(0, 0).0, [32768, 32768, u16::MAX]);
        assert_eq!(normals.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
