//! Lights, shadows and ambient occlusion
//!
//! Directional and point lights are positional: they attenuate, cast
//! shadows and follow Lambert's cosine law. Ambient lights add a constant
//! term; ambient occlusion lights scale theirs by how open the surface is.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use umbra_core::eval::Evaluator;
use umbra_core::params::{LightKind, ParamSpec, AO_ITERATIONS, FALLOFF, SHADOW_HARDNESS};

// ============================================================================
// Records
// ============================================================================

/// A light as written in scene files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRecord {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: LightKind,
    /// Direction the light travels (directional lights)
    pub direction: Vec3,
    /// World position (point lights)
    pub position: Vec3,
    /// Sample count (ambient occlusion lights)
    pub iterations: u32,
    pub colour: Vec3,
    pub intensity: f32,
    pub falloff: f32,
    pub soften_shadows: bool,
    pub shadow_hardness: f32,
}

impl Default for LightRecord {
    fn default() -> Self {
        Self {
            name: None,
            kind: LightKind::Directional,
            direction: Vec3::NEG_Y,
            position: Vec3::Y,
            iterations: AO_ITERATIONS.default as u32,
            colour: Vec3::ONE,
            intensity: 1.0,
            falloff: FALLOFF.default,
            soften_shadows: false,
            shadow_hardness: SHADOW_HARDNESS.default,
        }
    }
}

impl LightRecord {
    /// Validate and clamp into a [`Light`], logging each adjustment
    pub fn to_light(&self) -> Light {
        let label = self.name.as_deref().unwrap_or(self.kind.name());
        let clamp = |spec: &ParamSpec, value: f32, field: &str| {
            let (clamped, changed) = spec.clamp(value);
            if changed {
                warn!(light = label, field, original = value, clamped, "light parameter clamped");
            }
            clamped
        };

        let source = match self.kind {
            LightKind::Directional => LightSource::Directional {
                direction: self.direction.try_normalize().unwrap_or_else(|| {
                    warn!(light = label, "zero light direction, pointing down");
                    Vec3::NEG_Y
                }),
            },
            LightKind::Point => LightSource::Point {
                position: self.position,
            },
            LightKind::Ambient => LightSource::Ambient,
            LightKind::AmbientOcclusion => LightSource::AmbientOcclusion {
                iterations: clamp(&AO_ITERATIONS, self.iterations as f32, "iterations") as u32,
            },
        };

        let positional = !self.kind.is_ambient();
        if !positional && (self.falloff != 0.0 || self.soften_shadows) {
            warn!(light = label, "falloff and shadows are ignored on ambient lights");
        }

        Light {
            source,
            colour: self.colour.max(Vec3::ZERO),
            intensity: self.intensity.max(0.0),
            falloff: if positional {
                clamp(&FALLOFF, self.falloff, "falloff")
            } else {
                0.0
            },
            soften_shadows: positional && self.soften_shadows,
            shadow_hardness: clamp(&SHADOW_HARDNESS, self.shadow_hardness, "shadow_hardness"),
        }
    }
}

// ============================================================================
// Lights
// ============================================================================

/// Where light comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    /// Parallel light travelling along a normalised `direction`
    Directional { direction: Vec3 },
    Point { position: Vec3 },
    Ambient,
    AmbientOcclusion { iterations: u32 },
}

/// A validated light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub source: LightSource,
    pub colour: Vec3,
    pub intensity: f32,
    /// Distance attenuation power; point lights only
    pub falloff: f32,
    pub soften_shadows: bool,
    pub shadow_hardness: f32,
}

impl Light {
    fn with_source(source: LightSource) -> Self {
        Self {
            source,
            colour: Vec3::ONE,
            intensity: 1.0,
            falloff: 0.0,
            soften_shadows: false,
            shadow_hardness: SHADOW_HARDNESS.default,
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self::with_source(LightSource::Directional {
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Y),
        })
    }

    pub fn point(position: Vec3) -> Self {
        Self::with_source(LightSource::Point { position })
    }

    pub fn ambient() -> Self {
        Self::with_source(LightSource::Ambient)
    }

    pub fn ambient_occlusion(iterations: u32) -> Self {
        Self::with_source(LightSource::AmbientOcclusion { iterations })
    }

    pub fn with_colour(mut self, colour: Vec3) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        if !self.is_ambient() {
            self.falloff = falloff;
        }
        self
    }

    pub fn with_soft_shadows(mut self, hardness: f32) -> Self {
        if !self.is_ambient() {
            self.soften_shadows = true;
            self.shadow_hardness = hardness;
        }
        self
    }

    pub fn is_ambient(&self) -> bool {
        matches!(
            self.source,
            LightSource::Ambient | LightSource::AmbientOcclusion { .. }
        )
    }

    /// Light arriving at a surface point
    pub fn sample(
        &self,
        evaluator: &Evaluator<'_>,
        position: Vec3,
        normal: Vec3,
        settings: &ShadowSettings,
    ) -> LightSample {
        let base = self.colour * self.intensity;

        let (to_light, distance, attenuation) = match self.source {
            LightSource::Ambient => return LightSample::ambient(base),
            LightSource::AmbientOcclusion { iterations } => {
                let open =
                    ambient_occlusion(evaluator, position, normal, iterations, settings.ao_step);
                return LightSample::ambient(base * open);
            }
            // The direction is that of travel; the surface looks back along it
            LightSource::Directional { direction } => (-direction, settings.max_distance, 1.0),
            LightSource::Point { position: light } => {
                let offset = light - position;
                let distance = offset.length();
                let Some(to_light) = offset.try_normalize() else {
                    return LightSample::ambient(base);
                };
                (to_light, distance, distance.max(1e-6).powf(self.falloff).recip())
            }
        };

        let lambert = normal.dot(to_light).max(0.0);
        if lambert == 0.0 {
            return LightSample {
                direction: Some(to_light),
                radiance: Vec3::ZERO,
                lambert,
            };
        }

        let origin = position + normal * settings.bias;
        let visibility = if self.soften_shadows {
            soft_shadow(evaluator, origin, to_light, distance, self.shadow_hardness, settings)
        } else {
            hard_shadow(evaluator, origin, to_light, distance, settings)
        };

        LightSample {
            direction: Some(to_light),
            radiance: base * attenuation * visibility,
            lambert,
        }
    }
}

/// Incoming light at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Direction towards the light; `None` for ambient light
    pub direction: Option<Vec3>,
    /// Colour and intensity after attenuation and shadowing
    pub radiance: Vec3,
    /// Cosine factor, 1 for ambient light
    pub lambert: f32,
}

impl LightSample {
    fn ambient(radiance: Vec3) -> Self {
        Self {
            direction: None,
            radiance,
            lambert: 1.0,
        }
    }
}

// ============================================================================
// Shadows and occlusion
// ============================================================================

/// Limits for secondary rays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub max_iterations: u32,
    /// Offset along the normal before marching towards a light
    pub bias: f32,
    /// Distance below which a shadow ray is blocked
    pub min_step: f32,
    /// Length of shadow rays towards directional lights
    pub max_distance: f32,
    /// Spacing of ambient occlusion samples along the normal
    pub ao_step: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            max_iterations: 128,
            bias: 1e-2,
            min_step: 1e-4,
            max_distance: 100.0,
            ao_step: 0.05,
        }
    }
}

/// 1 if nothing blocks the segment, otherwise 0
pub fn hard_shadow(
    evaluator: &Evaluator<'_>,
    origin: Vec3,
    direction: Vec3,
    max_t: f32,
    settings: &ShadowSettings,
) -> f32 {
    let mut t = 0.0;
    for _ in 0..settings.max_iterations {
        if t >= max_t {
            return 1.0;
        }
        let h = evaluator.distance(origin + direction * t);
        if h < settings.min_step {
            return 0.0;
        }
        t += h;
    }
    1.0
}

/// Penumbra estimate on [0, 1]; larger `hardness` gives sharper edges
pub fn soft_shadow(
    evaluator: &Evaluator<'_>,
    origin: Vec3,
    direction: Vec3,
    max_t: f32,
    hardness: f32,
    settings: &ShadowSettings,
) -> f32 {
    let mut res: f32 = 1.0;
    let mut t = settings.min_step.max(1e-4);
    for _ in 0..settings.max_iterations {
        if t >= max_t {
            break;
        }
        let h = evaluator.distance(origin + direction * t);
        if h < settings.min_step {
            return 0.0;
        }
        res = res.min(hardness * h / t);
        t += h;
    }
    res.clamp(0.0, 1.0)
}

/// Openness of a surface on [0, 1], 1 meaning unoccluded.
///
/// Samples at `step`, `2 * step`, ... along the normal; nearer samples
/// weigh twice as much as the next.
pub fn ambient_occlusion(
    evaluator: &Evaluator<'_>,
    position: Vec3,
    normal: Vec3,
    iterations: u32,
    step: f32,
) -> f32 {
    if iterations == 0 || step <= 0.0 {
        return 1.0;
    }
    let mut occlusion = 0.0;
    let mut total = 0.0;
    let mut weight = 1.0;
    for i in 1..=iterations {
        let t = step * i as f32;
        let d = evaluator.distance(position + normal * t);
        occlusion += weight * ((t - d.max(0.0)) / t).max(0.0);
        total += weight;
        weight *= 0.5;
    }
    (1.0 - occlusion / total).clamp(0.0, 1.0)
}
