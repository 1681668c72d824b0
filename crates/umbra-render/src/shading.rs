//! Surface shading
//!
//! Lights are gathered into separate diffuse, specular, transmission and
//! emission terms. A [`Compositor`] decides how those terms become a
//! pixel colour.

use crate::light::{Light, ShadowSettings};
use glam::Vec3;
use umbra_core::eval::Evaluator;
use umbra_core::material::{Material, MaterialSample};

/// A shaded surface point
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint<'a> {
    pub position: Vec3,
    pub normal: Vec3,
    /// Unit vector from the surface towards the viewer
    pub view: Vec3,
    /// `None` falls back to [`Material::DEFAULT`]
    pub material: Option<MaterialSample<'a>>,
}

/// Per-term lighting result
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadingTerms {
    /// Lambertian reflection, already scaled by the diffuse fraction
    pub diffuse: Vec3,
    /// Highlight, already scaled by the specular fraction
    pub specular: Vec3,
    /// Weight of light passing through the surface
    pub transmission: Vec3,
    /// Emitted light, independent of any light source
    pub emission: Vec3,
}

/// Gather every light's contribution at a surface point
pub fn shade(
    evaluator: &Evaluator<'_>,
    point: &SurfacePoint<'_>,
    lights: &[Light],
    settings: &ShadowSettings,
) -> ShadingTerms {
    let material = point
        .material
        .as_ref()
        .map_or(&Material::DEFAULT, |sample| sample.material);
    let albedo = point
        .material
        .as_ref()
        .map_or(Material::DEFAULT.colour, MaterialSample::diffuse_colour);

    let diffuse_weight = albedo * material.diffuse_fraction();
    let specular_weight = material.specular_colour * material.specular;
    let shininess = shininess(material.specular_roughness);

    let mut terms = ShadingTerms {
        transmission: transmission_weight(material),
        emission: material.emission(),
        ..ShadingTerms::default()
    };

    for light in lights {
        let sample = light.sample(evaluator, point.position, point.normal, settings);
        terms.diffuse += diffuse_weight * sample.radiance * sample.lambert;

        match sample.direction {
            Some(to_light) if material.specular > 0.0 && sample.lambert > 0.0 => {
                let half = (to_light + point.view).normalize_or_zero();
                let highlight = point.normal.dot(half).max(0.0).powf(shininess);
                terms.specular += specular_weight * sample.radiance * highlight;
            }
            _ => {}
        }
    }

    terms
}

/// Blinn-Phong exponent for a roughness on [0, 1]
fn shininess(roughness: f32) -> f32 {
    let smoothness = 1.0 - roughness.clamp(0.0, 1.0);
    2.0 + smoothness * smoothness * 254.0
}

/// Transmitted fraction, tinted by what the medium absorbs
fn transmission_weight(material: &Material) -> Vec3 {
    (Vec3::ONE - material.extinction_colour).max(Vec3::ZERO) * material.transmission
}

/// Policy turning shading terms into a pixel colour
pub trait Compositor: Send + Sync {
    fn composite(&self, terms: &ShadingTerms, background: Vec3) -> Vec3;
}

/// Sum of terms, with transmission showing the background
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompositor;

impl Compositor for StandardCompositor {
    fn composite(&self, terms: &ShadingTerms, background: Vec3) -> Vec3 {
        terms.diffuse + terms.specular + terms.transmission * background + terms.emission
    }
}
