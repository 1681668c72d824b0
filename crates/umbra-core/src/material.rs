//! Surface material terms
//!
//! A material splits incoming light three ways: diffuse, specular and
//! transmission. The specular and transmission fractions share the unit
//! interval, so raising one lowers the other when their sum would pass 1.

use crate::params::{EMISSION_STRENGTH, REFRACTIVE_INDEX, UNIT_INTERVAL};
use crate::scene::NodeId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Per-node material parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Diffuse colour (RGB, 0-1)
    pub colour: Vec3,
    /// Fraction of light reflected specularly
    pub specular: f32,
    pub specular_roughness: f32,
    pub specular_colour: Vec3,
    /// Fraction of light transmitted through the surface
    pub transmission: f32,
    pub refractive_index: f32,
    /// Colour absorbed while travelling through the medium
    pub extinction_colour: Vec3,
    pub scattering_colour: Vec3,
    pub emission_colour: Vec3,
    pub emission_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Material {
    /// White, fully diffuse, non-emissive
    pub const DEFAULT: Material = Material {
        colour: Vec3::ONE,
        specular: 0.0,
        specular_roughness: 0.0,
        specular_colour: Vec3::ONE,
        transmission: 0.0,
        refractive_index: 1.5,
        extinction_colour: Vec3::ZERO,
        scattering_colour: Vec3::ZERO,
        emission_colour: Vec3::ONE,
        emission_strength: 0.0,
    };

    /// A plain diffuse material
    pub fn diffuse(colour: Vec3) -> Self {
        Self {
            colour,
            ..Self::default()
        }
    }

    /// Set the specular fraction, lowering transmission if the pair would exceed 1
    pub fn set_specular(&mut self, value: f32) {
        self.specular = unit(value);
        if self.specular + self.transmission > 1.0 {
            self.transmission = 1.0 - self.specular;
        }
    }

    /// Set the transmission fraction, lowering specular if the pair would exceed 1
    pub fn set_transmission(&mut self, value: f32) {
        self.transmission = unit(value);
        if self.specular + self.transmission > 1.0 {
            self.specular = 1.0 - self.transmission;
        }
    }

    pub fn with_specular(mut self, value: f32) -> Self {
        self.set_specular(value);
        self
    }

    pub fn with_transmission(mut self, value: f32) -> Self {
        self.set_transmission(value);
        self
    }

    pub fn with_emission(mut self, colour: Vec3, strength: f32) -> Self {
        self.emission_colour = colour;
        self.emission_strength = strength;
        self
    }

    /// Share of light that is diffusely reflected
    pub fn diffuse_fraction(&self) -> f32 {
        (1.0 - self.specular - self.transmission).max(0.0)
    }

    /// Radiance emitted regardless of lighting
    pub fn emission(&self) -> Vec3 {
        self.emission_colour * self.emission_strength
    }

    /// Clamp every term into its range.
    ///
    /// Returns `(field, original, clamped)` for each adjusted term. When
    /// specular and transmission together exceed 1, transmission gives way.
    pub fn clamp_terms(&mut self) -> Vec<(&'static str, f32, f32)> {
        let mut adjusted = Vec::new();

        clamp_scalar(
            &mut self.specular,
            UNIT_INTERVAL.min,
            UNIT_INTERVAL.max,
            0.0,
            "specular",
            &mut adjusted,
        );
        clamp_scalar(
            &mut self.specular_roughness,
            UNIT_INTERVAL.min,
            UNIT_INTERVAL.max,
            0.0,
            "specular_roughness",
            &mut adjusted,
        );
        clamp_scalar(
            &mut self.transmission,
            UNIT_INTERVAL.min,
            UNIT_INTERVAL.max,
            0.0,
            "transmission",
            &mut adjusted,
        );
        clamp_scalar(
            &mut self.refractive_index,
            REFRACTIVE_INDEX.min,
            REFRACTIVE_INDEX.max,
            REFRACTIVE_INDEX.default,
            "refractive_index",
            &mut adjusted,
        );
        clamp_scalar(
            &mut self.emission_strength,
            EMISSION_STRENGTH.min,
            EMISSION_STRENGTH.max,
            EMISSION_STRENGTH.default,
            "emission_strength",
            &mut adjusted,
        );

        if self.specular + self.transmission > 1.0 {
            let original = self.transmission;
            self.transmission = 1.0 - self.specular;
            adjusted.push(("transmission", original, self.transmission));
        }

        for (name, colour) in [
            ("colour", &mut self.colour),
            ("specular_colour", &mut self.specular_colour),
            ("extinction_colour", &mut self.extinction_colour),
            ("scattering_colour", &mut self.scattering_colour),
            ("emission_colour", &mut self.emission_colour),
        ] {
            let clamped = if colour.is_nan() {
                Vec3::ZERO
            } else {
                colour.clamp(Vec3::ZERO, Vec3::ONE)
            };
            if clamped != *colour {
                adjusted.push((name, colour.max_element(), clamped.max_element()));
                *colour = clamped;
            }
        }

        adjusted
    }
}

/// The material in effect at an evaluated point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSample<'a> {
    /// Node that supplied the material
    pub node: NodeId,
    pub material: &'a Material,
    /// Orbit-trap colour reported by fractal shapes
    pub trap: Option<Vec3>,
    /// How strongly the trap colour replaces the material colour
    pub trap_blend: f32,
}

impl MaterialSample<'_> {
    /// Diffuse colour after orbit-trap colouring
    pub fn diffuse_colour(&self) -> Vec3 {
        match self.trap {
            Some(trap) => self
                .material
                .colour
                .lerp(self.material.colour * trap, self.trap_blend.clamp(0.0, 1.0)),
            None => self.material.colour,
        }
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn clamp_scalar(
    value: &mut f32,
    min: f32,
    max: f32,
    fallback: f32,
    name: &'static str,
    adjusted: &mut Vec<(&'static str, f32, f32)>,
) {
    let clamped = if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    };
    if clamped != *value {
        adjusted.push((name, *value, clamped));
        *value = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn raising_specular_lowers_transmission() {
        let mut m = Material::default();
        m.set_transmission(0.5);
        m.set_specular(0.7);
        assert_relative_eq!(m.specular, 0.7);
        assert_relative_eq!(m.transmission, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn raising_transmission_lowers_specular() {
        let mut m = Material::default();
        m.set_specular(0.5);
        m.set_transmission(0.7);
        assert_relative_eq!(m.transmission, 0.7);
        assert_relative_eq!(m.specular, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn edits_within_budget_leave_the_other_term() {
        let m = Material::default().with_specular(0.2).with_transmission(0.3);
        assert_relative_eq!(m.specular, 0.2);
        assert_relative_eq!(m.transmission, 0.3);
        assert_relative_eq!(m.diffuse_fraction(), 0.5);
    }

    #[test]
    fn setters_clamp_to_unit_interval() {
        let m = Material::default().with_specular(4.0);
        assert_relative_eq!(m.specular, 1.0);
        assert_relative_eq!(m.transmission, 0.0);
        assert_relative_eq!(m.diffuse_fraction(), 0.0);
    }

    #[test]
    fn clamp_terms_reports_adjustments() {
        let mut m = Material {
            specular: 0.8,
            transmission: 0.6,
            colour: Vec3::new(2.0, 0.5, 0.5),
            ..Material::default()
        };
        let adjusted = m.clamp_terms();
        assert_relative_eq!(m.transmission, 0.2, epsilon = 1e-6);
        assert_eq!(m.colour, Vec3::new(1.0, 0.5, 0.5));
        let fields: Vec<_> = adjusted.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(fields, vec!["transmission", "colour"]);
    }

    #[test]
    fn emission_scales_colour() {
        let m = Material::default().with_emission(Vec3::new(1.0, 0.5, 0.0), 2.0);
        assert_eq!(m.emission(), Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn trap_colour_blends_into_diffuse() {
        let material = Material::diffuse(Vec3::ONE);
        let sample = MaterialSample {
            node: NodeId(0),
            material: &material,
            trap: Some(Vec3::new(0.2, 0.4, 0.6)),
            trap_blend: 0.5,
        };
        let c = sample.diffuse_colour();
        assert_relative_eq!(c.x, 0.6, epsilon = 1e-6);
        assert_relative_eq!(c.z, 0.8, epsilon = 1e-6);
    }
}
