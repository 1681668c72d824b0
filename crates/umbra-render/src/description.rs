//! JSON scene description files
//!
//! ```json
//! {
//!   "primitives": [
//!     { "shape": "sphere", "dimensions": [1.0], "sibling": 1 },
//!     { "shape": "plane", "dimensions": [0.0, 1.0, 0.0],
//!       "transform": { "translate": [0.0, -1.0, 0.0] } }
//!   ],
//!   "lights": [{ "type": "directional", "direction": [-0.5, -1.0, -0.3] }],
//!   "camera": { "position": [0.0, 1.0, 5.0] },
//!   "settings": { "width": 320, "height": 240 }
//! }
//! ```
//!
//! Every field is optional.

use crate::camera::{Camera, CameraRecord};
use crate::error::Result;
use crate::light::{Light, LightRecord};
use crate::render::RenderSettings;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use tracing::debug;
use umbra_core::material::Material;
use umbra_core::operations::BlendType;
use umbra_core::params::{LightKind, ShapeKind};
use umbra_core::scene::{PrimitiveRecord, SceneGraph};

/// Everything needed to render one image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Flat record list; `sibling` and `children` index into it
    pub primitives: Vec<PrimitiveRecord>,
    /// Empty means a key light plus ambient fill
    pub lights: Vec<LightRecord>,
    pub camera: CameraRecord,
    pub settings: RenderSettings,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let description = Self::from_json(&std::fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            primitives = description.primitives.len(),
            lights = description.lights.len(),
            "scene description loaded"
        );
        Ok(description)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the primitives into a graph and the lights into [`Light`]s
    pub fn build(&self) -> Result<(SceneGraph, Vec<Light>)> {
        let graph = SceneGraph::from_records(&self.primitives)?;
        let lights = if self.lights.is_empty() {
            default_lights()
        } else {
            self.lights.iter().map(LightRecord::to_light).collect()
        };
        Ok((graph, lights))
    }

    /// Camera with the aspect ratio of the configured image
    pub fn camera(&self) -> Camera {
        let aspect = self.settings.width.max(1) as f32 / self.settings.height.max(1) as f32;
        Camera::from(&self.camera).with_aspect(aspect)
    }

    /// A banded barrel and a ball resting on a floor
    pub fn demo() -> Self {
        let wood = Material::diffuse(Vec3::new(0.55, 0.35, 0.18)).with_specular(0.1);
        let iron = Material {
            specular_roughness: 0.3,
            ..Material::diffuse(Vec3::splat(0.35)).with_specular(0.6)
        };
        let paint = Material::diffuse(Vec3::new(0.8, 0.15, 0.1)).with_specular(0.3);

        let band = |y: f32| {
            let mut record = PrimitiveRecord::new(ShapeKind::Torus)
                .with_dimensions(&[0.52, 0.05])
                .at(Vec3::new(0.0, y, 0.0))
                .with_material(iron);
            record.transform.rotate = Vec3::new(FRAC_PI_2, 0.0, 0.0);
            record
        };

        let mut barrel = PrimitiveRecord::new(ShapeKind::Cylinder)
            .named("barrel")
            .with_dimensions(&[0.5, 1.5])
            .with_material(wood)
            .with_blend(BlendType::SmoothUnion, 0.05);
        barrel.edge_radius = 0.02;
        barrel.children = Some(1);
        barrel.sibling = Some(3);

        let mut top_band = band(0.5);
        top_band.sibling = Some(2);

        let mut ball = PrimitiveRecord::new(ShapeKind::Sphere)
            .named("ball")
            .with_dimensions(&[0.35])
            .at(Vec3::new(1.1, -0.4, 0.5))
            .with_material(paint);
        ball.sibling = Some(4);

        let floor = PrimitiveRecord::new(ShapeKind::Plane)
            .named("floor")
            .with_dimensions(&[0.0, 1.0, 0.0])
            .at(Vec3::new(0.0, -0.75, 0.0))
            .with_material(Material::diffuse(Vec3::splat(0.7)));

        Self {
            primitives: vec![barrel, top_band, band(-0.5), ball, floor],
            lights: vec![
                LightRecord {
                    name: Some("key".to_string()),
                    direction: Vec3::new(-0.5, -1.0, -0.3),
                    soften_shadows: true,
                    shadow_hardness: 16.0,
                    ..LightRecord::default()
                },
                LightRecord {
                    name: Some("fill".to_string()),
                    kind: LightKind::AmbientOcclusion,
                    intensity: 0.2,
                    ..LightRecord::default()
                },
            ],
            camera: CameraRecord {
                position: Vec3::new(3.0, 1.5, 3.5),
                target: Vec3::new(0.2, -0.2, 0.0),
                fov: 0.7,
                ..CameraRecord::default()
            },
            settings: RenderSettings::default(),
        }
    }
}

/// Key light from above and to one side, plus a dim ambient fill
pub fn default_lights() -> Vec<Light> {
    vec![
        Light::directional(Vec3::new(-0.5, -1.0, -0.3)),
        Light::ambient().with_intensity(0.15),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::light::LightSource;
    use umbra_core::Error;

    #[test]
    fn partial_file_takes_defaults() {
        let description = SceneDescription::from_json(
            r#"{ "primitives": [{ "shape": "torus" }], "settings": { "width": 32 } }"#,
        )
        .unwrap();
        assert_eq!(description.settings.width, 32);
        assert_eq!(description.settings.height, RenderSettings::default().height);

        let (graph, lights) = description.build().unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[1].source, LightSource::Ambient);
    }

    #[test]
    fn empty_document_is_an_empty_scene() {
        let (graph, _) = SceneDescription::from_json("{}").unwrap().build().unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn malformed_links_fail_the_build() {
        let description = SceneDescription::from_json(
            r#"{ "primitives": [{ "sibling": 1 }, { "sibling": 0 }] }"#,
        )
        .unwrap();
        assert!(matches!(
            description.build(),
            Err(RenderError::Scene(Error::MalformedGraph(_)))
        ));
    }

    #[test]
    fn unknown_shape_is_a_parse_error() {
        let result = SceneDescription::from_json(r#"{ "primitives": [{ "shape": "teapot" }] }"#);
        assert!(matches!(result, Err(RenderError::Json(_))));
    }

    #[test]
    fn demo_builds_cleanly() {
        let demo = SceneDescription::demo();
        let (graph, lights) = demo.build().unwrap();
        assert_eq!(graph.roots().len(), 1);
        assert_eq!(graph.chain(graph.roots()[0]).count(), 3);
        assert!(graph.normalizations().is_empty());
        assert!(lights[0].soften_shadows);

        let reparsed = SceneDescription::from_json(&demo.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.primitives.len(), demo.primitives.len());
    }

    #[test]
    fn camera_takes_image_aspect() {
        let mut description = SceneDescription::default();
        description.settings.width = 200;
        description.settings.height = 100;
        assert_eq!(description.camera().aspect, 2.0);
    }
}
