//! Pinhole camera and primary rays

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A ray with a normalised direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Point `t` units along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A look-at camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at
    pub target: Vec3,
    /// Up vector (usually Y-up)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.0, 1.5, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }
}

impl Camera {
    /// Create a camera looking at a target from a position
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Forward direction; -Z when position and target coincide
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    /// Right direction, stable when looking along the up vector
    pub fn right(&self) -> Vec3 {
        let forward = self.forward();
        forward
            .cross(self.up)
            .try_normalize()
            .or_else(|| forward.cross(Vec3::Z).try_normalize())
            .unwrap_or(Vec3::X)
    }

    /// Up direction orthogonal to forward and right
    pub fn actual_up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Get distance from camera to target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Ray through normalised screen coordinates.
    ///
    /// `u` runs -1 (left) to 1 (right), `v` runs -1 (bottom) to 1 (top).
    pub fn ray(&self, u: f32, v: f32) -> Ray {
        let half_height = (self.fov * 0.5).tan();
        let half_width = half_height * self.aspect;
        let direction = self.forward()
            + self.right() * (u * half_width)
            + self.actual_up() * (v * half_height);
        Ray {
            origin: self.position,
            direction: direction.try_normalize().unwrap_or_else(|| self.forward()),
        }
    }

    /// Ray through the centre of pixel (`x`, `y`), row 0 at the top
    pub fn pixel_ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let u = ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0;
        let v = 1.0 - ((y as f32 + 0.5) / height as f32) * 2.0;
        self.ray(u, v)
    }
}

/// Camera as written in scene files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRecord {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
}

impl Default for CameraRecord {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: camera.position,
            target: camera.target,
            up: camera.up,
            fov: camera.fov,
        }
    }
}

impl From<&CameraRecord> for Camera {
    fn from(record: &CameraRecord) -> Self {
        Self {
            position: record.position,
            target: record.target,
            up: record.up,
            fov: record.fov,
            ..Camera::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centre_ray_points_at_target() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let ray = camera.ray(0.0, 0.0);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-6);
        assert_eq!(ray.origin, camera.position);
        assert_relative_eq!(ray.at(5.0).length(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn pixel_rays_span_the_frustum() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO).with_aspect(1.0);
        let top_left = camera.pixel_ray(0, 0, 64, 64);
        let bottom_right = camera.pixel_ray(63, 63, 64, 64);
        assert!(top_left.direction.x < 0.0 && top_left.direction.y > 0.0);
        assert!(bottom_right.direction.x > 0.0 && bottom_right.direction.y < 0.0);
        assert_relative_eq!(top_left.direction.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn looking_straight_down_is_stable() {
        let camera = Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO);
        let ray = camera.ray(0.5, 0.5);
        assert!(ray.direction.is_finite());
        assert!(ray.direction.y < 0.0);
    }

    #[test]
    fn record_converts_to_camera() {
        let record: CameraRecord =
            serde_json::from_str(r#"{ "position": [0.0, 1.0, 4.0], "fov": 0.8 }"#).unwrap();
        let camera = Camera::from(&record);
        assert_eq!(camera.position, Vec3::new(0.0, 1.0, 4.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_relative_eq!(camera.fov, 0.8);
    }
}
