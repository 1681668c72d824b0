//! Blend operators, point modifiers and distance modifiers
//!
//! Point modifiers rewrite the query point before a shape is evaluated;
//! distance modifiers rewrite the distance afterwards. Neither touches the
//! stored geometry.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

// ============================================================================
// Blend Operations
// ============================================================================

/// How a node combines with its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendType {
    #[default]
    Union,
    Subtraction,
    Intersection,
    SmoothUnion,
    SmoothSubtraction,
    SmoothIntersection,
}

/// Result of blending a parent distance with a child distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blended {
    pub distance: f32,
    /// The child is the nearest contributor and supplies the material
    pub child_wins: bool,
}

impl BlendType {
    /// Every operator, in knob order
    pub const ALL: [BlendType; 6] = [
        BlendType::Union,
        BlendType::Subtraction,
        BlendType::Intersection,
        BlendType::SmoothUnion,
        BlendType::SmoothSubtraction,
        BlendType::SmoothIntersection,
    ];

    /// Display name, as shown on the blend knob
    pub fn name(self) -> &'static str {
        match self {
            BlendType::Union => "union",
            BlendType::Subtraction => "subtraction",
            BlendType::Intersection => "intersection",
            BlendType::SmoothUnion => "smooth union",
            BlendType::SmoothSubtraction => "smooth subtraction",
            BlendType::SmoothIntersection => "smooth intersection",
        }
    }

    /// Parse a display name; case, padding and underscores are ignored
    pub fn from_name(name: &str) -> Option<BlendType> {
        let wanted = name.trim().replace('_', " ").to_lowercase();
        Self::ALL.into_iter().find(|blend| blend.name() == wanted)
    }

    /// Whether blend strength has any effect
    pub fn is_smooth(self) -> bool {
        matches!(
            self,
            BlendType::SmoothUnion | BlendType::SmoothSubtraction | BlendType::SmoothIntersection
        )
    }

    /// The hard operator a smooth variant interpolates around
    pub fn hard(self) -> BlendType {
        match self {
            BlendType::SmoothUnion => BlendType::Union,
            BlendType::SmoothSubtraction => BlendType::Subtraction,
            BlendType::SmoothIntersection => BlendType::Intersection,
            hard => hard,
        }
    }

    /// Combine a parent distance with a child distance.
    ///
    /// Smooth variants with `strength <= 0` are exactly their hard operator.
    /// The material choice always follows the hard operator's branch, with
    /// ties going to the parent.
    pub fn apply(self, parent: f32, child: f32, strength: f32) -> Blended {
        let child_wins = match self.hard() {
            BlendType::Union => child < parent,
            BlendType::Subtraction => -child > parent,
            _ => child > parent,
        };
        let distance = match self {
            BlendType::Union => union(parent, child),
            BlendType::Subtraction => subtraction(parent, child),
            BlendType::Intersection => intersection(parent, child),
            BlendType::SmoothUnion => smooth_union(parent, child, strength),
            BlendType::SmoothSubtraction => smooth_subtraction(parent, child, strength),
            BlendType::SmoothIntersection => smooth_intersection(parent, child, strength),
        };
        Blended {
            distance,
            child_wins,
        }
    }
}

/// Hard union: the nearer of the two surfaces
pub fn union(a: f32, b: f32) -> f32 {
    a.min(b)
}

/// Carve `b` out of `a`
pub fn subtraction(a: f32, b: f32) -> f32 {
    a.max(-b)
}

/// Hard intersection: only where both shapes overlap
pub fn intersection(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// Polynomial smooth minimum
pub fn smooth_union(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return union(a, b);
    }
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    lerp(b, a, h) - k * h * (1.0 - h)
}

/// Carve `b` out of `a` with a fillet of radius `k`
pub fn smooth_subtraction(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return subtraction(a, b);
    }
    let h = (0.5 - 0.5 * (b + a) / k).clamp(0.0, 1.0);
    lerp(a, -b, h) + k * h * (1.0 - h)
}

/// Polynomial smooth maximum
pub fn smooth_intersection(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return intersection(a, b);
    }
    let h = (0.5 - 0.5 * (b - a) / k).clamp(0.0, 1.0);
    lerp(b, a, h) + k * h * (1.0 - h)
}

// ============================================================================
// Point Modifiers
// ============================================================================

/// Wrap the point into a cell centred on the origin.
///
/// Axes with zero spacing are left untouched.
pub fn repeat_infinite(p: Vec3, spacing: Vec3) -> Vec3 {
    Vec3::new(
        wrap_axis(p.x, spacing.x),
        wrap_axis(p.y, spacing.y),
        wrap_axis(p.z, spacing.z),
    )
}

fn wrap_axis(x: f32, s: f32) -> f32 {
    if s > 0.0 {
        (x + 0.5 * s).rem_euclid(s) - 0.5 * s
    } else {
        x
    }
}

/// Reflect the point into the nearest of `2 * extent + 1` cells per axis.
///
/// Extents are rounded to whole cell counts. Axes with zero spacing are
/// left untouched.
pub fn repeat_finite(p: Vec3, extent: Vec3, spacing: Vec3) -> Vec3 {
    Vec3::new(
        limit_axis(p.x, extent.x, spacing.x),
        limit_axis(p.y, extent.y, spacing.y),
        limit_axis(p.z, extent.z, spacing.z),
    )
}

fn limit_axis(x: f32, l: f32, s: f32) -> f32 {
    if s > 0.0 {
        let l = l.round().max(0.0);
        x - s * (x / s).round().max(-l).min(l)
    } else {
        x
    }
}

/// Stretch a shape by collapsing the central slab of half-width `h`
pub fn elongate(p: Vec3, h: Vec3) -> Vec3 {
    p - p.max(-h).min(h)
}

/// Reflect negative coordinates onto the positive side for each flagged axis
pub fn mirror(p: Vec3, axes: [bool; 3]) -> Vec3 {
    let [x, y, z] = axes;
    Vec3::new(
        if x { p.x.abs() } else { p.x },
        if y { p.y.abs() } else { p.y },
        if z { p.z.abs() } else { p.z },
    )
}

// ============================================================================
// Distance Modifiers
// ============================================================================

/// Keep only a wall of `thickness` just inside the surface
pub fn hollow(d: f32, thickness: f32) -> f32 {
    d.max(-(d + thickness))
}

/// Inflate the surface by `radius`, rounding every edge
pub fn round_edges(d: f32, radius: f32) -> f32 {
    d - radius
}

// ============================================================================
// Transform
// ============================================================================

/// Rigid placement plus uniform scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    inverse: Quat,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No translation, rotation or scale
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        inverse: Quat::IDENTITY,
        scale: 1.0,
    };

    /// Build from a translation, XYZ Euler angles in radians and a uniform scale
    pub fn new(translation: Vec3, euler: Vec3, scale: f32) -> Self {
        let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
        Self {
            translation,
            rotation,
            inverse: rotation.inverse(),
            scale,
        }
    }

    /// Move a world point into the node's unscaled local frame
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        self.inverse * (p - self.translation)
    }

    /// Evaluate a distance function defined at unit scale
    pub fn scaled<F: FnOnce(Vec3) -> f32>(&self, p: Vec3, f: F) -> f32 {
        f(p / self.scale) * self.scale
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ------------------------------------------------------------------------
    // Blend Operations
    // ------------------------------------------------------------------------

    #[test]
    fn smooth_variants_reduce_to_hard_at_zero_strength() {
        let pairs = [(0.3, -0.2), (-1.0, 0.5), (0.25, 0.25), (2.0, 1.5)];
        for (a, b) in pairs {
            assert_eq!(smooth_union(a, b, 0.0), union(a, b));
            assert_eq!(smooth_subtraction(a, b, 0.0), subtraction(a, b));
            assert_eq!(smooth_intersection(a, b, 0.0), intersection(a, b));
        }
    }

    #[test]
    fn smooth_union_is_symmetric() {
        for (a, b) in [(0.1, 0.3), (-0.4, 0.2), (1.0, 0.95)] {
            assert_relative_eq!(
                smooth_union(a, b, 0.3),
                smooth_union(b, a, 0.3),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn smooth_union_never_exceeds_hard_union() {
        for (a, b) in [(0.1, 0.12), (0.5, -0.5), (0.0, 0.0)] {
            assert!(smooth_union(a, b, 0.2) <= union(a, b) + 1e-6);
        }
    }

    #[test]
    fn smooth_union_matches_hard_far_apart() {
        assert_relative_eq!(smooth_union(1.0, 5.0, 0.2), 1.0, epsilon = 1e-6);
        assert_relative_eq!(smooth_intersection(1.0, 5.0, 0.2), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn smooth_blend_lowers_equal_distances() {
        // Equal inputs sit at h = 0.5 where the kernel bulges by k / 4
        assert_relative_eq!(smooth_union(0.5, 0.5, 0.4), 0.4, epsilon = 1e-6);
    }

    #[test]
    fn apply_reports_nearest_contributor() {
        let b = BlendType::Union.apply(0.5, 0.2, 0.0);
        assert!(b.child_wins);
        assert_relative_eq!(b.distance, 0.2);

        let b = BlendType::Union.apply(0.2, 0.2, 0.0);
        assert!(!b.child_wins, "ties go to the parent");

        let b = BlendType::Subtraction.apply(0.1, -0.5, 0.0);
        assert!(b.child_wins);
        assert_relative_eq!(b.distance, 0.5);

        let b = BlendType::Intersection.apply(-0.3, 0.1, 0.0);
        assert!(b.child_wins);
    }

    #[test]
    fn blend_names_round_trip() {
        for blend in BlendType::ALL {
            assert_eq!(BlendType::from_name(blend.name()), Some(blend));
        }
        assert!(BlendType::SmoothUnion.is_smooth());
        assert!(!BlendType::Intersection.is_smooth());
        assert_eq!(BlendType::SmoothSubtraction.hard(), BlendType::Subtraction);
    }

    // ------------------------------------------------------------------------
    // Repetition
    // ------------------------------------------------------------------------

    #[test]
    fn infinite_repetition_is_periodic() {
        let spacing = Vec3::new(2.0, 3.0, 0.0);
        let p = Vec3::new(0.3, -0.7, 5.0);
        for k in [-3.0, -1.0, 1.0, 4.0] {
            let shifted = p + Vec3::new(k * spacing.x, 0.0, 0.0);
            let a = repeat_infinite(p, spacing);
            let b = repeat_infinite(shifted, spacing);
            assert_relative_eq!(a.x, b.x, epsilon = 1e-4);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn infinite_repetition_centres_cells() {
        let q = repeat_infinite(Vec3::new(2.1, 0.0, 0.0), Vec3::splat(2.0));
        assert_relative_eq!(q.x, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn zero_spacing_axis_passes_through() {
        let p = Vec3::new(1.0, 7.5, -3.25);
        let q = repeat_infinite(p, Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(q.y, 7.5);
        assert_relative_eq!(q.z, -3.25);
        let q = repeat_finite(p, Vec3::ONE, Vec3::ZERO);
        assert_eq!(q, p);
    }

    #[test]
    fn finite_repetition_stops_at_extent() {
        let spacing = Vec3::splat(1.0);
        let extent = Vec3::splat(2.0);
        // Inside the lattice: wrapped into a cell
        let q = repeat_finite(Vec3::new(2.1, 0.0, 0.0), extent, spacing);
        assert_relative_eq!(q.x, 0.1, epsilon = 1e-5);
        // Beyond the last copy: measured from the outermost cell
        let q = repeat_finite(Vec3::new(5.0, 0.0, 0.0), extent, spacing);
        assert_relative_eq!(q.x, 3.0, epsilon = 1e-5);
        let q = repeat_finite(Vec3::new(-5.0, 0.0, 0.0), extent, spacing);
        assert_relative_eq!(q.x, -3.0, epsilon = 1e-5);
    }

    // ------------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------------

    #[test]
    fn elongation_collapses_the_core() {
        let h = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(elongate(Vec3::new(0.5, 0.2, 0.0), h), Vec3::new(0.0, 0.2, 0.0));
        assert_eq!(elongate(Vec3::new(1.5, 0.0, 0.0), h), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(elongate(Vec3::new(-1.5, 0.0, 0.0), h), Vec3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn mirror_flips_selected_axes() {
        let p = Vec3::new(-1.0, -2.0, -3.0);
        assert_eq!(mirror(p, [true, false, true]), Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(mirror(p, [false; 3]), p);
    }

    #[test]
    fn hollow_keeps_a_wall() {
        let t = 0.1;
        assert!(hollow(-0.05, t) < 0.0, "inside the wall");
        assert!(hollow(-0.5, t) > 0.0, "carved interior");
        assert_relative_eq!(hollow(0.3, t), 0.3);
    }

    #[test]
    fn round_edges_inflates() {
        assert_relative_eq!(round_edges(0.5, 0.2), 0.3);
    }

    // ------------------------------------------------------------------------
    // Transform
    // ------------------------------------------------------------------------

    #[test]
    fn transform_moves_into_local_frame() {
        let t = Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            1.0,
        );
        let local = t.to_local(Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(local.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(local.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn scaled_preserves_distance_units() {
        let t = Transform::new(Vec3::ZERO, Vec3::ZERO, 2.0);
        let d = t.scaled(Vec3::new(3.0, 0.0, 0.0), |q| q.length() - 1.0);
        assert_relative_eq!(d, 1.0, epsilon = 1e-6);
    }
}
