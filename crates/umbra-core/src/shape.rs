//! Closed-form distance functions for every shape family
//!
//! Shapes are centred on the origin in their local frame. Rotational shapes
//! use the y-axis as their axis of symmetry unless noted otherwise; the
//! torus family lies in the xy-plane.

// Mathematical formulas use standard notation with single-char variable names
// Explicit match arms for each shape improve readability even if bodies are similar
#![allow(clippy::many_single_char_names)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]

use crate::params::ShapeKind;
use glam::{Vec2, Vec3, Vec4};

/// Smallest magnitude used when a parameter ends up in a denominator
const GUARD: f32 = 1e-6;

/// A shape with its dimensions resolved into named fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere {
        radius: f32,
    },
    Ellipsoid {
        radii: Vec3,
    },
    /// Sphere with everything above `height` cut away
    CutSphere {
        radius: f32,
        height: f32,
    },
    /// Thin spherical shell with an opening above `height`
    HollowSphere {
        radius: f32,
        height: f32,
        thickness: f32,
    },
    DeathStar {
        solid_radius: f32,
        hollow_radius: f32,
        hollow_height: f32,
    },
    SolidAngle {
        radius: f32,
        angle: f32,
    },
    RectangularPrism {
        size: Vec3,
    },
    RectangularPrismFrame {
        size: Vec3,
        thickness: f32,
    },
    Rhombus {
        width: f32,
        height: f32,
        depth: f32,
        corner_radius: f32,
    },
    TriangularPrism {
        base: f32,
        depth: f32,
    },
    Cylinder {
        radius: f32,
        height: f32,
    },
    InfiniteCylinder {
        radius: f32,
    },
    /// Plane through the origin; `normal` is unit length
    Plane {
        normal: Vec3,
    },
    Capsule {
        radius: f32,
        negative_height: f32,
        positive_height: f32,
    },
    /// Tip at the origin, base at `height`
    Cone {
        angle: f32,
        height: f32,
    },
    InfiniteCone {
        angle: f32,
    },
    CappedCone {
        height: f32,
        lower_radius: f32,
        upper_radius: f32,
    },
    RoundedCone {
        height: f32,
        lower_radius: f32,
        upper_radius: f32,
    },
    Torus {
        ring_radius: f32,
        tube_radius: f32,
    },
    CappedTorus {
        ring_radius: f32,
        tube_radius: f32,
        cap_angle: f32,
    },
    Link {
        ring_radius: f32,
        tube_radius: f32,
        height: f32,
    },
    HexagonalPrism {
        height: f32,
        depth: f32,
    },
    Octahedron {
        radial_extent: f32,
    },
    Mandelbulb {
        power: f32,
        iterations: u32,
        max_square_radius: f32,
        trap_blend: f32,
    },
    Mandelbox {
        scale: f32,
        iterations: u32,
        min_square_radius: f32,
        folding_limit: f32,
    },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Sphere { radius: 0.5 }
    }
}

impl Shape {
    /// Build a shape from its dimension slots (x, y, z, w).
    ///
    /// Values are used as given; range clamping is the builder's job.
    pub fn from_params(kind: ShapeKind, d: [f32; 4]) -> Self {
        let [x, y, z, w] = d;
        match kind {
            ShapeKind::Sphere => Shape::Sphere { radius: x },
            ShapeKind::Ellipsoid => Shape::Ellipsoid {
                radii: Vec3::new(x, y, z),
            },
            ShapeKind::CutSphere => Shape::CutSphere {
                radius: x,
                height: y,
            },
            ShapeKind::HollowSphere => Shape::HollowSphere {
                radius: x,
                height: y,
                thickness: z,
            },
            ShapeKind::DeathStar => Shape::DeathStar {
                solid_radius: x,
                hollow_radius: y,
                hollow_height: z,
            },
            ShapeKind::SolidAngle => Shape::SolidAngle {
                radius: x,
                angle: y,
            },
            ShapeKind::RectangularPrism => Shape::RectangularPrism {
                size: Vec3::new(x, y, z),
            },
            ShapeKind::RectangularPrismFrame => Shape::RectangularPrismFrame {
                size: Vec3::new(x, y, z),
                thickness: w,
            },
            ShapeKind::Rhombus => Shape::Rhombus {
                width: x,
                height: y,
                depth: z,
                corner_radius: w,
            },
            ShapeKind::TriangularPrism => Shape::TriangularPrism { base: x, depth: y },
            ShapeKind::Cylinder => Shape::Cylinder {
                radius: x,
                height: y,
            },
            ShapeKind::InfiniteCylinder => Shape::InfiniteCylinder { radius: x },
            ShapeKind::Plane => Shape::Plane {
                normal: Vec3::new(x, y, z).try_normalize().unwrap_or(Vec3::Z),
            },
            ShapeKind::Capsule => Shape::Capsule {
                radius: x,
                negative_height: y,
                positive_height: z,
            },
            ShapeKind::Cone => Shape::Cone {
                angle: x,
                height: y,
            },
            ShapeKind::InfiniteCone => Shape::InfiniteCone { angle: x },
            ShapeKind::CappedCone => Shape::CappedCone {
                height: x,
                lower_radius: y,
                upper_radius: z,
            },
            ShapeKind::RoundedCone => Shape::RoundedCone {
                height: x,
                lower_radius: y,
                upper_radius: z,
            },
            ShapeKind::Torus => Shape::Torus {
                ring_radius: x,
                tube_radius: y,
            },
            ShapeKind::CappedTorus => Shape::CappedTorus {
                ring_radius: x,
                tube_radius: y,
                cap_angle: z,
            },
            ShapeKind::Link => Shape::Link {
                ring_radius: x,
                tube_radius: y,
                height: z,
            },
            ShapeKind::HexagonalPrism => Shape::HexagonalPrism {
                height: x,
                depth: y,
            },
            ShapeKind::Octahedron => Shape::Octahedron { radial_extent: x },
            ShapeKind::Mandelbulb => Shape::Mandelbulb {
                power: x,
                iterations: iteration_count(y),
                max_square_radius: z,
                trap_blend: w,
            },
            ShapeKind::Mandelbox => Shape::Mandelbox {
                scale: x,
                iterations: iteration_count(y),
                min_square_radius: z,
                folding_limit: w,
            },
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Ellipsoid { .. } => ShapeKind::Ellipsoid,
            Shape::CutSphere { .. } => ShapeKind::CutSphere,
            Shape::HollowSphere { .. } => ShapeKind::HollowSphere,
            Shape::DeathStar { .. } => ShapeKind::DeathStar,
            Shape::SolidAngle { .. } => ShapeKind::SolidAngle,
            Shape::RectangularPrism { .. } => ShapeKind::RectangularPrism,
            Shape::RectangularPrismFrame { .. } => ShapeKind::RectangularPrismFrame,
            Shape::Rhombus { .. } => ShapeKind::Rhombus,
            Shape::TriangularPrism { .. } => ShapeKind::TriangularPrism,
            Shape::Cylinder { .. } => ShapeKind::Cylinder,
            Shape::InfiniteCylinder { .. } => ShapeKind::InfiniteCylinder,
            Shape::Plane { .. } => ShapeKind::Plane,
            Shape::Capsule { .. } => ShapeKind::Capsule,
            Shape::Cone { .. } => ShapeKind::Cone,
            Shape::InfiniteCone { .. } => ShapeKind::InfiniteCone,
            Shape::CappedCone { .. } => ShapeKind::CappedCone,
            Shape::RoundedCone { .. } => ShapeKind::RoundedCone,
            Shape::Torus { .. } => ShapeKind::Torus,
            Shape::CappedTorus { .. } => ShapeKind::CappedTorus,
            Shape::Link { .. } => ShapeKind::Link,
            Shape::HexagonalPrism { .. } => ShapeKind::HexagonalPrism,
            Shape::Octahedron { .. } => ShapeKind::Octahedron,
            Shape::Mandelbulb { .. } => ShapeKind::Mandelbulb,
            Shape::Mandelbox { .. } => ShapeKind::Mandelbox,
        }
    }

    /// How strongly the orbit-trap colour replaces the material colour.
    ///
    /// Zero for non-fractal shapes.
    pub fn trap_blend(&self) -> f32 {
        match self {
            Shape::Mandelbulb { trap_blend, .. } => *trap_blend,
            Shape::Mandelbox { .. } => 1.0,
            _ => 0.0,
        }
    }

    /// Signed distance from `p` to the surface, negative inside
    pub fn distance(&self, p: Vec3) -> f32 {
        self.distance_with_trap(p).0
    }

    /// Signed distance plus, for fractals, an orbit-trap colour in [0, 1]^3
    pub fn distance_with_trap(&self, p: Vec3) -> (f32, Option<Vec3>) {
        let d = match *self {
            Shape::Sphere { radius } => p.length() - radius,

            Shape::Ellipsoid { radii } => {
                let r = radii.max(Vec3::splat(GUARD));
                let k0 = (p / r).length();
                let k1 = (p / (r * r)).length();
                if k1 < GUARD {
                    -r.min_element()
                } else {
                    k0 * (k0 - 1.0) / k1
                }
            }

            Shape::CutSphere { radius, height } => {
                let q = cylindrical(p);
                let w2 = (radius * radius - height * height).max(0.0);
                let w = w2.sqrt();
                let s = (w2 * (radius - height + 2.0 * q.y) - (radius + height) * q.x * q.x)
                    .max(w * q.y - height * q.x);
                if s < 0.0 {
                    q.length() - radius
                } else if q.x < w {
                    q.y - height
                } else {
                    (q - Vec2::new(w, height)).length()
                }
            }

            Shape::HollowSphere {
                radius,
                height,
                thickness,
            } => {
                let q = cylindrical(p);
                let w = (radius * radius - height * height).max(0.0).sqrt();
                let half = thickness * 0.5;
                if height * q.x < w * q.y {
                    (q - Vec2::new(w, height)).length() - half
                } else {
                    (q.length() - radius).abs() - half
                }
            }

            Shape::DeathStar {
                solid_radius: ra,
                hollow_radius: rb,
                hollow_height,
            } => {
                let q = cylindrical(p);
                let d = hollow_height.max(GUARD);
                let a = (ra * ra - rb * rb + d * d) / (2.0 * d);
                let b = (ra * ra - a * a).max(0.0).sqrt();
                if d * (b - q.x).max(0.0) < q.y * b - q.x * a {
                    (q - Vec2::new(b, a)).length()
                } else {
                    (q.length() - ra).max(rb - (q - Vec2::new(0.0, d)).length())
                }
            }

            Shape::SolidAngle { radius, angle } => {
                let q = cylindrical(p);
                let c = Vec2::new(angle.sin(), angle.cos());
                let l = q.length() - radius;
                let m = (q - c * clampf(q.dot(c), 0.0, radius)).length();
                l.max(m * (c.y * q.x - c.x * q.y).signum())
            }

            Shape::RectangularPrism { size } => sdf_length3(p.abs() - size * 0.5),

            Shape::RectangularPrismFrame { size, thickness } => {
                let b = p.abs() - size * 0.5;
                let q = (b + Vec3::splat(thickness)).abs() - Vec3::splat(thickness);
                sdf_length3(Vec3::new(b.x, q.y, q.z))
                    .min(sdf_length3(Vec3::new(q.x, b.y, q.z)))
                    .min(sdf_length3(Vec3::new(q.x, q.y, b.z)))
            }

            Shape::Rhombus {
                width,
                height,
                depth,
                corner_radius,
            } => {
                let a = p.abs();
                let axy = Vec2::new(a.x, a.y);
                let b = Vec2::new(width, height) * 0.5;
                let s = b - 2.0 * axy;
                let f = clampf((b.x * s.x - b.y * s.y) / b.length_squared().max(GUARD), -1.0, 1.0);
                let inside = (a.x * b.y + a.y * b.x - b.x * b.y).signum();
                let q = Vec2::new(
                    inside * (axy - 0.5 * b * Vec2::new(1.0 - f, 1.0 + f)).length()
                        - corner_radius,
                    a.z - depth * 0.5,
                );
                sdf_length2(q)
            }

            Shape::TriangularPrism { base, depth } => (p.z.abs() - depth)
                .max((p.x.abs() * 0.866_025_4 + p.y * 0.5).max(-p.y) - 0.288_675_13 * base),

            Shape::Cylinder { radius, height } => {
                sdf_length2(cylindrical(p).abs() - Vec2::new(radius, height * 0.5))
            }

            Shape::InfiniteCylinder { radius } => Vec2::new(p.x, p.z).length() - radius,

            Shape::Plane { normal } => p.dot(normal),

            Shape::Capsule {
                radius,
                negative_height,
                positive_height,
            } => {
                let y = p.y - clampf(p.y, -negative_height, positive_height);
                Vec3::new(p.x, y, p.z).length() - radius
            }

            Shape::Cone { angle, height } => {
                let q = cylindrical(p);
                let bound = Vec2::new((height * angle.tan()).abs().max(GUARD), height);
                let top = q - bound * Vec2::new(saturate(q.x / bound.x), 1.0);
                let edge =
                    q - bound * saturate(q.dot(bound) / bound.length_squared().max(GUARD));
                let k = height.signum();
                let inside = (k * (q.x * height - q.y * bound.x))
                    .max(k * (q.y - height))
                    .signum();
                inside * min_length(edge, top)
            }

            Shape::InfiniteCone { angle } => {
                let q = cylindrical(p);
                let c = Vec2::new(angle.sin(), angle.cos());
                let inside = (q.x * c.y - q.y * c.x).signum();
                inside * (q - c * q.dot(c).max(0.0)).length()
            }

            Shape::CappedCone {
                height,
                lower_radius,
                upper_radius,
            } => {
                let q = cylindrical(p);
                let half = height * 0.5;
                let k1 = Vec2::new(upper_radius, half);
                let k2 = Vec2::new(upper_radius - lower_radius, height);
                let cap = if q.y < 0.0 { lower_radius } else { upper_radius };
                let ca = Vec2::new(q.x - q.x.min(cap), q.y.abs() - half);
                let cb = q - k1 + k2 * saturate((k1 - q).dot(k2) / k2.length_squared().max(GUARD));
                let s = if cb.x < 0.0 && ca.y < 0.0 { -1.0 } else { 1.0 };
                s * min_length(ca, cb)
            }

            Shape::RoundedCone {
                height,
                lower_radius,
                upper_radius,
            } => {
                let q = cylindrical(p);
                let h = height.max(GUARD);
                let b = (lower_radius - upper_radius) / h;
                let a = (1.0 - b * b).max(0.0).sqrt();
                let k = q.dot(Vec2::new(-b, a));
                if k < 0.0 {
                    q.length() - lower_radius
                } else if k > a * h {
                    (q - Vec2::new(0.0, h)).length() - upper_radius
                } else {
                    q.dot(Vec2::new(a, b)) - lower_radius
                }
            }

            Shape::Torus {
                ring_radius,
                tube_radius,
            } => {
                let ring = Vec2::new(p.x, p.y).length() - ring_radius;
                Vec2::new(ring, p.z).length() - tube_radius
            }

            Shape::CappedTorus {
                ring_radius,
                tube_radius,
                cap_angle,
            } => {
                let sc = Vec2::new(cap_angle.sin(), cap_angle.cos());
                let q = Vec3::new(p.x.abs(), p.y, p.z);
                let qxy = Vec2::new(q.x, q.y);
                let k = if sc.y * q.x > sc.x * q.y {
                    qxy.dot(sc)
                } else {
                    qxy.length()
                };
                (q.length_squared() + ring_radius * ring_radius - 2.0 * ring_radius * k)
                    .max(0.0)
                    .sqrt()
                    - tube_radius
            }

            Shape::Link {
                ring_radius,
                tube_radius,
                height,
            } => {
                let stretch = (p.y.abs() - height * 0.5).max(0.0);
                let ring = Vec2::new(p.x, stretch).length() - ring_radius;
                Vec2::new(ring, p.z).length() - tube_radius
            }

            Shape::HexagonalPrism { height, depth } => {
                const K: Vec2 = Vec2::new(-0.866_025_4, 0.5);
                const K_TAN: f32 = 0.577_350_26;
                let half = height * 0.5;
                let a = p.abs();
                let mut xy = Vec2::new(a.x, a.y);
                xy -= 2.0 * K.dot(xy).min(0.0) * K;
                let edge = Vec2::new(clampf(xy.x, -K_TAN * half, K_TAN * half), half);
                let q = Vec2::new(
                    (xy.y - half).signum() * (xy - edge).length(),
                    a.z - depth * 0.5,
                );
                sdf_length2(q)
            }

            Shape::Octahedron { radial_extent: s } => {
                let a = p.abs();
                let m = a.x + a.y + a.z - s;
                let q = if 3.0 * a.x < m {
                    a
                } else if 3.0 * a.y < m {
                    Vec3::new(a.y, a.z, a.x)
                } else if 3.0 * a.z < m {
                    Vec3::new(a.z, a.x, a.y)
                } else {
                    return (m * 0.577_350_27, None);
                };
                let k = clampf(0.5 * (q.z - q.y + s), 0.0, s);
                Vec3::new(q.x, q.y - s + k, q.z - k).length()
            }

            Shape::Mandelbulb {
                power,
                iterations,
                max_square_radius,
                ..
            } => {
                let (d, trap) = mandelbulb(p, power, iterations, max_square_radius);
                return (d, Some(trap));
            }

            Shape::Mandelbox {
                scale,
                iterations,
                min_square_radius,
                folding_limit,
            } => {
                let (d, trap) = mandelbox(p, scale, iterations, min_square_radius, folding_limit);
                return (d, Some(trap));
            }
        };
        (d, None)
    }
}

// ============================================================================
// Fractals
// ============================================================================

fn mandelbulb(p: Vec3, power: f32, iterations: u32, max_square_radius: f32) -> (f32, Vec3) {
    let mut z = p;
    let mut r2 = z.length_squared();
    let mut trap = Vec4::new(z.x.abs(), z.y.abs(), z.z.abs(), r2);
    let mut dr = 1.0;

    for _ in 0..iterations {
        dr = power * r2.max(GUARD * GUARD).powf((power - 1.0) * 0.5) * dr + 1.0;

        let r = z.length().max(GUARD);
        let theta = power * clampf(z.z / r, -1.0, 1.0).acos();
        let phi = power * z.y.atan2(z.x);
        z = p + r.powf(power)
            * Vec3::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            );

        let a = z.abs();
        trap = trap.min(Vec4::new(a.x, a.y, a.z, r2));
        r2 = z.length_squared();
        if r2 > max_square_radius {
            break;
        }
    }

    let r2 = r2.max(GUARD * GUARD);
    let d = 0.25 * r2.ln() * r2.sqrt() / dr;
    (d, trap.truncate().clamp(Vec3::ZERO, Vec3::ONE))
}

fn mandelbox(
    p: Vec3,
    scale: f32,
    iterations: u32,
    min_square_radius: f32,
    folding_limit: f32,
) -> (f32, Vec3) {
    let min_r2 = min_square_radius.max(GUARD);
    let factor = Vec4::new(scale, scale, scale, scale.abs()) / min_r2;
    let origin = p.extend(1.0);
    let limit = Vec3::splat(folding_limit.abs());
    let mut z = origin;
    let mut trap = Vec3::ONE;

    for _ in 0..iterations {
        // Box fold
        let folded = z.truncate().clamp(-limit, limit) * 2.0 - z.truncate();
        // Sphere fold
        let r2 = folded.length_squared();
        let k = saturate((min_r2 / r2).max(min_r2));
        z = folded.extend(z.w) * k;

        z = factor * z + origin;
        trap = trap.min(z.truncate().abs());
    }

    let w = if z.w.abs() < GUARD { GUARD } else { z.w };
    let d = (z.truncate().length() - (scale - 1.0).abs()) / w
        - scale.abs().powi(1 - iterations as i32);
    (d, trap.clamp(Vec3::ZERO, Vec3::ONE))
}

// ============================================================================
// Helpers
// ============================================================================

/// Radial distance from the y-axis and height
fn cylindrical(p: Vec3) -> Vec2 {
    Vec2::new(Vec2::new(p.x, p.z).length(), p.y)
}

/// Signed length of a vector to the nearest surface of a box-like region
fn sdf_length2(v: Vec2) -> f32 {
    v.max(Vec2::ZERO).length() + v.max_element().min(0.0)
}

fn sdf_length3(v: Vec3) -> f32 {
    v.max(Vec3::ZERO).length() + v.max_element().min(0.0)
}

fn min_length(a: Vec2, b: Vec2) -> f32 {
    a.length_squared().min(b.length_squared()).sqrt()
}

fn saturate(x: f32) -> f32 {
    clampf(x, 0.0, 1.0)
}

/// Clamp that tolerates `lo > hi` and NaN bounds instead of panicking
fn clampf(x: f32, lo: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

fn iteration_count(value: f32) -> u32 {
    if value.is_finite() {
        value.round().max(1.0) as u32
    } else {
        1
    }
}
