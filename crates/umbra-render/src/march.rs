//! Sphere tracing through the scene's distance field
//!
//! Each step advances by the distance to the nearest surface, which can
//! never overshoot it. The hit tolerance grows with the distance already
//! travelled so far-away surfaces resolve in a bounded number of steps.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use umbra_core::eval::Evaluator;
use umbra_core::material::MaterialSample;

/// Limits of a single march
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchSettings {
    /// Give up once the ray has travelled this far
    pub max_distance: f32,
    /// Give up after this many distance evaluations
    pub max_iterations: u32,
    /// Hit tolerance at the ray origin
    pub min_step: f32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            max_iterations: 512,
            min_step: 1e-4,
        }
    }
}

impl MarchSettings {
    /// Hit tolerance after travelling `travelled`
    pub fn tolerance(&self, travelled: f32) -> f32 {
        self.min_step * (1.0 + travelled)
    }
}

/// Progress of one ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchState {
    pub position: Vec3,
    pub travelled: f32,
    pub iterations: u32,
    /// Distance returned by the most recent evaluation
    pub last_distance: f32,
}

/// A resolved surface intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a> {
    pub position: Vec3,
    /// Distance along the ray from its origin
    pub travelled: f32,
    pub iterations: u32,
    /// Field value at the hit, within tolerance of zero
    pub distance: f32,
    pub material: Option<MaterialSample<'a>>,
}

/// How a march ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarchOutcome<'a> {
    Hit(Hit<'a>),
    /// Left the scene without meeting a surface
    Miss(MarchState),
    /// Ran out of iterations; shaded like a miss
    BudgetExceeded(MarchState),
    Cancelled,
}

impl<'a> MarchOutcome<'a> {
    pub fn is_hit(&self) -> bool {
        matches!(self, MarchOutcome::Hit(_))
    }

    pub fn hit(&self) -> Option<&Hit<'a>> {
        match self {
            MarchOutcome::Hit(hit) => Some(hit),
            _ => None,
        }
    }
}

/// March a ray from `origin` along the normalised `direction`
pub fn march<'a>(
    evaluator: &Evaluator<'a>,
    origin: Vec3,
    direction: Vec3,
    settings: &MarchSettings,
    abort: &AtomicBool,
) -> MarchOutcome<'a> {
    let mut state = MarchState {
        position: origin,
        travelled: 0.0,
        iterations: 0,
        last_distance: f32::INFINITY,
    };

    loop {
        if abort.load(Ordering::Relaxed) {
            return MarchOutcome::Cancelled;
        }
        if state.iterations >= settings.max_iterations {
            return MarchOutcome::BudgetExceeded(state);
        }

        let sample = evaluator.sample(state.position);
        state.iterations += 1;
        state.last_distance = sample.distance;

        if sample.distance < settings.tolerance(state.travelled) {
            return MarchOutcome::Hit(Hit {
                position: state.position,
                travelled: state.travelled,
                iterations: state.iterations,
                distance: sample.distance,
                material: sample.material,
            });
        }

        state.travelled += sample.distance;
        if state.travelled > settings.max_distance {
            return MarchOutcome::Miss(state);
        }
        state.position = origin + direction * state.travelled;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use umbra_core::params::ShapeKind;
    use umbra_core::scene::{NodeId, PrimitiveRecord, SceneGraph};

    fn sphere_at(z: f32) -> SceneGraph {
        SceneGraph::from_records(&[PrimitiveRecord::new(ShapeKind::Sphere)
            .with_dimensions(&[1.0])
            .at(Vec3::new(0.0, 0.0, z))])
        .unwrap()
    }

    #[test]
    fn hits_sphere_in_front() {
        let graph = sphere_at(-5.0);
        let eval = Evaluator::new(&graph);
        let settings = MarchSettings::default();
        let outcome = march(
            &eval,
            Vec3::ZERO,
            Vec3::NEG_Z,
            &settings,
            &AtomicBool::new(false),
        );
        let hit = outcome.hit().unwrap();
        // Sphere tracing never overshoots; it stops inside the hit band
        assert!(hit.travelled <= 4.0 + 1e-6);
        assert!(4.0 - hit.travelled <= settings.tolerance(4.0));
        assert_eq!(hit.material.unwrap().node, NodeId(0));
    }

    #[test]
    fn ray_pointing_away_misses() {
        let graph = sphere_at(-5.0);
        let eval = Evaluator::new(&graph);
        let outcome = march(
            &eval,
            Vec3::ZERO,
            Vec3::Z,
            &MarchSettings::default(),
            &AtomicBool::new(false),
        );
        assert!(matches!(outcome, MarchOutcome::Miss(_)));
    }

    #[test]
    fn surface_beyond_max_distance_is_a_miss() {
        let graph = sphere_at(-5.0);
        let eval = Evaluator::new(&graph);
        let settings = MarchSettings {
            max_distance: 3.0,
            ..MarchSettings::default()
        };
        let outcome = march(&eval, Vec3::ZERO, Vec3::NEG_Z, &settings, &AtomicBool::new(false));
        assert!(!outcome.is_hit());
    }

    #[test]
    fn empty_scene_misses_immediately() {
        let graph = SceneGraph::default();
        let eval = Evaluator::new(&graph);
        let outcome = march(
            &eval,
            Vec3::ZERO,
            Vec3::X,
            &MarchSettings::default(),
            &AtomicBool::new(false),
        );
        let MarchOutcome::Miss(state) = outcome else {
            panic!("expected a miss, got {outcome:?}");
        };
        assert_eq!(state.iterations, 1);
    }

    #[test]
    fn grazing_ray_exhausts_budget() {
        let graph = sphere_at(-5.0);
        let eval = Evaluator::new(&graph);
        let settings = MarchSettings {
            max_iterations: 3,
            ..MarchSettings::default()
        };
        // Passes just outside the silhouette, taking many tiny steps
        let direction = Vec3::new(0.0, 0.2043, -1.0).normalize();
        let outcome = march(&eval, Vec3::ZERO, direction, &settings, &AtomicBool::new(false));
        let MarchOutcome::BudgetExceeded(state) = outcome else {
            panic!("expected budget exhaustion, got {outcome:?}");
        };
        assert_eq!(state.iterations, 3);
    }

    #[test]
    fn raised_abort_flag_cancels() {
        let graph = sphere_at(-5.0);
        let eval = Evaluator::new(&graph);
        let outcome = march(
            &eval,
            Vec3::ZERO,
            Vec3::NEG_Z,
            &MarchSettings::default(),
            &AtomicBool::new(true),
        );
        assert_eq!(outcome, MarchOutcome::Cancelled);
    }

    #[test]
    fn starting_inside_is_an_immediate_hit() {
        let graph = sphere_at(0.0);
        let eval = Evaluator::new(&graph);
        let outcome = march(
            &eval,
            Vec3::ZERO,
            Vec3::X,
            &MarchSettings::default(),
            &AtomicBool::new(false),
        );
        assert_eq!(outcome.hit().unwrap().iterations, 1);
    }
}
