//! Terminal and non-terminal events checked after every accepted step

use super::bounds::{Aabb3d, Bounds};
use super::integrators::{EquationOfMotion, Integrator, PhaseState};
use super::math::{Scalar, Vector, is_close, sign};
use crate::error::{ConfigError, DomainError};
use serde::{Deserialize, Serialize};

/// Bisection iterations used to locate an event inside one step
const BISECTION_ITERATIONS: usize = 60;

/// When a trajectory stops before the end of the time span
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum TerminationPolicy {
    /// Never stop early
    #[default]
    None,
    /// Stop as soon as the particle leaves the box
    ExitBox(Aabb3d),
}

impl TerminationPolicy {
    pub fn from_bounds(bounds: Option<&Bounds>) -> Result<Self, ConfigError> {
        match bounds {
            Some(bounds) => Ok(TerminationPolicy::ExitBox(bounds.to_aabb()?)),
            None => Ok(TerminationPolicy::None),
        }
    }

    #[inline]
    pub fn should_terminate(&self, position: Vector) -> bool {
        match self {
            TerminationPolicy::None => false,
            TerminationPolicy::ExitBox(aabb) => !aabb.contains(position),
        }
    }
}

/// Z planes whose crossings are recorded without stopping the integration.
///
/// A point belongs to a plane when `|z - plane| <= atol + rtol * |plane|`,
/// so points near but not exactly on a plane still count.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ZEvents {
    pub planes: Vec<Scalar>,
    pub rtol: Scalar,
    pub atol: Scalar,
}

impl Default for ZEvents {
    fn default() -> Self {
        Self {
            planes: Vec::new(),
            rtol: 1e-2,
            atol: 1e-2,
        }
    }
}

impl ZEvents {
    pub fn new(planes: Vec<Scalar>) -> Self {
        Self {
            planes,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |tolerance: Scalar| tolerance.is_finite() && tolerance >= 0.0;
        if !valid(self.atol) || !valid(self.rtol) {
            return Err(ConfigError::InvalidEventTolerance {
                atol: self.atol,
                rtol: self.rtol,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn near_plane(&self, z: Scalar, plane: Scalar) -> bool {
        is_close(z, plane, self.rtol, self.atol)
    }

    /// Whether `z` lies on any listed plane
    pub fn contains(&self, z: Scalar) -> bool {
        self.planes.iter().any(|&plane| self.near_plane(z, plane))
    }
}

/// Tracks which plane bands the particle is currently inside, so that a
/// crossing is reported once per entry.
pub(crate) struct ZPlaneTracker<'a> {
    events: &'a ZEvents,
    inside: Vec<bool>,
}

impl<'a> ZPlaneTracker<'a> {
    pub(crate) fn new(events: &'a ZEvents, z: Scalar) -> Self {
        let inside = events
            .planes
            .iter()
            .map(|&plane| events.near_plane(z, plane))
            .collect();
        Self { events, inside }
    }

    /// Planes the starting point already lies on
    pub(crate) fn initial_planes(&self) -> Vec<Scalar> {
        self.events
            .planes
            .iter()
            .zip(&self.inside)
            .filter(|(_, inside)| **inside)
            .map(|(&plane, _)| plane)
            .collect()
    }

    /// Planes reached during a step from `z_start` to `z_end`: either the
    /// band was entered or the step jumped across the plane.
    pub(crate) fn advance(&mut self, z_start: Scalar, z_end: Scalar) -> Vec<Scalar> {
        let mut reached = Vec::new();
        for (plane, inside) in self.events.planes.iter().zip(self.inside.iter_mut()) {
            let now_inside = self.events.near_plane(z_end, *plane);
            if !*inside && (now_inside || jumped_across(z_start, z_end, *plane)) {
                reached.push(*plane);
            }
            *inside = now_inside;
        }
        reached
    }

    /// Predicate that turns true once `plane` is reached from `z_start`
    pub(crate) fn reached_predicate(
        &self,
        z_start: Scalar,
        plane: Scalar,
    ) -> impl Fn(&PhaseState) -> bool + '_ {
        move |state: &PhaseState| {
            let z = state.position.z;
            self.events.near_plane(z, plane) || jumped_across(z_start, z, plane)
        }
    }
}

#[inline]
fn jumped_across(z_start: Scalar, z_end: Scalar, plane: Scalar) -> bool {
    let before = sign(z_start - plane);
    let after = sign(z_end - plane);
    before != 0.0 && after != 0.0 && before != after
}

/// Locate the earliest time in `(t, t + dt]` at which `predicate` holds.
///
/// `predicate` must be false at `state` and true at `end`, the result of the
/// full step. The step size is bisected, re-stepping from `state` each time.
pub(crate) fn locate_event<P>(
    integrator: &dyn Integrator,
    system: &dyn EquationOfMotion,
    t: Scalar,
    state: &PhaseState,
    dt: Scalar,
    end: PhaseState,
    predicate: P,
) -> Result<(Scalar, PhaseState), DomainError>
where
    P: Fn(&PhaseState) -> bool,
{
    let mut lower = 0.0;
    let mut upper = dt;
    let mut upper_state = end;

    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lower + upper);
        if mid <= lower || mid >= upper {
            break;
        }

        let trial = integrator.step(system, t, state, mid)?.state;
        if predicate(&trial) {
            upper = mid;
            upper_state = trial;
        } else {
            lower = mid;
        }
    }

    Ok((t + upper, upper_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::integrators::DormandPrince;

    /// Constant velocity along +z
    struct Drift;

    impl EquationOfMotion for Drift {
        fn derivative(&self, _t: Scalar, _state: &PhaseState) -> Result<PhaseState, DomainError> {
            Ok(PhaseState::new(Vector::Z, Vector::ZERO))
        }
    }

    #[test]
    fn test_no_policy_never_terminates() {
        let policy = TerminationPolicy::from_bounds(None).unwrap();
        assert!(!policy.should_terminate(Vector::splat(1e30)));
    }

    #[test]
    fn test_exit_box_policy() {
        let bounds = Bounds {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            zmin: -1.0,
            zmax: 1.0,
        };
        let policy = TerminationPolicy::from_bounds(Some(&bounds)).unwrap();
        assert!(!policy.should_terminate(Vector::ZERO));
        assert!(!policy.should_terminate(Vector::new(1.0, -1.0, 1.0)));
        assert!(policy.should_terminate(Vector::new(0.0, 0.0, 1.000_001)));
    }

    #[test]
    fn test_z_event_tolerance() {
        let events = ZEvents::new(vec![0.0, 1.0]);
        assert!(events.contains(0.009));
        assert!(!events.contains(0.011));
        // band around 1.0 is 0.01 + 0.01 * 1.0
        assert!(events.contains(1.019));
        assert!(!events.contains(0.975));
    }

    #[test]
    fn test_invalid_event_tolerance() {
        let events = ZEvents {
            planes: vec![0.0],
            rtol: -1.0,
            atol: 1e-2,
        };
        assert!(matches!(
            events.validate(),
            Err(ConfigError::InvalidEventTolerance { .. })
        ));
    }

    #[test]
    fn test_tracker_reports_each_entry_once() {
        let events = ZEvents::new(vec![0.5]);
        let mut tracker = ZPlaneTracker::new(&events, 0.0);
        assert!(tracker.initial_planes().is_empty());

        assert!(tracker.advance(0.0, 0.3).is_empty());
        assert_eq!(tracker.advance(0.3, 0.495), vec![0.5]);
        assert!(tracker.advance(0.495, 0.505).is_empty());
        assert!(tracker.advance(0.505, 0.8).is_empty());
        // coming back down enters the band again
        assert_eq!(tracker.advance(0.8, 0.51), vec![0.5]);
    }

    #[test]
    fn test_tracker_detects_jump_across_band() {
        let events = ZEvents {
            planes: vec![0.5],
            rtol: 0.0,
            atol: 1e-6,
        };
        let mut tracker = ZPlaneTracker::new(&events, 0.0);
        assert_eq!(tracker.advance(0.0, 1.0), vec![0.5]);
    }

    #[test]
    fn test_initial_state_on_plane() {
        let events = ZEvents::new(vec![0.0, 2.0]);
        let tracker = ZPlaneTracker::new(&events, 0.001);
        assert_eq!(tracker.initial_planes(), vec![0.0]);
    }

    #[test]
    fn test_locate_event_by_bisection() {
        let state = PhaseState::default();
        let end = DormandPrince.step(&Drift, 0.0, &state, 1.0).unwrap().state;
        let (t, located) = locate_event(&DormandPrince, &Drift, 0.0, &state, 1.0, end, |s| {
            s.position.z > 0.25
        })
        .unwrap();

        assert!((t - 0.25).abs() < 1e-12);
        assert!(located.position.z > 0.25);
    }
}
