//! Adaptive-step trajectory integration
//!
//! The driver advances the state with an embedded Runge-Kutta method,
//! controlling the step size from the local error estimate. Steps are
//! shortened so that every output time is hit exactly, which keeps every
//! sample an integrator state rather than an interpolant. Events are checked
//! after each accepted step and located inside the step by bisection.

use super::events::{TerminationPolicy, ZEvents, ZPlaneTracker, locate_event};
use super::fields::FieldSampler;
use super::integrators::registry::{DEFAULT_INTEGRATOR, IntegratorRegistry};
use super::integrators::{EquationOfMotion, Integrator, PhaseState, StepEstimate};
use super::lorentz::LorentzForce;
use super::math::Scalar;
use super::species::ParticleModel;
use crate::error::{ConfigError, DomainError, IntegrationError, TrackResult};
use crate::trajectory::{
    InitialConditions, SolverStatistics, TerminationCause, Trajectory, TrajectorySample,
    ZPlaneCrossing,
};
use bevy::log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const SAFETY: Scalar = 0.9;
const MIN_FACTOR: Scalar = 0.2;
const MAX_FACTOR: Scalar = 10.0;

/// Tolerances and limits of the adaptive solver
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SolverOptions {
    /// Registry name or alias of the integration method
    pub integrator: String,
    pub atol: Scalar,
    pub rtol: Scalar,
    /// Upper limit on attempted steps, accepted and rejected
    pub max_steps: usize,
    /// Initial step size in seconds; estimated when absent
    pub first_step: Option<Scalar>,
    pub max_step: Option<Scalar>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            integrator: DEFAULT_INTEGRATOR.to_string(),
            atol: 1e-10,
            rtol: 1e-10,
            max_steps: 1_000_000,
            first_step: None,
            max_step: None,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |value: Scalar| value.is_finite() && value > 0.0;
        if !positive(self.atol) || !positive(self.rtol) {
            return Err(ConfigError::InvalidTolerance {
                atol: self.atol,
                rtol: self.rtol,
            });
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidSolverOption(
                "max_steps must be positive".to_string(),
            ));
        }
        match (self.first_step, self.max_step) {
            (Some(first_step), _) if !positive(first_step) => Err(
                ConfigError::InvalidSolverOption(format!("first_step must be positive, got {first_step}")),
            ),
            (_, Some(max_step)) if max_step.is_nan() || max_step <= 0.0 => Err(
                ConfigError::InvalidSolverOption(format!("max_step must be positive, got {max_step}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Integrates the relativistic Lorentz-force equation of motion.
///
/// The solver holds configuration only; every call to [`TrajectorySolver::solve`]
/// is independent and returns a new [`Trajectory`].
pub struct TrajectorySolver {
    integrator: Box<dyn Integrator>,
    options: SolverOptions,
}

impl TrajectorySolver {
    /// Resolve the configured integrator through the standard registry
    pub fn new(options: SolverOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let integrator = IntegratorRegistry::default().create(&options.integrator)?;
        Ok(Self {
            integrator,
            options,
        })
    }

    pub fn with_integrator(integrator: Box<dyn Integrator>, options: SolverOptions) -> Self {
        Self {
            integrator,
            options,
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    pub fn solve(
        &self,
        initial: &InitialConditions,
        particle: &ParticleModel,
        magnetic: &dyn FieldSampler,
        electric: &dyn FieldSampler,
        termination: &TerminationPolicy,
        z_events: Option<&ZEvents>,
    ) -> TrackResult<Trajectory> {
        initial.validate()?;
        self.options.validate()?;
        if let Some(events) = z_events {
            events.validate()?;
        }

        let system = LorentzForce::new(particle, magnetic, electric);
        let start = Instant::now();
        let state = initial.initial_state();

        info!(
            "Tracking {} with {} from t = {} s to t = {} s: position {:?} m, momentum {:?} MeV/c",
            particle.name(),
            self.integrator.name(),
            initial.t0,
            initial.tf,
            state.position,
            state.momentum
        );

        if termination.should_terminate(state.position) {
            info!(
                "Initial position {:?} m lies outside the bounds, nothing to integrate",
                state.position
            );
            return Ok(Trajectory::new(
                Vec::new(),
                Vec::new(),
                TerminationCause::BoundsExited {
                    t: initial.t0,
                    position: state.position,
                },
                SolverStatistics::default(),
            ));
        }

        let run = Run {
            integrator: self.integrator.as_ref(),
            system: &system,
            options: &self.options,
            termination,
            mass: particle.mass(),
        };
        let trajectory = run.integrate(initial, state, z_events)?;

        let statistics = trajectory.statistics();
        info!(
            "Tracking finished in {:.3?}: {} samples, {} accepted / {} rejected steps, {:?}",
            start.elapsed(),
            trajectory.len(),
            statistics.accepted_steps,
            statistics.rejected_steps,
            trajectory.termination()
        );

        Ok(trajectory)
    }
}

/// Evaluation counting wrapper around the equation of motion
struct Counted<'a> {
    system: &'a dyn EquationOfMotion,
    evaluations: std::cell::Cell<usize>,
}

impl EquationOfMotion for Counted<'_> {
    fn derivative(&self, t: Scalar, state: &PhaseState) -> Result<PhaseState, DomainError> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.system.derivative(t, state)
    }
}

/// Borrowed inputs of one solve
struct Run<'a> {
    integrator: &'a dyn Integrator,
    system: &'a dyn EquationOfMotion,
    options: &'a SolverOptions,
    termination: &'a TerminationPolicy,
    mass: Scalar,
}

impl Run<'_> {
    fn integrate(
        &self,
        initial: &InitialConditions,
        mut state: PhaseState,
        z_events: Option<&ZEvents>,
    ) -> Result<Trajectory, IntegrationError> {
        let times = initial.evaluation_times();
        let span = initial.tf - initial.t0;
        let counted = Counted {
            system: self.system,
            evaluations: std::cell::Cell::new(0),
        };
        let system: &dyn EquationOfMotion = &counted;

        let mut t = initial.t0;
        let mut samples = Vec::with_capacity(times.len());
        let mut crossings = Vec::new();
        let mut statistics = SolverStatistics::default();

        let mut tracker = z_events.map(|events| ZPlaneTracker::new(events, state.position.z));
        if let Some(tracker) = &tracker {
            for plane in tracker.initial_planes() {
                debug!("Starting on z plane {} at t = {} s", plane, t);
                crossings.push(ZPlaneCrossing {
                    t,
                    plane,
                    z: state.position.z,
                });
            }
        }
        samples.push(TrajectorySample::from_state(t, &state, self.mass));

        let fail_domain = |t, state, samples: usize, source| IntegrationError::Domain {
            last_time: t,
            last_state: state,
            samples,
            source,
        };

        let max_step = self.options.max_step.unwrap_or(Scalar::INFINITY);
        let mut h = match self.options.first_step {
            Some(first_step) => first_step,
            None => {
                let derivative = system
                    .derivative(t, &state)
                    .map_err(|source| fail_domain(t, state, samples.len(), source))?;
                initial_step(
                    system,
                    t,
                    &state,
                    &derivative,
                    self.integrator.error_estimator_order(),
                    self.options,
                    span,
                )
                .map_err(|source| fail_domain(t, state, samples.len(), source))?
            }
        }
        .min(max_step)
        .min(span);

        let exponent = -1.0 / (self.integrator.error_estimator_order() as Scalar + 1.0);
        let mut previous_rejected = false;
        let mut last_domain_error: Option<DomainError> = None;
        let mut next_output = 1;

        while next_output < times.len() {
            if statistics.accepted_steps + statistics.rejected_steps >= self.options.max_steps {
                return Err(IntegrationError::StepLimitExceeded {
                    last_time: t,
                    last_state: state,
                    samples: samples.len(),
                    max_steps: self.options.max_steps,
                });
            }

            let min_step = 10.0 * Scalar::EPSILON * t.abs().max(span);
            if h < min_step {
                return Err(match last_domain_error {
                    Some(source) => fail_domain(t, state, samples.len(), source),
                    None => IntegrationError::StepSizeUnderflow {
                        last_time: t,
                        last_state: state,
                        samples: samples.len(),
                        step: h,
                    },
                });
            }

            let target = times[next_output];
            let remaining = target - t;
            let lands_on_output = h >= remaining;
            let h_try = if lands_on_output { remaining } else { h };

            let estimate = match self.integrator.step(system, t, &state, h_try) {
                Ok(estimate) => estimate,
                Err(source) => {
                    debug!("Domain error for step {} s at t = {} s: {}", h_try, t, source);
                    last_domain_error = Some(source);
                    statistics.rejected_steps += 1;
                    previous_rejected = true;
                    h = h_try * MIN_FACTOR;
                    continue;
                }
            };

            let norm = error_norm(&state, &estimate, self.options);
            if !norm.is_finite() || norm > 1.0 {
                let factor = if norm.is_finite() {
                    (SAFETY * norm.powf(exponent)).max(MIN_FACTOR)
                } else {
                    MIN_FACTOR
                };
                statistics.rejected_steps += 1;
                previous_rejected = true;
                h = h_try * factor;
                continue;
            }

            let mut factor = if norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * norm.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            if previous_rejected {
                factor = factor.min(1.0);
            }
            previous_rejected = false;
            last_domain_error = None;
            statistics.accepted_steps += 1;

            let t_new = if lands_on_output { target } else { t + h_try };
            let new_state = estimate.state;

            if self.termination.should_terminate(new_state.position) {
                let (t_exit, exit_state) = locate_event(
                    self.integrator,
                    system,
                    t,
                    &state,
                    h_try,
                    new_state,
                    |trial| self.termination.should_terminate(trial.position),
                )
                .map_err(|source| fail_domain(t, state, samples.len(), source))?;

                if let Some(tracker) = tracker.as_mut() {
                    self.record_crossings(system, tracker, t, &state, t_exit - t, exit_state, &mut crossings)
                        .map_err(|source| fail_domain(t, state, samples.len(), source))?;
                }

                info!(
                    "Particle left the bounds at t = {} s, position {:?} m",
                    t_exit, exit_state.position
                );
                statistics.derivative_evaluations = counted.evaluations.get();
                return Ok(Trajectory::new(
                    samples,
                    crossings,
                    TerminationCause::BoundsExited {
                        t: t_exit,
                        position: exit_state.position,
                    },
                    statistics,
                ));
            }

            if let Some(tracker) = tracker.as_mut() {
                self.record_crossings(system, tracker, t, &state, h_try, new_state, &mut crossings)
                    .map_err(|source| fail_domain(t, state, samples.len(), source))?;
            }

            t = t_new;
            state = new_state;
            if lands_on_output {
                samples.push(TrajectorySample::from_state(t, &state, self.mass));
                next_output += 1;
            }

            h = if h_try < h {
                // truncated to reach an output time; keep the larger proposal
                h.max(h_try * factor)
            } else {
                h_try * factor
            }
            .min(max_step);
        }

        statistics.derivative_evaluations = counted.evaluations.get();
        Ok(Trajectory::new(
            samples,
            crossings,
            TerminationCause::ReachedEndTime,
            statistics,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_crossings(
        &self,
        system: &dyn EquationOfMotion,
        tracker: &mut ZPlaneTracker<'_>,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
        end: PhaseState,
        crossings: &mut Vec<ZPlaneCrossing>,
    ) -> Result<(), DomainError> {
        let z_start = state.position.z;
        let reached = tracker.advance(z_start, end.position.z);
        let mut located = Vec::with_capacity(reached.len());
        for plane in reached {
            let (t_cross, crossed) = locate_event(
                self.integrator,
                system,
                t,
                state,
                dt,
                end,
                tracker.reached_predicate(z_start, plane),
            )?;
            debug!(
                "Reached z plane {} at t = {} s (z = {} m)",
                plane, t_cross, crossed.position.z
            );
            located.push(ZPlaneCrossing {
                t: t_cross,
                plane,
                z: crossed.position.z,
            });
        }
        // planes are listed in any order; a step may cross several
        located.sort_by(|a, b| a.t.total_cmp(&b.t));
        crossings.extend(located);
        Ok(())
    }
}

/// RMS of the scaled local error over the six state components
///
/// Methods reporting a second, lower-order estimate use the blended norm of
/// Hairer's DOP853, `|e5|² / sqrt(|e5|² + 0.01·|e3|²)`.
fn error_norm(state: &PhaseState, estimate: &StepEstimate, options: &SolverOptions) -> Scalar {
    let y0 = state.to_array();
    let y1 = estimate.state.to_array();
    let scale: [Scalar; 6] =
        std::array::from_fn(|i| options.atol + options.rtol * y0[i].abs().max(y1[i].abs()));

    let Some(secondary) = estimate.secondary_error else {
        return scaled_rms(estimate.error.to_array(), &scale);
    };

    let squared = |error: PhaseState| -> Scalar {
        error
            .to_array()
            .iter()
            .zip(&scale)
            .map(|(value, scale)| (value / scale).powi(2))
            .sum()
    };
    let err5 = squared(estimate.error);
    let err3 = squared(secondary);
    if err5 == 0.0 && err3 == 0.0 {
        return 0.0;
    }
    err5 / ((err5 + 0.01 * err3) * 6.0).sqrt()
}

fn scaled_rms(values: [Scalar; 6], scale: &[Scalar; 6]) -> Scalar {
    let sum: Scalar = values
        .iter()
        .zip(scale)
        .map(|(value, scale)| (value / scale).powi(2))
        .sum();
    (sum / 6.0).sqrt()
}

/// Starting step size from the derivative magnitudes at the first point
/// (Hairer, Nørsett, Wanner, "Solving Ordinary Differential Equations I", II.4)
fn initial_step(
    system: &dyn EquationOfMotion,
    t0: Scalar,
    state: &PhaseState,
    derivative: &PhaseState,
    error_estimator_order: usize,
    options: &SolverOptions,
    span: Scalar,
) -> Result<Scalar, DomainError> {
    let y0 = state.to_array();
    let scale = y0.map(|y| options.atol + options.rtol * y.abs());

    let d0 = scaled_rms(y0, &scale);
    let d1 = scaled_rms(derivative.to_array(), &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
    .min(span);

    let trial = *state + *derivative * h0;
    let trial_derivative = system.derivative(t0 + h0, &trial)?;
    let d2 = scaled_rms((trial_derivative - *derivative).to_array(), &scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (error_estimator_order as Scalar + 1.0))
    };

    Ok((100.0 * h0).min(h1).min(span))
}
