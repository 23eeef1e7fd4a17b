//! Windowed momentum reconstruction from a sampled trajectory
//!
//! The samples are cut into consecutive, non-overlapping windows of `step`
//! samples and every `stride`-th sample of a window is used, starting with
//! its first. A trailing remainder shorter than `step` is dropped. Each
//! window is reconstructed independently, so one failing window leaves the
//! others intact.

pub mod arc;
pub mod circle;
pub mod regression;

pub use arc::{ReconstructedMomentum, reconstruct_arc};
pub use circle::{CircleFit, fit_circle};
pub use regression::{LinearFit, fit_line};

use crate::error::{ConfigError, WindowError};
use crate::physics::fields::FieldSampler;
use crate::physics::math::Scalar;
use crate::trajectory::{Trajectory, TrajectorySample};
use bevy::log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Restricts reconstruction to samples inside the given time and z ranges.
/// Missing limits are unbounded; limits are inclusive.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SampleFilter {
    pub t_min: Option<Scalar>,
    pub t_max: Option<Scalar>,
    pub z_min: Option<Scalar>,
    pub z_max: Option<Scalar>,
}

impl SampleFilter {
    pub fn accepts(&self, sample: &TrajectorySample) -> bool {
        let within = |value: Scalar, min: Option<Scalar>, max: Option<Scalar>| {
            min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
        };
        within(sample.t(), self.t_min, self.t_max)
            && within(sample.position().z, self.z_min, self.z_max)
    }

    pub fn apply(&self, samples: &[TrajectorySample]) -> Vec<TrajectorySample> {
        samples
            .iter()
            .filter(|sample| self.accepts(sample))
            .copied()
            .collect()
    }
}

/// Window layout of a reconstruction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ReconstructionOptions {
    /// Samples per window
    pub step: usize,
    /// Distance between the samples used inside a window
    pub stride: usize,
    pub filter: Option<SampleFilter>,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            step: 100,
            stride: 10,
            filter: None,
        }
    }
}

impl ReconstructionOptions {
    pub fn new(step: usize, stride: usize) -> Self {
        Self {
            step,
            stride,
            filter: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step == 0 || self.stride == 0 {
            return Err(ConfigError::ZeroWindowParameter {
                step: self.step,
                stride: self.stride,
            });
        }
        if self.stride > self.step {
            return Err(ConfigError::StrideExceedsStep {
                step: self.step,
                stride: self.stride,
            });
        }
        Ok(())
    }

    /// Points used per window
    pub fn points_per_window(&self) -> usize {
        self.step.div_ceil(self.stride)
    }
}

/// Outcome of one window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReconstruction {
    pub index: usize,
    /// Index of the window's first sample in the reconstructed sample slice
    pub first_sample: usize,
    pub points: usize,
    pub t_start: Scalar,
    pub t_end: Scalar,
    pub result: Result<ReconstructedMomentum, WindowError>,
}

/// Per-window results in window order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedMomentumTable {
    windows: Vec<WindowReconstruction>,
}

impl ReconstructedMomentumTable {
    pub fn windows(&self) -> &[WindowReconstruction] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Successful estimates, in window order
    pub fn estimates(&self) -> impl Iterator<Item = &ReconstructedMomentum> {
        self.windows
            .iter()
            .filter_map(|window| window.result.as_ref().ok())
    }

    /// `(window index, error)` of every failed window
    pub fn failures(&self) -> impl Iterator<Item = (usize, &WindowError)> {
        self.windows
            .iter()
            .filter_map(|window| window.result.as_ref().err().map(|error| (window.index, error)))
    }

    /// Mean total momentum over the successful windows
    pub fn mean_momentum(&self) -> Option<Scalar> {
        let (sum, count) = self
            .estimates()
            .fold((0.0, 0usize), |(sum, count), estimate| (sum + estimate.p, count + 1));
        (count > 0).then(|| sum / count as Scalar)
    }
}

/// Reconstruct a trajectory, optionally restricted by the options' filter.
///
/// Fails only on invalid window parameters; per-window problems are
/// reported in the returned table.
pub fn reconstruct(
    trajectory: &Trajectory,
    magnetic: &dyn FieldSampler,
    options: &ReconstructionOptions,
) -> Result<ReconstructedMomentumTable, ConfigError> {
    let samples: Cow<'_, [TrajectorySample]> = match &options.filter {
        Some(filter) => Cow::Owned(filter.apply(trajectory.samples())),
        None => Cow::Borrowed(trajectory.samples()),
    };
    reconstruct_samples(&samples, magnetic, options.step, options.stride)
}

/// Reconstruct an arbitrary time-ordered run of samples
pub fn reconstruct_samples(
    samples: &[TrajectorySample],
    magnetic: &dyn FieldSampler,
    step: usize,
    stride: usize,
) -> Result<ReconstructedMomentumTable, ConfigError> {
    ReconstructionOptions::new(step, stride).validate()?;

    let windows: Vec<WindowReconstruction> = samples
        .chunks_exact(step)
        .enumerate()
        .map(|(index, chunk)| {
            let window: Vec<TrajectorySample> = chunk.iter().step_by(stride).copied().collect();
            let result = reconstruct_arc(&window, magnetic);
            if let Err(error) = &result {
                warn!("Window {} could not be reconstructed: {}", index, error);
            }
            WindowReconstruction {
                index,
                first_sample: index * step,
                points: window.len(),
                t_start: window.first().map_or(Scalar::NAN, |sample| sample.t()),
                t_end: window.last().map_or(Scalar::NAN, |sample| sample.t()),
                result,
            }
        })
        .collect();

    debug!(
        "Reconstructed {} windows of {} samples (stride {}) from {} samples",
        windows.len(),
        step,
        stride,
        samples.len()
    );

    Ok(ReconstructedMomentumTable { windows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::fields::FieldModel;
    use crate::physics::math::Vector;

    fn line(n: usize) -> Vec<TrajectorySample> {
        (0..n)
            .map(|i| TrajectorySample::new(i as Scalar, Vector::new(0.0, 0.0, i as Scalar), Vector::Z, 0.1))
            .collect()
    }

    #[test]
    fn test_window_parameter_validation() {
        assert!(ReconstructionOptions::default().validate().is_ok());
        assert_eq!(
            ReconstructionOptions::new(0, 1).validate(),
            Err(ConfigError::ZeroWindowParameter { step: 0, stride: 1 })
        );
        assert_eq!(
            ReconstructionOptions::new(5, 10).validate(),
            Err(ConfigError::StrideExceedsStep { step: 5, stride: 10 })
        );
    }

    #[test]
    fn test_points_per_window() {
        assert_eq!(ReconstructionOptions::new(100, 10).points_per_window(), 10);
        assert_eq!(ReconstructionOptions::new(10, 3).points_per_window(), 4);
        assert_eq!(ReconstructionOptions::new(7, 7).points_per_window(), 1);
    }

    #[test]
    fn test_windows_drop_remainder() {
        let samples = line(25);
        let table = reconstruct_samples(&samples, &FieldModel::Zero, 10, 3).unwrap();

        assert_eq!(table.len(), 2);
        let second = &table.windows()[1];
        assert_eq!(second.first_sample, 10);
        assert_eq!(second.points, 4);
        assert_eq!((second.t_start, second.t_end), (10.0, 19.0));
    }

    #[test]
    fn test_small_step_rejects_every_window() {
        let samples = line(20);
        let table = reconstruct_samples(&samples, &FieldModel::Zero, 2, 1).unwrap();

        assert_eq!(table.len(), 10);
        assert_eq!(table.estimates().count(), 0);
        assert!(table
            .failures()
            .all(|(_, error)| *error == WindowError::InsufficientPoints { points: 2 }));
        assert_eq!(table.mean_momentum(), None);
    }

    #[test]
    fn test_filter() {
        let filter = SampleFilter {
            t_min: Some(2.0),
            z_max: Some(5.0),
            ..Default::default()
        };
        let kept: Vec<Scalar> = filter.apply(&line(10)).iter().map(|s| s.t()).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_empty_trajectory_gives_empty_table() {
        let trajectory = Trajectory::from_samples(Vec::new());
        let table = reconstruct(&trajectory, &FieldModel::Zero, &ReconstructionOptions::default()).unwrap();
        assert!(table.is_empty());
    }
}
