//! Core data types for the step-counting engine.
//!
//! This module defines the values that enter the engine and the values that
//! flow between pipeline stages. Everything here is `Copy` so stages can pass
//! points by value through fixed-capacity buffers without allocating.
//!
//! Design principle: Types should make intent obvious. A raw sensor reading
//! and a derived pipeline point are different things and get different types.

use serde::{Deserialize, Serialize};

/// A single raw accelerometer sample.
///
/// This is the minimal input contract: three-axis acceleration and a
/// monotonic timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,

    /// Accelerometer reading [x, y, z] in m/s².
    pub accel: [f32; 3],
}

impl AccelSample {
    /// Creates a new accelerometer sample.
    ///
    /// Assumptions:
    /// - timestamp_ms must be monotonically increasing within a sequence
    /// - accel is calibrated (device-specific bias removed)
    pub fn new(timestamp_ms: u64, accel: [f32; 3]) -> Self {
        Self { timestamp_ms, accel }
    }

    /// Magnitude of the acceleration vector in m/s².
    pub fn magnitude(&self) -> f32 {
        vector_magnitude(self.accel)
    }
}

pub(crate) fn vector_magnitude(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// One unit flowing through the pipeline.
///
/// Raw points carry the accelerometer vector; derived points carry the
/// scalars the stages fill in along the way. A stage copies the point it
/// received, updates the fields it owns and emits the copy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataPoint {
    /// Monotonic timestamp in milliseconds. Non-decreasing within a buffer.
    pub timestamp_ms: u64,

    /// Raw acceleration vector [x, y, z] in m/s². Only set on raw points.
    pub accel: [f32; 3],

    /// Working signal. Raw magnitude after pre-processing, smoothed
    /// magnitude after the filter stage.
    pub magnitude: f32,

    /// Magnitude of the raw vector before any filtering.
    pub orig_magnitude: f32,

    /// Peak score assigned by the scoring stage.
    pub score: f32,

    /// Contribution of this point to distance accumulation.
    pub weight: f32,

    /// Set by motion detection when the point belongs to a moving window.
    pub in_motion: bool,
}

impl DataPoint {
    /// Wraps a raw sample as the first point of a cascade.
    pub fn raw(timestamp_ms: u64, accel: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
            ..Self::default()
        }
    }

    /// A derived point with the given working and original magnitude.
    pub fn scalar(timestamp_ms: u64, magnitude: f32, orig_magnitude: f32) -> Self {
        Self {
            timestamp_ms,
            magnitude,
            orig_magnitude,
            weight: 1.0,
            ..Self::default()
        }
    }
}

impl From<AccelSample> for DataPoint {
    fn from(sample: AccelSample) -> Self {
        DataPoint::raw(sample.timestamp_ms, sample.accel)
    }
}

/// The role a stage plays in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageRole {
    /// Magnitude extraction and resampling onto a fixed grid.
    PreProcess,
    /// Drops points outside periods of movement.
    MotionDetect,
    /// Low-pass smoothing. Absent in the skip-filter topology.
    Filter,
    /// Assigns a peak score to every point.
    Scoring,
    /// Selects candidate peaks from scored points.
    Detection,
    /// Debounces peaks into confirmed steps.
    PostProcess,
}

impl StageRole {
    pub fn name(&self) -> &'static str {
        match self {
            StageRole::PreProcess => "pre-process",
            StageRole::MotionDetect => "motion-detect",
            StageRole::Filter => "filter",
            StageRole::Scoring => "scoring",
            StageRole::Detection => "detection",
            StageRole::PostProcess => "post-process",
        }
    }
}

/// The two chain layouts the engine can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// All six stages, including smoothing.
    #[default]
    Full,
    /// Smoothing removed: motion-detected points go straight to scoring.
    SkipFilter,
}

impl Topology {
    /// Stage roles in chain order.
    pub fn roles(&self) -> &'static [StageRole] {
        match self {
            Topology::Full => &[
                StageRole::PreProcess,
                StageRole::MotionDetect,
                StageRole::Filter,
                StageRole::Scoring,
                StageRole::Detection,
                StageRole::PostProcess,
            ],
            Topology::SkipFilter => &[
                StageRole::PreProcess,
                StageRole::MotionDetect,
                StageRole::Scoring,
                StageRole::Detection,
                StageRole::PostProcess,
            ],
        }
    }

    /// Identify the topology a sequence of roles forms, if any.
    pub fn from_roles(roles: &[StageRole]) -> Option<Self> {
        [Topology::Full, Topology::SkipFilter]
            .into_iter()
            .find(|t| t.roles() == roles)
    }
}

// ============================================================================
// USER PROFILE
// ============================================================================

/// Selects the BMR formula branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Parse a single-letter code. "F" is female, every other code is male.
    pub fn from_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("f") {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

/// Body measurements of the wearer.
///
/// Values are not validated: a zero height gives a zero stride rather than
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Gender,
    pub age_years: u8,
    pub height_cm: u16,
    pub weight_kg: u16,
}

impl UserProfile {
    pub fn new(gender: Gender, age_years: u8, height_cm: u16, weight_kg: u16) -> Self {
        Self {
            gender,
            age_years,
            height_cm,
            weight_kg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_magnitude() {
        let sample = AccelSample::new(0, [3.0, 4.0, 0.0]);
        assert!((sample.magnitude() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_raw_point_from_sample() {
        let point: DataPoint = AccelSample::new(40, [0.0, 0.0, 9.81]).into();
        assert_eq!(point.timestamp_ms, 40);
        assert_eq!(point.accel, [0.0, 0.0, 9.81]);
        assert_eq!(point.magnitude, 0.0);
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("F"), Gender::Female);
        assert_eq!(Gender::from_code("f"), Gender::Female);
        assert_eq!(Gender::from_code("M"), Gender::Male);
        assert_eq!(Gender::from_code(""), Gender::Male);
    }

    #[test]
    fn test_topology_roles() {
        assert_eq!(Topology::Full.roles().len(), 6);
        assert_eq!(Topology::SkipFilter.roles().len(), 5);
        assert!(!Topology::SkipFilter.roles().contains(&StageRole::Filter));
        assert_eq!(
            Topology::from_roles(Topology::SkipFilter.roles()),
            Some(Topology::SkipFilter)
        );
        assert_eq!(
            Topology::from_roles(&[StageRole::Scoring, StageRole::PreProcess]),
            None
        );
    }
}
