//! Engine configuration.
//!
//! `EngineConfig` fixes everything decided once at initialization: the chain
//! topology, the resampling grid and the four tunables handed to the stages.
//! It deserializes from JSON with every field optional, falling back to the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{PedometerError, Result};
use crate::stage::BUFFER_CAPACITY;
use crate::types::Topology;

/// Largest scoring window the scoring stage can hold.
pub const MAX_WINDOW_SIZE: usize = 63;

/// Smallest scoring window with a centre and one neighbour on each side.
pub const MIN_WINDOW_SIZE: usize = 3;

/// Peak detection threshold as an integer part plus hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionThreshold {
    pub whole: u8,
    /// Fractional part in hundredths, 0..=99.
    pub hundredths: u8,
}

impl DetectionThreshold {
    pub fn new(whole: u8, hundredths: u8) -> Self {
        Self { whole, hundredths }
    }

    pub fn value(&self) -> f32 {
        self.whole as f32 + self.hundredths as f32 / 100.0
    }
}

impl Default for DetectionThreshold {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Parameters pushed to the stages when the chain is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Scoring window in points. Even values are rounded down to odd.
    pub window_size: usize,

    /// Peak must exceed the running score mean by this many deviations.
    pub detection_threshold: DetectionThreshold,

    /// Peaks closer than this (ms) are merged by post-processing.
    pub time_threshold_ms: u32,

    /// Minimum magnitude standard deviation (m/s²) that counts as movement.
    pub motion_threshold: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            window_size: 15,           // 300ms at 50Hz
            detection_threshold: DetectionThreshold::default(),
            time_threshold_ms: 200,    // Max ~5 steps/sec
            motion_threshold: 0.6,
        }
    }
}

/// Complete configuration for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain layout, fixed for the lifetime of the pipeline.
    pub topology: Topology,

    /// Resampling grid period in milliseconds.
    pub sample_period_ms: u32,

    /// Input gaps longer than this restart the resampling grid.
    pub max_gap_ms: u32,

    pub tuning: Tuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Full,
            sample_period_ms: 20,  // 50Hz baseline
            max_gap_ms: 1000,
            tuning: Tuning::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration with the smoothing stage removed.
    pub fn skip_filter() -> Self {
        Self {
            topology: Topology::SkipFilter,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the stages cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_period_ms == 0 {
            return Err(PedometerError::InvalidConfig(
                "sample_period_ms must be positive".into(),
            ));
        }
        if self.max_gap_ms < self.sample_period_ms {
            return Err(PedometerError::InvalidConfig(format!(
                "max_gap_ms ({}) is shorter than sample_period_ms ({})",
                self.max_gap_ms, self.sample_period_ms
            )));
        }

        // The grid points interpolated across the longest bridged gap all
        // land in the pre-process output buffer at once.
        let longest_gap_ms = self.sample_period_ms as u64 * BUFFER_CAPACITY as u64;
        if self.max_gap_ms as u64 > longest_gap_ms {
            return Err(PedometerError::InvalidConfig(format!(
                "max_gap_ms ({}) spans more than {} sample periods",
                self.max_gap_ms, BUFFER_CAPACITY
            )));
        }

        let tuning = &self.tuning;
        if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&tuning.window_size) {
            return Err(PedometerError::InvalidConfig(format!(
                "window_size {} outside {}..={}",
                tuning.window_size, MIN_WINDOW_SIZE, MAX_WINDOW_SIZE
            )));
        }
        if tuning.detection_threshold.hundredths > 99 {
            return Err(PedometerError::InvalidConfig(format!(
                "detection threshold hundredths {} exceeds 99",
                tuning.detection_threshold.hundredths
            )));
        }
        if !tuning.motion_threshold.is_finite() || tuning.motion_threshold < 0.0 {
            return Err(PedometerError::InvalidConfig(format!(
                "motion_threshold {} must be a non-negative number",
                tuning.motion_threshold
            )));
        }
        Ok(())
    }
}
