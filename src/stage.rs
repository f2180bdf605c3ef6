//! The stage contract.
//!
//! A stage receives one point at a time, updates whatever internal state it
//! keeps, and writes zero or more points to its output buffer. The pipeline
//! decides when a stage runs; a stage never calls its neighbour directly.
//!
//! Stages cannot fail. A stage that has nothing to say for an input simply
//! emits nothing, which ends the cascade for that point.

use crate::config::{EngineConfig, Tuning};
use crate::detection::DetectionStage;
use crate::metrics::{DerivedConstants, SessionMetrics};
use crate::motion_detect::MotionDetectStage;
use crate::post_process::PostProcessStage;
use crate::preprocess::PreProcessStage;
use crate::ring_buffer::RingBuffer;
use crate::scoring::ScoringStage;
use crate::smoothing::SmoothingStage;
use crate::types::{DataPoint, StageRole, Topology};

/// Capacity of every inter-stage buffer.
pub const BUFFER_CAPACITY: usize = 64;

/// Buffer type connecting two stages.
pub type PointBuffer = RingBuffer<DataPoint, BUFFER_CAPACITY>;

/// A processing unit in the chain.
pub trait Stage: Send {
    /// Position this stage occupies in the chain.
    fn role(&self) -> StageRole;

    /// Handle one input point, pushing any outputs to `out`.
    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, ctx: &mut StageContext<'_>);

    /// Pick up the tunables relevant to this stage.
    fn tune(&mut self, _tuning: &Tuning) {}

    /// Forget all history, as if freshly built.
    fn reset(&mut self) {}
}

/// Session state a stage is allowed to see during a cascade.
///
/// Stages read the profile-derived constants and write the accumulators they
/// own. Step count and distance are only touched by the pipeline itself.
pub struct StageContext<'a> {
    pub(crate) metrics: &'a mut SessionMetrics,
    constants: &'a DerivedConstants,
}

impl<'a> StageContext<'a> {
    pub fn new(metrics: &'a mut SessionMetrics, constants: &'a DerivedConstants) -> Self {
        Self { metrics, constants }
    }

    pub fn constants(&self) -> &DerivedConstants {
        self.constants
    }

    /// Add to the calorie accumulator (kcal/day × ms).
    pub fn add_kcalories(&mut self, amount: f64) {
        self.metrics.kcalories += amount;
    }

    /// Add to the MET accumulator.
    pub fn increase_met(&mut self, amount: f32) {
        self.metrics.met += amount;
    }

    /// Publish the mean interval between detected peaks (ms).
    pub fn set_mean_peak_time(&mut self, mean_ms: f32) {
        self.metrics.mean_peak_time = mean_ms;
    }

    pub fn mean_peak_time(&self) -> f32 {
        self.metrics.mean_peak_time
    }
}

/// Builds the stage list for a configuration.
///
/// The session keeps its factory so that re-initialization can rebuild the
/// chain from scratch.
pub trait StageFactory: Send {
    fn build(&self, config: &EngineConfig) -> Vec<Box<dyn Stage>>;
}

/// The reference implementation of every role.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStages;

impl StageFactory for StandardStages {
    fn build(&self, config: &EngineConfig) -> Vec<Box<dyn Stage>> {
        config
            .topology
            .roles()
            .iter()
            .map(|role| standard_stage(*role, config))
            .collect()
    }
}

fn standard_stage(role: StageRole, config: &EngineConfig) -> Box<dyn Stage> {
    match role {
        StageRole::PreProcess => Box::new(PreProcessStage::new(
            config.sample_period_ms,
            config.max_gap_ms,
        )),
        StageRole::MotionDetect => Box::new(MotionDetectStage::new(config.tuning.motion_threshold)),
        StageRole::Filter => Box::new(SmoothingStage::new()),
        StageRole::Scoring => Box::new(ScoringStage::new(config.tuning.window_size)),
        StageRole::Detection => Box::new(DetectionStage::new(config.tuning.detection_threshold)),
        StageRole::PostProcess => Box::new(PostProcessStage::new(config.tuning.time_threshold_ms)),
    }
}

/// Feed points straight into one stage and collect everything it emits.
#[cfg(test)]
pub(crate) fn drive<S: Stage>(
    stage: &mut S,
    metrics: &mut SessionMetrics,
    constants: &DerivedConstants,
    points: impl IntoIterator<Item = DataPoint>,
) -> Vec<DataPoint> {
    let mut ctx = StageContext::new(metrics, constants);
    let mut out = PointBuffer::new();
    let mut emitted = Vec::new();
    for point in points {
        stage.process(point, &mut out, &mut ctx);
        while let Some(p) = out.pop() {
            emitted.push(p);
        }
    }
    emitted
}

#[cfg(test)]
pub(crate) fn test_constants() -> DerivedConstants {
    DerivedConstants {
        bmr: 1440.0,
        bmr_per_minute: 1.0,
        stride: 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_stages_follow_topology() {
        for topology in [Topology::Full, Topology::SkipFilter] {
            let config = EngineConfig {
                topology,
                ..EngineConfig::default()
            };
            let roles: Vec<StageRole> = StandardStages
                .build(&config)
                .iter()
                .map(|s| s.role())
                .collect();
            assert_eq!(roles.as_slice(), topology.roles());
        }
    }

    #[test]
    fn test_context_accumulators() {
        let mut metrics = SessionMetrics::default();
        let constants = DerivedConstants {
            bmr: 1440.0,
            bmr_per_minute: 1.0,
            stride: 0.7,
        };
        let mut ctx = StageContext::new(&mut metrics, &constants);
        ctx.add_kcalories(10.0);
        ctx.add_kcalories(5.0);
        ctx.increase_met(1.5);
        ctx.set_mean_peak_time(450.0);
        assert_eq!(ctx.constants().stride, 0.7);
        assert_eq!(ctx.mean_peak_time(), 450.0);

        assert_eq!(metrics.kcalories, 15.0);
        assert_eq!(metrics.met, 1.5);
        assert_eq!(metrics.steps, 0);
    }
}
