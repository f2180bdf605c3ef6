//! Pedometer session: the public face of the engine.
//!
//! A `Session` owns everything mutable: the user profile and the constants
//! derived from it, the pipeline, and the accumulated metrics. There are no
//! globals, so independent sessions can coexist (one per wearer, one per
//! test).
//!
//! # Lifecycle
//!
//! - `new` / `with_factory` build the chain (`init_algo`)
//! - `process_sample` runs one sample through the whole cascade
//! - `reset_algo` clears signal-processing state but keeps the step count
//! - `reset_steps` clears the counts but keeps signal-processing state
//!
//! The two resets are independent: restarting the signal chain (e.g. after
//! the device was taken off) keeps the day's tally, and starting a new tally
//! keeps the filters warm.

use crate::config::EngineConfig;
use crate::error::{PedometerError, Result};
use crate::metrics::{self, DerivedConstants, SessionMetrics};
use crate::pipeline::Pipeline;
use crate::stage::{StageContext, StageFactory, StandardStages};
use crate::types::{AccelSample, DataPoint, Topology, UserProfile};

pub struct Session {
    config: EngineConfig,
    factory: Box<dyn StageFactory>,

    profile: UserProfile,
    constants: DerivedConstants,

    pipeline: Pipeline,
    metrics: SessionMetrics,
}

impl Session {
    /// Create a session with the reference stages.
    pub fn new(config: EngineConfig, profile: UserProfile) -> Result<Self> {
        Self::with_factory(config, profile, Box::new(StandardStages))
    }

    /// Create a session whose stages come from `factory`.
    pub fn with_factory(
        config: EngineConfig,
        profile: UserProfile,
        factory: Box<dyn StageFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let pipeline = build_pipeline(&config, factory.as_ref())?;

        let mut session = Self {
            config,
            factory,
            profile,
            constants: DerivedConstants::from_profile(&profile),
            pipeline,
            metrics: SessionMetrics::default(),
        };
        session.init_user_data(profile);
        log::info!(
            "step counter initialised ({:?}, bmr {:.1} kcal/day, stride {:.3} m)",
            session.pipeline.topology(),
            session.constants.bmr,
            session.constants.stride
        );
        Ok(session)
    }

    /// Replace the user profile and recompute the derived constants.
    ///
    /// Zeroes the calorie accumulator, since it was computed with the old BMR.
    pub fn init_user_data(&mut self, profile: UserProfile) {
        self.profile = profile;
        self.constants = DerivedConstants::from_profile(&profile);
        self.metrics.kcalories = 0.0;
    }

    /// Re-initialise: new profile and a freshly built chain.
    ///
    /// Step count and distance are left alone; use `reset_steps` for those.
    pub fn init_algo(&mut self, profile: UserProfile) -> Result<()> {
        self.init_user_data(profile);
        self.pipeline = build_pipeline(&self.config, self.factory.as_ref())?;
        self.metrics.mean_peak_time = 0.0;
        log::info!("step counter rebuilt ({:?})", self.pipeline.topology());
        Ok(())
    }

    /// Run one accelerometer sample through the pipeline.
    ///
    /// Returns the number of steps confirmed while processing it.
    pub fn process_sample(&mut self, timestamp_ms: u64, x: f32, y: f32, z: f32) -> u32 {
        let mut ctx = StageContext::new(&mut self.metrics, &self.constants);
        let confirmed = self.pipeline.feed(DataPoint::raw(timestamp_ms, [x, y, z]), &mut ctx);
        if confirmed > 0 {
            log::debug!(
                "{} step(s) at {}ms, total {}",
                confirmed,
                timestamp_ms,
                self.metrics.steps
            );
        }
        confirmed
    }

    pub fn process(&mut self, sample: &AccelSample) -> u32 {
        let [x, y, z] = sample.accel;
        self.process_sample(sample.timestamp_ms, x, y, z)
    }

    /// Zero steps, distance, MET and calories.
    pub fn reset_steps(&mut self) {
        self.metrics.reset_counts();
        log::debug!("step count reset");
    }

    /// Clear every stage and buffer, and the signal-derived metrics.
    ///
    /// The step count survives.
    pub fn reset_algo(&mut self) {
        self.pipeline.reset();
        self.metrics.reset_signal_state();
        log::debug!("pipeline state reset, {} steps kept", self.metrics.steps);
    }

    // ========================================================================
    // METRICS
    // ========================================================================

    pub fn steps(&self) -> u32 {
        self.metrics.steps
    }

    /// Distance travelled, accumulated per detected step.
    pub fn distance(&self) -> f32 {
        self.metrics.distance()
    }

    /// Steps per second since the start of the stream.
    ///
    /// Uses the timestamp of the latest peak as elapsed time, so it fails
    /// with `NoData` until a peak has been detected.
    pub fn steps_per_sec(&self) -> Result<f32> {
        let last = self.pipeline.last_peak().ok_or(PedometerError::NoData)?;
        metrics::steps_per_sec(self.metrics.steps, last.timestamp_ms).ok_or(PedometerError::NoData)
    }

    /// Energy expenditure in kcal.
    pub fn calories(&self) -> f64 {
        self.metrics.calories()
    }

    /// Mean time between peaks in ms, as maintained by detection.
    pub fn mean_peak_time(&self) -> f32 {
        self.metrics.mean_peak_time
    }

    pub fn met(&self) -> f32 {
        self.metrics.met
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn constants(&self) -> &DerivedConstants {
        &self.constants
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn topology(&self) -> Topology {
        self.pipeline.topology()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

fn build_pipeline(config: &EngineConfig, factory: &dyn StageFactory) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(factory.build(config))?;
    if pipeline.topology() != config.topology {
        return Err(PedometerError::InvalidTopology(pipeline.roles()));
    }
    pipeline.apply_tuning(&config.tuning);
    Ok(pipeline)
}
