//! Post-processing: peak debounce and energy accounting.
//!
//! Detection can report several peaks for one heel strike (a double bump in
//! the signal, noise on the crest). This stage keeps one candidate at a time:
//! - a new peak within `time_threshold_ms` of the candidate replaces it only
//!   if it scores higher;
//! - a peak further away confirms the candidate as a step and becomes the
//!   new candidate.
//!
//! A step is therefore reported when the next one begins.
//!
//! Confirmed steps also drive calorie accumulation: the time since the
//! previous step counts as activity at `ACTIVE_MET` times the basal rate.

use crate::config::Tuning;
use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole};

/// Metabolic equivalent credited to walking time.
pub const ACTIVE_MET: f64 = 3.5;

/// Longest step interval credited as activity (ms).
pub const MAX_STEP_INTERVAL_MS: u64 = 2000;

pub struct PostProcessStage {
    time_threshold_ms: u64,
    candidate: Option<DataPoint>,
    last_step_ms: Option<u64>,
}

impl PostProcessStage {
    pub fn new(time_threshold_ms: u32) -> Self {
        Self {
            time_threshold_ms: time_threshold_ms as u64,
            candidate: None,
            last_step_ms: None,
        }
    }

    pub fn set_time_threshold(&mut self, time_threshold_ms: u32) {
        self.time_threshold_ms = time_threshold_ms as u64;
    }

    pub fn time_threshold_ms(&self) -> u64 {
        self.time_threshold_ms
    }

    /// Peak waiting for confirmation, if any.
    pub fn candidate(&self) -> Option<&DataPoint> {
        self.candidate.as_ref()
    }

    fn confirm(&mut self, step: DataPoint, out: &mut PointBuffer, ctx: &mut StageContext<'_>) {
        if let Some(last) = self.last_step_ms {
            let interval = step.timestamp_ms.saturating_sub(last).min(MAX_STEP_INTERVAL_MS);
            let bmr = ctx.constants().bmr as f64;
            ctx.add_kcalories(bmr * ACTIVE_MET * interval as f64);
        }
        self.last_step_ms = Some(step.timestamp_ms);

        if out.push(step) {
            log::trace!("step output full, evicted oldest step");
        }
    }
}

impl Stage for PostProcessStage {
    fn role(&self) -> StageRole {
        StageRole::PostProcess
    }

    fn process(&mut self, peak: DataPoint, out: &mut PointBuffer, ctx: &mut StageContext<'_>) {
        let Some(current) = self.candidate else {
            self.candidate = Some(peak);
            return;
        };

        let gap = peak.timestamp_ms.saturating_sub(current.timestamp_ms);
        if gap < self.time_threshold_ms {
            if peak.score > current.score {
                self.candidate = Some(peak);
            }
            return;
        }

        self.confirm(current, out, ctx);
        self.candidate = Some(peak);
    }

    fn tune(&mut self, tuning: &Tuning) {
        self.set_time_threshold(tuning.time_threshold_ms);
    }

    fn reset(&mut self) {
        self.candidate = None;
        self.last_step_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use crate::stage::{drive, test_constants};

    fn peak(timestamp_ms: u64, score: f32) -> DataPoint {
        let mut p = DataPoint::scalar(timestamp_ms, 12.0, 12.0);
        p.score = score;
        p
    }

    #[test]
    fn test_regular_peaks_confirm_previous() {
        let mut stage = PostProcessStage::new(200);
        let mut metrics = SessionMetrics::default();
        let peaks = (0..5).map(|i| peak(i * 500, 2.0));
        let steps = drive(&mut stage, &mut metrics, &test_constants(), peaks);

        // Last peak is still waiting for its successor
        assert_eq!(steps.len(), 4);
        assert_eq!(stage.candidate().map(|p| p.timestamp_ms), Some(2000));
    }

    #[test]
    fn test_close_peaks_merge_keeping_strongest() {
        let mut stage = PostProcessStage::new(200);
        let mut metrics = SessionMetrics::default();
        let peaks = vec![peak(0, 1.0), peak(100, 3.0), peak(150, 2.0), peak(600, 1.0)];
        let steps = drive(&mut stage, &mut metrics, &test_constants(), peaks);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].timestamp_ms, 100);
        assert_eq!(steps[0].score, 3.0);
    }

    #[test]
    fn test_calories_accumulate_per_interval() {
        let mut stage = PostProcessStage::new(200);
        let mut metrics = SessionMetrics::default();
        let peaks = (0..4).map(|i| peak(i * 500, 2.0));
        drive(&mut stage, &mut metrics, &test_constants(), peaks);

        // Three confirmed steps, the first has no preceding interval
        let expected = 1440.0 * ACTIVE_MET * 500.0 * 2.0;
        assert!((metrics.kcalories - expected).abs() < 1e-6);
    }

    #[test]
    fn test_interval_capped() {
        let mut stage = PostProcessStage::new(200);
        let mut metrics = SessionMetrics::default();
        let peaks = vec![peak(0, 1.0), peak(10_000, 1.0), peak(10_500, 1.0)];
        drive(&mut stage, &mut metrics, &test_constants(), peaks);

        let expected = 1440.0 * ACTIVE_MET * MAX_STEP_INTERVAL_MS as f64;
        assert!((metrics.kcalories - expected).abs() < 1e-6);
    }

    #[test]
    fn test_tune_and_reset() {
        let mut stage = PostProcessStage::new(200);
        let mut tuning = Tuning::default();
        tuning.time_threshold_ms = 600;
        stage.tune(&tuning);
        assert_eq!(stage.time_threshold_ms(), 600);

        let mut metrics = SessionMetrics::default();
        let steps = drive(
            &mut stage,
            &mut metrics,
            &test_constants(),
            (0..4).map(|i| peak(i * 150, 1.0)),
        );
        assert!(steps.is_empty());

        stage.reset();
        assert!(stage.candidate().is_none());
    }
}
