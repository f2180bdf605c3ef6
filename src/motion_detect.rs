//! Motion detection.
//!
//! Steps only happen while the wearer moves. This stage keeps a short sliding
//! window of magnitudes and lets a point through only when the window's
//! standard deviation reaches the motion threshold. A device lying on a
//! table, or a wrist resting on a desk, produces almost no variation and is
//! absorbed here before it can feed spurious peaks downstream.
//!
//! Design: fixed window, recomputed per point. O(window) with a window of
//! half a second, no allocation.

use crate::config::Tuning;
use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole};

/// Window length in points (500ms at 50Hz).
pub const MOTION_WINDOW: usize = 25;

pub struct MotionDetectStage {
    threshold: f32,
    window: [f32; MOTION_WINDOW],
    index: usize,
    filled: usize,
}

impl MotionDetectStage {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            window: [0.0; MOTION_WINDOW],
            index: 0,
            filled: 0,
        }
    }

    pub fn set_motion_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn motion_threshold(&self) -> f32 {
        self.threshold
    }

    /// Standard deviation over the window, or `None` until it is full.
    pub fn window_deviation(&self) -> Option<f32> {
        if self.filled < MOTION_WINDOW {
            return None;
        }
        let mean = self.window.iter().sum::<f32>() / MOTION_WINDOW as f32;
        let variance = self
            .window
            .iter()
            .map(|m| (m - mean) * (m - mean))
            .sum::<f32>()
            / MOTION_WINDOW as f32;
        Some(variance.sqrt())
    }
}

impl Stage for MotionDetectStage {
    fn role(&self) -> StageRole {
        StageRole::MotionDetect
    }

    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, _ctx: &mut StageContext<'_>) {
        self.window[self.index] = point.magnitude;
        self.index = (self.index + 1) % MOTION_WINDOW;
        self.filled = (self.filled + 1).min(MOTION_WINDOW);

        match self.window_deviation() {
            Some(deviation) if deviation >= self.threshold => {
                let mut moving = point;
                moving.in_motion = true;
                if out.push(moving) {
                    log::trace!("motion-detect output full, evicted oldest point");
                }
            }
            _ => {}
        }
    }

    fn tune(&mut self, tuning: &Tuning) {
        self.set_motion_threshold(tuning.motion_threshold);
    }

    fn reset(&mut self) {
        self.window = [0.0; MOTION_WINDOW];
        self.index = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use crate::stage::{drive, test_constants};

    fn points(values: impl IntoIterator<Item = f32>) -> Vec<DataPoint> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, m)| DataPoint::scalar(i as u64 * 20, m, m))
            .collect()
    }

    #[test]
    fn test_still_input_is_absorbed() {
        let mut stage = MotionDetectStage::new(0.6);
        let out = drive(
            &mut stage,
            &mut SessionMetrics::default(),
            &test_constants(),
            points(std::iter::repeat(9.81).take(200)),
        );
        assert!(out.is_empty());
        assert!(stage.window_deviation().unwrap() < 1e-3);
    }

    #[test]
    fn test_moving_input_passes_once_window_is_full() {
        let mut stage = MotionDetectStage::new(0.6);
        let values = (0..100).map(|i| if i % 2 == 0 { 8.0 } else { 12.0 });
        let out = drive(
            &mut stage,
            &mut SessionMetrics::default(),
            &test_constants(),
            points(values),
        );

        assert_eq!(out.len(), 100 - (MOTION_WINDOW - 1));
        assert!(out.iter().all(|p| p.in_motion));
        assert_eq!(out[0].timestamp_ms, (MOTION_WINDOW as u64 - 1) * 20);
    }

    #[test]
    fn test_tune_sets_threshold() {
        let mut stage = MotionDetectStage::new(0.6);
        let mut tuning = Tuning::default();
        tuning.motion_threshold = 3.0;
        stage.tune(&tuning);
        assert_eq!(stage.motion_threshold(), 3.0);

        // ±2 swing has a deviation of 2, below the new threshold
        let values = (0..60).map(|i| if i % 2 == 0 { 8.0 } else { 12.0 });
        let out = drive(
            &mut stage,
            &mut SessionMetrics::default(),
            &test_constants(),
            points(values),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_reset_empties_window() {
        let mut stage = MotionDetectStage::new(0.0);
        drive(
            &mut stage,
            &mut SessionMetrics::default(),
            &test_constants(),
            points(std::iter::repeat(1.0).take(MOTION_WINDOW)),
        );
        assert!(stage.window_deviation().is_some());
        stage.reset();
        assert!(stage.window_deviation().is_none());
    }
}
