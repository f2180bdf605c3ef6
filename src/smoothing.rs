//! Low-pass smoothing (the filter stage).
//!
//! A 5-tap binomial FIR. Cheap, linear phase, and enough to knock sensor
//! noise off the magnitude signal before scoring without flattening the
//! 1-3Hz gait band. The output point is the centre of the tap window, so
//! the stage adds a two-point delay.

use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole};

const TAP_COUNT: usize = 5;
const TAPS: [f32; TAP_COUNT] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];
const CENTER: usize = TAP_COUNT / 2;

pub struct SmoothingStage {
    history: [DataPoint; TAP_COUNT],
    /// Slot the next point is written to; also the oldest slot once full.
    index: usize,
    filled: usize,
}

impl SmoothingStage {
    pub fn new() -> Self {
        Self {
            history: [DataPoint::default(); TAP_COUNT],
            index: 0,
            filled: 0,
        }
    }

    fn oldest_first(&self, k: usize) -> &DataPoint {
        &self.history[(self.index + k) % TAP_COUNT]
    }
}

impl Default for SmoothingStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for SmoothingStage {
    fn role(&self) -> StageRole {
        StageRole::Filter
    }

    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, _ctx: &mut StageContext<'_>) {
        self.history[self.index] = point;
        self.index = (self.index + 1) % TAP_COUNT;
        self.filled = (self.filled + 1).min(TAP_COUNT);
        if self.filled < TAP_COUNT {
            return;
        }

        let smoothed: f32 = TAPS
            .iter()
            .enumerate()
            .map(|(k, tap)| tap * self.oldest_first(k).magnitude)
            .sum();

        let mut centre = *self.oldest_first(CENTER);
        centre.magnitude = smoothed;
        if out.push(centre) {
            log::trace!("filter output full, evicted oldest point");
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use crate::stage::{drive, test_constants};

    fn run(stage: &mut SmoothingStage, values: &[f32]) -> Vec<DataPoint> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, m)| DataPoint::scalar(i as u64 * 20, *m, *m + 100.0));
        drive(stage, &mut SessionMetrics::default(), &test_constants(), points)
    }

    #[test]
    fn test_constant_signal_unchanged() {
        let mut stage = SmoothingStage::new();
        let out = run(&mut stage, &[3.0; 10]);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|p| (p.magnitude - 3.0).abs() < 1e-6));
    }

    #[test]
    fn test_impulse_response_matches_taps() {
        let mut stage = SmoothingStage::new();
        let mut values = [0.0f32; 9];
        values[4] = 16.0;
        let out = run(&mut stage, &values);

        let response: Vec<f32> = out.iter().map(|p| p.magnitude).collect();
        assert_eq!(response, vec![1.0, 4.0, 6.0, 4.0, 1.0]);
    }

    #[test]
    fn test_output_carries_centre_point() {
        let mut stage = SmoothingStage::new();
        let out = run(&mut stage, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp_ms, 40);
        // Original magnitude is the centre's, untouched by smoothing
        assert_eq!(out[0].orig_magnitude, 103.0);
        assert!((out[0].magnitude - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_restarts_warm_up() {
        let mut stage = SmoothingStage::new();
        run(&mut stage, &[1.0; 5]);
        stage.reset();
        assert!(run(&mut stage, &[1.0; 4]).is_empty());
    }
}
