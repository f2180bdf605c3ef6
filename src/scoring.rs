//! Peak scoring.
//!
//! Every point gets a score describing how much it stands out from its
//! neighbourhood: the mean of its height above the left half-window and its
//! height above the right half-window. A heel strike sits above both sides
//! and scores high; a point on a steady slope is above one side and below
//! the other and scores near zero.
//!
//! The score belongs to the centre of the window, so the stage delays its
//! output by half a window.

use crate::config::{Tuning, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole};

pub struct ScoringStage {
    /// Points on each side of the centre.
    half: usize,
    history: [DataPoint; MAX_WINDOW_SIZE],
    index: usize,
    filled: usize,
}

impl ScoringStage {
    pub fn new(window_size: usize) -> Self {
        Self {
            half: half_window(window_size),
            history: [DataPoint::default(); MAX_WINDOW_SIZE],
            index: 0,
            filled: 0,
        }
    }

    /// Effective window length, always odd.
    pub fn window_size(&self) -> usize {
        2 * self.half + 1
    }

    /// Change the window. Collected history is discarded.
    pub fn set_window_size(&mut self, window_size: usize) {
        self.half = half_window(window_size);
        self.reset();
    }

    /// k-th point of the current window, oldest first.
    fn window_point(&self, k: usize) -> &DataPoint {
        let len = self.window_size();
        &self.history[(self.index + MAX_WINDOW_SIZE - len + k) % MAX_WINDOW_SIZE]
    }

    fn mean_magnitude(&self, range: std::ops::Range<usize>) -> f32 {
        let count = range.len() as f32;
        range.map(|k| self.window_point(k).magnitude).sum::<f32>() / count
    }
}

/// Clamp to the supported range and round even sizes down to odd.
fn half_window(window_size: usize) -> usize {
    let size = window_size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE);
    (size - 1) / 2
}

impl Stage for ScoringStage {
    fn role(&self) -> StageRole {
        StageRole::Scoring
    }

    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, _ctx: &mut StageContext<'_>) {
        self.history[self.index] = point;
        self.index = (self.index + 1) % MAX_WINDOW_SIZE;
        self.filled = (self.filled + 1).min(MAX_WINDOW_SIZE);

        let len = self.window_size();
        if self.filled < len {
            return;
        }

        let centre = self.window_point(self.half).magnitude;
        let left = self.mean_magnitude(0..self.half);
        let right = self.mean_magnitude(self.half + 1..len);

        let mut scored = *self.window_point(self.half);
        scored.score = ((centre - left) + (centre - right)) / 2.0;
        if out.push(scored) {
            log::trace!("scoring output full, evicted oldest point");
        }
    }

    fn tune(&mut self, tuning: &Tuning) {
        self.set_window_size(tuning.window_size);
    }

    fn reset(&mut self) {
        self.index = 0;
        self.filled = 0;
    }
}
