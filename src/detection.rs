//! Peak detection.
//!
//! Picks candidate steps out of the scored stream. A point is a peak when
//! - its score is a local maximum (higher than the point before it, not
//!   lower than the point after it), and
//! - the score stands out from the running score distribution by more than
//!   `threshold` standard deviations.
//!
//! Statistics are incremental (Welford), O(1) per point. The local-maximum
//! test needs the following point, so peaks leave this stage one point late.
//!
//! This stage also owns the mean time between peaks and publishes it to the
//! session, and sets each peak's distance weight from the user's stride.

use crate::config::{DetectionThreshold, Tuning};
use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole};

/// Scores to observe before the running statistics are trusted.
pub const WARM_UP_SCORES: u32 = 10;

/// Peak intervals longer than this are pauses and stay out of the mean.
pub const MAX_PEAK_INTERVAL_MS: u64 = 2000;

/// Running mean and variance.
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u32,
    mean: f32,
    m2: f32,
}

impl RunningStats {
    fn push(&mut self, value: f32) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f32;
        self.m2 += delta * (value - self.mean);
    }

    fn std_dev(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f32).max(0.0).sqrt()
    }
}

pub struct DetectionStage {
    threshold: f32,

    scores: RunningStats,
    orig_magnitudes: RunningStats,

    // Local-maximum lookahead
    before: Option<DataPoint>,
    pending: Option<DataPoint>,

    // Peak timing
    last_peak_ms: Option<u64>,
    intervals: RunningStats,
}

impl DetectionStage {
    pub fn new(threshold: DetectionThreshold) -> Self {
        Self {
            threshold: threshold.value(),
            scores: RunningStats::default(),
            orig_magnitudes: RunningStats::default(),
            before: None,
            pending: None,
            last_peak_ms: None,
            intervals: RunningStats::default(),
        }
    }

    pub fn set_threshold(&mut self, threshold: DetectionThreshold) {
        self.threshold = threshold.value();
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Mean interval between peaks in ms, 0 until two peaks were seen.
    pub fn mean_peak_interval(&self) -> f32 {
        self.intervals.mean
    }

    fn is_peak(&self, candidate: &DataPoint, before: &DataPoint, after: &DataPoint) -> bool {
        if self.scores.count < WARM_UP_SCORES {
            return false;
        }
        let local_max = candidate.score > before.score && candidate.score >= after.score;
        local_max && candidate.score - self.scores.mean > self.threshold * self.scores.std_dev()
    }

    fn emit_peak(&mut self, mut peak: DataPoint, out: &mut PointBuffer, ctx: &mut StageContext<'_>) {
        // orig_magnitude × weight = stride (mm) scaled by how hard this step was
        let reference = self.orig_magnitudes.mean;
        peak.weight = if reference > f32::EPSILON {
            ctx.constants().stride * 1000.0 / reference
        } else {
            0.0
        };

        if let Some(last) = self.last_peak_ms {
            let interval = peak.timestamp_ms.saturating_sub(last);
            if interval <= MAX_PEAK_INTERVAL_MS {
                self.intervals.push(interval as f32);
                ctx.set_mean_peak_time(self.intervals.mean);
            }
        }
        self.last_peak_ms = Some(peak.timestamp_ms);

        if out.push(peak) {
            log::trace!("detection output full, evicted oldest peak");
        }
    }
}

impl Stage for DetectionStage {
    fn role(&self) -> StageRole {
        StageRole::Detection
    }

    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, ctx: &mut StageContext<'_>) {
        self.scores.push(point.score);
        self.orig_magnitudes.push(point.orig_magnitude);

        if let (Some(before), Some(candidate)) = (self.before, self.pending) {
            if self.is_peak(&candidate, &before, &point) {
                self.emit_peak(candidate, out, ctx);
            }
        }

        self.before = self.pending;
        self.pending = Some(point);
    }

    fn tune(&mut self, tuning: &Tuning) {
        self.set_threshold(tuning.detection_threshold);
    }

    fn reset(&mut self) {
        self.scores = RunningStats::default();
        self.orig_magnitudes = RunningStats::default();
        self.before = None;
        self.pending = None;
        self.last_peak_ms = None;
        self.intervals = RunningStats::default();
    }
}
