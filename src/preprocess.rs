//! Pre-processing: magnitude extraction and resampling.
//!
//! Raw accelerometer vectors are reduced to their magnitude, which makes the
//! rest of the chain independent of how the device is worn. Sensor
//! timestamps jitter, so the magnitude is linearly interpolated onto a fixed
//! grid of `period_ms`. Every downstream window is then a fixed duration.
//!
//! Design note: O(1) state, the previous sample only. A gap longer than
//! `max_gap_ms` is treated as a discontinuity and the grid restarts at the
//! new sample instead of interpolating across it.

use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{vector_magnitude, DataPoint, StageRole};

pub struct PreProcessStage {
    period_ms: u64,
    max_gap_ms: u64,

    /// Last accepted raw sample (timestamp, magnitude).
    previous: Option<(u64, f32)>,
    /// Next grid timestamp to emit. `None` once the grid runs past `u64::MAX`.
    next_grid_ms: Option<u64>,

    /// Samples rejected for non-increasing timestamps.
    dropped: u64,
}

impl PreProcessStage {
    pub fn new(period_ms: u32, max_gap_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1) as u64,
            max_gap_ms: max_gap_ms as u64,
            previous: None,
            next_grid_ms: None,
            dropped: 0,
        }
    }

    /// Samples rejected because time did not advance.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn restart(&mut self, timestamp_ms: u64, magnitude: f32, out: &mut PointBuffer) {
        self.previous = Some((timestamp_ms, magnitude));
        self.next_grid_ms = timestamp_ms.checked_add(self.period_ms);
        emit(out, DataPoint::scalar(timestamp_ms, magnitude, magnitude));
    }
}

fn emit(out: &mut PointBuffer, point: DataPoint) {
    if out.push(point) {
        log::trace!("pre-process output full, evicted oldest point");
    }
}

impl Stage for PreProcessStage {
    fn role(&self) -> StageRole {
        StageRole::PreProcess
    }

    fn process(&mut self, point: DataPoint, out: &mut PointBuffer, _ctx: &mut StageContext<'_>) {
        let magnitude = vector_magnitude(point.accel);
        let now = point.timestamp_ms;

        let Some((prev_ms, prev_magnitude)) = self.previous else {
            self.restart(now, magnitude, out);
            return;
        };

        if now <= prev_ms {
            self.dropped += 1;
            log::trace!("dropping sample at {}ms, not after {}ms", now, prev_ms);
            return;
        }

        let span = now - prev_ms;
        if span > self.max_gap_ms {
            log::debug!("{}ms gap in input, restarting resampling grid", span);
            self.restart(now, magnitude, out);
            return;
        }

        while let Some(grid_ms) = self.next_grid_ms.filter(|&g| g <= now) {
            let frac = (grid_ms - prev_ms) as f32 / span as f32;
            let value = prev_magnitude + (magnitude - prev_magnitude) * frac;
            emit(out, DataPoint::scalar(grid_ms, value, value));
            self.next_grid_ms = grid_ms.checked_add(self.period_ms);
        }

        self.previous = Some((now, magnitude));
    }

    fn reset(&mut self) {
        self.previous = None;
        self.next_grid_ms = None;
        self.dropped = 0;
    }
}
