//! Session metrics and the constants derived from the user profile.
//!
//! Units matter here more than anywhere else in the engine:
//! - `distance` accumulates `orig_magnitude × weight` per step, which the
//!   reference stages scale to millimetres. It is exposed divided by 1000.
//! - `kcalories` accumulates BMR (kcal/day) × MET × elapsed milliseconds.
//!   Dividing by the milliseconds in a day yields kilocalories.

use crate::types::{DataPoint, Gender, UserProfile};

/// Stride length as a fraction of body height.
pub const STRIDE_COEFFICIENT: f32 = 0.414;

/// Minutes per day, for the per-minute BMR.
pub const MINUTES_PER_DAY: f32 = 24.0 * 60.0;

/// Milliseconds per day, the divisor turning the calorie accumulator into kcal.
pub const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Internal distance units per exposed unit.
pub const DISTANCE_SCALE: f32 = 1000.0;

/// Values computed once from the user profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    /// Basal metabolic rate in kcal/day.
    pub bmr: f32,
    /// `bmr` spread over the minutes of a day.
    pub bmr_per_minute: f32,
    /// Static stride length in metres.
    pub stride: f32,
}

impl DerivedConstants {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let weight = profile.weight_kg as f64;
        let height = profile.height_cm as f64;
        let age = profile.age_years as f64;

        let bmr = match profile.gender {
            Gender::Female => 9.56 * weight + 1.85 * height - 4.68 * age + 655.0,
            Gender::Male => 13.75 * weight + 5.0 * height - 6.76 * age + 66.0,
        } as f32;

        Self {
            bmr,
            bmr_per_minute: bmr / MINUTES_PER_DAY,
            stride: (profile.height_cm as f32 / 100.0) * STRIDE_COEFFICIENT,
        }
    }
}

/// Accumulated per-session metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionMetrics {
    pub steps: u32,
    /// Weighted magnitude sum over detected steps, in internal units.
    pub distance: f32,
    /// kcal/day × ms accumulator, written by post-processing.
    pub kcalories: f64,
    /// MET accumulator. Only written through `StageContext::increase_met`.
    pub met: f32,
    /// Mean interval between peaks in ms, owned by detection.
    pub mean_peak_time: f32,
}

impl SessionMetrics {
    /// Terminal effect of a confirmed step.
    ///
    /// `source` is the latest point of the peak buffer. Without one the step
    /// is still counted but adds no distance.
    pub fn record_step(&mut self, source: Option<&DataPoint>) {
        self.steps += 1;
        match source {
            Some(point) => self.distance += point.orig_magnitude * point.weight,
            None => log::warn!("step confirmed without a peak source, distance unchanged"),
        }
    }

    /// Count reset: steps, distance, MET and calories.
    pub fn reset_counts(&mut self) {
        self.steps = 0;
        self.distance = 0.0;
        self.met = 0.0;
        self.kcalories = 0.0;
    }

    /// Signal-state reset: everything except the step count.
    pub fn reset_signal_state(&mut self) {
        self.kcalories = 0.0;
        self.met = 0.0;
        self.distance = 0.0;
        self.mean_peak_time = 0.0;
    }

    /// Distance in exposed units.
    pub fn distance(&self) -> f32 {
        self.distance / DISTANCE_SCALE
    }

    /// Energy expenditure in kcal.
    pub fn calories(&self) -> f64 {
        self.kcalories / MS_PER_DAY
    }
}

/// Steps per second over the stream so far, using the last peak time as the
/// elapsed-time proxy. `None` if there is no usable elapsed time.
pub fn steps_per_sec(steps: u32, last_point_ms: u64) -> Option<f32> {
    if last_point_ms == 0 {
        return None;
    }
    Some(steps as f32 / (last_point_ms as f32 / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(code: &str) -> UserProfile {
        UserProfile::new(Gender::from_code(code), 30, 165, 60)
    }

    #[test]
    fn test_female_bmr() {
        let constants = DerivedConstants::from_profile(&profile("F"));
        assert!((constants.bmr - 1393.45).abs() < 1e-3);
        assert!((constants.bmr_per_minute - 1393.45 / 1440.0).abs() < 1e-5);
    }

    #[test]
    fn test_male_bmr() {
        let constants = DerivedConstants::from_profile(&profile("M"));
        assert!((constants.bmr - 1513.2).abs() < 1e-3);
        assert!((constants.bmr_per_minute - 1513.2 / 1440.0).abs() < 1e-5);
    }

    #[test]
    fn test_stride_from_height() {
        let constants = DerivedConstants::from_profile(&profile("F"));
        assert!((constants.stride - 0.6831).abs() < 1e-5);
    }

    #[test]
    fn test_zero_height_gives_zero_stride() {
        let constants = DerivedConstants::from_profile(&UserProfile::new(Gender::Male, 30, 0, 70));
        assert_eq!(constants.stride, 0.0);
    }

    #[test]
    fn test_record_step_accumulates_weighted_magnitude() {
        let mut metrics = SessionMetrics::default();
        let mut peak = DataPoint::scalar(500, 2.0, 2.0);
        peak.weight = 0.5;

        metrics.record_step(Some(&peak));
        assert_eq!(metrics.steps, 1);
        assert!((metrics.distance() - 0.001).abs() < 1e-7);

        metrics.record_step(None);
        assert_eq!(metrics.steps, 2);
        assert!((metrics.distance() - 0.001).abs() < 1e-7);
    }

    #[test]
    fn test_calorie_conversion() {
        let mut metrics = SessionMetrics::default();
        metrics.kcalories = MS_PER_DAY;
        assert!((metrics.calories() - 1.0).abs() < 1e-12);

        let mut previous = 0.0;
        for k in [0.0, 1.0, 1e3, 1e6, 5e7, 8.64e7, 1e9] {
            metrics.kcalories = k;
            assert!(metrics.calories() >= previous);
            previous = metrics.calories();
        }
    }

    #[test]
    fn test_resets_are_distinct() {
        let filled = SessionMetrics {
            steps: 10,
            distance: 5000.0,
            kcalories: 1e6,
            met: 3.5,
            mean_peak_time: 480.0,
        };

        let mut counts = filled;
        counts.reset_counts();
        assert_eq!(counts.steps, 0);
        assert_eq!(counts.distance, 0.0);
        assert_eq!(counts.mean_peak_time, 480.0);

        let mut signal = filled;
        signal.reset_signal_state();
        assert_eq!(signal.steps, 10);
        assert_eq!(signal.distance, 0.0);
        assert_eq!(signal.kcalories, 0.0);
        assert_eq!(signal.mean_peak_time, 0.0);
    }

    #[test]
    fn test_steps_per_sec() {
        assert_eq!(steps_per_sec(10, 0), None);
        assert!((steps_per_sec(10, 5000).unwrap() - 2.0).abs() < 1e-6);
    }
}
