//! Calibrated reading of the analog soil and light probes.
//!
//! Raw ADC counts are mapped linearly between the two calibration points with
//! integer arithmetic scaled by 100, so one extra decimal survives the
//! division, and then clamped to `0..=100`. Readings outside the calibrated
//! window (probe unplugged, ADC saturated) end up on the nearest boundary.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::debug;

use crate::{
    config::{LIGHT_CALIBRATION, SOIL_CALIBRATION, SOIL_MEASUREMENTS, SOIL_MEASURE_INTERVAL},
    domain::CalibrationRange,
};

/// Analog inputs of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogInput {
    Soil,
    Light,
}

/// Source of raw ADC counts.
pub trait AnalogSampler {
    fn sample(&mut self, input: AnalogInput) -> u16;
}

/// Map `raw` into a percentage of `range`.
pub fn read_percentage(raw: i32, range: CalibrationRange) -> f32 {
    let span = i64::from(range.raw_full) - i64::from(range.raw_zero);
    if span == 0 {
        return 0.0;
    }

    let scaled = (i64::from(raw) - i64::from(range.raw_zero)) * 10_000 / span;
    (scaled as f32 / 100.0).clamp(0.0, 100.0)
}

pub struct AnalogReader<A> {
    sampler: A,
}

impl<A: AnalogSampler> AnalogReader<A> {
    pub fn new(sampler: A) -> Self {
        Self { sampler }
    }

    /// Take a single sample of `input`.
    pub fn read(&mut self, input: AnalogInput, range: CalibrationRange) -> f32 {
        let raw = self.sampler.sample(input);
        let level = read_percentage(i32::from(raw), range);
        debug!("{:?} reading: raw {} -> {}%", input, raw, level);
        level
    }

    /// Average `samples` readings taken `interval` apart.
    ///
    /// Every sample is mapped and clamped before averaging, so one saturated
    /// sample cannot drag the mean outside the calibrated window.
    pub async fn read_smoothed<D: DelayNs>(
        &mut self,
        input: AnalogInput,
        range: CalibrationRange,
        samples: usize,
        interval: Duration,
        delay: &mut D,
    ) -> f32 {
        let samples = samples.max(1);
        let mut total = 0.0;
        for _ in 0..samples {
            total += self.read(input, range);
            delay.delay_ms(interval.as_millis() as u32).await;
        }
        total / samples as f32
    }

    /// Soil moisture, smoothed over ten samples.
    pub async fn read_water<D: DelayNs>(&mut self, delay: &mut D) -> f32 {
        self.read_smoothed(
            AnalogInput::Soil,
            SOIL_CALIBRATION,
            SOIL_MEASUREMENTS,
            SOIL_MEASURE_INTERVAL,
            delay,
        )
        .await
    }

    /// Light level from one sample over the full ADC span.
    pub fn read_light(&mut self) -> f32 {
        self.read(AnalogInput::Light, LIGHT_CALIBRATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDelay, ScriptedSampler};
    use embassy_futures::block_on;

    #[test]
    fn soil_calibration_points() {
        assert_eq!(read_percentage(3323, SOIL_CALIBRATION), 0.0);
        assert_eq!(read_percentage(1389, SOIL_CALIBRATION), 100.0);
        assert_eq!(read_percentage(2356, SOIL_CALIBRATION), 50.0);
    }

    #[test]
    fn soil_out_of_range_is_clamped() {
        assert_eq!(read_percentage(4000, SOIL_CALIBRATION), 0.0);
        assert_eq!(read_percentage(4095, SOIL_CALIBRATION), 0.0);
        assert_eq!(read_percentage(1000, SOIL_CALIBRATION), 100.0);
        assert_eq!(read_percentage(0, SOIL_CALIBRATION), 100.0);
    }

    #[test]
    fn soil_is_monotonically_non_increasing() {
        let mut previous = f32::MAX;
        for raw in 0..=4095 {
            let level = read_percentage(raw, SOIL_CALIBRATION);
            assert!((0.0..=100.0).contains(&level), "raw {raw} -> {level}");
            assert!(level <= previous, "raw {raw} rose to {level}");
            previous = level;
        }
    }

    #[test]
    fn light_calibration_points() {
        assert_eq!(read_percentage(0, LIGHT_CALIBRATION), 0.0);
        assert_eq!(read_percentage(4095, LIGHT_CALIBRATION), 100.0);
        let mid = read_percentage(2048, LIGHT_CALIBRATION);
        assert!((mid - 50.0).abs() < 0.05, "mid = {mid}");
    }

    #[test]
    fn integer_scaling_truncates_before_dividing() {
        // 2048 * 10000 / 4095 = 5001.22.. truncated to 5001
        assert_eq!(read_percentage(2048, LIGHT_CALIBRATION), 50.01);
        assert_eq!(read_percentage(1, LIGHT_CALIBRATION), 0.02);
    }

    #[test]
    fn degenerate_range_reads_zero() {
        assert_eq!(read_percentage(100, CalibrationRange::new(500, 500)), 0.0);
    }

    #[test]
    fn light_takes_a_single_sample() {
        let mut reader = AnalogReader::new(ScriptedSampler::new(&[], &[4095, 0]));
        assert_eq!(reader.read_light(), 100.0);
        assert_eq!(reader.read_light(), 0.0);
    }

    #[test]
    fn water_averages_after_mapping() {
        // Averaging raw counts first would give 2500 -> 42.55%.
        let raw = [1000, 4000, 1000, 4000, 1000, 4000, 1000, 4000, 1000, 4000];
        let sampler = ScriptedSampler::new(&raw, &[]);
        let mut reader = AnalogReader::new(sampler);
        let mut delay = RecordingDelay::default();

        let water = block_on(reader.read_water(&mut delay));

        assert_eq!(water, 50.0);
    }

    #[test]
    fn water_takes_ten_samples_two_hundred_ms_apart() {
        let sampler = ScriptedSampler::new(&[2356; 12], &[]);
        let mut reader = AnalogReader::new(sampler);
        let mut delay = RecordingDelay::default();

        let water = block_on(reader.read_water(&mut delay));

        assert_eq!(water, 50.0);
        assert_eq!(reader.sampler.soil_samples_taken(), 10);
        assert_eq!(delay.waits_ms(), &[200; 10]);
    }

    #[test]
    fn zero_samples_still_reads_once() {
        let sampler = ScriptedSampler::new(&[1389], &[]);
        let mut reader = AnalogReader::new(sampler);
        let mut delay = RecordingDelay::default();

        let level = block_on(reader.read_smoothed(
            AnalogInput::Soil,
            SOIL_CALIBRATION,
            0,
            Duration::from_millis(5),
            &mut delay,
        ));

        assert_eq!(level, 100.0);
    }
}
