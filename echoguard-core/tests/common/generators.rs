//! Synthetic device telemetry
//!
//! Mirrors how field devices behave:
//! - Sampling every 30-60 s with ±5 s jitter
//! - Independent Gaussian noise per channel around a device-type baseline
//! - A random channel dropped from ~3% of readings
//! - Optional failure: readings in the ramp before it drift (temperature up,
//!   vibration up, rpm down) and are labeled PreFailure; readings within a
//!   minute of it are labeled Failure
//!
//! Every generator is seeded, so a given profile always yields the same
//! readings.

use echoguard_core::{Label, Reading};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MS: i64 = 1_000;

/// Baselines for one device family
#[derive(Debug, Clone, Copy)]
pub struct DeviceType {
    pub name: &'static str,
    pub temp_base: f64,
    pub vib_base: f64,
    pub rpm_base: f64,
}

impl DeviceType {
    pub const PUMP: DeviceType = DeviceType {
        name: "pump",
        temp_base: 60.0,
        vib_base: 0.3,
        rpm_base: 1500.0,
    };

    pub const FAN: DeviceType = DeviceType {
        name: "fan",
        temp_base: 35.0,
        vib_base: 0.1,
        rpm_base: 900.0,
    };
}

/// What to generate for one device
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub device_id: String,
    pub device_type: DeviceType,
    pub start: i64,
    pub duration_ms: i64,
    pub missing_prob: f64,
    /// Offset of the failure from `start`
    pub failure_at_ms: Option<i64>,
    /// Length of the PreFailure ramp before the failure
    pub ramp_ms: i64,
}

impl DeviceProfile {
    /// Two hours of healthy pump telemetry
    pub fn healthy(device_id: &str, start: i64) -> Self {
        Self {
            device_id: device_id.to_string(),
            device_type: DeviceType::PUMP,
            start,
            duration_ms: 120 * 60 * MS,
            missing_prob: 0.03,
            failure_at_ms: None,
            ramp_ms: 30 * 60 * MS,
        }
    }

    /// Two hours with a failure at minute 100 after a 30-minute ramp
    pub fn failing(device_id: &str, start: i64) -> Self {
        Self {
            failure_at_ms: Some(100 * 60 * MS),
            ..Self::healthy(device_id, start)
        }
    }
}

/// Seeded telemetry generator
pub struct TelemetryGenerator {
    rng: StdRng,
}

impl TelemetryGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        // Box-Muller
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Readings for one device, in timestamp order
    pub fn generate(&mut self, profile: &DeviceProfile) -> Vec<Reading> {
        let mut readings = Vec::new();
        let end = profile.start + profile.duration_ms;
        let failure = profile.failure_at_ms.map(|offset| profile.start + offset);
        let kind = profile.device_type;

        let mut ts = profile.start;
        while ts <= end {
            let interval = self.rng.gen_range(30..=60) * MS;
            let jitter = self.rng.gen_range(-5..=5) * MS;
            let at = ts + jitter;

            let mut temp = self.gaussian(kind.temp_base, 0.5);
            let mut vib = self.gaussian(kind.vib_base, 0.02).abs();
            let mut rpm = self.gaussian(kind.rpm_base, 50.0).max(0.0);
            let humidity = self.gaussian(40.0, 5.0).clamp(10.0, 90.0);
            let mut label = Label::Normal;

            if let Some(failure) = failure {
                let delta = failure - at;
                if (0..=profile.ramp_ms).contains(&delta) {
                    let factor = (profile.ramp_ms - delta) as f64 / profile.ramp_ms as f64;
                    temp += 5.0 * factor;
                    vib += 0.5 * factor;
                    rpm -= 300.0 * factor;
                    label = Label::PreFailure;
                }
                if delta.abs() < 60 * MS {
                    label = Label::Failure;
                }
            }

            let mut values = [Some(temp), Some(vib), Some(rpm), Some(humidity)];
            if self.rng.gen_bool(profile.missing_prob) {
                let dropped = self.rng.gen_range(0..values.len());
                values[dropped] = None;
            }

            readings.push(Reading {
                device_id: profile.device_id.clone(),
                device_type: kind.name.to_string(),
                timestamp: at,
                values,
                label: Some(label),
            });
            ts += interval;
        }

        readings
    }

    /// Readings for several devices, interleaved as a collector would see them
    pub fn fleet(&mut self, profiles: &[DeviceProfile]) -> Vec<Reading> {
        let mut all: Vec<Reading> = profiles.iter().flat_map(|p| self.generate(p)).collect();
        all.sort_by_key(|r| r.timestamp);
        all
    }
}
