//! Measurement sources feeding the sampler.
//!
//! [`RandomWalk`] simulates process drift: each tick applies a bounded
//! uniform perturbation to the previous values, and a running motor pulls
//! the temperature down by a fixed amount.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scada_core::reading::Measurement;

/// Upward drift bias: perturbations are drawn from `[-BIAS, 1 - BIAS)`.
const DRIFT_BIAS: f64 = 0.1;

/// Pressure perturbations are scaled down relative to temperature.
const PRESSURE_SCALE: f64 = 0.5;

/// Temperature drop applied on every tick while the motor runs.
const MOTOR_COOLING: f64 = 0.5;

/// Produces the next measurement from the previous one.
pub trait MeasurementSource: Send {
    fn next(&mut self, previous: Measurement, motor_on: bool) -> Measurement;
}

/// Uniform-jitter random walk.
#[derive(Debug)]
pub struct RandomWalk {
    rng: StdRng,
}

impl RandomWalk {
    /// A walk seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A reproducible walk.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSource for RandomWalk {
    fn next(&mut self, previous: Measurement, motor_on: bool) -> Measurement {
        let mut temperature = previous.temperature + (self.rng.random::<f64>() - DRIFT_BIAS);
        let pressure =
            previous.pressure + (self.rng.random::<f64>() - DRIFT_BIAS) * PRESSURE_SCALE;

        if motor_on {
            temperature -= MOTOR_COOLING;
        }

        Measurement::new(temperature, pressure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn perturbation_is_bounded() {
        let mut walk = RandomWalk::seeded(7);
        let mut current = Measurement::new(17.0, 12.0);
        for _ in 0..1000 {
            let next = walk.next(current, false);
            let dt = next.temperature - current.temperature;
            let dp = next.pressure - current.pressure;
            assert!(dt >= -DRIFT_BIAS - EPS && dt <= 1.0 - DRIFT_BIAS + EPS, "dt = {dt}");
            assert!(
                dp >= -DRIFT_BIAS * PRESSURE_SCALE - EPS
                    && dp <= (1.0 - DRIFT_BIAS) * PRESSURE_SCALE + EPS,
                "dp = {dp}"
            );
            current = next;
        }
    }

    #[test]
    fn motor_applies_fixed_cooling() {
        let start = Measurement::new(17.0, 12.0);
        let off = RandomWalk::seeded(42).next(start, false);
        let on = RandomWalk::seeded(42).next(start, true);

        assert!((off.temperature - on.temperature - MOTOR_COOLING).abs() < 1e-12);
        assert_eq!(off.pressure, on.pressure);
    }

    #[test]
    fn seeded_walks_are_reproducible() {
        let start = Measurement::new(17.0, 12.0);
        let mut a = RandomWalk::seeded(1);
        let mut b = RandomWalk::seeded(1);
        for _ in 0..10 {
            assert_eq!(a.next(start, false), b.next(start, false));
        }
    }
}
