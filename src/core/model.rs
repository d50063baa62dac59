//! Stress and energy model.
//!
//! Stress is a weighted blend of keyboard and pointer intensity, each
//! normalised against a "maximum sustainable" rate. Energy is a 0-100 gauge
//! that drains per sampling tick in proportion to stress and is refilled
//! only by a completed break.

use std::time::Duration;

/// Key presses per minute treated as full keyboard intensity.
pub const MAX_SUSTAINABLE_KPM: f64 = 220.0;

/// Pointer travel per minute (pixels) treated as full pointer intensity.
pub const MAX_SUSTAINABLE_MOUSE_RATE: f64 = 40_000.0;

const KEYBOARD_WEIGHT: f64 = 0.6;
const MOUSE_WEIGHT: f64 = 0.4;

/// Energy lost per minute with no activity at all.
pub const BASE_DRAIN_PER_MINUTE: f64 = 0.4;

/// Additional energy lost per minute at stress 1.0.
pub const STRESS_DRAIN_PER_MINUTE: f64 = 3.2;

pub const MAX_ENERGY: f64 = 100.0;
pub const MIN_ENERGY: f64 = 0.0;

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Normalised stress in `[0, 1]` from activity rates.
///
/// NaN inputs count as zero intensity.
pub fn stress_level(kpm: f64, mouse_distance_per_min: f64) -> f64 {
    let kpm_score = clamp(kpm / MAX_SUSTAINABLE_KPM, 0.0, 1.0);
    let mouse_score = clamp(mouse_distance_per_min / MAX_SUSTAINABLE_MOUSE_RATE, 0.0, 1.0);
    let blended = kpm_score * KEYBOARD_WEIGHT + mouse_score * MOUSE_WEIGHT;
    if blended.is_nan() {
        return 0.0;
    }
    clamp(blended, 0.0, 1.0)
}

/// Energy drain per minute at the given stress level.
pub fn drain_per_minute(stress: f64) -> f64 {
    BASE_DRAIN_PER_MINUTE + STRESS_DRAIN_PER_MINUTE * stress
}

/// Apply one sampling tick of drain.
///
/// Drain is quantised to the tick: `drain_per_minute * tick / 60s`, which is
/// `rate / 6` at the default 10 second cadence. Energy does not move while a
/// break is active.
pub fn drain_energy(energy: f64, stress: f64, tick: Duration, break_active: bool) -> f64 {
    if break_active {
        return clamp(energy, MIN_ENERGY, MAX_ENERGY);
    }
    let drain = drain_per_minute(stress) * tick.as_secs_f64() / 60.0;
    clamp(energy - drain, MIN_ENERGY, MAX_ENERGY)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_secs(10);

    #[test]
    fn test_idle_is_zero_stress() {
        assert_eq!(stress_level(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_stress_saturates() {
        assert_eq!(stress_level(220.0, 40_000.0), 1.0);
        assert_eq!(stress_level(1_000.0, 1_000_000.0), 1.0);
    }

    #[test]
    fn test_stress_weights() {
        assert!((stress_level(220.0, 0.0) - 0.6).abs() < 1e-12);
        assert!((stress_level(0.0, 40_000.0) - 0.4).abs() < 1e-12);
        assert!((stress_level(110.0, 20_000.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nan_input_reads_as_idle() {
        assert_eq!(stress_level(f64::NAN, 0.0), 0.0);
    }

    #[test]
    fn test_base_drain_per_tick() {
        let energy = drain_energy(100.0, 0.0, TICK, false);
        assert!((energy - (100.0 - 0.4 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_full_stress_drain_per_tick() {
        let energy = drain_energy(50.0, 1.0, TICK, false);
        assert!((energy - (50.0 - 3.6 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_no_drain_during_break() {
        assert_eq!(drain_energy(40.0, 1.0, TICK, true), 40.0);
    }

    #[test]
    fn test_energy_floor() {
        assert_eq!(drain_energy(0.1, 1.0, TICK, false), 0.0);
    }
}
