//! Stippling run configuration.

use crate::error::{Error, Result};

/// Tunable knobs for one stippling run.
///
/// Defaults mirror the reference Qt tool's `StipplingParams`: a single
/// initial seed, adaptive point sizing between 2 and 4 pixels, no
/// supersampling, a 50-iteration cap, and adaptive hysteresis starting at
/// 0.6.
#[derive(Debug, Clone, PartialEq)]
pub struct StipplingParams {
    pub initial_points: usize,
    pub initial_point_size: f64,

    pub adaptive_point_size: bool,
    pub point_size_min: f64,
    pub point_size_max: f64,

    pub super_sampling_factor: u32,
    pub max_iterations: usize,

    pub hysteresis: f64,
    pub hysteresis_delta: f64,
    pub adaptive_hysteresis: bool,

    /// Seeds both the initial-placement and split-jitter RNG streams.
    pub seed: u64,
}

impl Default for StipplingParams {
    fn default() -> Self {
        Self {
            initial_points: 1,
            initial_point_size: 4.0,
            adaptive_point_size: true,
            point_size_min: 2.0,
            point_size_max: 4.0,
            super_sampling_factor: 1,
            max_iterations: 50,
            hysteresis: 0.6,
            hysteresis_delta: 0.0,
            adaptive_hysteresis: true,
            seed: 0,
        }
    }
}

impl StipplingParams {
    /// Derive the per-iteration hysteresis increment from `hysteresis` and
    /// `max_iterations`, the way the reference tool computes it at start-up,
    /// when the caller hasn't set `hysteresis_delta` explicitly.
    pub fn with_derived_hysteresis_delta(mut self) -> Self {
        if self.adaptive_hysteresis && self.max_iterations > 1 {
            self.hysteresis_delta = self.hysteresis / (self.max_iterations - 1) as f64;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_points < 1 {
            return Err(Error::InvalidParams("initial_points must be >= 1".into()));
        }
        if self.initial_point_size <= 0.0 {
            return Err(Error::InvalidParams(
                "initial_point_size must be > 0".into(),
            ));
        }
        if self.point_size_min <= 0.0 || self.point_size_max <= 0.0 {
            return Err(Error::InvalidParams(
                "point_size_min and point_size_max must be > 0".into(),
            ));
        }
        if self.point_size_min > self.point_size_max {
            return Err(Error::InvalidParams(
                "point_size_min must be <= point_size_max".into(),
            ));
        }
        if !(1..=3).contains(&self.super_sampling_factor) {
            return Err(Error::InvalidParams(
                "super_sampling_factor must be 1, 2 or 3".into(),
            ));
        }
        if self.max_iterations < 1 {
            return Err(Error::InvalidParams("max_iterations must be >= 1".into()));
        }
        if !(self.hysteresis > 0.0 && self.hysteresis <= 3.0) {
            return Err(Error::InvalidParams(
                "hysteresis must be in (0, 3]".into(),
            ));
        }
        if self.hysteresis_delta < 0.0 {
            return Err(Error::InvalidParams(
                "hysteresis_delta must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        StipplingParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_point_size_range() {
        let params = StipplingParams {
            point_size_min: 5.0,
            point_size_max: 2.0,
            ..StipplingParams::default()
        };
        assert!(matches!(
            params.validate().unwrap_err(),
            Error::InvalidParams(_)
        ));
    }

    #[test]
    fn rejects_out_of_range_supersampling() {
        let params = StipplingParams {
            super_sampling_factor: 4,
            ..StipplingParams::default()
        };
        assert!(matches!(
            params.validate().unwrap_err(),
            Error::InvalidParams(_)
        ));
    }

    #[test]
    fn derived_hysteresis_delta_matches_reference_formula() {
        let params = StipplingParams {
            hysteresis: 0.6,
            max_iterations: 10,
            ..StipplingParams::default()
        }
        .with_derived_hysteresis_delta();
        assert!((params.hysteresis_delta - 0.6 / 9.0).abs() < 1e-12);
    }
}
