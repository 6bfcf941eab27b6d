//! Post-sampling noise injection
//!
//! Numeric fields get an additive error draw; categorical fields (including
//! the class label) are flipped to a different domain member with a given
//! probability.

use rand::Rng;
use rand_distr::Distribution;
use tracing::trace;

use crate::rng::SynthRng;
use crate::{Result, SynthError};

/// Perturbs sampled values using its own random source.
pub struct NoiseInjector<R = SynthRng> {
    rng: R,
}

impl<R: Rng> NoiseInjector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// `value` plus one draw from `error`.
    pub fn add_noise_num<D: Distribution<f64>>(&mut self, value: f64, error: &D) -> f64 {
        value + error.sample(&mut self.rng)
    }

    /// Integer field with additive noise, truncated toward zero.
    pub fn add_noise_int<D: Distribution<f64>>(&mut self, value: i64, error: &D) -> i64 {
        self.add_noise_num(value as f64, error).trunc() as i64
    }

    /// With probability `flip_probability`, replace `value` by a uniformly
    /// chosen distinct member of `domain` other than `value`.
    ///
    /// A domain offering no alternative to `value` turns a flip into a no-op.
    /// An empty domain is an error.
    pub fn add_noise_cat<S: AsRef<str>>(
        &mut self,
        value: &str,
        domain: &[S],
        flip_probability: f64,
    ) -> Result<String> {
        if domain.is_empty() {
            return Err(SynthError::InvalidDomain);
        }
        if !(0.0..=1.0).contains(&flip_probability) {
            return Err(SynthError::InvalidParameter(format!(
                "flip probability {flip_probability} is outside [0, 1]"
            )));
        }

        if !self.rng.gen_bool(flip_probability) {
            return Ok(value.to_string());
        }

        let mut alternatives: Vec<&str> = Vec::with_capacity(domain.len());
        for member in domain.iter().map(|m| m.as_ref()) {
            if member != value && !alternatives.contains(&member) {
                alternatives.push(member);
            }
        }
        if alternatives.is_empty() {
            trace!(value, "no alternative to flip to");
            return Ok(value.to_string());
        }

        let pick = alternatives[self.rng.gen_range(0..alternatives.len())];
        Ok(pick.to_string())
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
