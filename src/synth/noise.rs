//! Noise generator
//!
//! 17-bit LFSR clocked by a divider derived from the noise period register,
//! resampled to the output sample rate.

/// LFSR state after power-on.
pub const LFSR_SEED: u32 = 0x1ffff;

/// Master clock feeding the noise divider, in Hz.
pub const NOISE_MASTER_CLOCK: f64 = 2_000_000.0;

/// Noise generator using a 17-bit LFSR
///
/// Feedback is bit 0 XOR bit 3, shifted in at bit 16. The output is the new
/// bit 0 and only changes once per noise clock period.
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    /// 17-bit LFSR state
    lfsr: u32,
    /// Period register (1..=31)
    period: u8,
    /// Noise clock periods per output sample
    step: f64,
    /// Fractional noise clock periods since the last LFSR step
    accumulator: f64,
    /// Current output bit
    output: u8,
    sample_rate: u32,
}

impl NoiseGenerator {
    /// Create a generator for `period` at the given output sample rate
    pub fn new(period: u8, sample_rate: u32) -> Self {
        let mut noise = Self {
            lfsr: LFSR_SEED,
            period: 0,
            step: 1.0,
            accumulator: 0.0,
            output: 0,
            sample_rate: sample_rate.max(1),
        };
        noise.set_period(period);
        noise
    }

    /// Set the period register and restart the step counter
    pub fn set_period(&mut self, period: u8) {
        self.period = period.clamp(1, 31);
        let clock = NOISE_MASTER_CLOCK / (16.0 * self.period as f64);
        self.step = clock / self.sample_rate as f64;
        self.accumulator = 0.0;
    }

    /// Current period register
    #[inline]
    pub fn period(&self) -> u8 {
        self.period
    }

    /// Advance by one output sample and return the noise bit
    ///
    /// The LFSR steps at most once per sample, so noise clocks above the
    /// sample rate are capped to it.
    #[inline]
    pub fn tick(&mut self) -> u8 {
        self.accumulator += self.step;
        if self.accumulator >= 1.0 {
            self.accumulator = (self.accumulator - 1.0).min(1.0);
            let feedback = (self.lfsr ^ (self.lfsr >> 3)) & 1;
            self.lfsr = (self.lfsr >> 1) | (feedback << 16);
            self.output = (self.lfsr & 1) as u8;
        }
        self.output
    }

    /// Current output bit
    #[inline]
    pub fn output(&self) -> u8 {
        self.output
    }

    /// Reset to initial state, keeping the period
    pub fn reset(&mut self) {
        self.lfsr = LFSR_SEED;
        self.accumulator = 0.0;
        self.output = 0;
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(1, 44_100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_reproducible() {
        let run = || {
            let mut noise = NoiseGenerator::new(7, 44_100);
            (0..2048).map(|_| noise.tick()).collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.contains(&0) && first.contains(&1));
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut noise = NoiseGenerator::new(3, 44_100);
        let first: Vec<u8> = (0..512).map(|_| noise.tick()).collect();
        noise.reset();
        let second: Vec<u8> = (0..512).map(|_| noise.tick()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn longer_period_steps_less_often() {
        // period 31 -> ~4032 Hz noise clock -> about 11 samples per step
        let mut slow = NoiseGenerator::new(31, 44_100);
        let mut changes = 0;
        let mut last = slow.output();
        for _ in 0..44_100 {
            let bit = slow.tick();
            if bit != last {
                changes += 1;
                last = bit;
            }
        }
        assert!(changes <= 4100);
        assert!(changes > 0);
    }

    #[test]
    fn period_is_clamped() {
        let mut noise = NoiseGenerator::default();
        noise.set_period(0);
        assert_eq!(noise.period(), 1);
        noise.set_period(200);
        assert_eq!(noise.period(), 31);
    }

    #[test]
    fn lfsr_feedback_taps() {
        let mut noise = NoiseGenerator::new(1, 1);
        noise.tick();
        // seed 0x1ffff: bit0 ^ bit3 = 0, so bit 16 is cleared
        assert_eq!(noise.lfsr, 0x0ffff);
        assert_eq!(noise.output(), 1);
    }
}
