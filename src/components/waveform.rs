//! Parametric driving signal for time-varying sources.
//!
//! A waveform is a DC offset plus a sinusoid:
//!
//! ```text
//! value(t) = dc_bias + amplitude * sin(phase_offset * π/180 + 2π * frequency * t)
//! ```
//!
//! Evaluation is a pure function of the parameters and `t`. Zero or negative
//! frequency and amplitude are valid inputs and are not special-cased.

use std::f64::consts::PI;

/// DC + sinusoid signal description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waveform {
    /// Constant offset (volts or amps)
    pub dc_bias: f64,
    /// Sinusoid frequency in Hz
    pub frequency: f64,
    /// Sinusoid peak amplitude (volts or amps)
    pub amplitude: f64,
    /// Phase shift in degrees
    pub phase_offset: f64,
}

impl Default for Waveform {
    /// 5 V peak, 60 Hz sinusoid with no DC bias.
    fn default() -> Self {
        Self {
            dc_bias: 0.0,
            frequency: 60.0,
            amplitude: 5.0,
            phase_offset: 0.0,
        }
    }
}

impl Waveform {
    /// Create a waveform from all four parameters.
    pub fn new(dc_bias: f64, frequency: f64, amplitude: f64, phase_offset: f64) -> Self {
        Self {
            dc_bias,
            frequency,
            amplitude,
            phase_offset,
        }
    }

    /// A constant signal.
    pub fn dc(value: f64) -> Self {
        Self::new(value, 0.0, 0.0, 0.0)
    }

    /// Evaluate the signal at simulation time `t` (seconds).
    pub fn value(&self, t: f64) -> f64 {
        let phase = self.phase_offset / 180.0 * PI;
        self.dc_bias + (phase + t * 2.0 * PI * self.frequency).sin() * self.amplitude
    }

    /// Duration of one cycle, or `None` for a zero-frequency signal.
    pub fn period(&self) -> Option<f64> {
        if self.frequency == 0.0 {
            None
        } else {
            Some(1.0 / self.frequency.abs())
        }
    }

    pub fn set_dc_bias(&mut self, dc_bias: f64) {
        self.dc_bias = dc_bias;
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude;
    }

    pub fn set_phase_offset(&mut self, phase_offset: f64) {
        self.phase_offset = phase_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_value_at_zero() {
        let w = Waveform::new(1.5, 60.0, 2.0, 30.0);
        // 1.5 + 2 * sin(30°) = 2.5
        assert_abs_diff_eq!(w.value(0.0), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_period() {
        let w = Waveform::new(0.0, 60.0, 5.0, 0.0);
        assert_abs_diff_eq!(w.value(1.0 / 240.0), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_frequency_is_constant() {
        let w = Waveform::new(3.0, 0.0, 2.0, 90.0);
        for &t in &[0.0, 1e-3, 0.25, 17.0, 1e6] {
            assert_abs_diff_eq!(w.value(t), 5.0, epsilon = 1e-12);
        }
        assert_eq!(w.period(), None);
    }

    #[test]
    fn test_periodicity() {
        let w = Waveform::new(0.3, 50.0, 1.7, 12.0);
        let period = w.period().unwrap();
        for i in 0..20 {
            let t = i as f64 * 1.3e-3;
            assert_abs_diff_eq!(w.value(t + period), w.value(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_negative_amplitude_is_phase_shift() {
        let neg = Waveform::new(0.0, 10.0, -2.0, 0.0);
        let shifted = Waveform::new(0.0, 10.0, 2.0, 180.0);
        for i in 0..10 {
            let t = i as f64 * 7e-3;
            assert_abs_diff_eq!(neg.value(t), shifted.value(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_negative_frequency_reverses_time() {
        let fwd = Waveform::new(0.0, 25.0, 1.0, 0.0);
        let rev = Waveform::new(0.0, -25.0, 1.0, 0.0);
        assert_abs_diff_eq!(rev.value(0.004), fwd.value(-0.004), epsilon = 1e-12);
        assert_abs_diff_eq!(rev.period().unwrap(), 0.04, epsilon = 1e-15);
    }

    #[test]
    fn test_deterministic() {
        let w = Waveform::default();
        assert_eq!(w.value(0.0123).to_bits(), w.value(0.0123).to_bits());
    }

    #[test]
    fn test_setters_are_independent() {
        let mut w = Waveform::default();
        w.set_amplitude(1.0);
        assert_eq!(w, Waveform::new(0.0, 60.0, 1.0, 0.0));
        w.set_dc_bias(2.0);
        w.set_frequency(5.0);
        w.set_phase_offset(45.0);
        assert_eq!(w, Waveform::new(2.0, 5.0, 1.0, 45.0));
    }
}
