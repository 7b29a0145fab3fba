//! Pedestal and gain calibration of ADC sums.
//!
//! Single-channel calibration computes `(adc - pedestal) * gain` per pixel.
//! Dual-gain calibration picks, per pixel, channel 0 while its ADC sum stays
//! below a threshold and channel 1 once channel 0 saturates.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default ADC threshold above which channel 0 counts as saturated.
pub const DEFAULT_ADC_THRESHOLD: f64 = 3500.0;

/// Per-channel pedestal and gain arrays of one telescope.
///
/// `pedestal[channel][pixel]` and `gain[channel][pixel]`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationCoefficients {
    /// Baseline ADC reading per channel and pixel.
    pub pedestal: Vec<Vec<f64>>,
    /// Conversion factor (photoelectrons per ADC count) per channel and pixel.
    pub gain: Vec<Vec<f64>>,
}

impl CalibrationCoefficients {
    /// Creates coefficients from per-channel arrays.
    #[must_use]
    pub fn new(pedestal: Vec<Vec<f64>>, gain: Vec<Vec<f64>>) -> Self {
        Self { pedestal, gain }
    }

    /// Number of channels with both pedestal and gain.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.pedestal.len().min(self.gain.len())
    }

    /// Pedestal and gain of one channel.
    ///
    /// # Errors
    /// `MissingChannel` if the channel is not present.
    pub fn channel(&self, channel: usize) -> Result<(&[f64], &[f64])> {
        match (self.pedestal.get(channel), self.gain.get(channel)) {
            (Some(pedestal), Some(gain)) => Ok((pedestal, gain)),
            _ => Err(Error::MissingChannel {
                channel,
                available: self.num_channels(),
            }),
        }
    }
}

/// Calibration settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationConfig {
    /// Channel 0 ADC value from which channel 1 is used instead.
    pub adc_threshold: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            adc_threshold: DEFAULT_ADC_THRESHOLD,
        }
    }
}

impl CalibrationConfig {
    /// Set the dual-gain ADC threshold.
    #[must_use]
    pub fn with_adc_threshold(mut self, threshold: f64) -> Self {
        self.adc_threshold = threshold;
        self
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

/// Calibrates one channel: `(adc[i] - pedestal[i]) * gain[i]`.
///
/// No clamping is applied, so results may be negative.
///
/// # Errors
/// `LengthMismatch` if `pedestal` or `gain` differ in length from `adc`.
pub fn apply_calibration<A>(adc: &[A], pedestal: &[f64], gain: &[f64]) -> Result<Vec<f64>>
where
    A: Copy + Into<f64>,
{
    check_len("pedestal", adc.len(), pedestal.len())?;
    check_len("gain", adc.len(), gain.len())?;

    Ok(adc
        .iter()
        .zip(pedestal)
        .zip(gain)
        .map(|((&adc, &ped), &gain)| (adc.into() - ped) * gain)
        .collect())
}

/// Calibrates two gain channels, choosing per pixel.
///
/// Pixel `i` uses channel 0 if `adc0[i] < threshold`, channel 1 otherwise.
/// A value equal to the threshold selects channel 1.
///
/// # Errors
/// `LengthMismatch` if any array differs in length from `adc0`.
#[allow(clippy::too_many_arguments)]
pub fn apply_dual_gain_calibration<A>(
    adc0: &[A],
    adc1: &[A],
    pedestal0: &[f64],
    pedestal1: &[f64],
    gain0: &[f64],
    gain1: &[f64],
    threshold: f64,
) -> Result<Vec<f64>>
where
    A: Copy + Into<f64>,
{
    let n = adc0.len();
    check_len("adc1", n, adc1.len())?;
    check_len("pedestal0", n, pedestal0.len())?;
    check_len("pedestal1", n, pedestal1.len())?;
    check_len("gain0", n, gain0.len())?;
    check_len("gain1", n, gain1.len())?;

    Ok((0..n)
        .map(|i| {
            let low = adc0[i].into();
            if low < threshold {
                (low - pedestal0[i]) * gain0[i]
            } else {
                (adc1[i].into() - pedestal1[i]) * gain1[i]
            }
        })
        .collect())
}

/// Calibrator bound to one telescope's coefficients.
#[derive(Clone, Debug)]
pub struct Calibrator<'a> {
    coefficients: &'a CalibrationCoefficients,
    config: CalibrationConfig,
}

impl<'a> Calibrator<'a> {
    /// Create with default configuration.
    #[must_use]
    pub fn new(coefficients: &'a CalibrationCoefficients) -> Self {
        Self::with_config(coefficients, CalibrationConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(coefficients: &'a CalibrationCoefficients, config: CalibrationConfig) -> Self {
        Self {
            coefficients,
            config,
        }
    }

    /// Get current configuration.
    #[must_use]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrates a single channel with that channel's coefficients.
    ///
    /// # Errors
    /// `MissingChannel` or `LengthMismatch`.
    pub fn calibrate_channel<A: Copy + Into<f64>>(
        &self,
        channel: usize,
        adc: &[A],
    ) -> Result<Vec<f64>> {
        let (pedestal, gain) = self.coefficients.channel(channel)?;
        apply_calibration(adc, pedestal, gain)
    }

    /// Calibrates channels 0 and 1 with the dual-gain threshold rule.
    ///
    /// # Errors
    /// `MissingChannel` if fewer than two channels have coefficients,
    /// `LengthMismatch` on inconsistent arrays.
    pub fn calibrate_dual_gain<A: Copy + Into<f64>>(
        &self,
        adc0: &[A],
        adc1: &[A],
    ) -> Result<Vec<f64>> {
        let (pedestal0, gain0) = self.coefficients.channel(0)?;
        let (pedestal1, gain1) = self.coefficients.channel(1)?;
        apply_dual_gain_calibration(
            adc0,
            adc1,
            pedestal0,
            pedestal1,
            gain0,
            gain1,
            self.config.adc_threshold,
        )
    }
}
