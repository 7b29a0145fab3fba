//! Simulated event records as delivered by an event source.
//!
//! Records are already materialized: the binary simtel format is decoded
//! upstream, and each telescope carries its ADC sums per channel, the
//! Monte-Carlo photoelectron image and the calibration coefficients.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationCoefficients;
use crate::error::{Error, Result};
use crate::geometry::CameraGeometry;

/// Monte-Carlo truth of the simulated air shower.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct McShower {
    /// Primary energy (TeV).
    pub energy: f64,
    /// Azimuth (rad).
    pub az: f64,
    /// Altitude (rad).
    pub alt: f64,
    /// Core position x (m).
    pub core_x: f64,
    /// Core position y (m).
    pub core_y: f64,
}

/// Readout of one telescope for one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelescopeRecord {
    /// Telescope identifier.
    pub tel_id: u32,
    /// Camera geometry descriptor.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: CameraGeometry,
    /// Optical focal length (m).
    #[cfg_attr(feature = "serde", serde(default))]
    pub focal_length: Option<f64>,
    /// Integrated ADC sums, one array per channel.
    pub adc_sums: Vec<Vec<f64>>,
    /// Simulated photoelectron counts per pixel.
    #[cfg_attr(feature = "serde", serde(default))]
    pub photo_electrons: Option<Vec<f64>>,
    /// Pedestal and gain of this telescope.
    #[cfg_attr(feature = "serde", serde(default))]
    pub calibration: Option<CalibrationCoefficients>,
}

impl TelescopeRecord {
    /// Number of readout channels.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.adc_sums.len()
    }

    /// ADC sums of one channel.
    ///
    /// # Errors
    /// `MissingChannel` if the channel was not read out.
    pub fn adc_channel(&self, channel: usize) -> Result<&[f64]> {
        self.adc_sums
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(Error::MissingChannel {
                channel,
                available: self.adc_sums.len(),
            })
    }

    /// Calibration coefficients.
    ///
    /// # Errors
    /// `MissingCalibration` if the record has none.
    pub fn calibration(&self) -> Result<&CalibrationCoefficients> {
        self.calibration
            .as_ref()
            .ok_or(Error::MissingCalibration(self.tel_id))
    }
}

/// One simulated event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimEvent {
    /// Event identifier.
    pub event_id: u64,
    /// Telescopes that triggered on this event.
    pub triggered_telescopes: Vec<u32>,
    /// Monte-Carlo shower truth.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mc: Option<McShower>,
    /// Per-telescope readouts.
    #[cfg_attr(feature = "serde", serde(default))]
    pub telescopes: Vec<TelescopeRecord>,
}

impl SimEvent {
    /// Readout of a telescope, if present.
    #[must_use]
    pub fn telescope(&self, tel_id: u32) -> Option<&TelescopeRecord> {
        self.telescopes.iter().find(|tel| tel.tel_id == tel_id)
    }

    /// Keeps only the telescopes accepted by `keep`.
    pub fn retain_telescopes<F: FnMut(u32) -> bool>(&mut self, mut keep: F) {
        self.triggered_telescopes.retain(|&id| keep(id));
        self.telescopes.retain(|tel| keep(tel.tel_id));
    }
}
