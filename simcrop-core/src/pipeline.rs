//! Image extraction: calibrate and crop telescope readouts.
//!
//! One (event, telescope) pair is one unit of work. Telescopes of an event
//! are processed in parallel with rayon, and a failing telescope never
//! affects the others.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::calibration::{CalibrationConfig, Calibrator, DEFAULT_ADC_THRESHOLD};
use crate::error::Result;
use crate::event::{McShower, SimEvent, TelescopeRecord};
use crate::geometry::CameraGeometry;
use crate::image::CroppedImage;

/// How the ADC image is produced before cropping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalibrationMode {
    /// Raw ADC sums of the configured channel.
    Raw,
    /// Pedestal and gain of the configured channel.
    Channel,
    /// Per-pixel choice between channels 0 and 1 by ADC threshold.
    #[default]
    DualGain,
}

/// Configuration for image extraction.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Calibration applied to the ADC sums.
    pub mode: CalibrationMode,
    /// Channel used by `Raw` and `Channel` modes.
    pub channel: usize,
    /// Threshold used by `DualGain` mode.
    pub adc_threshold: f64,
    /// Telescopes to process (`None` = all).
    pub telescopes: Option<BTreeSet<u32>>,
    /// Events to process (`None` = all).
    pub events: Option<BTreeSet<u64>>,
    /// Also crop the photoelectron image when available.
    pub include_photoelectrons: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::default(),
            channel: 0,
            adc_threshold: DEFAULT_ADC_THRESHOLD,
            telescopes: None,
            events: None,
            include_photoelectrons: true,
        }
    }
}

impl PipelineConfig {
    /// Set calibration mode.
    #[must_use]
    pub fn with_mode(mut self, mode: CalibrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the readout channel.
    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Set the dual-gain ADC threshold.
    #[must_use]
    pub fn with_adc_threshold(mut self, threshold: f64) -> Self {
        self.adc_threshold = threshold;
        self
    }

    /// Restrict processing to these telescopes.
    #[must_use]
    pub fn with_telescopes<I: IntoIterator<Item = u32>>(mut self, telescopes: I) -> Self {
        self.telescopes = Some(telescopes.into_iter().collect());
        self
    }

    /// Restrict processing to these events.
    #[must_use]
    pub fn with_events<I: IntoIterator<Item = u64>>(mut self, events: I) -> Self {
        self.events = Some(events.into_iter().collect());
        self
    }

    /// Enable or disable photoelectron image cropping.
    #[must_use]
    pub fn with_photoelectrons(mut self, include: bool) -> Self {
        self.include_photoelectrons = include;
        self
    }

    /// Returns true if the telescope passes the filter.
    #[must_use]
    pub fn accepts_telescope(&self, tel_id: u32) -> bool {
        self.telescopes
            .as_ref()
            .map_or(true, |set| set.contains(&tel_id))
    }

    /// Returns true if the event passes the filter.
    #[must_use]
    pub fn accepts_event(&self, event_id: u64) -> bool {
        self.events.as_ref().map_or(true, |set| set.contains(&event_id))
    }

    fn calibration_config(&self) -> CalibrationConfig {
        CalibrationConfig::default().with_adc_threshold(self.adc_threshold)
    }
}

/// Cropped images and metadata of one telescope in one event.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedImage {
    /// Event identifier.
    pub event_id: u64,
    /// Telescope identifier.
    pub tel_id: u32,
    /// Camera geometry.
    pub geometry: CameraGeometry,
    /// Optical focal length (m).
    pub focal_length: Option<f64>,
    /// Monte-Carlo shower truth.
    pub mc: Option<McShower>,
    /// Cropped ADC image (calibrated unless `calibrated` is false).
    pub image: CroppedImage<f64>,
    /// Cropped photoelectron image.
    pub photoelectron_image: Option<CroppedImage<f64>>,
    /// Whether pedestal and gain were applied.
    pub calibrated: bool,
}

/// Calibrates and crops one telescope readout.
///
/// # Errors
/// `GeometryMismatch` / `NotImplemented` for unsupported cameras,
/// `MissingChannel`, `MissingCalibration`, `LengthMismatch`, or
/// `ShapeMismatch` for inconsistent readouts.
pub fn extract_image(
    event: &SimEvent,
    telescope: &TelescopeRecord,
    config: &PipelineConfig,
) -> Result<ExtractedImage> {
    // Reject unsupported cameras before touching any pixel data.
    let map = telescope.geometry.permutation_map()?;
    let camera = &telescope.geometry.camera;

    let flat = match config.mode {
        CalibrationMode::Raw => telescope.adc_channel(config.channel)?.to_vec(),
        CalibrationMode::Channel => {
            let calibrator =
                Calibrator::with_config(telescope.calibration()?, config.calibration_config());
            calibrator.calibrate_channel(config.channel, telescope.adc_channel(config.channel)?)?
        }
        CalibrationMode::DualGain => {
            let calibrator =
                Calibrator::with_config(telescope.calibration()?, config.calibration_config());
            calibrator.calibrate_dual_gain(telescope.adc_channel(0)?, telescope.adc_channel(1)?)?
        }
    };
    let image = CroppedImage::new(camera.clone(), map.apply(&flat)?);

    let photoelectron_image = match (&telescope.photo_electrons, config.include_photoelectrons) {
        (Some(pe), true) => Some(CroppedImage::new(camera.clone(), map.apply(pe)?)),
        _ => None,
    };

    Ok(ExtractedImage {
        event_id: event.event_id,
        tel_id: telescope.tel_id,
        geometry: telescope.geometry.clone(),
        focal_length: telescope.focal_length,
        mc: event.mc,
        image,
        photoelectron_image,
        calibrated: config.mode != CalibrationMode::Raw,
    })
}

/// Extracts every accepted telescope image of an event, in parallel.
///
/// Returns one result per accepted telescope, ordered by telescope id.
/// Events rejected by the event filter yield an empty list.
pub fn extract_event_images(
    event: &SimEvent,
    config: &PipelineConfig,
) -> Vec<(u32, Result<ExtractedImage>)> {
    if !config.accepts_event(event.event_id) {
        return Vec::new();
    }

    let mut results: Vec<(u32, Result<ExtractedImage>)> = event
        .telescopes
        .par_iter()
        .filter(|tel| config.accepts_telescope(tel.tel_id))
        .map(|tel| (tel.tel_id, extract_image(event, tel, config)))
        .collect();
    results.sort_by_key(|(tel_id, _)| *tel_id);

    for (tel_id, result) in &results {
        if let Err(err) = result {
            log::debug!("event {} telescope {}: {}", event.event_id, tel_id, err);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationCoefficients;
    use crate::error::Error;
    use crate::geometry::{CameraId, PixelType};
    use crate::permutation::ASTRI_PIXEL_COUNT;
    use approx::assert_relative_eq;

    fn astri_record(tel_id: u32) -> TelescopeRecord {
        let n = ASTRI_PIXEL_COUNT;
        TelescopeRecord {
            tel_id,
            geometry: CameraGeometry::astri(),
            focal_length: Some(2.15),
            adc_sums: vec![
                (0..n).map(|i| if i % 2 == 0 { 3000.0 } else { 4000.0 }).collect(),
                vec![500.0; n],
            ],
            photo_electrons: Some((0..n).map(|i| i as f64).collect()),
            calibration: Some(CalibrationCoefficients::new(
                vec![vec![1000.0; n], vec![100.0; n]],
                vec![vec![0.01; n], vec![0.5; n]],
            )),
        }
    }

    fn event(telescopes: Vec<TelescopeRecord>) -> SimEvent {
        SimEvent {
            event_id: 42,
            triggered_telescopes: telescopes.iter().map(|t| t.tel_id).collect(),
            mc: None,
            telescopes,
        }
    }

    #[test]
    fn test_dual_gain_extraction() {
        let ev = event(vec![astri_record(1)]);
        let out = extract_image(&ev, &ev.telescopes[0], &PipelineConfig::default()).unwrap();
        assert!(out.calibrated);
        assert_eq!(out.image.shape(), (40, 40));

        // Cell (0, 0) is pixel 1912 (even): channel 0.
        assert_relative_eq!(*out.image.get(0, 0).unwrap(), 20.0);
        // Cell (0, 1) is pixel 1913 (odd, saturated): channel 1.
        assert_relative_eq!(*out.image.get(0, 1).unwrap(), 200.0);

        let pe = out.photoelectron_image.unwrap();
        assert_relative_eq!(*pe.get(0, 7).unwrap(), 1919.0);
    }

    #[test]
    fn test_raw_and_channel_modes() {
        let ev = event(vec![astri_record(1)]);
        let tel = &ev.telescopes[0];

        let raw = PipelineConfig::default()
            .with_mode(CalibrationMode::Raw)
            .with_channel(1)
            .with_photoelectrons(false);
        let out = extract_image(&ev, tel, &raw).unwrap();
        assert!(!out.calibrated);
        assert!(out.photoelectron_image.is_none());
        assert_relative_eq!(*out.image.get(5, 5).unwrap(), 500.0);

        let single = PipelineConfig::default().with_mode(CalibrationMode::Channel);
        let out = extract_image(&ev, tel, &single).unwrap();
        assert_relative_eq!(*out.image.get(0, 0).unwrap(), 20.0);
        assert_relative_eq!(*out.image.get(0, 1).unwrap(), 30.0);
    }

    #[test]
    fn test_threshold_override() {
        let ev = event(vec![astri_record(1)]);
        let config = PipelineConfig::default().with_adc_threshold(5000.0);
        let out = extract_image(&ev, &ev.telescopes[0], &config).unwrap();
        // Nothing saturates below 5000, so channel 0 everywhere.
        assert_relative_eq!(*out.image.get(0, 1).unwrap(), 30.0);
    }

    #[test]
    fn test_missing_inputs() {
        let mut tel = astri_record(3);
        tel.calibration = None;
        let ev = event(vec![tel]);
        assert_eq!(
            extract_image(&ev, &ev.telescopes[0], &PipelineConfig::default()).unwrap_err(),
            Error::MissingCalibration(3)
        );

        let raw = PipelineConfig::default()
            .with_mode(CalibrationMode::Raw)
            .with_channel(4);
        assert!(matches!(
            extract_image(&ev, &ev.telescopes[0], &raw),
            Err(Error::MissingChannel { channel: 4, .. })
        ));
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut hex = astri_record(2);
        hex.geometry = CameraGeometry::new(CameraId::from("FlashCam"), PixelType::Hexagonal);
        let mut short = astri_record(5);
        short.adc_sums = vec![vec![0.0; 10], vec![0.0; 10]];

        let ev = event(vec![astri_record(7), hex, short, astri_record(1)]);
        let results = extract_event_images(&ev, &PipelineConfig::default());

        let ids: Vec<u32> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 5, 7]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::GeometryMismatch { .. })));
        assert!(matches!(results[2].1, Err(Error::LengthMismatch { .. })));
        assert!(results[3].1.is_ok());
    }

    #[test]
    fn test_filters() {
        let ev = event(vec![astri_record(1), astri_record(2), astri_record(3)]);

        let config = PipelineConfig::default().with_telescopes([1, 3]);
        let ids: Vec<u32> = extract_event_images(&ev, &config)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let config = PipelineConfig::default().with_events([41]);
        assert!(extract_event_images(&ev, &config).is_empty());
        assert!(PipelineConfig::default().with_events([42]).accepts_event(42));
    }
}
