//! simcrop-core: Pixel remapping and calibration for Cherenkov camera images.
//!
//! This crate turns the flat pixel readout of rectangular-pixel cameras
//! (ASTRI) into 2D grids, applies pedestal/gain calibration, and carries the
//! event record types shared by the I/O and CLI crates.
//!

pub mod calibration;
pub mod crop;
pub mod error;
pub mod event;
pub mod geometry;
pub mod image;
pub mod permutation;
pub mod pipeline;
pub mod summary;

pub use calibration::{
    apply_calibration, apply_dual_gain_calibration, CalibrationCoefficients, CalibrationConfig,
    Calibrator, DEFAULT_ADC_THRESHOLD,
};
pub use crop::{crop, crop_astri_image, crop_geometry, crop_sctcam_image};
pub use error::{Error, Result};
pub use event::{McShower, SimEvent, TelescopeRecord};
pub use geometry::{CameraGeometry, CameraId, PixelType};
pub use image::{CroppedImage, ImageStats, RawChannelImage};
pub use permutation::{PermutationMap, ASTRI_GRID_SIDE, ASTRI_PIXEL_COUNT};
pub use pipeline::{
    extract_event_images, extract_image, CalibrationMode, ExtractedImage, PipelineConfig,
};
pub use summary::{event_set, EventSet, EventSummary, SetOperation};
