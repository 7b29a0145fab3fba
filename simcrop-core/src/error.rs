//! Error types for simcrop-core.

use crate::geometry::{CameraId, PixelType};
use thiserror::Error;

/// Result type alias for simcrop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for simcrop operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Flat image length does not match the camera's pixel count.
    #[error("invalid image shape: expected {expected} pixels, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Camera geometry has no rectangular permutation map.
    #[error("geometry mismatch: {camera} camera with {pixel_type} pixels cannot be cropped to a rectangular grid")]
    GeometryMismatch {
        camera: CameraId,
        pixel_type: PixelType,
    },

    /// Camera is rectangular but its pixel layout is unknown.
    #[error("cropping is not implemented for {0} cameras")]
    NotImplemented(CameraId),

    /// Calibration input arrays disagree in length.
    #[error("length mismatch: {field} has {actual} values, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Requested readout channel is not available.
    #[error("channel {channel} not available ({available} channel(s))")]
    MissingChannel { channel: usize, available: usize },

    /// Telescope has no calibration coefficients.
    #[error("no calibration coefficients for telescope {0}")]
    MissingCalibration(u32),

    /// Unrecognized pixel type tag.
    #[error("unknown pixel type: {0:?}")]
    UnknownPixelType(String),

    /// Module layout table is not a valid block mosaic.
    #[error("invalid module layout: {0}")]
    InvalidLayout(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
