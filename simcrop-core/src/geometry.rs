//! Camera geometry descriptors.
//!
//! Geometry is never inferred here. Callers describe a telescope's camera
//! with a [`CameraGeometry`] (pixel type tag plus camera identifier), and the
//! descriptor selects the [`PermutationMap`] used to crop its images.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::permutation::PermutationMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Camera identifier as reported by the geometry source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "String", into = "String")
)]
pub enum CameraId {
    /// ASTRI camera (37 modules of 8x8 pixels).
    Astri,
    /// SCT camera.
    SctCam,
    /// Any other camera, kept verbatim.
    Other(String),
}

impl CameraId {
    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Astri => "ASTRI",
            Self::SctCam => "SCTCam",
            Self::Other(name) => name,
        }
    }

    /// Returns the permutation map for this camera.
    ///
    /// # Errors
    /// `NotImplemented` for SCTCam, `GeometryMismatch` for cameras that are
    /// not rectangular block mosaics.
    pub fn permutation_map(&self) -> Result<&'static PermutationMap> {
        match self {
            Self::Astri => Ok(PermutationMap::astri()),
            Self::SctCam => Err(Error::NotImplemented(Self::SctCam)),
            Self::Other(_) => Err(Error::GeometryMismatch {
                camera: self.clone(),
                pixel_type: PixelType::Rectangular,
            }),
        }
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CameraId {
    fn from(value: &str) -> Self {
        match value {
            "ASTRI" => Self::Astri,
            "SCTCam" => Self::SctCam,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CameraId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<CameraId> for String {
    fn from(value: CameraId) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for CameraId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Pixel shape of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum PixelType {
    /// Square pixels on a regular grid.
    Rectangular,
    /// Hexagonal pixels.
    Hexagonal,
}

impl PixelType {
    /// Returns the tag string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangular => "rectangular",
            Self::Hexagonal => "hexagonal",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rectangular" => Ok(Self::Rectangular),
            "hexagonal" => Ok(Self::Hexagonal),
            other => Err(Error::UnknownPixelType(other.to_string())),
        }
    }
}

/// Geometry descriptor of a telescope camera.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraGeometry {
    /// Camera identifier.
    #[cfg_attr(feature = "serde", serde(rename = "camera_id"))]
    pub camera: CameraId,
    /// Pixel shape.
    pub pixel_type: PixelType,
}

impl CameraGeometry {
    /// Creates a geometry descriptor.
    #[must_use]
    pub fn new(camera: CameraId, pixel_type: PixelType) -> Self {
        Self { camera, pixel_type }
    }

    /// Descriptor of the ASTRI camera.
    #[must_use]
    pub fn astri() -> Self {
        Self::new(CameraId::Astri, PixelType::Rectangular)
    }

    /// Returns true for rectangular-pixel cameras.
    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        self.pixel_type == PixelType::Rectangular
    }

    /// Resolves the permutation map for this geometry.
    ///
    /// The pixel type is checked before the camera identifier, so a
    /// hexagonal camera is always a `GeometryMismatch` whatever its name.
    ///
    /// # Errors
    /// `GeometryMismatch` for non-rectangular or unknown cameras,
    /// `NotImplemented` for SCTCam.
    pub fn permutation_map(&self) -> Result<&'static PermutationMap> {
        if !self.is_rectangular() {
            return Err(Error::GeometryMismatch {
                camera: self.camera.clone(),
                pixel_type: self.pixel_type,
            });
        }
        self.camera.permutation_map()
    }
}
