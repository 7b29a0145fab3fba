//! Serialized form of an extracted image.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use simcrop_core::{CameraId, CroppedImage, ExtractedImage, McShower, PixelType};

use crate::{Error, Result};

/// JSON document describing one cropped telescope image.
///
/// Fields are declared in alphabetical order so the JSON keys come out
/// sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDocument {
    /// Whether pedestal and gain were applied to `image`.
    pub calibrated: bool,
    /// Camera identifier.
    pub camera_id: CameraId,
    /// Event identifier.
    pub event_id: u64,
    /// Optical focal length (m).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,
    /// Cropped image rows, top row first.
    pub image: Vec<Vec<f64>>,
    /// Monte-Carlo shower truth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mc: Option<McShower>,
    /// Cropped photoelectron image rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photoelectron_image: Option<Vec<Vec<f64>>>,
    /// Pixel shape of the camera.
    pub pixel_type: PixelType,
    /// Event dump the image came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simtel_file: Option<String>,
    /// Telescope identifier.
    pub tel_id: u32,
}

impl ImageDocument {
    /// Builds a document from an extracted image.
    #[must_use]
    pub fn from_extracted(extracted: &ExtractedImage, source_file: Option<&Path>) -> Self {
        Self {
            calibrated: extracted.calibrated,
            camera_id: extracted.geometry.camera.clone(),
            event_id: extracted.event_id,
            focal_length: extracted.focal_length,
            image: extracted.image.to_rows(),
            mc: extracted.mc,
            photoelectron_image: extracted
                .photoelectron_image
                .as_ref()
                .map(CroppedImage::to_rows),
            pixel_type: extracted.geometry.pixel_type,
            simtel_file: source_file.map(|path| path.display().to_string()),
            tel_id: extracted.tel_id,
        }
    }

    /// The image as a cropped grid.
    ///
    /// # Errors
    /// Returns an error if the rows are ragged.
    pub fn cropped_image(&self) -> Result<CroppedImage<f64>> {
        Ok(CroppedImage::from_rows(self.camera_id.clone(), &self.image)?)
    }

    /// The photoelectron image as a cropped grid, if present.
    ///
    /// # Errors
    /// Returns an error if the rows are ragged.
    pub fn cropped_photoelectron_image(&self) -> Result<Option<CroppedImage<f64>>> {
        self.photoelectron_image
            .as_deref()
            .map(|rows| CroppedImage::from_rows(self.camera_id.clone(), rows))
            .transpose()
            .map_err(Error::from)
    }
}

/// Reads an image document written by [`crate::ImageFileWriter`].
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid document.
pub fn read_image_document<P: AsRef<Path>>(path: P) -> Result<ImageDocument> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
