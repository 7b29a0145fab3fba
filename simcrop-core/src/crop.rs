//! Cropping flat camera readouts into rectangular grids.

use crate::error::{Error, Result};
use crate::geometry::{CameraGeometry, CameraId};
use crate::image::CroppedImage;
use crate::permutation::PermutationMap;

/// Crops a flat readout of `camera` into its rectangular grid.
///
/// The output is a pure reindexing: `out[r][c] == image[map[r][c]]`.
///
/// # Errors
/// `ShapeMismatch` if the image length is wrong for the camera,
/// `NotImplemented` for SCTCam, `GeometryMismatch` for unsupported cameras.
pub fn crop<T: Copy>(image: &[T], camera: &CameraId) -> Result<CroppedImage<T>> {
    let map = camera.permutation_map()?;
    crop_with_map(image, camera, map)
}

/// Crops a flat readout after checking the full geometry descriptor.
///
/// # Errors
/// As [`crop`], plus `GeometryMismatch` for non-rectangular pixels.
pub fn crop_geometry<T: Copy>(image: &[T], geometry: &CameraGeometry) -> Result<CroppedImage<T>> {
    let map = geometry.permutation_map()?;
    crop_with_map(image, &geometry.camera, map)
}

/// Crops an ASTRI readout (2368 pixels) into the 40x40 grid.
///
/// # Errors
/// `ShapeMismatch` if the image is not 2368 pixels long.
pub fn crop_astri_image<T: Copy>(image: &[T]) -> Result<CroppedImage<T>> {
    crop_with_map(image, &CameraId::Astri, PermutationMap::astri())
}

/// SCTCam cropping. The SCTCam pixel layout is not available, so this
/// always fails.
///
/// # Errors
/// Always `NotImplemented`.
pub fn crop_sctcam_image<T: Copy>(_image: &[T]) -> Result<CroppedImage<T>> {
    Err(Error::NotImplemented(CameraId::SctCam))
}

fn crop_with_map<T: Copy>(
    image: &[T],
    camera: &CameraId,
    map: &PermutationMap,
) -> Result<CroppedImage<T>> {
    let pixels = map.apply(image)?;
    Ok(CroppedImage::new(camera.clone(), pixels))
}
