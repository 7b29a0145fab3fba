//! Flat readout images and cropped rectangular images.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::geometry::CameraId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One readout channel of a camera, one sample per physical pixel index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChannelImage<T = f64> {
    samples: Vec<T>,
}

impl<T> RawChannelImage<T> {
    /// Wraps readout samples.
    #[must_use]
    pub fn new(samples: Vec<T>) -> Self {
        Self { samples }
    }

    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the image has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in readout order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.samples
    }
}

impl<T> From<Vec<T>> for RawChannelImage<T> {
    fn from(samples: Vec<T>) -> Self {
        Self::new(samples)
    }
}

impl<T> AsRef<[T]> for RawChannelImage<T> {
    fn as_ref(&self) -> &[T] {
        &self.samples
    }
}

/// Rectangular image produced by cropping a flat readout.
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedImage<T = f64> {
    camera: CameraId,
    pixels: Array2<T>,
}

impl<T> CroppedImage<T> {
    /// Wraps a cropped pixel grid.
    #[must_use]
    pub fn new(camera: CameraId, pixels: Array2<T>) -> Self {
        Self { camera, pixels }
    }

    /// Camera the image came from.
    #[must_use]
    pub fn camera(&self) -> &CameraId {
        &self.camera
    }

    /// Shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    /// Pixel value at (row, col).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.pixels.get([row, col])
    }

    /// The pixel grid.
    #[must_use]
    pub fn pixels(&self) -> &Array2<T> {
        &self.pixels
    }

    /// Consumes the image and returns the pixel grid.
    #[must_use]
    pub fn into_pixels(self) -> Array2<T> {
        self.pixels
    }

    /// Applies `f` to every pixel, keeping the camera.
    #[must_use]
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> CroppedImage<U> {
        CroppedImage {
            camera: self.camera.clone(),
            pixels: self.pixels.map(f),
        }
    }
}

impl<T: Clone> CroppedImage<T> {
    /// Pixel rows as nested vectors, top row first.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.pixels.outer_iter().map(|row| row.to_vec()).collect()
    }
}

impl CroppedImage<f64> {
    /// Summary statistics, or `None` for an empty image.
    #[must_use]
    pub fn stats(&self) -> Option<ImageStats> {
        ImageStats::from_values(self.pixels.iter().copied())
    }

    /// Builds an image from nested rows.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when rows differ in length.
    pub fn from_rows(camera: CameraId, rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::ShapeMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let pixels = Array2::from_shape_vec((rows.len(), cols), flat)
            .map_err(|err| Error::ConfigError(err.to_string()))?;
        Ok(Self::new(camera, pixels))
    }
}

/// Summary statistics of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageStats {
    /// Smallest pixel value.
    pub min: f64,
    /// Largest pixel value.
    pub max: f64,
    /// Mean pixel value.
    pub mean: f64,
    /// Sum of pixel values.
    pub sum: f64,
    /// Number of pixels.
    pub count: usize,
}

impl ImageStats {
    /// Computes statistics over a sequence of values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in values {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }
        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
            sum,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_raw_channel_image() {
        let image = RawChannelImage::from(vec![1u16, 2, 3]);
        assert_eq!(image.len(), 3);
        assert!(!image.is_empty());
        assert_eq!(image.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let image = CroppedImage::from_rows(CameraId::Astri, &rows).unwrap();
        assert_eq!(image.shape(), (3, 2));
        assert_eq!(image.get(2, 0), Some(&5.0));
        assert_eq!(image.to_rows(), rows);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(CroppedImage::from_rows(CameraId::Astri, &rows).is_err());
    }

    #[test]
    fn test_stats() {
        let rows = vec![vec![-1.0, 2.0], vec![3.0, 8.0]];
        let stats = CroppedImage::from_rows(CameraId::Astri, &rows)
            .unwrap()
            .stats()
            .unwrap();
        assert_relative_eq!(stats.min, -1.0);
        assert_relative_eq!(stats.max, 8.0);
        assert_relative_eq!(stats.sum, 12.0);
        assert_relative_eq!(stats.mean, 3.0);
        assert_eq!(stats.count, 4);

        assert!(ImageStats::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn test_map_keeps_camera() {
        let image = CroppedImage::from_rows(CameraId::Astri, &[vec![1.0, 2.0]]).unwrap();
        let doubled = image.map(|v| v * 2.0);
        assert_eq!(doubled.camera(), &CameraId::Astri);
        assert_eq!(doubled.to_rows(), vec![vec![2.0, 4.0]]);
    }
}
