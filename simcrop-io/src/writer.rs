//! File writers for cropped images.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use simcrop_core::{CroppedImage, SimEvent};

use crate::{ImageDocument, Result};

/// Output encoding of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON image document.
    Json,
    /// Comma-separated grid, one image row per line.
    Csv,
}

impl OutputFormat {
    /// Picks the format from a file extension, if recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Default file name for a single extracted image.
#[must_use]
pub fn default_output_name(tel_id: u32, event_id: u64, channel: usize, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!(
        "TEL{tel_id:03}_EV{event_id:05}_CH{channel:03}.{}",
        format.extension()
    ))
}

/// Default file name for a full event dump of one telescope.
#[must_use]
pub fn event_output_name(tel_id: u32, event_id: u64) -> PathBuf {
    PathBuf::from(format!("CT{tel_id:03}_EV{event_id:05}_FULL_EVENT.json"))
}

/// File name for one image of a batch extraction.
///
/// The prefix is the input file name, placed in `output_dir` when given and
/// next to the input otherwise.
#[must_use]
pub fn batch_output_name(
    input: &Path,
    output_dir: Option<&Path>,
    event_id: u64,
    tel_id: u32,
    format: OutputFormat,
) -> PathBuf {
    let prefix = match (output_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_path_buf(),
    };
    let mut name = prefix.into_os_string();
    name.push(format!(
        "_EV{event_id:05}_TEL{tel_id:03}.{}",
        format.extension()
    ));
    PathBuf::from(name)
}

/// Writer for cropped image output.
pub struct ImageFileWriter {
    writer: BufWriter<File>,
}

impl ImageFileWriter {
    /// Creates a new file writer, replacing any existing file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes an image document in the given format.
    ///
    /// CSV output holds only the main image grid; a photoelectron image is
    /// dropped with a warning.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_document(&mut self, document: &ImageDocument, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => self.write_json(document),
            OutputFormat::Csv => {
                if document.photoelectron_image.is_some() {
                    log::warn!(
                        "event {} telescope {}: photoelectron image not written to CSV",
                        document.event_id,
                        document.tel_id
                    );
                }
                self.write_rows_csv(&document.image)
            }
        }
    }

    /// Writes a full event as pretty-printed JSON with sorted keys.
    ///
    /// # Errors
    /// Returns an error on serialization or write failure.
    pub fn write_event(&mut self, event: &SimEvent) -> Result<()> {
        // serde_json maps keep their keys sorted
        let value = serde_json::to_value(event)?;
        serde_json::to_writer_pretty(&mut self.writer, &value)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes an image document as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error on serialization or write failure.
    pub fn write_json(&mut self, document: &ImageDocument) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, document)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a cropped image as CSV.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_image_csv(&mut self, image: &CroppedImage<f64>) -> Result<()> {
        self.write_rows_csv(&image.to_rows())
    }

    fn write_rows_csv(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        for row in rows {
            let line = row
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcrop_core::{CameraId, McShower, PixelType};
    use tempfile::NamedTempFile;

    fn document() -> ImageDocument {
        ImageDocument {
            calibrated: true,
            camera_id: CameraId::Astri,
            event_id: 12,
            focal_length: None,
            image: vec![vec![1.5, -2.0], vec![0.0, 4.25]],
            mc: None,
            photoelectron_image: None,
            pixel_type: PixelType::Rectangular,
            simtel_file: None,
            tel_id: 1,
        }
    }

    #[test]
    fn test_write_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ImageFileWriter::create(file.path()).unwrap();
        writer.write_document(&document(), OutputFormat::Csv).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "1.5,-2\n0,4.25\n");
    }

    #[test]
    fn test_write_json_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ImageFileWriter::create(file.path()).unwrap();
        writer.write_document(&document(), OutputFormat::Json).unwrap();

        let back = crate::read_image_document(file.path()).unwrap();
        assert_eq!(back, document());
    }

    #[test]
    fn test_csv_keeps_main_image_only() {
        let file = NamedTempFile::new().unwrap();
        let mut doc = document();
        doc.photoelectron_image = Some(vec![vec![9.0, 9.0], vec![9.0, 9.0]]);
        ImageFileWriter::create(file.path())
            .unwrap()
            .write_document(&doc, OutputFormat::Csv)
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "1.5,-2\n0,4.25\n");
    }

    #[test]
    fn test_write_event() {
        let event = SimEvent {
            event_id: 42,
            triggered_telescopes: vec![3],
            mc: Some(McShower {
                energy: 1.5,
                az: 0.1,
                alt: 1.2,
                core_x: -20.0,
                core_y: 35.0,
            }),
            telescopes: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(event_output_name(3, 42));
        assert!(path.ends_with("CT003_EV00042_FULL_EVENT.json"));

        ImageFileWriter::create(&path)
            .unwrap()
            .write_event(&event)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let keys: Vec<usize> = ["\"event_id\"", "\"mc\"", "\"telescopes\"", "\"triggered_telescopes\""]
            .iter()
            .map(|key| content.find(key).unwrap())
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(content.lines().count() > 1);

        let back: SimEvent = serde_json::from_str(&content).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            default_output_name(3, 42, 0, OutputFormat::Json),
            PathBuf::from("TEL003_EV00042_CH000.json")
        );
        assert_eq!(
            batch_output_name(
                Path::new("/data/run7.jsonl"),
                Some(Path::new("out")),
                5,
                12,
                OutputFormat::Csv
            ),
            PathBuf::from("out/run7.jsonl_EV00005_TEL012.csv")
        );
        assert_eq!(
            batch_output_name(Path::new("run7.jsonl"), None, 5, 12, OutputFormat::Json),
            PathBuf::from("run7.jsonl_EV00005_TEL012.json")
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("a/b.JSON")),
            Some(OutputFormat::Json)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("x.csv")),
            Some(OutputFormat::Csv)
        );
        assert_eq!(OutputFormat::from_path(Path::new("x.fits")), None);
    }
}
