#![allow(clippy::cast_precision_loss)]
use std::io::Write;

use approx::assert_relative_eq;
use simcrop_core::{
    extract_event_images, CalibrationCoefficients, CalibrationMode, CameraGeometry, CameraId,
    PipelineConfig, PixelType, SimEvent, TelescopeRecord, ASTRI_PIXEL_COUNT,
};
use simcrop_io::{
    batch_output_name, event_output_name, read_event_set, read_image_document, EventFileReader, ImageDocument,
    ImageFileWriter, OutputFormat,
};
use tempfile::{tempdir, NamedTempFile};

fn astri_telescope(tel_id: u32) -> TelescopeRecord {
    let n = ASTRI_PIXEL_COUNT;
    TelescopeRecord {
        tel_id,
        geometry: CameraGeometry::astri(),
        focal_length: Some(2.15),
        adc_sums: vec![
            (0..n).map(|i| 100.0 + i as f64).collect(),
            vec![0.0; n],
        ],
        photo_electrons: Some((0..n).map(|i| i as f64).collect()),
        calibration: Some(CalibrationCoefficients::new(
            vec![vec![100.0; n], vec![0.0; n]],
            vec![vec![2.0; n], vec![1.0; n]],
        )),
    }
}

fn write_dump(events: &[SimEvent]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for event in events {
        writeln!(file, "{}", serde_json::to_string(event).unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}

fn sample_events() -> Vec<SimEvent> {
    let mut hex = astri_telescope(9);
    hex.geometry = CameraGeometry::new(CameraId::from("FlashCam"), PixelType::Hexagonal);
    vec![
        SimEvent {
            event_id: 101,
            triggered_telescopes: vec![1, 9],
            mc: None,
            telescopes: vec![astri_telescope(1), hex],
        },
        SimEvent {
            event_id: 102,
            triggered_telescopes: vec![1],
            mc: None,
            telescopes: vec![astri_telescope(1)],
        },
    ]
}

#[test]
fn test_dump_to_documents() {
    let dump = write_dump(&sample_events());
    let out_dir = tempdir().unwrap();
    let config = PipelineConfig::default().with_mode(CalibrationMode::Channel);

    let mut written = Vec::new();
    let mut failures = 0;
    for event in EventFileReader::open(dump.path()).unwrap() {
        let event = event.unwrap();
        for (tel_id, result) in extract_event_images(&event, &config) {
            let Ok(extracted) = result else {
                failures += 1;
                continue;
            };
            let path = batch_output_name(
                dump.path(),
                Some(out_dir.path()),
                event.event_id,
                tel_id,
                OutputFormat::Json,
            );
            let doc = ImageDocument::from_extracted(&extracted, Some(dump.path()));
            ImageFileWriter::create(&path)
                .unwrap()
                .write_json(&doc)
                .unwrap();
            written.push(path);
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(written.len(), 2);

    let doc = read_image_document(&written[0]).unwrap();
    assert_eq!(doc.event_id, 101);
    assert!(doc.calibrated);
    let image = doc.cropped_image().unwrap();
    assert_eq!(image.shape(), (40, 40));
    // Pixel 1919 at (0, 7): (100 + 1919 - 100) * 2.
    assert_relative_eq!(*image.get(0, 7).unwrap(), 3838.0);

    let pe = doc.cropped_photoelectron_image().unwrap().unwrap();
    assert_relative_eq!(*pe.get(0, 0).unwrap(), 1912.0);
}

#[test]
fn test_event_set_from_file() {
    let dump = write_dump(&sample_events());
    let set = read_event_set(dump.path()).unwrap();
    let pairs: Vec<(u64, u32)> = set.into_iter().collect();
    assert_eq!(pairs, vec![(101, 1), (101, 9), (102, 1)]);
}

#[test]
fn test_event_dump_round_trip() {
    let dump = write_dump(&sample_events());
    let out_dir = tempdir().unwrap();

    let event = EventFileReader::open(dump.path())
        .unwrap()
        .with_allowed_telescopes([9])
        .find_event(101)
        .unwrap();
    let path = out_dir.path().join(event_output_name(9, event.event_id));
    ImageFileWriter::create(&path)
        .unwrap()
        .write_event(&event)
        .unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "CT009_EV00101_FULL_EVENT.json"
    );
    let content = std::fs::read_to_string(&path).unwrap();
    let back: SimEvent = serde_json::from_str(&content).unwrap();
    assert_eq!(back, event);
    assert_eq!(back.triggered_telescopes, vec![9]);
    assert_eq!(back.telescopes.len(), 1);
    assert_eq!(back.telescopes[0].geometry.pixel_type, PixelType::Hexagonal);
}
