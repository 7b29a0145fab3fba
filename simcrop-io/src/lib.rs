//! simcrop-io: Event dump reading and image document writing.
//!
//! Events are read from JSON Lines dumps (one `SimEvent` object per line).
//! Cropped images are written as JSON documents or CSV grids.
//!

mod document;
mod error;
mod reader;
mod writer;

pub use document::{read_image_document, ImageDocument};
pub use error::{Error, Result};
pub use reader::{read_event_set, EventFileReader};
pub use writer::{
    batch_output_name, default_output_name, event_output_name, ImageFileWriter, OutputFormat,
};
