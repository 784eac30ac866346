//! Screenshot serialization strategies.
//!
//! A captured frame becomes log tokens one of two ways: saved as a PNG with
//! the file path embedded in the stream, or base64-encoded inline. Both
//! forms bracket the payload with screenshot tokens so the log stays a
//! single chronological stream.

use std::path::PathBuf;

use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use image::ExtendedColorType;
use tracing::info;

use crate::platform::{CaptureError, Frame};
use crate::sink::EventSink;

const SCREENSHOT_PATH_TOKEN: &str = "[SCREENSHOT_PATH]";
const SCREENSHOT_BASE64_TOKEN: &str = "[SCREENSHOT_BASE64]";
const SCREENSHOT_END_TOKEN: &str = "[/SCREENSHOT]";

/// How a captured frame is turned into sink tokens.
pub enum SerializationStrategy {
    /// Save the frame as a PNG under `output_dir` and log the file path.
    FilePath { output_dir: PathBuf },
    /// Base64-encode the raw RGB buffer directly into the stream.
    Base64,
}

impl SerializationStrategy {
    /// Serialize a frame and emit its token into the sink.
    ///
    /// Expects tightly packed RGB; anything else is an encode fault.
    pub(crate) fn serialize(&self, sink: &EventSink, frame: &Frame) -> Result<(), CaptureError> {
        if frame.channels != 3 {
            return Err(CaptureError::Encode(format!(
                "expected 3-channel RGB frame, got {} channels",
                frame.channels
            )));
        }

        match self {
            SerializationStrategy::FilePath { output_dir } => {
                let filename = format!("ss_{}.png", Local::now().format("%Y-%m-%d_%H-%M-%S"));
                let path = output_dir.join(filename);

                image::save_buffer(
                    &path,
                    &frame.pixels,
                    frame.width,
                    frame.height,
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| CaptureError::Encode(format!("{}: {e}", path.display())))?;

                info!(path = %path.display(), "screenshot saved");
                sink.write(&format!(
                    "{SCREENSHOT_PATH_TOKEN}\"{}\"{SCREENSHOT_END_TOKEN}",
                    path.display()
                ));
            }
            SerializationStrategy::Base64 => {
                let encoded = general_purpose::STANDARD.encode(&frame.pixels);
                sink.write(&format!(
                    "{SCREENSHOT_BASE64_TOKEN}{encoded}{SCREENSHOT_END_TOKEN}"
                ));
            }
        }
        Ok(())
    }
}
