use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use base64::{engine::general_purpose::STANDARD, Engine};

/// Where a frame's pixels live until the recognizer needs them.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameImage {
    DataUrl(String),
    /// Read and encoded off the event loop, right before recognition.
    File { path: PathBuf, mime: &'static str },
}

/// One captured frame. Consumed once.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub image: FrameImage,
    pub captured_at: Instant,
}

impl CaptureEvent {
    pub fn new(image_data_url: impl Into<String>) -> Self {
        Self {
            image: FrameImage::DataUrl(image_data_url.into()),
            captured_at: Instant::now(),
        }
    }

    pub fn from_file(path: PathBuf, mime: &'static str) -> Self {
        Self {
            image: FrameImage::File { path, mime },
            captured_at: Instant::now(),
        }
    }

    /// Encode the frame as a data URL, reading it from disk if needed.
    /// Blocking. `Ok(None)` when the file turned out to be empty.
    pub fn into_data_url(self) -> io::Result<Option<String>> {
        match self.image {
            FrameImage::DataUrl(url) => Ok(Some(url)),
            FrameImage::File { path, mime } => {
                let bytes = fs::read(&path)?;
                if bytes.is_empty() {
                    return Ok(None);
                }
                log::debug!("Read frame {} ({} bytes)", path.display(), bytes.len());
                Ok(Some(encode_data_url(mime, &bytes)))
            }
        }
    }
}

/// Anything that can hand over the current camera frame on demand.
/// `None` means no frame is available right now.
pub trait FrameSource: Send {
    fn capture_frame(&mut self) -> Option<CaptureEvent>;
}

/// Reads the newest image dropped into a directory by an external camera tool.
pub struct DirectoryFrameSource {
    dir: PathBuf,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn newest_image(&self) -> Option<(PathBuf, &'static str)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Frame directory {} unavailable: {e}", self.dir.display());
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let mime = mime_for(&path)?;
                let metadata = entry.metadata().ok()?;
                if metadata.len() == 0 {
                    return None;
                }
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, path, mime))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, path, mime)| (path, mime))
    }
}

impl FrameSource for DirectoryFrameSource {
    /// Picks the file only; its contents are read by the recognition task.
    fn capture_frame(&mut self) -> Option<CaptureEvent> {
        let (path, mime) = self.newest_image()?;
        log::debug!("Captured frame {}", path.display());
        Some(CaptureEvent::from_file(path, mime))
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
