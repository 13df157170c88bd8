use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{
    CaptureError, CaptureInfo, CaptureRequest, FrameSource,
};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays still images as if they came from a camera, looping forever.
///
/// Useful without hardware: demos, headless runs and tests. The requested
/// resolution is ignored; each image is delivered at its own size.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    next_index: u64,
    open: bool,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            position: 0,
            next_index: 0,
            open: false,
        }
    }

    /// Collects every image in `dir` (non-recursive), sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, CaptureError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| CaptureError::Open(format!("{}: {e}", dir.display())))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();
        Ok(Self::new(paths))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn decode(&self, path: &Path) -> Result<Frame, CaptureError> {
        let img = image::open(path)
            .map_err(|e| CaptureError::Read(format!("{}: {e}", path.display())))?;
        Ok(Frame::from_rgb_image(img.to_rgb8(), self.next_index))
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self, _request: &CaptureRequest) -> Result<CaptureInfo, CaptureError> {
        let first = self
            .paths
            .first()
            .ok_or_else(|| CaptureError::Open("no images to replay".into()))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| CaptureError::Open(format!("{}: {e}", first.display())))?;

        self.position = 0;
        self.open = true;
        Ok(CaptureInfo {
            device: first.display().to_string(),
            width,
            height,
        })
    }

    fn grab(&mut self) -> Result<Frame, CaptureError> {
        if !self.open {
            return Err(CaptureError::NotOpen);
        }
        let path = self.paths[self.position % self.paths.len()].clone();
        let frame = self.decode(&path)?;
        self.position = (self.position + 1) % self.paths.len();
        self.next_index += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
