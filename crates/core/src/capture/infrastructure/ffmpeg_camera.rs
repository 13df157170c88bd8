use crate::capture::domain::frame_source::{
    CaptureError, CaptureInfo, CaptureRequest, FrameSource,
};
use crate::shared::frame::Frame;

/// Live camera capture through libavdevice.
///
/// The device is opened with the platform's capture backend (`v4l2`,
/// `avfoundation` or `dshow`) and every grabbed frame is converted to RGB24.
pub struct FfmpegCamera {
    backend: Option<String>,
    open: Option<OpenDevice>,
    next_index: u64,
}

struct OpenDevice {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegCamera is owned by the controller thread and never shared.
// The raw pointers inside ffmpeg types do not escape that thread.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// `backend` overrides the platform default input format name.
    pub fn new(backend: Option<String>) -> Self {
        Self {
            backend,
            open: None,
            next_index: 0,
        }
    }

    fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or_else(|| default_backend())
    }
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FrameSource for FfmpegCamera {
    fn open(&mut self, request: &CaptureRequest) -> Result<CaptureInfo, CaptureError> {
        self.close();
        ffmpeg_next::init().map_err(|e| CaptureError::Open(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let backend = self.backend().to_string();
        let device = match request.device.clone().or_else(|| default_device().map(String::from)) {
            Some(device) => device,
            None => {
                return Err(CaptureError::Open(format!(
                    "no default capture device for backend '{backend}'; configure one explicitly"
                )))
            }
        };

        if find_backend(&backend).is_none() {
            return Err(CaptureError::Open(format!(
                "capture backend '{backend}' is not available"
            )));
        }

        log::debug!(
            "Opening {backend} device {device} with requested {}x{} @ {} fps",
            request.width,
            request.height,
            request.fps
        );

        let ictx = match open_input(&device, &backend, Some(request)) {
            Ok(ictx) => ictx,
            Err(e) => {
                log::warn!(
                    "Device {device} refused {}x{} @ {} fps ({e}); using its default format",
                    request.width,
                    request.height,
                    request.fps
                );
                open_input(&device, &backend, None)
                    .map_err(|e| CaptureError::Open(format!("{device}: {e}")))?
            }
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Open(format!("{device}: no video stream")))?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| CaptureError::Open(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| CaptureError::Open(e.to_string()))?;

        log::info!("Camera {device} opened: {width}x{height}");

        self.open = Some(OpenDevice {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });

        Ok(CaptureInfo {
            device,
            width,
            height,
        })
    }

    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let dev = self.open.as_mut().ok_or(CaptureError::NotOpen)?;

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut dev.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => return Err(CaptureError::EndOfStream),
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    continue
                }
                Err(e) => return Err(CaptureError::Read(e.to_string())),
            }

            if packet.stream() != dev.stream_index {
                continue;
            }
            dev.decoder
                .send_packet(&packet)
                .map_err(|e| CaptureError::Read(e.to_string()))?;

            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if dev.decoder.receive_frame(&mut decoded).is_err() {
                continue;
            }

            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            dev.scaler
                .run(&decoded, &mut rgb)
                .map_err(|e| CaptureError::Read(e.to_string()))?;

            let pixels = extract_rgb_pixels(&rgb, dev.width, dev.height);
            let frame = Frame::new(pixels, dev.width, dev.height, self.next_index);
            self.next_index += 1;
            return Ok(frame);
        }
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            log::info!("Camera released");
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

fn find_backend(name: &str) -> Option<ffmpeg_next::format::Input> {
    ffmpeg_next::device::input::video().find(|f| f.name() == name)
}

fn open_input(
    device: &str,
    backend: &str,
    request: Option<&CaptureRequest>,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    let format = find_backend(backend).ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
    let mut options = ffmpeg_next::Dictionary::new();
    if let Some(req) = request {
        options.set("video_size", &format!("{}x{}", req.width, req.height));
        options.set("framerate", &req.fps.to_string());
    }
    let ctx = ffmpeg_next::format::open_with(
        device,
        &ffmpeg_next::Format::Input(format),
        options,
    )?;
    Ok(ctx.input())
}

/// Input format name for the platform's native capture API.
pub fn default_backend() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

/// DirectShow addresses cameras by friendly name, so Windows has no
/// usable default.
pub fn default_device() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("0")
    } else if cfg!(target_os = "windows") {
        None
    } else {
        Some("/dev/video0")
    }
}

/// Copies pixel rows out of an ffmpeg frame, dropping per-row padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(device: &str) -> CaptureRequest {
        CaptureRequest {
            device: Some(device.to_string()),
            width: 640,
            height: 480,
            fps: 30,
        }
    }

    #[test]
    fn test_grab_without_open_is_not_open() {
        let mut camera = FfmpegCamera::default();
        assert!(matches!(camera.grab(), Err(CaptureError::NotOpen)));
        assert!(!camera.is_open());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut camera = FfmpegCamera::default();
        let result = camera.open(&request("/nonexistent/video99"));
        assert!(matches!(result, Err(CaptureError::Open(_))));
        assert!(!camera.is_open());
    }

    #[test]
    fn test_unknown_backend_fails() {
        let mut camera = FfmpegCamera::new(Some("no-such-backend".into()));
        let err = camera.open(&request("0")).unwrap_err();
        assert!(err.to_string().contains("no-such-backend"));
    }

    #[test]
    fn test_close_idempotent() {
        let mut camera = FfmpegCamera::default();
        camera.close();
        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_default_backend_matches_platform() {
        let backend = default_backend();
        assert!(["v4l2", "avfoundation", "dshow"].contains(&backend));
    }
}
