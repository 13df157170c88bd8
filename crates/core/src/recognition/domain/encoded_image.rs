/// A frame encoded for transport: JPEG bytes carried as a data URL.
///
/// The service contract only ever sees the URL string; the raw bytes are
/// kept for previews and file output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    data_url: String,
    byte_len: usize,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn new(data_url: String, byte_len: usize, width: u32, height: u32) -> Self {
        Self {
            data_url,
            byte_len,
            width,
            height,
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Size of the encoded image before base64 expansion.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
