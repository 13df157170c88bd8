use thiserror::Error;

use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_result::{FaceResult, Mode, RecognizedFace};
use crate::shared::face_box::FaceBox;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    /// The server answered with `success: false`; carries its error text.
    #[error("{0}")]
    Rejected(String),
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub name: String,
    pub image: EncodedImage,
}

/// The remote detection/recognition collaborator.
///
/// Calls block until the server replies; callers that must not block run
/// them on a worker thread.
pub trait FaceService: Send + Sync {
    fn detect(&self, image: &EncodedImage) -> Result<Vec<FaceBox>, ServiceError>;

    fn recognize(&self, image: &EncodedImage) -> Result<Vec<RecognizedFace>, ServiceError>;

    fn enroll(&self, request: &EnrollmentRequest) -> Result<(), ServiceError>;

    /// Calls the endpoint for `mode`.
    fn query(&self, mode: Mode, image: &EncodedImage) -> Result<FaceResult, ServiceError> {
        match mode {
            Mode::Detect => self.detect(image).map(FaceResult::Detected),
            Mode::Recognize => self.recognize(image).map(FaceResult::Recognized),
        }
    }
}
