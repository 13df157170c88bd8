use serde::Serialize;

use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_result::RecognizedFace;
use crate::recognition::domain::face_service::{EnrollmentRequest, FaceService, ServiceError};
use crate::recognition::infrastructure::wire::{self, EnrollBody, ImageBody};
use crate::shared::config::ClientConfig;
use crate::shared::constants::{DETECT_PATH, ENROLL_PATH, RECOGNIZE_PATH};
use crate::shared::face_box::FaceBox;

/// [`FaceService`] over JSON/HTTP with a blocking `reqwest` client.
///
/// No retries: every failure is returned to the caller as-is.
pub struct HttpFaceService {
    client: reqwest::blocking::Client,
    config: ClientConfig,
}

impl HttpFaceService {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Transport {
                endpoint: config.server_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    /// Posts a JSON body and returns the response text once the status has
    /// been checked. Non-2xx replies that still carry the error envelope
    /// surface as [`ServiceError::Rejected`].
    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ServiceError> {
        let url = self.config.endpoint(path);
        let transport = |e: reqwest::Error| ServiceError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        };

        let response = self.client.post(&url).json(body).send().map_err(transport)?;
        let status = response.status();
        let text = response.text().map_err(transport)?;

        if !status.is_success() {
            log::debug!("{path} answered {status}: {text}");
            return Err(match wire::rejection(&text) {
                Some(message) => ServiceError::Rejected(message),
                None => ServiceError::Status {
                    endpoint: path.to_string(),
                    status: status.as_u16(),
                },
            });
        }
        Ok(text)
    }
}

impl FaceService for HttpFaceService {
    fn detect(&self, image: &EncodedImage) -> Result<Vec<FaceBox>, ServiceError> {
        let body = ImageBody {
            image: image.data_url(),
        };
        let text = self.post(DETECT_PATH, &body)?;
        wire::parse_detect(DETECT_PATH, &text)
    }

    fn recognize(&self, image: &EncodedImage) -> Result<Vec<RecognizedFace>, ServiceError> {
        let body = ImageBody {
            image: image.data_url(),
        };
        let text = self.post(RECOGNIZE_PATH, &body)?;
        wire::parse_recognize(RECOGNIZE_PATH, &text)
    }

    fn enroll(&self, request: &EnrollmentRequest) -> Result<(), ServiceError> {
        let body = EnrollBody {
            name: &request.name,
            image: request.image.data_url(),
        };
        let text = self.post(ENROLL_PATH, &body)?;
        wire::parse_enroll(ENROLL_PATH, &text)
    }
}
