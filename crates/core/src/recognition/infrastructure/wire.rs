//! JSON shapes of the face service endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::recognition::domain::face_result::RecognizedFace;
use crate::recognition::domain::face_service::ServiceError;
use crate::shared::face_box::FaceBox;

#[derive(Serialize)]
pub(crate) struct ImageBody<'a> {
    pub image: &'a str,
}

#[derive(Serialize)]
pub(crate) struct EnrollBody<'a> {
    pub name: &'a str,
    pub image: &'a str,
}

/// Common reply wrapper: `{ success, faces?, error? }`.
#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    error: Option<String>,
    faces: Option<T>,
}

/// `[x, y, width, height]`
type WireBox = [f64; 4];

#[derive(Deserialize)]
struct WireRecognized {
    /// `[top, right, bottom, left]`
    location: [f64; 4],
    name: String,
}

pub(crate) fn parse_detect(endpoint: &str, body: &str) -> Result<Vec<FaceBox>, ServiceError> {
    let faces: Vec<WireBox> = require_faces(endpoint, open(endpoint, body)?)?;
    Ok(faces
        .iter()
        .map(|[x, y, w, h]| FaceBox::new(px(*x), px(*y), px(*w), px(*h)))
        .collect())
}

pub(crate) fn parse_recognize(
    endpoint: &str,
    body: &str,
) -> Result<Vec<RecognizedFace>, ServiceError> {
    let faces: Vec<WireRecognized> = require_faces(endpoint, open(endpoint, body)?)?;
    Ok(faces
        .into_iter()
        .map(|f| {
            let [top, right, bottom, left] = f.location;
            RecognizedFace {
                face: FaceBox::from_edges(px(top), px(right), px(bottom), px(left)),
                name: f.name,
            }
        })
        .collect())
}

pub(crate) fn parse_enroll(endpoint: &str, body: &str) -> Result<(), ServiceError> {
    open::<serde_json::Value>(endpoint, body).map(|_| ())
}

/// Best-effort extraction of the server's error text from a failed reply.
pub(crate) fn rejection(body: &str) -> Option<String> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body).ok()?;
    if envelope.success {
        return None;
    }
    Some(envelope.error.unwrap_or_else(|| "request failed".to_string()))
}

fn open<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<Option<T>, ServiceError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ServiceError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
    if !envelope.success {
        return Err(ServiceError::Rejected(
            envelope
                .error
                .unwrap_or_else(|| "request failed".to_string()),
        ));
    }
    Ok(envelope.faces)
}

fn require_faces<T>(endpoint: &str, faces: Option<T>) -> Result<T, ServiceError> {
    faces.ok_or_else(|| ServiceError::Malformed {
        endpoint: endpoint.to_string(),
        message: "missing 'faces'".to_string(),
    })
}

fn px(value: f64) -> i32 {
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_single_box() {
        let faces = parse_detect("/detect", r#"{"success":true,"faces":[[10,10,50,50]]}"#).unwrap();
        assert_eq!(faces, vec![FaceBox::new(10, 10, 50, 50)]);
    }

    #[test]
    fn test_detect_rounds_float_coordinates() {
        let faces =
            parse_detect("/detect", r#"{"success":true,"faces":[[10.4,9.6,50.5,49.2]]}"#).unwrap();
        assert_eq!(faces, vec![FaceBox::new(10, 10, 51, 49)]);
    }

    #[test]
    fn test_detect_empty_list() {
        assert!(parse_detect("/detect", r#"{"success":true,"faces":[]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_recognize_converts_edges() {
        let faces = parse_recognize(
            "/recognize",
            r#"{"success":true,"faces":[{"location":[10,60,60,10],"name":"Alice"}]}"#,
        )
        .unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].face, FaceBox::new(10, 10, 50, 50));
        assert_eq!(faces[0].name, "Alice");
    }

    #[test]
    fn test_rejected_carries_server_text() {
        let err = parse_detect("/detect", r#"{"success":false,"error":"no image"}"#).unwrap_err();
        assert_eq!(err, ServiceError::Rejected("no image".into()));
    }

    #[test]
    fn test_rejected_without_text_gets_generic_message() {
        let err = parse_enroll("/enroll", r#"{"success":false}"#).unwrap_err();
        assert_eq!(err, ServiceError::Rejected("request failed".into()));
    }

    #[test]
    fn test_success_without_faces_is_malformed() {
        let err = parse_detect("/detect", r#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed { .. }));
    }

    #[test]
    fn test_missing_success_is_malformed() {
        let err = parse_enroll("/enroll", r#"{"faces":[]}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed { .. }));
    }

    #[test]
    fn test_enroll_success() {
        assert!(parse_enroll("/enroll", r#"{"success":true}"#).is_ok());
    }

    #[test]
    fn test_rejection_only_for_failures() {
        assert_eq!(
            rejection(r#"{"success":false,"error":"boom"}"#),
            Some("boom".to_string())
        );
        assert_eq!(rejection(r#"{"success":true}"#), None);
        assert_eq!(rejection("<html>oops</html>"), None);
    }
}
