use crate::shared::constants::{DETECT_PATH, RECOGNIZE_PATH};
use crate::shared::face_box::FaceBox;

/// Which endpoint the polling loop feeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Detect,
    Recognize,
}

impl Mode {
    pub const ALL: &[Mode] = &[Mode::Detect, Mode::Recognize];

    pub fn toggled(self) -> Self {
        match self {
            Mode::Detect => Mode::Recognize,
            Mode::Recognize => Mode::Detect,
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Mode::Detect => DETECT_PATH,
            Mode::Recognize => RECOGNIZE_PATH,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Detect => write!(f, "Detect"),
            Mode::Recognize => write!(f, "Recognize"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognizedFace {
    pub face: FaceBox,
    pub name: String,
}

/// One server reply, already decoded into frame coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaceResult {
    Detected(Vec<FaceBox>),
    Recognized(Vec<RecognizedFace>),
}

impl FaceResult {
    pub fn mode(&self) -> Mode {
        match self {
            FaceResult::Detected(_) => Mode::Detect,
            FaceResult::Recognized(_) => Mode::Recognize,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FaceResult::Detected(boxes) => boxes.len(),
            FaceResult::Recognized(faces) => faces.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Boxes paired with their labels, in server order.
    pub fn labeled_boxes(&self) -> Vec<(FaceBox, Option<&str>)> {
        match self {
            FaceResult::Detected(boxes) => boxes.iter().map(|b| (*b, None)).collect(),
            FaceResult::Recognized(faces) => faces
                .iter()
                .map(|f| (f.face, Some(f.name.as_str())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trips() {
        assert_eq!(Mode::Detect.toggled(), Mode::Recognize);
        assert_eq!(Mode::Recognize.toggled(), Mode::Detect);
        assert_eq!(Mode::default(), Mode::Detect);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Mode::Detect.endpoint(), "/detect");
        assert_eq!(Mode::Recognize.endpoint(), "/recognize");
    }

    #[test]
    fn test_labeled_boxes_preserves_order_and_labels() {
        let result = FaceResult::Recognized(vec![
            RecognizedFace {
                face: FaceBox::new(0, 0, 5, 5),
                name: "Alice".into(),
            },
            RecognizedFace {
                face: FaceBox::new(10, 0, 5, 5),
                name: "Unknown".into(),
            },
        ]);
        let labeled = result.labeled_boxes();
        assert_eq!(labeled.len(), 2);
        assert_eq!(labeled[0].1, Some("Alice"));
        assert_eq!(labeled[1].0.x, 10);
        assert_eq!(result.mode(), Mode::Recognize);
    }

    #[test]
    fn test_detected_boxes_are_unlabeled() {
        let result = FaceResult::Detected(vec![FaceBox::new(1, 2, 3, 4)]);
        assert_eq!(result.labeled_boxes(), vec![(FaceBox::new(1, 2, 3, 4), None)]);
        assert!(!result.is_empty());
    }
}
