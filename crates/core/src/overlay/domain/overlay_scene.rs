use crate::recognition::domain::face_result::FaceResult;
use crate::shared::face_box::FaceBox;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneItem {
    pub face: FaceBox,
    pub label: Option<String>,
}

/// Everything the overlay shows for one result, detached from the result
/// type so it can be handed to any thread and drawn on any surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayScene {
    pub width: u32,
    pub height: u32,
    pub items: Vec<SceneItem>,
}

impl OverlayScene {
    /// `None` yields a blank scene of the given size.
    pub fn from_result(result: Option<&FaceResult>, (width, height): (u32, u32)) -> Self {
        let items = result
            .map(|r| {
                r.labeled_boxes()
                    .into_iter()
                    .map(|(face, label)| SceneItem {
                        face,
                        label: label.map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            width,
            height,
            items,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::face_result::RecognizedFace;

    #[test]
    fn test_no_result_is_blank() {
        let scene = OverlayScene::from_result(None, (640, 480));
        assert!(scene.is_blank());
        assert_eq!((scene.width, scene.height), (640, 480));
    }

    #[test]
    fn test_detection_items_have_no_labels() {
        let result = FaceResult::Detected(vec![FaceBox::new(1, 1, 2, 2), FaceBox::new(5, 5, 2, 2)]);
        let scene = OverlayScene::from_result(Some(&result), (10, 10));
        assert_eq!(scene.items.len(), 2);
        assert!(scene.items.iter().all(|i| i.label.is_none()));
    }

    #[test]
    fn test_recognition_items_keep_names() {
        let result = FaceResult::Recognized(vec![RecognizedFace {
            face: FaceBox::new(10, 10, 50, 50),
            name: "Alice".into(),
        }]);
        let scene = OverlayScene::from_result(Some(&result), (100, 100));
        assert_eq!(scene.items[0].label.as_deref(), Some("Alice"));
    }
}
