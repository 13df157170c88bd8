use iced::widget::{column, text, Space};
use iced::Element;

use crate::app::{scaled, Message};

pub fn view<'a>(fs: f32, server_url: &str) -> Element<'a, Message> {
    let version = env!("CARGO_PKG_VERSION");

    column![
        text("FaceWatch").size(scaled(22.0, fs)),
        Space::new().height(4),
        text(format!("Version {version}")).size(scaled(13.0, fs)),
        Space::new().height(12),
        text(
            "Samples the webcam at a fixed interval and sends each frame to a \
             face detection and recognition service. Boxes and names from the \
             latest reply are drawn over the live preview."
        )
        .size(scaled(13.0, fs)),
        Space::new().height(12),
        text(format!("Service: {server_url}")).size(scaled(13.0, fs)),
        text("Endpoints: /detect, /recognize, /enroll").size(scaled(13.0, fs)),
        Space::new().height(12),
        text(
            "Frames leave this computer only as requests to the configured \
             service. Nothing is stored locally apart from your settings."
        )
        .size(scaled(13.0, fs)),
    ]
    .spacing(0)
    .into()
}
