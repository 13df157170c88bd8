use iced::widget::{button, checkbox, column, pick_list, row, slider, text, text_input, Space};
use iced::{Element, Length, Theme};

use crate::app::{scaled, Message};
use crate::settings::{Appearance, Settings, SettingsDraft};
use crate::theme::muted_color;

pub fn view<'a>(settings: &Settings, draft: &'a SettingsDraft, theme: &Theme) -> Element<'a, Message> {
    let fs = settings.font_scale;
    let muted = muted_color(theme);

    let mut connection = column![
        text("Face service").size(scaled(16.0, fs)),
        Space::new().height(8),
        labeled(fs, "Server URL", text_input("http://127.0.0.1:5000", &draft.server_url)
            .on_input(Message::ServerUrlChanged)
            .size(scaled(13.0, fs))
            .padding(6)
            .into()),
        labeled(fs, "Poll interval (ms)", text_input("100", &draft.poll_interval_ms)
            .on_input(Message::PollIntervalChanged)
            .size(scaled(13.0, fs))
            .padding(6)
            .width(120)
            .into()),
        labeled(fs, "Camera device", text_input("default", &draft.device)
            .on_input(Message::DeviceChanged)
            .size(scaled(13.0, fs))
            .padding(6)
            .into()),
        text("Applying reconnects and stops a running camera.")
            .size(scaled(12.0, fs))
            .color(muted),
    ]
    .spacing(8);

    if let Some(error) = &draft.error {
        connection = connection.push(
            text(error.clone())
                .size(scaled(12.0, fs))
                .color(theme.palette().danger),
        );
    }

    connection = connection.push(
        row![
            button(text("Apply").size(scaled(13.0, fs)))
                .on_press(Message::ApplySettings)
                .padding([6, 16]),
            button(text("Restore Defaults").size(scaled(13.0, fs)))
                .on_press(Message::RestoreDefaults)
                .padding([6, 16])
                .style(button::secondary),
        ]
        .spacing(8),
    );

    let appearance = column![
        text("Appearance").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Mode").size(scaled(13.0, fs)),
            pick_list(Appearance::ALL, Some(settings.appearance), |a| {
                Message::AppearanceChanged(a)
            })
            .text_size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        row![
            text("Font size").size(scaled(13.0, fs)),
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
    ]
    .spacing(8);

    column![connection, Space::new().height(24), appearance]
        .spacing(0)
        .into()
}

fn labeled<'a>(fs: f32, label: &'a str, input: Element<'a, Message>) -> Element<'a, Message> {
    row![text(label).size(scaled(13.0, fs)).width(Length::Fixed(140.0)), input]
        .spacing(12)
        .align_y(iced::Alignment::Center)
        .into()
}
