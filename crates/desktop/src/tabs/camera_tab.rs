use iced::widget::{button, canvas, column, container, image, row, stack, text, text_input, Space};
use iced::{ContentFit, Element, Length, Theme};

use facewatch_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facewatch_core::recognition::domain::face_result::Mode;
use facewatch_core::session::controller::Snapshot;
use facewatch_core::session::enrollment::EnrollmentStage;
use facewatch_core::session::state::Phase;

use crate::app::{scaled, Message};
use crate::theme::{banner_style, muted_color, preview_style};
use crate::widgets::overlay_canvas::OverlayCanvas;

const PREVIEW_HEIGHT: f32 = 360.0;
const STILL_HEIGHT: f32 = 96.0;

pub struct CameraView<'a> {
    pub snapshot: &'a Snapshot,
    pub preview: Option<&'a image::Handle>,
    pub still: Option<&'a image::Handle>,
    pub renderer: OverlayRenderer,
    pub connection_error: Option<&'a str>,
}

pub fn view<'a>(fs: f32, camera: CameraView<'a>, theme: &Theme) -> Element<'a, Message> {
    let snapshot = camera.snapshot;
    let mut col = column![].spacing(12);

    if let Some(error) = camera.connection_error {
        col = col.push(banner(fs, error, true));
    }
    if let Some(message) = &snapshot.banner {
        col = col.push(banner(fs, message, true));
    } else if let Some(message) = &snapshot.notice {
        col = col.push(banner(fs, message, false));
    }

    col = col
        .push(toolbar(fs, snapshot, theme))
        .push(preview(fs, &camera, theme))
        .push(enrollment_panel(fs, &camera, theme));

    col.into()
}

fn banner<'a>(fs: f32, message: &str, is_error: bool) -> Element<'a, Message> {
    container(
        row![
            text(message.to_owned())
                .size(scaled(13.0, fs))
                .width(Length::Fill),
            button(text("Dismiss").size(scaled(12.0, fs)))
                .on_press(Message::DismissBanner)
                .padding([4, 10])
                .style(button::text),
        ]
        .spacing(8)
        .align_y(iced::Alignment::Center),
    )
    .padding([8, 12])
    .width(Length::Fill)
    .style(move |theme: &Theme| banner_style(theme, is_error))
    .into()
}

fn toolbar<'a>(fs: f32, snapshot: &Snapshot, theme: &Theme) -> Element<'a, Message> {
    let controls = snapshot.controls;

    let start = button(text("Start").size(scaled(14.0, fs)))
        .on_press_maybe(controls.can_start.then_some(Message::Start))
        .padding([8, 18]);
    let stop = button(text("Stop").size(scaled(14.0, fs)))
        .on_press_maybe(controls.can_stop.then_some(Message::Stop))
        .padding([8, 18])
        .style(button::secondary);

    let mode_buttons = Mode::ALL.iter().map(|&mode| {
        let btn = button(text(mode.to_string()).size(scaled(13.0, fs)))
            .on_press_maybe(controls.can_switch_mode.then_some(Message::ModeSelected(mode)))
            .padding([6, 14]);
        if mode == snapshot.mode {
            btn.style(button::primary).into()
        } else {
            btn.style(button::text).into()
        }
    });

    let status = match snapshot.phase {
        Phase::Stopped => "Camera off".to_string(),
        Phase::Starting => "Opening camera\u{2026}".to_string(),
        Phase::Running => format!(
            "{} face(s), {} request(s) pending",
            snapshot.scene.items.len(),
            snapshot.in_flight
        ),
    };

    row![
        start,
        stop,
        Space::new().width(12),
        row(mode_buttons.collect::<Vec<_>>()).spacing(2),
        Space::new().width(Length::Fill),
        text(status).size(scaled(12.0, fs)).color(muted_color(theme)),
    ]
    .spacing(8)
    .align_y(iced::Alignment::Center)
    .into()
}

fn preview<'a>(fs: f32, camera: &CameraView<'a>, theme: &Theme) -> Element<'a, Message> {
    let height = scaled(PREVIEW_HEIGHT, fs);
    let picture: Element<'a, Message> = match camera.preview {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .height(Length::Fill)
            .content_fit(ContentFit::Contain)
            .into(),
        None => container(
            text("Press Start to open the camera")
                .size(scaled(14.0, fs))
                .color(muted_color(theme)),
        )
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into(),
    };

    let overlay = canvas(OverlayCanvas::new(
        camera.snapshot.scene.clone(),
        camera.renderer,
    ))
    .width(Length::Fill)
    .height(Length::Fill);

    container(stack![picture, overlay])
        .width(Length::Fill)
        .height(height)
        .style(preview_style)
        .into()
}

fn enrollment_panel<'a>(fs: f32, camera: &CameraView<'a>, theme: &Theme) -> Element<'a, Message> {
    let snapshot: &'a Snapshot = camera.snapshot;
    let enrollment = &snapshot.enrollment;
    let controls = snapshot.controls;

    let capture_label = if enrollment.still.is_some() {
        "Retake Still"
    } else {
        "Capture Still"
    };
    let mut col = column![
        text("Enroll a face").size(scaled(16.0, fs)),
        text("Capture one frame, name the person in it, then submit.")
            .size(scaled(12.0, fs))
            .color(muted_color(theme)),
        button(text(capture_label).size(scaled(13.0, fs)))
            .on_press_maybe(controls.can_capture_still.then_some(Message::CaptureStill))
            .padding([6, 14])
            .style(button::secondary),
    ]
    .spacing(8);

    if let Some(still) = camera.still {
        let submitting = enrollment.stage == EnrollmentStage::Submitting;
        let name = text_input("Name", &enrollment.name)
            .size(scaled(13.0, fs))
            .padding(8);
        let name = if submitting {
            name
        } else {
            name.on_input(Message::EnrollNameChanged)
                .on_submit(Message::SubmitEnrollment)
        };

        let submit_label = if submitting {
            "Enrolling\u{2026}"
        } else {
            "Enroll"
        };
        let form = column![
            name,
            row![
                button(text(submit_label).size(scaled(13.0, fs)))
                    .on_press_maybe(controls.can_submit_enrollment.then_some(Message::SubmitEnrollment))
                    .padding([6, 14]),
                button(text("Cancel").size(scaled(13.0, fs)))
                    .on_press_maybe(controls.can_cancel_enrollment.then_some(Message::CancelEnrollment))
                    .padding([6, 14])
                    .style(button::text),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .width(Length::Fill);

        col = col.push(
            row![
                image(still.clone())
                    .height(scaled(STILL_HEIGHT, fs))
                    .content_fit(ContentFit::Contain),
                form,
            ]
            .spacing(12)
            .align_y(iced::Alignment::Center),
        );
    }

    container(col)
        .padding([14, 16])
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
}
