use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facewatch_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use facewatch_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facewatch_core::recognition::domain::face_result::Mode;
use facewatch_core::recognition::infrastructure::http_face_service::HttpFaceService;
use facewatch_core::session::controller::{Controller, ControllerHandle, Snapshot};
use facewatch_core::session::state::Event;
use facewatch_core::shared::config::ClientConfig;
use facewatch_core::shared::frame::Frame;

use crate::settings::{Appearance, Settings, SettingsDraft};
use crate::tabs;
use crate::tabs::camera_tab::CameraView;
use crate::theme;

/// Roughly 30 redraws per second while frames are arriving.
const POLL_INTERVAL: Duration = Duration::from_millis(33);

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Camera,
    Settings,
    About,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Camera, Tab::Settings, Tab::About];

    fn label(self) -> &'static str {
        match self {
            Tab::Camera => "Camera",
            Tab::Settings => "Settings",
            Tab::About => "About",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    Start,
    Stop,
    ModeSelected(Mode),
    CaptureStill,
    EnrollNameChanged(String),
    SubmitEnrollment,
    CancelEnrollment,
    DismissBanner,
    Poll,
    ServerUrlChanged(String),
    PollIntervalChanged(String),
    DeviceChanged(String),
    ApplySettings,
    RestoreDefaults,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A running controller thread and the handle used to drive it.
struct Session {
    handle: ControllerHandle,
    thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Builds the HTTP client and camera on a plain thread, away from the
    /// iced executor, then starts the controller loop.
    fn launch(config: ClientConfig) -> Result<Self, String> {
        let launched = thread::spawn(move || {
            let service = HttpFaceService::new(&config).map_err(|e| e.to_string())?;
            let camera = FfmpegCamera::new(config.capture.backend.clone());
            log::info!("Connecting to face service at {}", service.server_url());
            let controller = Controller::new(&config, Box::new(camera), Arc::new(service));
            Ok::<_, String>(controller.spawn())
        })
        .join()
        .map_err(|_| "controller setup panicked".to_string())??;

        let (handle, thread) = launched;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    fn close(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Controller thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    draft: SettingsDraft,
    base_config: ClientConfig,
    session: Option<Session>,
    session_error: Option<String>,
    snapshot: Snapshot,
    preview: Option<image::Handle>,
    preview_index: Option<u64>,
    still: Option<image::Handle>,
    still_frame: Option<Arc<Frame>>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let base_config = ClientConfig::resolve(None).unwrap_or_else(|e| {
            log::warn!("Ignoring client config: {e}");
            ClientConfig::default()
        });

        let mut app = Self {
            active_tab: Tab::Camera,
            draft: SettingsDraft::from_settings(&settings, &base_config),
            settings,
            base_config,
            session: None,
            session_error: None,
            snapshot: Snapshot::default(),
            preview: None,
            preview_index: None,
            still: None,
            still_frame: None,
        };
        app.reconnect();
        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::Start => self.post(Event::Start),
            Message::Stop => self.post(Event::Stop),
            Message::ModeSelected(mode) => self.post(Event::SetMode(mode)),
            Message::CaptureStill => self.post(Event::CaptureStill),
            Message::EnrollNameChanged(name) => {
                // Echo locally so typing does not wait for the next snapshot.
                self.snapshot.enrollment.name = name.clone();
                self.post(Event::EnrollNameChanged(name));
            }
            Message::SubmitEnrollment => {
                if self.snapshot.controls.can_submit_enrollment {
                    self.post(Event::SubmitEnrollment);
                }
            }
            Message::CancelEnrollment => self.post(Event::CancelEnrollment),
            Message::DismissBanner => {
                self.session_error = None;
                self.post(Event::DismissBanner);
            }
            Message::Poll => self.refresh(),
            Message::ServerUrlChanged(url) => {
                self.draft.server_url = url;
            }
            Message::PollIntervalChanged(interval) => {
                self.draft.poll_interval_ms = interval;
            }
            Message::DeviceChanged(device) => {
                self.draft.device = device;
            }
            Message::ApplySettings => {
                match self.draft.apply(&self.settings, &self.base_config) {
                    Ok(next) => {
                        self.settings = next;
                        self.settings.save();
                        self.draft = SettingsDraft::from_settings(&self.settings, &self.base_config);
                        self.reconnect();
                    }
                    Err(e) => self.draft.error = Some(e),
                }
            }
            Message::RestoreDefaults => {
                self.draft = SettingsDraft::from_settings(
                    &self.settings.without_overrides(),
                    &self.base_config,
                );
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {
                // theme() resolves on every render; a redraw is enough.
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;
        let theme = self.theme();

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let content: Element<'_, Message> = match self.active_tab {
            Tab::Camera => tabs::camera_tab::view(
                fs,
                CameraView {
                    snapshot: &self.snapshot,
                    preview: self.preview.as_ref(),
                    still: self.still.as_ref(),
                    renderer: OverlayRenderer::default(),
                    connection_error: self.session_error.as_deref(),
                },
                &theme,
            ),
            Tab::Settings => tabs::settings_tab::view(&self.settings, &self.draft, &theme),
            Tab::About => {
                let config = self.settings.client_config(&self.base_config);
                tabs::about_tab::view(fs, &config.server_url)
            }
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        column![tab_bar, tab_content]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let poll = iced::time::every(POLL_INTERVAL).map(|_| Message::Poll);
        if self.settings.appearance == Appearance::System {
            Subscription::batch([
                poll,
                iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme),
            ])
        } else {
            poll
        }
    }

    fn post(&mut self, event: Event) {
        let delivered = self
            .session
            .as_ref()
            .is_some_and(|session| session.handle.send(event));
        if !delivered && self.session_error.is_none() {
            self.session_error = Some("The capture controller is not running".to_string());
        }
    }

    /// Tears down the current session (releasing the camera) and starts a
    /// fresh one from the current settings.
    fn reconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.snapshot = Snapshot::default();
        self.preview = None;
        self.preview_index = None;
        self.still = None;
        self.still_frame = None;

        let config = self.settings.client_config(&self.base_config);
        match Session::launch(config) {
            Ok(session) => {
                self.session = Some(session);
                self.session_error = None;
            }
            Err(e) => {
                log::error!("Could not start capture session: {e}");
                self.session_error = Some(format!("Could not connect: {e}"));
            }
        }
    }

    fn refresh(&mut self) {
        let Some(snapshot) = self.session.as_ref().and_then(|s| s.handle.latest()) else {
            return;
        };

        match &snapshot.frame {
            Some(frame) if self.preview_index != Some(frame.index()) => {
                self.preview = Some(to_handle(frame));
                self.preview_index = Some(frame.index());
            }
            Some(_) => {}
            None => {
                self.preview = None;
                self.preview_index = None;
            }
        }

        let still = snapshot.enrollment.still.clone();
        let unchanged = match (&still, &self.still_frame) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            self.still = still.as_deref().map(to_handle);
            self.still_frame = still;
        }

        self.snapshot = snapshot;
    }
}

fn to_handle(frame: &Frame) -> image::Handle {
    image::Handle::from_rgba(frame.width(), frame.height(), frame.to_rgba())
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
