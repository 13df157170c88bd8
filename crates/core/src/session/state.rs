//! The controller's state and its transition function.
//!
//! Nothing here performs I/O: [`ControllerState::handle`] consumes an
//! [`Event`] and returns the [`Effect`]s the shell must carry out.

use std::sync::Arc;

use crate::capture::domain::frame_source::CaptureInfo;
use crate::overlay::domain::overlay_scene::OverlayScene;
use crate::recognition::domain::face_result::{FaceResult, Mode};
use crate::session::enrollment::{Enrollment, EnrollmentError, EnrollmentStage};
use crate::shared::frame::Frame;

pub const CAMERA_ERROR_PREFIX: &str = "Error accessing camera";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Stopped,
    Starting,
    Running,
}

/// Identifies one remote call: the session and mode it was issued for and
/// its position in issue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub mode: Mode,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Start,
    CameraOpened {
        generation: u64,
        info: CaptureInfo,
    },
    CameraFailed {
        generation: u64,
        reason: String,
    },
    Stop,
    Tick {
        generation: u64,
    },
    SetMode(Mode),
    ToggleMode,
    CallCompleted {
        ticket: Ticket,
        frame_size: (u32, u32),
        outcome: Result<FaceResult, String>,
    },
    CaptureStill,
    StillCaptured(Result<Arc<Frame>, String>),
    EnrollNameChanged(String),
    SubmitEnrollment,
    EnrollmentCompleted(Result<(), String>),
    CancelEnrollment,
    DismissBanner,
    /// Stops the session and ends the controller loop.
    Shutdown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    OpenCamera { generation: u64 },
    ReleaseCamera,
    StartPolling { generation: u64 },
    CancelPolling,
    /// Grab a frame and send it to the endpoint for `ticket.mode`.
    Dispatch(Ticket),
    /// Grab a frame for the preview only; the in-flight cap was reached.
    RefreshPreview,
    CaptureStill,
    SubmitEnrollment { name: String, still: Arc<Frame> },
    /// Log a non-fatal failure.
    ReportFailure(String),
}

/// Which controls a front end should enable. Derived, never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub can_start: bool,
    pub can_stop: bool,
    pub can_switch_mode: bool,
    pub can_capture_still: bool,
    pub can_submit_enrollment: bool,
    pub can_cancel_enrollment: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ControllerState {
    phase: Phase,
    mode: Mode,
    generation: u64,
    next_sequence: u64,
    applied_sequence: Option<u64>,
    in_flight: usize,
    max_in_flight: Option<usize>,
    frame_size: (u32, u32),
    last_result: Option<FaceResult>,
    enrollment: Enrollment,
    banner: Option<String>,
    notice: Option<String>,
}

impl ControllerState {
    /// `max_in_flight` of `None` lets calls overlap without limit.
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            max_in_flight: max_in_flight.map(|n| n.max(1)),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn last_result(&self) -> Option<&FaceResult> {
        self.last_result.as_ref()
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn controls(&self) -> Controls {
        let running = self.is_running();
        Controls {
            can_start: self.phase == Phase::Stopped,
            can_stop: running,
            can_switch_mode: running,
            can_capture_still: running && self.enrollment.can_capture(),
            can_submit_enrollment: self.enrollment.stage() == EnrollmentStage::Confirming,
            can_cancel_enrollment: self.enrollment.stage() != EnrollmentStage::Submitting,
        }
    }

    pub fn overlay_scene(&self) -> OverlayScene {
        OverlayScene::from_result(self.last_result.as_ref(), self.frame_size)
    }

    /// Whether a completed call for `ticket` would replace the overlay.
    pub fn accepts(&self, ticket: &Ticket) -> bool {
        self.is_running()
            && ticket.generation == self.generation
            && ticket.mode == self.mode
            && self.applied_sequence.map_or(true, |s| ticket.sequence > s)
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Start => self.start(),
            Event::CameraOpened { generation, info } => self.camera_opened(generation, info),
            Event::CameraFailed { generation, reason } => self.camera_failed(generation, reason),
            Event::Stop | Event::Shutdown => self.stop(),
            Event::Tick { generation } => self.tick(generation),
            Event::SetMode(mode) => {
                self.set_mode(mode);
                vec![]
            }
            Event::ToggleMode => {
                self.set_mode(self.mode.toggled());
                vec![]
            }
            Event::CallCompleted {
                ticket,
                frame_size,
                outcome,
            } => self.call_completed(ticket, frame_size, outcome),
            Event::CaptureStill => self.capture_still(),
            Event::StillCaptured(result) => self.still_captured(result),
            Event::EnrollNameChanged(name) => {
                self.enrollment.set_name(name);
                vec![]
            }
            Event::SubmitEnrollment => self.submit_enrollment(),
            Event::EnrollmentCompleted(result) => self.enrollment_completed(result),
            Event::CancelEnrollment => {
                self.enrollment.cancel();
                vec![]
            }
            Event::DismissBanner => {
                self.banner = None;
                self.notice = None;
                vec![]
            }
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Stopped {
            return vec![];
        }
        self.phase = Phase::Starting;
        self.generation += 1;
        self.banner = None;
        vec![Effect::OpenCamera {
            generation: self.generation,
        }]
    }

    fn camera_opened(&mut self, generation: u64, info: CaptureInfo) -> Vec<Effect> {
        if self.phase != Phase::Starting || generation != self.generation {
            // The device came up for a session that no longer exists.
            return if self.phase == Phase::Stopped {
                vec![Effect::ReleaseCamera]
            } else {
                vec![]
            };
        }
        self.phase = Phase::Running;
        self.frame_size = (info.width, info.height);
        self.in_flight = 0;
        self.applied_sequence = None;
        vec![Effect::StartPolling { generation }]
    }

    fn camera_failed(&mut self, generation: u64, reason: String) -> Vec<Effect> {
        if self.phase != Phase::Starting || generation != self.generation {
            return vec![];
        }
        self.phase = Phase::Stopped;
        let message = format!("{CAMERA_ERROR_PREFIX}: {reason}");
        self.banner = Some(message.clone());
        vec![Effect::ReportFailure(message)]
    }

    fn stop(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Stopped {
            return vec![];
        }
        self.phase = Phase::Stopped;
        self.generation += 1;
        self.in_flight = 0;
        self.last_result = None;
        vec![Effect::CancelPolling, Effect::ReleaseCamera]
    }

    fn tick(&mut self, generation: u64) -> Vec<Effect> {
        if !self.is_running() || generation != self.generation {
            return vec![];
        }
        if self.max_in_flight.is_some_and(|cap| self.in_flight >= cap) {
            return vec![Effect::RefreshPreview];
        }
        self.next_sequence += 1;
        self.in_flight += 1;
        vec![Effect::Dispatch(Ticket {
            generation,
            mode: self.mode,
            sequence: self.next_sequence,
        })]
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.last_result = None;
    }

    fn call_completed(
        &mut self,
        ticket: Ticket,
        frame_size: (u32, u32),
        outcome: Result<FaceResult, String>,
    ) -> Vec<Effect> {
        if ticket.generation != self.generation {
            return vec![];
        }
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            Ok(result) => {
                if self.accepts(&ticket) && result.mode() == ticket.mode {
                    self.applied_sequence = Some(ticket.sequence);
                    self.frame_size = frame_size;
                    self.last_result = Some(result);
                }
                vec![]
            }
            Err(message) => vec![Effect::ReportFailure(format!(
                "{} failed: {message}",
                ticket.mode.endpoint()
            ))],
        }
    }

    fn capture_still(&mut self) -> Vec<Effect> {
        if !self.is_running() || self.enrollment.begin_capture().is_err() {
            return vec![];
        }
        self.notice = None;
        vec![Effect::CaptureStill]
    }

    fn still_captured(&mut self, result: Result<Arc<Frame>, String>) -> Vec<Effect> {
        match result {
            Ok(frame) => {
                self.enrollment.hold(frame);
                vec![]
            }
            Err(reason) => {
                self.enrollment.capture_failed();
                let message = format!("Could not capture still: {reason}");
                self.banner = Some(message.clone());
                vec![Effect::ReportFailure(message)]
            }
        }
    }

    fn submit_enrollment(&mut self) -> Vec<Effect> {
        match self.enrollment.begin_submit() {
            Ok((name, still)) => {
                self.banner = None;
                vec![Effect::SubmitEnrollment { name, still }]
            }
            Err(err @ EnrollmentError::EmptyName) | Err(err @ EnrollmentError::NoStill) => {
                self.banner = Some(err.to_string());
                vec![]
            }
            Err(EnrollmentError::Busy) => vec![],
        }
    }

    fn enrollment_completed(&mut self, result: Result<(), String>) -> Vec<Effect> {
        match result {
            Ok(()) => {
                let name = self.enrollment.name().trim().to_string();
                self.enrollment.succeeded();
                self.notice = Some(format!("Enrolled {name}"));
                vec![]
            }
            Err(message) => {
                self.enrollment.failed();
                self.banner = Some(message.clone());
                vec![Effect::ReportFailure(format!("enrollment failed: {message}"))]
            }
        }
    }
}
