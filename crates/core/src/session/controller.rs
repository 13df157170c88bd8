use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::capture::domain::frame_source::{CaptureError, CaptureRequest, FrameSource};
use crate::overlay::domain::overlay_scene::OverlayScene;
use crate::recognition::domain::face_result::Mode;
use crate::recognition::domain::face_service::{EnrollmentRequest, FaceService};
use crate::recognition::infrastructure::jpeg_encoder::encode_jpeg;
use crate::session::enrollment::EnrollmentView;
use crate::session::polling::PollingTask;
use crate::session::session_logger::{CallOutcome, NullSessionLogger, SessionLogger};
use crate::session::state::{Controls, ControllerState, Effect, Event, Phase, Ticket};
use crate::shared::config::ClientConfig;
use crate::shared::frame::Frame;

/// Snapshots kept for a slow reader before the oldest are dropped.
const SNAPSHOT_BACKLOG: usize = 32;

/// What a front end renders. Published after every handled event.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub phase: Phase,
    pub mode: Mode,
    pub controls: Controls,
    pub scene: OverlayScene,
    pub banner: Option<String>,
    pub notice: Option<String>,
    pub enrollment: EnrollmentView,
    pub frame: Option<Arc<Frame>>,
    pub in_flight: usize,
}

impl Snapshot {
    fn capture(state: &ControllerState, frame: Option<Arc<Frame>>) -> Self {
        Self {
            phase: state.phase(),
            mode: state.mode(),
            controls: state.controls(),
            scene: state.overlay_scene(),
            banner: state.banner().map(str::to_string),
            notice: state.notice().map(str::to_string),
            enrollment: state.enrollment().view(),
            frame,
            in_flight: state.in_flight(),
        }
    }
}

/// Front-end side of a controller: posts events, reads snapshots.
///
/// Snapshots are consumed by whoever reads them first, so only one clone
/// should read.
#[derive(Clone)]
pub struct ControllerHandle {
    events: Sender<Event>,
    snapshots: Receiver<Snapshot>,
}

impl ControllerHandle {
    /// Returns `false` once the controller has exited.
    pub fn send(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    /// Drains pending snapshots and returns the newest, if any.
    pub fn latest(&self) -> Option<Snapshot> {
        self.snapshots.try_iter().last()
    }

    pub fn snapshots(&self) -> &Receiver<Snapshot> {
        &self.snapshots
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
    }
}

/// Owns the capture session and executes what [`ControllerState`] decides.
///
/// All state changes happen on the thread that calls [`Controller::process`]
/// (or [`Controller::run`]); the ticker and remote calls only post events
/// back to it.
pub struct Controller {
    state: ControllerState,
    source: Box<dyn FrameSource>,
    service: Arc<dyn FaceService>,
    logger: Box<dyn SessionLogger>,
    request: CaptureRequest,
    interval: Duration,
    jpeg_quality: u8,
    polling: Option<PollingTask>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    snapshots_tx: Sender<Snapshot>,
    snapshots_rx: Receiver<Snapshot>,
    latest_frame: Option<Arc<Frame>>,
    issued_at: HashMap<u64, Instant>,
}

impl Controller {
    pub fn new(
        config: &ClientConfig,
        source: Box<dyn FrameSource>,
        service: Arc<dyn FaceService>,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (snapshots_tx, snapshots_rx) = crossbeam_channel::bounded(SNAPSHOT_BACKLOG);
        Self {
            state: ControllerState::new(config.max_in_flight),
            source,
            service,
            logger: Box::new(NullSessionLogger),
            request: CaptureRequest::from(&config.capture),
            interval: config.poll_interval(),
            jpeg_quality: config.jpeg_quality,
            polling: None,
            events_tx,
            events_rx,
            snapshots_tx,
            snapshots_rx,
            latest_frame: None,
            issued_at: HashMap::new(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn SessionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn connect(&self) -> ControllerHandle {
        ControllerHandle {
            events: self.events_tx.clone(),
            snapshots: self.snapshots_rx.clone(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.latest_frame.clone())
    }

    /// Handles `event` and any events its effects produce synchronously,
    /// publishing a snapshot after each one.
    pub fn process(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            self.observe(&event);
            for effect in self.state.handle(event) {
                self.execute(effect, &mut queue);
            }
            self.publish();
        }
    }

    /// Processes posted events for up to `window`. Returns how many were
    /// handled.
    pub fn pump(&mut self, window: Duration) -> usize {
        let deadline = Instant::now() + window;
        let mut handled = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.process(event);
                    handled += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        handled
    }

    /// Event loop. Returns after [`Event::Shutdown`], with the device
    /// released and polling cancelled.
    pub fn run(mut self) {
        self.publish();
        while let Ok(event) = self.events_rx.recv() {
            let last = matches!(event, Event::Shutdown);
            self.process(event);
            if last {
                break;
            }
        }
        self.stop_polling();
        self.source.close();
        self.logger.summary();
    }

    pub fn spawn(self) -> (ControllerHandle, JoinHandle<()>) {
        let handle = self.connect();
        let thread = thread::spawn(move || self.run());
        (handle, thread)
    }

    fn observe(&mut self, event: &Event) {
        let Event::CallCompleted {
            ticket, outcome, ..
        } = event
        else {
            return;
        };
        let Some(started) = self.issued_at.remove(&ticket.sequence) else {
            return;
        };
        let verdict = match outcome {
            Err(_) => CallOutcome::Failed,
            Ok(_) if self.state.accepts(ticket) => CallOutcome::Applied,
            Ok(_) => CallOutcome::Discarded,
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.logger.call(ticket.mode.endpoint(), elapsed_ms, verdict);
        if verdict == CallOutcome::Discarded {
            log::debug!("Discarded stale result #{}", ticket.sequence);
        }
    }

    fn execute(&mut self, effect: Effect, follow_ups: &mut VecDeque<Event>) {
        match effect {
            Effect::OpenCamera { generation } => match self.source.open(&self.request) {
                Ok(info) => {
                    self.logger.info(&format!(
                        "Camera {} opened at {}x{}",
                        info.device, info.width, info.height
                    ));
                    follow_ups.push_back(Event::CameraOpened { generation, info });
                }
                Err(e) => follow_ups.push_back(Event::CameraFailed {
                    generation,
                    reason: e.to_string(),
                }),
            },
            Effect::ReleaseCamera => {
                self.source.close();
                self.latest_frame = None;
                log::info!("Camera released");
            }
            Effect::StartPolling { generation } => {
                self.stop_polling();
                self.polling = Some(PollingTask::start(
                    generation,
                    self.interval,
                    self.events_tx.clone(),
                ));
            }
            Effect::CancelPolling => self.stop_polling(),
            Effect::Dispatch(ticket) => {
                self.logger.tick(true);
                self.dispatch(ticket);
            }
            Effect::RefreshPreview => {
                self.logger.tick(false);
                if let Err(e) = self.grab() {
                    log::debug!("Preview grab failed: {e}");
                }
            }
            Effect::CaptureStill => {
                let result = self.grab().map_err(|e| e.to_string());
                follow_ups.push_back(Event::StillCaptured(result));
            }
            Effect::SubmitEnrollment { name, still } => self.submit_enrollment(name, still),
            Effect::ReportFailure(message) => log::warn!("{message}"),
        }
    }

    fn grab(&mut self) -> Result<Arc<Frame>, CaptureError> {
        let frame = Arc::new(self.source.grab()?);
        self.latest_frame = Some(Arc::clone(&frame));
        Ok(frame)
    }

    /// Grabs a frame here, then encodes and calls the service on a worker
    /// thread that posts `CallCompleted` back.
    fn dispatch(&mut self, ticket: Ticket) {
        self.issued_at.insert(ticket.sequence, Instant::now());
        let frame = match self.grab() {
            Ok(frame) => frame,
            Err(e) => {
                let _ = self.events_tx.send(Event::CallCompleted {
                    ticket,
                    frame_size: (0, 0),
                    outcome: Err(e.to_string()),
                });
                return;
            }
        };

        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();
        let quality = self.jpeg_quality;
        thread::spawn(move || {
            let outcome = encode_jpeg(&frame, quality)
                .map_err(|e| e.to_string())
                .and_then(|image| {
                    service
                        .query(ticket.mode, &image)
                        .map_err(|e| e.to_string())
                });
            let _ = events.send(Event::CallCompleted {
                ticket,
                frame_size: frame.size(),
                outcome,
            });
        });
    }

    fn submit_enrollment(&mut self, name: String, still: Arc<Frame>) {
        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();
        let quality = self.jpeg_quality;
        log::info!("Enrolling '{name}'");
        thread::spawn(move || {
            let result = encode_jpeg(&still, quality)
                .map_err(|e| e.to_string())
                .and_then(|image| {
                    service
                        .enroll(&EnrollmentRequest { name, image })
                        .map_err(|e| e.to_string())
                });
            let _ = events.send(Event::EnrollmentCompleted(result));
        });
    }

    fn stop_polling(&mut self) {
        if let Some(mut task) = self.polling.take() {
            task.cancel();
        }
    }

    /// Publishes without blocking; a full backlog loses its oldest entry.
    fn publish(&self) {
        let mut snapshot = self.snapshot();
        loop {
            match self.snapshots_tx.try_send(snapshot) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.snapshots_rx.try_recv();
                    snapshot = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::CaptureInfo;
    use crate::overlay::domain::overlay_renderer::OverlayRenderer;
    use crate::overlay::infrastructure::recording_surface::RecordingSurface;
    use crate::recognition::domain::encoded_image::EncodedImage;
    use crate::recognition::domain::face_result::RecognizedFace;
    use crate::recognition::domain::face_service::ServiceError;
    use crate::session::enrollment::EnrollmentStage;
    use crate::shared::face_box::FaceBox;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeCamera {
        deny: Option<String>,
        open: Arc<AtomicBool>,
        grabs: u64,
    }

    impl FakeCamera {
        fn granted() -> (Self, Arc<AtomicBool>) {
            let open = Arc::new(AtomicBool::new(false));
            (
                Self {
                    deny: None,
                    open: Arc::clone(&open),
                    grabs: 0,
                },
                open,
            )
        }

        fn denied(reason: &str) -> Self {
            Self {
                deny: Some(reason.to_string()),
                open: Arc::new(AtomicBool::new(false)),
                grabs: 0,
            }
        }
    }

    impl FrameSource for FakeCamera {
        fn open(&mut self, _request: &CaptureRequest) -> Result<CaptureInfo, CaptureError> {
            if let Some(reason) = &self.deny {
                return Err(CaptureError::Open(reason.clone()));
            }
            self.open.store(true, Ordering::SeqCst);
            Ok(CaptureInfo {
                device: "fake".into(),
                width: 8,
                height: 6,
            })
        }

        fn grab(&mut self) -> Result<Frame, CaptureError> {
            if !self.is_open() {
                return Err(CaptureError::NotOpen);
            }
            self.grabs += 1;
            Ok(Frame::new(vec![128; 8 * 6 * 3], 8, 6, self.grabs))
        }

        fn close(&mut self) {
            self.open.store(false, Ordering::SeqCst);
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeService {
        queries: AtomicUsize,
        enrolled: Mutex<Vec<String>>,
        enroll_error: Option<String>,
    }

    impl FaceService for FakeService {
        fn detect(&self, _image: &EncodedImage) -> Result<Vec<FaceBox>, ServiceError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![FaceBox::new(10, 10, 50, 50)])
        }

        fn recognize(&self, _image: &EncodedImage) -> Result<Vec<RecognizedFace>, ServiceError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RecognizedFace {
                face: FaceBox::from_edges(10, 60, 60, 10),
                name: "Alice".into(),
            }])
        }

        fn enroll(&self, request: &EnrollmentRequest) -> Result<(), ServiceError> {
            self.enrolled.lock().unwrap().push(request.name.clone());
            match &self.enroll_error {
                Some(message) => Err(ServiceError::Rejected(message.clone())),
                None => Ok(()),
            }
        }
    }

    fn config(poll_interval_ms: u64) -> ClientConfig {
        ClientConfig {
            poll_interval_ms,
            ..ClientConfig::default()
        }
    }

    /// Polling interval long enough that only manual ticks happen.
    const MANUAL: u64 = 60_000;

    fn pump_until(controller: &mut Controller, cond: impl Fn(&Controller) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond(controller) {
                return true;
            }
            controller.pump(Duration::from_millis(10));
        }
        cond(controller)
    }

    fn tick(controller: &mut Controller) {
        let generation = controller.state().generation();
        controller.process(Event::Tick { generation });
    }

    #[test]
    fn test_granted_device_enables_controls_exactly_once() {
        let (camera, open) = FakeCamera::granted();
        let mut controller = Controller::new(
            &config(MANUAL),
            Box::new(camera),
            Arc::new(FakeService::default()),
        );
        let handle = controller.connect();
        controller.process(Event::Start);

        let enabled: Vec<bool> = handle
            .snapshots()
            .try_iter()
            .map(|s| s.controls.can_stop)
            .collect();
        let flips = enabled.windows(2).filter(|w| !w[0] && w[1]).count();
        assert_eq!(flips, 1);
        assert_eq!(enabled.last(), Some(&true));
        assert!(open.load(Ordering::SeqCst));
    }

    #[test]
    fn test_denied_device_shows_banner() {
        let mut controller = Controller::new(
            &config(MANUAL),
            Box::new(FakeCamera::denied("Permission denied")),
            Arc::new(FakeService::default()),
        );
        controller.process(Event::Start);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, Phase::Stopped);
        assert_eq!(
            snapshot.banner.as_deref(),
            Some("Error accessing camera: Permission denied")
        );
        assert!(!snapshot.controls.can_stop);
        assert!(!snapshot.controls.can_capture_still);
    }

    #[test]
    fn test_detect_result_draws_one_box() {
        let (camera, _) = FakeCamera::granted();
        let mut controller = Controller::new(
            &config(MANUAL),
            Box::new(camera),
            Arc::new(FakeService::default()),
        );
        controller.process(Event::Start);
        tick(&mut controller);
        assert!(pump_until(&mut controller, |c| c.state().last_result().is_some()));

        let snapshot = controller.snapshot();
        assert!(snapshot.frame.is_some());
        let mut surface = RecordingSurface::new();
        OverlayRenderer::default().render(&snapshot.scene, &mut surface);
        assert_eq!(surface.rectangles(), vec![FaceBox::new(10, 10, 50, 50)]);
        assert!(surface.labels().is_empty());
    }

    #[test]
    fn test_recognize_result_draws_label() {
        let (camera, _) = FakeCamera::granted();
        let mut controller = Controller::new(
            &config(MANUAL),
            Box::new(camera),
            Arc::new(FakeService::default()),
        );
        controller.process(Event::Start);
        controller.process(Event::ToggleMode);
        tick(&mut controller);
        assert!(pump_until(&mut controller, |c| c.state().last_result().is_some()));

        let mut surface = RecordingSurface::new();
        OverlayRenderer::default().render(&controller.snapshot().scene, &mut surface);
        let labels = surface.labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].0, "Alice");
        assert!(labels[0].2 <= 10.0);
    }

    #[test]
    fn test_no_calls_after_stop() {
        let (camera, open) = FakeCamera::granted();
        let service = Arc::new(FakeService::default());
        let mut controller = Controller::new(&config(5), Box::new(camera), service.clone());
        controller.process(Event::Start);
        let queried = |_: &Controller| service.queries.load(Ordering::SeqCst) >= 2;
        assert!(pump_until(&mut controller, queried));

        controller.process(Event::Stop);
        assert!(!open.load(Ordering::SeqCst));
        // Let workers spawned before the stop finish.
        controller.pump(Duration::from_millis(50));
        let calls = service.queries.load(Ordering::SeqCst);

        controller.pump(Duration::from_millis(100));
        assert_eq!(service.queries.load(Ordering::SeqCst), calls);
        assert!(controller.snapshot().scene.is_blank());
    }

    #[test]
    fn test_toggle_clears_overlay_before_next_result() {
        let (camera, _) = FakeCamera::granted();
        let mut controller = Controller::new(
            &config(MANUAL),
            Box::new(camera),
            Arc::new(FakeService::default()),
        );
        let handle = controller.connect();
        controller.process(Event::Start);
        tick(&mut controller);
        assert!(pump_until(&mut controller, |c| c.state().last_result().is_some()));
        let _ = handle.latest();

        controller.process(Event::ToggleMode);
        let after_toggle = handle.latest().unwrap();
        assert!(after_toggle.scene.is_blank());
        assert_eq!(after_toggle.mode, Mode::Recognize);
    }

    #[test]
    fn test_empty_enrollment_name_sends_nothing() {
        let (camera, _) = FakeCamera::granted();
        let service = Arc::new(FakeService::default());
        let mut controller = Controller::new(&config(MANUAL), Box::new(camera), service.clone());
        controller.process(Event::Start);
        controller.process(Event::CaptureStill);
        assert_eq!(
            controller.snapshot().enrollment.stage,
            EnrollmentStage::Confirming
        );

        controller.process(Event::EnrollNameChanged("  ".into()));
        controller.process(Event::SubmitEnrollment);
        controller.pump(Duration::from_millis(50));

        assert!(service.enrolled.lock().unwrap().is_empty());
        assert_eq!(
            controller.snapshot().banner.as_deref(),
            Some("Please enter a name")
        );
    }

    #[test]
    fn test_enrollment_round_trip() {
        let (camera, _) = FakeCamera::granted();
        let service = Arc::new(FakeService::default());
        let mut controller = Controller::new(&config(MANUAL), Box::new(camera), service.clone());
        controller.process(Event::Start);
        controller.process(Event::CaptureStill);
        controller.process(Event::EnrollNameChanged("Bob".into()));
        controller.process(Event::SubmitEnrollment);
        assert!(pump_until(&mut controller, |c| c.state().notice().is_some()));

        assert_eq!(*service.enrolled.lock().unwrap(), vec!["Bob".to_string()]);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.notice.as_deref(), Some("Enrolled Bob"));
        assert!(snapshot.enrollment.still.is_none());
    }

    #[test]
    fn test_enrollment_rejection_shows_server_text() {
        let (camera, _) = FakeCamera::granted();
        let service = Arc::new(FakeService {
            enroll_error: Some("No face detected".into()),
            ..FakeService::default()
        });
        let mut controller = Controller::new(&config(MANUAL), Box::new(camera), service);
        controller.process(Event::Start);
        controller.process(Event::CaptureStill);
        controller.process(Event::EnrollNameChanged("Bob".into()));
        controller.process(Event::SubmitEnrollment);
        assert!(pump_until(&mut controller, |c| c.state().banner().is_some()));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.banner.as_deref(), Some("No face detected"));
        assert_eq!(snapshot.enrollment.stage, EnrollmentStage::Confirming);
    }

    #[test]
    fn test_spawned_controller_shuts_down_cleanly() {
        let (camera, open) = FakeCamera::granted();
        let controller = Controller::new(
            &config(20),
            Box::new(camera),
            Arc::new(FakeService::default()),
        );
        let (handle, thread) = controller.spawn();
        assert!(handle.send(Event::Start));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut running = false;
        while Instant::now() < deadline && !running {
            if let Ok(snapshot) = handle.snapshots().recv_timeout(Duration::from_millis(50)) {
                running = snapshot.phase == Phase::Running;
            }
        }
        assert!(running);

        handle.shutdown();
        thread.join().unwrap();
        assert!(!open.load(Ordering::SeqCst));
        assert!(!handle.send(Event::Start));
    }
}
