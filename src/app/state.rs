use std::sync::Arc;
use std::time::Duration;

use super::scheduler::CaptureScheduler;
use crate::answer_client::AnswerClient;
use crate::frame_source::FrameSource;
use crate::ocr::TextRecognizer;

/// Events delivered to the coordinator's event loop: timer ticks, pipeline
/// completions and user actions.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CaptureTick,
    RescanRequested,
    /// The captured frame could not be read (removed or emptied meanwhile).
    FrameUnavailable,
    RecognitionComplete(Option<String>),
    RecognitionFailed(String),
    AnswerReady(String),
    DispatchFailed(String),
    Confirm,
    Discard,
    DismissError,
    DismissAnswer,
    Quit,
}

/// The single in-flight gate shared by both pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Idle,
    Recognizing,
    Dispatching,
}

/// What the presentation layer should show. Exactly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPhase {
    Scanning,
    Recognizing,
    Answering,
    Error(String),
    Confirm(String),
    Answer(String),
}

/// Central coordinator state. Owned by the event loop; never shared.
pub struct AppState {
    pub status: AppStatus,
    /// Recognized text waiting for the user to confirm or discard.
    pub confirmation: Option<String>,
    pub answer: Option<String>,
    pub error: Option<String>,
    /// Last accepted text; survives every capture cycle.
    pub(super) dedup_guard: Option<String>,

    pub frame_source: Box<dyn FrameSource>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub answerer: Arc<dyn AnswerClient>,
    pub backend_sender: async_channel::Sender<BackendEvent>,
    pub scheduler: CaptureScheduler,
    /// Periodic capture lifecycle, on between `start` and `shutdown`.
    pub(super) auto_capture: bool,
}

impl AppState {
    pub fn new(
        sender: async_channel::Sender<BackendEvent>,
        frame_source: Box<dyn FrameSource>,
        recognizer: Arc<dyn TextRecognizer>,
        answerer: Arc<dyn AnswerClient>,
        capture_interval: Duration,
    ) -> Self {
        let scheduler = CaptureScheduler::new(capture_interval, sender.clone());
        Self {
            status: AppStatus::Idle,
            confirmation: None,
            answer: None,
            error: None,
            dedup_guard: None,
            frame_source,
            recognizer,
            answerer,
            backend_sender: sender,
            scheduler,
            auto_capture: false,
        }
    }

    /// Arm periodic capture. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        self.auto_capture = true;
        super::event_handler::sync_scheduler(self);
    }

    /// Cancel periodic capture. In-flight calls still complete. Safe to repeat.
    pub fn shutdown(&mut self) {
        self.auto_capture = false;
        if self.scheduler.is_running() {
            log::info!("Stopping capture timer");
        }
        self.scheduler.stop();
    }

    pub fn is_active(&self) -> bool {
        self.auto_capture
    }

    #[cfg(test)]
    pub fn dedup_guard(&self) -> Option<&str> {
        self.dedup_guard.as_deref()
    }

    pub fn is_processing(&self) -> bool {
        self.status != AppStatus::Idle
    }

    /// Project the state onto a single overlay. Busy beats error, error beats
    /// confirmation, confirmation beats an old answer.
    pub fn overlay(&self) -> OverlayPhase {
        match self.status {
            AppStatus::Recognizing => return OverlayPhase::Recognizing,
            AppStatus::Dispatching => return OverlayPhase::Answering,
            AppStatus::Idle => {}
        }
        if let Some(ref error) = self.error {
            return OverlayPhase::Error(error.clone());
        }
        if let Some(ref text) = self.confirmation {
            return OverlayPhase::Confirm(text.clone());
        }
        if let Some(ref answer) = self.answer {
            return OverlayPhase::Answer(answer.clone());
        }
        OverlayPhase::Scanning
    }
}
