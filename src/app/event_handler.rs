use super::pipeline::{dispatch_answer, dispatch_recognition};
use super::recognition::{screen, Screened, NO_TEXT_MESSAGE};
use super::state::{AppState, AppStatus, BackendEvent};

/// Handle a backend event. This is the core state machine.
pub fn handle_backend_event(state: &mut AppState, event: BackendEvent) {
    match event {
        BackendEvent::CaptureTick => capture(state, "periodic"),
        BackendEvent::RescanRequested => {
            state.confirmation = None;
            capture(state, "manual");
        }
        BackendEvent::RecognitionComplete(text) => {
            release(state, AppStatus::Recognizing);
            on_text_recognized(state, text);
        }
        BackendEvent::FrameUnavailable => {
            release(state, AppStatus::Recognizing);
            log::debug!("Frame vanished before it could be read");
        }
        BackendEvent::RecognitionFailed(err) => {
            release(state, AppStatus::Recognizing);
            state.error = Some(err);
        }
        BackendEvent::AnswerReady(answer) => {
            release(state, AppStatus::Dispatching);
            log::info!("Answer: {answer}");
            state.error = None;
            state.answer = Some(answer);
        }
        BackendEvent::DispatchFailed(err) => {
            release(state, AppStatus::Dispatching);
            state.error = Some(err);
        }
        BackendEvent::Confirm => confirm(state),
        BackendEvent::Discard => {
            if state.confirmation.take().is_some() {
                log::info!("Detected text discarded");
            }
        }
        BackendEvent::DismissError => state.error = None,
        BackendEvent::DismissAnswer => state.answer = None,
        BackendEvent::Quit => {
            log::info!("Shutting down capture loop");
            state.shutdown();
        }
    }
    sync_scheduler(state);
}

/// Keep the periodic timer armed only while nothing awaits confirmation.
pub(super) fn sync_scheduler(state: &mut AppState) {
    if state.auto_capture && state.confirmation.is_none() {
        state.scheduler.start();
    } else {
        state.scheduler.stop();
    }
}

fn capture(state: &mut AppState, trigger: &str) {
    if state.is_processing() {
        log::debug!("Ignoring {trigger} capture while status={:?}", state.status);
        return;
    }
    if state.confirmation.is_some() {
        log::debug!("Ignoring {trigger} capture while confirmation is pending");
        return;
    }
    match state.frame_source.capture_frame() {
        Some(frame) => {
            log::info!("Capturing frame ({trigger})");
            dispatch_recognition(state, frame);
        }
        None => log::debug!("No frame available for {trigger} capture"),
    }
}

fn on_text_recognized(state: &mut AppState, text: Option<String>) {
    match screen(text.as_deref(), state.dedup_guard.as_deref()) {
        Screened::Accepted(text) => {
            log::info!("Detected question: {text}");
            state.dedup_guard = Some(text.clone());
            state.confirmation = Some(text);
        }
        Screened::NoText => state.error = Some(NO_TEXT_MESSAGE.to_string()),
        Screened::TooShort(len) => log::debug!("Dropping short text ({len} chars)"),
        Screened::Duplicate => log::debug!("Dropping duplicate text"),
    }
}

fn confirm(state: &mut AppState) {
    if state.is_processing() {
        log::info!("Ignoring confirm while status={:?}", state.status);
        return;
    }
    let Some(text) = state.confirmation.take() else {
        return;
    };
    log::info!("Sending question for answer");
    dispatch_answer(state, text);
}

/// Completions always release the gate. A mismatch is logged, never fatal.
fn release(state: &mut AppState, expected: AppStatus) {
    if state.status != expected {
        log::warn!(
            "{expected:?} completed while status={:?}; applying result",
            state.status
        );
    }
    state.status = AppStatus::Idle;
}
