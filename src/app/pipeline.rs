use super::state::{AppState, AppStatus, BackendEvent};
use crate::frame_source::CaptureEvent;

const RECOGNITION_FAILED: &str = "Failed to process the image. Please try again.";
const DISPATCH_FAILED: &str = "Failed to process the question. Please try again.";

/// Load a frame and send it to the recognizer. Takes the in-flight gate; the
/// completion event is guaranteed even if the read or the call panics.
pub fn dispatch_recognition(state: &mut AppState, frame: CaptureEvent) {
    state.status = AppStatus::Recognizing;
    state.error = None;

    let recognizer = state.recognizer.clone();
    let sender = state.backend_sender.clone();

    tokio::spawn(async move {
        let result = tokio::spawn(async move {
            let captured_at = frame.captured_at;
            let image = match tokio::task::spawn_blocking(move || frame.into_data_url()).await {
                Ok(Ok(Some(image))) => image,
                Ok(Ok(None)) => return None,
                Ok(Err(e)) => {
                    log::warn!("Failed to read frame: {e}");
                    return None;
                }
                Err(e) => {
                    log::error!("Frame read panicked: {e}");
                    return None;
                }
            };
            log::debug!("Recognizing frame captured {:?} ago", captured_at.elapsed());
            Some(recognizer.recognize(&image).await)
        })
        .await;

        let event = match result {
            Ok(None) => BackendEvent::FrameUnavailable,
            Ok(Some(Ok(text))) => BackendEvent::RecognitionComplete(text),
            Ok(Some(Err(e))) => {
                log::error!("Recognition failed: {e:?}");
                BackendEvent::RecognitionFailed(e.to_string())
            }
            Err(e) => {
                log::error!("Recognition task panicked: {e}");
                BackendEvent::RecognitionFailed(RECOGNITION_FAILED.to_string())
            }
        };
        let _ = sender.send(event).await;
    });
}

/// Send confirmed text to the answer service. Takes the in-flight gate.
pub fn dispatch_answer(state: &mut AppState, text: String) {
    state.status = AppStatus::Dispatching;

    let answerer = state.answerer.clone();
    let sender = state.backend_sender.clone();

    tokio::spawn(async move {
        let result = tokio::spawn(async move { answerer.ask(&text).await }).await;

        let event = match result {
            Ok(Ok(answer)) => BackendEvent::AnswerReady(answer),
            Ok(Err(e)) => {
                log::error!("Error processing question: {e:?}");
                BackendEvent::DispatchFailed(e.to_string())
            }
            Err(e) => {
                log::error!("Dispatch task panicked: {e}");
                BackendEvent::DispatchFailed(DISPATCH_FAILED.to_string())
            }
        };
        let _ = sender.send(event).await;
    });
}
