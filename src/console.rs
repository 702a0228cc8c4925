use std::io::BufRead;

use chrono::Local;

use crate::app::{BackendEvent, OverlayPhase};

pub const HELP: &str =
    "Commands: [c]onfirm  [d]iscard  [r]escan  [x] dismiss error  [a] dismiss answer  [q]uit";

/// Map one line of user input to an event.
pub fn parse_command(line: &str) -> Option<BackendEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "confirm" | "send" => Some(BackendEvent::Confirm),
        "d" | "discard" => Some(BackendEvent::Discard),
        "r" | "rescan" => Some(BackendEvent::RescanRequested),
        "x" | "dismiss" => Some(BackendEvent::DismissError),
        "a" => Some(BackendEvent::DismissAnswer),
        "q" | "quit" | "exit" => Some(BackendEvent::Quit),
        _ => None,
    }
}

/// Read commands from stdin on a dedicated thread. EOF quits.
pub fn spawn_command_reader(sender: async_channel::Sender<BackendEvent>) {
    let spawned = std::thread::Builder::new()
        .name("command-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(event) => {
                        if sender.send_blocking(event).is_err() {
                            return;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("{HELP}"),
                }
            }
            let _ = sender.send_blocking(BackendEvent::Quit);
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn command reader: {e}");
    }
}

pub fn format_overlay(phase: &OverlayPhase) -> String {
    match phase {
        OverlayPhase::Scanning => "Scanning\u{2026} point the camera at a question".into(),
        OverlayPhase::Recognizing => "Processing\u{2026}".into(),
        OverlayPhase::Answering => "Processing\u{2026} asking for an answer".into(),
        OverlayPhase::Error(message) => format!("Error: {message}  [x to dismiss]"),
        OverlayPhase::Confirm(text) => {
            format!("Detected Question:\n  {text}\n[c] Send for Answer  [d] Discard")
        }
        OverlayPhase::Answer(answer) => {
            let body = answer
                .lines()
                .map(|line| format!("  {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Answer:\n{body}\n[a to dismiss]")
        }
    }
}

/// Prints an overlay only when it differs from the last one printed.
#[derive(Default)]
pub struct Renderer {
    last: Option<OverlayPhase>,
}

impl Renderer {
    /// Returns true when something was printed.
    pub fn render(&mut self, phase: &OverlayPhase) -> bool {
        if self.last.as_ref() == Some(phase) {
            return false;
        }
        println!("[{}] {}", Local::now().format("%H:%M:%S"), format_overlay(phase));
        self.last = Some(phase.clone());
        true
    }
}
