pub const MIN_TEXT_CHARS: usize = 10;
pub const NO_TEXT_MESSAGE: &str = "No text detected. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    /// Normalized text to surface for confirmation.
    Accepted(String),
    /// Nothing usable came back; the user is told.
    NoText,
    /// Silently dropped.
    TooShort(usize),
    /// Silently dropped, same as the last accepted text.
    Duplicate,
}

/// Collapse whitespace and newline runs into single spaces and trim.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Screen raw recognizer output before it reaches the user.
pub fn screen(raw: Option<&str>, last_accepted: Option<&str>) -> Screened {
    let text = normalize(raw.unwrap_or_default());
    if text.is_empty() {
        return Screened::NoText;
    }

    let len = text.chars().count();
    if len < MIN_TEXT_CHARS {
        return Screened::TooShort(len);
    }
    if last_accepted == Some(text.as_str()) {
        return Screened::Duplicate;
    }
    Screened::Accepted(text)
}
