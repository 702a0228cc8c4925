use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Recognition (OCR.Space) service settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub api_key: String,
    pub url: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://api.ocr.space/parse/image".into(),
        }
    }
}

/// Reasoning (chat-completions) service settings, used by the server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub api_key: String,
    pub url: String,
    pub model: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://api.kluster.ai/v1/chat/completions".into(),
            model: "klusterai/Meta-Llama-3.3-70B-Instruct-Turbo".into(),
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub reasoning: ReasoningConfig,
    pub bind_address: String,
    pub port: u16,
    /// Base URL of the core server the scanner dispatches to.
    pub server_url: String,
    /// Directory the camera tool drops frames into.
    pub frames_dir: PathBuf,
    pub capture_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            reasoning: ReasoningConfig::default(),
            bind_address: "0.0.0.0".into(),
            port: 5000,
            server_url: "http://localhost:5000".into(),
            frames_dir: PathBuf::from("frames"),
            capture_interval_secs: 5,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("ocr_url", &self.ocr.url)
            .field("ocr_api_key", &mask(&self.ocr.api_key))
            .field("reasoning_url", &self.reasoning.url)
            .field("reasoning_model", &self.reasoning.model)
            .field("reasoning_api_key", &mask(&self.reasoning.api_key))
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("server_url", &self.server_url)
            .field("frames_dir", &self.frames_dir)
            .field("capture_interval_secs", &self.capture_interval_secs)
            .finish()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Directory: ~/.config/snap-answer/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("snap-answer");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk (defaults if missing or invalid), then apply environment overrides.
    pub fn load() -> Self {
        let path = Self::path();
        let mut config = match fs::read_to_string(&path) {
            Ok(data) => Self::from_json(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a config file body, replacing out-of-range values with defaults.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(data)?;
        if config.capture_interval_secs == 0 {
            let fallback = Self::default().capture_interval_secs;
            log::warn!("Ignoring capture_interval_secs=0, using {fallback}s");
            config.capture_interval_secs = fallback;
        }
        Ok(config)
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OCR_API_KEY") {
            self.ocr.api_key = v;
        }
        if let Some(v) = get("OCR_API_URL") {
            self.ocr.url = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.reasoning.api_key = v;
        }
        if let Some(v) = get("OPENAI_API_URL") {
            self.reasoning.url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.reasoning.model = v;
        }
        if let Some(v) = get("BIND_ADDRESS") {
            self.bind_address = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT={v}"),
            }
        }
        if let Some(v) = get("SNAP_ANSWER_SERVER") {
            self.server_url = v;
        }
        if let Some(v) = get("SNAP_ANSWER_FRAMES") {
            self.frames_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SNAP_ANSWER_INTERVAL_SECS") {
            match v.parse::<u64>() {
                Ok(secs) if secs > 0 => self.capture_interval_secs = secs,
                _ => log::warn!("Ignoring invalid SNAP_ANSWER_INTERVAL_SECS={v}"),
            }
        }
    }
}
