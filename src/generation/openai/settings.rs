//! Endpoint settings for the OpenAI-compatible client.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Where and how to reach the chat-completions endpoint
#[derive(Clone, PartialEq)]
pub struct LlmSettings {
    /// Base URL without the trailing `/chat/completions`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// HTTP client timeout, independent of the per-call search timeout
    pub timeout: Duration,
    pub temperature: f64,
}

impl LlmSettings {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: 0.7,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `LLM_API_BASE_URL`, `LLM_API_KEY`, `LLM_MODEL_NAME` and `LLM_TIMEOUT_SECONDS`
    ///
    /// Only the model name is required.
    pub fn from_env() -> Result<Self> {
        let model = env_nonempty("LLM_MODEL_NAME")
            .ok_or_else(|| Error::ConfigError("LLM_MODEL_NAME is not set".to_string()))?;
        let base_url = env_nonempty("LLM_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut settings = Self::new(base_url, model);
        settings.api_key = env_nonempty("LLM_API_KEY");
        if let Some(raw) = env_nonempty("LLM_TIMEOUT_SECONDS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| Error::ConfigError(format!("LLM_TIMEOUT_SECONDS is not an integer: {raw}")))?;
            settings.timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

// The API key never reaches logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a `.env` file into key/value pairs, skipping keys already set
pub fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Ok(text) = std::fs::read_to_string(path) else {
        return out;
    };
    for raw in text.lines() {
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("export ") {
            line = rest.trim_start();
        }
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        let mut v = v.trim().to_string();
        if v.len() >= 2 {
            let bytes = v.as_bytes();
            let first = bytes[0];
            let last = bytes[bytes.len() - 1];
            if first == last && (first == b'"' || first == b'\'') {
                v = v[1..v.len() - 1].to_string();
            }
        }
        if env_nonempty(k).is_none() {
            out.insert(k.to_string(), v);
        }
    }
    out
}

/// Load `<dir>/.env` into the process environment without overriding anything
pub fn load_dotenv_if_present(dir: &Path) {
    for (k, v) in parse_dotenv(&dir.join(".env")) {
        if env_nonempty(&k).is_none() {
            std::env::set_var(k, v);
        }
    }
}
