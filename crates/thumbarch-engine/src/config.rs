use std::collections::HashMap;
use std::env;
use std::path::Path;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_PLACEHOLDER_BACKGROUND: &str = "https://picsum.photos/1280/720?grayscale&blur=2";

const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Everything the gateway integration reads from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub analysis_model: String,
    pub image_model: String,
    pub temperature: f64,
    pub request_timeout_s: f64,
    pub transport_retries: usize,
    pub retry_backoff_s: f64,
    pub placeholder_background: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: 0.7,
            request_timeout_s: 90.0,
            transport_retries: 0,
            retry_backoff_s: 1.2,
            placeholder_background: DEFAULT_PLACEHOLDER_BACKGROUND.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Process environment first, then `dotenv` values for keys it lacks.
    pub fn from_env_with_dotenv(dotenv: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: API_KEY_VARS.iter().find_map(|key| non_empty(*key)),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            analysis_model: non_empty("THUMBARCH_ANALYSIS_MODEL")
                .unwrap_or(defaults.analysis_model),
            image_model: non_empty("THUMBARCH_IMAGE_MODEL").unwrap_or(defaults.image_model),
            temperature: defaults.temperature,
            request_timeout_s: parse_clamped(
                non_empty("THUMBARCH_REQUEST_TIMEOUT"),
                defaults.request_timeout_s,
                5.0,
                300.0,
            ),
            transport_retries: parse_clamped(
                non_empty("THUMBARCH_TRANSPORT_RETRIES"),
                defaults.transport_retries as f64,
                0.0,
                4.0,
            )
            .round() as usize,
            retry_backoff_s: parse_clamped(
                non_empty("THUMBARCH_RETRY_BACKOFF"),
                defaults.retry_backoff_s,
                0.1,
                10.0,
            ),
            placeholder_background: non_empty("THUMBARCH_PLACEHOLDER_BACKGROUND")
                .unwrap_or(defaults.placeholder_background),
        }
    }

    /// Startup problems worth a warning. None of them are fatal: a missing
    /// key only fails once a request is actually made.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.api_key.is_none() {
            warnings.push(format!(
                "No gateway credential found (set one of {}); Gemini requests will fail.",
                API_KEY_VARS.join(", ")
            ));
        }
        if !self.api_base.starts_with("https://") && !self.api_base.starts_with("http://") {
            warnings.push(format!(
                "GEMINI_API_BASE '{}' is not an http(s) URL.",
                self.api_base
            ));
        }
        warnings
    }
}

fn parse_clamped(raw: Option<String>, default: f64, min: f64, max: f64) -> f64 {
    raw.and_then(|text| text.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Reads `KEY=VALUE` lines. Handles `export` prefixes, `#` comments and
/// matching single or double quotes. A missing file yields an empty map.
pub fn load_dotenv(path: &Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    parse_dotenv(&content)
}

pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content.lines().filter_map(dotenv_entry).collect()
}

fn dotenv_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| {
            value
                .strip_prefix(quote)
                .and_then(|inner| inner.strip_suffix(quote))
        })
        .unwrap_or(value)
}
