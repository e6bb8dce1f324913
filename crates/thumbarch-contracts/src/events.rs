use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Every record type the studio writes to its session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionStarted,
    ConfigWarning,
    ImageLoaded,
    StepChanged,
    AnalysisStarted,
    AnalysisCompleted,
    AnalysisFailed,
    TemplateSelected,
    BackgroundRequested,
    BackgroundReady,
    BackgroundFailed,
    BackgroundDiscarded,
    ExportRequested,
    SessionFinished,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::ConfigWarning => "config_warning",
            Self::ImageLoaded => "image_loaded",
            Self::StepChanged => "step_changed",
            Self::AnalysisStarted => "analysis_started",
            Self::AnalysisCompleted => "analysis_completed",
            Self::AnalysisFailed => "analysis_failed",
            Self::TemplateSelected => "template_selected",
            Self::BackgroundRequested => "background_requested",
            Self::BackgroundReady => "background_ready",
            Self::BackgroundFailed => "background_failed",
            Self::BackgroundDiscarded => "background_discarded",
            Self::ExportRequested => "export_requested",
            Self::SessionFinished => "session_finished",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session log writer (`events.jsonl`).
///
/// Each record carries `type`, `session_id` and `ts`, then the payload
/// keys, which win on collision. The file is opened in append mode on the
/// first record and held open afterwards. Clones share that handle, so
/// worker threads may log alongside the session that owns the writer.
#[derive(Debug, Clone)]
pub struct EventWriter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.into(),
                session_id: session_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn for_new_session(path: impl Into<PathBuf>) -> Self {
        Self::new(path, new_session_id())
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Appends one compact JSON line and returns the record written.
    pub fn emit(&self, kind: EventKind, payload: EventPayload) -> Result<Value> {
        let mut record = EventPayload::new();
        record.insert("type".to_string(), Value::from(kind.as_str()));
        record.insert(
            "session_id".to_string(),
            Value::from(self.shared.session_id.as_str()),
        );
        record.insert("ts".to_string(), Value::from(now_utc_iso()));
        record.extend(payload);

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut slot = self
            .shared
            .file
            .lock()
            .map_err(|_| anyhow!("session log lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(self.open_log()?);
        }
        if let Some(file) = slot.as_mut() {
            file.write_all(line.as_bytes())
                .with_context(|| format!("failed to append to {}", self.shared.path.display()))?;
        }
        Ok(Value::Object(record))
    }

    fn open_log(&self) -> Result<File> {
        let path = &self.shared.path;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open session log {}", path.display()))
    }
}

pub fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4().simple())
}

/// RFC 3339 UTC timestamp with microseconds, as used in every record.
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
