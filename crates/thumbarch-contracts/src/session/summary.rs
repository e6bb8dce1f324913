use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;
use crate::step::AppStep;

/// What a studio session ended with; written as `session.json` on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub final_step: AppStep,
    pub topic: String,
    pub templates_offered: u64,
    pub selected_template: Option<String>,
    pub background_source: Option<String>,
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{write_summary, SessionSummary};
    use crate::step::AppStep;

    #[test]
    fn write_summary_generates_expected_payload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("out").join("session.json");

        let summary = SessionSummary {
            session_id: "session-123".to_string(),
            started_at: "2026-02-19T00:00:00+00:00".to_string(),
            finished_at: "2026-02-19T00:10:00+00:00".to_string(),
            final_step: AppStep::Editor,
            topic: "How I learned to code in 30 days".to_string(),
            templates_offered: 4,
            selected_template: Some("tpl-split".to_string()),
            background_source: Some("generated".to_string()),
        };
        let mut extra = Map::new();
        extra.insert("extra_key".to_string(), Value::String("extra".to_string()));
        write_summary(&path, &summary, Some(&extra))?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["final_step"], json!("EDITOR"));
        assert_eq!(parsed["templates_offered"], json!(4));
        assert_eq!(parsed["selected_template"], json!("tpl-split"));
        assert_eq!(parsed["extra_key"], json!("extra"));
        assert!(parsed.get("ts").and_then(Value::as_str).is_some());
        Ok(())
    }

    #[test]
    fn missing_selection_serializes_as_null() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("session.json");
        let summary = SessionSummary {
            session_id: "session-1".to_string(),
            started_at: "a".to_string(),
            finished_at: "b".to_string(),
            final_step: AppStep::Upload,
            topic: String::new(),
            templates_offered: 0,
            selected_template: None,
            background_source: None,
        };
        write_summary(&path, &summary, None)?;
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(parsed["selected_template"], Value::Null);
        assert_eq!(parsed["final_step"], json!("UPLOAD"));
        Ok(())
    }
}
