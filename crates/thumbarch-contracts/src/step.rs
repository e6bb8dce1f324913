use std::fmt;

use serde::{Deserialize, Serialize};

/// Which studio view is active. The only source of truth for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStep {
    #[default]
    Upload,
    Analyzing,
    TemplateSelection,
    Editor,
}

impl AppStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "UPLOAD",
            Self::Analyzing => "ANALYZING",
            Self::TemplateSelection => "TEMPLATE_SELECTION",
            Self::Editor => "EDITOR",
        }
    }

    /// Allowed edges of the studio flow.
    ///
    /// Forward only, plus the editor's explicit "back" and the rollback an
    /// analysis failure performs.
    pub fn can_transition_to(self, next: AppStep) -> bool {
        matches!(
            (self, next),
            (Self::Upload, Self::Analyzing)
                | (Self::Analyzing, Self::TemplateSelection)
                | (Self::Analyzing, Self::Upload)
                | (Self::TemplateSelection, Self::Editor)
                | (Self::Editor, Self::TemplateSelection)
        )
    }
}

impl fmt::Display for AppStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::AppStep;

    #[test]
    fn default_step_is_upload() {
        assert_eq!(AppStep::default(), AppStep::Upload);
    }

    #[test]
    fn transitions_only_move_forward_except_back_and_rollback() {
        assert!(AppStep::Upload.can_transition_to(AppStep::Analyzing));
        assert!(AppStep::Analyzing.can_transition_to(AppStep::TemplateSelection));
        assert!(AppStep::Analyzing.can_transition_to(AppStep::Upload));
        assert!(AppStep::TemplateSelection.can_transition_to(AppStep::Editor));
        assert!(AppStep::Editor.can_transition_to(AppStep::TemplateSelection));

        assert!(!AppStep::Upload.can_transition_to(AppStep::Editor));
        assert!(!AppStep::Upload.can_transition_to(AppStep::TemplateSelection));
        assert!(!AppStep::TemplateSelection.can_transition_to(AppStep::Upload));
        assert!(!AppStep::Editor.can_transition_to(AppStep::Upload));
    }

    #[test]
    fn serializes_as_screaming_case() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_string(&AppStep::TemplateSelection)?,
            "\"TEMPLATE_SELECTION\""
        );
        assert_eq!(AppStep::Editor.to_string(), "EDITOR");
        Ok(())
    }
}
