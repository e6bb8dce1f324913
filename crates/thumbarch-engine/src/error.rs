use thumbarch_contracts::AppStep;

/// Failure kinds callers branch on. Everything else travels as plain
/// `anyhow::Error` context.
#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    #[error("upload error: {0}")]
    Upload(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("background generation failed: {0}")]
    Background(String),

    #[error("cannot {action} while in {from}")]
    InvalidTransition { from: AppStep, action: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudioError {
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    pub fn background(msg: impl Into<String>) -> Self {
        Self::Background(msg.into())
    }

    pub fn invalid_transition(from: AppStep, action: &'static str) -> Self {
        Self::InvalidTransition { from, action }
    }
}
