//! Shared data contracts for the ThumbArchitect studio: blueprint
//! templates, the studio step machine's states, the session event log, the
//! studio command grammar, and the gateway model registry.

pub mod chat;
pub mod events;
pub mod models;
pub mod palette;
pub mod session;
pub mod step;
pub mod template;

pub use step::AppStep;
pub use template::{AnalysisResult, LayoutType, ThumbnailTemplate};
