//! ThumbArchitect studio engine: gateway plumbing, photo intake, the studio
//! step machine, the thumbnail editor and its SVG preview.

pub mod card;
pub mod config;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod render;
pub mod shell;
pub mod upload;

pub use card::{CardView, TemplateCard};
pub use config::GatewayConfig;
pub use editor::{BackgroundView, EditorSession, ExportOutcome};
pub use error::StudioError;
pub use gateway::{AiGateway, GeneratedImage, InlineImage, RoutedGateway};
pub use render::render_svg;
pub use shell::{BackgroundState, SelectionView, Studio};
pub use upload::UploadedImage;
