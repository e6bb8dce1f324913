//! Thumbnail editor: per-mount editing state over one selected template and
//! the composition of the layered 16:9 preview.

pub mod headline;
pub mod layout;
pub mod scene;

use thumbarch_contracts::palette::{sanitize_color, BLACK, DEFAULT_ACCENT};
use thumbarch_contracts::ThumbnailTemplate;

use crate::upload::UploadedImage;
use headline::{headline_block, layout_headline, split_headline};
use layout::LayoutStrategyExt;
use scene::{Layer, Point, Scene, SubjectLayer, CANVAS_HEIGHT, CANVAS_WIDTH};

pub const MIN_SUBJECT_SCALE: f64 = 0.5;
pub const MAX_SUBJECT_SCALE: f64 = 2.0;
const SCALE_STEP: f64 = 0.1;

const BACKGROUND_OPACITY: f64 = 0.9;
const TINT_OPACITY: f64 = 0.3;
const PLACEHOLDER_FROM: &str = "#0f172a";
const GENERATING_LABEL: &str = "Generating Background...";
const BADGE_TEXT: &str = "New!";
const BADGE_INSET: f64 = 24.0;

const EXPORT_UNAVAILABLE: &str = "HD export is not available yet. A production build would \
     rasterize this preview to a 1280x720 PNG; use the SVG preview for now.";

/// Subject offset and zoom, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

/// What the background layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundView<'a> {
    Generating,
    Ready(&'a str),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    template: ThumbnailTemplate,
    headline: String,
    highlight_word: String,
    transform: Transform,
    background_removed: bool,
    display_scale: f64,
    drag_start: Option<Point>,
}

impl EditorSession {
    pub fn new(template: ThumbnailTemplate) -> Self {
        Self {
            headline: template.headline.clone(),
            highlight_word: template.highlight_word.clone(),
            template,
            transform: Transform::default(),
            background_removed: true,
            display_scale: 1.0,
            drag_start: None,
        }
    }

    pub fn template(&self) -> &ThumbnailTemplate {
        &self.template
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn highlight_word(&self) -> &str {
        &self.highlight_word
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn background_removed(&self) -> bool {
        self.background_removed
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    pub fn set_headline(&mut self, text: impl Into<String>) {
        self.headline = text.into();
    }

    pub fn set_highlight_word(&mut self, word: impl Into<String>) {
        self.highlight_word = word.into();
    }

    /// Fits the canvas into a container, never upscaling past 1.
    pub fn set_container_width(&mut self, width: f64) -> f64 {
        let scale = if width.is_finite() {
            (width / CANVAS_WIDTH).min(1.0).max(0.0)
        } else {
            1.0
        };
        self.display_scale = scale;
        scale
    }

    /// Clamped to [0.5, 2.0] and snapped to 0.1 steps.
    pub fn set_scale(&mut self, value: f64) -> f64 {
        let base = if value.is_finite() {
            value
        } else {
            self.transform.scale
        };
        let snapped = ((base / SCALE_STEP).round() * SCALE_STEP)
            .clamp(MIN_SUBJECT_SCALE, MAX_SUBJECT_SCALE);
        // Round away float noise from the step multiplication.
        self.transform.scale = (snapped * 10.0).round() / 10.0;
        self.transform.scale
    }

    /// Starts a gesture at pointer `point`. Only one gesture at a time.
    pub fn begin_drag(&mut self, point: Point) -> bool {
        if self.drag_start.is_some() {
            return false;
        }
        self.drag_start = Some(Point::new(
            point.x - self.transform.x,
            point.y - self.transform.y,
        ));
        true
    }

    pub fn drag_to(&mut self, point: Point) -> bool {
        let Some(start) = self.drag_start else {
            return false;
        };
        self.transform.x = point.x - start.x;
        self.transform.y = point.y - start.y;
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_start = None;
    }

    pub fn toggle_background_removal(&mut self) -> bool {
        self.background_removed = !self.background_removed;
        self.background_removed
    }

    pub fn export_hd(&self) -> ExportOutcome {
        ExportOutcome::Unavailable(EXPORT_UNAVAILABLE.to_string())
    }

    /// Builds the display list. Reads the template, never writes it.
    pub fn compose(&self, subject: Option<&UploadedImage>, background: BackgroundView<'_>) -> Scene {
        let template = &self.template;
        let strategy = template.layout_type.strategy();
        let mut layers = Vec::new();

        match background {
            BackgroundView::Ready(href) => layers.push(Layer::BackgroundImage {
                href: href.to_string(),
                opacity: BACKGROUND_OPACITY,
            }),
            BackgroundView::Generating | BackgroundView::Missing => {
                layers.push(Layer::BackgroundPlaceholder {
                    from: PLACEHOLDER_FROM.to_string(),
                    to: BLACK.to_string(),
                    label: matches!(background, BackgroundView::Generating)
                        .then(|| GENERATING_LABEL.to_string()),
                    label_color: DEFAULT_ACCENT.to_string(),
                })
            }
        }

        layers.push(Layer::Tint {
            color: sanitize_color(template.primary_color().unwrap_or(BLACK), BLACK),
            opacity: TINT_OPACITY,
        });

        if let Some(image) = subject {
            layers.push(Layer::Subject(SubjectLayer {
                href: image.data_url(),
                frame: strategy.subject_slot(image.aspect()),
                translate: Point::new(self.transform.x, self.transform.y),
                scale: self.transform.scale,
                background_removed: self.background_removed,
            }));
        }

        layers.extend(strategy.decorations(template));

        let placement = strategy.text_placement();
        let lines = layout_headline(
            split_headline(&self.headline, &self.highlight_word),
            &strategy.headline_color(template),
            template.accent_color(),
            placement.max_width,
        );
        let mut block = headline_block(lines, placement.x, 0.0, placement.max_width);
        block.top = placement.top_for(block.height());
        layers.push(Layer::Headline(block));

        layers.push(Layer::Badge {
            text: BADGE_TEXT.to_string(),
            anchor: Point::new(CANVAS_WIDTH - BADGE_INSET, BADGE_INSET),
            font_size: 20.0,
            rotate_deg: -3.0,
            fill: "#dc2626".to_string(),
            text_color: "#FFFFFF".to_string(),
        });

        Scene {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            display_scale: self.display_scale,
            layers,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use thumbarch_contracts::{LayoutType, ThumbnailTemplate};

    pub fn template(layout: LayoutType) -> ThumbnailTemplate {
        ThumbnailTemplate {
            id: format!("tpl-{}", layout.as_str()),
            name: format!("{} blueprint", layout.as_str()),
            headline: "How I Learned X".to_string(),
            highlight_word: "Learned".to_string(),
            layout_description: String::new(),
            color_palette: vec![
                "#000000".to_string(),
                "#22d3ee".to_string(),
                "#FFFFFF".to_string(),
            ],
            psychology: "Curiosity gap.".to_string(),
            graphic_elements: vec!["Arrow".to_string()],
            best_use_case: String::new(),
            layout_type: layout,
            suggested_background: "dark studio".to_string(),
        }
    }
}
