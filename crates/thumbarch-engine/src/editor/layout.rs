//! Per-layout placement rules. One strategy per `LayoutType` variant.

use thumbarch_contracts::palette::{is_black, WHITE};
use thumbarch_contracts::{LayoutType, ThumbnailTemplate};

use super::scene::{Layer, Point, Rect, CANVAS_HEIGHT, CANVAS_WIDTH};

const TEXT_PADDING: f64 = 32.0;
const ARROW_COLOR: &str = "#ef4444";
const ARROW_SIZE: f64 = 128.0;
const ARROW_INSET: f64 = 40.0;
const ARROW_ROTATE_DEG: f64 = 12.0;

/// Where the headline column sits. Bottom-anchored text grows upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextAnchor {
    Top(f64),
    Bottom(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f64,
    pub anchor: TextAnchor,
    pub max_width: f64,
}

impl TextPlacement {
    /// Text frame inside a box, after the uniform padding.
    fn padded(box_x: f64, anchor: TextAnchor, box_width: f64) -> Self {
        let anchor = match anchor {
            TextAnchor::Top(top) => TextAnchor::Top(top + TEXT_PADDING),
            TextAnchor::Bottom(bottom) => TextAnchor::Bottom(bottom - TEXT_PADDING),
        };
        Self {
            x: box_x + TEXT_PADDING,
            anchor,
            max_width: box_width - 2.0 * TEXT_PADDING,
        }
    }

    pub fn top_for(&self, block_height: f64) -> f64 {
        match self.anchor {
            TextAnchor::Top(top) => top,
            TextAnchor::Bottom(bottom) => bottom - block_height,
        }
    }
}

pub trait LayoutStrategy: Sync {
    fn layout(&self) -> LayoutType;

    /// Subject width as a fraction of the canvas.
    fn subject_width_frac(&self) -> f64;

    /// Gap between the subject's right edge and the canvas edge, as a
    /// fraction of the canvas. Negative values bleed past the edge.
    fn subject_right_frac(&self) -> f64;

    fn text_placement(&self) -> TextPlacement;

    /// Whether a black-led palette forces white headline text.
    fn white_on_black(&self) -> bool {
        true
    }

    fn layout_decorations(&self) -> Vec<Layer> {
        Vec::new()
    }

    /// Bottom-anchored subject slot for an image of the given height/width
    /// ratio.
    fn subject_slot(&self, aspect: f64) -> Rect {
        let width = CANVAS_WIDTH * self.subject_width_frac();
        let right = CANVAS_WIDTH * self.subject_right_frac();
        let height = width * aspect;
        Rect::new(CANVAS_WIDTH - right - width, CANVAS_HEIGHT - height, width, height)
    }

    fn headline_color(&self, template: &ThumbnailTemplate) -> String {
        let black_led = template.primary_color().map(is_black).unwrap_or(false);
        if black_led && self.white_on_black() {
            return WHITE.to_string();
        }
        template
            .tertiary_color()
            .map(str::to_string)
            .unwrap_or_else(|| "white".to_string())
    }

    /// Layout-specific ornaments followed by the tag-driven arrow.
    fn decorations(&self, template: &ThumbnailTemplate) -> Vec<Layer> {
        let mut layers = self.layout_decorations();
        if template.has_graphic("arrow") {
            layers.push(Layer::Arrow {
                anchor: Point::new(ARROW_INSET, CANVAS_HEIGHT - ARROW_INSET),
                size: ARROW_SIZE,
                rotate_deg: ARROW_ROTATE_DEG,
                color: ARROW_COLOR.to_string(),
            });
        }
        layers
    }
}

pub struct SplitLayout;
pub struct FullFaceLayout;
pub struct MinimalLayout;
pub struct GridLayout;

impl LayoutStrategy for SplitLayout {
    fn layout(&self) -> LayoutType {
        LayoutType::Split
    }

    fn subject_width_frac(&self) -> f64 {
        0.55
    }

    fn subject_right_frac(&self) -> f64 {
        -0.05
    }

    fn text_placement(&self) -> TextPlacement {
        TextPlacement::padded(16.0, TextAnchor::Top(CANVAS_HEIGHT / 4.0), CANVAS_WIDTH / 2.0)
    }

    fn layout_decorations(&self) -> Vec<Layer> {
        vec![Layer::Divider {
            x: CANVAS_WIDTH / 2.0,
            width: 4.0,
            color: WHITE.to_string(),
            opacity: 0.2,
        }]
    }
}

impl LayoutStrategy for FullFaceLayout {
    fn layout(&self) -> LayoutType {
        LayoutType::FullFace
    }

    fn subject_width_frac(&self) -> f64 {
        1.0
    }

    fn subject_right_frac(&self) -> f64 {
        0.0
    }

    fn text_placement(&self) -> TextPlacement {
        // Shrink-to-fit box, so the column runs to the right canvas edge.
        TextPlacement::padded(
            32.0,
            TextAnchor::Bottom(CANVAS_HEIGHT - 32.0),
            CANVAS_WIDTH - 32.0,
        )
    }
}

fn inset_text_placement() -> TextPlacement {
    TextPlacement::padded(32.0, TextAnchor::Top(32.0), 512.0)
}

impl LayoutStrategy for MinimalLayout {
    fn layout(&self) -> LayoutType {
        LayoutType::Minimal
    }

    fn subject_width_frac(&self) -> f64 {
        0.55
    }

    fn subject_right_frac(&self) -> f64 {
        0.05
    }

    fn text_placement(&self) -> TextPlacement {
        inset_text_placement()
    }

    fn white_on_black(&self) -> bool {
        false
    }
}

impl LayoutStrategy for GridLayout {
    fn layout(&self) -> LayoutType {
        LayoutType::Grid
    }

    fn subject_width_frac(&self) -> f64 {
        0.55
    }

    fn subject_right_frac(&self) -> f64 {
        0.05
    }

    fn text_placement(&self) -> TextPlacement {
        inset_text_placement()
    }
}

/// `layout.strategy()` for the closed set of layouts.
pub trait LayoutStrategyExt {
    fn strategy(self) -> &'static dyn LayoutStrategy;
}

impl LayoutStrategyExt for LayoutType {
    fn strategy(self) -> &'static dyn LayoutStrategy {
        match self {
            LayoutType::Split => &SplitLayout,
            LayoutType::FullFace => &FullFaceLayout,
            LayoutType::Minimal => &MinimalLayout,
            LayoutType::Grid => &GridLayout,
        }
    }
}
