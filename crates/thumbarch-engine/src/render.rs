//! SVG serialization of an editor `Scene`.

use std::fmt::Write as _;

use thumbarch_contracts::palette::{sanitize_color, BLACK, DEFAULT_ACCENT, WHITE};

use crate::editor::headline::estimated_width;
use crate::editor::scene::{HeadlineBlock, Layer, Scene, SubjectLayer};

const FONT_STACK: &str = "Inter, 'Helvetica Neue', Arial, sans-serif";
const MONO_STACK: &str = "'JetBrains Mono', Menlo, monospace";
const ARROW_PATH: &str = "M12 2L15 14H22L12 22L2 14H9L12 2Z";
const ARROW_VIEWBOX: f64 = 24.0;
/// Baseline offset of a line inside its line box, in ems.
const BASELINE_EM: f64 = 0.78;

pub fn render_svg(scene: &Scene) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        num(scene.width * scene.display_scale),
        num(scene.height * scene.display_scale),
        num(scene.width),
        num(scene.height),
    );
    out.push_str(&defs(scene));
    let _ = writeln!(
        out,
        r#"  <rect width="{}" height="{}" fill="{BLACK}"/>"#,
        num(scene.width),
        num(scene.height)
    );
    for layer in &scene.layers {
        render_layer(&mut out, scene, layer);
    }
    out.push_str("</svg>\n");
    out
}

fn defs(scene: &Scene) -> String {
    let mut out = String::from("  <defs>\n");
    for layer in &scene.layers {
        match layer {
            Layer::BackgroundPlaceholder { from, to, .. } => {
                let _ = writeln!(
                    out,
                    r#"    <linearGradient id="bg-placeholder" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
                    sanitize_color(from, BLACK),
                    sanitize_color(to, BLACK),
                );
            }
            Layer::Subject(subject) if subject.background_removed => {
                out.push_str(
                    r##"    <linearGradient id="subject-fade-gradient" x1="0" y1="0" x2="0" y2="1"><stop offset="0.8" stop-color="#FFFFFF" stop-opacity="1"/><stop offset="1" stop-color="#FFFFFF" stop-opacity="0"/></linearGradient>
    <mask id="subject-fade" maskContentUnits="objectBoundingBox"><rect width="1" height="1" fill="url(#subject-fade-gradient)"/></mask>
    <filter id="subject-pop" color-interpolation-filters="sRGB"><feComponentTransfer><feFuncR type="linear" slope="1.1" intercept="-0.05"/><feFuncG type="linear" slope="1.1" intercept="-0.05"/><feFuncB type="linear" slope="1.1" intercept="-0.05"/></feComponentTransfer><feComponentTransfer><feFuncR type="linear" slope="1.1"/><feFuncG type="linear" slope="1.1"/><feFuncB type="linear" slope="1.1"/></feComponentTransfer></filter>
"##,
                );
            }
            _ => {}
        }
    }
    out.push_str("  </defs>\n");
    out
}

fn render_layer(out: &mut String, scene: &Scene, layer: &Layer) {
    match layer {
        Layer::BackgroundImage { href, opacity } => {
            let _ = writeln!(
                out,
                r#"  <image href="{}" x="0" y="0" width="{}" height="{}" preserveAspectRatio="xMidYMid slice" opacity="{}"/>"#,
                escape_xml(href),
                num(scene.width),
                num(scene.height),
                num(*opacity),
            );
        }
        Layer::BackgroundPlaceholder {
            label, label_color, ..
        } => {
            let _ = writeln!(
                out,
                r##"  <rect width="{}" height="{}" fill="url(#bg-placeholder)"/>"##,
                num(scene.width),
                num(scene.height)
            );
            if let Some(label) = label {
                let _ = writeln!(
                    out,
                    r#"  <text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" font-family="{}" font-size="16" fill="{}">{}</text>"#,
                    num(scene.width / 2.0),
                    num(scene.height / 2.0),
                    escape_xml(MONO_STACK),
                    sanitize_color(label_color, DEFAULT_ACCENT),
                    escape_xml(label),
                );
            }
        }
        Layer::Tint { color, opacity } => {
            let _ = writeln!(
                out,
                r#"  <rect width="{}" height="{}" fill="{}" opacity="{}" style="mix-blend-mode:overlay"/>"#,
                num(scene.width),
                num(scene.height),
                sanitize_color(color, BLACK),
                num(*opacity),
            );
        }
        Layer::Subject(subject) => render_subject(out, subject),
        Layer::Divider {
            x,
            width,
            color,
            opacity,
        } => {
            let _ = writeln!(
                out,
                r#"  <rect x="{}" y="0" width="{}" height="{}" fill="{}" opacity="{}"/>"#,
                num(x - width / 2.0),
                num(*width),
                num(scene.height),
                sanitize_color(color, WHITE),
                num(*opacity),
            );
        }
        Layer::Arrow {
            anchor,
            size,
            rotate_deg,
            color,
        } => {
            let half = size / 2.0;
            let _ = writeln!(
                out,
                r#"  <g transform="translate({} {}) rotate({} {} {}) scale({})"><path d="{ARROW_PATH}" fill="{}"/></g>"#,
                num(anchor.x),
                num(anchor.y - size),
                num(*rotate_deg),
                num(half),
                num(half),
                num(size / ARROW_VIEWBOX),
                sanitize_color(color, "#ef4444"),
            );
        }
        Layer::Headline(block) => render_headline(out, block),
        Layer::Badge {
            text,
            anchor,
            font_size,
            rotate_deg,
            fill,
            text_color,
        } => {
            let label = text.to_uppercase();
            let width = estimated_width(&label, *font_size) + 24.0;
            let height = font_size * 1.4 + 8.0;
            let _ = writeln!(
                out,
                r#"  <g transform="translate({} {}) rotate({} {} {})"><rect x="{}" y="0" width="{}" height="{}" fill="{}"/><text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" font-family="{}" font-size="{}" font-weight="900" fill="{}">{}</text></g>"#,
                num(anchor.x),
                num(anchor.y),
                num(*rotate_deg),
                num(-width / 2.0),
                num(height / 2.0),
                num(-width),
                num(width),
                num(height),
                sanitize_color(fill, "#dc2626"),
                num(-width / 2.0),
                num(height / 2.0),
                escape_xml(FONT_STACK),
                num(*font_size),
                sanitize_color(text_color, WHITE),
                escape_xml(&label),
            );
        }
    }
}

fn render_subject(out: &mut String, subject: &SubjectLayer) {
    let center = subject.frame.center();
    let effects = if subject.background_removed {
        r##" mask="url(#subject-fade)" filter="url(#subject-pop)""##
    } else {
        ""
    };
    let _ = writeln!(
        out,
        r#"  <g transform="translate({} {}) translate({} {}) scale({}) translate({} {})"><image href="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid meet"{effects}/></g>"#,
        num(subject.translate.x),
        num(subject.translate.y),
        num(center.x),
        num(center.y),
        num(subject.scale),
        num(-center.x),
        num(-center.y),
        escape_xml(&subject.href),
        num(subject.frame.x),
        num(subject.frame.y),
        num(subject.frame.width),
        num(subject.frame.height),
    );
}

fn render_headline(out: &mut String, block: &HeadlineBlock) {
    let style = if block.italic { "italic" } else { "normal" };
    let shadow = format!("rgba(0,0,0,{})", num(block.shadow_opacity));
    for (idx, line) in block.lines.iter().enumerate() {
        let baseline = block.top + block.line_advance() * idx as f64 + block.font_size * BASELINE_EM;
        let text: String = line.iter().map(|span| span.text.as_str()).collect();
        let _ = writeln!(
            out,
            r#"  <text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" font-style="{style}" fill="{shadow}" xml:space="preserve">{}</text>"#,
            num(block.x + block.shadow_offset.x),
            num(baseline + block.shadow_offset.y),
            escape_xml(FONT_STACK),
            num(block.font_size),
            block.font_weight,
            escape_xml(&text),
        );
        let _ = write!(
            out,
            r#"  <text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" font-style="{style}" xml:space="preserve">"#,
            num(block.x),
            num(baseline),
            escape_xml(FONT_STACK),
            num(block.font_size),
            block.font_weight,
        );
        for span in line {
            let _ = write!(
                out,
                r#"<tspan fill="{}">{}</tspan>"#,
                sanitize_color(&span.color, WHITE),
                escape_xml(&span.text),
            );
        }
        out.push_str("</text>\n");
    }
}

pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Compact decimal: at most two places, no trailing zeros.
fn num(value: f64) -> String {
    let text = format!("{value:.2}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        return "0".to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use thumbarch_contracts::LayoutType;

    use super::{escape_xml, num, render_svg};
    use crate::editor::test_support::template;
    use crate::editor::{BackgroundView, EditorSession};
    use crate::upload::{test_images, UploadedImage};

    #[test]
    fn number_formatting_is_compact() {
        assert_eq!(num(400.0), "400");
        assert_eq!(num(144.5), "144.5");
        assert_eq!(num(0.333), "0.33");
        assert_eq!(num(-0.001), "0");
    }

    #[test]
    fn escapes_markup_in_text_and_attributes() {
        assert_eq!(
            escape_xml(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &apos;Jerry&apos;&lt;/b&gt;"
        );

        let mut editor = EditorSession::new(template(LayoutType::FullFace));
        editor.set_headline("<script>alert(1)</script> & more");
        let svg = render_svg(&editor.compose(None, BackgroundView::Ready("https://x.test/a?b=1&c=2")));
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;SCRIPT&gt;"));
        assert!(svg.contains("https://x.test/a?b=1&amp;c=2"));
    }

    #[test]
    fn named_palette_colors_reach_the_document() {
        let mut blueprint = template(LayoutType::Grid);
        blueprint.color_palette = vec![
            "Blue".to_string(),
            "Cyan".to_string(),
            "White".to_string(),
        ];
        let editor = EditorSession::new(blueprint);
        let svg = render_svg(&editor.compose(None, BackgroundView::Missing));
        assert!(svg.contains(r##"<tspan fill="#00FFFF">LEARNED</tspan>"##));
        assert!(!svg.contains(r##"<tspan fill="#FFFFFF">LEARNED"##));
        assert!(svg.contains(r##"<tspan fill="#FFFFFF">HOW"##));
        assert!(svg.contains(
            r##"fill="#0000FF" opacity="0.3" style="mix-blend-mode:overlay""##
        ));
        assert!(!svg.contains(r##"fill="#000000" opacity="0.3""##));
    }

    #[test]
    fn injected_palette_entries_fall_back() {
        let mut blueprint = template(LayoutType::Grid);
        blueprint.color_palette = vec![
            r#"red" onload="alert(1)"#.to_string(),
            "Cyan".to_string(),
        ];
        let editor = EditorSession::new(blueprint);
        let svg = render_svg(&editor.compose(None, BackgroundView::Missing));
        assert!(!svg.contains("onload"));
        assert!(svg.contains(
            r##"fill="#000000" opacity="0.3" style="mix-blend-mode:overlay""##
        ));
    }

    #[test]
    fn document_scales_with_display_scale() {
        let mut editor = EditorSession::new(template(LayoutType::Grid));
        editor.set_container_width(400.0);
        let svg = render_svg(&editor.compose(None, BackgroundView::Missing));
        assert!(svg.starts_with(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="225" viewBox="0 0 800 450">"#
        ));
        assert!(svg.contains("url(#bg-placeholder)"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn subject_effects_follow_background_toggle() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes(test_images::png(10, 10), None)?;
        let mut editor = EditorSession::new(template(LayoutType::Split));
        let removed = render_svg(&editor.compose(Some(&image), BackgroundView::Generating));
        assert!(removed.contains(r#"mask="url(#subject-fade)""#));
        assert!(removed.contains(r#"slope="1.1" intercept="-0.05""#));
        assert!(removed.contains("Generating Background..."));

        editor.toggle_background_removal();
        let original = render_svg(&editor.compose(Some(&image), BackgroundView::Generating));
        assert!(!original.contains("subject-fade"));

        let temp = tempfile::tempdir()?;
        let path = temp.path().join("preview.svg");
        fs::write(&path, &original)?;
        assert!(fs::read_to_string(&path)?.contains("data:image/png;base64,"));
        Ok(())
    }

    #[test]
    fn unsafe_palette_colors_fall_back() {
        let mut blueprint = template(LayoutType::Grid);
        blueprint.color_palette = vec![
            "red\" onload=\"x".to_string(),
            "#22d3ee".to_string(),
            "url(javascript:1)".to_string(),
        ];
        let svg = render_svg(&EditorSession::new(blueprint).compose(None, BackgroundView::Missing));
        assert!(!svg.contains("onload"));
        assert!(!svg.contains("javascript"));
        assert!(svg.contains("#22D3EE"));
    }
}
