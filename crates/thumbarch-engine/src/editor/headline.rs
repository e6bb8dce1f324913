use super::scene::{HeadlineBlock, Point, TextSpan};

pub const FONT_SIZE: f64 = 64.0;
pub const LINE_HEIGHT: f64 = 0.9;
pub const FONT_WEIGHT: u16 = 900;
pub const SHADOW_OFFSET: Point = Point::new(4.0, 4.0);
pub const SHADOW_OPACITY: f64 = 0.8;

/// Estimated advance of one heavy italic capital, in ems.
const GLYPH_ADVANCE_EM: f64 = 0.62;
const SPACE_ADVANCE_EM: f64 = 0.28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlineParts<'a> {
    pub prefix: &'a str,
    pub highlight: Option<&'a str>,
    pub suffix: &'a str,
}

/// Splits at the first occurrence of `word`. An empty or absent word leaves
/// the whole headline in `prefix`.
pub fn split_headline<'a>(headline: &'a str, word: &str) -> HeadlineParts<'a> {
    if word.is_empty() {
        return HeadlineParts {
            prefix: headline,
            highlight: None,
            suffix: "",
        };
    }
    match headline.find(word) {
        Some(start) => {
            let end = start + word.len();
            HeadlineParts {
                prefix: &headline[..start],
                highlight: Some(&headline[start..end]),
                suffix: &headline[end..],
            }
        }
        None => HeadlineParts {
            prefix: headline,
            highlight: None,
            suffix: "",
        },
    }
}

pub fn estimated_width(text: &str, font_size: f64) -> f64 {
    text.chars()
        .map(|ch| {
            if ch.is_whitespace() {
                SPACE_ADVANCE_EM
            } else {
                GLYPH_ADVANCE_EM
            }
        })
        .sum::<f64>()
        * font_size
}

/// Upper-cases the split headline and wraps it greedily into lines no wider
/// than `max_width`. A single word wider than the column gets its own line.
pub fn layout_headline(
    parts: HeadlineParts<'_>,
    base_color: &str,
    highlight_color: &str,
    max_width: f64,
) -> Vec<Vec<TextSpan>> {
    let words = words_with_flags(parts);
    let space = SPACE_ADVANCE_EM * FONT_SIZE;

    let mut lines: Vec<Vec<Vec<(String, bool)>>> = Vec::new();
    let mut current: Vec<Vec<(String, bool)>> = Vec::new();
    let mut current_width = 0.0;
    for word in words {
        let text: String = word.iter().map(|(chunk, _)| chunk.as_str()).collect();
        let width = estimated_width(&text, FONT_SIZE);
        if !current.is_empty() && current_width + space + width > max_width {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        if !current.is_empty() {
            current_width += space;
        }
        current_width += width;
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|line| line_spans(line, base_color, highlight_color))
        .collect()
}

pub fn headline_block(
    lines: Vec<Vec<TextSpan>>,
    x: f64,
    top: f64,
    max_width: f64,
) -> HeadlineBlock {
    HeadlineBlock {
        x,
        top,
        max_width,
        font_size: FONT_SIZE,
        line_height: LINE_HEIGHT,
        font_weight: FONT_WEIGHT,
        italic: true,
        shadow_offset: SHADOW_OFFSET,
        shadow_opacity: SHADOW_OPACITY,
        lines,
    }
}

fn words_with_flags(parts: HeadlineParts<'_>) -> Vec<Vec<(String, bool)>> {
    let segments = [
        (parts.prefix, false),
        (parts.highlight.unwrap_or(""), true),
        (parts.suffix, false),
    ];
    let mut words: Vec<Vec<(String, bool)>> = Vec::new();
    let mut word: Vec<(String, bool)> = Vec::new();
    for (segment, highlighted) in segments {
        for ch in segment.chars() {
            if ch.is_whitespace() {
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
                continue;
            }
            let upper: String = ch.to_uppercase().collect();
            match word.last_mut() {
                Some((chunk, flag)) if *flag == highlighted => chunk.push_str(&upper),
                _ => word.push((upper, highlighted)),
            }
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

fn line_spans(
    words: Vec<Vec<(String, bool)>>,
    base_color: &str,
    highlight_color: &str,
) -> Vec<TextSpan> {
    let mut spans: Vec<TextSpan> = Vec::new();
    let mut push = |text: &str, highlighted: bool| match spans.last_mut() {
        Some(last) if last.highlighted == highlighted => last.text.push_str(text),
        _ => spans.push(TextSpan {
            text: text.to_string(),
            color: if highlighted {
                highlight_color.to_string()
            } else {
                base_color.to_string()
            },
            highlighted,
        }),
    };
    for (idx, word) in words.into_iter().enumerate() {
        if idx > 0 {
            push(" ", false);
        }
        for (chunk, highlighted) in word {
            push(&chunk, highlighted);
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::{layout_headline, split_headline, HeadlineParts};

    #[test]
    fn splits_around_first_occurrence() {
        assert_eq!(
            split_headline("How I Learned X", "Learned"),
            HeadlineParts {
                prefix: "How I ",
                highlight: Some("Learned"),
                suffix: " X",
            }
        );
        let twice = split_headline("Fast or Fast", "Fast");
        assert_eq!(twice.prefix, "");
        assert_eq!(twice.suffix, " or Fast");
    }

    #[test]
    fn absent_or_empty_word_keeps_whole_headline() {
        for word in ["", "Missing"] {
            let parts = split_headline("How I Learned X", word);
            assert_eq!(parts.prefix, "How I Learned X");
            assert_eq!(parts.highlight, None);
            assert_eq!(parts.suffix, "");
        }
    }

    #[test]
    fn wraps_greedily_and_keeps_highlight_color() {
        let lines = layout_headline(
            split_headline("How I Learned X", "Learned"),
            "#FFFFFF",
            "#22d3ee",
            336.0,
        );
        assert!(lines.len() >= 2);
        let highlighted: Vec<_> = lines
            .iter()
            .flatten()
            .filter(|span| span.highlighted)
            .collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].text, "LEARNED");
        assert_eq!(highlighted[0].color, "#22d3ee");

        let joined: Vec<String> = lines
            .iter()
            .map(|line| line.iter().map(|span| span.text.as_str()).collect())
            .collect();
        assert_eq!(joined.join(" "), "HOW I LEARNED X");
    }

    #[test]
    fn wide_column_keeps_one_line() {
        let lines = layout_headline(split_headline("Go Big", ""), "white", "#22d3ee", 704.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].text, "GO BIG");
    }
}
