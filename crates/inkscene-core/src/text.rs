//! Rich text parsing and deterministic text layout.
//!
//! Both backends lay text out through [`layout_text`], so line breaking,
//! alignment and vertical centering agree between them. Metrics are
//! approximations derived from the font size, not real glyph advances.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

/// Default font family when none (or an empty one) is requested.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment within the text bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Decoration drawn with the whole text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

impl TextDecoration {
    pub fn as_css(self) -> &'static str {
        match self {
            TextDecoration::None => "none",
            TextDecoration::Underline => "underline",
            TextDecoration::LineThrough => "line-through",
        }
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
}

impl TextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Text as a sequence of styled spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RichText {
    pub spans: Vec<TextSpan>,
}

impl RichText {
    /// Unstyled text.
    pub fn plain(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            spans: vec![TextSpan::plain(text)],
        }
    }

    /// Parse `text`, interpreting the markdown subset when `markdown` is set.
    pub fn parse(text: &str, markdown: bool) -> Self {
        if markdown {
            parse_markdown(text)
        } else {
            Self::plain(text)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }

    /// The text without styling.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Parse the supported markdown subset.
///
/// `**bold**`, `*italic*` or `_italic_`, `~~strike~~` and backslash escapes.
/// A marker without a matching closing marker is kept as literal text.
pub fn parse_markdown(source: &str) -> RichText {
    let chars: Vec<char> = source.chars().collect();
    let mut spans: Vec<TextSpan> = Vec::new();
    let mut current = TextSpan::default();
    let (mut bold, mut italic, mut strike) = (false, false, false);
    let mut i = 0;

    let flush = |current: &mut TextSpan, spans: &mut Vec<TextSpan>| {
        if !current.text.is_empty() {
            spans.push(std::mem::take(current));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            current.text.push(chars[i + 1]);
            i += 2;
            continue;
        }
        let marker: Option<&str> = match c {
            '*' if chars.get(i + 1) == Some(&'*') => Some("**"),
            '~' if chars.get(i + 1) == Some(&'~') => Some("~~"),
            '*' => Some("*"),
            '_' => Some("_"),
            _ => None,
        };
        if let Some(marker) = marker {
            let active = match marker {
                "**" => bold,
                "~~" => strike,
                _ => italic,
            };
            let width = marker.chars().count();
            // Opening markers need a matching close further on.
            if active || has_closing(&chars, i + width, marker) {
                flush(&mut current, &mut spans);
                match marker {
                    "**" => bold = !bold,
                    "~~" => strike = !strike,
                    _ => italic = !italic,
                }
                current.bold = bold;
                current.italic = italic;
                current.strike = strike;
                i += width;
                continue;
            }
        }
        current.text.push(c);
        i += 1;
    }
    flush(&mut current, &mut spans);
    RichText { spans }
}

fn has_closing(chars: &[char], from: usize, marker: &str) -> bool {
    let marker: Vec<char> = marker.chars().collect();
    if from >= chars.len() {
        return false;
    }
    let mut i = from;
    while i + marker.len() <= chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i..i + marker.len()] == marker[..] {
            // A single `*` must not be the first half of `**`.
            if marker == ['*'] && chars.get(i + 1) == Some(&'*') {
                i += 2;
                continue;
            }
            return i > from;
        }
        i += 1;
    }
    false
}

/// Memo of parsed rich text, owned by whoever renders the text.
///
/// Cleared wholesale when it reaches capacity.
#[derive(Debug, Clone)]
pub struct TextCache {
    entries: HashMap<(String, bool), Rc<RichText>>,
    capacity: usize,
    hits: usize,
}

impl TextCache {
    /// Default number of cached entries.
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
        }
    }

    /// Parse `text`, reusing a previous parse of the same input.
    pub fn parse(&mut self, text: &str, markdown: bool) -> Rc<RichText> {
        let key = (text.to_string(), markdown);
        if let Some(found) = self.entries.get(&key) {
            self.hits += 1;
            return Rc::clone(found);
        }
        if self.entries.len() >= self.capacity {
            log::trace!("text cache full ({} entries), clearing", self.entries.len());
            self.entries.clear();
        }
        let parsed = Rc::new(RichText::parse(text, markdown));
        self.entries.insert(key, Rc::clone(&parsed));
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for TextCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Text placement options passed to the `text` draw calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextConfig {
    /// Text content; overridden by the draw props' text when set.
    pub text: String,
    pub align: TextAlign,
    pub vertical_align: VerticalAlign,
    /// Inner padding applied to the bounds on every side.
    pub padding: f64,
}

impl TextConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = align;
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }
}

/// Everything that determines the layout of a text node.
///
/// Backends keep one of these per text node and update it from their setters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: RichText,
    pub bounds: Rect,
    pub align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub decoration: TextDecoration,
    pub font_family: String,
    pub font_size: f64,
    pub multiline: bool,
}

impl Default for TextBlock {
    fn default() -> Self {
        Self {
            text: RichText::default(),
            bounds: Rect::ZERO,
            align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
            decoration: TextDecoration::default(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            multiline: false,
        }
    }
}

impl TextBlock {
    pub fn layout(&self) -> TextLayout {
        layout_text(self)
    }
}

/// A positioned run inside a laid out line.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRun {
    pub span: TextSpan,
    /// Left edge of the run.
    pub x: f64,
    pub width: f64,
}

/// One laid out line.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub runs: Vec<LayoutRun>,
    /// Left edge of the line after alignment.
    pub x: f64,
    /// Baseline position.
    pub baseline: f64,
    pub width: f64,
}

impl LayoutLine {
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.baseline)
    }
}

/// Result of laying out a [`TextBlock`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    pub lines: Vec<LayoutLine>,
    pub font_size: f64,
    pub line_height: f64,
}

impl TextLayout {
    /// Bounding box of all lines.
    pub fn extent(&self) -> Option<Rect> {
        let first = self.lines.first()?;
        let ascent = self.font_size * ASCENT;
        let mut rect = Rect::new(
            first.x,
            first.baseline - ascent,
            first.x + first.width,
            first.baseline - ascent + self.line_height,
        );
        for line in &self.lines[1..] {
            rect = rect.union(Rect::new(
                line.x,
                line.baseline - ascent,
                line.x + line.width,
                line.baseline - ascent + self.line_height,
            ));
        }
        Some(rect)
    }
}

const ADVANCE: f64 = 0.55;
const BOLD_ADVANCE: f64 = 0.6;
const LINE_HEIGHT: f64 = 1.2;
const ASCENT: f64 = 0.8;

/// Approximate advance width of `text` at `font_size`.
pub fn measure(text: &str, font_size: f64, bold: bool) -> f64 {
    let factor = if bold { BOLD_ADVANCE } else { ADVANCE };
    text.chars().count() as f64 * font_size * factor
}

/// Lay out a text block inside its bounds.
pub fn layout_text(block: &TextBlock) -> TextLayout {
    let size = block.font_size;
    let line_height = size * LINE_HEIGHT;
    let max_width = block.bounds.width();

    let mut lines: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    for span in &block.text.spans {
        for (n, piece) in span.text.split('\n').enumerate() {
            if n > 0 {
                lines.push(std::mem::take(&mut current));
            }
            if !piece.is_empty() {
                current.push(TextSpan {
                    text: piece.to_string(),
                    ..span.clone()
                });
            }
        }
    }
    lines.push(current);
    if block.multiline && max_width > 0.0 {
        lines = lines
            .into_iter()
            .flat_map(|line| wrap_line(line, max_width, size))
            .collect();
    }
    if block.text.is_empty() {
        lines.clear();
    }

    let block_height = lines.len() as f64 * line_height;
    let top = match block.vertical_align {
        VerticalAlign::Top => block.bounds.y0,
        VerticalAlign::Middle => block.bounds.y0 + (block.bounds.height() - block_height) / 2.0,
        VerticalAlign::Bottom => block.bounds.y1 - block_height,
    };

    let laid_out = lines
        .into_iter()
        .enumerate()
        .map(|(n, spans)| {
            let width: f64 = spans.iter().map(|s| measure(&s.text, size, s.bold)).sum();
            let x = match block.align {
                TextAlign::Left => block.bounds.x0,
                TextAlign::Center => block.bounds.x0 + (block.bounds.width() - width) / 2.0,
                TextAlign::Right => block.bounds.x1 - width,
            };
            let mut cursor = x;
            let runs = spans
                .into_iter()
                .map(|span| {
                    let w = measure(&span.text, size, span.bold);
                    let run = LayoutRun { span, x: cursor, width: w };
                    cursor += w;
                    run
                })
                .collect();
            LayoutLine {
                runs,
                x,
                baseline: top + n as f64 * line_height + size * ASCENT,
                width,
            }
        })
        .collect();

    TextLayout {
        lines: laid_out,
        font_size: size,
        line_height,
    }
}

/// Greedy word wrap of one logical line.
fn wrap_line(spans: Vec<TextSpan>, max_width: f64, size: f64) -> Vec<Vec<TextSpan>> {
    let mut out = Vec::new();
    let mut line: Vec<TextSpan> = Vec::new();
    let mut width = 0.0;
    for span in spans {
        for word in split_keep_spaces(&span.text) {
            let blank = word.trim().is_empty();
            let w = measure(word, size, span.bold);
            if width > 0.0 && width + w > max_width && !blank {
                out.push(std::mem::take(&mut line));
                width = 0.0;
            }
            // no leading whitespace on wrapped lines
            if width == 0.0 && blank {
                continue;
            }
            push_text(&mut line, &span, word);
            width += w;
        }
    }
    out.push(line);
    out
}

fn push_text(line: &mut Vec<TextSpan>, style: &TextSpan, text: &str) {
    if let Some(last) = line.last_mut() {
        if last.bold == style.bold && last.italic == style.italic && last.strike == style.strike {
            last.text.push_str(text);
            return;
        }
    }
    line.push(TextSpan {
        text: text.to_string(),
        ..style.clone()
    });
}

/// Split into words and whitespace runs, keeping both.
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                parts.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}
