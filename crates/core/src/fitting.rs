//! Character and line budget text fitting.
//!
//! Template boxes have a fixed size and the renderer does not measure glyphs,
//! so the character count (in Unicode scalar values) stands in for rendered
//! width. Fitting is a pure string transform: fitting already fitted text
//! returns it unchanged.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

const ELLIPSIS_LEN: usize = 3;

/// Smallest budget that can hold one character plus the ellipsis.
const MIN_BUDGET: usize = ELLIPSIS_LEN + 1;

/// A word break is only taken when it keeps more than this share of the budget.
const WORD_BREAK_RATIO: f64 = 0.7;

/// Budgets for one text box.
///
/// Serialized as `[max_chars_per_line, max_lines, total_chars]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize, usize)", into = "(usize, usize, usize)")]
pub struct TextLimits {
    pub max_chars_per_line: usize,
    pub max_lines: usize,
    pub total_chars: usize,
}

impl TextLimits {
    /// Create limits. Character budgets below the ellipsis length plus one and
    /// a line budget of zero are lifted to the smallest usable value.
    pub fn new(max_chars_per_line: usize, max_lines: usize, total_chars: usize) -> Self {
        Self {
            max_chars_per_line: max_chars_per_line.max(MIN_BUDGET),
            max_lines: max_lines.max(1),
            total_chars: total_chars.max(MIN_BUDGET),
        }
    }
}

impl Default for TextLimits {
    fn default() -> Self {
        Self::new(50, 4, 180)
    }
}

impl From<(usize, usize, usize)> for TextLimits {
    fn from((per_line, lines, total): (usize, usize, usize)) -> Self {
        Self::new(per_line, lines, total)
    }
}

impl From<TextLimits> for (usize, usize, usize) {
    fn from(limits: TextLimits) -> Self {
        (limits.max_chars_per_line, limits.max_lines, limits.total_chars)
    }
}

/// Descending font sizes (points) picked by how full the box is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontScale {
    pub normal: u32,
    pub small: u32,
    pub tiny: u32,
}

impl Default for FontScale {
    fn default() -> Self {
        Self {
            normal: 9,
            small: 8,
            tiny: 7,
        }
    }
}

impl FontScale {
    /// Font size for text of `used` characters in a box of `budget` characters.
    pub fn for_usage(&self, used: usize, budget: usize) -> u32 {
        let used = used as f64;
        let budget = budget as f64;
        if used > budget * 0.95 {
            self.tiny
        } else if used > budget * 0.8 {
            self.small
        } else {
            self.normal
        }
    }
}

/// Result of fitting text into a box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedText {
    pub text: String,
    /// Recommended font size in points.
    pub font_size: u32,
}

/// Number of characters (Unicode scalar values) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate `text` to at most `max_chars` characters, ending with `...`.
///
/// The cut happens at the last space when that does not give up more than
/// 30% of the budget. Budgets too small for the ellipsis get a hard cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS_LEN {
        return take_chars(text, max_chars).to_string();
    }

    let mut kept = take_chars(text, max_chars - ELLIPSIS_LEN);
    if let Some(space) = kept.rfind(' ') {
        let space_chars = char_len(&kept[..space]);
        if space_chars as f64 > max_chars as f64 * WORD_BREAK_RATIO {
            kept = &kept[..space];
        }
    }

    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

/// Keep at most `max_lines` lines, truncating each line to `max_chars_per_line`.
///
/// When lines are dropped, the last kept line is marked with an ellipsis.
pub fn truncate_lines(text: &str, max_lines: usize, max_chars_per_line: Option<usize>) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| match max_chars_per_line {
            Some(max) if char_len(line) > max => truncate_text(line, max),
            _ => line.to_string(),
        })
        .collect();

    let max_lines = max_lines.max(1);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        while lines.len() > 1 && lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        if let Some(last) = lines.last_mut() {
            *last = mark_truncated(last);
        }
    }

    lines.join("\n")
}

/// End a line with the ellipsis without making it longer, unless it is
/// shorter than the ellipsis itself.
fn mark_truncated(line: &str) -> String {
    if line.ends_with(ELLIPSIS) {
        return line.to_string();
    }
    let trimmed = line.trim_end();
    let len = char_len(trimmed);
    if len > ELLIPSIS_LEN {
        format!("{}{}", take_chars(trimmed, len - ELLIPSIS_LEN), ELLIPSIS)
    } else {
        ELLIPSIS.to_string()
    }
}

/// Canonical form used before counting: NFC, `\n` line endings.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .nfc()
        .collect()
}

/// Fit `text` into a box with the given limits and pick a font size.
pub fn fit_text(text: &str, limits: TextLimits, scale: FontScale) -> FittedText {
    let normalized = normalize(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return FittedText {
            text: String::new(),
            font_size: scale.normal,
        };
    }

    let within_total = truncate_text(trimmed, limits.total_chars);
    let fitted = truncate_lines(
        &within_total,
        limits.max_lines,
        Some(limits.max_chars_per_line),
    );
    let font_size = scale.for_usage(char_len(&fitted), limits.total_chars);

    log::trace!(
        "fitted {} chars into {} ({}pt)",
        char_len(trimmed),
        char_len(&fitted),
        font_size
    );

    FittedText {
        text: fitted,
        font_size,
    }
}

/// Fit a bullet list into a box.
///
/// `reserved_lines` are taken by an inline title or padding paragraphs. At
/// least one item is kept; items are truncated to the per-line budget and
/// trailing items are dropped once the total budget is spent.
pub fn fit_items(items: &[String], limits: TextLimits, reserved_lines: usize) -> Vec<String> {
    let available = limits.max_lines.saturating_sub(reserved_lines).max(1);
    let mut fitted = Vec::new();
    let mut used = 0usize;

    for item in items.iter().take(available) {
        let line = truncate_text(item.trim(), limits.max_chars_per_line);
        let cost = char_len(&line) + usize::from(!fitted.is_empty());
        if !fitted.is_empty() && used + cost > limits.total_chars {
            break;
        }
        used += cost;
        fitted.push(line);
    }

    if let Some(first) = fitted.first_mut() {
        if char_len(first) > limits.total_chars {
            *first = truncate_text(first, limits.total_chars);
        }
    }

    fitted
}
