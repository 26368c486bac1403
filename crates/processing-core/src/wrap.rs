//! Greedy word wrapping.

use crate::shaping::is_transparent;

/// Number of characters that occupy horizontal space (combining marks excluded).
pub fn visible_len(text: &str) -> usize {
    text.chars().filter(|c| !is_transparent(*c)).count()
}

/// Wrap `text` into lines of at most `width` visible characters.
///
/// Words are never split: a word longer than `width` gets a line of its own.
/// Runs of whitespace collapse to a single space.
pub fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    wrap_by(text, |line| visible_len(line) <= width.max(1))
}

/// Wrap `text` so each line measures at most `max_width` pixels according
/// to `measure`. Same word rules as [`wrap_chars`].
pub fn wrap_pixels(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    wrap_by(text, |line| measure(line) <= max_width)
}

fn wrap_by(text: &str, fits: impl Fn(&str) -> bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if fits(&candidate) {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
