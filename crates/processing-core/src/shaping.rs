//! Right-to-left text shaping.
//!
//! Turns logical Arabic-script text into display order:
//! 1. Wrap the logical string into lines (see [`crate::wrap`]).
//! 2. Per line, select contextual presentation forms and lam-alef ligatures.
//! 3. Per line, run the bidi algorithm and reverse right-to-left runs,
//!    keeping combining marks attached after their base glyph.
//!
//! Translated text never passes through here.

use std::ops::Range;

use unicode_bidi::{BidiInfo, Level};

use crate::wrap::wrap_chars;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapingError {
    #[error("line contains {0} paragraphs, expected one")]
    MultipleParagraphs(usize),
}

/// Converts one logical line into a display-ready line.
pub trait Shaper: Send + Sync {
    fn shape_line(&self, line: &str) -> Result<String, ShapingError>;
}

/// Contextual Arabic joining plus bidi reordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArabicShaper;

impl Shaper for ArabicShaper {
    fn shape_line(&self, line: &str) -> Result<String, ShapingError> {
        let joined = join_forms(line);
        reorder_visual(&joined)
    }
}

/// Wrap `text` at `wrap_width` visible characters, then shape each line.
///
/// Lines are returned top to bottom in logical order. If shaping any line
/// fails, the wrapped but unshaped lines are returned instead.
pub fn shape_lines(shaper: &dyn Shaper, text: &str, wrap_width: usize) -> Vec<String> {
    let logical = wrap_chars(text, wrap_width);
    let shaped: Result<Vec<String>, ShapingError> =
        logical.iter().map(|line| shaper.shape_line(line)).collect();

    match shaped {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!(error = %e, "Shaping failed, rendering unshaped text");
            logical
        }
    }
}

/// [`shape_lines`] joined with `'\n'`.
pub fn shape_for_display(shaper: &dyn Shaper, text: &str, wrap_width: usize) -> String {
    shape_lines(shaper, text, wrap_width).join("\n")
}

// ---------------------------------------------------------------------------
// Joining
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Connects on both sides.
    Dual,
    /// Connects only to the preceding letter.
    Right,
    /// Combining mark; ignored when finding neighbours.
    Transparent,
    /// Forces a connection on both sides without changing shape (ZWJ).
    Causing,
    NonJoining,
}

/// Presentation forms: isolated, final, initial, medial.
struct Forms {
    isolated: char,
    fin: char,
    initial: Option<char>,
    medial: Option<char>,
}

const fn dual(isolated: u32, fin: u32, initial: u32, medial: u32) -> Option<(u32, u32, u32, u32)> {
    Some((isolated, fin, initial, medial))
}

const fn right(isolated: u32, fin: u32) -> Option<(u32, u32, u32, u32)> {
    Some((isolated, fin, 0, 0))
}

/// Forms for a base letter, or `None` for characters outside the table.
fn forms(c: char) -> Option<Forms> {
    let raw = match c as u32 {
        0x0621 => Some((0xFE80, 0xFE80, 0, 0)),
        0x0622 => right(0xFE81, 0xFE82),
        0x0623 => right(0xFE83, 0xFE84),
        0x0624 => right(0xFE85, 0xFE86),
        0x0625 => right(0xFE87, 0xFE88),
        0x0626 => dual(0xFE89, 0xFE8A, 0xFE8B, 0xFE8C),
        0x0627 => right(0xFE8D, 0xFE8E),
        0x0628 => dual(0xFE8F, 0xFE90, 0xFE91, 0xFE92),
        0x0629 => right(0xFE93, 0xFE94),
        0x062A => dual(0xFE95, 0xFE96, 0xFE97, 0xFE98),
        0x062B => dual(0xFE99, 0xFE9A, 0xFE9B, 0xFE9C),
        0x062C => dual(0xFE9D, 0xFE9E, 0xFE9F, 0xFEA0),
        0x062D => dual(0xFEA1, 0xFEA2, 0xFEA3, 0xFEA4),
        0x062E => dual(0xFEA5, 0xFEA6, 0xFEA7, 0xFEA8),
        0x062F => right(0xFEA9, 0xFEAA),
        0x0630 => right(0xFEAB, 0xFEAC),
        0x0631 => right(0xFEAD, 0xFEAE),
        0x0632 => right(0xFEAF, 0xFEB0),
        0x0633 => dual(0xFEB1, 0xFEB2, 0xFEB3, 0xFEB4),
        0x0634 => dual(0xFEB5, 0xFEB6, 0xFEB7, 0xFEB8),
        0x0635 => dual(0xFEB9, 0xFEBA, 0xFEBB, 0xFEBC),
        0x0636 => dual(0xFEBD, 0xFEBE, 0xFEBF, 0xFEC0),
        0x0637 => dual(0xFEC1, 0xFEC2, 0xFEC3, 0xFEC4),
        0x0638 => dual(0xFEC5, 0xFEC6, 0xFEC7, 0xFEC8),
        0x0639 => dual(0xFEC9, 0xFECA, 0xFECB, 0xFECC),
        0x063A => dual(0xFECD, 0xFECE, 0xFECF, 0xFED0),
        0x0640 => dual(0x0640, 0x0640, 0x0640, 0x0640),
        0x0641 => dual(0xFED1, 0xFED2, 0xFED3, 0xFED4),
        0x0642 => dual(0xFED5, 0xFED6, 0xFED7, 0xFED8),
        0x0643 => dual(0xFED9, 0xFEDA, 0xFEDB, 0xFEDC),
        0x0644 => dual(0xFEDD, 0xFEDE, 0xFEDF, 0xFEE0),
        0x0645 => dual(0xFEE1, 0xFEE2, 0xFEE3, 0xFEE4),
        0x0646 => dual(0xFEE5, 0xFEE6, 0xFEE7, 0xFEE8),
        0x0647 => dual(0xFEE9, 0xFEEA, 0xFEEB, 0xFEEC),
        0x0648 => right(0xFEED, 0xFEEE),
        0x0649 => dual(0xFEEF, 0xFEF0, 0xFBE8, 0xFBE9),
        0x064A => dual(0xFEF1, 0xFEF2, 0xFEF3, 0xFEF4),
        0x0671 => right(0xFB50, 0xFB51),
        0x067E => dual(0xFB56, 0xFB57, 0xFB58, 0xFB59),
        0x0686 => dual(0xFB7A, 0xFB7B, 0xFB7C, 0xFB7D),
        0x06A9 => dual(0xFB8E, 0xFB8F, 0xFB90, 0xFB91),
        0x06AF => dual(0xFB92, 0xFB93, 0xFB94, 0xFB95),
        0x06CC => dual(0xFBFC, 0xFBFD, 0xFBFE, 0xFBFF),
        _ => None,
    }?;

    let to_char = |cp: u32| char::from_u32(cp);
    Some(Forms {
        isolated: to_char(raw.0)?,
        fin: to_char(raw.1)?,
        initial: (raw.2 != 0).then(|| to_char(raw.2)).flatten(),
        medial: (raw.3 != 0).then(|| to_char(raw.3)).flatten(),
    })
}

/// Combining marks that do not affect joining.
pub fn is_transparent(c: char) -> bool {
    matches!(c as u32,
        0x0610..=0x061A
        | 0x064B..=0x065F
        | 0x0670
        | 0x06D6..=0x06DC
        | 0x06DF..=0x06E4
        | 0x06E7..=0x06E8
        | 0x06EA..=0x06ED
        | 0x08D3..=0x08E1
        | 0x08E3..=0x08FF
    )
}

fn joining(c: char) -> Joining {
    if is_transparent(c) {
        return Joining::Transparent;
    }
    if c == '\u{200D}' {
        return Joining::Causing;
    }
    match forms(c) {
        Some(f) if f.initial.is_some() => Joining::Dual,
        Some(f) if f.fin != f.isolated => Joining::Right,
        _ => Joining::NonJoining,
    }
}

fn joins_forward(j: Joining) -> bool {
    matches!(j, Joining::Dual | Joining::Causing)
}

fn joins_backward(j: Joining) -> bool {
    matches!(j, Joining::Dual | Joining::Right | Joining::Causing)
}

/// Lam-alef ligature: (isolated, final) for a lam followed by `alef`.
fn lam_alef(alef: char) -> Option<(char, char)> {
    let (iso, fin) = match alef {
        '\u{0622}' => ('\u{FEF5}', '\u{FEF6}'),
        '\u{0623}' => ('\u{FEF7}', '\u{FEF8}'),
        '\u{0625}' => ('\u{FEF9}', '\u{FEFA}'),
        '\u{0627}' => ('\u{FEFB}', '\u{FEFC}'),
        _ => return None,
    };
    Some((iso, fin))
}

fn prev_joining(chars: &[char], i: usize) -> Option<Joining> {
    chars[..i]
        .iter()
        .rev()
        .map(|c| joining(*c))
        .find(|j| *j != Joining::Transparent)
}

fn next_non_transparent(chars: &[char], i: usize) -> Option<usize> {
    (i + 1..chars.len()).find(|&k| joining(chars[k]) != Joining::Transparent)
}

/// Replace base letters with their contextual presentation forms.
///
/// Combining marks are kept in place, directly after the base they
/// belong to.
pub fn join_forms(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let Some(f) = forms(c) else {
            out.push(c);
            i += 1;
            continue;
        };

        let joined_prev = prev_joining(&chars, i).is_some_and(joins_forward)
            && joins_backward(joining(c));
        let next = next_non_transparent(&chars, i);

        if c == '\u{0644}' {
            if let Some((k, (iso, fin))) = next.and_then(|k| lam_alef(chars[k]).map(|l| (k, l))) {
                out.push(if joined_prev { fin } else { iso });
                // Marks between lam and alef stay with the ligature.
                out.extend(&chars[i + 1..k]);
                i = k + 1;
                continue;
            }
        }

        let joined_next = joins_forward(joining(c))
            && next.is_some_and(|k| joins_backward(joining(chars[k])));

        let shaped = match (joined_prev, joined_next) {
            (true, true) => f.medial.unwrap_or(f.fin),
            (true, false) => f.fin,
            (false, true) => f.initial.unwrap_or(f.isolated),
            (false, false) => f.isolated,
        };
        out.push(shaped);
        i += 1;
    }

    out
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Bidi-reorder one line (paragraph level right-to-left) into visual order.
///
/// Right-to-left runs are reversed cluster by cluster, so a base glyph and
/// its trailing combining marks keep their relative order, and paired
/// brackets are mirrored.
pub fn reorder_visual(line: &str) -> Result<String, ShapingError> {
    if line.is_empty() {
        return Ok(String::new());
    }

    let info = BidiInfo::new(line, Some(Level::rtl()));
    if info.paragraphs.len() != 1 {
        return Err(ShapingError::MultipleParagraphs(info.paragraphs.len()));
    }

    let para = &info.paragraphs[0];
    let line_range = para.range.clone();
    let (levels, runs) = info.visual_runs(para, line_range);

    let mut out = String::with_capacity(line.len());
    for run in runs {
        let text = &line[run.clone()];
        if levels[run.start].is_rtl() {
            push_reversed_clusters(&mut out, text);
        } else {
            out.push_str(text);
        }
    }
    Ok(out)
}

fn push_reversed_clusters(out: &mut String, text: &str) {
    let chars: Vec<char> = text.chars().collect();
    let mut clusters: Vec<Range<usize>> = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        match clusters.last_mut() {
            Some(last) if is_transparent(*c) => last.end = i + 1,
            _ => clusters.push(i..i + 1),
        }
    }

    for cluster in clusters.into_iter().rev() {
        let mut iter = chars[cluster].iter();
        if let Some(base) = iter.next() {
            out.push(mirror(*base));
        }
        out.extend(iter);
    }
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        other => other,
    }
}
