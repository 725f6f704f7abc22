//! Lyric normalization and the `MM:SS|text` lyric text format
//!
//! Stored lyrics always satisfy:
//! - every `time` is finite and >= 0 (negative offsets are clamped to zero)
//! - every `text` is non-blank (blank lines are dropped)
//! - lines are sorted ascending by `time` (stable for equal times)

use crate::models::LyricLine;

/// Normalize lyric lines for storage or display
///
/// Clamps negative and non-finite times to zero, trims text, drops lines
/// whose text is blank, then sorts by time. Lines sharing a timestamp keep
/// their input order.
pub fn normalize_lyrics<I>(lines: I) -> Vec<LyricLine>
where
    I: IntoIterator<Item = LyricLine>,
{
    let mut normalized: Vec<LyricLine> = lines
        .into_iter()
        .filter_map(|line| {
            let text = line.text.trim();
            if text.is_empty() {
                return None;
            }
            let time = if line.time.is_finite() {
                line.time.max(0.0)
            } else {
                0.0
            };
            Some(LyricLine::new(time, text))
        })
        .collect();

    normalized.sort_by(|a, b| a.time.total_cmp(&b.time));
    normalized
}

/// Format seconds as a zero-padded `MM:SS` label
///
/// Negative or non-finite input renders as `00:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parse a `M:SS` (or `M:SS.fff`) label into seconds
pub fn parse_time_label(label: &str) -> Option<f64> {
    let mut parts = label.trim().split(':');
    let minutes = parts.next()?.trim();
    let seconds = parts.next()?.trim();
    if minutes.is_empty() || seconds.is_empty() {
        return None;
    }

    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    let total = minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}

/// Parse lyric text with one `MM:SS|text` entry per line
///
/// Blank lines, lines without a parseable time label and lines with empty
/// text are skipped. Text may itself contain `|`.
pub fn parse_lyrics_text(text: &str) -> Vec<LyricLine> {
    let lines = text.lines().filter_map(|raw| {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (label, lyric) = raw.split_once('|')?;
        let time = parse_time_label(label)?;
        let lyric = lyric.trim();
        if lyric.is_empty() {
            return None;
        }
        Some(LyricLine::new(time, lyric))
    });

    normalize_lyrics(lines)
}

/// Render lyric lines back into `MM:SS|text` form
pub fn lyrics_to_text(lines: &[LyricLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{}|{}", format_time(line.time.max(0.0)), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}
