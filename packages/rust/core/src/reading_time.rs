//! Reading-time estimate for rendered Markdown.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("fenced code pattern is valid"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("image pattern is valid"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link pattern is valid"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("inline code pattern is valid"));

/// Whole minutes plus leftover seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingTime {
    pub minutes: u64,
    pub seconds: u64,
}

impl ReadingTime {
    /// Estimate for `markdown` at `words_per_minute` (treated as at least 1).
    pub fn estimate(markdown: &str, words_per_minute: u32) -> Self {
        let words = count_words(markdown);
        let wpm = u64::from(words_per_minute.max(1));
        let total_seconds = words * 60 / wpm;
        Self {
            minutes: total_seconds / 60,
            seconds: total_seconds % 60,
        }
    }
}

impl std::fmt::Display for ReadingTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.minutes > 0 {
            parts.push(plural(self.minutes, "minute"));
        }
        if self.seconds > 0 {
            parts.push(plural(self.seconds, "second"));
        }
        if parts.is_empty() {
            f.write_str("Less than a minute")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Words left after stripping code, images and link targets.
pub fn count_words(markdown: &str) -> u64 {
    let text = FENCED_CODE.replace_all(markdown, " ");
    let text = IMAGE.replace_all(&text, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, " ");
    text.split_whitespace().count() as u64
}
