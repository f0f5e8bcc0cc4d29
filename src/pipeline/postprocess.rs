//! Post-processing: deterministic cleanup of raw rewrite output.
//!
//! Models are asked to return only the rewritten text, but they occasionally
//! wrap it in code fences, open with a "Here is the paraphrased text:" line,
//! or leak Windows line endings and zero-width characters. These rules undo
//! those quirks without touching the content itself.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the fence and preamble patterns only
//! ever see `\n`; whitespace trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one raw backend response.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Drop a leading "Here is the paraphrased text:" style preamble
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to one blank line
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim the whole response
pub fn clean_rewrite(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    let s = strip_preamble(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Drop chatty preamble ─────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:sure[,!.]?\s*)?here(?:'s| is) (?:the|a|your) (?:paraphrased|rewritten|reworded)[^\n]*:[ \t]*\n+",
    )
    .unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
