//! Completion cleanup: deterministic normalisation of model output before
//! parsing.
//!
//! The prompt instructs the model to emit JSON only, but models are known to
//! wrap the object in a Markdown code fence anyway. Cleanup runs on every
//! completion, fenced or not — it is a normalisation pass, not a repair
//! branch — and every rule is idempotent, so a second application is a
//! no-op. Each rule is a pure `&str → String` function, independently
//! testable.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw completion.
///
/// Rules (applied in order):
/// 1. Strip an enclosing code fence (with or without a language tag)
/// 2. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim surrounding whitespace
pub fn clean_completion(raw: &str) -> String {
    let s = strip_code_fences(raw);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip code fences ────────────────────────────────────────────────

static RE_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

/// Strip an opening and/or closing triple-backtick fence.
///
/// The opening and closing fences are stripped independently so a truncated
/// completion that lost its closing fence still cleans up.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let s = RE_FENCE_OPEN.replace(trimmed, "");
    let s = RE_FENCE_CLOSE.replace(&s, "");
    s.trim().to_string()
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
