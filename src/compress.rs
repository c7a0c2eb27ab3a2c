// ABOUTME: Prompt text compression to reduce payload size before provider calls
// ABOUTME: Collapses whitespace runs, caps repeated characters, and dedupes terminal punctuation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Text Compressor
//!
//! Pure prompt compression applied before a call leaves the process. Three
//! rules run in order and never reorder characters:
//!
//! 1. Any whitespace run (including newlines) becomes a single space; both
//!    ends are trimmed.
//! 2. A run of [`CHAR_RUN_THRESHOLD`]+ identical characters is capped at
//!    [`MAX_CHAR_RUN`].
//! 3. A run of 2+ of the sentence-final marks in [`TERMINAL_PUNCTUATION`]
//!    collapses to a single mark.
//!
//! The function is idempotent: `compress_text(compress_text(s)) ==
//! compress_text(s)`.

/// Maximum length a repeated-character run is capped to
pub const MAX_CHAR_RUN: usize = 2;

/// Run length at which repeated-character capping kicks in
pub const CHAR_RUN_THRESHOLD: usize = 3;

/// Sentence-final punctuation marks that never repeat after compression
pub const TERMINAL_PUNCTUATION: [char; 3] = ['。', '！', '？'];

/// Compress prompt text for transmission
///
/// Pure and total; see the module docs for the rule set.
#[must_use]
pub fn compress_text(text: &str) -> String {
    collapse_terminal_punctuation(&cap_char_runs(&collapse_whitespace(text)))
}

/// Ratio of compressed length to original length in characters (1.0 = no gain)
///
/// Used for debug logging only. Empty input reports 1.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compression_ratio(original: &str, compressed: &str) -> f64 {
    let before = original.chars().count();
    if before == 0 {
        return 1.0;
    }
    compressed.chars().count() as f64 / before as f64
}

/// Rule 1: collapse whitespace runs to a single space and trim both ends
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
        } else {
            if in_whitespace && !out.is_empty() {
                out.push(' ');
            }
            in_whitespace = false;
            out.push(ch);
        }
    }

    out
}

/// Rule 2: cap runs of 3+ identical characters at exactly 2
fn cap_char_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut run_len = 0usize;

    for ch in text.chars() {
        if prev == Some(ch) {
            run_len += 1;
        } else {
            prev = Some(ch);
            run_len = 1;
        }
        if run_len <= MAX_CHAR_RUN {
            out.push(ch);
        }
    }

    out
}

/// Rule 3: collapse runs of 2+ terminal punctuation marks to a single mark
fn collapse_terminal_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if prev == Some(ch) && TERMINAL_PUNCTUATION.contains(&ch) {
            continue;
        }
        prev = Some(ch);
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_collapse_and_trim() {
        assert_eq!(compress_text("  你好   世界\n\n再见  "), "你好 世界 再见");
    }

    #[test]
    fn test_char_run_capping() {
        assert_eq!(compress_text("哈哈哈哈哈"), "哈哈");
        assert_eq!(compress_text("aaabbbbcc"), "aabbcc");
    }

    #[test]
    fn test_terminal_punctuation_collapse() {
        assert_eq!(compress_text("太好了！！！"), "太好了！");
        assert_eq!(compress_text("什么？？结束。。"), "什么？结束。");
    }

    #[test]
    fn test_non_terminal_punctuation_keeps_pairs() {
        // Rule 2 caps at two; rule 3 only collapses the terminal marks further
        assert_eq!(compress_text("嗯…………"), "嗯……");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "  多  余   空白\t\t和换行\n\n\n啊啊啊啊！！！。。。",
            "plain ascii with   runs!!!! and spaces",
            "",
            "。！？。！？",
        ];
        for input in inputs {
            let once = compress_text(input);
            assert_eq!(compress_text(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_compression_ratio_empty_input() {
        assert!((compression_ratio("", "") - 1.0).abs() < f64::EPSILON);
    }
}
