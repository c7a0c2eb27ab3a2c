// ABOUTME: Five-check quality scoring pipeline for generated fiction text
// ABOUTME: Scores length, repetition, coherence, genre style, and sensitive content
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Quality Detection Engine
//!
//! [`detect_quality`] scores a fully-materialized generation along five
//! independent axes and derives two reader-engagement estimates. The checks
//! never short-circuit each other; every issue carries a severity whose
//! penalty is subtracted from a starting score of 100.
//!
//! All heuristic bounds live in [`QualityThresholds`] so the pipeline can be
//! tuned without code changes. Character counts use `chars()`, not bytes —
//! the scored text is Chinese fiction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Keyword Tables
// ============================================================================

/// Transition words that mark a deliberate paragraph hand-off
pub const TRANSITION_WORDS: [&str; 7] = ["然后", "接着", "于是", "然而", "但是", "因此", "所以"];

/// Payoff markers counted as satisfaction points
pub const SATISFACTION_KEYWORDS: [&str; 12] = [
    "逆袭", "打脸", "反转", "翻盘", "碾压", "震惊", "爆发", "突破", "觉醒", "崛起", "扬眉吐气",
    "一鸣惊人",
];

/// Terms flagged by the sensitive-content scan
pub const SENSITIVE_WORDS: [&str; 5] = ["赌博", "毒品", "枪支", "诈骗", "走私"];

static SATISFACTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SATISFACTION_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).expect("satisfaction keyword pattern is valid")
});

/// Fixed vocabulary expected for a known genre
#[must_use]
pub fn genre_keywords(genre: &str) -> Option<&'static [&'static str]> {
    match genre {
        "urban" => Some(&["都市", "职场", "公司", "老板", "地铁", "手机", "合同", "加班"]),
        "fantasy" => Some(&["修炼", "灵气", "宗门", "功法", "丹药", "境界", "长老", "妖兽"]),
        "romance" => Some(&["心动", "告白", "拥抱", "约会", "温柔", "心跳", "牵手", "默契"]),
        "mystery" => Some(&["线索", "真相", "嫌疑", "死者", "现场", "推理", "秘密", "调查"]),
        "scifi" => Some(&["飞船", "星际", "人工智能", "基因", "殖民", "机甲", "文明", "曲率"]),
        _ => None,
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Heuristic bounds for the scoring pipeline
///
/// Design choices rather than data-derived requirements; override any of
/// them via [`detect_quality_with`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Content below this many chars is flagged too short
    pub min_length: usize,
    /// Length suggested to callers when content is too short
    pub suggested_min_length: usize,
    /// Content above this many chars is flagged for splitting
    pub max_length: usize,
    /// Jaccard similarity above which two paragraphs count as a duplicate pair
    pub duplicate_similarity: f64,
    /// Duplicate pairs tolerated before the repetition issue fires
    pub max_duplicates: usize,
    /// Characters taken from each side of a paragraph boundary
    pub coherence_window: usize,
    /// Jaccard similarity above which boundary windows count as connected
    pub coherence_similarity: f64,
    /// Minimum fraction of connected boundaries before the coherence issue fires
    pub min_coherence_ratio: f64,
    /// Minimum genre keyword hit ratio before the style issue fires
    pub min_style_match: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_length: 300,
            suggested_min_length: 500,
            max_length: 5000,
            duplicate_similarity: 0.8,
            max_duplicates: 3,
            coherence_window: 20,
            coherence_similarity: 0.2,
            min_coherence_ratio: 0.6,
            min_style_match: 0.5,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Issue severity; determines the score penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor issue (-2)
    Low,
    /// Notable issue (-5)
    Medium,
    /// Serious issue (-10)
    High,
}

impl Severity {
    /// Score penalty for one issue of this severity
    #[must_use]
    pub const fn penalty(&self) -> u32 {
        match self {
            Self::Low => 2,
            Self::Medium => 5,
            Self::High => 10,
        }
    }
}

/// Which check produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Length bounds check
    Length,
    /// Duplicate-paragraph check
    Repetition,
    /// Paragraph-transition check
    Coherence,
    /// Genre vocabulary check
    Style,
    /// Sensitive-content scan
    Sensitive,
}

/// One issue found by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Producing check
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Severity driving the penalty
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

/// Result of scoring one generated text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityResult {
    /// 0-100 composite score
    pub score: u32,
    /// Issues from every check, in check order
    pub issues: Vec<QualityIssue>,
    /// One improvement suggestion per issue, not deduplicated
    pub suggestions: Vec<String>,
    /// Estimated reader completion rate 0-100
    pub estimated_completion_rate: u32,
    /// Payoff keyword hit count
    pub satisfaction_points: u32,
}

/// Score derived from a set of issues: `max(0, 100 - Σ penalty)`
#[must_use]
pub fn score_from_issues(issues: &[QualityIssue]) -> u32 {
    let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
    100u32.saturating_sub(penalty)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Score generated text with the default thresholds
#[must_use]
pub fn detect_quality(content: &str, genre: &str) -> QualityResult {
    detect_quality_with(content, genre, &QualityThresholds::default())
}

/// Score generated text with explicit thresholds
///
/// Total over any finite input; empty content returns a valid (low) score.
#[must_use]
pub fn detect_quality_with(
    content: &str,
    genre: &str,
    thresholds: &QualityThresholds,
) -> QualityResult {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut push = |issue: QualityIssue, suggestion: String| {
        issues.push(issue);
        suggestions.push(suggestion);
    };

    check_length(content, thresholds, &mut push);
    check_repetition(content, thresholds, &mut push);
    check_coherence(content, thresholds, &mut push);
    check_style(content, genre, thresholds, &mut push);
    check_sensitive(content, &mut push);

    let score = score_from_issues(&issues);
    let satisfaction_points = count_satisfaction_points(content);
    let estimated_completion_rate = completion_rate(score, satisfaction_points);

    QualityResult {
        score,
        issues,
        suggestions,
        estimated_completion_rate,
        satisfaction_points,
    }
}

/// Count payoff keyword hits in the content
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn count_satisfaction_points(content: &str) -> u32 {
    SATISFACTION_PATTERN.find_iter(content).count() as u32
}

/// `min(100, round(score * 0.6 + satisfaction_points * 5))`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn completion_rate(score: u32, satisfaction_points: u32) -> u32 {
    let estimate = f64::from(score).mul_add(0.6, f64::from(satisfaction_points) * 5.0);
    (estimate.round() as u32).min(100)
}

fn check_length(
    content: &str,
    thresholds: &QualityThresholds,
    push: &mut impl FnMut(QualityIssue, String),
) {
    let chars = content.chars().count();
    if chars < thresholds.min_length {
        push(
            QualityIssue {
                kind: IssueKind::Length,
                severity: Severity::Medium,
                message: format!(
                    "content too short ({chars} chars); aim for at least {} chars",
                    thresholds.suggested_min_length
                ),
            },
            "expand the scene with sensory detail and character interiority".to_owned(),
        );
    } else if chars > thresholds.max_length {
        push(
            QualityIssue {
                kind: IssueKind::Length,
                severity: Severity::Low,
                message: format!("content very long ({chars} chars); consider splitting into sections"),
            },
            "break the chapter at a natural scene boundary".to_owned(),
        );
    }
}

/// Count paragraph pairs whose character-set similarity exceeds `threshold`
#[must_use]
pub fn count_duplicate_paragraphs(content: &str, threshold: f64) -> usize {
    let sets: Vec<HashSet<char>> = paragraphs(content).map(char_set).collect();

    let mut duplicates = 0;
    for (i, current) in sets.iter().enumerate() {
        for earlier in &sets[..i] {
            if jaccard(current, earlier) > threshold {
                duplicates += 1;
            }
        }
    }
    duplicates
}

fn check_repetition(
    content: &str,
    thresholds: &QualityThresholds,
    push: &mut impl FnMut(QualityIssue, String),
) {
    let duplicates = count_duplicate_paragraphs(content, thresholds.duplicate_similarity);
    if duplicates > thresholds.max_duplicates {
        push(
            QualityIssue {
                kind: IssueKind::Repetition,
                severity: Severity::High,
                message: format!("{duplicates} duplicate sections found"),
            },
            "rewrite repeated passages or merge them into one".to_owned(),
        );
    }
}

fn check_coherence(
    content: &str,
    thresholds: &QualityThresholds,
    push: &mut impl FnMut(QualityIssue, String),
) {
    let paras: Vec<&str> = paragraphs(content).collect();
    if paras.len() < 2 {
        return;
    }

    let mut connected = 0usize;
    for pair in paras.windows(2) {
        let tail: String = last_chars(pair[0], thresholds.coherence_window);
        let head: String = pair[1].chars().take(thresholds.coherence_window).collect();

        let has_transition = TRANSITION_WORDS
            .iter()
            .any(|w| tail.contains(w) || head.contains(w));
        let windows_overlap =
            jaccard(&char_set(&tail), &char_set(&head)) > thresholds.coherence_similarity;

        if has_transition || windows_overlap {
            connected += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = connected as f64 / (paras.len() - 1) as f64;
    if ratio < thresholds.min_coherence_ratio {
        push(
            QualityIssue {
                kind: IssueKind::Coherence,
                severity: Severity::Medium,
                message: "paragraph transitions feel abrupt".to_owned(),
            },
            "add connective phrases or carry an image across the boundary".to_owned(),
        );
    }
}

fn check_style(
    content: &str,
    genre: &str,
    thresholds: &QualityThresholds,
    push: &mut impl FnMut(QualityIssue, String),
) {
    // Unknown genre: no vocabulary to match against, no penalty
    let Some(keywords) = genre_keywords(genre) else {
        return;
    };

    let hits = keywords.iter().filter(|k| content.contains(*k)).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = hits as f64 / keywords.len() as f64;
    if ratio < thresholds.min_style_match {
        push(
            QualityIssue {
                kind: IssueKind::Style,
                severity: Severity::Low,
                message: format!("style drifts from target genre ({genre})"),
            },
            "work genre-typical settings and vocabulary into the scene".to_owned(),
        );
    }
}

fn check_sensitive(content: &str, push: &mut impl FnMut(QualityIssue, String)) {
    let hits: usize = SENSITIVE_WORDS.iter().map(|w| content.matches(w).count()).sum();
    if hits > 0 {
        push(
            QualityIssue {
                kind: IssueKind::Sensitive,
                severity: Severity::High,
                message: format!("{hits} sensitive term hits"),
            },
            "remove or rephrase the flagged terms".to_owned(),
        );
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn paragraphs(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n').map(str::trim).filter(|p| !p.is_empty())
}

fn char_set(paragraph: &str) -> HashSet<char> {
    paragraph.to_lowercase().chars().collect()
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &HashSet<char>, b: &HashSet<char>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn last_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    s.chars().skip(total.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_scores_without_panic() {
        let result = detect_quality("", "urban");
        assert!(result.score <= 100);
        // Short-length issue fires even for empty input
        assert!(result
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::Length && i.severity == Severity::Medium));
        assert_eq!(result.satisfaction_points, 0);
    }

    #[test]
    fn test_identical_paragraph_pair_counts_once() {
        let content = "他推开门，看见满屋的人都站了起来。\n他推开门，看见满屋的人都站了起来。\nxyz123";
        assert_eq!(count_duplicate_paragraphs(content, 0.8), 1);
    }

    #[test]
    fn test_disjoint_paragraphs_not_flagged() {
        let content = "春风又绿江南岸。\nwholly different latin text";
        assert_eq!(count_duplicate_paragraphs(content, 0.8), 0);
    }

    #[test]
    fn test_unknown_genre_no_style_penalty() {
        let long_enough = "平淡的句子。".repeat(100);
        let result = detect_quality(&long_enough, "nonexistent-genre");
        assert!(!result.issues.iter().any(|i| i.kind == IssueKind::Style));
    }

    #[test]
    fn test_sensitive_scan_counts_hits() {
        let content = format!("{}这里提到了赌博，又提到了赌博。", "正常内容。".repeat(80));
        let result = detect_quality(&content, "urban");
        let issue = result
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::Sensitive)
            .expect("sensitive issue expected");
        assert_eq!(issue.severity, Severity::High);
        assert!(issue.message.contains('2'));
    }

    #[test]
    fn test_satisfaction_points_counted() {
        let content = "主角终于逆袭成功，当众打脸反派，剧情迎来反转。";
        assert_eq!(count_satisfaction_points(content), 3);
    }

    #[test]
    fn test_completion_rate_capped_at_100() {
        assert_eq!(completion_rate(100, 50), 100);
        assert_eq!(completion_rate(90, 2), 64);
    }

    #[test]
    fn test_suggestions_pair_with_issues() {
        let result = detect_quality("短", "urban");
        assert_eq!(result.issues.len(), result.suggestions.len());
    }
}
