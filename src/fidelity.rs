//! Heuristic fidelity ("hallucination risk") scoring.
//!
//! Compares an original text with its paraphrase and returns a 0–100 risk
//! score: 0 means the rewrite stayed close to the source, 100 means it
//! drifted a long way. Four banded sub-scores are combined with fixed
//! weights:
//!
//! | metric                | weight | measures                               |
//! |-----------------------|--------|----------------------------------------|
//! | length deviation      | 0.15   | normalised length ratio                |
//! | keyword preservation  | 0.35   | content words carried over (stemmed)   |
//! | structural similarity | 0.20   | sentence count ratio                   |
//! | lexical overlap       | 0.30   | Jaccard similarity of word sets        |
//!
//! All four metrics read the normalised text. Normalisation strips sentence
//! terminators, so through [`assess`] structural similarity is always 0.
//!
//! Everything here is pure and deterministic. It is an explainable proxy,
//! not a semantic model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

// Weights in hundredths, so the final rounding is exact.
const W_LENGTH: u32 = 15;
const W_KEYWORDS: u32 = 35;
const W_STRUCTURE: u32 = 20;
const W_LEXICAL: u32 = 30;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "should", "could", "may", "might", "can", "this", "that",
    "these", "those", "it", "its", "which", "who", "what", "when", "where", "why", "how", "all",
    "each", "every", "both", "few", "more", "most", "other", "some", "such", "than", "too",
    "very", "just", "not",
];

static RE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Score breakdown for one (original, rewritten) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityReport {
    /// Weighted, rounded and clamped final score.
    pub score: u8,
    pub length_deviation: u8,
    pub keyword_preservation: u8,
    pub structural_similarity: u8,
    pub lexical_overlap: u8,
}

impl FidelityReport {
    pub fn risk(&self) -> RiskLevel {
        RiskLevel::from_score(self.score)
    }
}

/// Human-readable band for a fidelity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=20 => RiskLevel::Excellent,
            21..=40 => RiskLevel::Good,
            41..=60 => RiskLevel::Moderate,
            61..=80 => RiskLevel::Poor,
            _ => RiskLevel::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Excellent => "Excellent",
            RiskLevel::Good => "Good",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Poor => "Poor",
            RiskLevel::Critical => "Critical",
        }
    }

    /// Display colour name, for UIs that badge the score.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Excellent => "green",
            RiskLevel::Good => "blue",
            RiskLevel::Moderate => "yellow",
            RiskLevel::Poor => "orange",
            RiskLevel::Critical => "red",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Excellent => "Paraphrase maintains original meaning with high fidelity",
            RiskLevel::Good => "Acceptable paraphrase with minor deviations",
            RiskLevel::Moderate => "Noticeable changes; review recommended",
            RiskLevel::Poor => "Significant deviations detected; careful review needed",
            RiskLevel::Critical => "Major content changes or potential hallucinations",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk score in `0..=100` for a paraphrase of `original`.
pub fn score(original: &str, rewritten: &str) -> u8 {
    assess(original, rewritten).score
}

/// Full sub-score breakdown; [`score`] is `assess(..).score`.
pub fn assess(original: &str, rewritten: &str) -> FidelityReport {
    let norm_original = normalize(original);
    let norm_rewritten = normalize(rewritten);

    let length_deviation = length_deviation(&norm_original, &norm_rewritten);
    let keyword_preservation = keyword_preservation(&norm_original, &norm_rewritten);
    let structural_similarity = structural_similarity(&norm_original, &norm_rewritten);
    let lexical_overlap = lexical_overlap(&norm_original, &norm_rewritten);

    let weighted = u32::from(length_deviation) * W_LENGTH
        + u32::from(keyword_preservation) * W_KEYWORDS
        + u32::from(structural_similarity) * W_STRUCTURE
        + u32::from(lexical_overlap) * W_LEXICAL;
    let score = ((weighted + 50) / 100).min(100) as u8;

    FidelityReport {
        score,
        length_deviation,
        keyword_preservation,
        structural_similarity,
        lexical_overlap,
    }
}

/// Lowercase, punctuation to spaces, collapse whitespace, trim.
fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_punct = RE_PUNCT.replace_all(&lower, " ");
    RE_WS.replace_all(&no_punct, " ").trim().to_string()
}

// ── Length deviation ─────────────────────────────────────────────────────────

fn length_deviation(original: &str, rewritten: &str) -> u8 {
    let orig_len = original.chars().count();
    let new_len = rewritten.chars().count();
    let ratio = match (orig_len, new_len) {
        (0, 0) => 1.0,
        (0, _) => f64::INFINITY,
        _ => new_len as f64 / orig_len as f64,
    };

    if (0.7..=1.3).contains(&ratio) {
        0
    } else if (0.5..=1.5).contains(&ratio) {
        20
    } else if (0.3..=2.0).contains(&ratio) {
        50
    } else {
        80
    }
}

// ── Keyword preservation ─────────────────────────────────────────────────────

fn keywords(text: &str) -> HashSet<&str> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .filter(|w| !STOP_WORDS.contains(w))
        .collect()
}

/// Crude stemming: equal on the first 70% of the shorter word.
fn similar(a: &str, b: &str) -> bool {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len < 4 || b_len < 4 {
        return a == b;
    }
    let stem = a_len.min(b_len) * 7 / 10;
    a.chars().take(stem).eq(b.chars().take(stem))
}

fn keyword_preservation(original: &str, rewritten: &str) -> u8 {
    let original_kw = keywords(original);
    if original_kw.is_empty() {
        return 0;
    }
    let rewritten_kw = keywords(rewritten);

    let preserved = original_kw
        .iter()
        .filter(|w| rewritten_kw.contains(*w) || rewritten_kw.iter().any(|r| similar(w, r)))
        .count();
    let rate = preserved as f64 / original_kw.len() as f64;

    if rate >= 0.7 {
        0
    } else if rate >= 0.5 {
        20
    } else if rate >= 0.3 {
        50
    } else if rate >= 0.15 {
        70
    } else {
        90
    }
}

// ── Structural similarity ────────────────────────────────────────────────────

fn sentence_count(text: &str) -> usize {
    RE_SENTENCE_END.find_iter(text).count().max(1)
}

fn structural_similarity(original: &str, rewritten: &str) -> u8 {
    let ratio = sentence_count(rewritten) as f64 / sentence_count(original) as f64;

    if (0.8..=1.2).contains(&ratio) {
        0
    } else if (0.6..=1.4).contains(&ratio) {
        20
    } else if (0.4..=1.8).contains(&ratio) {
        50
    } else {
        80
    }
}

// ── Lexical overlap ──────────────────────────────────────────────────────────

fn lexical_overlap(original: &str, rewritten: &str) -> u8 {
    let a: HashSet<&str> = original.split_whitespace().collect();
    let b: HashSet<&str> = rewritten.split_whitespace().collect();

    let union = a.union(&b).count();
    let jaccard = if union == 0 {
        1.0
    } else {
        a.intersection(&b).count() as f64 / union as f64
    };

    if jaccard >= 0.4 {
        0
    } else if jaccard >= 0.3 {
        20
    } else if jaccard >= 0.2 {
        40
    } else if jaccard >= 0.1 {
        60
    } else {
        80
    }
}
