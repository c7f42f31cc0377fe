//! Hint-to-span location.
//!
//! The reviewer quotes the sentence it is complaining about, but the
//! quote is unreliable: re-punctuated, partially paraphrased, sometimes
//! wrapped in quotation marks that are not in the draft. This module
//! maps such a hint back to an exact span of the original text, or
//! reports that it cannot. Everything downstream trusts a finding only
//! once it has survived this resolution.
//!
//! Three tiers, first hit wins:
//! 1. exact substring search of the trimmed hint;
//! 2. search over a case-folded, alphanumeric-only projection of both
//!    sides, mapped back to original offsets;
//! 3. sentence-candidate fuzzy match, accepted at ratio ≥ 0.6.

use crate::similarity;

/// Acceptance floor for the fuzzy tier.
const FUZZY_FLOOR: f64 = 0.6;

/// Fuzzy candidates shorter than this many chars are discarded.
const MIN_CANDIDATE_CHARS: usize = 5;

/// Quote marks trimmed from hint edges, on top of whitespace.
const QUOTES: &[char] = &[
    '"', '\'', '“', '”', '‘', '’', '「', '」', '『', '』', '《', '》', '«', '»',
];

/// Punctuation that ends a fuzzy sentence candidate.
const CANDIDATE_BREAKS: &[char] = &['.', '?', '!', '…', '\n'];

/// A located excerpt: byte range into the original text, always on
/// char boundaries, so `&text[span.start..span.end]` is the excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Slice the located excerpt out of the text this span indexes.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Locate an approximate hint in `full_text`, searching from byte
/// offset `search_from` (must lie on a char boundary). Returns `None`
/// when no tier succeeds.
pub fn locate(full_text: &str, hint: &str, search_from: usize) -> Option<Span> {
    if search_from > full_text.len() || !full_text.is_char_boundary(search_from) {
        return None;
    }
    let scope = &full_text[search_from..];

    let trimmed = hint.trim_matches(|c: char| c.is_whitespace() || QUOTES.contains(&c));
    if trimmed.is_empty() {
        return None;
    }

    // Tier 1: exact.
    if let Some(pos) = scope.find(trimmed) {
        return Some(Span {
            start: search_from + pos,
            end: search_from + pos + trimmed.len(),
        });
    }

    // Tier 2: normalized projection.
    if let Some(span) = locate_normalized(scope, trimmed) {
        return Some(Span {
            start: search_from + span.start,
            end: search_from + span.end,
        });
    }

    // Tier 3: sentence-candidate fuzzy.
    if let Some(span) = locate_fuzzy(scope, trimmed) {
        return Some(Span {
            start: search_from + span.start,
            end: search_from + span.end,
        });
    }

    None
}

/// Case-folded, alphanumeric-only projection of the scope, searched for
/// the same projection of the hint. A match is mapped back to original
/// byte offsets through the per-char offset table built during the
/// single forward scan.
fn locate_normalized(scope: &str, hint: &str) -> Option<Span> {
    let (scope_chars, offsets) = project(scope);
    let (hint_chars, _) = project(hint);

    if hint_chars.is_empty() || hint_chars.len() > scope_chars.len() {
        return None;
    }

    let pos = scope_chars
        .windows(hint_chars.len())
        .position(|w| w == hint_chars.as_slice())?;

    let (start, _) = offsets[pos];
    let (_, end) = offsets[pos + hint_chars.len() - 1];
    Some(Span { start, end })
}

/// Project text to lowercase alphanumeric chars, recording for each
/// surviving char the byte range it occupied in the source.
fn project(text: &str) -> (Vec<char>, Vec<(usize, usize)>) {
    let mut chars = Vec::new();
    let mut offsets = Vec::new();

    for (pos, c) in text.char_indices() {
        if c.is_alphanumeric() {
            let folded = c.to_lowercase().next().unwrap_or(c);
            chars.push(folded);
            offsets.push((pos, pos + c.len_utf8()));
        }
    }

    (chars, offsets)
}

/// Split the scope into sentence candidates, score each against the
/// hint, and accept the best candidate at or above the floor.
fn locate_fuzzy(scope: &str, hint: &str) -> Option<Span> {
    let mut best: Option<(Span, f64)> = None;

    for (range_start, candidate) in sentence_candidates(scope) {
        if candidate.chars().count() < MIN_CANDIDATE_CHARS {
            continue;
        }

        let score = similarity::ratio(candidate, hint);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((
                Span {
                    start: range_start,
                    end: range_start + candidate.len(),
                },
                score,
            ));
        }
    }

    match best {
        Some((span, score)) if score >= FUZZY_FLOOR => Some(span),
        _ => None,
    }
}

/// Candidate sentences with their byte offsets: maximal runs between
/// punctuation/newline breaks, trimmed of surrounding whitespace.
fn sentence_candidates(scope: &str) -> Vec<(usize, &str)> {
    fn push<'a>(scope: &'a str, start: usize, end: usize, out: &mut Vec<(usize, &'a str)>) {
        let raw = &scope[start..end];
        let trimmed = raw.trim_start();
        let lead = raw.len() - trimmed.len();
        let trimmed = trimmed.trim_end();
        if !trimmed.is_empty() {
            out.push((start + lead, trimmed));
        }
    }

    let mut candidates = Vec::new();
    let mut start = 0;

    for (pos, c) in scope.char_indices() {
        if CANDIDATE_BREAKS.contains(&c) {
            push(scope, start, pos, &mut candidates);
            start = pos + c.len_utf8();
        }
    }
    push(scope, start, scope.len(), &mut candidates);

    candidates
}
