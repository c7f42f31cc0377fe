//! Free-text name resolution.
//!
//! Maps a name as typed by an author (or echoed back by the reviewer)
//! to a canonical character id. A tiered cascade, first hit wins, so an
//! exact match can never lose to a fuzzy one.

use crate::canon::CharacterRecord;
use crate::similarity;

/// Acceptance floor for the similarity fallback tier.
const NAME_SIMILARITY_FLOOR: f64 = 0.4;

/// Punctuation and spacing stripped during normalization.
const STRIPPED: &[char] = &[
    ' ', '\t', '.', ',', '·', '-', '_', '\'', '"', '(', ')', '[', ']', '!', '?',
];

/// Resolve a free-text name to a canonical character id.
///
/// Tiers, in fixed order: exact equality, normalized equality,
/// normalized containment (either direction), normalized in-order
/// subsequence, then a similarity fallback accepted at ratio ≥ 0.4.
/// Names and aliases both participate in every tier.
pub fn resolve_name<'a>(query: &str, candidates: &'a [CharacterRecord]) -> Option<&'a str> {
    let query = query.trim();
    if query.is_empty() || candidates.is_empty() {
        return None;
    }

    // Tier 1: exact.
    for record in candidates {
        if record_names(record).any(|n| n == query) {
            return Some(record.id.as_str());
        }
    }

    let norm_query = normalize(query);

    // Tier 2: normalized equality.
    if !norm_query.is_empty() {
        for record in candidates {
            if record_names(record).any(|n| normalize(n) == norm_query) {
                return Some(record.id.as_str());
            }
        }

        // Tier 3: normalized containment, either direction.
        for record in candidates {
            if record_names(record).any(|n| {
                let norm = normalize(n);
                !norm.is_empty() && (norm.contains(&norm_query) || norm_query.contains(&norm))
            }) {
                return Some(record.id.as_str());
            }
        }

        // Tier 4: normalized in-order subsequence.
        for record in candidates {
            if record_names(record).any(|n| is_subsequence(&norm_query, &normalize(n))) {
                return Some(record.id.as_str());
            }
        }
    }

    // Tier 5: similarity fallback over the raw strings.
    let mut best: Option<(&str, f64)> = None;
    for record in candidates {
        for name in record_names(record) {
            let score = similarity::ratio(query, name);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((record.id.as_str(), score));
            }
        }
    }

    match best {
        Some((id, score)) if score >= NAME_SIMILARITY_FLOOR => Some(id),
        _ => None,
    }
}

fn record_names(record: &CharacterRecord) -> impl Iterator<Item = &str> {
    std::iter::once(record.name.as_str()).chain(record.aliases.iter().map(String::as_str))
}

/// Lowercase and strip spacing/punctuation.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !STRIPPED.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when every char of `needle` appears in `haystack` in order,
/// not necessarily contiguously.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut chars = needle.chars();
    let mut current = chars.next();

    for c in haystack.chars() {
        if Some(c) == current {
            current = chars.next();
            if current.is_none() {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<CharacterRecord> {
        vec![
            CharacterRecord::new("강백호").with_alias("백호"),
            CharacterRecord::new("서태웅"),
            CharacterRecord::new("Gandalf the Grey").with_alias("Mithrandir"),
        ]
    }

    fn resolve<'a>(query: &str, records: &'a [CharacterRecord]) -> Option<&'a str> {
        resolve_name(query, records)
    }

    #[test]
    fn test_exact_match() {
        let records = candidates();
        assert_eq!(resolve("강백호", &records), Some(records[0].id.as_str()));
        assert_eq!(resolve("Mithrandir", &records), Some(records[2].id.as_str()));
    }

    #[test]
    fn test_exact_beats_fuzzy() {
        // "서태웅" is an exact hit for record 1 even though record 0
        // would survive the fuzzy tier for some queries.
        let records = vec![
            CharacterRecord::new("서태웅의 형"),
            CharacterRecord::new("서태웅"),
        ];
        assert_eq!(resolve("서태웅", &records), Some(records[1].id.as_str()));
    }

    #[test]
    fn test_normalized_equality() {
        let records = candidates();
        assert_eq!(
            resolve("gandalf the grey", &records),
            Some(records[2].id.as_str())
        );
        assert_eq!(
            resolve("강 백호", &records),
            Some(records[0].id.as_str())
        );
    }

    #[test]
    fn test_normalized_containment() {
        let records = candidates();
        // Query inside candidate.
        assert_eq!(resolve("gandalf", &records), Some(records[2].id.as_str()));
        // Candidate inside query.
        assert_eq!(
            resolve("그 유명한 강백호 선수", &records),
            Some(records[0].id.as_str())
        );
    }

    #[test]
    fn test_subsequence() {
        let records = candidates();
        // g-a-n-d-g-r-e-y in order within "gandalfthegrey".
        assert_eq!(resolve("gandgrey", &records), Some(records[2].id.as_str()));
    }

    #[test]
    fn test_similarity_fallback() {
        let records = vec![CharacterRecord::new("Mithrandir")];
        // One transposed pair: not a subsequence, but well above 0.4.
        assert_eq!(resolve("Mithrandri", &records), Some(records[0].id.as_str()));
    }

    #[test]
    fn test_zero_overlap_never_resolves() {
        let records = candidates();
        assert_eq!(resolve("아무개", &records), None);
    }

    #[test]
    fn test_blank_query() {
        let records = candidates();
        assert_eq!(resolve("   ", &records), None);
    }

    #[test]
    fn test_below_floor_rejected() {
        let records = vec![CharacterRecord::new("abcdefghij")];
        // Two shared chars over ten: ratio 0.2, under the 0.4 floor.
        assert_eq!(resolve("azczzzzzzz", &records), None);
    }
}
