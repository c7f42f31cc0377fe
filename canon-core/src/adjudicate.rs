//! Candidate adjudication and merging.
//!
//! Every reviewer finding passes a sequence of gates before it may
//! reach the caller, and can be discarded at each one:
//!
//! anchor-validated → sentence-located → non-conflict-filtered →
//! resolution-checked → severity-filtered → merged
//!
//! A finding whose anchor reference matches nothing in the live pool,
//! or whose quoted sentence cannot be located in the draft, is a
//! hallucination and is dropped silently. Placeholder issues from a
//! degraded reviewer skip the gates: they exist to make the failure
//! visible, and no gate could validate them.

use crate::anchors::AnchorPool;
use crate::issues::{CandidateIssue, IssueCategory, ReportedIssue, Severity};
use crate::locate::{locate, Span};
use crate::oracle::{check_resolution, Oracle};
use futures::future::join_all;

/// Findings per concurrently dispatched resolution-check batch.
const RESOLUTION_BATCH: usize = 5;

/// Cap on merged rationales.
const MAX_MERGED_REASONS: usize = 3;

/// Hedge phrases that mark a rationale as inference, absence-based
/// reasoning, or ambiguity rather than a direct contradiction.
const HEDGE_PHRASES: &[&str] = &[
    "일 수 있",
    "수도 있",
    "가능성이",
    "암시",
    "추정",
    "불분명",
    "모호",
    "확실하지 않",
    "언급되지 않",
    "나와 있지 않",
    "명시되지 않",
    "단정할 수 없",
    "might be",
    "may be",
    "could be",
    "possibly",
    "not mentioned",
    "not stated",
    "unclear",
    "ambiguous",
    "uncertain",
    "implied",
];

/// A candidate that survived anchor validation and sentence location.
struct Located {
    issue: CandidateIssue,
    span: Span,
    sentence: String,
}

/// Run every gate over the candidates and return the final issue list,
/// ordered by located position. Placeholder issues are deduplicated and
/// reported first.
pub async fn adjudicate(
    oracle: &dyn Oracle,
    candidates: Vec<CandidateIssue>,
    pool: &AnchorPool,
    full_text: &str,
    threshold: Severity,
) -> Vec<ReportedIssue> {
    let (placeholders, candidates): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|c| c.sentence_hint == crate::oracle::PLACEHOLDER_HINT);

    let located = validate_candidates(candidates, pool, full_text);
    let unresolved = filter_resolved(oracle, located, full_text).await;

    let surviving: Vec<Located> = unresolved
        .into_iter()
        .filter(|l| l.issue.severity.rank() >= threshold.rank())
        .collect();

    let mut issues = Vec::new();
    if let Some(placeholder) = placeholders.into_iter().next() {
        issues.push(ReportedIssue {
            category: placeholder.category.label().to_string(),
            title: placeholder.title,
            sentence: placeholder.sentence_hint,
            reason: placeholder.reason,
            severity: placeholder.severity,
            rewrite: None,
        });
    }
    issues.extend(merge_by_sentence(surviving));
    issues
}

/// Gates 1–3: anchor validation, sentence location, hedge filter.
fn validate_candidates(
    candidates: Vec<CandidateIssue>,
    pool: &AnchorPool,
    full_text: &str,
) -> Vec<Located> {
    let mut located = Vec::new();

    for candidate in candidates {
        if pool.best_match(&candidate.anchor_ref).is_none() {
            tracing::debug!(title = %candidate.title, "discarding: anchor reference matches nothing");
            continue;
        }

        let Some(span) = locate(full_text, &candidate.sentence_hint, 0) else {
            tracing::debug!(title = %candidate.title, "discarding: sentence not found in draft");
            continue;
        };

        let reason = candidate.reason.to_lowercase();
        if HEDGE_PHRASES.iter().any(|p| reason.contains(p)) {
            tracing::debug!(title = %candidate.title, "discarding: hedged rationale");
            continue;
        }

        let sentence = span.slice(full_text).to_string();
        located.push(Located {
            issue: candidate,
            span,
            sentence,
        });
    }

    located
}

/// Gate 4: drop findings the draft itself later resolves. Batches are
/// dispatched concurrently; a failed check keeps the finding.
async fn filter_resolved(
    oracle: &dyn Oracle,
    located: Vec<Located>,
    full_text: &str,
) -> Vec<Located> {
    let batches: Vec<Vec<Located>> = {
        let mut batches = Vec::new();
        let mut iter = located.into_iter().peekable();
        while iter.peek().is_some() {
            batches.push(iter.by_ref().take(RESOLUTION_BATCH).collect());
        }
        batches
    };

    let checked = join_all(batches.into_iter().map(|batch| async move {
        let verdicts = join_all(
            batch
                .iter()
                .map(|l| check_resolution(oracle, &l.issue, full_text)),
        )
        .await;

        batch
            .into_iter()
            .zip(verdicts)
            .filter_map(|(l, resolved)| {
                if resolved {
                    tracing::debug!(title = %l.issue.title, "discarding: resolved later in draft");
                    None
                } else {
                    Some(l)
                }
            })
            .collect::<Vec<_>>()
    }))
    .await;

    checked.into_iter().flatten().collect()
}

/// Gate 6: group by identical located sentence text. Singletons pass
/// through; groups collapse into one mixed issue.
fn merge_by_sentence(surviving: Vec<Located>) -> Vec<ReportedIssue> {
    let mut groups: Vec<(String, Vec<Located>)> = Vec::new();

    for item in surviving {
        match groups.iter_mut().find(|(sentence, _)| *sentence == item.sentence) {
            Some((_, members)) => members.push(item),
            None => groups.push((item.sentence.clone(), vec![item])),
        }
    }

    groups.sort_by_key(|(_, members)| members[0].span.start);

    groups
        .into_iter()
        .map(|(sentence, members)| {
            if members.len() == 1 {
                let Located { issue, .. } = members.into_iter().next().expect("singleton group");
                ReportedIssue {
                    category: issue.category.label().to_string(),
                    title: issue.title,
                    sentence,
                    reason: issue.reason,
                    severity: issue.severity,
                    rewrite: issue.rewrite,
                }
            } else {
                merge_group(sentence, members)
            }
        })
        .collect()
}

fn merge_group(sentence: String, members: Vec<Located>) -> ReportedIssue {
    let title = members
        .iter()
        .map(|l| l.issue.category.label())
        .collect::<Vec<_>>()
        .join("/");

    let mut reasons: Vec<String> = Vec::new();
    for member in &members {
        let reason = member.issue.reason.trim();
        if !reason.is_empty() && !reasons.iter().any(|r| r == reason) {
            reasons.push(reason.to_string());
            if reasons.len() == MAX_MERGED_REASONS {
                break;
            }
        }
    }

    let severity = members
        .iter()
        .map(|l| l.issue.severity)
        .max()
        .unwrap_or(Severity::Low);

    let rewrite = members.into_iter().find_map(|l| l.issue.rewrite);

    ReportedIssue {
        category: IssueCategory::Mixed.label().to_string(),
        title,
        sentence,
        reason: reasons.join("\n"),
        severity,
        rewrite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::{CanonSnapshot, CharacterRecord};
    use crate::oracle::placeholder_issue;
    use crate::testing::ScriptedOracle;
    use serde_json::json;

    const DRAFT: &str = "그는 왼손으로 검을 휘둘렀다. 마을은 아침부터 소란스러웠다.";

    fn pool() -> AnchorPool {
        let snapshot = CanonSnapshot {
            characters: vec![CharacterRecord::new("hero")
                .with_attributes(json!({"injury": "left_arm_broken"}))],
            ..Default::default()
        };
        AnchorPool::from_snapshot(&snapshot)
    }

    fn candidate(title: &str, severity: Severity) -> CandidateIssue {
        CandidateIssue {
            category: IssueCategory::Character,
            title: title.to_string(),
            sentence_hint: "왼손으로 검을 휘둘렀다".to_string(),
            anchor_ref: "character[hero].injury = left_arm_broken".to_string(),
            reason: "왼팔이 부러진 상태와 직접 모순된다".to_string(),
            rewrite: None,
            severity,
        }
    }

    #[tokio::test]
    async fn test_valid_candidate_is_emitted() {
        let oracle = ScriptedOracle::new();
        let issues = adjudicate(
            &oracle,
            vec![candidate("부상 모순", Severity::High)],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].sentence, "왼손으로 검을 휘둘렀다");
        assert_eq!(issues[0].category, "character");
    }

    #[tokio::test]
    async fn test_unknown_anchor_is_discarded() {
        let oracle = ScriptedOracle::new();
        let mut bad = candidate("근거 없음", Severity::High);
        bad.anchor_ref = "전혀 무관한 근거".to_string();

        let issues = adjudicate(&oracle, vec![bad], &pool(), DRAFT, Severity::Low).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_unlocatable_sentence_is_discarded() {
        let oracle = ScriptedOracle::new();
        let mut bad = candidate("환각 인용", Severity::High);
        bad.sentence_hint = "본문에 존재하지 않는 문장이다".to_string();

        let issues = adjudicate(&oracle, vec![bad], &pool(), DRAFT, Severity::Low).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_hedged_rationale_is_discarded() {
        let oracle = ScriptedOracle::new();
        let mut hedged = candidate("추측", Severity::High);
        hedged.reason = "왼팔을 쓰는 것이 모순일 수 있다".to_string();

        let issues = adjudicate(&oracle, vec![hedged], &pool(), DRAFT, Severity::Low).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_issue_is_discarded() {
        let oracle = ScriptedOracle::new();
        oracle.push_json(json!({"resolved": true}));

        let issues = adjudicate(
            &oracle,
            vec![candidate("부상 모순", Severity::High)],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;

        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_severity_threshold_filters() {
        let oracle = ScriptedOracle::new();
        let issues = adjudicate(
            &oracle,
            vec![candidate("낮은 심각도", Severity::Low)],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;
        assert!(issues.is_empty());

        let issues = adjudicate(
            &oracle,
            vec![candidate("낮은 심각도", Severity::Low)],
            &pool(),
            DRAFT,
            Severity::Low,
        )
        .await;
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn test_same_sentence_issues_merge() {
        let oracle = ScriptedOracle::new();
        let mut world_side = candidate("세계관 모순", Severity::Low);
        world_side.category = IssueCategory::World;
        world_side.reason = "설정과 어긋난다".to_string();

        let issues = adjudicate(
            &oracle,
            vec![candidate("부상 모순", Severity::High), world_side],
            &pool(),
            DRAFT,
            Severity::Low,
        )
        .await;

        assert_eq!(issues.len(), 1);
        let merged = &issues[0];
        assert_eq!(merged.category, "mixed");
        assert_eq!(merged.title, "character/world");
        assert_eq!(merged.severity, Severity::High);
        assert!(merged.reason.contains("직접 모순"));
        assert!(merged.reason.contains("설정과 어긋난다"));
    }

    #[tokio::test]
    async fn test_merged_reasons_dedup_and_cap() {
        let oracle = ScriptedOracle::new();
        let mut members = Vec::new();
        for i in 0..5 {
            let mut c = candidate(&format!("겹침 {i}"), Severity::Medium);
            // Two duplicates among five.
            c.reason = format!("사유 {}", i.min(3));
            members.push(c);
        }

        let issues = adjudicate(&oracle, members, &pool(), DRAFT, Severity::Low).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].reason.lines().count(), MAX_MERGED_REASONS);
    }

    #[tokio::test]
    async fn test_issues_ordered_by_position() {
        let oracle = ScriptedOracle::new();
        let mut late = candidate("마을 소란", Severity::High);
        late.sentence_hint = "마을은 아침부터 소란스러웠다".to_string();
        late.anchor_ref = "character[hero].injury = left_arm_broken".to_string();

        let issues = adjudicate(
            &oracle,
            vec![late, candidate("부상 모순", Severity::High)],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].sentence, "왼손으로 검을 휘둘렀다");
        assert_eq!(issues[1].sentence, "마을은 아침부터 소란스러웠다");
    }

    #[tokio::test]
    async fn test_placeholder_skips_gates() {
        let oracle = ScriptedOracle::new();
        let issues = adjudicate(
            &oracle,
            vec![placeholder_issue("timeout")],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].sentence, crate::oracle::PLACEHOLDER_HINT);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_placeholders_deduplicate() {
        let oracle = ScriptedOracle::new();
        let issues = adjudicate(
            &oracle,
            vec![placeholder_issue("a"), placeholder_issue("b")],
            &pool(),
            DRAFT,
            Severity::Medium,
        )
        .await;

        assert_eq!(issues.len(), 1);
    }
}
