//! Reciprocal rank fusion over heterogeneous result lists.
//!
//! Merges two or more ranked passage lists into one deduplicated ranking.
//! Each occurrence of a passage at zero-based rank `r` contributes
//! `1 / (r + k)` to its score; a passage present in several lists accumulates
//! one contribution per list. Scores from different backends are never
//! compared directly, so no normalization step is needed.

use std::collections::HashMap;

use crate::types::{MetaValue, Passage};

/// Default smoothing constant. Lower values weight top ranks more heavily.
pub const DEFAULT_RRF_K: usize = 60;

/// Reserved metadata key carrying the final fusion score, attached for
/// observability only and never part of the dedup identity.
pub const FUSION_SCORE_KEY: &str = "rrf_score";

/// Fuse ranked passage lists into a single ranking.
///
/// Deterministic given identical inputs: dedup is keyed by passage identity
/// (content plus sorted metadata, computed before any score is attached),
/// and ties are broken by first-seen order across the concatenated inputs.
/// All-empty input yields an empty result, never an error.
pub fn reciprocal_rank_fusion(lists: &[Vec<Passage>], k: usize) -> Vec<Passage> {
    struct Entry {
        passage: Passage,
        score: f64,
        first_seen: usize,
    }

    let mut by_identity: HashMap<String, Entry> = HashMap::new();
    let mut seen = 0usize;

    for list in lists {
        for (rank, passage) in list.iter().enumerate() {
            let contribution = 1.0 / (rank + k) as f64;
            let identity = passage.identity();
            match by_identity.get_mut(&identity) {
                Some(entry) => entry.score += contribution,
                None => {
                    by_identity.insert(
                        identity,
                        Entry {
                            passage: passage.clone(),
                            score: contribution,
                            first_seen: seen,
                        },
                    );
                }
            }
            seen += 1;
        }
    }

    let mut entries: Vec<Entry> = by_identity.into_values().collect();
    // Stable order: score descending, first-seen ascending on ties.
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.first_seen.cmp(&b.first_seen))
    });

    entries
        .into_iter()
        .map(|entry| {
            let mut passage = entry.passage;
            passage
                .metadata
                .insert(FUSION_SCORE_KEY.to_string(), MetaValue::Float(entry.score));
            passage
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use quickcheck_macros::quickcheck;

    fn passage(text: &str) -> Passage {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), "test.pdf".into());
        Passage::new(text, metadata)
    }

    fn score_of(p: &Passage) -> f64 {
        match p.metadata.get(FUSION_SCORE_KEY) {
            Some(MetaValue::Float(f)) => *f,
            other => panic!("missing fusion score: {:?}", other),
        }
    }

    #[test]
    fn test_all_empty_inputs_fuse_to_empty() {
        let fused = reciprocal_rank_fusion(&[vec![], vec![]], DEFAULT_RRF_K);
        assert!(fused.is_empty());

        let fused = reciprocal_rank_fusion(&[], DEFAULT_RRF_K);
        assert!(fused.is_empty());
    }

    #[test]
    fn test_single_source_preserves_relative_order() {
        let a = passage("A");
        let b = passage("B");
        let fused =
            reciprocal_rank_fusion(&[vec![a.clone(), b.clone()], vec![]], DEFAULT_RRF_K);

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].content, "A");
        assert_eq!(fused[1].content, "B");
    }

    #[test]
    fn test_shared_passage_outranks_with_exact_scores() {
        let a = passage("A");
        let b = passage("B");
        let c = passage("C");

        let fused = reciprocal_rank_fusion(
            &[vec![a.clone(), b.clone()], vec![b.clone(), c.clone()]],
            60,
        );

        // B: rank 1 in the first list, rank 0 in the second.
        assert_eq!(fused[0].content, "B");
        let expected_b = 1.0 / 61.0 + 1.0 / 60.0;
        assert!((score_of(&fused[0]) - expected_b).abs() < 1e-12);

        // A (rank 0, one list) beats C (rank 1, one list).
        assert_eq!(fused[1].content, "A");
        assert_eq!(fused[2].content, "C");
        assert!((score_of(&fused[1]) - 1.0 / 60.0).abs() < 1e-12);
        assert!((score_of(&fused[2]) - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_top_rank_in_both_lists_scores_one_thirtieth() {
        let b = passage("B");
        let fused = reciprocal_rank_fusion(&[vec![b.clone()], vec![b.clone()]], 60);

        assert_eq!(fused.len(), 1);
        assert!((score_of(&fused[0]) - 1.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_scores_tie_break_by_first_seen() {
        let a = passage("A");
        let c = passage("C");
        // Both at rank 0 of their own list: identical scores.
        let fused = reciprocal_rank_fusion(&[vec![a], vec![c]], 60);
        assert_eq!(fused[0].content, "A");
        assert_eq!(fused[1].content, "C");
    }

    #[test]
    fn test_dedup_is_by_content_and_metadata() {
        // Same text, different provenance: two distinct evidence units.
        let mut m1 = Metadata::new();
        m1.insert("page".to_string(), MetaValue::Int(1));
        let mut m2 = Metadata::new();
        m2.insert("page".to_string(), MetaValue::Int(2));

        let p1 = Passage::new("text", m1);
        let p2 = Passage::new("text", m2);

        let fused = reciprocal_rank_fusion(&[vec![p1], vec![p2]], 60);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_score_attachment_does_not_collapse_identities() {
        // Fusing already-fused output must not merge passages whose only
        // difference is a prior score, because identity includes metadata.
        let a = passage("A");
        let first = reciprocal_rank_fusion(&[vec![a.clone()]], 60);
        let second = reciprocal_rank_fusion(&[first, vec![a]], 60);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_lower_k_weights_rank_more() {
        let contribution = |rank: usize, k: usize| 1.0 / (rank + k) as f64;
        let spread_low_k = contribution(0, 1) - contribution(5, 1);
        let spread_high_k = contribution(0, 60) - contribution(5, 60);
        assert!(spread_low_k > spread_high_k);
    }

    #[quickcheck]
    fn prop_fusion_is_deterministic(texts: Vec<String>) -> bool {
        let list: Vec<Passage> = texts.iter().map(|t| passage(t)).collect();
        let once = reciprocal_rank_fusion(&[list.clone()], DEFAULT_RRF_K);
        let twice = reciprocal_rank_fusion(&[list], DEFAULT_RRF_K);
        once == twice
    }

    #[quickcheck]
    fn prop_output_never_exceeds_distinct_inputs(texts: Vec<String>) -> bool {
        let list: Vec<Passage> = texts.iter().map(|t| passage(t)).collect();
        let distinct: std::collections::HashSet<String> =
            list.iter().map(|p| p.identity()).collect();
        let fused = reciprocal_rank_fusion(&[list], DEFAULT_RRF_K);
        fused.len() == distinct.len()
    }
}
