// Pair construction: one row per (case, dissent), anchored to the case's
// first majority opinion.
use crate::citations::collect_citations;
use crate::loader::CaseRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// The central corpus unit: one majority/dissent alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub case_key: String,
    pub case_name: String,
    pub case_name_abbreviation: String,
    pub decision_date: String,
    pub dissent_ind: usize,
    pub majority_text: String,
    pub dissent_text: String,
    pub majority_cites: Vec<String>,
    pub dissent_cites: Vec<String>,
    pub unattributed_cites_count: usize,
}

#[derive(Debug, Default)]
pub struct PairStats {
    pub cases_seen: usize,
    pub no_majority: usize,
    pub below_threshold: usize,
    pub no_dissent: usize,
    pub cases_kept: usize,
    pub pairs_built: usize,
}

fn is_kind(kind: &str, wanted: &str) -> bool {
    kind.eq_ignore_ascii_case(wanted)
}

/// Majority word count per case, whitespace split. Cases without a
/// majority opinion are omitted.
pub fn majority_word_lengths(cases: &[CaseRecord]) -> Vec<(String, usize)> {
    cases
        .par_iter()
        .filter_map(|case| {
            let majority = case.opinions.iter().find(|op| is_kind(&op.kind, "majority"))?;
            Some((case.case_key.clone(), majority.text.split_whitespace().count()))
        })
        .collect()
}

fn pairs_for_case(case: &CaseRecord, majority_length: usize, threshold: usize) -> Vec<Pair> {
    if majority_length <= threshold {
        return Vec::new();
    }
    let majority = match case.opinions.iter().find(|op| is_kind(&op.kind, "majority")) {
        Some(op) => op,
        None => return Vec::new(),
    };

    let citations = collect_citations(case);
    let majority_position = case
        .opinions
        .iter()
        .position(|op| is_kind(&op.kind, "majority"))
        .unwrap_or(0);
    let majority_cites = citations.for_opinion(majority_position);

    case.opinions
        .iter()
        .enumerate()
        .filter(|(_, op)| is_kind(&op.kind, "dissent"))
        .enumerate()
        .map(|(j, (position, dissent))| Pair {
            case_key: case.case_key.clone(),
            case_name: case.name.clone(),
            case_name_abbreviation: case.name_abbreviation.clone(),
            decision_date: case.decision_date.clone(),
            dissent_ind: j + 1,
            majority_text: majority.text.clone(),
            dissent_text: dissent.text.clone(),
            majority_cites: majority_cites.clone(),
            dissent_cites: citations.for_opinion(position),
            unattributed_cites_count: citations.unattributed_count,
        })
        .collect()
}

/// Build the ordered Pair corpus from the cases and the majority
/// word-length index. Filtering (no majority, short majority, no dissent)
/// is an outcome, not an error; per-case work runs in parallel and the
/// collect keeps the input case order.
pub fn build_pairs(
    cases: &[CaseRecord],
    length_index: &ahash::AHashMap<String, usize>,
    threshold: usize,
) -> (Vec<Pair>, PairStats) {
    println!("\n⚖️  Building majority–dissent pairs (threshold: {} words)...", threshold);

    let mut stats = PairStats {
        cases_seen: cases.len(),
        ..PairStats::default()
    };

    let per_case: Vec<Vec<Pair>> = cases
        .par_iter()
        .map(|case| {
            let has_majority = case.opinions.iter().any(|op| is_kind(&op.kind, "majority"));
            let has_dissent = case.opinions.iter().any(|op| is_kind(&op.kind, "dissent"));
            if !has_majority || !has_dissent {
                return Vec::new();
            }
            let length = length_index.get(&case.case_key).copied().unwrap_or(0);
            pairs_for_case(case, length, threshold)
        })
        .collect();

    let mut pairs = Vec::new();
    for (case, case_pairs) in cases.iter().zip(per_case) {
        let has_majority = case.opinions.iter().any(|op| is_kind(&op.kind, "majority"));
        let has_dissent = case.opinions.iter().any(|op| is_kind(&op.kind, "dissent"));
        if !has_majority {
            stats.no_majority += 1;
        } else if !has_dissent {
            stats.no_dissent += 1;
        } else if case_pairs.is_empty() {
            stats.below_threshold += 1;
        } else {
            stats.cases_kept += 1;
            stats.pairs_built += case_pairs.len();
            pairs.extend(case_pairs);
        }
    }

    println!("  ✓ Cases scanned: {}", stats.cases_seen);
    println!("  ✓ Excluded (no majority): {}", stats.no_majority);
    println!("  ✓ Excluded (no dissent): {}", stats.no_dissent);
    println!("  ✓ Excluded (majority ≤ {} words): {}", threshold, stats.below_threshold);
    println!("  ✓ Cases kept: {}", stats.cases_kept);
    println!("  ✓ Pairs built: {}", stats.pairs_built);

    (pairs, stats)
}

/// Word-length index keyed by case, as consumed by `build_pairs`.
pub fn length_index(lengths: &[(String, usize)]) -> ahash::AHashMap<String, usize> {
    lengths.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Opinion;
    use serde_json::json;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn run(cases: &[CaseRecord], threshold: usize) -> (Vec<Pair>, PairStats) {
        let index = length_index(&majority_word_lengths(cases));
        build_pairs(cases, &index, threshold)
    }

    fn case(key: &str, opinions: Vec<(&str, String)>) -> CaseRecord {
        CaseRecord {
            case_key: key.to_string(),
            name: format!("{} v. State", key),
            name_abbreviation: key.to_string(),
            decision_date: "1960-05-01".to_string(),
            opinions: opinions
                .into_iter()
                .map(|(kind, text)| Opinion {
                    kind: kind.to_string(),
                    text,
                })
                .collect(),
            cites_to: Vec::new(),
        }
    }

    #[test]
    fn short_majority_is_excluded_entirely() {
        let cases = vec![case("c1", vec![("majority", words(40)), ("dissent", words(80))])];
        let (pairs, stats) = run(&cases, 50);
        assert!(pairs.is_empty());
        assert_eq!(stats.below_threshold, 1);
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = vec![case("c1", vec![("majority", words(50)), ("dissent", words(10))])];
        let above = vec![case("c2", vec![("majority", words(51)), ("dissent", words(10))])];
        assert!(run(&at, 50).0.is_empty());
        assert_eq!(run(&above, 50).0.len(), 1);
    }

    #[test]
    fn two_dissents_yield_two_pairs_sharing_majority_text() {
        let cases = vec![case(
            "c1",
            vec![
                ("majority", words(200)),
                ("concurrence", words(30)),
                ("dissent", "first dissent".to_string()),
                ("dissent", "second dissent".to_string()),
            ],
        )];
        let (pairs, _) = run(&cases, 50);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].dissent_ind, 1);
        assert_eq!(pairs[1].dissent_ind, 2);
        assert_eq!(pairs[0].majority_text, pairs[1].majority_text);
        assert_eq!(pairs[0].dissent_text, "first dissent");
        assert_eq!(pairs[1].dissent_text, "second dissent");
    }

    #[test]
    fn first_majority_wins_when_several_are_labeled() {
        let cases = vec![case(
            "c1",
            vec![
                ("Majority", format!("first {}", words(60))),
                ("majority", "second majority".to_string()),
                ("dissent", words(5)),
            ],
        )];
        let (pairs, _) = run(&cases, 50);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].majority_text.starts_with("first "));
    }

    #[test]
    fn case_without_dissent_is_filtered_not_an_error() {
        let cases = vec![case("c1", vec![("majority", words(100))])];
        let (pairs, stats) = run(&cases, 50);
        assert!(pairs.is_empty());
        assert_eq!(stats.no_dissent, 1);
    }

    #[test]
    fn citations_attach_per_opinion_position() {
        let mut c = case(
            "c1",
            vec![
                ("majority", words(60)),
                ("dissent", words(10)),
                ("dissent", words(10)),
            ],
        );
        c.cites_to = vec![
            json!({"cite": "M1", "opinion_index": 0}),
            json!({"cite": "D1", "opinion_index": 1}),
            json!({"cite": "D2", "opinion_index": 2}),
            json!({"cite": "X", "opinion_index": -1}),
        ];
        let (pairs, _) = run(&[c], 50);
        assert_eq!(pairs[0].majority_cites, vec!["M1"]);
        assert_eq!(pairs[0].dissent_cites, vec!["D1"]);
        assert_eq!(pairs[1].dissent_cites, vec!["D2"]);
        assert_eq!(pairs[0].unattributed_cites_count, 1);
        assert_eq!(pairs[1].unattributed_cites_count, 1);
    }

    #[test]
    fn surviving_cases_satisfy_filter_invariants() {
        let cases = vec![
            case("ok", vec![("majority", words(60)), ("dissent", words(5))]),
            case("short", vec![("majority", words(20)), ("dissent", words(5))]),
            case("nodiss", vec![("majority", words(60))]),
        ];
        let (pairs, _) = run(&cases, 50);
        for pair in &pairs {
            assert!(pair.majority_text.split_whitespace().count() > 50);
            assert!(pair.dissent_ind >= 1);
        }
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].case_key, "ok");
    }

    #[test]
    fn majority_word_lengths_cover_all_majorities() {
        let cases = vec![
            case("a", vec![("majority", words(7))]),
            case("b", vec![("dissent", words(3))]),
        ];
        let lengths = majority_word_lengths(&cases);
        assert_eq!(lengths, vec![("a".to_string(), 7)]);
    }
}
