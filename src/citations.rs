// Citation extraction: attributes each citation string to an opinion
// position within its case, deduplicated in first-seen order.
use crate::loader::CaseRecord;
use ahash::{AHashMap, AHashSet};
use serde_json::Value;

/// Sentinel the archive uses for citations it could not attribute to a
/// specific opinion.
const UNATTRIBUTED: i64 = -1;

#[derive(Debug, Default)]
pub struct CaseCitations {
    pub by_opinion: AHashMap<usize, Vec<String>>,
    pub unattributed_count: usize,
}

impl CaseCitations {
    pub fn for_opinion(&self, position: usize) -> Vec<String> {
        self.by_opinion.get(&position).cloned().unwrap_or_default()
    }
}

/// Citation string for one raw entry, chosen by field priority. Entries
/// carrying none of the candidate fields yield None and are dropped.
fn citation_string(entry: &Value) -> Option<&str> {
    for field in ["cite", "citation", "normalized_cite"] {
        if let Some(s) = entry.get(field).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// Deduplicate preserving first occurrence. A plain set conversion would
/// destroy order, so this pairs a seen-set with an append-only list.
pub fn unique_preserve(items: Vec<String>) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

/// Group a case's citation entries by opinion position. Entries whose
/// position is absent or the unattributed sentinel only bump the
/// unattributed count; malformed entries are skipped outright.
pub fn collect_citations(case: &CaseRecord) -> CaseCitations {
    let mut grouped: AHashMap<usize, Vec<String>> = AHashMap::new();
    let mut unattributed_count = 0;

    for entry in &case.cites_to {
        let position = entry.get("opinion_index").and_then(|v| v.as_i64());
        match position {
            Some(p) if p != UNATTRIBUTED && p >= 0 => {
                if let Some(cite) = citation_string(entry) {
                    grouped.entry(p as usize).or_default().push(cite.to_string());
                }
            }
            _ => unattributed_count += 1,
        }
    }

    let by_opinion = grouped
        .into_iter()
        .map(|(position, cites)| (position, unique_preserve(cites)))
        .collect();

    CaseCitations {
        by_opinion,
        unattributed_count,
    }
}
