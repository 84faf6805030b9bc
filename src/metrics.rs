// Pairwise metrics: cosine similarity over the dense embeddings, smoothed
// KL divergence over the topic distributions, one row per Pair.
use crate::corpus::DocumentMapping;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PairMetric {
    pub case_key: String,
    pub majority_opinion_label: String,
    pub dissent_opinion_label: String,
    pub value: f64,
}

/// Normalized dot product in [-1, 1]. NaN when either vector has zero
/// norm; callers treat that as the undefined sentinel, not a fault.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return f64::NAN;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// KL divergence with epsilon smoothing. Both sides get the epsilon and a
/// renormalization so exact zeros stay finite; the epsilon keeps the
/// computation defined, it is not meant to shift rankings.
pub fn kl_divergence(p: &[f64], q: &[f64], epsilon: f64) -> f64 {
    let p_total: f64 = p.iter().map(|&v| v + epsilon).sum();
    let q_total: f64 = q.iter().map(|&v| v + epsilon).sum();
    p.iter()
        .zip(q)
        .map(|(&pi, &qi)| {
            let pi = (pi + epsilon) / p_total;
            let qi = (qi + epsilon) / q_total;
            pi * (pi / qi).ln()
        })
        .sum()
}

/// One metric row per Pair, in pair order. `score` receives the
/// (majority, dissent) global index tuple.
pub fn pair_metrics<F>(
    mapping: &[DocumentMapping],
    pair_indices: &[(usize, usize)],
    score: F,
) -> Vec<PairMetric>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    pair_indices
        .par_iter()
        .map(|&(majority, dissent)| PairMetric {
            case_key: mapping[majority].case_key.clone(),
            majority_opinion_label: mapping[majority].opinion_label.clone(),
            dissent_opinion_label: mapping[dissent].opinion_label.clone(),
            value: score(majority, dissent),
        })
        .collect()
}
