// Engine B: probabilistic topic model. Bag-of-words over a df-bounded
// vocabulary, topics fit by collapsed Gibbs sampling. Each topic-count
// value in the sweep is an independent model; topic i in one run has no
// relation to topic i in another.
use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LdaConfig {
    pub topics: usize,
    pub iterations: usize,
    pub min_df: usize,
    pub max_df: f64,
    /// Dirichlet priors; None means 1/topics.
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub seed: u64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            topics: 100,
            iterations: 100,
            min_df: 5,
            max_df: 0.9,
            alpha: None,
            beta: None,
            seed: 42,
        }
    }
}

/// Documents as term-id sequences over a shared bounded vocabulary.
#[derive(Debug)]
pub struct BowCorpus {
    pub vocab: Vec<String>,
    pub docs: Vec<Vec<usize>>,
}

pub struct LdaModel {
    /// Per document index: probability distribution over topics. Sums to
    /// one by construction of the smoothed count normalization.
    pub doc_topic: Vec<Vec<f64>>,
    /// Per topic: distribution over vocabulary terms.
    pub topic_word: Vec<Vec<f64>>,
}

/// Vocabulary bounded by document frequency: terms must appear in at least
/// `min_df` documents and in at most `max_df` (fraction) of them. Term
/// order is alphabetic, so ids are stable across runs.
pub fn build_bow(documents: &[Vec<String>], min_df: usize, max_df: f64) -> BowCorpus {
    let mut doc_freq: AHashMap<&str, usize> = AHashMap::new();
    for doc in documents {
        let mut seen: Vec<&str> = doc.iter().map(|w| w.as_str()).collect();
        seen.sort_unstable();
        seen.dedup();
        for word in seen {
            *doc_freq.entry(word).or_insert(0) += 1;
        }
    }

    let max_docs = (max_df * documents.len() as f64).floor() as usize;
    let mut vocab: Vec<String> = doc_freq
        .iter()
        .filter(|(_, &df)| df >= min_df && df <= max_docs)
        .map(|(w, _)| w.to_string())
        .collect();
    vocab.sort_unstable();

    let term_ids: AHashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i))
        .collect();

    let docs = documents
        .iter()
        .map(|doc| {
            doc.iter()
                .filter_map(|w| term_ids.get(w.as_str()).copied())
                .collect()
        })
        .collect();

    BowCorpus { vocab, docs }
}

/// Fit one topic model over the whole corpus. Empty documents keep their
/// index and resolve to the uniform prior distribution; only an empty
/// vocabulary (nothing survived the df bounds) is an error.
pub fn fit(corpus: &BowCorpus, config: &LdaConfig) -> Result<LdaModel, Box<dyn std::error::Error>> {
    let topics = config.topics;
    let vocab_size = corpus.vocab.len();
    if corpus.docs.is_empty() {
        return Err("topic model: empty corpus".into());
    }
    if vocab_size == 0 {
        return Err("topic model: vocabulary is empty after df filtering".into());
    }

    println!(
        "\n🎲 Fitting topic model ({} topics, {} terms, {} iterations)...",
        topics, vocab_size, config.iterations
    );

    let alpha = config.alpha.unwrap_or(1.0 / topics as f64);
    let beta = config.beta.unwrap_or(1.0 / topics as f64);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut doc_topic_counts = vec![vec![0u32; topics]; corpus.docs.len()];
    let mut topic_word_counts = vec![vec![0u32; vocab_size]; topics];
    let mut topic_totals = vec![0u32; topics];

    // random topic assignment per token instance
    let mut assignments: Vec<Vec<usize>> = corpus
        .docs
        .iter()
        .enumerate()
        .map(|(d, doc)| {
            doc.iter()
                .map(|&word| {
                    let topic = rng.gen_range(0..topics);
                    doc_topic_counts[d][topic] += 1;
                    topic_word_counts[topic][word] += 1;
                    topic_totals[topic] += 1;
                    topic
                })
                .collect()
        })
        .collect();

    let mut weights = vec![0.0f64; topics];
    for iteration in 0..config.iterations {
        for (d, doc) in corpus.docs.iter().enumerate() {
            for (t, &word) in doc.iter().enumerate() {
                let old = assignments[d][t];
                doc_topic_counts[d][old] -= 1;
                topic_word_counts[old][word] -= 1;
                topic_totals[old] -= 1;

                let mut total = 0.0;
                for k in 0..topics {
                    let w = (doc_topic_counts[d][k] as f64 + alpha)
                        * (topic_word_counts[k][word] as f64 + beta)
                        / (topic_totals[k] as f64 + vocab_size as f64 * beta);
                    total += w;
                    weights[k] = total;
                }

                let r = rng.gen::<f64>() * total;
                let new = weights.partition_point(|&c| c <= r).min(topics - 1);

                assignments[d][t] = new;
                doc_topic_counts[d][new] += 1;
                topic_word_counts[new][word] += 1;
                topic_totals[new] += 1;
            }
        }
        if (iteration + 1) % 20 == 0 || iteration + 1 == config.iterations {
            println!("  Iteration {:>3}/{}", iteration + 1, config.iterations);
        }
    }

    let doc_topic = doc_topic_counts
        .iter()
        .zip(&corpus.docs)
        .map(|(counts, doc)| {
            let total = doc.len() as f64 + topics as f64 * alpha;
            counts.iter().map(|&c| (c as f64 + alpha) / total).collect()
        })
        .collect();

    let topic_word = topic_word_counts
        .iter()
        .zip(&topic_totals)
        .map(|(counts, &total)| {
            let denom = total as f64 + vocab_size as f64 * beta;
            counts.iter().map(|&c| (c as f64 + beta) / denom).collect()
        })
        .collect();

    Ok(LdaModel {
        doc_topic,
        topic_word,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn corpus() -> Vec<Vec<String>> {
        vec![
            doc(&["statute", "statute", "court"]),
            doc(&["court", "judge", "statute"]),
            doc(&["judge", "court"]),
            doc(&["statute", "judge"]),
        ]
    }

    fn config(topics: usize) -> LdaConfig {
        LdaConfig {
            topics,
            iterations: 10,
            min_df: 1,
            max_df: 1.0,
            seed: 3,
            ..LdaConfig::default()
        }
    }

    #[test]
    fn df_bounds_filter_vocabulary() {
        let docs = vec![
            doc(&["everywhere", "rare", "shared"]),
            doc(&["everywhere", "shared"]),
            doc(&["everywhere"]),
        ];
        let bow = build_bow(&docs, 2, 0.7);
        // "everywhere" has df 3 > 0.7 * 3, "rare" has df 1 < 2
        assert_eq!(bow.vocab, vec!["shared"]);
    }

    #[test]
    fn vocab_is_alphabetic_and_ids_stable() {
        let bow = build_bow(&corpus(), 1, 1.0);
        assert_eq!(bow.vocab, vec!["court", "judge", "statute"]);
        assert_eq!(bow.docs[0], vec![2, 2, 0]);
    }

    #[test]
    fn doc_topic_rows_are_distributions() {
        let bow = build_bow(&corpus(), 1, 1.0);
        let model = fit(&bow, &config(3)).unwrap();
        for row in &model.doc_topic {
            assert_eq!(row.len(), 3);
            assert!(row.iter().all(|&p| p > 0.0));
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        for row in &model.topic_word {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_document_resolves_to_uniform_prior() {
        let mut docs = corpus();
        docs.push(Vec::new());
        let bow = build_bow(&docs, 1, 1.0);
        let model = fit(&bow, &config(4)).unwrap();
        let row = model.doc_topic.last().unwrap();
        for &p in row {
            assert!((p - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let bow = build_bow(&corpus(), 1, 1.0);
        let a = fit(&bow, &config(3)).unwrap();
        let b = fit(&bow, &config(3)).unwrap();
        assert_eq!(a.doc_topic, b.doc_topic);
        assert_eq!(a.topic_word, b.topic_word);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let docs = vec![doc(&["once"]), doc(&["twice"])];
        let bow = build_bow(&docs, 5, 0.9);
        assert!(fit(&bow, &config(2)).is_err());
    }
}
