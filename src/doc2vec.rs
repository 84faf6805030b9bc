// Engine A: distributed document embeddings. One PV-DM model with negative
// sampling is trained jointly over the whole corpus; every global document
// index gets one dense vector.
use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Doc2VecConfig {
    pub vector_size: usize,
    pub window: usize,
    pub min_count: usize,
    pub epochs: usize,
    pub negative: usize,
    pub initial_alpha: f32,
    pub min_alpha: f32,
    pub seed: u64,
}

impl Default for Doc2VecConfig {
    fn default() -> Self {
        Self {
            vector_size: 100,
            window: 5,
            min_count: 2,
            epochs: 40,
            negative: 5,
            initial_alpha: 0.025,
            min_alpha: 0.0001,
            seed: 42,
        }
    }
}

pub struct Doc2Vec {
    pub doc_vectors: Vec<Vec<f32>>,
    pub vocab: Vec<String>,
}

impl Doc2Vec {
    /// Dense vector for a global document index.
    pub fn vector(&self, index: usize) -> &[f32] {
        &self.doc_vectors[index]
    }
}

fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-6.0, 6.0);
    1.0 / (1.0 + (-x).exp())
}

/// Vocabulary in deterministic order: descending count, ties alphabetic.
fn build_vocab(documents: &[Vec<String>], min_count: usize) -> (Vec<String>, Vec<u64>) {
    let mut counts: AHashMap<&str, u64> = AHashMap::new();
    for doc in documents {
        for word in doc {
            *counts.entry(word.as_str()).or_insert(0) += 1;
        }
    }
    let mut entries: Vec<(&str, u64)> = counts
        .into_iter()
        .filter(|(_, c)| *c as usize >= min_count)
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let vocab = entries.iter().map(|(w, _)| w.to_string()).collect();
    let counts = entries.iter().map(|(_, c)| *c).collect();
    (vocab, counts)
}

/// Cumulative unigram table (counts raised to 0.75) for negative sampling.
fn unigram_table(counts: &[u64]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(counts.len());
    let mut total = 0.0;
    for &count in counts {
        total += (count as f64).powf(0.75);
        cumulative.push(total);
    }
    cumulative
}

fn sample_negative(cumulative: &[f64], rng: &mut StdRng) -> usize {
    let total = *cumulative.last().unwrap_or(&0.0);
    let r = rng.gen::<f64>() * total;
    cumulative.partition_point(|&c| c <= r).min(cumulative.len() - 1)
}

fn init_vector(dim: usize, rng: &mut StdRng) -> Vec<f32> {
    (0..dim)
        .map(|_| (rng.gen::<f32>() - 0.5) / dim as f32)
        .collect()
}

/// Train over the full ordered document sequence. Documents that end up
/// empty after vocabulary filtering keep their (degenerate) init vector;
/// only a corpus with no documents at all is an error.
pub fn train(
    documents: &[Vec<String>],
    config: &Doc2VecConfig,
) -> Result<Doc2Vec, Box<dyn std::error::Error>> {
    if documents.is_empty() {
        return Err("document embedding: empty corpus".into());
    }

    println!(
        "\n🧠 Training document embeddings ({} docs, dim {}, {} epochs)...",
        documents.len(),
        config.vector_size,
        config.epochs
    );

    let (vocab, counts) = build_vocab(documents, config.min_count);
    let word_ids: AHashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i))
        .collect();
    let cumulative = unigram_table(&counts);

    // Out-of-vocabulary tokens drop out here; the document keeps its slot.
    let id_docs: Vec<Vec<usize>> = documents
        .iter()
        .map(|doc| doc.iter().filter_map(|w| word_ids.get(w.as_str()).copied()).collect())
        .collect();

    let dim = config.vector_size;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut doc_vectors: Vec<Vec<f32>> = (0..documents.len())
        .map(|_| init_vector(dim, &mut rng))
        .collect();
    let mut word_vectors: Vec<Vec<f32>> = (0..vocab.len())
        .map(|_| init_vector(dim, &mut rng))
        .collect();
    let mut output_weights: Vec<Vec<f32>> = vec![vec![0.0; dim]; vocab.len()];

    println!("  ✓ Vocabulary: {} terms (min count {})", vocab.len(), config.min_count);

    for epoch in 0..config.epochs {
        let progress = epoch as f32 / config.epochs.max(1) as f32;
        let alpha = config.initial_alpha - (config.initial_alpha - config.min_alpha) * progress;

        for (d, doc) in id_docs.iter().enumerate() {
            for t in 0..doc.len() {
                // shrinking window, as in word2vec
                let reduced = if config.window > 1 {
                    rng.gen_range(0..config.window)
                } else {
                    0
                };
                let span = config.window - reduced;
                let start = t.saturating_sub(span);
                let end = (t + span + 1).min(doc.len());

                // hidden layer: mean of the doc vector and the context words
                let mut hidden = doc_vectors[d].clone();
                let mut contributors = 1.0f32;
                for pos in start..end {
                    if pos == t {
                        continue;
                    }
                    let word = doc[pos];
                    for i in 0..dim {
                        hidden[i] += word_vectors[word][i];
                    }
                    contributors += 1.0;
                }
                for value in hidden.iter_mut() {
                    *value /= contributors;
                }

                let target = doc[t];
                let mut error = vec![0.0f32; dim];
                for k in 0..=config.negative {
                    let (label, word) = if k == 0 {
                        (1.0f32, target)
                    } else {
                        let candidate = sample_negative(&cumulative, &mut rng);
                        if candidate == target {
                            continue;
                        }
                        (0.0f32, candidate)
                    };
                    let dot: f32 = hidden
                        .iter()
                        .zip(&output_weights[word])
                        .map(|(h, o)| h * o)
                        .sum();
                    let gradient = (label - sigmoid(dot)) * alpha;
                    for i in 0..dim {
                        error[i] += gradient * output_weights[word][i];
                        output_weights[word][i] += gradient * hidden[i];
                    }
                }

                for i in 0..dim {
                    doc_vectors[d][i] += error[i];
                }
                for pos in start..end {
                    if pos == t {
                        continue;
                    }
                    let word = doc[pos];
                    for i in 0..dim {
                        word_vectors[word][i] += error[i];
                    }
                }
            }
        }

        if (epoch + 1) % 10 == 0 || epoch + 1 == config.epochs {
            println!("  Epoch {:>3}/{} (alpha {:.4})", epoch + 1, config.epochs, alpha);
        }
    }

    Ok(Doc2Vec { doc_vectors, vocab })
}
