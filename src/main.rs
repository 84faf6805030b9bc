use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

mod citations;
mod corpus;
mod doc2vec;
mod lda;
mod loader;
mod metrics;
mod output;
mod pairs;
mod tokenize;

use corpus::build_corpus;
use doc2vec::Doc2VecConfig;
use lda::LdaConfig;
use metrics::{cosine_similarity, kl_divergence, pair_metrics};
use pairs::{build_pairs, length_index, majority_word_lengths};
use tokenize::TokenProfile;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PipelineConfig {
    /// Case archive (.json/.jsonl file or directory), or a pair_metadata.csv
    /// to resume at the embedding stages.
    input: String,
    output_dir: String,
    majority_length_threshold: usize,
    embedding: Doc2VecConfig,
    topic_model: LdaConfig,
    topic_counts: Vec<usize>,
    smoothing_epsilon: f64,
    workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: "data/cases".to_string(),
            output_dir: "results_filtered".to_string(),
            majority_length_threshold: 50,
            embedding: Doc2VecConfig::default(),
            topic_model: LdaConfig::default(),
            topic_counts: vec![90, 95, 105, 110],
            smoothing_epsilon: 1e-10,
            workers: 0,
        }
    }
}

fn load_config(path: &str) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn parse_args() -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::default();
    let mut input_override = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config requires a path")?;
                config = load_config(&path)?;
            }
            other => input_override = Some(other.to_string()),
        }
    }
    if let Some(input) = input_override {
        config.input = input;
    }
    Ok(config)
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(70));
    println!("⚖️  MAJORITY–DISSENT OPINION DIVERGENCE PIPELINE");
    println!("{}", "=".repeat(70));

    let config = parse_args()?;
    if config.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build_global()
            .ok();
    }

    let start_time = Instant::now();
    let input = Path::new(&config.input);
    let out = Path::new(&config.output_dir);

    // ------------------------------------------------------------------
    // Stage 1–2: pair corpus (built from the archive, or resumed from a
    // previously written pair table)
    // ------------------------------------------------------------------
    let pairs = if input.extension().and_then(|e| e.to_str()) == Some("csv") {
        println!("\n📂 Resuming from pair table {}...", input.display());
        let pairs = output::read_pair_metadata(input)?;
        println!("  ✓ Pairs loaded: {}", format_number(pairs.len()));
        pairs
    } else {
        let skip_log = Path::new("logs").join("skipped_cases.jsonl");
        let (cases, _) = loader::load_cases(input, &skip_log)?;

        let lengths = majority_word_lengths(&cases);
        output::write_majority_lengths(&out.join("majority_length.csv"), &lengths)?;

        let index = length_index(&lengths);
        let (pairs, _) = build_pairs(&cases, &index, config.majority_length_threshold);
        output::write_pair_metadata(&out.join("pair_metadata.csv"), &pairs)?;
        pairs
    };

    if pairs.is_empty() {
        return Err("no pairs survived filtering; nothing to embed".into());
    }

    // ------------------------------------------------------------------
    // Stage 3–4: document embeddings + cosine similarity
    // ------------------------------------------------------------------
    let corpus = build_corpus(&pairs, TokenProfile::Basic);
    let doc2vec_dir = out.join("doc2vec");
    output::write_document_mapping(&doc2vec_dir.join("document_mapping.csv"), &corpus.mapping)?;

    let model = doc2vec::train(&corpus.documents, &config.embedding)?;
    output::write_embeddings(&doc2vec_dir.join("document_embeddings.csv"), &model.doc_vectors)?;

    let cosine = pair_metrics(&corpus.mapping, &corpus.pair_indices, |majority, dissent| {
        cosine_similarity(model.vector(majority), model.vector(dissent))
    });
    let degenerate = cosine.iter().filter(|m| m.value.is_nan()).count();
    output::write_pair_metrics(
        &doc2vec_dir.join("cosine_similarity_metadata.csv"),
        &cosine,
        "cosine_similarity",
    )?;
    println!("  ✓ Cosine similarities: {}", format_number(cosine.len()));
    if degenerate > 0 {
        println!("  ⚠ Degenerate (zero-norm) pairs: {}", degenerate);
    }

    // ------------------------------------------------------------------
    // Stage 5: topic models, one independent fit per topic count
    // ------------------------------------------------------------------
    let strict = build_corpus(&pairs, TokenProfile::Strict);
    let bow = lda::build_bow(
        &strict.documents,
        config.topic_model.min_df,
        config.topic_model.max_df,
    );

    for &topics in &config.topic_counts {
        let dir = out.join(format!("topic_model_{}", topics));
        let lda_config = LdaConfig {
            topics,
            ..config.topic_model.clone()
        };
        let topic_model = lda::fit(&bow, &lda_config)?;

        output::write_document_mapping(&dir.join("document_mapping.csv"), &strict.mapping)?;
        output::write_doc_topics(
            &dir.join("document_topic_distributions.csv"),
            &strict.mapping,
            &topic_model.doc_topic,
        )?;
        output::write_topic_word(
            &dir.join("topic_word_distributions.csv"),
            &bow.vocab,
            &topic_model.topic_word,
        )?;

        let divergences = pair_metrics(&strict.mapping, &strict.pair_indices, |majority, dissent| {
            kl_divergence(
                &topic_model.doc_topic[majority],
                &topic_model.doc_topic[dissent],
                config.smoothing_epsilon,
            )
        });
        output::write_pair_metrics(
            &dir.join("kl_divergence_metadata.csv"),
            &divergences,
            "kl_divergence",
        )?;
        println!("  ✓ KL divergences ({} topics): {}", topics, format_number(divergences.len()));
    }

    // ------------------------------------------------------------------
    // Summary
    // ------------------------------------------------------------------
    let elapsed = start_time.elapsed();
    println!("\n{}", "=".repeat(70));
    println!("✅ PIPELINE COMPLETE!");
    println!("{}", "=".repeat(70));
    println!("  Pairs: {}", format_number(pairs.len()));
    println!("  Documents indexed: {}", format_number(corpus.documents.len()));
    println!("  Topic-count sweep: {:?}", config.topic_counts);
    println!("  Time elapsed: {}", format_duration(elapsed.as_secs()));
    println!("  Output directory: {}", out.display());
    println!("{}", "=".repeat(70));

    Ok(())
}
