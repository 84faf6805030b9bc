// Corpus assembly: tokenizes both sides of every Pair and assigns the
// global document indices both embedding engines share.
use crate::pairs::Pair;
use crate::tokenize::{tokens, TokenProfile};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMapping {
    pub index: usize,
    pub case_key: String,
    pub opinion_label: String,
}

/// The tokenized corpus for one embedding engine. For Pair p the majority
/// document sits at index 2p and its dissent at 2p + 1; both engines rely
/// on this adjacency to compare vectors pair-for-pair.
#[derive(Debug)]
pub struct Corpus {
    pub documents: Vec<Vec<String>>,
    pub mapping: Vec<DocumentMapping>,
    pub pair_indices: Vec<(usize, usize)>,
}

pub fn build_corpus(pairs: &[Pair], profile: TokenProfile) -> Corpus {
    // Tokenization is per-pair independent; the indexed collect keeps the
    // pair order, so index assignment below stays positional.
    let tokenized: Vec<(Vec<String>, Vec<String>)> = pairs
        .par_iter()
        .map(|pair| {
            (
                tokens(&pair.majority_text, profile),
                tokens(&pair.dissent_text, profile),
            )
        })
        .collect();

    let mut documents = Vec::with_capacity(pairs.len() * 2);
    let mut mapping = Vec::with_capacity(pairs.len() * 2);
    let mut pair_indices = Vec::with_capacity(pairs.len());

    let mut index = 0;
    for (pair, (majority_tokens, dissent_tokens)) in pairs.iter().zip(tokenized) {
        documents.push(majority_tokens);
        mapping.push(DocumentMapping {
            index,
            case_key: pair.case_key.clone(),
            opinion_label: "majority".to_string(),
        });

        documents.push(dissent_tokens);
        mapping.push(DocumentMapping {
            index: index + 1,
            case_key: pair.case_key.clone(),
            opinion_label: format!("dissent{}", pair.dissent_ind),
        });

        pair_indices.push((index, index + 1));
        index += 2;
    }

    Corpus {
        documents,
        mapping,
        pair_indices,
    }
}
