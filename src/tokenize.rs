// Text normalization for the two embedding paths. The document-embedding
// model tolerates stopwords, the topic model does not, hence two profiles.
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9']+").unwrap());

static STOPWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no",
        "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
        "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .iter()
    .copied()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProfile {
    /// Lower-case, word split, purely alphabetic tokens.
    Basic,
    /// Basic plus stopword removal, digit rejection and lemmatization.
    Strict,
}

/// Reduce a token to its lemma. Covers regular English noun plurals.
pub fn lemmatize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{}ss", stem);
    }
    if word.len() > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    if word.len() > 3 {
        if let Some(stem) = word.strip_suffix('s') {
            return stem.to_string();
        }
    }
    word.to_string()
}

pub fn tokens(text: &str, profile: TokenProfile) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| word.chars().all(|c| c.is_ascii_alphabetic()))
        .filter(|word| profile == TokenProfile::Basic || !STOPWORDS.contains(word))
        .map(|word| match profile {
            TokenProfile::Basic => word.to_string(),
            TokenProfile::Strict => lemmatize(word),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_keeps_only_alphabetic_tokens() {
        let toks = tokens("The Court, in 1954, held: segregation is unlawful!", TokenProfile::Basic);
        assert_eq!(
            toks,
            vec!["the", "court", "in", "held", "segregation", "is", "unlawful"]
        );
    }

    #[test]
    fn basic_keeps_stopwords() {
        assert_eq!(tokens("of the law", TokenProfile::Basic), vec!["of", "the", "law"]);
    }

    #[test]
    fn strict_drops_stopwords_and_digit_tokens() {
        let toks = tokens("The statutes of 42b sections", TokenProfile::Strict);
        assert_eq!(toks, vec!["statute", "section"]);
    }

    #[test]
    fn lemmatizer_handles_regular_plurals() {
        assert_eq!(lemmatize("parties"), "party");
        assert_eq!(lemmatize("classes"), "class");
        assert_eq!(lemmatize("statutes"), "statute");
        assert_eq!(lemmatize("witness"), "witness");
        assert_eq!(lemmatize("basis"), "basis");
        assert_eq!(lemmatize("gas"), "gas");
    }

    #[test]
    fn profiles_are_deterministic() {
        let text = "Justices dissenting in the cases below";
        assert_eq!(
            tokens(text, TokenProfile::Strict),
            tokens(text, TokenProfile::Strict)
        );
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(tokens("", TokenProfile::Basic).is_empty());
        assert!(tokens("   1234 5,6 ", TokenProfile::Strict).is_empty());
    }
}
