use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson, Zipf};

use topic_query::base::WordId;

/// Creates a document whose length follows a Poisson law (at least one
/// word) and whose words follow a Zipf law, so that frequent words repeat
pub fn create_document(
    lambda_words: f64,
    max_words: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> Vec<WordId> {
    let poi = Poisson::new(lambda_words).unwrap();
    let num_words = (1 + poi.sample(rng) as usize).min(max_words);
    let zipf = Zipf::new(vocabulary_size as u64, 1.1).unwrap();

    (0..num_words)
        .map(|_| zipf.sample(rng) as WordId - 1)
        .collect()
}

pub fn create_documents(
    document_count: usize,
    lambda_words: f64,
    max_words: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> Vec<Vec<WordId>> {
    (0..document_count)
        .map(|_| create_document(lambda_words, max_words, vocabulary_size, rng))
        .collect()
}

/// Creates queries of distinct words, in the query file format
pub fn create_queries(
    query_count: usize,
    max_words: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> String {
    let mut text = String::new();
    for _ in 0..query_count {
        let count = rng.gen_range(1..=max_words.min(vocabulary_size));
        let words = rand::seq::index::sample(rng, vocabulary_size, count).into_vec();
        text.push_str(&count.to_string());
        for word in words {
            text.push(' ');
            text.push_str(&word.to_string());
        }
        text.push('\n');
    }
    text
}

/// Corpus file content (one document per line)
pub fn corpus_text(documents: &[Vec<WordId>]) -> String {
    documents
        .iter()
        .map(|d| {
            d.iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
