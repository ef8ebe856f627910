//! Okapi BM25 for the retained documents
//!
//! The lexical score is only reported next to the topic model score; it does
//! not change which documents are retained.

use crate::{
    base::{SlotStatistics, WordId},
    corpus::{Corpus, DocumentFrequencies},
    query::QueryIndex,
    search::RetainedDocument,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25 {
    pub k1: f64,
    pub b: f64,
    /// Average document length over the corpus
    pub average_length: f64,
}

impl Bm25 {
    pub fn new(average_length: f64) -> Self {
        Self {
            k1: 1.6,
            b: 0.75,
            average_length,
        }
    }

    /// Contribution of one query word
    #[inline]
    pub fn term_score(&self, found: u32, doc_length: usize, df: u32, num_documents: usize) -> f64 {
        if found == 0 {
            return 0.;
        }
        let df = df as f64;
        let found = found as f64;
        let relative_length = if self.average_length > 0. {
            doc_length as f64 / self.average_length
        } else {
            1.
        };

        let idf = ((num_documents as f64 - df + 0.5) / (df + 0.5)).ln();
        idf * found * (self.k1 + 1.)
            / (found + self.k1 * (1. - self.b + self.b * relative_length))
    }

    /// Total score and per-word contributions
    pub fn score(
        &self,
        doc_length: usize,
        words: &[WordId],
        slots: &[SlotStatistics],
        df: &DocumentFrequencies,
    ) -> (f64, Vec<f64>) {
        debug_assert_eq!(words.len(), slots.len());
        let terms: Vec<f64> = words
            .iter()
            .zip(slots)
            .map(|(&word, stats)| {
                self.term_score(stats.found, doc_length, df.get(word), df.num_documents)
            })
            .collect();
        (terms.iter().sum(), terms)
    }
}

/// Computes BM25 for the documents retained for a query
pub struct Reranker<'a> {
    bm25: Bm25,
    corpus: &'a Corpus,
    queries: &'a QueryIndex,
    df: &'a DocumentFrequencies,
}

impl<'a> Reranker<'a> {
    pub fn new(corpus: &'a Corpus, queries: &'a QueryIndex, df: &'a DocumentFrequencies) -> Self {
        Self {
            bm25: Bm25::new(corpus.average_length()),
            corpus,
            queries,
            df,
        }
    }

    pub fn score(&self, query: usize, retained: &RetainedDocument) -> (f64, Vec<f64>) {
        let words = &self.queries.words()[self.queries.slots(query)];
        self.bm25.score(
            self.corpus.document_length(retained.doc),
            words,
            &retained.slots,
            self.df,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_word() {
        let bm25 = Bm25::new(10.);
        assert_eq!(bm25.term_score(0, 12, 3, 100), 0.);
    }

    #[test]
    fn test_average_length_document() {
        // With |d| = avgdl, the length normalisation is 1
        let bm25 = Bm25::new(10.);
        let expected = (97.5f64 / 3.5).ln() * 2. * 2.6 / (2. + 1.6);
        assert!((bm25.term_score(2, 10, 3, 100) - expected).abs() < 1e-12);
    }
}
