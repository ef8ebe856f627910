//! Per-document query scoring
//!
//! A document is loaded into the worker's sampler, a few Gibbs sweeps are run
//! with the topic-word probabilities held fixed, and after each sweep every
//! query word is scored by its negative log-probability under the current
//! document topic mixture:
//!
//! `-ln( Σ_t θ_t φ_tw / Σ_t θ_t )`
//!
//! The mean over sweeps is the word score; the sum of the word scores of a
//! query is the document score for that query (lower is better).

mod buffer;

pub use buffer::{Occurrence, ScoringBuffer};

use log::debug;

use crate::{
    base::{DocId, SlotId, TopicId, WordId},
    corpus::Corpus,
    model::{DocumentSampler, SampledDocument, TopicModel},
    query::QueryIndex,
};

/// Read-only data shared by all the workers
pub struct ScoringContext<'a> {
    pub model: &'a dyn TopicModel,
    pub corpus: &'a Corpus,
    pub queries: &'a QueryIndex,
    /// Gibbs sweeps per document
    pub iterations: usize,
    /// Slots left out of the query scores
    excluded: Vec<bool>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        model: &'a dyn TopicModel,
        corpus: &'a Corpus,
        queries: &'a QueryIndex,
        iterations: usize,
        excluded_topics: &[TopicId],
    ) -> Self {
        let excluded = excluded_words(model, queries, excluded_topics);
        Self {
            model,
            corpus,
            queries,
            iterations,
            excluded,
        }
    }

    #[inline]
    pub fn is_excluded(&self, slot: SlotId) -> bool {
        self.excluded[slot]
    }

    pub fn scorer(&self) -> DocumentScorer<'_, 'a> {
        DocumentScorer { context: self }
    }
}

/// Most likely topic of a word given corpus topic proportions (first
/// maximum wins)
pub fn best_topic(model: &dyn TopicModel, word: WordId, topic_probabilities: &[f64]) -> TopicId {
    let mut best = 0;
    let mut best_value = model.word_probability(word, 0) * topic_probabilities[0];
    for t in 1..model.num_topics() {
        let value = model.word_probability(word, t) * topic_probabilities[t];
        if value > best_value {
            best = t;
            best_value = value;
        }
    }
    best
}

/// Flags the slots whose word is best explained by an excluded topic
pub fn excluded_words(
    model: &dyn TopicModel,
    queries: &QueryIndex,
    excluded_topics: &[TopicId],
) -> Vec<bool> {
    if excluded_topics.is_empty() {
        return vec![false; queries.num_slots()];
    }

    let probabilities = model.corpus_topic_probabilities();
    (0..queries.num_slots())
        .map(|slot| {
            let word = queries.word(slot);
            let topic = best_topic(model, word, &probabilities);
            let excluded = excluded_topics.contains(&topic);
            if excluded {
                debug!("Excluding word {} (topic {})", word, topic);
            }
            excluded
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Query scores are in the buffer
    Scored,
    /// Too few usable tokens
    Skipped,
}

pub struct DocumentScorer<'c, 'a> {
    context: &'c ScoringContext<'a>,
}

impl DocumentScorer<'_, '_> {
    /// Scores a document against all the queries
    pub fn score(
        &self,
        doc: DocId,
        sampler: &mut dyn DocumentSampler,
        buffer: &mut ScoringBuffer,
    ) -> DocumentOutcome {
        let context = self.context;
        let mut document = SampledDocument::new(sampler, doc, context.corpus.document(doc));
        if document.num_tokens() <= 1 {
            return DocumentOutcome::Skipped;
        }

        buffer.locate(context.queries, &*document);
        for _ in 0..context.iterations {
            document.resample();
            self.accumulate(&*document, buffer);
        }
        self.finalize(buffer);

        DocumentOutcome::Scored
    }

    /// Adds the word scores under the current topic assignments
    fn accumulate(&self, document: &dyn DocumentSampler, buffer: &mut ScoringBuffer) {
        let model = self.context.model;
        let queries = self.context.queries;
        let burst = model.burstiness();

        for (t, p) in buffer.theta.iter_mut().enumerate() {
            *p = document.topic_probability(t);
        }

        for slot in 0..queries.num_slots() {
            if !queries.is_primary(slot) {
                continue;
            }
            let word = queries.word(slot);
            let (mut z, mut total, mut max_count) = (0., 0., 0);

            for (t, &theta) in buffer.theta.iter().enumerate() {
                if theta <= 0. {
                    continue;
                }
                let mut wf = model.word_probability(word, t);
                if let Some(burst) = burst {
                    let (n, s) = buffer.occurrence_counts(slot, document, t);
                    let (m, s_total) = document.multi_totals(t);
                    wf = burst.adjust(wf, t, n, s, m, s_total);
                    max_count = max_count.max(n);
                }
                total += theta;
                z += theta * wf;
            }

            if burst.is_some() {
                buffer.count[slot] += max_count as f64;
            }
            buffer.word_score[slot] -= (z / total).ln();
        }
    }

    /// Averages over sweeps and sums word scores per query
    fn finalize(&self, buffer: &mut ScoringBuffer) {
        let queries = self.context.queries;
        let iterations = self.context.iterations as f64;

        for slot in 0..queries.num_slots() {
            match queries.primary_slot(queries.word(slot)) {
                Some(primary) if primary != slot => {
                    buffer.count[slot] = buffer.count[primary];
                    buffer.word_score[slot] = buffer.word_score[primary];
                    buffer.found[slot] = buffer.found[primary];
                }
                _ => {
                    buffer.count[slot] /= iterations;
                    buffer.word_score[slot] /= iterations;
                }
            }
        }

        buffer.log_prob.iter_mut().for_each(|p| *p = 0.);
        for slot in 0..queries.num_slots() {
            if !self.context.is_excluded(slot) {
                buffer.log_prob[queries.query_of(slot)] += buffer.word_score[slot];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixed::FixedTopicModel;
    use ndarray::array;

    #[test]
    fn test_best_topic() {
        let model =
            FixedTopicModel::new(array![[0.6, 0.4], [0.3, 0.7]], vec![1., 1.]).unwrap();
        assert_eq!(best_topic(&model, 0, &[0.5, 0.5]), 0);
        assert_eq!(best_topic(&model, 1, &[0.5, 0.5]), 1);
        // Word 1: 0.4 * 0.8 > 0.7 * 0.2
        assert_eq!(best_topic(&model, 1, &[0.8, 0.2]), 0);
        // Ties go to the first topic
        assert_eq!(best_topic(&model, 0, &[0., 0.]), 0);
    }

    #[test]
    fn test_excluded_words() {
        let model =
            FixedTopicModel::new(array![[0.6, 0.4], [0.3, 0.7]], vec![1., 1.]).unwrap();
        let queries = QueryIndex::parse("2 0 1 1 1", 2, None).unwrap();
        assert_eq!(excluded_words(&model, &queries, &[1]), vec![false, true, true]);
        assert_eq!(excluded_words(&model, &queries, &[]), vec![false; 3]);
    }
}
