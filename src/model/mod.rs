//! Interface with the trained topic model
//!
//! The model itself (topic-word probabilities, hyper-parameters) is read-only
//! and shared by all workers. Each worker owns a [`DocumentSampler`] that
//! holds the Gibbs state of the document being scored.

pub mod fixed;

use serde::{Deserialize, Serialize};

use crate::base::{DocId, TopicId, WordId};

/// Parameters of the burstiness extension
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BurstParameters {
    /// Per-topic concentration (`b_t`)
    pub concentration: Vec<f64>,
    /// Discount (`a`)
    pub discount: f64,
}

impl BurstParameters {
    /// Adjusts the word probability `wf` for topic `topic` given the word
    /// in-document counts `(n, s)` and document totals `(m, s_total)`
    #[inline]
    pub fn adjust(&self, wf: f64, topic: TopicId, n: u32, s: u32, m: u32, s_total: u32) -> f64 {
        let b = self.concentration[topic];
        let a = self.discount;
        (wf * (b + a * s_total as f64) + (n as f64 - a * s as f64)) / (b + m as f64)
    }
}

pub trait TopicModel: Send + Sync {
    fn num_topics(&self) -> usize;

    fn vocabulary_size(&self) -> usize;

    /// Probability of a word given a topic
    fn word_probability(&self, word: WordId, topic: TopicId) -> f64;

    /// Topic proportions over the whole corpus
    fn corpus_topic_probabilities(&self) -> Vec<f64>;

    /// Burstiness parameters, if the model uses them
    fn burstiness(&self) -> Option<&BurstParameters>;

    /// Creates a sampler to score documents with
    fn sampler(&self, seed: u64) -> Box<dyn DocumentSampler + '_>;
}

/// Gibbs state restricted to one document
pub trait DocumentSampler: Send {
    /// Loads a document and returns the number of usable tokens
    fn add_document(&mut self, doc: DocId, tokens: &[WordId]) -> usize;

    /// Releases the current document
    fn remove_document(&mut self);

    /// One full Gibbs sweep over the current document
    fn resample(&mut self);

    /// Estimated probability of a topic in the current document
    fn topic_probability(&self, topic: TopicId) -> f64;

    /// Number of usable tokens of the current document
    fn num_tokens(&self) -> usize;

    /// Word at a usable token position
    fn token_word(&self, position: usize) -> WordId;

    /// Topic currently assigned to a token
    fn topic_at(&self, position: usize) -> TopicId;

    /// Index of the repeated word this token belongs to (None if the word
    /// occurs only once in the document)
    fn multi_of(&self, position: usize) -> Option<usize>;

    /// Count and table indicator `(n, s)` of a repeated word for a topic
    fn multi_counts(&self, multi: usize, topic: TopicId) -> (u32, u32);

    /// Totals `(M, S)` over all repeated words of the document for a topic
    fn multi_totals(&self, topic: TopicId) -> (u32, u32);
}

/// A document loaded into a sampler, removed when dropped
pub struct SampledDocument<'s, 'm> {
    sampler: &'s mut (dyn DocumentSampler + 'm),
    num_tokens: usize,
}

impl<'s, 'm> SampledDocument<'s, 'm> {
    pub fn new(sampler: &'s mut (dyn DocumentSampler + 'm), doc: DocId, tokens: &[WordId]) -> Self {
        let num_tokens = sampler.add_document(doc, tokens);
        Self {
            sampler,
            num_tokens,
        }
    }

    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }
}

impl<'s, 'm> std::ops::Deref for SampledDocument<'s, 'm> {
    type Target = dyn DocumentSampler + 'm;

    fn deref(&self) -> &Self::Target {
        self.sampler
    }
}

impl<'s, 'm> std::ops::DerefMut for SampledDocument<'s, 'm> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.sampler
    }
}

impl Drop for SampledDocument<'_, '_> {
    fn drop(&mut self) {
        self.sampler.remove_document();
    }
}
