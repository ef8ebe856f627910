//! Topic model with fixed topic-word probabilities
//!
//! Documents are sampled with collapsed Gibbs sampling where only the
//! document-topic counts move:
//! `p(z_i = t) ∝ (n_dt + α_t) · φ_tw`

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use log::info;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{BurstParameters, DocumentSampler, TopicModel};
use crate::{
    base::{DocId, TopicId, WordId},
    error::{Error, Result},
};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FixedTopicModel {
    /// Topic-word probabilities (topics × vocabulary)
    phi: Array2<f64>,
    /// Dirichlet prior on document topics
    alpha: Vec<f64>,
    /// Topic totals over the training corpus
    topic_mass: Vec<f64>,
    burst: Option<BurstParameters>,
}

impl FixedTopicModel {
    pub fn new(phi: Array2<f64>, alpha: Vec<f64>) -> Result<Self> {
        let model = Self {
            topic_mass: alpha.clone(),
            phi,
            alpha,
            burst: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Sets the topic totals used to find the best topic of each word
    pub fn with_topic_mass(mut self, topic_mass: Vec<f64>) -> Result<Self> {
        self.topic_mass = topic_mass;
        self.validate()?;
        Ok(self)
    }

    pub fn with_burstiness(mut self, burst: BurstParameters) -> Result<Self> {
        self.burst = Some(burst);
        self.validate()?;
        Ok(self)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let model: Self = ciborium::de::from_reader(BufReader::new(file))
            .map_err(|e| Error::Serialization(e.to_string()))?;
        model.validate()?;
        info!(
            "Loaded topic model with {} topics and {} words{}",
            model.num_topics(),
            model.vocabulary_size(),
            if model.burst.is_some() {
                " (burstiness)"
            } else {
                ""
            }
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::options()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        ciborium::ser::into_writer(self, BufWriter::new(file))
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let topics = self.phi.nrows();
        if topics == 0 {
            return Err(Error::InvalidModel("no topics".into()));
        }
        if self.alpha.len() != topics {
            return Err(Error::InvalidModel(format!(
                "{} topics but {} alpha values",
                topics,
                self.alpha.len()
            )));
        }
        if self.alpha.iter().any(|&a| !(a > 0.) || !a.is_finite()) {
            return Err(Error::InvalidModel("alpha values must be positive".into()));
        }
        if self.phi.iter().any(|&p| !(p >= 0.) || !p.is_finite()) {
            return Err(Error::InvalidModel(
                "word probabilities must be non-negative".into(),
            ));
        }
        if self.topic_mass.len() != topics || self.topic_mass.iter().any(|&m| !(m >= 0.)) {
            return Err(Error::InvalidModel("invalid topic totals".into()));
        }
        if let Some(burst) = &self.burst {
            if burst.concentration.len() != topics {
                return Err(Error::InvalidModel(format!(
                    "{} topics but {} burst concentrations",
                    topics,
                    burst.concentration.len()
                )));
            }
            if !(0.0..1.0).contains(&burst.discount) {
                return Err(Error::InvalidModel(format!(
                    "burst discount {} not in [0,1)",
                    burst.discount
                )));
            }
        }
        Ok(())
    }
}

impl TopicModel for FixedTopicModel {
    fn num_topics(&self) -> usize {
        self.phi.nrows()
    }

    fn vocabulary_size(&self) -> usize {
        self.phi.ncols()
    }

    #[inline]
    fn word_probability(&self, word: WordId, topic: TopicId) -> f64 {
        self.phi[[topic, word]]
    }

    fn corpus_topic_probabilities(&self) -> Vec<f64> {
        let total: f64 = self.topic_mass.iter().sum();
        self.topic_mass.iter().map(|m| m / total).collect()
    }

    fn burstiness(&self) -> Option<&BurstParameters> {
        self.burst.as_ref()
    }

    fn sampler(&self, seed: u64) -> Box<dyn DocumentSampler + '_> {
        Box::new(FixedSampler::new(self, seed))
    }
}

/// Gibbs state of one document for a [`FixedTopicModel`]
pub struct FixedSampler<'a> {
    model: &'a FixedTopicModel,
    seed: u64,
    rng: StdRng,
    alpha_sum: f64,

    words: Vec<WordId>,
    topics: Vec<TopicId>,
    /// Document-topic counts
    counts: Vec<u32>,
    weights: Vec<f64>,

    // Repeated words (only with burstiness)
    multi: Vec<Option<usize>>,
    num_multi: usize,
    multi_counts: Vec<u32>,
    multi_totals: Vec<u32>,
    multi_tables: Vec<u32>,
}

impl<'a> FixedSampler<'a> {
    pub fn new(model: &'a FixedTopicModel, seed: u64) -> Self {
        let topics = model.num_topics();
        Self {
            model,
            seed,
            rng: StdRng::seed_from_u64(seed),
            alpha_sum: model.alpha.iter().sum(),
            words: Vec::new(),
            topics: Vec::new(),
            counts: vec![0; topics],
            weights: vec![0.; topics],
            multi: Vec::new(),
            num_multi: 0,
            multi_counts: Vec::new(),
            multi_totals: vec![0; topics],
            multi_tables: vec![0; topics],
        }
    }

    /// Draws a topic for a word given the current counts
    fn draw(&mut self, word: WordId) -> Option<TopicId> {
        let mut total = 0.;
        for t in 0..self.counts.len() {
            let w = (self.counts[t] as f64 + self.model.alpha[t]) * self.model.phi[[t, word]];
            self.weights[t] = w;
            total += w;
        }
        if !(total > 0.) {
            return None;
        }

        let mut u = self.rng.gen::<f64>() * total;
        for (t, &w) in self.weights.iter().enumerate() {
            if u < w {
                return Some(t);
            }
            u -= w;
        }
        // Rounding
        self.weights.iter().rposition(|&w| w > 0.)
    }

    fn index_multis(&mut self) {
        let mut occurrences = HashMap::<WordId, usize>::new();
        for &w in &self.words {
            *occurrences.entry(w).or_insert(0) += 1;
        }

        let mut ids = HashMap::<WordId, usize>::new();
        self.multi = self
            .words
            .iter()
            .map(|w| {
                if occurrences[w] > 1 {
                    let next = ids.len();
                    Some(*ids.entry(*w).or_insert(next))
                } else {
                    None
                }
            })
            .collect();
        self.num_multi = ids.len();
        self.multi_counts = vec![0; self.num_multi * self.counts.len()];
    }

    fn update_multis(&mut self) {
        let topics = self.counts.len();
        self.multi_counts.iter_mut().for_each(|c| *c = 0);
        for (position, multi) in self.multi.iter().enumerate() {
            if let Some(m) = multi {
                self.multi_counts[m * topics + self.topics[position]] += 1;
            }
        }
        for t in 0..topics {
            let (mut total, mut tables) = (0, 0);
            for m in 0..self.num_multi {
                let n = self.multi_counts[m * topics + t];
                total += n;
                tables += n.min(1);
            }
            self.multi_totals[t] = total;
            self.multi_tables[t] = tables;
        }
    }
}

impl DocumentSampler for FixedSampler<'_> {
    fn add_document(&mut self, doc: DocId, tokens: &[WordId]) -> usize {
        // Per-document seeding makes scores independent of the worker
        self.rng = StdRng::seed_from_u64(self.seed ^ (doc as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        let vocabulary_size = self.model.vocabulary_size();
        self.words.clear();
        self.topics.clear();
        self.counts.iter_mut().for_each(|c| *c = 0);

        for &word in tokens.iter().filter(|&&w| w < vocabulary_size) {
            // Words with no mass in any topic cannot be assigned
            if let Some(t) = self.draw(word) {
                self.words.push(word);
                self.topics.push(t);
                self.counts[t] += 1;
            }
        }

        if self.model.burst.is_some() {
            self.index_multis();
            self.update_multis();
        }
        self.words.len()
    }

    fn remove_document(&mut self) {
        self.words.clear();
        self.topics.clear();
        self.multi.clear();
        self.multi_counts.clear();
        self.num_multi = 0;
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.multi_totals.iter_mut().for_each(|c| *c = 0);
        self.multi_tables.iter_mut().for_each(|c| *c = 0);
    }

    fn resample(&mut self) {
        for position in 0..self.words.len() {
            let (word, old) = (self.words[position], self.topics[position]);
            self.counts[old] -= 1;
            let new = self.draw(word).unwrap_or(old);
            self.topics[position] = new;
            self.counts[new] += 1;
        }
        if self.model.burst.is_some() {
            self.update_multis();
        }
    }

    #[inline]
    fn topic_probability(&self, topic: TopicId) -> f64 {
        (self.counts[topic] as f64 + self.model.alpha[topic])
            / (self.words.len() as f64 + self.alpha_sum)
    }

    fn num_tokens(&self) -> usize {
        self.words.len()
    }

    fn token_word(&self, position: usize) -> WordId {
        self.words[position]
    }

    fn topic_at(&self, position: usize) -> TopicId {
        self.topics[position]
    }

    fn multi_of(&self, position: usize) -> Option<usize> {
        self.multi.get(position).copied().flatten()
    }

    fn multi_counts(&self, multi: usize, topic: TopicId) -> (u32, u32) {
        let n = self.multi_counts[multi * self.counts.len() + topic];
        (n, n.min(1))
    }

    fn multi_totals(&self, topic: TopicId) -> (u32, u32) {
        (self.multi_totals[topic], self.multi_tables[topic])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn model() -> FixedTopicModel {
        FixedTopicModel::new(
            array![[0.5, 0.5, 0., 0.], [0., 0., 0.5, 0.5]],
            vec![0.1, 0.1],
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_alpha() {
        let r = FixedTopicModel::new(array![[1.]], vec![0.1, 0.2]);
        assert!(matches!(r, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_separated_topics() {
        let model = model();
        let mut sampler = FixedSampler::new(&model, 3);
        // Word 9 is outside the vocabulary
        assert_eq!(sampler.add_document(0, &[0, 1, 9, 0]), 3);
        for _ in 0..5 {
            sampler.resample();
            // Topics are fully determined by the words
            assert!((0..3).all(|p| sampler.topic_at(p) == 0));
        }
        let expected = 3.1 / 3.2;
        assert!((sampler.topic_probability(0) - expected).abs() < 1e-12);

        sampler.remove_document();
        assert_eq!(sampler.num_tokens(), 0);
    }

    #[test]
    fn test_multis() {
        let model = model()
            .with_burstiness(BurstParameters {
                concentration: vec![1., 1.],
                discount: 0.5,
            })
            .unwrap();
        let mut sampler = FixedSampler::new(&model, 3);
        sampler.add_document(0, &[2, 0, 2, 3, 2]);
        assert_eq!(sampler.multi_of(0), Some(0));
        assert_eq!(sampler.multi_of(1), None);
        assert_eq!(sampler.multi_of(4), Some(0));
        assert_eq!(sampler.multi_counts(0, 1), (3, 1));
        assert_eq!(sampler.multi_totals(1), (3, 1));
        assert_eq!(sampler.multi_totals(0), (0, 0));
    }
}
