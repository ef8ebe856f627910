use crate::{
    base::{SlotId, SlotStatistics, TopicId},
    model::{DocumentSampler, TopicModel},
    query::QueryIndex,
};

/// Where a query word occurs in the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Absent,
    /// Occurs once, at this token position
    Once(usize),
    /// Occurs several times (repeated word index)
    Many(usize),
}

/// Per-worker scratch space, reused from one document to the next
pub struct ScoringBuffer {
    /// Occurrences of each slot word in the document
    pub found: Vec<u32>,
    /// Accumulated (then mean) maximum in-document topic count
    pub count: Vec<f64>,
    /// Accumulated (then mean) negative log-probability of each slot word
    pub word_score: Vec<f64>,
    /// Score of the document for each query
    pub log_prob: Vec<f64>,
    /// Only used when the model has burstiness
    occurrences: Option<Vec<Occurrence>>,
    pub(super) theta: Vec<f64>,
}

impl ScoringBuffer {
    pub fn new(queries: &QueryIndex, model: &dyn TopicModel) -> Self {
        let slots = queries.num_slots();
        Self {
            found: vec![0; slots],
            count: vec![0.; slots],
            word_score: vec![0.; slots],
            log_prob: vec![0.; queries.num_queries()],
            occurrences: model
                .burstiness()
                .map(|_| vec![Occurrence::Absent; slots]),
            theta: vec![0.; model.num_topics()],
        }
    }

    /// Resets the accumulators and locates the query words in the document
    pub(super) fn locate(&mut self, queries: &QueryIndex, document: &dyn DocumentSampler) {
        self.found.iter_mut().for_each(|f| *f = 0);
        self.count.iter_mut().for_each(|c| *c = 0.);
        self.word_score.iter_mut().for_each(|s| *s = 0.);
        if let Some(occurrences) = &mut self.occurrences {
            occurrences.iter_mut().for_each(|o| *o = Occurrence::Absent);
        }

        for position in 0..document.num_tokens() {
            if let Some(slot) = queries.primary_slot(document.token_word(position)) {
                self.found[slot] += 1;
                if let Some(occurrences) = &mut self.occurrences {
                    occurrences[slot] = match document.multi_of(position) {
                        Some(multi) => Occurrence::Many(multi),
                        None => Occurrence::Once(position),
                    };
                }
            }
        }
    }

    /// In-document count and table indicator of a slot word for a topic
    pub(super) fn occurrence_counts(
        &self,
        slot: SlotId,
        document: &dyn DocumentSampler,
        topic: TopicId,
    ) -> (u32, u32) {
        match self.occurrence(slot) {
            Occurrence::Absent => (0, 0),
            Occurrence::Once(position) => {
                let n = (document.topic_at(position) == topic) as u32;
                (n, n)
            }
            Occurrence::Many(multi) => document.multi_counts(multi, topic),
        }
    }

    pub fn occurrence(&self, slot: SlotId) -> Occurrence {
        self.occurrences
            .as_ref()
            .map_or(Occurrence::Absent, |o| o[slot])
    }

    /// Statistics of a slot for the current document
    #[inline]
    pub fn statistics(&self, slot: SlotId) -> SlotStatistics {
        SlotStatistics {
            found: self.found[slot],
            count: self.count[slot],
            word_score: self.word_score[slot],
        }
    }
}
