/// Vocabulary index of a word
pub type WordId = usize;
/// Index of a document in the corpus
pub type DocId = usize;
pub type TopicId = usize;
/// Index of a (query, word) scoring unit
pub type SlotId = usize;
/// Negative log-probability (lower is better)
pub type Score = f64;
pub type BoxResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Marks object that have a length
pub trait Len {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-slot statistics of a document, as retained in the top-K store
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlotStatistics {
    /// Number of occurrences of the word in the document
    pub found: u32,
    /// Mean topic-weighted count (only with burstiness)
    pub count: f64,
    /// Mean negative log-probability of the word
    pub word_score: f64,
}

impl std::fmt::Display for SlotStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({},{},{})", self.found, self.count, self.word_score)
    }
}
