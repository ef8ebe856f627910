//! Query sets and their word slots
//!
//! A query file is a sequence of queries `count w1 ... w_count` where the
//! `wi` are 0-based vocabulary indices. Tokens may be separated by
//! whitespace or commas; line breaks carry no meaning.
//!
//! Each (query, word) pair owns a *slot*. A word shared by several queries
//! gets one slot per query, the first one being its *primary* slot.

use std::{fs, ops::Range, path::Path};

use log::{debug, warn};

use crate::{
    base::{Len, SlotId, WordId},
    error::{Error, Result},
};

pub struct QueryIndex {
    /// Primary slot of each vocabulary word (None if not in any query)
    word_to_slot: Vec<Option<SlotId>>,
    /// Word of each slot
    words: Vec<WordId>,
    /// Owning query of each slot
    slot_query: Vec<usize>,
    /// Slot range of each query
    ranges: Vec<Range<SlotId>>,
}

impl QueryIndex {
    /// Reads a query file
    pub fn read(path: &Path, vocabulary_size: usize, max_slots: Option<usize>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let index = Self::parse(&content, vocabulary_size, max_slots)?;
        debug!(
            "Read {} queries ({} slots) from {}",
            index.num_queries(),
            index.num_slots(),
            path.display()
        );
        Ok(index)
    }

    /// Parse queries from text
    pub fn parse(text: &str, vocabulary_size: usize, max_slots: Option<usize>) -> Result<Self> {
        let mut tokens = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty());

        let mut word_to_slot = vec![None; vocabulary_size];
        let mut words = Vec::new();
        let mut slot_query = Vec::new();
        let mut query = 0;

        while let Some(token) = tokens.next() {
            let count: usize = match token.parse() {
                Ok(count) => count,
                Err(_) => {
                    warn!("Ignoring trailing query content from '{}'", token);
                    break;
                }
            };

            let query_start = words.len();
            for position in 0..count {
                let word = parse_word(tokens.next(), vocabulary_size).map_err(|reason| {
                    Error::MalformedQuery {
                        query,
                        position,
                        reason,
                    }
                })?;

                let assign = match word_to_slot[word] {
                    None => {
                        word_to_slot[word] = Some(words.len());
                        true
                    }
                    // Same word in another query gets its own slot,
                    // a repeated word within a query is dropped
                    Some(_) => !words[query_start..].contains(&word),
                };

                if assign {
                    words.push(word);
                    slot_query.push(query);
                    if let Some(limit) = max_slots {
                        if words.len() > limit {
                            return Err(Error::QueryCapacity { limit });
                        }
                    }
                }
            }

            if count == 0 {
                warn!("Query {} has no words", query);
            }
            query += 1;
        }

        let ranges = slot_ranges(&slot_query, query);
        Ok(Self {
            word_to_slot,
            words,
            slot_query,
            ranges,
        })
    }

    pub fn num_queries(&self) -> usize {
        self.ranges.len()
    }

    pub fn num_slots(&self) -> usize {
        self.words.len()
    }

    /// Word scored by a slot
    #[inline]
    pub fn word(&self, slot: SlotId) -> WordId {
        self.words[slot]
    }

    /// Words of all the slots, in slot order
    pub fn words(&self) -> &[WordId] {
        &self.words
    }

    /// Query owning a slot
    #[inline]
    pub fn query_of(&self, slot: SlotId) -> usize {
        self.slot_query[slot]
    }

    /// Slots owned by a query
    #[inline]
    pub fn slots(&self, query: usize) -> Range<SlotId> {
        self.ranges[query].clone()
    }

    /// The first slot assigned to the word, if any
    #[inline]
    pub fn primary_slot(&self, word: WordId) -> Option<SlotId> {
        self.word_to_slot.get(word).copied().flatten()
    }

    /// True if the slot is the first one created for its word
    #[inline]
    pub fn is_primary(&self, slot: SlotId) -> bool {
        self.word_to_slot[self.words[slot]] == Some(slot)
    }
}

impl Len for QueryIndex {
    fn len(&self) -> usize {
        self.num_queries()
    }
}

fn parse_word(token: Option<&str>, vocabulary_size: usize) -> std::result::Result<WordId, String> {
    let token = token.ok_or_else(|| "unexpected end of input".to_string())?;
    let word: WordId = token
        .parse()
        .map_err(|_| format!("'{}' is not a word index", token))?;
    if word >= vocabulary_size {
        return Err(format!(
            "word {} is outside the vocabulary (size {})",
            word, vocabulary_size
        ));
    }
    Ok(word)
}

/// Slots are assigned query by query, so each query owns a contiguous range
fn slot_ranges(slot_query: &[usize], num_queries: usize) -> Vec<Range<SlotId>> {
    let mut ranges = Vec::with_capacity(num_queries);
    let mut start = 0;
    for query in 0..num_queries {
        let mut end = start;
        while end < slot_query.len() && slot_query[end] == query {
            end += 1;
        }
        ranges.push(start..end);
        start = end;
    }
    ranges
}
