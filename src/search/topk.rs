//! Bounded per-query lists of the best documents
//!
//! Each query keeps at most `top_k` documents with the *lowest* scores.
//! Records live in fixed physical slots; an order array gives the ranking
//! (ascending score), so inserting only moves indices around.
//!
//! Writers only take the query lock when the document is competitive: the
//! worst retained score of a full list is mirrored in an atomic, and since
//! it can only decrease, a stale value never rejects a good candidate.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Mutex,
};

use log::trace;

use crate::base::{DocId, Score, SlotStatistics};

/// A document kept for a query
#[derive(Clone, Debug, PartialEq)]
pub struct RetainedDocument {
    pub doc: DocId,
    pub score: Score,
    /// Statistics for the slots of the query
    pub slots: Vec<SlotStatistics>,
}

impl std::fmt::Display for RetainedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.doc, self.score)
    }
}

/// Returns the rank at which `new_score` goes among the ranked entries,
/// i.e. after all the entries with a score lower or equal.
///
/// The search starts with a bisection whose first step is the largest power
/// of two not above the number of entries, and ends with a linear
/// adjustment (which is short when the bisection stopped on a tie).
pub fn insertion_rank<F>(ranked: &[usize], score_of: F, new_score: Score) -> usize
where
    F: Fn(usize) -> Score,
{
    let m = ranked.len();
    if m == 0 {
        return 0;
    }

    let mut step = 1;
    while step * 2 <= m {
        step *= 2;
    }

    let mut k = step.min(m - 1);
    while step >= 1 {
        let score = score_of(ranked[k]);
        if score > new_score {
            k = k.saturating_sub(step);
        } else if score < new_score {
            k = (k + step).min(m - 1);
        } else {
            break;
        }
        step /= 2;
    }

    while k < m && score_of(ranked[k]) <= new_score {
        k += 1;
    }
    while k > 0 && score_of(ranked[k - 1]) > new_score {
        k -= 1;
    }

    debug_assert!(k == 0 || score_of(ranked[k - 1]) <= new_score);
    debug_assert!(k == m || score_of(ranked[k]) > new_score);
    k
}

/// Places the last element of `order` at its rank, shifting the tail.
/// The last element must be the physical slot of the new entry.
pub fn ordered_insert<F>(order: &mut [usize], score_of: F, new_score: Score) -> usize
where
    F: Fn(usize) -> Score,
{
    let m = order.len() - 1;
    let k = insertion_rank(&order[..m], score_of, new_score);
    order[k..].rotate_right(1);
    k
}

#[derive(Default)]
struct QueryResults {
    /// Physical slots
    entries: Vec<RetainedDocument>,
    /// Physical slots, by increasing score
    order: Vec<usize>,
}

impl QueryResults {
    #[inline]
    fn worst(&self) -> Option<Score> {
        self.order.last().map(|&i| self.entries[i].score)
    }

    fn insert(&mut self, top_k: usize, doc: DocId, score: Score, slots: &[SlotStatistics]) {
        if self.entries.len() < top_k {
            self.order.push(self.entries.len());
            self.entries.push(RetainedDocument {
                doc,
                score,
                slots: slots.to_vec(),
            });
        } else {
            // Reuse the slot of the worst document
            let entry = &mut self.entries[self.order[top_k - 1]];
            entry.doc = doc;
            entry.score = score;
            entry.slots.clear();
            entry.slots.extend_from_slice(slots);
        }

        let entries = &self.entries;
        ordered_insert(&mut self.order, |i| entries[i].score, score);
    }
}

struct QueryList {
    results: Mutex<QueryResults>,
    len: AtomicUsize,
    /// Worst retained score when full (+∞ otherwise)
    threshold: AtomicU64,
}

impl QueryList {
    fn new() -> Self {
        Self {
            results: Mutex::new(QueryResults::default()),
            len: AtomicUsize::new(0),
            threshold: AtomicU64::new(Score::INFINITY.to_bits()),
        }
    }
}

/// Best documents of every query, shared by the scoring workers
pub struct TopKStore {
    top_k: usize,
    lists: Vec<QueryList>,
    /// Number of times a query lock was taken
    locks: AtomicUsize,
}

impl TopKStore {
    pub fn new(num_queries: usize, top_k: usize) -> Self {
        Self {
            top_k,
            lists: (0..num_queries).map(|_| QueryList::new()).collect(),
            locks: AtomicUsize::new(0),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn num_queries(&self) -> usize {
        self.lists.len()
    }

    #[inline]
    fn rejects(&self, list: &QueryList, score: Score) -> bool {
        list.len.load(Ordering::Acquire) >= self.top_k
            && !(score < Score::from_bits(list.threshold.load(Ordering::Acquire)))
    }

    /// False if a submission with this score would be rejected right away
    /// (without locking)
    #[inline]
    pub fn competitive(&self, query: usize, score: Score) -> bool {
        self.top_k > 0 && !score.is_nan() && !self.rejects(&self.lists[query], score)
    }

    /// Submits a document score for a query; returns true if the document
    /// is now retained
    pub fn submit(&self, query: usize, doc: DocId, score: Score, slots: &[SlotStatistics]) -> bool {
        if !self.competitive(query, score) {
            return false;
        }

        let list = &self.lists[query];
        self.locks.fetch_add(1, Ordering::Relaxed);
        let mut results = list.results.lock().unwrap_or_else(|e| e.into_inner());

        // Another writer may have filled the list in the meantime
        if results.entries.len() >= self.top_k && results.worst().map_or(false, |w| score >= w) {
            return false;
        }

        results.insert(self.top_k, doc, score, slots);
        trace!("[query {}] retained document {} ({})", query, doc, score);

        if results.order.len() >= self.top_k {
            if let Some(worst) = results.worst() {
                list.threshold.store(worst.to_bits(), Ordering::Release);
            }
        }
        list.len.store(results.order.len(), Ordering::Release);
        true
    }

    /// Number of documents retained for a query
    pub fn len(&self, query: usize) -> usize {
        self.lists[query].len.load(Ordering::Acquire)
    }

    /// Worst retained score, if the list is full
    pub fn threshold(&self, query: usize) -> Option<Score> {
        let list = &self.lists[query];
        if list.len.load(Ordering::Acquire) >= self.top_k {
            Some(Score::from_bits(list.threshold.load(Ordering::Acquire)))
        } else {
            None
        }
    }

    /// Retained documents of a query, best first
    pub fn results(&self, query: usize) -> Vec<RetainedDocument> {
        let results = self.lists[query]
            .results
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        results
            .order
            .iter()
            .map(|&i| results.entries[i].clone())
            .collect()
    }

    /// Consumes the store and returns the retained documents of each query,
    /// best first
    pub fn into_results(self) -> Vec<Vec<RetainedDocument>> {
        self.lists
            .into_iter()
            .map(|list| {
                let results = list.results.into_inner().unwrap_or_else(|e| e.into_inner());
                let mut entries: Vec<Option<RetainedDocument>> =
                    results.entries.into_iter().map(Some).collect();
                results
                    .order
                    .iter()
                    .filter_map(|&i| entries[i].take())
                    .collect()
            })
            .collect()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(scores: &[Score], new_score: Score) -> usize {
        let ranked: Vec<usize> = (0..scores.len()).collect();
        insertion_rank(&ranked, |i| scores[i], new_score)
    }

    #[test]
    fn test_insertion_rank() {
        assert_eq!(rank(&[], 1.), 0);
        assert_eq!(rank(&[1.], 0.), 0);
        assert_eq!(rank(&[1.], 2.), 1);
        let scores = [1., 2., 3., 4., 5., 6., 7.];
        for (new_score, expected) in [(0., 0), (1.5, 1), (3.5, 3), (6.5, 6), (8., 7)] {
            assert_eq!(rank(&scores, new_score), expected, "score {}", new_score);
        }
    }

    #[test]
    fn test_insertion_rank_ties() {
        // New entries go after the equal ones
        assert_eq!(rank(&[1., 2., 2., 2., 3.], 2.), 4);
        assert_eq!(rank(&[2., 2., 2., 2.], 2.), 4);
        assert_eq!(rank(&[1., 1., 1., 2., 2., 2., 2., 2., 3.], 1.), 3);
    }

    #[test]
    fn test_ordered_insert() {
        let scores = [5., 1., 3., 2.];
        // 1, 5 ranked, 3 is the new entry
        let mut order = vec![1, 0, 2];
        assert_eq!(ordered_insert(&mut order, |i| scores[i], scores[2]), 1);
        assert_eq!(order, vec![1, 2, 0]);

        order.push(3);
        assert_eq!(ordered_insert(&mut order, |i| scores[i], scores[3]), 1);
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_zero_capacity() {
        let store = TopKStore::new(1, 0);
        assert!(!store.submit(0, 0, 1., &[]));
        assert_eq!(store.len(0), 0);
        assert_eq!(store.lock_count(), 0);
    }
}
