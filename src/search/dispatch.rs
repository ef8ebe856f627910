//! Hands out documents to the workers
//!
//! There is no static partitioning: each worker claims the next unprocessed
//! document from a shared cursor, so slow documents do not hold back the
//! others.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::base::DocId;

pub struct WorkDispatcher {
    next: AtomicUsize,
    total: usize,
}

impl WorkDispatcher {
    pub fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
        }
    }

    /// Claims the next document, or None once all have been handed out
    #[inline]
    pub fn claim(&self) -> Option<DocId> {
        let doc = self.next.fetch_add(1, Ordering::Relaxed);
        if doc < self.total {
            Some(doc)
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Runs `worker` on `threads` threads until all documents are claimed.
    /// With one thread, the worker runs on the calling thread.
    pub fn run<F>(&self, threads: usize, worker: F)
    where
        F: Fn(usize, &WorkDispatcher) + Sync,
    {
        if threads <= 1 {
            worker(0, self);
            return;
        }

        std::thread::scope(|scope| {
            for id in 0..threads {
                let worker = &worker;
                scope.spawn(move || worker(id, self));
            }
        });
    }
}

impl Iterator for &WorkDispatcher {
    type Item = DocId;

    fn next(&mut self) -> Option<Self::Item> {
        self.claim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_each_document_once() {
        let dispatcher = WorkDispatcher::new(1000);
        let seen = Mutex::new(vec![0usize; 1000]);
        let workers = Mutex::new(std::collections::HashSet::new());

        dispatcher.run(4, |id, documents| {
            workers.lock().unwrap().insert(id);
            for doc in documents {
                seen.lock().unwrap()[doc] += 1;
            }
        });

        assert!(seen.into_inner().unwrap().iter().all(|&n| n == 1));
        assert!(workers.into_inner().unwrap().len() == 4);
        assert_eq!(dispatcher.claim(), None);
    }

    #[test]
    fn test_sequential() {
        let dispatcher = WorkDispatcher::new(3);
        let mut claimed = Vec::new();
        while let Some(doc) = dispatcher.claim() {
            claimed.push(doc);
        }
        assert_eq!(claimed, vec![0, 1, 2]);
        assert_eq!(dispatcher.claim(), None);
    }
}
