//! Scores all the documents of a corpus against a query set

pub mod dispatch;
pub mod topk;

use std::{fs::File, io::BufReader, path::Path};

use derivative::Derivative;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    base::{SlotStatistics, TopicId},
    corpus::Corpus,
    error::{Error, Result},
    model::TopicModel,
    query::QueryIndex,
    scoring::{DocumentOutcome, ScoringBuffer, ScoringContext},
    utils::progress::progress_bar,
};

use dispatch::WorkDispatcher;
pub use topk::{RetainedDocument, TopKStore};

#[derive(Derivative, Serialize, Deserialize, Clone, Debug)]
#[derivative(Default)]
#[serde(default)]
pub struct QueryOptions {
    /// Number of documents retained per query
    #[derivative(Default(value = "10"))]
    pub top_k: usize,

    /// Gibbs sweeps per document
    #[derivative(Default(value = "20"))]
    pub iterations: usize,

    /// Number of worker threads (0 means one per available core)
    #[derivative(Default(value = "0"))]
    pub threads: usize,

    /// Base seed of the samplers
    #[derivative(Default(value = "1"))]
    pub seed: u64,

    /// Maximum number of query word slots (no limit if None)
    pub max_slots: Option<usize>,

    /// Words mostly associated with these topics are not scored
    pub excluded_topics: Vec<TopicId>,

    /// Show a progress bar
    #[derivative(Default(value = "true"))]
    pub progress: bool,
}

impl QueryOptions {
    /// Reads options from a JSON file (missing fields take default values)
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let options: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::Config("at least one iteration is needed".into()));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top-k should be at least 1".into()));
        }
        Ok(())
    }

    /// Number of workers to use
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }
}

/// Runs the queries over the whole corpus
pub struct QueryEngine<'a> {
    context: ScoringContext<'a>,
    options: QueryOptions,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        model: &'a dyn TopicModel,
        corpus: &'a Corpus,
        queries: &'a QueryIndex,
        options: QueryOptions,
    ) -> Result<Self> {
        options.validate()?;
        if let Some(t) = options
            .excluded_topics
            .iter()
            .find(|&&t| t >= model.num_topics())
        {
            return Err(Error::Config(format!(
                "excluded topic {} does not exist ({} topics)",
                t,
                model.num_topics()
            )));
        }

        let context = ScoringContext::new(
            model,
            corpus,
            queries,
            options.iterations,
            &options.excluded_topics,
        );
        Ok(Self { context, options })
    }

    pub fn context(&self) -> &ScoringContext<'a> {
        &self.context
    }

    /// Scores every document and returns the best ones for each query
    pub fn run(&self) -> TopKStore {
        let context = &self.context;
        let queries = context.queries;
        let num_documents = context.corpus.num_documents();
        let threads = self.options.worker_count();

        info!(
            "Scoring {} documents for {} queries with {} thread(s)",
            num_documents,
            queries.num_queries(),
            threads
        );

        let store = TopKStore::new(queries.num_queries(), self.options.top_k);
        let dispatcher = WorkDispatcher::new(num_documents);
        let progress = progress_bar(num_documents as u64, self.options.progress);

        dispatcher.run(threads, |worker, documents| {
            let mut sampler = context.model.sampler(self.options.seed);
            let mut buffer = ScoringBuffer::new(queries, context.model);
            let mut snapshot = Vec::<SlotStatistics>::new();
            let scorer = context.scorer();
            let (mut scored, mut skipped) = (0usize, 0usize);

            for doc in documents {
                match scorer.score(doc, sampler.as_mut(), &mut buffer) {
                    DocumentOutcome::Skipped => skipped += 1,
                    DocumentOutcome::Scored => {
                        scored += 1;
                        for query in 0..queries.num_queries() {
                            let slots = queries.slots(query);
                            let score = buffer.log_prob[query];
                            if slots.is_empty() || !store.competitive(query, score) {
                                continue;
                            }
                            snapshot.clear();
                            snapshot.extend(slots.map(|slot| buffer.statistics(slot)));
                            store.submit(query, doc, score, &snapshot);
                        }
                    }
                }
                progress.inc(1);
            }

            debug!(
                "Worker {} done: {} documents scored, {} skipped",
                worker, scored, skipped
            );
        });

        progress.finish();
        info!(
            "Scoring done ({} query lock acquisitions)",
            store.lock_count()
        );
        store
    }
}
