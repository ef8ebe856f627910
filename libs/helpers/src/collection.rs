use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};
use temp_dir::TempDir;

use crate::{
    documents::{corpus_text, create_documents, create_queries},
    model::{create_bursty_model, create_model},
};
use topic_query::{
    base::WordId,
    corpus::Corpus,
    model::fixed::FixedTopicModel,
    query::QueryIndex,
};

/// A random model, corpus and query set, also saved in a temporary folder
pub struct TestCollection {
    pub dir: TempDir,
    pub model: FixedTopicModel,
    pub documents: Vec<Vec<WordId>>,
    pub corpus: Corpus,
    pub queries: QueryIndex,

    pub model_path: PathBuf,
    pub corpus_path: PathBuf,
    pub queries_path: PathBuf,
}

impl TestCollection {
    pub fn new(
        num_topics: usize,
        vocabulary_size: usize,
        document_count: usize,
        query_count: usize,
        bursty: bool,
        seed: Option<u64>,
    ) -> Self {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let mut rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let model = if bursty {
            create_bursty_model(num_topics, vocabulary_size, &mut rng)
        } else {
            create_model(num_topics, vocabulary_size, &mut rng)
        };
        let documents = create_documents(document_count, 20., 100, vocabulary_size, &mut rng);
        let queries_text = create_queries(query_count, 5, vocabulary_size, &mut rng);

        let model_path = dir.child("model.cbor");
        let corpus_path = dir.child("corpus.txt");
        let queries_path = dir.child("queries.txt");
        model.save(&model_path).expect("Could not save the model");
        std::fs::write(&corpus_path, corpus_text(&documents)).expect("Could not write the corpus");
        std::fs::write(&queries_path, &queries_text).expect("Could not write the queries");

        let corpus = Corpus::from_documents(&documents);
        let queries = QueryIndex::parse(&queries_text, vocabulary_size, None)
            .expect("Could not parse the queries");

        Self {
            dir,
            model,
            documents,
            corpus,
            queries,
            model_path,
            corpus_path,
            queries_path,
        }
    }
}
