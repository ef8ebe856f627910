use log::info;
use rstest::rstest;

use helpers::collection::TestCollection;
use topic_query::{
    corpus::{Corpus, CorpusFormat, DocumentFrequencies},
    model::{fixed::FixedTopicModel, TopicModel},
    output::ResultWriter,
    query::QueryIndex,
    rerank::Reranker,
    search::{QueryEngine, QueryOptions, RetainedDocument},
    Error,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(collection: &TestCollection, threads: usize, top_k: usize) -> Vec<Vec<RetainedDocument>> {
    let options = QueryOptions {
        top_k,
        iterations: 5,
        threads,
        seed: 42,
        progress: false,
        ..Default::default()
    };
    QueryEngine::new(&collection.model, &collection.corpus, &collection.queries, options)
        .unwrap()
        .run()
        .into_results()
}

#[rstest]
#[case(false, 4)]
#[case(true, 3)]
#[case(false, 16)]
fn test_threads(#[case] bursty: bool, #[case] threads: usize) {
    init_logger();
    let collection = TestCollection::new(8, 300, 400, 10, bursty, Some(1));
    let sequential = run(&collection, 1, 10);
    let concurrent = run(&collection, threads, 10);

    for (query, (expected, observed)) in sequential.iter().zip(&concurrent).enumerate() {
        info!("Query {}: {} documents", query, observed.len());
        assert_eq!(expected.len(), observed.len());
        assert!(observed.windows(2).all(|w| w[0].score <= w[1].score));

        // Scores do not depend on the worker
        let expected_scores: Vec<_> = expected.iter().map(|r| r.score).collect();
        let observed_scores: Vec<_> = observed.iter().map(|r| r.score).collect();
        assert_eq!(expected_scores, observed_scores);
    }
}

#[test]
fn test_top_k_of_all_scores() {
    init_logger();
    let collection = TestCollection::new(5, 100, 200, 4, false, Some(8));
    let all = run(&collection, 2, 1000);
    let top = run(&collection, 2, 7);

    for (all, top) in all.iter().zip(&top) {
        let expected: Vec<_> = all.iter().take(7).map(|r| r.score).collect();
        let observed: Vec<_> = top.iter().map(|r| r.score).collect();
        assert_eq!(expected, observed);
    }
}

#[test]
fn test_files() {
    init_logger();
    let collection = TestCollection::new(6, 120, 60, 5, true, Some(3));

    let model = FixedTopicModel::read(&collection.model_path).unwrap();
    assert_eq!(model.num_topics(), 6);
    assert_eq!(model.vocabulary_size(), 120);
    assert!(model.burstiness().is_some());

    let corpus = Corpus::read(&collection.corpus_path, CorpusFormat::Tokens).unwrap();
    assert_eq!(corpus.num_documents(), collection.documents.len());
    let queries = QueryIndex::read(&collection.queries_path, model.vocabulary_size(), None).unwrap();

    let options = QueryOptions {
        top_k: 3,
        iterations: 4,
        threads: 2,
        progress: false,
        ..Default::default()
    };
    let results = QueryEngine::new(&model, &corpus, &queries, options)
        .unwrap()
        .run()
        .into_results();

    let df = DocumentFrequencies::from_corpus(&corpus);
    let reranker = Reranker::new(&corpus, &queries, &df);
    let writer = ResultWriter::new(&queries, &reranker);
    let path = collection.dir.child("queries.txt.docs");
    writer.write_file(&path, &results).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let expected: usize = results.iter().map(|r| r.len()).sum();
    assert_eq!(content.lines().count(), expected);

    // Query then rank order
    let mut previous = (0usize, f64::NEG_INFINITY);
    for line in content.lines() {
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 4);
        let query: usize = fields[0].parse().unwrap();
        let score: f64 = fields[2].parse().unwrap();
        if query == previous.0 {
            assert!(score >= previous.1);
        } else {
            assert!(query > previous.0);
        }
        previous = (query, score);
    }
}

#[test]
fn test_capacity_before_scoring() {
    let collection = TestCollection::new(2, 10, 5, 0, false, Some(3));
    std::fs::write(&collection.queries_path, "3 1 2 3\n3 1 2 3").unwrap();
    assert!(matches!(
        QueryIndex::read(&collection.queries_path, 10, Some(5)),
        Err(Error::QueryCapacity { limit: 5 })
    ));
}

#[test]
fn test_invalid_options() {
    let collection = TestCollection::new(2, 10, 5, 1, false, Some(3));
    for options in [
        QueryOptions {
            iterations: 0,
            ..Default::default()
        },
        QueryOptions {
            top_k: 0,
            ..Default::default()
        },
    ] {
        assert!(matches!(
            QueryEngine::new(&collection.model, &collection.corpus, &collection.queries, options),
            Err(Error::Config(_))
        ));
    }
}

#[test]
fn test_options_file() {
    let collection = TestCollection::new(2, 10, 5, 1, false, Some(3));
    let path = collection.dir.child("options.json");
    std::fs::write(&path, r#"{"top_k": 3, "excluded_topics": [1]}"#).unwrap();

    let options = QueryOptions::read(&path).unwrap();
    assert_eq!(options.top_k, 3);
    assert_eq!(options.excluded_topics, vec![1]);
    assert_eq!(options.iterations, 20);
    assert!(options.progress);

    std::fs::write(&path, r#"{"top_k": "three"}"#).unwrap();
    assert!(matches!(QueryOptions::read(&path), Err(Error::Config(_))));
}
