use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use topic_query::{
    base::{BoxResult, TopicId},
    corpus::{Corpus, CorpusFormat, DocumentFrequencies},
    model::{fixed::FixedTopicModel, TopicModel},
    output::{OutputFormat, ResultWriter},
    query::QueryIndex,
    rerank::Reranker,
    search::{QueryEngine, QueryOptions},
};

#[derive(Parser, Debug)]
#[command(
    name = "topic-query",
    about = "Retrieves the best documents of word queries under a topic model",
    version
)]
struct Cli {
    /// Topic model (CBOR)
    #[arg(short, long)]
    model: PathBuf,

    /// Corpus, one document per line
    #[arg(short, long)]
    corpus: PathBuf,

    /// Corpus encoding (tokens or ldac)
    #[arg(long, default_value = "tokens")]
    corpus_format: CorpusFormat,

    /// Query file
    #[arg(short, long)]
    queries: PathBuf,

    /// Result file (defaults to the query file with a .docs suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Document frequencies (computed from the corpus if not given)
    #[arg(long)]
    df: Option<PathBuf>,

    /// JSON file with the query options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Number of documents retained per query
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Gibbs sweeps per document
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Worker threads (0 for one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of query word slots
    #[arg(long)]
    max_slots: Option<usize>,

    /// Topics whose words are left out of the scores
    #[arg(long, value_delimiter = ',')]
    exclude_topics: Vec<TopicId>,

    /// Output per-word statistics
    #[arg(long)]
    diagnostics: bool,

    /// No progress bar
    #[arg(long)]
    quiet: bool,

    /// More logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Options from the configuration file, overridden by the flags
    fn options(&self) -> BoxResult<QueryOptions> {
        let mut options = match &self.config {
            Some(path) => QueryOptions::read(path)?,
            None => QueryOptions::default(),
        };

        if let Some(top_k) = self.top_k {
            options.top_k = top_k;
        }
        if let Some(iterations) = self.iterations {
            options.iterations = iterations;
        }
        if let Some(threads) = self.threads {
            options.threads = threads;
        }
        if let Some(seed) = self.seed {
            options.seed = seed;
        }
        if self.max_slots.is_some() {
            options.max_slots = self.max_slots;
        }
        if !self.exclude_topics.is_empty() {
            options.excluded_topics = self.exclude_topics.clone();
        }
        if self.quiet {
            options.progress = false;
        }
        options.validate()?;
        Ok(options)
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.queries.clone().into_os_string();
            path.push(".docs");
            path.into()
        })
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli) -> BoxResult<()> {
    let options = cli.options()?;

    let model = FixedTopicModel::read(&cli.model)?;
    let queries = QueryIndex::read(&cli.queries, model.vocabulary_size(), options.max_slots)?;
    info!(
        "{} queries ({} word slots)",
        queries.num_queries(),
        queries.num_slots()
    );
    let corpus = Corpus::read(&cli.corpus, cli.corpus_format)?;

    let engine = QueryEngine::new(&model, &corpus, &queries, options)?;
    let results = engine.run().into_results();

    let df = match &cli.df {
        Some(path) => DocumentFrequencies::read(path)?,
        None => DocumentFrequencies::from_corpus(&corpus),
    };
    let reranker = Reranker::new(&corpus, &queries, &df);
    let mut writer = ResultWriter::new(&queries, &reranker);
    writer.format = cli.format;
    writer.diagnostics = cli.diagnostics;
    writer.write_file(&cli.output_path(), &results)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
