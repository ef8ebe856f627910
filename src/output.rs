//! Writes the retained documents of each query
//!
//! Text output has one line per (query, document) pair, queries in order and
//! documents best first:
//!
//! `query doc score bm25 [found... counts... word_scores... bm25_terms...]`
//!
//! where `score` is the document score divided by the number of query words.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    base::DocId,
    error::{Error, Result},
    query::QueryIndex,
    rerank::Reranker,
    search::RetainedDocument,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format '{}'", s)),
        }
    }
}

/// One output record
#[derive(Serialize, Debug)]
pub struct ResultRow {
    pub query: usize,
    pub doc: DocId,
    pub score: f64,
    pub bm25: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub found: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counts: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub word_scores: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bm25_terms: Vec<f64>,
}

pub struct ResultWriter<'a> {
    queries: &'a QueryIndex,
    reranker: &'a Reranker<'a>,
    pub format: OutputFormat,
    /// Adds the per-word statistics
    pub diagnostics: bool,
}

impl<'a> ResultWriter<'a> {
    pub fn new(queries: &'a QueryIndex, reranker: &'a Reranker<'a>) -> Self {
        Self {
            queries,
            reranker,
            format: OutputFormat::default(),
            diagnostics: false,
        }
    }

    /// Builds the output records, in query then rank order
    pub fn rows(&self, results: &[Vec<RetainedDocument>]) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for (query, retained) in results.iter().enumerate() {
            let length = self.queries.slots(query).len() as f64;
            for document in retained {
                let (bm25, bm25_terms) = self.reranker.score(query, document);
                let mut row = ResultRow {
                    query,
                    doc: document.doc,
                    score: document.score / length,
                    bm25,
                    found: Vec::new(),
                    counts: Vec::new(),
                    word_scores: Vec::new(),
                    bm25_terms: Vec::new(),
                };
                if self.diagnostics {
                    row.found = document.slots.iter().map(|s| s.found).collect();
                    row.counts = document.slots.iter().map(|s| s.count).collect();
                    row.word_scores = document.slots.iter().map(|s| s.word_score).collect();
                    row.bm25_terms = bm25_terms;
                }
                rows.push(row);
            }
        }
        rows
    }

    pub fn write<W: Write>(&self, out: &mut W, results: &[Vec<RetainedDocument>]) -> std::io::Result<()> {
        for row in self.rows(results) {
            match self.format {
                OutputFormat::Text => write_text(out, &row)?,
                OutputFormat::Json => {
                    serde_json::to_writer(&mut *out, &row)?;
                    writeln!(out)?;
                }
            }
        }
        out.flush()
    }

    pub fn write_file(&self, path: &Path, results: &[Vec<RetainedDocument>]) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut out = BufWriter::new(file);
        self.write(&mut out, results)
            .map_err(|e| Error::io(path, e))?;
        info!("Results written to {}", path.display());
        Ok(())
    }
}

fn write_text<W: Write>(out: &mut W, row: &ResultRow) -> std::io::Result<()> {
    write!(out, "{} {} {:.4} {:.4}", row.query, row.doc, row.score, row.bm25)?;
    for found in &row.found {
        write!(out, " {}", found)?;
    }
    for value in row.counts.iter().chain(&row.word_scores).chain(&row.bm25_terms) {
        write!(out, " {:.6}", value)?;
    }
    writeln!(out)
}
