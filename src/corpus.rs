//! Corpus of encoded documents and document-frequency tables

use std::{fs, path::Path, str::FromStr};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    base::{DocId, Len, WordId},
    error::{Error, Result},
};

/// Text encoding of a corpus file (one document per line)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorpusFormat {
    /// Sequence of word indices
    #[default]
    Tokens,
    /// LDA-C bag of words: `n id:count id:count ...`
    Ldac,
}

impl FromStr for CorpusFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(CorpusFormat::Tokens),
            "ldac" => Ok(CorpusFormat::Ldac),
            _ => Err(format!("unknown corpus format '{}'", s)),
        }
    }
}

/// Documents stored as one token array with offsets
pub struct Corpus {
    tokens: Vec<WordId>,
    offsets: Vec<usize>,
    vocabulary_size: usize,
}

impl Corpus {
    pub fn from_documents<I, D>(documents: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[WordId]>,
    {
        let mut tokens = Vec::new();
        let mut offsets = vec![0];
        for document in documents {
            tokens.extend_from_slice(document.as_ref());
            offsets.push(tokens.len());
        }
        let vocabulary_size = tokens.iter().max().map_or(0, |&w| w + 1);
        Self {
            tokens,
            offsets,
            vocabulary_size,
        }
    }

    pub fn read(path: &Path, format: CorpusFormat) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let corpus = Self::parse(&content, format)?;
        info!(
            "Read {} documents ({} tokens) from {}",
            corpus.num_documents(),
            corpus.num_tokens(),
            path.display()
        );
        Ok(corpus)
    }

    pub fn parse(text: &str, format: CorpusFormat) -> Result<Self> {
        let mut documents = Vec::new();
        for (line, content) in text.lines().enumerate() {
            let document = match format {
                CorpusFormat::Tokens => parse_tokens(content),
                CorpusFormat::Ldac => parse_ldac(content),
            }
            .map_err(|reason| Error::MalformedCorpus {
                line: line + 1,
                reason,
            })?;
            documents.push(document);
        }
        Ok(Self::from_documents(documents))
    }

    /// Tokens of a document
    #[inline]
    pub fn document(&self, doc: DocId) -> &[WordId] {
        &self.tokens[self.offsets[doc]..self.offsets[doc + 1]]
    }

    #[inline]
    pub fn document_length(&self, doc: DocId) -> usize {
        self.offsets[doc + 1] - self.offsets[doc]
    }

    pub fn num_documents(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Largest word index plus one
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    pub fn average_length(&self) -> f64 {
        if self.num_documents() == 0 {
            return 0.;
        }
        self.num_tokens() as f64 / self.num_documents() as f64
    }
}

impl Len for Corpus {
    fn len(&self) -> usize {
        self.num_documents()
    }
}

fn parse_tokens(line: &str) -> std::result::Result<Vec<WordId>, String> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<WordId>()
                .map_err(|_| format!("'{}' is not a word index", t))
        })
        .collect()
}

fn parse_ldac(line: &str) -> std::result::Result<Vec<WordId>, String> {
    let mut fields = line.split_whitespace();
    let declared: usize = match fields.next() {
        None => return Ok(Vec::new()),
        Some(n) => n
            .parse()
            .map_err(|_| format!("'{}' is not a number of entries", n))?,
    };

    let mut tokens = Vec::new();
    let mut entries = 0;
    for field in fields {
        let (word, count) = field
            .split_once(':')
            .ok_or_else(|| format!("'{}' is not an id:count pair", field))?;
        let word: WordId = word
            .parse()
            .map_err(|_| format!("'{}' is not a word index", word))?;
        let count: usize = count
            .parse()
            .map_err(|_| format!("'{}' is not a count", count))?;
        tokens.extend(std::iter::repeat(word).take(count));
        entries += 1;
    }

    if entries != declared {
        return Err(format!("expected {} entries, got {}", declared, entries));
    }
    Ok(tokens)
}

fn parse_value<T: FromStr>(line: usize, value: &str, what: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| Error::MalformedCorpus {
        line,
        reason: format!("'{}' is not a valid {}", value, what),
    })
}

/// Number of documents containing each word
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentFrequencies {
    pub num_documents: usize,
    pub frequencies: Vec<u32>,
}

impl DocumentFrequencies {
    /// Reads a table whose first entry is the number of documents,
    /// followed by the frequency of each word index
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut values = text.lines().enumerate().flat_map(|(line, content)| {
            content.split_whitespace().map(move |v| (line + 1, v))
        });

        let num_documents = match values.next() {
            Some((line, v)) => parse_value::<usize>(line, v, "number of documents")?,
            None => 0,
        };
        let frequencies = values
            .map(|(line, v)| parse_value::<u32>(line, v, "document frequency"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            num_documents,
            frequencies,
        })
    }

    pub fn from_corpus(corpus: &Corpus) -> Self {
        let mut frequencies = vec![0u32; corpus.vocabulary_size()];
        let mut seen = vec![DocId::MAX; corpus.vocabulary_size()];
        for doc in 0..corpus.num_documents() {
            for &word in corpus.document(doc) {
                if seen[word] != doc {
                    seen[word] = doc;
                    frequencies[word] += 1;
                }
            }
        }
        Self {
            num_documents: corpus.num_documents(),
            frequencies,
        }
    }

    /// Frequency of a word (0 for words outside the table)
    #[inline]
    pub fn get(&self, word: WordId) -> u32 {
        self.frequencies.get(word).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldac() {
        let corpus = Corpus::parse("2 3:2 0:1\n\n1 5:1", CorpusFormat::Ldac).unwrap();
        assert_eq!(corpus.num_documents(), 3);
        assert_eq!(corpus.document(0), &[3, 3, 0]);
        assert_eq!(corpus.document_length(1), 0);
        assert_eq!(corpus.vocabulary_size(), 6);
        assert_eq!(corpus.average_length(), 4. / 3.);
    }

    #[test]
    fn test_ldac_count_mismatch() {
        let r = Corpus::parse("3 3:2 0:1", CorpusFormat::Ldac);
        assert!(matches!(r, Err(Error::MalformedCorpus { line: 1, .. })));
    }

    #[test]
    fn test_frequencies_from_corpus() {
        let corpus = Corpus::from_documents([vec![0, 1, 1], vec![1, 2], vec![]]);
        let df = DocumentFrequencies::from_corpus(&corpus);
        assert_eq!(df.num_documents, 3);
        assert_eq!(df.frequencies, vec![1, 2, 1]);
        assert_eq!(df.get(10), 0);
    }

    #[test]
    fn test_read_frequencies() {
        let df = DocumentFrequencies::parse("10
4 0
7").unwrap();
        assert_eq!(df.num_documents, 10);
        assert_eq!(df.frequencies, vec![4, 0, 7]);
    }

    #[test]
    fn test_frequency_out_of_range() {
        // u32::MAX + 2 must not wrap around to 1
        let r = DocumentFrequencies::parse("10 3
4294967297");
        assert!(matches!(r, Err(Error::MalformedCorpus { line: 2, .. })));

        let r = DocumentFrequencies::parse("10
3

-1");
        assert!(matches!(r, Err(Error::MalformedCorpus { line: 4, .. })));
    }
}
