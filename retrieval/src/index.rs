use std::collections::{HashMap, HashSet};

use crate::error::RetrievalError;
use crate::tokenizer::tokenize;

/// Sparse token-to-weight vector. The vocabulary is open-ended and
/// per-document, so vectors stay maps rather than dense arrays.
pub type SparseVector = HashMap<String, f32>;

/// Immutable TF-IDF index over a corpus, built once at startup and shared
/// read-only for the life of the process.
pub struct CorpusIndex {
    pub(crate) raw_text: String,
    pub(crate) chunks: Vec<String>,
    pub(crate) idf: SparseVector,
    pub(crate) chunk_vectors: Vec<SparseVector>,
}

impl CorpusIndex {
    /// Build the index, degrading to an empty one (no chunks, no IDF table)
    /// if indexing fails. The raw text is retained either way so queries can
    /// still fall back to a corpus prefix.
    pub fn build(text: &str) -> Self {
        match Self::try_build(text) {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(error = %err, "corpus indexing failed, serving an empty index");
                Self {
                    raw_text: text.to_string(),
                    chunks: Vec::new(),
                    idf: SparseVector::new(),
                    chunk_vectors: Vec::new(),
                }
            }
        }
    }

    /// Index the corpus: split into chunks on blank lines, compute the IDF
    /// table from document frequencies, then one TF-IDF vector per chunk.
    pub fn try_build(text: &str) -> Result<Self, RetrievalError> {
        let chunks = split_chunks(text);
        let chunk_tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(c)).collect();

        // Document frequency counts presence, not occurrences.
        let mut df: HashMap<String, usize> = HashMap::new();
        for tokens in &chunk_tokens {
            let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in distinct {
                *df.entry(token.to_string()).or_insert(0) += 1;
            }
        }

        let n = chunks.len() as f32;
        let mut idf = SparseVector::with_capacity(df.len());
        for (token, freq) in df {
            idf.insert(token, (n / freq as f32).ln());
        }

        let mut chunk_vectors = Vec::with_capacity(chunks.len());
        for tokens in &chunk_tokens {
            let tf = term_frequencies(tokens);
            chunk_vectors.push(tfidf_vector(&tf, &idf)?);
        }

        Ok(Self {
            raw_text: text.to_string(),
            chunks,
            idf,
            chunk_vectors,
        })
    }

    /// Chunk texts in corpus order. Positions in this slice identify chunks.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The shared IDF table: `ln(chunk_count / chunks_containing_token)` per
    /// token seen anywhere in the corpus.
    pub fn idf(&self) -> &SparseVector {
        &self.idf
    }

    /// One TF-IDF vector per chunk, in corpus order.
    pub fn chunk_vectors(&self) -> &[SparseVector] {
        &self.chunk_vectors
    }
}

/// Split on blank lines, trim each piece, drop empty pieces. Order matters:
/// chunk ids downstream are positions in this list.
fn split_chunks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token counts normalized by document length. Empty token streams yield an
/// empty vector rather than dividing by zero.
pub(crate) fn term_frequencies(tokens: &[String]) -> SparseVector {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token).or_insert(0) += 1;
    }
    let total = tokens.len() as f32;
    counts
        .into_iter()
        .map(|(token, count)| (token.to_string(), count as f32 / total))
        .collect()
}

/// Multiply TF entries by their IDF weights. Tokens the IDF table has never
/// seen contribute nothing and are dropped, so the result's key set is always
/// a subset of the TF vector's.
pub(crate) fn tfidf_vector(
    tf: &SparseVector,
    idf: &SparseVector,
) -> Result<SparseVector, RetrievalError> {
    let mut weights = SparseVector::with_capacity(tf.len());
    for (token, tf_value) in tf {
        let Some(idf_value) = idf.get(token) else {
            continue;
        };
        let weight = tf_value * idf_value;
        if !weight.is_finite() {
            return Err(RetrievalError::NonFiniteWeight {
                token: token.clone(),
            });
        }
        weights.insert(token.clone(), weight);
    }
    Ok(weights)
}
