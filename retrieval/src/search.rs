use std::cmp::Ordering;

use crate::error::RetrievalError;
use crate::index::{term_frequencies, tfidf_vector, CorpusIndex, SparseVector};
use crate::tokenizer::tokenize;

/// How many chunks `find_relevant_context` selects when the caller has no
/// preference.
pub const DEFAULT_TOP_K: usize = 3;

/// Upper bound, in chars, on the raw-corpus prefix served when scoring fails.
const FALLBACK_PREFIX_CHARS: usize = 500;

/// One chunk's rank against a query. `chunk_id` is the chunk's position in
/// the corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: usize,
    pub score: f32,
}

/// Cosine similarity between two sparse vectors. The dot product runs over
/// the key-set intersection; magnitudes run over every entry of each vector.
/// No overlap or a zero magnitude yields 0 rather than an error.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut dot = 0.0f32;
    for (token, weight) in small {
        if let Some(other) = large.get(token) {
            dot += weight * other;
        }
    }
    if dot == 0.0 {
        return 0.0;
    }
    let mag_a: f32 = a.values().map(|w| w * w).sum::<f32>().sqrt();
    let mag_b: f32 = b.values().map(|w| w * w).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

impl CorpusIndex {
    /// Score every chunk against the question and sort descending. The sort
    /// is stable: ties keep original corpus order. The question's vector is
    /// built against the shared IDF table exactly as chunks were at indexing
    /// time; the question itself never joins the corpus.
    pub fn rank(&self, question: &str) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let tokens = tokenize(question);
        let tf = term_frequencies(&tokens);
        let query_vector = tfidf_vector(&tf, &self.idf)?;

        let mut scored = Vec::with_capacity(self.chunk_vectors.len());
        for (chunk_id, chunk_vector) in self.chunk_vectors.iter().enumerate() {
            let score = cosine_similarity(&query_vector, chunk_vector);
            if !score.is_finite() {
                return Err(RetrievalError::NonFiniteScore { chunk_id });
            }
            scored.push(ScoredChunk { chunk_id, score });
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(scored)
    }

    /// The top `top_k` chunk texts joined by a blank line, most relevant
    /// first. Never fails: if scoring fails the result degrades to a bounded
    /// prefix of the raw corpus text, trading quality for availability.
    pub fn find_relevant_context(&self, question: &str, top_k: usize) -> String {
        match self.rank(question) {
            Ok(ranked) => ranked
                .iter()
                .take(top_k)
                .map(|hit| self.chunks[hit.chunk_id].as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(err) => {
                tracing::warn!(error = %err, "scoring failed, serving raw corpus prefix");
                self.raw_text.chars().take(FALLBACK_PREFIX_CHARS).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = "Neurons communicate via synapses.\n\nSynaptogenesis forms new synapses.";

    #[test]
    fn cosine_of_disjoint_vectors_is_zero() {
        let a = SparseVector::from([("axon".to_string(), 1.0)]);
        let b = SparseVector::from([("dendrite".to_string(), 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_guards_zero_magnitudes() {
        let a = SparseVector::from([("axon".to_string(), 0.0)]);
        let b = SparseVector::from([("axon".to_string(), 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &a), 0.0);
    }

    #[test]
    fn identical_vectors_score_one() {
        let a = SparseVector::from([("axon".to_string(), 0.3), ("soma".to_string(), 0.7)]);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = SparseVector::from([("axon".to_string(), 0.3), ("soma".to_string(), 0.7)]);
        let b = SparseVector::from([("axon".to_string(), 0.5), ("dendrite".to_string(), 0.2)]);
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn rank_reports_non_finite_scores() {
        let mut index = CorpusIndex::build(CORPUS);
        index.chunk_vectors[0].insert("neurons".to_string(), f32::NAN);
        assert!(matches!(
            index.rank("neurons"),
            Err(RetrievalError::NonFiniteScore { chunk_id: 0 })
        ));
    }

    #[test]
    fn scoring_failure_falls_back_to_corpus_prefix() {
        let mut index = CorpusIndex::build(CORPUS);
        index.idf.insert("neurons".to_string(), f32::NAN);
        let context = index.find_relevant_context("neurons", DEFAULT_TOP_K);
        assert_eq!(context, CORPUS);
    }

    #[test]
    fn fallback_prefix_is_bounded() {
        let long_corpus = "synapse ".repeat(200);
        let mut index = CorpusIndex::build(&long_corpus);
        index.idf.insert("synapse".to_string(), f32::NAN);
        let context = index.find_relevant_context("synapse", DEFAULT_TOP_K);
        assert_eq!(context.chars().count(), 500);
        assert!(long_corpus.starts_with(&context));
    }
}
