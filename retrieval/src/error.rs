use thiserror::Error;

/// Failures the indexing and scoring pipeline can report. Callers of
/// [`crate::CorpusIndex::build`] and
/// [`crate::CorpusIndex::find_relevant_context`] never see these: both
/// degrade instead of failing.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("non-finite weight for token {token:?}")]
    NonFiniteWeight { token: String },
    #[error("non-finite similarity for chunk {chunk_id}")]
    NonFiniteScore { chunk_id: usize },
}
