//! TF-IDF retrieval over a small, fixed text corpus.
//!
//! [`CorpusIndex`] is built once at startup: it splits the corpus into
//! paragraph chunks, computes IDF statistics, and holds one sparse TF-IDF
//! vector per chunk. Ranking scores a query against every chunk by cosine
//! similarity and returns the most relevant text.

pub mod error;
pub mod index;
pub mod search;
pub mod tokenizer;

pub use error::RetrievalError;
pub use index::{CorpusIndex, SparseVector};
pub use search::{cosine_similarity, ScoredChunk, DEFAULT_TOP_K};
