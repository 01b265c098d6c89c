use retrieval::{CorpusIndex, DEFAULT_TOP_K};

const CORPUS: &str =
    "Neurons communicate via synapses.\n\nSynaptogenesis forms new synapses.\n\nThe sky is blue.";

#[test]
fn it_splits_blank_separated_paragraphs_into_chunks() {
    let index = CorpusIndex::build("  First chunk.\n\n\n\nSecond chunk.  ");
    assert_eq!(index.chunks(), ["First chunk.", "Second chunk."]);
}

#[test]
fn it_builds_idf_from_chunk_presence() {
    let index = CorpusIndex::build(CORPUS);
    assert_eq!(index.chunk_count(), 3);
    // "synapses" appears in two of three chunks, "neurons" in one.
    let synapses = index.idf().get("synapses").copied().unwrap();
    let neurons = index.idf().get("neurons").copied().unwrap();
    assert!((synapses - (3.0f32 / 2.0).ln()).abs() < 1e-6);
    assert!((neurons - 3.0f32.ln()).abs() < 1e-6);
    assert!(index.idf().get("astrocyte").is_none());
}

#[test]
fn it_builds_identically_for_the_same_corpus() {
    let a = CorpusIndex::build(CORPUS);
    let b = CorpusIndex::build(CORPUS);
    assert_eq!(a.idf(), b.idf());
    assert_eq!(a.chunk_vectors(), b.chunk_vectors());
}

#[test]
fn it_zeroes_idf_for_tokens_present_everywhere() {
    let index = CorpusIndex::build("synapse one.\n\nsynapse two.");
    assert_eq!(index.idf().get("synapse").copied(), Some(0.0));
}

#[test]
fn it_ranks_chunks_with_more_lexical_overlap_first() {
    let index = CorpusIndex::build(CORPUS);
    let ranked = index.rank("synapses neurons").unwrap();
    let ids: Vec<usize> = ranked.iter().map(|hit| hit.chunk_id).collect();
    assert_eq!(ids, [0, 1, 2]);
    assert!(ranked[0].score > ranked[1].score);
    assert!(ranked[1].score > ranked[2].score);
    // No shared tokens with the last chunk, so its similarity is exactly zero.
    assert_eq!(ranked[2].score, 0.0);
}

#[test]
fn it_keeps_corpus_order_when_all_scores_tie() {
    let index = CorpusIndex::build(CORPUS);
    let ranked = index.rank("cerebellum plasticity").unwrap();
    assert!(ranked.iter().all(|hit| hit.score == 0.0));
    let ids: Vec<usize> = ranked.iter().map(|hit| hit.chunk_id).collect();
    assert_eq!(ids, [0, 1, 2]);
}

#[test]
fn it_keeps_the_synapse_chunks_ahead_of_the_off_topic_one() {
    let index = CorpusIndex::build(CORPUS);
    let ranked = index.rank("synapse formation").unwrap();
    let last = ranked.last().unwrap();
    assert_eq!(last.chunk_id, 2);
    assert_eq!(last.score, 0.0);
    assert_eq!(
        index.find_relevant_context("synapse formation", 2),
        "Neurons communicate via synapses.\n\nSynaptogenesis forms new synapses."
    );
}

#[test]
fn it_scores_every_chunk_without_touching_the_idf_table() {
    let index = CorpusIndex::build(CORPUS);
    let ranked = index.rank("astrocyte").unwrap();
    assert_eq!(ranked.len(), index.chunk_count());
    assert!(index.idf().get("astrocyte").is_none());
}

#[test]
fn it_ignores_question_tokens_absent_from_the_corpus() {
    let index = CorpusIndex::build(CORPUS);
    let ranked = index.rank("neurons qzx").unwrap();
    assert_eq!(ranked[0].chunk_id, 0);
    assert!(ranked[0].score > 0.0);
}

#[test]
fn it_joins_top_k_chunks_most_relevant_first() {
    let index = CorpusIndex::build(CORPUS);
    assert_eq!(
        index.find_relevant_context("synapses neurons", 2),
        "Neurons communicate via synapses.\n\nSynaptogenesis forms new synapses."
    );
}

#[test]
fn it_serves_the_whole_corpus_when_k_exceeds_chunk_count() {
    let index = CorpusIndex::build(CORPUS);
    assert_eq!(index.find_relevant_context("synapses neurons", 10), CORPUS);
}

#[test]
fn it_serves_nothing_for_k_zero() {
    let index = CorpusIndex::build(CORPUS);
    assert_eq!(index.find_relevant_context("synapses", 0), "");
}

#[test]
fn it_degrades_an_empty_question_to_corpus_order() {
    let index = CorpusIndex::build(CORPUS);
    assert_eq!(index.find_relevant_context("", DEFAULT_TOP_K), CORPUS);
}

#[test]
fn it_serves_nothing_from_an_empty_index() {
    let empty = CorpusIndex::build("");
    assert_eq!(empty.chunk_count(), 0);
    assert_eq!(empty.find_relevant_context("synapses", DEFAULT_TOP_K), "");

    let blank = CorpusIndex::build("   \n\n   ");
    assert_eq!(blank.find_relevant_context("synapses", DEFAULT_TOP_K), "");
}
