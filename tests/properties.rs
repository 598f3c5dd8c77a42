use std::collections::BTreeSet;

use asr_metrics::alignment::edit_distance::{align_sequences, edit_distance};
use asr_metrics::{process_words, EditCounts, EditOp, Pipeline, Transform, ZeroLengthPolicy};
use proptest::prelude::*;

fn token_sequence() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e"]), 0..12)
        .prop_map(|tokens| tokens.into_iter().map(str::to_string).collect())
}

fn sentence() -> impl Strategy<Value = String> {
    "[a-zA-Z',.!? ]{0,40}"
}

fn word_sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["the", "cat", "sat", "on", "a", "mat"]), 0..8)
        .prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn counts_match_sequence_lengths(reference in token_sequence(), hypothesis in token_sequence()) {
        let alignment = align_sequences(&reference, &hypothesis);
        let counts = alignment.counts;
        prop_assert_eq!(counts.hits + counts.substitutions + counts.deletions, reference.len());
        prop_assert_eq!(counts.hits + counts.substitutions + counts.insertions, hypothesis.len());
        prop_assert_eq!(counts.errors(), edit_distance(&reference, &hypothesis));
    }

    #[test]
    fn chunks_partition_both_sequences(reference in token_sequence(), hypothesis in token_sequence()) {
        let alignment = align_sequences(&reference, &hypothesis);
        let mut ref_cursor = 0;
        let mut hyp_cursor = 0;
        for (idx, chunk) in alignment.chunks.iter().enumerate() {
            prop_assert_eq!(chunk.ref_start, ref_cursor);
            prop_assert_eq!(chunk.hyp_start, hyp_cursor);
            prop_assert!(!chunk.is_empty());
            if idx > 0 {
                prop_assert_ne!(alignment.chunks[idx - 1].op, chunk.op);
            }
            match chunk.op {
                EditOp::Equal => prop_assert_eq!(
                    &reference[chunk.ref_start..chunk.ref_end],
                    &hypothesis[chunk.hyp_start..chunk.hyp_end]
                ),
                EditOp::Substitute => prop_assert_eq!(chunk.ref_len(), chunk.hyp_len()),
                EditOp::Delete => prop_assert_eq!(chunk.hyp_len(), 0),
                EditOp::Insert => prop_assert_eq!(chunk.ref_len(), 0),
            }
            ref_cursor = chunk.ref_end;
            hyp_cursor = chunk.hyp_end;
        }
        prop_assert_eq!(ref_cursor, reference.len());
        prop_assert_eq!(hyp_cursor, hypothesis.len());
    }

    #[test]
    fn swapping_sides_swaps_deletions_and_insertions(
        reference in token_sequence(),
        hypothesis in token_sequence(),
    ) {
        let forward = align_sequences(&reference, &hypothesis);
        let backward = align_sequences(&hypothesis, &reference);
        prop_assert_eq!(forward.edit_distance(), backward.edit_distance());
        prop_assert_eq!(forward.counts.reference_len(), backward.counts.hypothesis_len());
        prop_assert_eq!(forward.counts.hypothesis_len(), backward.counts.reference_len());
        // Equal-cost paths may trade a substitution for a deletion/insertion
        // pair, so compare the net length change instead of raw counts.
        let forward_net = forward.counts.deletions as i64 - forward.counts.insertions as i64;
        let backward_net = backward.counts.insertions as i64 - backward.counts.deletions as i64;
        prop_assert_eq!(forward_net, backward_net);
    }

    #[test]
    fn default_pipelines_are_idempotent(text in sentence()) {
        let normalized = Pipeline::word_normalized().expect("word_normalized preset");
        for pipeline in [Pipeline::word_default(), Pipeline::character_default(), normalized] {
            let once = pipeline.tokenize_str(&text).expect("segmenting preset");
            let twice = pipeline
                .tokenize_str(&pipeline.detokenize(&once))
                .expect("segmenting preset");
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn unique_token_reduction_is_idempotent(text in word_sentence()) {
        let vocabulary: BTreeSet<String> = ["the", "cat", "mat"].iter().map(|w| w.to_string()).collect();
        let reduce = Transform::ReduceToUniqueTokens {
            vocabulary,
            sentinel: "<unk>".to_string(),
        };
        let once = Pipeline::new(vec![Transform::split_into_words(), reduce.clone()])
            .expect("valid pipeline");
        let twice = Pipeline::new(vec![Transform::split_into_words(), reduce.clone(), reduce])
            .expect("valid pipeline");
        prop_assert_eq!(
            once.tokenize_str(&text).expect("tokenize"),
            twice.tokenize_str(&text).expect("tokenize")
        );
    }

    #[test]
    fn corpus_counts_are_the_sum_of_pairs(
        pairs in prop::collection::vec((word_sentence(), word_sentence()), 1..6),
    ) {
        let (references, hypotheses): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
        let batch = process_words(references.clone(), hypotheses.clone(), ZeroLengthPolicy::Lenient)
            .expect("batch evaluation");

        let mut expected = EditCounts::default();
        for (reference, hypothesis) in references.into_iter().zip(hypotheses) {
            let single = process_words(reference, hypothesis, ZeroLengthPolicy::Lenient)
                .expect("single evaluation");
            expected += single.corpus.counts;
        }
        prop_assert_eq!(batch.corpus.counts, expected);
        let pair_sum: EditCounts = batch.pairs.iter().map(|pair| pair.counts()).sum();
        prop_assert_eq!(batch.corpus.counts, pair_sum);
    }
}
