use ndarray::Array3;
use onnxgen::onnx::{argmax, pad_batch, softmax};
use onnxgen::rerank::{common_prefix_len, score_from_logits};

/// Builds a peaked logits tensor where position `pos` of every batch row
/// strongly predicts `token`.
fn peaked_logits(batch: usize, seq: usize, vocab: usize, pos: usize, token: usize) -> Array3<f32> {
    let mut logits = Array3::zeros((batch, seq, vocab));
    for b in 0..batch {
        logits[[b, pos, token]] = 12.0;
    }
    logits
}

#[test]
fn test_softmax_and_argmax_agree() {
    let logits = vec![0.3, 4.0, -1.2, 3.9];
    let probs = softmax(&logits);
    assert_eq!(argmax(&logits), argmax(&probs));
    assert_eq!(argmax(&logits), 1);
}

#[test]
fn test_pad_batch_masks_match_lengths() {
    let sentences = vec![vec![10, 11, 12, 13], vec![20, 21], vec![30, 31, 32]];
    let (tokens, mask) = pad_batch(&sentences);

    assert_eq!(tokens.shape(), &[3, 4]);
    for (i, sentence) in sentences.iter().enumerate() {
        let ones: i64 = (0..4).map(|j| mask[[i, j]]).sum();
        assert_eq!(ones as usize, sentence.len());
        // Padding positions carry token 0
        for j in sentence.len()..4 {
            assert_eq!(tokens[[i, j]], 0);
        }
    }
}

#[test]
fn test_homophone_ranking_scenario() {
    // Two sentences sharing a prefix and diverging at the last token. The
    // model is confident the continuation after the prefix is token 3, so
    // the sentence spelled with token 3 must win on both score variants.
    let vocab = 8;
    let token_lists = vec![vec![1, 2, 3], vec![1, 2, 5]];
    let sentences = vec!["natural spelling".to_string(), "odd spelling".to_string()];

    let logits = peaked_logits(2, 3, vocab, 1, 3);
    let scores = score_from_logits(&logits, &sentences, &token_lists, None);

    assert_eq!(common_prefix_len(&token_lists), 2);
    assert!(scores[0].log_prob > scores[1].log_prob);
    assert!(scores[0].diff_log_prob > scores[1].diff_log_prob);

    // The diff score drops the shared-prefix terms
    for score in &scores {
        assert!(score.diff_log_prob >= score.log_prob);
    }
}

#[test]
fn test_eos_term_changes_total() {
    let vocab = 4;
    let logits = Array3::zeros((1, 2, vocab));
    let sentences = vec!["x".to_string()];
    let token_lists = vec![vec![1, 2]];

    let with_eos = score_from_logits(&logits, &sentences, &token_lists, Some(0));
    let without_eos = score_from_logits(&logits, &sentences, &token_lists, None);

    assert_eq!(with_eos[0].probs.len(), without_eos[0].probs.len() + 1);
    assert!(with_eos[0].log_prob < without_eos[0].log_prob);
}

#[test]
fn test_scores_preserve_input_order() {
    let logits = Array3::zeros((3, 2, 4));
    let sentences: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let token_lists = vec![vec![1, 2], vec![1, 3], vec![1, 0]];

    let scores = score_from_logits(&logits, &sentences, &token_lists, None);
    let names: Vec<&str> = scores.iter().map(|s| s.sentence.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}
