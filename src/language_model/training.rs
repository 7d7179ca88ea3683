use std::collections::HashMap;

use super::{LanguageModel, WordBigram};
use crate::error::DecoderError;
use crate::types::MlfPart;

impl LanguageModel {
    /// Estimates a model from word-level transcriptions.
    ///
    /// Bigrams are counted between adjacent words of the same utterance only.
    /// Every pair of the vocabulary gets
    /// `lambda * count(w1,w2)/count(w1) + (1 - lambda) * P(w2)`, and pairs at
    /// or below `eps` are left out of the table.
    pub fn train(
        corpus: &[MlfPart],
        words_count: usize,
        lambda: f32,
        eps: f32,
    ) -> Result<Self, DecoderError> {
        if corpus.is_empty() {
            return Err(DecoderError::invalid_argument("training corpus is empty"));
        }
        if words_count == 0 {
            return Err(DecoderError::invalid_argument("words_count must be positive"));
        }
        if !(0.0..=1.0).contains(&lambda) {
            return Err(DecoderError::invalid_argument(format!(
                "lambda must be within [0, 1], got {lambda}"
            )));
        }
        if !(0.0..1.0).contains(&eps) {
            return Err(DecoderError::invalid_argument(format!(
                "eps must be within [0, 1), got {eps}"
            )));
        }

        let mut unigram_counts = vec![0u64; words_count];
        let mut bigram_counts: HashMap<(usize, usize), u64> = HashMap::new();
        let mut total = 0u64;

        for part in corpus {
            let words = part.labels();
            if let Some(&bad) = words.iter().find(|&&w| w >= words_count) {
                return Err(DecoderError::malformed(
                    "training corpus",
                    format!("'{}' uses word id {bad} outside the vocabulary", part.name),
                ));
            }
            for &word in &words {
                unigram_counts[word] += 1;
                total += 1;
            }
            for pair in words.windows(2) {
                *bigram_counts.entry((pair[0], pair[1])).or_insert(0) += 1;
            }
        }

        if total == 0 {
            return Err(DecoderError::malformed(
                "training corpus",
                "no words in any transcription",
            ));
        }

        let unigrams_f64: Vec<f64> = unigram_counts
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect();
        let lambda = f64::from(lambda);
        let eps = f64::from(eps);

        let mut bigrams = Vec::new();
        for second in 0..words_count {
            let floor = (1.0 - lambda) * unigrams_f64[second];
            for first in 0..words_count {
                let pair_count = bigram_counts.get(&(first, second)).copied().unwrap_or(0);
                let mle = if unigram_counts[first] == 0 {
                    0.0
                } else {
                    pair_count as f64 / unigram_counts[first] as f64
                };
                let probability = lambda * mle + floor;
                if probability > eps {
                    bigrams.push(WordBigram {
                        first_word: first,
                        second_word: second,
                        probability: probability as f32,
                    });
                }
            }
        }

        tracing::info!(
            utterances = corpus.len(),
            words = total,
            observed_pairs = bigram_counts.len(),
            stored_bigrams = bigrams.len(),
            "trained bigram language model"
        );

        let unigrams = unigrams_f64.into_iter().map(|p| p as f32).collect();
        Ok(Self::from_sorted_parts(unigrams, bigrams))
    }
}
