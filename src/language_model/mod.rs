//! Unigram probabilities plus a sparse, interpolated bigram table.

mod persistence;
mod training;

use std::cmp::Ordering;

use crate::error::DecoderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordBigram {
    pub first_word: usize,
    pub second_word: usize,
    /// Interpolated `P(second_word | first_word)`.
    pub probability: f32,
}

impl WordBigram {
    fn key(&self) -> (usize, usize) {
        (self.second_word, self.first_word)
    }
}

/// Bigram language model.
///
/// Bigrams are kept sorted by `(second_word, first_word)` without duplicates,
/// which is what lookups rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageModel {
    unigrams: Vec<f32>,
    bigrams: Vec<WordBigram>,
}

impl LanguageModel {
    /// Builds a model from explicit tables. Bigrams may come in any order but
    /// must not repeat a pair or reference a word without a unigram.
    pub fn from_parts(
        unigrams: Vec<f32>,
        mut bigrams: Vec<WordBigram>,
    ) -> Result<Self, DecoderError> {
        if unigrams.is_empty() {
            return Err(DecoderError::invalid_argument("model needs at least one unigram"));
        }
        if let Some(bad) = unigrams.iter().find(|p| !is_probability(**p)) {
            return Err(DecoderError::invalid_argument(format!(
                "unigram probability {bad} is outside [0, 1]"
            )));
        }
        if let Some(bad) = bigrams.iter().find(|b| !is_probability(b.probability)) {
            return Err(DecoderError::invalid_argument(format!(
                "bigram ({}, {}) probability {} is outside [0, 1]",
                bad.first_word, bad.second_word, bad.probability
            )));
        }
        let words = unigrams.len();
        if let Some(bad) = bigrams
            .iter()
            .find(|b| b.first_word >= words || b.second_word >= words)
        {
            return Err(DecoderError::invalid_argument(format!(
                "bigram ({}, {}) references a word outside the {words}-word vocabulary",
                bad.first_word, bad.second_word
            )));
        }
        bigrams.sort_by_key(WordBigram::key);
        if !is_strictly_sorted(&bigrams) {
            return Err(DecoderError::invalid_argument("bigram table repeats a word pair"));
        }
        Ok(Self::from_sorted_parts(unigrams, bigrams))
    }

    pub(crate) fn from_sorted_parts(unigrams: Vec<f32>, bigrams: Vec<WordBigram>) -> Self {
        debug_assert!(is_strictly_sorted(&bigrams));
        Self { unigrams, bigrams }
    }

    pub fn unigrams_number(&self) -> usize {
        self.unigrams.len()
    }

    pub fn bigrams_number(&self) -> usize {
        self.bigrams.len()
    }

    pub fn unigrams(&self) -> &[f32] {
        &self.unigrams
    }

    pub fn bigrams(&self) -> &[WordBigram] {
        &self.bigrams
    }

    pub fn unigram_probability(&self, word: usize) -> f32 {
        self.unigrams.get(word).copied().unwrap_or(0.0)
    }

    /// Stored `P(second | first)`, or `0.0` when the pair was pruned or the
    /// words are unknown.
    pub fn bigram_probability(&self, first: usize, second: usize) -> f32 {
        if first >= self.unigrams.len() || second >= self.unigrams.len() {
            return 0.0;
        }
        self.bigrams
            .binary_search_by(|bigram| bigram.key().cmp(&(second, first)))
            .map(|idx| self.bigrams[idx].probability)
            .unwrap_or(0.0)
    }

    /// Probability used when `word` follows `previous`: the bigram when one is
    /// stored, the unigram otherwise.
    ///
    /// The fallback is the full `P(word)`, not the `(1 - lambda) * P(word)`
    /// floor the pair had before training dropped it, since `lambda` is not
    /// part of the model. A pair dropped at `eps` can therefore decode as more
    /// likely than some stored pairs.
    pub fn transition_probability(&self, previous: Option<usize>, word: usize) -> f32 {
        let bigram = previous
            .map(|prev| self.bigram_probability(prev, word))
            .unwrap_or(0.0);
        if bigram > 0.0 {
            bigram
        } else {
            self.unigram_probability(word)
        }
    }
}

pub(crate) fn is_probability(p: f32) -> bool {
    p.is_finite() && (0.0..=1.0).contains(&p)
}

pub(crate) fn is_strictly_sorted(bigrams: &[WordBigram]) -> bool {
    bigrams
        .windows(2)
        .all(|pair| pair[0].key().cmp(&pair[1].key()) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> LanguageModel {
        LanguageModel::from_sorted_parts(
            vec![0.5, 0.3, 0.2],
            vec![
                WordBigram {
                    first_word: 1,
                    second_word: 0,
                    probability: 0.6,
                },
                WordBigram {
                    first_word: 0,
                    second_word: 2,
                    probability: 0.8,
                },
                WordBigram {
                    first_word: 1,
                    second_word: 2,
                    probability: 0.1,
                },
            ],
        )
    }

    #[test]
    fn lookup_finds_stored_pairs() {
        let model = small_model();
        assert_eq!(model.bigram_probability(0, 2), 0.8);
        assert_eq!(model.bigram_probability(1, 0), 0.6);
        assert_eq!(model.bigram_probability(1, 2), 0.1);
    }

    #[test]
    fn lookup_misses_are_zero() {
        let model = small_model();
        assert_eq!(model.bigram_probability(2, 2), 0.0);
        assert_eq!(model.bigram_probability(7, 0), 0.0);
        assert_eq!(model.bigram_probability(0, 7), 0.0);
        assert_eq!(model.unigram_probability(3), 0.0);

        let empty = LanguageModel::from_sorted_parts(Vec::new(), Vec::new());
        assert_eq!(empty.bigram_probability(0, 0), 0.0);
    }

    #[test]
    fn transition_falls_back_to_unigram() {
        let model = small_model();
        assert_eq!(model.transition_probability(Some(0), 2), 0.8);
        assert_eq!(model.transition_probability(Some(2), 1), 0.3);
        assert_eq!(model.transition_probability(None, 0), 0.5);
    }

    #[test]
    fn from_parts_sorts_and_validates() {
        let mut bigrams = small_model().bigrams().to_vec();
        bigrams.reverse();
        let model = LanguageModel::from_parts(vec![0.5, 0.3, 0.2], bigrams.clone()).unwrap();
        assert_eq!(model, small_model());

        bigrams.push(bigrams[0]);
        assert!(LanguageModel::from_parts(vec![0.5, 0.3, 0.2], bigrams).is_err());
        assert!(LanguageModel::from_parts(Vec::new(), Vec::new()).is_err());
        let stray = WordBigram {
            first_word: 0,
            second_word: 3,
            probability: 0.1,
        };
        assert!(LanguageModel::from_parts(vec![0.5, 0.5], vec![stray]).is_err());
    }

    #[test]
    fn from_parts_rejects_values_that_are_not_probabilities() {
        let over = WordBigram {
            first_word: 0,
            second_word: 1,
            probability: 7.5,
        };
        assert!(LanguageModel::from_parts(vec![0.5, 0.5], vec![over]).is_err());
        for bad in [f32::NAN, f32::INFINITY, -0.1, 1.5] {
            assert!(LanguageModel::from_parts(vec![bad, 0.5], Vec::new()).is_err());
        }
        assert!(is_probability(0.0));
        assert!(is_probability(1.0));
    }

    #[test]
    fn sortedness_check() {
        assert!(is_strictly_sorted(small_model().bigrams()));
        let mut bigrams = small_model().bigrams().to_vec();
        bigrams.swap(0, 1);
        assert!(!is_strictly_sorted(&bigrams));
    }
}
