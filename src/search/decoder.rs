use std::collections::HashMap;

use crate::error::DecoderError;
use crate::language_model::LanguageModel;
use crate::pipeline::traits::{NodeId, SearchLexicon};
use crate::search::backtrack::BacktrackStack;
use crate::search::confusion::{ConfusionPenaltyMatrix, MAXIMUM_PENALTY};
use crate::types::{SearchParams, TranscriptionNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HypothesisState {
    /// Inside a word, consuming phoneme frames.
    SearchingWord,
    /// Back at the lexicon root right after completing a word.
    WordComplete,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    node: NodeId,
    last_word: Option<usize>,
    score: f64,
    backtrack: BacktrackStack,
}

impl Hypothesis {
    fn state(&self, root: NodeId) -> HypothesisState {
        if self.node == root {
            HypothesisState::WordComplete
        } else {
            HypothesisState::SearchingWord
        }
    }
}

/// Hypotheses of one frame, recombined on `(node, last_word)`.
///
/// Insertion order is discovery order; a later hypothesis only replaces an
/// earlier one on a strictly lower score, which keeps ties deterministic.
#[derive(Default)]
struct Beam {
    hypotheses: Vec<Hypothesis>,
    slots: HashMap<(NodeId, Option<usize>), usize>,
}

impl Beam {
    fn offer(
        &mut self,
        node: NodeId,
        last_word: Option<usize>,
        score: f64,
        backtrack: &BacktrackStack,
    ) {
        match self.slots.get(&(node, last_word)) {
            Some(&slot) => {
                let existing = &mut self.hypotheses[slot];
                if score < existing.score {
                    existing.score = score;
                    existing.backtrack.copy_from(backtrack);
                }
            }
            None => {
                let mut copy = BacktrackStack::new();
                copy.copy_from(backtrack);
                self.slots.insert((node, last_word), self.hypotheses.len());
                self.hypotheses.push(Hypothesis {
                    node,
                    last_word,
                    score,
                    backtrack: copy,
                });
            }
        }
    }

    fn best_score(&self) -> Option<f64> {
        self.hypotheses
            .iter()
            .map(|h| h.score)
            .fold(None, |best, s| match best {
                Some(b) if b <= s => Some(b),
                _ => Some(s),
            })
    }

    /// Drops hypotheses scoring worse than `best + pruning_coeff`; returns how
    /// many were dropped.
    fn prune(&mut self, pruning_coeff: f64) -> usize {
        let Some(best) = self.best_score() else {
            return 0;
        };
        let threshold = best + pruning_coeff;
        let before = self.hypotheses.len();
        self.hypotheses.retain(|h| h.score <= threshold);
        before - self.hypotheses.len()
    }

    fn into_hypotheses(self) -> Vec<Hypothesis> {
        self.hypotheses
    }
}

/// Frame-synchronous lexicon search.
///
/// Scores are costs (lower is better). Consuming a frame whose observed
/// phoneme is `o` while the lexicon expects `q` costs
/// `frame.probability * penalty(q, o)`; entering a word costs
/// `lambda * -log10 P(word | previous word)`.
pub fn decode<L>(
    frames: &[TranscriptionNode],
    lexicon: &L,
    confusion: &ConfusionPenaltyMatrix,
    model: &LanguageModel,
    params: SearchParams,
) -> Result<Vec<TranscriptionNode>, DecoderError>
where
    L: SearchLexicon + ?Sized,
{
    validate_inputs(frames, lexicon, confusion, model, params)?;

    let root = lexicon.root();
    let mut active = vec![Hypothesis {
        node: root,
        last_word: None,
        score: 0.0,
        backtrack: BacktrackStack::new(),
    }];
    let mut peak_active = 1usize;
    let mut pruned_total = 0usize;

    for (frame_idx, frame) in frames.iter().enumerate() {
        let mut beam = Beam::default();
        let weight = f64::from(frame.probability);

        for hyp in &active {
            if let Some(phoneme) = lexicon.phoneme(hyp.node) {
                if let Some(cost) = acoustic_cost(confusion, phoneme, frame.label, weight) {
                    beam.offer(hyp.node, hyp.last_word, hyp.score + cost, &hyp.backtrack);
                }
            }
            for &child in lexicon.successors(hyp.node) {
                let Some(phoneme) = lexicon.phoneme(child) else {
                    continue;
                };
                if let Some(cost) = acoustic_cost(confusion, phoneme, frame.label, weight) {
                    beam.offer(child, hyp.last_word, hyp.score + cost, &hyp.backtrack);
                }
            }
        }

        let mut completed = Vec::new();
        for hyp in &beam.hypotheses {
            for &word_node in lexicon.completions(hyp.node) {
                let Some(word) = lexicon.word(word_node) else {
                    continue;
                };
                let probability = model.transition_probability(hyp.last_word, word);
                if probability <= 0.0 {
                    continue;
                }
                let lm_cost = -f64::from(probability).log10() * params.lambda;
                let mut backtrack = hyp.backtrack.clone();
                backtrack.push(word, frame.end_time);
                completed.push((word, hyp.score + lm_cost, backtrack));
            }
        }
        for (word, score, backtrack) in &completed {
            beam.offer(root, Some(*word), *score, backtrack);
        }

        pruned_total += beam.prune(params.pruning_coeff);
        active = beam.into_hypotheses();
        if active.is_empty() {
            return Err(DecoderError::inconsistent(format!(
                "no hypothesis can explain frame {frame_idx} (phoneme {})",
                frame.label
            )));
        }
        peak_active = peak_active.max(active.len());
    }

    let best = select_best(&active, root)?;
    let words = unwind(&best.backtrack, frames);
    tracing::debug!(
        frames = frames.len(),
        peak_active,
        pruned = pruned_total,
        words = words.len(),
        score = best.score,
        "decoded utterance"
    );
    Ok(words)
}

fn validate_inputs<L>(
    frames: &[TranscriptionNode],
    lexicon: &L,
    confusion: &ConfusionPenaltyMatrix,
    model: &LanguageModel,
    params: SearchParams,
) -> Result<(), DecoderError>
where
    L: SearchLexicon + ?Sized,
{
    if frames.is_empty() {
        return Err(DecoderError::invalid_argument("source transcription is empty"));
    }
    if params.pruning_coeff.is_nan() || params.pruning_coeff < 0.0 {
        return Err(DecoderError::invalid_argument(format!(
            "pruning coefficient must be non-negative, got {}",
            params.pruning_coeff
        )));
    }
    if !params.lambda.is_finite() || params.lambda < 0.0 {
        return Err(DecoderError::invalid_argument(format!(
            "lambda must be finite and non-negative, got {}",
            params.lambda
        )));
    }
    if lexicon.is_empty() {
        return Err(DecoderError::invalid_argument("lexicon is empty"));
    }
    if model.unigrams_number() == 0 {
        return Err(DecoderError::inconsistent("language model has no unigrams"));
    }
    if model.unigrams_number() < lexicon.words_number() {
        return Err(DecoderError::inconsistent(format!(
            "language model covers {} words, lexicon uses {}",
            model.unigrams_number(),
            lexicon.words_number()
        )));
    }
    for (idx, frame) in frames.iter().enumerate() {
        if !confusion.covers_phoneme(frame.label) {
            return Err(DecoderError::invalid_argument(format!(
                "frame {idx} has phoneme {} outside the confusion matrix",
                frame.label
            )));
        }
        if !(frame.probability > 0.0 && frame.probability <= 1.0) {
            return Err(DecoderError::invalid_argument(format!(
                "frame {idx} has probability {} outside (0, 1]",
                frame.probability
            )));
        }
    }
    Ok(())
}

fn acoustic_cost(
    confusion: &ConfusionPenaltyMatrix,
    expected: usize,
    observed: usize,
    weight: f64,
) -> Option<f64> {
    let penalty = confusion.between(expected, observed);
    if penalty >= MAXIMUM_PENALTY {
        return None;
    }
    Some(weight * f64::from(penalty))
}

fn select_best(active: &[Hypothesis], root: NodeId) -> Result<&Hypothesis, DecoderError> {
    let best_of = |state: Option<HypothesisState>| {
        active
            .iter()
            .filter(|h| state.map_or(true, |s| h.state(root) == s))
            .fold(None::<&Hypothesis>, |best, h| match best {
                Some(b) if b.score <= h.score => Some(b),
                _ => Some(h),
            })
    };

    if let Some(best) = best_of(Some(HypothesisState::WordComplete)) {
        return Ok(best);
    }
    let best = best_of(None)
        .ok_or_else(|| DecoderError::inconsistent("no hypothesis survived to the end"))?;
    tracing::warn!(
        words = best.backtrack.len(),
        "utterance ends inside a word; dropping the unfinished word"
    );
    Ok(best)
}

fn unwind(backtrack: &BacktrackStack, frames: &[TranscriptionNode]) -> Vec<TranscriptionNode> {
    let mut start_time = frames.first().and_then(|f| f.start_time);
    backtrack
        .iter()
        .map(|entry| {
            let node = TranscriptionNode {
                label: entry.word,
                start_time,
                end_time: entry.time,
                probability: TranscriptionNode::DEFAULT_PROBABILITY,
            };
            start_time = entry.time;
            node
        })
        .collect()
}
