use std::path::Path;

use crate::error::DecoderError;
use crate::lexicon::vocabulary::{read_dictionary, Vocabulary, PHONEME_TERMINATOR};
use crate::pipeline::traits::{NodeId, SearchLexicon};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearLexiconEntry {
    pub word: usize,
    /// Phoneme ids followed by [`PHONEME_TERMINATOR`].
    pub phonemes: Vec<usize>,
}

impl LinearLexiconEntry {
    /// Length of the pronunciation including the terminator.
    pub fn phonemes_number(&self) -> usize {
        self.phonemes.len()
    }

    pub fn pronunciation(&self) -> &[usize] {
        &self.phonemes[..self.phonemes.len().saturating_sub(1)]
    }
}

/// One flat pronunciation per dictionary line.
///
/// Search node layout: `0` is the root, `1..=P` are the phoneme positions of
/// all entries laid end to end, and `P+1..=P+E` are the word nodes.
#[derive(Debug, Clone)]
pub struct LinearLexicon {
    entries: Vec<LinearLexiconEntry>,
    position_phonemes: Vec<usize>,
    next_position: Vec<Option<NodeId>>,
    completion: Vec<Option<NodeId>>,
    root_successors: Vec<NodeId>,
    words_number: usize,
}

impl LinearLexicon {
    pub fn from_dictionary(
        path: &Path,
        phonemes: &Vocabulary,
        words: &Vocabulary,
    ) -> Result<Self, DecoderError> {
        let entries = read_dictionary(path, phonemes, words)?
            .into_iter()
            .map(|resolved| {
                let mut phonemes = resolved.phonemes;
                phonemes.push(PHONEME_TERMINATOR);
                LinearLexiconEntry {
                    word: resolved.word,
                    phonemes,
                }
            })
            .collect::<Vec<_>>();
        let lexicon = Self::from_entries(entries)?;
        tracing::info!(
            path = %path.display(),
            entries = lexicon.len(),
            "built linear lexicon"
        );
        Ok(lexicon)
    }

    pub fn from_entries(entries: Vec<LinearLexiconEntry>) -> Result<Self, DecoderError> {
        if entries.is_empty() {
            return Err(DecoderError::invalid_argument("lexicon has no entries"));
        }
        for entry in &entries {
            let terminated = entry.phonemes.last() == Some(&PHONEME_TERMINATOR);
            let inner_ok = entry.phonemes[..entry.phonemes.len().saturating_sub(1)]
                .iter()
                .all(|&p| p != PHONEME_TERMINATOR);
            if !terminated || entry.phonemes.len() < 2 || !inner_ok {
                return Err(DecoderError::invalid_argument(format!(
                    "entry for word {} is not a terminated, non-empty pronunciation",
                    entry.word
                )));
            }
        }

        let positions: usize = entries.iter().map(|e| e.phonemes_number() - 1).sum();
        let mut position_phonemes = Vec::with_capacity(positions);
        let mut next_position = Vec::with_capacity(positions);
        let mut completion = Vec::with_capacity(positions);
        let mut root_successors = Vec::with_capacity(entries.len());

        for (entry_idx, entry) in entries.iter().enumerate() {
            let pronunciation = entry.pronunciation();
            root_successors.push(position_phonemes.len() + 1);
            for (pos, &phoneme) in pronunciation.iter().enumerate() {
                let node = position_phonemes.len() + 1;
                position_phonemes.push(phoneme);
                if pos + 1 < pronunciation.len() {
                    next_position.push(Some(node + 1));
                    completion.push(None);
                } else {
                    next_position.push(None);
                    completion.push(Some(positions + 1 + entry_idx));
                }
            }
        }

        let words_number = entries.iter().map(|e| e.word + 1).max().unwrap_or(0);
        Ok(Self {
            entries,
            position_phonemes,
            next_position,
            completion,
            root_successors,
            words_number,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn pronunciations_of(&self, word: usize) -> impl Iterator<Item = &[usize]> {
        self.entries
            .iter()
            .filter(move |entry| entry.word == word)
            .map(LinearLexiconEntry::pronunciation)
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        node.checked_sub(1)
            .filter(|&pos| pos < self.position_phonemes.len())
    }
}

impl SearchLexicon for LinearLexicon {
    fn root(&self) -> NodeId {
        0
    }

    fn successors(&self, node: NodeId) -> &[NodeId] {
        if node == 0 {
            return &self.root_successors;
        }
        self.position(node)
            .map(|pos| self.next_position[pos].as_slice())
            .unwrap_or(&[])
    }

    fn completions(&self, node: NodeId) -> &[NodeId] {
        self.position(node)
            .map(|pos| self.completion[pos].as_slice())
            .unwrap_or(&[])
    }

    fn phoneme(&self, node: NodeId) -> Option<usize> {
        self.position(node).map(|pos| self.position_phonemes[pos])
    }

    fn word(&self, node: NodeId) -> Option<usize> {
        node.checked_sub(self.position_phonemes.len() + 1)
            .and_then(|entry_idx| self.entries.get(entry_idx))
            .map(|entry| entry.word)
    }

    fn words_number(&self) -> usize {
        self.words_number
    }
}
