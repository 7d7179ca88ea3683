use std::path::Path;

use crate::error::DecoderError;
use crate::lexicon::vocabulary::{read_dictionary, Vocabulary, PHONEME_TERMINATOR};
use crate::pipeline::traits::{NodeId, SearchLexicon};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Init,
    Phoneme(usize),
    Word(usize),
}

#[derive(Debug, Clone)]
struct TrieNode {
    kind: NodeKind,
    phoneme_children: Vec<NodeId>,
    word_children: Vec<NodeId>,
}

impl TrieNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            phoneme_children: Vec::new(),
            word_children: Vec::new(),
        }
    }
}

/// Prefix tree of pronunciations, stored as an arena.
///
/// Every root-to-node path spells a phoneme prefix shared by the words below
/// it. A word whose pronunciation ends at a phoneme node hangs off that node
/// as a word child, so "a" and "ab" can share the `a` node.
#[derive(Debug, Clone)]
pub struct PronunciationTrie {
    nodes: Vec<TrieNode>,
    words_number: usize,
}

const ROOT: NodeId = 0;

impl Default for PronunciationTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PronunciationTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new(NodeKind::Init)],
            words_number: 0,
        }
    }

    /// Builds the trie from a `word = ph1 ph2 ...` dictionary. Any malformed
    /// line or unknown name fails the whole build.
    pub fn from_dictionary(
        path: &Path,
        phonemes: &Vocabulary,
        words: &Vocabulary,
    ) -> Result<Self, DecoderError> {
        let entries = read_dictionary(path, phonemes, words)?;
        let mut trie = Self::new();
        for entry in &entries {
            trie.insert_word(entry.word, &entry.phonemes)?;
        }
        tracing::info!(
            path = %path.display(),
            pronunciations = entries.len(),
            nodes = trie.node_count(),
            "built pronunciation trie"
        );
        Ok(trie)
    }

    pub fn insert_word(&mut self, word: usize, phonemes: &[usize]) -> Result<(), DecoderError> {
        if phonemes.is_empty() {
            return Err(DecoderError::invalid_argument(format!(
                "word {word} has an empty pronunciation"
            )));
        }
        if phonemes.contains(&PHONEME_TERMINATOR) {
            return Err(DecoderError::invalid_argument(format!(
                "word {word} uses the reserved phoneme id {PHONEME_TERMINATOR}"
            )));
        }

        let mut current = ROOT;
        for &phoneme in phonemes {
            current = match self.find_phoneme_child(current, phoneme) {
                Some(child) => child,
                None => {
                    let child = self.push_node(NodeKind::Phoneme(phoneme));
                    self.nodes[current].phoneme_children.push(child);
                    child
                }
            };
        }

        let already_there = self.nodes[current]
            .word_children
            .iter()
            .any(|&child| self.nodes[child].kind == NodeKind::Word(word));
        if !already_there {
            let child = self.push_node(NodeKind::Word(word));
            self.nodes[current].word_children.push(child);
        }
        self.words_number = self.words_number.max(word + 1);
        Ok(())
    }

    pub fn word_exists(&self, word: usize) -> bool {
        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            if node.kind == NodeKind::Word(word) {
                return true;
            }
            stack.extend(node.word_children.iter().rev());
            stack.extend(node.phoneme_children.iter().rev());
        }
        false
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn find_phoneme_child(&self, node: NodeId, phoneme: usize) -> Option<NodeId> {
        self.nodes[node]
            .phoneme_children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].kind == NodeKind::Phoneme(phoneme))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(TrieNode::new(kind));
        self.nodes.len() - 1
    }
}

impl SearchLexicon for PronunciationTrie {
    fn root(&self) -> NodeId {
        ROOT
    }

    fn successors(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.phoneme_children.as_slice())
            .unwrap_or(&[])
    }

    fn completions(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.word_children.as_slice())
            .unwrap_or(&[])
    }

    fn phoneme(&self, node: NodeId) -> Option<usize> {
        match self.kind(node)? {
            NodeKind::Phoneme(phoneme) => Some(phoneme),
            _ => None,
        }
    }

    fn word(&self, node: NodeId) -> Option<usize> {
        match self.kind(node)? {
            NodeKind::Word(word) => Some(word),
            _ => None,
        }
    }

    fn words_number(&self) -> usize {
        self.words_number
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn inserted_word_is_found() {
        let mut trie = PronunciationTrie::new();
        trie.insert_word(3, &[1, 2, 3]).unwrap();
        assert!(trie.word_exists(3));
        assert!(!trie.word_exists(4));
        assert_eq!(trie.words_number(), 4);
    }

    #[test]
    fn prefix_word_then_longer_word() {
        let mut trie = PronunciationTrie::new();
        trie.insert_word(0, &[1]).unwrap();
        trie.insert_word(1, &[1, 2]).unwrap();
        assert!(trie.word_exists(0));
        assert!(trie.word_exists(1));

        // root -> a, a -> b, plus two word nodes.
        assert_eq!(trie.node_count(), 5);
        let a = trie.successors(trie.root())[0];
        assert_eq!(trie.phoneme(a), Some(1));
        assert_eq!(trie.completions(a).len(), 1);
        assert_eq!(trie.word(trie.completions(a)[0]), Some(0));
        let b = trie.successors(a)[0];
        assert_eq!(trie.word(trie.completions(b)[0]), Some(1));
    }

    #[test]
    fn shared_prefixes_reuse_nodes() {
        let mut trie = PronunciationTrie::new();
        trie.insert_word(0, &[1, 2]).unwrap();
        trie.insert_word(1, &[1, 3]).unwrap();
        trie.insert_word(1, &[1, 3]).unwrap();
        assert_eq!(trie.successors(trie.root()).len(), 1);
        let a = trie.successors(trie.root())[0];
        assert_eq!(trie.successors(a).len(), 2);
        let c = trie.successors(a)[1];
        assert_eq!(trie.completions(c).len(), 1);
    }

    #[test]
    fn invalid_insert_leaves_trie_untouched() {
        let mut trie = PronunciationTrie::new();
        assert!(trie.insert_word(0, &[]).is_err());
        assert!(trie.insert_word(0, &[1, PHONEME_TERMINATOR]).is_err());
        assert_eq!(trie.node_count(), 1);
        assert!(trie.is_empty());
        assert!(!trie.word_exists(0));
    }

    #[test]
    fn from_dictionary_builds_whole_vocabulary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a = ax").unwrap();
        writeln!(file, "ab = ax b").unwrap();
        writeln!(file, "b = b").unwrap();
        file.flush().unwrap();

        let phonemes = Vocabulary::from_names(["ax", "b"], Vocabulary::PHONEME_BASE);
        let words = Vocabulary::load_words(file.path()).unwrap();
        let trie = PronunciationTrie::from_dictionary(file.path(), &phonemes, &words).unwrap();
        for word in ["a", "ab", "b"] {
            assert!(trie.word_exists(words.index_of(word).unwrap()));
        }
    }

    #[test]
    fn from_dictionary_fails_on_any_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a = ax").unwrap();
        writeln!(file, "b b").unwrap();
        file.flush().unwrap();

        let phonemes = Vocabulary::from_names(["ax", "b"], Vocabulary::PHONEME_BASE);
        let words = Vocabulary::from_names(["a", "b"], Vocabulary::WORD_BASE);
        assert!(PronunciationTrie::from_dictionary(file.path(), &phonemes, &words).is_err());
    }
}
