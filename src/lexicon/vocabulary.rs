use std::path::Path;

use crate::error::DecoderError;

/// Phoneme id reserved as the end-of-pronunciation marker.
pub const PHONEME_TERMINATOR: usize = 0;

/// Sorted, deduplicated list of names looked up with binary search.
///
/// Indices start at `base`: phoneme vocabularies use base 1 so that id 0
/// stays free for [`PHONEME_TERMINATOR`], word vocabularies use base 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
    base: usize,
}

impl Vocabulary {
    pub const PHONEME_BASE: usize = PHONEME_TERMINATOR + 1;
    pub const WORD_BASE: usize = 0;

    pub fn from_names<I, S>(names: I, base: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names, base }
    }

    /// One bare phoneme name per line.
    pub fn load_phonemes(path: &Path) -> Result<Self, DecoderError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DecoderError::io("read phoneme vocabulary", e))?;
        let mut names = Vec::new();
        for (line_idx, line) in data.lines().enumerate() {
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            if name.split_whitespace().count() != 1 {
                return Err(DecoderError::malformed(
                    "phoneme vocabulary",
                    format!("line {}: '{name}' is not a single phoneme", line_idx + 1),
                ));
            }
            names.push(name.to_string());
        }
        if names.is_empty() {
            return Err(DecoderError::malformed("phoneme vocabulary", "no phonemes found"));
        }
        Ok(Self::from_names(names, Self::PHONEME_BASE))
    }

    /// Word names taken from a `word = ph1 ph2 ...` dictionary file.
    pub fn load_words(dictionary_path: &Path) -> Result<Self, DecoderError> {
        let data = std::fs::read_to_string(dictionary_path)
            .map_err(|e| DecoderError::io("read word dictionary", e))?;
        let mut names = Vec::new();
        for (line_idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (word, _) = split_dictionary_line(line).map_err(|message| {
                DecoderError::malformed(
                    "word dictionary",
                    format!("line {}: {message}", line_idx + 1),
                )
            })?;
            names.push(word.to_string());
        }
        if names.is_empty() {
            return Err(DecoderError::malformed("word dictionary", "no words found"));
        }
        Ok(Self::from_names(names, Self::WORD_BASE))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .binary_search_by(|known| known.as_str().cmp(name))
            .ok()
            .map(|pos| pos + self.base)
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(self.base)
            .and_then(|pos| self.names.get(pos))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

/// Splits `word = ph1 ph2 ...` into the word and its pronunciation.
pub fn split_dictionary_line(line: &str) -> Result<(&str, Vec<&str>), String> {
    let (word, pronunciation) = line
        .split_once('=')
        .ok_or_else(|| format!("missing '=' in '{}'", line.trim()))?;
    let word = word.trim();
    if word.is_empty() || word.split_whitespace().count() != 1 {
        return Err(format!("invalid word name '{word}'"));
    }
    let phonemes: Vec<&str> = pronunciation.split_whitespace().collect();
    if phonemes.is_empty() {
        return Err(format!("word '{word}' has an empty pronunciation"));
    }
    Ok((word, phonemes))
}

/// A dictionary line with every name resolved to its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedPronunciation {
    pub word: usize,
    pub phonemes: Vec<usize>,
}

/// Parses a whole dictionary file, failing on the first malformed line or
/// unresolvable name.
pub(crate) fn read_dictionary(
    path: &Path,
    phonemes: &Vocabulary,
    words: &Vocabulary,
) -> Result<Vec<ResolvedPronunciation>, DecoderError> {
    if phonemes.is_empty() || words.is_empty() {
        return Err(DecoderError::invalid_argument(
            "phoneme and word vocabularies must not be empty",
        ));
    }
    if phonemes.base() == PHONEME_TERMINATOR {
        return Err(DecoderError::invalid_argument(
            "phoneme vocabulary must not assign the terminator id",
        ));
    }
    let data =
        std::fs::read_to_string(path).map_err(|e| DecoderError::io("read word dictionary", e))?;

    let mut entries = Vec::new();
    for (line_idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_idx + 1;
        let (word, names) = split_dictionary_line(line).map_err(|message| {
            DecoderError::malformed("word dictionary", format!("line {line_no}: {message}"))
        })?;
        let word = words.index_of(word).ok_or_else(|| {
            DecoderError::malformed(
                "word dictionary",
                format!("line {line_no}: unknown word '{word}'"),
            )
        })?;
        let phoneme_ids = names
            .iter()
            .map(|name| {
                phonemes.index_of(name).ok_or_else(|| {
                    DecoderError::malformed(
                        "word dictionary",
                        format!("line {line_no}: unknown phoneme '{name}'"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.push(ResolvedPronunciation {
            word,
            phonemes: phoneme_ids,
        });
    }

    if entries.is_empty() {
        return Err(DecoderError::malformed("word dictionary", "no entries found"));
    }
    Ok(entries)
}
