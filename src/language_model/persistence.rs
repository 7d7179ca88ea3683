use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{is_probability, is_strictly_sorted, LanguageModel, WordBigram};
use crate::error::DecoderError;

const INT_SIZE: usize = 4;
const FLOAT_SIZE: usize = 4;
const BIGRAM_RECORD_SIZE: usize = 2 * INT_SIZE + FLOAT_SIZE;

impl LanguageModel {
    /// Writes the little-endian binary layout:
    /// `i32 n, f32[n], i32 m, m x {i32 first, i32 second, f32 p}`.
    pub fn save(&self, path: &Path) -> Result<(), DecoderError> {
        let bytes = self.to_bytes()?;
        let file = File::create(path).map_err(|e| DecoderError::io("create language model", e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| DecoderError::io("write language model", e))?;
        tracing::info!(
            path = %path.display(),
            unigrams = self.unigrams_number(),
            bigrams = self.bigrams_number(),
            "saved language model"
        );
        Ok(())
    }

    pub fn load(path: &Path, expected_words: usize) -> Result<Self, DecoderError> {
        let bytes = std::fs::read(path).map_err(|e| DecoderError::io("read language model", e))?;
        let model = Self::from_bytes(&bytes, expected_words)?;
        tracing::info!(
            path = %path.display(),
            unigrams = model.unigrams_number(),
            bigrams = model.bigrams_number(),
            "loaded language model"
        );
        Ok(model)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DecoderError> {
        let mut out = Vec::with_capacity(
            2 * INT_SIZE
                + self.unigrams.len() * FLOAT_SIZE
                + self.bigrams.len() * BIGRAM_RECORD_SIZE,
        );
        out.extend_from_slice(&to_i32(self.unigrams.len(), "unigrams_number")?.to_le_bytes());
        for p in &self.unigrams {
            out.extend_from_slice(&p.to_le_bytes());
        }
        out.extend_from_slice(&to_i32(self.bigrams.len(), "bigrams_number")?.to_le_bytes());
        for bigram in &self.bigrams {
            out.extend_from_slice(&to_i32(bigram.first_word, "first_word")?.to_le_bytes());
            out.extend_from_slice(&to_i32(bigram.second_word, "second_word")?.to_le_bytes());
            out.extend_from_slice(&bigram.probability.to_le_bytes());
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8], expected_words: usize) -> Result<Self, DecoderError> {
        let mut reader = ByteReader::new(bytes);

        let unigrams_number = reader.read_count("unigrams_number")?;
        if unigrams_number != expected_words {
            return Err(DecoderError::malformed(
                "language model",
                format!(
                    "model has {unigrams_number} unigrams, vocabulary has {expected_words} words"
                ),
            ));
        }
        reader.require(unigrams_number * FLOAT_SIZE + INT_SIZE, "unigram table")?;
        let unigrams = (0..unigrams_number)
            .map(|_| reader.read_f32())
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(bad) = unigrams.iter().find(|p| !is_probability(**p)) {
            return Err(DecoderError::malformed(
                "language model",
                format!("unigram probability {bad} is outside [0, 1]"),
            ));
        }

        let bigrams_number = reader.read_count("bigrams_number")?;
        let expected_rest = bigrams_number
            .checked_mul(BIGRAM_RECORD_SIZE)
            .ok_or_else(|| DecoderError::malformed("language model", "bigram count overflows"))?;
        if reader.remaining() != expected_rest {
            return Err(DecoderError::malformed(
                "language model",
                format!(
                    "declared {bigrams_number} bigrams need {expected_rest} bytes, file has {}",
                    reader.remaining()
                ),
            ));
        }

        let mut bigrams = Vec::with_capacity(bigrams_number);
        for _ in 0..bigrams_number {
            let first_word = reader.read_index("first_word", unigrams_number)?;
            let second_word = reader.read_index("second_word", unigrams_number)?;
            let probability = reader.read_f32()?;
            if !is_probability(probability) {
                return Err(DecoderError::malformed(
                    "language model",
                    format!(
                        "bigram ({first_word}, {second_word}) probability {probability} \
                         is outside [0, 1]"
                    ),
                ));
            }
            bigrams.push(WordBigram {
                first_word,
                second_word,
                probability,
            });
        }
        if !is_strictly_sorted(&bigrams) {
            return Err(DecoderError::malformed(
                "language model",
                "bigram records are not sorted by (second, first) or contain duplicates",
            ));
        }

        Ok(Self::from_sorted_parts(unigrams, bigrams))
    }
}

fn to_i32(value: usize, field: &str) -> Result<i32, DecoderError> {
    i32::try_from(value).map_err(|_| {
        DecoderError::invalid_argument(format!("{field} = {value} does not fit the model format"))
    })
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn require(&self, needed: usize, what: &str) -> Result<(), DecoderError> {
        if self.remaining() < needed {
            return Err(DecoderError::malformed(
                "language model",
                format!("truncated {what}: need {needed} bytes, have {}", self.remaining()),
            ));
        }
        Ok(())
    }

    fn take4(&mut self) -> Result<[u8; 4], DecoderError> {
        self.require(4, "field")?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[self.offset..self.offset + 4]);
        self.offset += 4;
        Ok(word)
    }

    fn read_i32(&mut self) -> Result<i32, DecoderError> {
        self.take4().map(i32::from_le_bytes)
    }

    fn read_f32(&mut self) -> Result<f32, DecoderError> {
        self.take4().map(f32::from_le_bytes)
    }

    fn read_count(&mut self, field: &str) -> Result<usize, DecoderError> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| {
            DecoderError::malformed("language model", format!("negative {field}: {value}"))
        })
    }

    fn read_index(&mut self, field: &str, bound: usize) -> Result<usize, DecoderError> {
        let value = self.read_count(field)?;
        if value >= bound {
            return Err(DecoderError::malformed(
                "language model",
                format!("{field} {value} is outside the vocabulary of {bound} words"),
            ));
        }
        Ok(value)
    }
}
