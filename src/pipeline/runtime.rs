use rayon::prelude::*;

use crate::error::DecoderError;
use crate::language_model::LanguageModel;
use crate::lexicon::vocabulary::Vocabulary;
use crate::pipeline::traits::{SearchLexicon, WordSearch};
use crate::search::confusion::ConfusionPenaltyMatrix;
use crate::types::{MlfPart, SearchParams};

/// Everything needed to turn phoneme-level MLF parts into word-level ones.
pub struct Recognizer {
    phonemes: Vocabulary,
    words: Vocabulary,
    lexicon: Box<dyn SearchLexicon>,
    confusion: ConfusionPenaltyMatrix,
    language_model: LanguageModel,
    params: SearchParams,
    search: Box<dyn WordSearch>,
}

pub(crate) struct RecognizerParts {
    pub phonemes: Vocabulary,
    pub words: Vocabulary,
    pub lexicon: Box<dyn SearchLexicon>,
    pub confusion: ConfusionPenaltyMatrix,
    pub language_model: LanguageModel,
    pub params: SearchParams,
    pub search: Box<dyn WordSearch>,
}

impl Recognizer {
    pub(crate) fn from_parts(parts: RecognizerParts) -> Self {
        Self {
            phonemes: parts.phonemes,
            words: parts.words,
            lexicon: parts.lexicon,
            confusion: parts.confusion,
            language_model: parts.language_model,
            params: parts.params,
            search: parts.search,
        }
    }

    pub fn phonemes(&self) -> &Vocabulary {
        &self.phonemes
    }

    pub fn words(&self) -> &Vocabulary {
        &self.words
    }

    pub fn params(&self) -> SearchParams {
        self.params
    }

    pub fn recognize(&self, part: &MlfPart) -> Result<MlfPart, DecoderError> {
        let words = self
            .search
            .decode(
                &part.transcription,
                self.lexicon.as_ref(),
                &self.confusion,
                &self.language_model,
                self.params,
            )
            .map_err(|e| match e {
                DecoderError::InconsistentState { message } => DecoderError::InconsistentState {
                    message: format!("{}: {message}", part.name),
                },
                other => other,
            })?;
        tracing::debug!(
            part = %part.name,
            frames = part.transcription_size(),
            words = words.len(),
            "recognized part"
        );
        Ok(MlfPart::new(part.name.clone(), words))
    }

    /// Recognizes every part; output order follows input order and the first
    /// failure aborts the batch.
    pub fn recognize_all(&self, parts: &[MlfPart]) -> Result<Vec<MlfPart>, DecoderError> {
        self.recognize_all_with(parts, |_| {})
    }

    /// Like [`Recognizer::recognize_all`], calling `on_part` after each
    /// recognized part. Parts are independent so they are decoded in parallel.
    pub fn recognize_all_with<F>(
        &self,
        parts: &[MlfPart],
        on_part: F,
    ) -> Result<Vec<MlfPart>, DecoderError>
    where
        F: Fn(&MlfPart) + Sync,
    {
        let recognized = parts
            .par_iter()
            .map(|part| {
                let result = self.recognize(part)?;
                on_part(&result);
                Ok(result)
            })
            .collect::<Result<Vec<_>, DecoderError>>()?;
        tracing::info!(parts = recognized.len(), "recognition finished");
        Ok(recognized)
    }
}
