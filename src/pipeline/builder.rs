use std::path::Path;

use crate::config::{LexiconKind, RecognizerConfig};
use crate::error::DecoderError;
use crate::language_model::LanguageModel;
use crate::lexicon::linear::LinearLexicon;
use crate::lexicon::trie::PronunciationTrie;
use crate::lexicon::vocabulary::Vocabulary;
use crate::pipeline::defaults::BeamWordSearch;
use crate::pipeline::runtime::{Recognizer, RecognizerParts};
use crate::pipeline::traits::{SearchLexicon, WordSearch};
use crate::search::confusion::ConfusionPenaltyMatrix;

pub struct RecognizerBuilder {
    config: RecognizerConfig,
    lexicon: Option<Box<dyn SearchLexicon>>,
    confusion: Option<ConfusionPenaltyMatrix>,
    language_model: Option<LanguageModel>,
    search: Option<Box<dyn WordSearch>>,
}

impl RecognizerBuilder {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            lexicon: None,
            confusion: None,
            language_model: None,
            search: None,
        }
    }

    pub fn with_lexicon_kind(mut self, lexicon_kind: LexiconKind) -> Self {
        self.config.lexicon = lexicon_kind;
        self
    }

    pub fn with_lexicon(mut self, lexicon: Box<dyn SearchLexicon>) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn with_confusion(mut self, confusion: ConfusionPenaltyMatrix) -> Self {
        self.confusion = Some(confusion);
        self
    }

    pub fn with_language_model(mut self, language_model: LanguageModel) -> Self {
        self.language_model = Some(language_model);
        self
    }

    pub fn with_search(mut self, search: Box<dyn WordSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn build(self) -> Result<Recognizer, DecoderError> {
        let phonemes = Vocabulary::load_phonemes(Path::new(&self.config.phonemes_path))?;
        let dictionary_path = Path::new(&self.config.dictionary_path);
        let words = Vocabulary::load_words(dictionary_path)?;

        let lexicon = match self.lexicon {
            Some(lexicon) => lexicon,
            None => build_lexicon(self.config.lexicon, dictionary_path, &phonemes, &words)?,
        };
        let confusion = match self.confusion {
            Some(confusion) => confusion,
            None => ConfusionPenaltyMatrix::load(
                Path::new(&self.config.confusion_path),
                phonemes.len(),
            )?,
        };
        if confusion.phonemes_number() != phonemes.len() {
            return Err(DecoderError::inconsistent(format!(
                "confusion matrix covers {} phonemes, vocabulary has {}",
                confusion.phonemes_number(),
                phonemes.len()
            )));
        }
        let language_model = match self.language_model {
            Some(model) => model,
            None => LanguageModel::load(Path::new(&self.config.language_model_path), words.len())?,
        };

        Ok(Recognizer::from_parts(RecognizerParts {
            phonemes,
            words,
            lexicon,
            confusion,
            language_model,
            params: self.config.search,
            search: self.search.unwrap_or_else(|| Box::new(BeamWordSearch)),
        }))
    }
}

fn build_lexicon(
    kind: LexiconKind,
    dictionary_path: &Path,
    phonemes: &Vocabulary,
    words: &Vocabulary,
) -> Result<Box<dyn SearchLexicon>, DecoderError> {
    Ok(match kind {
        LexiconKind::Trie => Box::new(PronunciationTrie::from_dictionary(
            dictionary_path,
            phonemes,
            words,
        )?),
        LexiconKind::Linear => Box::new(LinearLexicon::from_dictionary(
            dictionary_path,
            phonemes,
            words,
        )?),
    })
}
