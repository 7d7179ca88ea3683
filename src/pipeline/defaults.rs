use crate::error::DecoderError;
use crate::language_model::LanguageModel;
use crate::pipeline::traits::{SearchLexicon, WordSearch};
use crate::search::confusion::ConfusionPenaltyMatrix;
use crate::search::decoder::decode;
use crate::types::{SearchParams, TranscriptionNode};

pub struct BeamWordSearch;

impl WordSearch for BeamWordSearch {
    fn decode(
        &self,
        frames: &[TranscriptionNode],
        lexicon: &dyn SearchLexicon,
        confusion: &ConfusionPenaltyMatrix,
        model: &LanguageModel,
        params: SearchParams,
    ) -> Result<Vec<TranscriptionNode>, DecoderError> {
        decode(frames, lexicon, confusion, model, params)
    }
}
