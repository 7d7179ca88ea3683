/// One acoustic or lexical event of an utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionNode {
    /// Phoneme id or word id, depending on the level of the transcription.
    pub label: usize,
    /// Start of the event in 100 ns ticks. `None` when the time is unknown,
    /// which is always the case for word-level MLF input.
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// Acoustic probability in (0, 1].
    pub probability: f32,
}

impl TranscriptionNode {
    pub const DEFAULT_PROBABILITY: f32 = 1.0;

    pub fn word(label: usize) -> Self {
        Self {
            label,
            start_time: None,
            end_time: None,
            probability: Self::DEFAULT_PROBABILITY,
        }
    }

    pub fn timed(label: usize, start_time: u64, end_time: u64, probability: f32) -> Self {
        Self {
            label,
            start_time: Some(start_time),
            end_time: Some(end_time),
            probability,
        }
    }

    pub fn has_timing(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

/// A named utterance, i.e. one block of an MLF file.
#[derive(Debug, Clone, PartialEq)]
pub struct MlfPart {
    pub name: String,
    pub transcription: Vec<TranscriptionNode>,
}

impl MlfPart {
    pub fn new(name: impl Into<String>, transcription: Vec<TranscriptionNode>) -> Self {
        Self {
            name: name.into(),
            transcription,
        }
    }

    pub fn transcription_size(&self) -> usize {
        self.transcription.len()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.transcription.iter().map(|node| node.label).collect()
    }
}

/// Decoding knobs shared by every search strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Beam width in score units; `f64::INFINITY` disables pruning.
    pub pruning_coeff: f64,
    /// Weight of the language model cost against the acoustic cost.
    pub lambda: f64,
}

impl SearchParams {
    pub const DEFAULT_PRUNING_COEFF: f64 = 10.0;
    pub const DEFAULT_LAMBDA: f64 = 1.0;

    pub fn without_pruning(lambda: f64) -> Self {
        Self {
            pruning_coeff: f64::INFINITY,
            lambda,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            pruning_coeff: Self::DEFAULT_PRUNING_COEFF,
            lambda: Self::DEFAULT_LAMBDA,
        }
    }
}
