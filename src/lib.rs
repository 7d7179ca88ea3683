pub mod config;
pub mod error;
pub mod language_model;
pub mod lexicon;
pub mod mlf;
pub mod pipeline;
pub mod report;
pub mod search;
pub mod types;

pub use config::{LexiconKind, RecognizerConfig, SearchSettings, TrainingConfig};
pub use error::DecoderError;
pub use language_model::{LanguageModel, WordBigram};
pub use lexicon::linear::{LinearLexicon, LinearLexiconEntry};
pub use lexicon::trie::PronunciationTrie;
pub use lexicon::vocabulary::Vocabulary;
pub use pipeline::builder::RecognizerBuilder;
pub use pipeline::runtime::Recognizer;
pub use pipeline::traits::{SearchLexicon, WordSearch};
pub use report::{EvaluationReport, Meta, TotalsReport, UtteranceReport};
pub use search::backtrack::BacktrackStack;
pub use search::confusion::ConfusionPenaltyMatrix;
pub use search::evaluation::{evaluate, ErrorCounts};
pub use types::{MlfPart, SearchParams, TranscriptionNode};
