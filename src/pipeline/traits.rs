use crate::error::DecoderError;
use crate::language_model::LanguageModel;
use crate::search::confusion::ConfusionPenaltyMatrix;
use crate::types::{SearchParams, TranscriptionNode};

/// Index of a node inside a lexicon's search graph.
pub type NodeId = usize;

/// Read-only graph view of a pronunciation lexicon.
///
/// Phoneme nodes carry a phoneme id and lead to further phoneme nodes;
/// completion nodes carry the word whose pronunciation ends at their parent.
pub trait SearchLexicon: Send + Sync {
    fn root(&self) -> NodeId;

    /// Phoneme nodes reachable in one step, in insertion order.
    fn successors(&self, node: NodeId) -> &[NodeId];

    /// Word nodes attached to `node`, in insertion order.
    fn completions(&self, node: NodeId) -> &[NodeId];

    fn phoneme(&self, node: NodeId) -> Option<usize>;

    fn word(&self, node: NodeId) -> Option<usize>;

    /// One past the largest word id present.
    fn words_number(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.successors(self.root()).is_empty()
    }
}

/// Turns one utterance of phoneme frames into a word sequence.
pub trait WordSearch: Send + Sync {
    fn decode(
        &self,
        frames: &[TranscriptionNode],
        lexicon: &dyn SearchLexicon,
        confusion: &ConfusionPenaltyMatrix,
        model: &LanguageModel,
        params: SearchParams,
    ) -> Result<Vec<TranscriptionNode>, DecoderError>;
}
