use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::DecoderError;
use crate::search::evaluation::{evaluate, ErrorCounts};
use crate::types::MlfPart;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub schema_version: u32,
    pub meta: Meta,
    pub utterances: Vec<UtteranceReport>,
    pub totals: TotalsReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub recognized_path: String,
    pub reference_path: String,
    pub utterance_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceReport {
    pub name: String,
    pub recognized_words: usize,
    #[serde(flatten)]
    pub counts: ErrorCounts,
    pub word_error_rate: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsReport {
    #[serde(flatten)]
    pub counts: ErrorCounts,
    pub word_error_rate: f64,
    pub unmatched_recognized: Vec<String>,
}

/// Utterance identity shared by the recognized and reference MLFs:
/// directory and extension are dropped, so `*/utt1.rec` pairs with
/// `data/utt1.lab`.
pub fn utterance_key(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    }
}

pub fn compute_utterance_report(
    name: &str,
    reference: &[usize],
    recognized: Option<&[usize]>,
) -> UtteranceReport {
    let mut notes = Vec::new();
    let hypothesis: &[usize] = match recognized {
        Some(words) => words,
        None => {
            notes.push("recognition_missing".to_string());
            &[]
        }
    };
    if reference.is_empty() {
        notes.push("empty_reference".to_string());
    }
    let counts = evaluate(reference, hypothesis);
    UtteranceReport {
        name: name.to_string(),
        recognized_words: hypothesis.len(),
        counts,
        word_error_rate: counts.word_error_rate(),
        notes,
    }
}

/// Scores every reference part against the recognized part with the same
/// utterance key. Recognized parts without a reference are listed in the
/// totals and not scored.
pub fn evaluate_parts(
    recognized: &[MlfPart],
    reference: &[MlfPart],
) -> Result<(Vec<UtteranceReport>, TotalsReport), DecoderError> {
    let mut recognized_by_key: HashMap<&str, &MlfPart> = HashMap::new();
    for part in recognized {
        if recognized_by_key
            .insert(utterance_key(&part.name), part)
            .is_some()
        {
            return Err(DecoderError::malformed(
                "recognized MLF",
                format!("utterance '{}' appears more than once", part.name),
            ));
        }
    }

    let mut utterances = Vec::with_capacity(reference.len());
    let mut seen = HashSet::new();
    for part in reference {
        let key = utterance_key(&part.name);
        if !seen.insert(key) {
            return Err(DecoderError::malformed(
                "reference MLF",
                format!("utterance '{}' appears more than once", part.name),
            ));
        }
        let recognized_words = recognized_by_key.get(key).map(|p| p.labels());
        utterances.push(compute_utterance_report(
            key,
            &part.labels(),
            recognized_words.as_deref(),
        ));
    }

    let unmatched_recognized = recognized
        .iter()
        .map(|part| utterance_key(&part.name))
        .filter(|key| !seen.contains(key))
        .map(str::to_string)
        .collect();
    let totals = aggregate_reports(&utterances, unmatched_recognized);
    Ok((utterances, totals))
}

pub fn aggregate_reports(
    utterances: &[UtteranceReport],
    unmatched_recognized: Vec<String>,
) -> TotalsReport {
    let mut counts = ErrorCounts::default();
    for utterance in utterances {
        counts += utterance.counts;
    }
    TotalsReport {
        counts,
        word_error_rate: counts.word_error_rate(),
        unmatched_recognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranscriptionNode;

    fn part(name: &str, words: &[usize]) -> MlfPart {
        MlfPart::new(
            name,
            words.iter().map(|&w| TranscriptionNode::word(w)).collect(),
        )
    }

    #[test]
    fn utterance_key_strips_directory_and_extension() {
        assert_eq!(utterance_key("*/utt1.rec"), "utt1");
        assert_eq!(utterance_key("data/set/utt1.lab"), "utt1");
        assert_eq!(utterance_key("utt1"), "utt1");
        assert_eq!(utterance_key(".hidden"), ".hidden");
    }

    #[test]
    fn pairs_parts_by_utterance_key() {
        let recognized = vec![part("*/b.rec", &[4]), part("*/a.rec", &[1, 3])];
        let reference = vec![part("*/a.lab", &[1, 2, 3]), part("*/b.lab", &[4])];
        let (utterances, totals) = evaluate_parts(&recognized, &reference).unwrap();

        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].name, "a");
        assert_eq!(utterances[0].counts.deletions, 1);
        assert_eq!(format!("{:.2}", utterances[0].word_error_rate), "33.33");
        assert_eq!(utterances[1].counts.errors(), 0);
        assert_eq!(totals.counts.reference_len, 4);
        assert_eq!(totals.word_error_rate, 25.0);
        assert!(totals.unmatched_recognized.is_empty());
    }

    #[test]
    fn missing_and_extra_recognitions() {
        let recognized = vec![part("x.rec", &[1]), part("extra.rec", &[2])];
        let reference = vec![part("x.lab", &[1]), part("y.lab", &[5, 6])];
        let (utterances, totals) = evaluate_parts(&recognized, &reference).unwrap();

        assert_eq!(utterances[1].counts.deletions, 2);
        assert_eq!(utterances[1].notes, vec!["recognition_missing".to_string()]);
        assert_eq!(totals.unmatched_recognized, vec!["extra".to_string()]);
        assert!((totals.word_error_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_utterances_are_rejected() {
        let parts = vec![part("a.rec", &[1]), part("dir/a.rec", &[1])];
        assert!(evaluate_parts(&parts, &[]).is_err());
        assert!(evaluate_parts(&[], &parts).is_err());
    }

    #[test]
    fn report_serializes_flattened_counts() {
        let utterance = compute_utterance_report("u", &[1, 2], Some(&[1]));
        let json = serde_json::to_value(&utterance).unwrap();
        assert_eq!(json["deletions"], 1);
        assert_eq!(json["reference_len"], 2);
        assert_eq!(json["word_error_rate"], 50.0);
        assert!(json.get("notes").is_none());
    }
}
