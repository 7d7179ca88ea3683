//! Master Label File reading and writing.
//!
//! ```text
//! #!MLF!#
//! "*/utt1.lab"
//! 0 100000 ax 0.9
//! 100000 200000 b
//! .
//! ```
//!
//! Timed lines (`start end label [probability]`) describe phoneme frames;
//! bare `label` lines describe words.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::DecoderError;
use crate::lexicon::vocabulary::Vocabulary;
use crate::types::{MlfPart, TranscriptionNode};

pub const MLF_HEADER: &str = "#!MLF!#";
const PART_TERMINATOR: &str = ".";

pub fn load_mlf(path: &Path, vocabulary: &Vocabulary) -> Result<Vec<MlfPart>, DecoderError> {
    let data = std::fs::read_to_string(path).map_err(|e| DecoderError::io("read MLF", e))?;
    let parts = parse_mlf(&data, vocabulary)?;
    tracing::info!(path = %path.display(), parts = parts.len(), "loaded MLF");
    Ok(parts)
}

pub fn parse_mlf(text: &str, vocabulary: &Vocabulary) -> Result<Vec<MlfPart>, DecoderError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, MLF_HEADER)) => {}
        Some((line_no, other)) => {
            return Err(malformed(
                line_no,
                format!("expected header '{MLF_HEADER}', found '{other}'"),
            ))
        }
        None => return Err(DecoderError::malformed("MLF", "file is empty")),
    }

    let mut parts = Vec::new();
    let mut current: Option<PartBuilder> = None;
    for (line_no, line) in lines {
        match current.as_mut() {
            None => {
                let name = parse_part_name(line).ok_or_else(|| {
                    malformed(line_no, format!("expected a quoted file name, found '{line}'"))
                })?;
                current = Some(PartBuilder::new(name));
            }
            Some(_) if line == PART_TERMINATOR => {
                if let Some(builder) = current.take() {
                    parts.push(builder.finish());
                }
            }
            Some(builder) => {
                let node = parse_event(line, vocabulary)
                    .map_err(|message| malformed(line_no, message))?;
                builder.push(node).map_err(|message| malformed(line_no, message))?;
            }
        }
    }

    if let Some(builder) = current {
        return Err(DecoderError::malformed(
            "MLF",
            format!("part '{}' is missing its '{PART_TERMINATOR}' terminator", builder.name),
        ));
    }
    Ok(parts)
}

pub fn save_mlf(
    path: &Path,
    parts: &[MlfPart],
    vocabulary: &Vocabulary,
) -> Result<(), DecoderError> {
    // Render fully before touching the file so a bad label never leaves a
    // half-written MLF behind.
    let mut rendered = Vec::new();
    write_mlf(&mut rendered, parts, vocabulary)?;
    let file = File::create(path).map_err(|e| DecoderError::io("create MLF", e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&rendered)
        .and_then(|_| writer.flush())
        .map_err(|e| DecoderError::io("write MLF", e))?;
    tracing::info!(path = %path.display(), parts = parts.len(), "wrote MLF");
    Ok(())
}

pub fn write_mlf<W: Write>(
    mut out: W,
    parts: &[MlfPart],
    vocabulary: &Vocabulary,
) -> Result<(), DecoderError> {
    let io = |e| DecoderError::io("write MLF", e);
    writeln!(out, "{MLF_HEADER}").map_err(io)?;
    for part in parts {
        writeln!(out, "\"{}\"", part.name).map_err(io)?;
        for node in &part.transcription {
            let label = vocabulary.name_of(node.label).ok_or_else(|| {
                DecoderError::invalid_argument(format!(
                    "label {} of part '{}' is not in the vocabulary",
                    node.label, part.name
                ))
            })?;
            match (node.start_time, node.end_time) {
                (Some(start), Some(end)) => {
                    if node.probability == TranscriptionNode::DEFAULT_PROBABILITY {
                        writeln!(out, "{start} {end} {label}").map_err(io)?;
                    } else {
                        writeln!(out, "{start} {end} {label} {}", node.probability).map_err(io)?;
                    }
                }
                _ => writeln!(out, "{label}").map_err(io)?,
            }
        }
        writeln!(out, "{PART_TERMINATOR}").map_err(io)?;
    }
    Ok(())
}

fn malformed(line_no: usize, message: impl Into<String>) -> DecoderError {
    DecoderError::malformed("MLF", format!("line {line_no}: {}", message.into()))
}

fn parse_part_name(line: &str) -> Option<String> {
    let inner = line.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

fn parse_event(line: &str, vocabulary: &Vocabulary) -> Result<TranscriptionNode, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let resolve = |name: &str| {
        vocabulary
            .index_of(name)
            .ok_or_else(|| format!("unknown label '{name}'"))
    };

    match fields.as_slice() {
        [label] => Ok(TranscriptionNode::word(resolve(*label)?)),
        [start, end, label] | [start, end, label, _] => {
            let start = parse_time(start)?;
            let end = parse_time(end)?;
            if end < start {
                return Err(format!("end time {end} precedes start time {start}"));
            }
            let probability = match fields.get(3) {
                Some(raw) => parse_probability(raw)?,
                None => TranscriptionNode::DEFAULT_PROBABILITY,
            };
            Ok(TranscriptionNode::timed(resolve(*label)?, start, end, probability))
        }
        _ => Err(format!("cannot parse event line '{line}'")),
    }
}

fn parse_time(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("'{raw}' is not a non-negative time"))
}

fn parse_probability(raw: &str) -> Result<f32, String> {
    let p: f32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a probability"))?;
    if !(p > 0.0 && p <= 1.0) {
        return Err(format!("probability {p} is outside (0, 1]"));
    }
    Ok(p)
}

struct PartBuilder {
    name: String,
    transcription: Vec<TranscriptionNode>,
}

impl PartBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            transcription: Vec::new(),
        }
    }

    fn push(&mut self, node: TranscriptionNode) -> Result<(), String> {
        if let Some(prev) = self.transcription.last() {
            if prev.has_timing() != node.has_timing() {
                return Err("timed and untimed lines are mixed in one part".to_string());
            }
            if let (Some(prev_start), Some(start)) = (prev.start_time, node.start_time) {
                if start < prev_start {
                    return Err(format!("start time {start} goes back before {prev_start}"));
                }
            }
        }
        self.transcription.push(node);
        Ok(())
    }

    fn finish(self) -> MlfPart {
        MlfPart::new(self.name, self.transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phonemes() -> Vocabulary {
        Vocabulary::from_names(["ax", "b", "k"], Vocabulary::PHONEME_BASE)
    }

    fn words() -> Vocabulary {
        Vocabulary::from_names(["a", "cab"], Vocabulary::WORD_BASE)
    }

    #[test]
    fn parses_phoneme_level_parts() {
        let text = "#!MLF!#\n\"*/one.lab\"\n0 100 k 0.5\n100 200 ax\n200 300 b 1\n.\n\
                    \"*/two.lab\"\n0 10 ax\n.\n";
        let parts = parse_mlf(text, &phonemes()).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "*/one.lab");
        assert_eq!(parts[0].transcription_size(), 3);
        assert_eq!(parts[0].transcription[0], TranscriptionNode::timed(3, 0, 100, 0.5));
        assert_eq!(parts[0].transcription[1].probability, 1.0);
        assert_eq!(parts[1].labels(), vec![1]);
    }

    #[test]
    fn parses_word_level_parts() {
        let text = "#!MLF!#\n\"u.rec\"\ncab\na\n.\n";
        let parts = parse_mlf(text, &words()).unwrap();
        assert_eq!(parts[0].labels(), vec![1, 0]);
        assert!(parts[0].transcription.iter().all(|n| !n.has_timing()));
    }

    #[test]
    fn rejects_malformed_files() {
        let cases = [
            "",
            "MLF\n\"a\"\nax\n.\n",
            "#!MLF!#\nax\n.\n",
            "#!MLF!#\n\"a\"\n0 10 zz\n.\n",
            "#!MLF!#\n\"a\"\n10 0 ax\n.\n",
            "#!MLF!#\n\"a\"\n-5 10 ax\n.\n",
            "#!MLF!#\n\"a\"\n0 10 ax 1.5\n.\n",
            "#!MLF!#\n\"a\"\n0 10 ax 0\n.\n",
            "#!MLF!#\n\"a\"\n100 200 ax\n0 10 b\n.\n",
            "#!MLF!#\n\"a\"\n0 10 ax\nb\n.\n",
            "#!MLF!#\n\"a\"\n0 10 ax\n",
        ];
        for text in cases {
            assert!(parse_mlf(text, &phonemes()).is_err(), "accepted: {text:?}");
        }
    }

    #[test]
    fn written_parts_parse_back() {
        let parts = vec![
            MlfPart::new(
                "x.lab",
                vec![
                    TranscriptionNode::timed(2, 0, 50, 0.25),
                    TranscriptionNode::timed(1, 50, 90, 1.0),
                ],
            ),
            MlfPart::new("y.lab", Vec::new()),
        ];
        let mut out = Vec::new();
        write_mlf(&mut out, &parts, &phonemes()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("#!MLF!#\n\"x.lab\"\n0 50 b 0.25\n50 90 ax\n.\n"));
        assert_eq!(parse_mlf(&text, &phonemes()).unwrap(), parts);
    }

    #[test]
    fn word_parts_are_written_without_timing() {
        let parts = vec![MlfPart::new(
            "u.rec",
            vec![TranscriptionNode::word(1), TranscriptionNode::word(0)],
        )];
        let mut out = Vec::new();
        write_mlf(&mut out, &parts, &words()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#!MLF!#\n\"u.rec\"\ncab\na\n.\n");
    }

    #[test]
    fn unknown_labels_are_not_written() {
        let parts = vec![MlfPart::new("u", vec![TranscriptionNode::word(9)])];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mlf");
        assert!(save_mlf(&path, &parts, &words()).is_err());
        assert!(!path.exists());
    }
}
