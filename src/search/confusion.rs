use std::path::Path;

use crate::error::DecoderError;

/// Penalty of a confusion that never occurred in the counts.
pub const MAXIMUM_PENALTY: f32 = f32::MAX;

/// `-log10 P(observed | true)` for every pair of phonemes.
///
/// Rows are true phonemes, columns observed ones, both indexed from 0. Phoneme
/// ids are 1-based (0 is reserved), so id `p` lives at core index `p - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionPenaltyMatrix {
    phonemes_number: usize,
    penalties: Vec<f32>,
}

impl ConfusionPenaltyMatrix {
    pub fn from_counts(counts: &[Vec<u64>]) -> Result<Self, DecoderError> {
        let phonemes_number = counts.len();
        if phonemes_number == 0 {
            return Err(DecoderError::invalid_argument(
                "confusion matrix needs at least one phoneme",
            ));
        }

        let mut penalties = Vec::with_capacity(phonemes_number * phonemes_number);
        for (row_idx, row) in counts.iter().enumerate() {
            if row.len() != phonemes_number {
                return Err(DecoderError::malformed(
                    "confusion matrix",
                    format!(
                        "row {row_idx} has {} columns, expected {phonemes_number}",
                        row.len()
                    ),
                ));
            }
            let total = row
                .iter()
                .try_fold(0u64, |acc, &count| acc.checked_add(count))
                .ok_or_else(|| {
                    DecoderError::malformed(
                        "confusion matrix",
                        format!("row {row_idx} counts overflow a 64-bit total"),
                    )
                })?;
            if total == 0 {
                return Err(DecoderError::malformed(
                    "confusion matrix",
                    format!("row {row_idx} sums to zero"),
                ));
            }
            penalties.extend(row.iter().map(|&count| {
                if count == 0 {
                    MAXIMUM_PENALTY
                } else {
                    -((count as f64 / total as f64).log10()) as f32
                }
            }));
        }

        Ok(Self {
            phonemes_number,
            penalties,
        })
    }

    /// Reads an `(N+1) x (N+1)` count matrix whose first row and column are
    /// margins.
    pub fn load(path: &Path, phonemes_number: usize) -> Result<Self, DecoderError> {
        if phonemes_number == 0 {
            return Err(DecoderError::invalid_argument(
                "phonemes_number must be positive",
            ));
        }
        let data = std::fs::read_to_string(path)
            .map_err(|e| DecoderError::io("read confusion matrix", e))?;
        let counts = parse_counts(&data, phonemes_number)?;
        let matrix = Self::from_counts(&counts)?;
        tracing::info!(
            path = %path.display(),
            phonemes_number,
            "loaded confusion matrix"
        );
        Ok(matrix)
    }

    pub fn phonemes_number(&self) -> usize {
        self.phonemes_number
    }

    pub fn penalty(&self, true_idx: usize, observed_idx: usize) -> f32 {
        if true_idx >= self.phonemes_number || observed_idx >= self.phonemes_number {
            return MAXIMUM_PENALTY;
        }
        self.penalties[true_idx * self.phonemes_number + observed_idx]
    }

    /// Same as [`penalty`](Self::penalty) but addressed by 1-based phoneme ids.
    pub fn between(&self, true_phoneme: usize, observed_phoneme: usize) -> f32 {
        match (true_phoneme.checked_sub(1), observed_phoneme.checked_sub(1)) {
            (Some(t), Some(o)) => self.penalty(t, o),
            _ => MAXIMUM_PENALTY,
        }
    }

    pub fn covers_phoneme(&self, phoneme: usize) -> bool {
        phoneme >= 1 && phoneme <= self.phonemes_number
    }
}

fn parse_counts(data: &str, phonemes_number: usize) -> Result<Vec<Vec<u64>>, DecoderError> {
    let side = phonemes_number + 1;
    let rows: Vec<&str> = data.lines().filter(|l| !l.trim().is_empty()).collect();
    if rows.len() != side {
        return Err(DecoderError::malformed(
            "confusion matrix",
            format!("expected {side} rows, found {}", rows.len()),
        ));
    }

    let mut counts = Vec::with_capacity(phonemes_number);
    for (row_idx, line) in rows.iter().enumerate() {
        let cells = line
            .split_whitespace()
            .map(|cell| {
                cell.parse::<u64>().map_err(|_| {
                    DecoderError::malformed(
                        "confusion matrix",
                        format!("row {row_idx}: '{cell}' is not a non-negative integer"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if cells.len() != side {
            return Err(DecoderError::malformed(
                "confusion matrix",
                format!("row {row_idx} has {} columns, expected {side}", cells.len()),
            ));
        }
        // Margins: first row and first column.
        if row_idx > 0 {
            counts.push(cells[1..].to_vec());
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn reference_counts() -> Vec<Vec<u64>> {
        vec![vec![10, 3, 2], vec![1, 7, 3], vec![2, 0, 12]]
    }

    #[test]
    fn penalties_are_negative_log_conditional_probabilities() {
        let matrix = ConfusionPenaltyMatrix::from_counts(&reference_counts()).unwrap();
        let expected = -(10.0f64 / 15.0).log10() as f32;
        assert!((matrix.penalty(0, 0) - expected).abs() < 1e-6);
        let expected = -(3.0f64 / 11.0).log10() as f32;
        assert!((matrix.penalty(1, 2) - expected).abs() < 1e-6);
    }

    #[test]
    fn zero_count_gives_maximum_penalty() {
        let matrix = ConfusionPenaltyMatrix::from_counts(&reference_counts()).unwrap();
        assert_eq!(matrix.penalty(2, 1), MAXIMUM_PENALTY);
    }

    #[test]
    fn between_uses_one_based_ids() {
        let matrix = ConfusionPenaltyMatrix::from_counts(&reference_counts()).unwrap();
        assert_eq!(matrix.between(1, 1), matrix.penalty(0, 0));
        assert_eq!(matrix.between(3, 2), MAXIMUM_PENALTY);
        assert_eq!(matrix.between(0, 1), MAXIMUM_PENALTY);
        assert_eq!(matrix.between(1, 4), MAXIMUM_PENALTY);
    }

    #[test]
    fn zero_row_is_rejected() {
        let counts = vec![vec![1, 1], vec![0, 0]];
        let err = ConfusionPenaltyMatrix::from_counts(&counts).unwrap_err();
        assert!(matches!(err, DecoderError::MalformedInput { .. }));
    }

    #[test]
    fn overflowing_row_total_is_rejected() {
        let counts = vec![vec![u64::MAX, 1], vec![1, 1]];
        let err = ConfusionPenaltyMatrix::from_counts(&counts).unwrap_err();
        assert!(matches!(err, DecoderError::MalformedInput { .. }));

        let counts = vec![vec![u64::MAX, 0], vec![1, 1]];
        let matrix = ConfusionPenaltyMatrix::from_counts(&counts).unwrap();
        assert_eq!(matrix.penalty(0, 0), 0.0);
    }

    #[test]
    fn load_skips_margins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 1 2 3").unwrap();
        writeln!(file, "1 10 3 2").unwrap();
        writeln!(file, "2 1 7 3").unwrap();
        writeln!(file, "3 2 0 12").unwrap();
        file.flush().unwrap();

        let matrix = ConfusionPenaltyMatrix::load(file.path(), 3).unwrap();
        assert_eq!(
            matrix,
            ConfusionPenaltyMatrix::from_counts(&reference_counts()).unwrap()
        );
    }

    #[test]
    fn load_rejects_wrong_shape_and_bad_arguments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 1 2").unwrap();
        writeln!(file, "1 10 3").unwrap();
        writeln!(file, "2 1 7").unwrap();
        file.flush().unwrap();

        assert!(ConfusionPenaltyMatrix::load(file.path(), 3).is_err());
        assert!(matches!(
            ConfusionPenaltyMatrix::load(file.path(), 0),
            Err(DecoderError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ConfusionPenaltyMatrix::load(Path::new("/nonexistent/confusion.txt"), 3),
            Err(DecoderError::Io { .. })
        ));
    }

    #[test]
    fn load_rejects_negative_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 1 2").unwrap();
        writeln!(file, "1 -1 3").unwrap();
        writeln!(file, "2 1 7").unwrap();
        file.flush().unwrap();
        assert!(ConfusionPenaltyMatrix::load(file.path(), 2).is_err());
    }
}
