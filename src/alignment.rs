use bio::alignment::distance::levenshtein;
use serde::{Deserialize, Serialize};

use crate::similarity::hamming_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMeasure {
    #[default]
    Hamming,
    Levenshtein,
}

impl DistanceMeasure {
    pub fn distance(self, a: &[u8], b: &[u8]) -> usize {
        match self {
            DistanceMeasure::Hamming => hamming_distance(a, b),
            DistanceMeasure::Levenshtein => levenshtein(a, b) as usize,
        }
    }
}

/// Exhaustively searches the best placement of `query` inside `reference` around an expected
/// position.
///
/// Tries the offsets `expected_position - max_position_miss .. expected_position +
/// max_position_miss`, or only `expected_position` if `max_position_miss` is zero. Offsets at
/// which the query would not fit entirely into the reference are skipped. Returns the best
/// offset and its distance, stopping early at the first perfect match. If no offset beats
/// the query length, the offset is `None` and the distance is the query length.
pub fn seq_target_query(
    query: &[u8],
    reference: &[u8],
    expected_position: usize,
    max_position_miss: usize,
    distance_fn: impl Fn(&[u8], &[u8]) -> usize,
) -> (Option<usize>, usize) {
    let mut best_offset = None;
    let mut best_distance = query.len();

    let Some(last_fitting_offset) = reference.len().checked_sub(query.len()) else {
        return (best_offset, best_distance);
    };
    let offsets = if max_position_miss > 0 {
        expected_position.saturating_sub(max_position_miss)
            ..(expected_position + max_position_miss).min(last_fitting_offset + 1)
    } else {
        expected_position..(expected_position + 1).min(last_fitting_offset + 1)
    };

    for offset in offsets {
        let distance = distance_fn(query, &reference[offset..offset + query.len()]);
        if distance < best_distance {
            best_offset = Some(offset);
            best_distance = distance;
            if distance == 0 {
                break;
            }
        }
    }

    (best_offset, best_distance)
}
