use std::collections::HashMap;

/// Number of differing characters between two sequences.
///
/// Sequences of unequal length additionally count every character of the longer one that has
/// no counterpart.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).filter(|(a, b)| a != b).count() + a.len().abs_diff(b.len())
}

/// All n-grams of a sequence together with the offset they start at.
pub fn ngram_windows(sequence: &[u8], ngram_length: usize) -> impl Iterator<Item = (usize, &[u8])> {
    // `windows` panics on a zero length, which yields no n-grams here.
    sequence
        .windows(ngram_length.max(1))
        .take(if ngram_length == 0 { 0 } else { usize::MAX })
        .enumerate()
}

/// Number of n-gram windows of a sequence, zero if the sequence is shorter than one n-gram.
pub fn ngram_window_count(sequence_length: usize, ngram_length: usize) -> usize {
    if ngram_length == 0 {
        0
    } else {
        (sequence_length + 1).saturating_sub(ngram_length)
    }
}

/// Multiset of the n-grams of a single sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramHistogram {
    counts: HashMap<Vec<u8>, usize>,
}

impl NgramHistogram {
    pub fn from_sequence(sequence: &[u8], ngram_length: usize) -> Self {
        let mut counts = HashMap::new();
        for (_, ngram) in ngram_windows(sequence, ngram_length) {
            *counts.entry(ngram.to_vec()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn count(&self, ngram: &[u8]) -> usize {
        self.counts.get(ngram).copied().unwrap_or(0)
    }

    /// Total number of n-grams, i.e. the number of windows of the source sequence.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Sum of the minimum counts over the n-grams both histograms contain.
    pub fn intersection(&self, other: &Self) -> usize {
        let (smaller, larger) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };

        smaller
            .counts
            .iter()
            .map(|(ngram, &count)| count.min(larger.count(ngram)))
            .sum()
    }
}

pub fn histogram_intersection(a: &NgramHistogram, b: &NgramHistogram) -> usize {
    a.intersection(b)
}
