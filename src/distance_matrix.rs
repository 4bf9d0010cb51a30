//! Pairwise distances between the most frequent tokens.

use std::io::Write;

use log::info;

use crate::{
    alignment::DistanceMeasure, error::Result, error_tolerant_trie::ErrorTolerantTrie,
    token::UNKNOWN_CHARACTER,
};

/// A symmetric matrix of distances between labelled tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    /// Row-major, `labels.len()` squared entries.
    distances: Vec<usize>,
}

impl DistanceMatrix {
    pub fn from_tokens(
        tokens: impl IntoIterator<Item = impl Into<String>>,
        measure: DistanceMeasure,
    ) -> Self {
        let labels: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let size = labels.len();
        let mut distances = vec![0; size * size];

        for (row, a) in labels.iter().enumerate() {
            for (column, b) in labels.iter().enumerate().skip(row + 1) {
                let distance = measure.distance(a.as_bytes(), b.as_bytes());
                distances[row * size + column] = distance;
                distances[column * size + row] = distance;
            }
        }

        Self { labels, distances }
    }

    /// Distances between the tokens of the trie inserted at least `min_count` times, most
    /// frequent first.
    ///
    /// Tokens containing an unknown character are left out.
    pub fn from_trie<Payload>(
        trie: &ErrorTolerantTrie<Payload>,
        min_count: usize,
        measure: DistanceMeasure,
    ) -> Self {
        let tokens: Vec<_> = trie
            .tokens_by_count()
            .into_iter()
            .take_while(|&(_, count)| count >= min_count)
            .map(|(token, _)| token)
            .filter(|token| !token.as_bytes().contains(&UNKNOWN_CHARACTER))
            .collect();
        info!(
            "Computing {measure:?} distances between {} tokens",
            tokens.len()
        );
        Self::from_tokens(tokens, measure)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn distance(&self, row: usize, column: usize) -> Option<usize> {
        if row < self.len() && column < self.len() {
            Some(self.distances[row * self.len() + column])
        } else {
            None
        }
    }

    fn row(&self, row: usize) -> &[usize] {
        &self.distances[row * self.len()..(row + 1) * self.len()]
    }

    /// Writes a header of labels, then one row per label starting with the label itself.
    pub fn write_csv(&self, writer: impl Write, corner: &str) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(std::iter::once(corner).chain(self.labels.iter().map(String::as_str)))?;
        for (row, label) in self.labels.iter().enumerate() {
            writer.write_record(
                std::iter::once(label.clone())
                    .chain(self.row(row).iter().map(usize::to_string)),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}
