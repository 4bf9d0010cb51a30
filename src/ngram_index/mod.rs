//! Inverted index from n-grams to the tokens and offsets they occur at.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    num::NonZeroUsize,
};

use diagonal::longest_diagonal_run;
use histogram_cache::HistogramCache;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    similarity::{hamming_distance, ngram_window_count, ngram_windows, NgramHistogram},
    token::{check_token_length, validate_token},
};

mod diagonal;
pub mod histogram_cache;

pub const DEFAULT_NGRAM_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramIndexConfig {
    pub ngram_length: usize,
    /// Fixed up front, or by the first inserted token if `None`.
    pub token_length: Option<usize>,
    /// Maximum number of memoised histograms, unbounded if `None`.
    pub histogram_cache_capacity: Option<NonZeroUsize>,
    /// Compute the histogram of each new token while inserting it.
    pub build_histogram_cache: bool,
}

impl Default for NgramIndexConfig {
    fn default() -> Self {
        Self {
            ngram_length: DEFAULT_NGRAM_LENGTH,
            token_length: None,
            histogram_cache_capacity: None,
            build_histogram_cache: false,
        }
    }
}

/// How many query windows a candidate token has to share with the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// At most this many query windows may be missing.
    MaxMismatches(usize),
    /// At least this fraction of the query windows must be shared, rounded up.
    MinSimilarity(f64),
}

impl Threshold {
    fn required_windows(self, num_windows: usize) -> Result<usize> {
        match self {
            Self::MaxMismatches(max_mismatches) => Ok(num_windows.saturating_sub(max_mismatches)),
            Self::MinSimilarity(fraction) => {
                if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
                    Err(Error::InvalidSimilarityFraction(fraction))
                } else {
                    Ok((fraction * num_windows as f64).ceil() as usize)
                }
            }
        }
    }
}

/// A token of the index together with everything recorded about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedToken<Payload> {
    pub token: String,
    /// How often the token was inserted.
    pub count: usize,
    pub payloads: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagonalMatch {
    pub token: String,
    /// Offset of the query inside the token.
    pub start: usize,
    pub distance: usize,
}

type TokenId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Occurrence {
    token: TokenId,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NgramIndex<Payload> {
    config: NgramIndexConfig,
    token_length: Option<usize>,
    token_ids: HashMap<String, TokenId>,
    /// Indexed by [`TokenId`], `None` after deletion.
    tokens: Vec<Option<IndexedToken<Payload>>>,
    /// Slots of deleted tokens, reused by the next insertions.
    free_ids: Vec<TokenId>,
    buckets: HashMap<Vec<u8>, Vec<Occurrence>>,
    #[serde(skip)]
    histogram_cache: Option<HistogramCache>,
}

impl<Payload> NgramIndex<Payload> {
    pub fn new(config: NgramIndexConfig) -> Result<Self> {
        if config.ngram_length == 0 {
            return Err(Error::InvalidNgramLength(config.ngram_length));
        }
        if let Some(token_length) = config.token_length {
            if config.ngram_length > token_length {
                return Err(Error::NgramLongerThanToken {
                    ngram_length: config.ngram_length,
                    token_length,
                });
            }
        }

        debug!("Creating n-gram index with config {config:?}");
        Ok(Self {
            token_length: config.token_length,
            config,
            token_ids: Default::default(),
            tokens: Default::default(),
            free_ids: Default::default(),
            buckets: Default::default(),
            histogram_cache: None,
        })
    }

    pub fn config(&self) -> &NgramIndexConfig {
        &self.config
    }

    pub fn ngram_length(&self) -> usize {
        self.config.ngram_length
    }

    pub fn token_length(&self) -> Option<usize> {
        self.token_length
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Number of distinct n-grams over all tokens.
    pub fn ngram_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_ids.contains_key(token)
    }

    /// How often `token` was inserted, zero if it is unknown.
    pub fn num_reads(&self, token: &str) -> usize {
        self.entry(token).map_or(0, |entry| entry.count)
    }

    pub fn payloads(&self, token: &str) -> &[Payload] {
        self.entry(token)
            .map(|entry| entry.payloads.as_slice())
            .unwrap_or_default()
    }

    /// All tokens with their insertion counts, most frequent first.
    ///
    /// Tokens with equal counts are ordered by slot. A token inserted after a deletion may
    /// take the slot of the deleted token.
    pub fn tokens_by_count(&self) -> Vec<(&str, usize)> {
        let mut tokens: Vec<_> = self
            .tokens
            .iter()
            .flatten()
            .map(|entry| (entry.token.as_str(), entry.count))
            .collect();
        tokens.sort_by_key(|&(_, count)| std::cmp::Reverse(count));
        tokens
    }

    /// Inserts one occurrence of `token`.
    ///
    /// Only the first occurrence of a token registers its n-grams.
    pub fn insert(&mut self, token: &str, payload: Option<Payload>) -> Result<()> {
        validate_token(token)?;
        if self.token_length.is_none() && token.len() < self.config.ngram_length {
            return Err(Error::NgramLongerThanToken {
                ngram_length: self.config.ngram_length,
                token_length: token.len(),
            });
        }
        check_token_length(&mut self.token_length, token)?;

        if let Some(&id) = self.token_ids.get(token) {
            if let Some(entry) = self.tokens[id].as_mut() {
                entry.count += 1;
                entry.payloads.extend(payload);
            }
            return Ok(());
        }

        let id = self.free_ids.pop().unwrap_or(self.tokens.len());
        for (offset, ngram) in ngram_windows(token.as_bytes(), self.config.ngram_length) {
            self.buckets
                .entry(ngram.to_vec())
                .or_default()
                .push(Occurrence { token: id, offset });
        }
        let entry = Some(IndexedToken {
            token: token.to_string(),
            count: 1,
            payloads: payload.into_iter().collect(),
        });
        if id < self.tokens.len() {
            self.tokens[id] = entry;
        } else {
            self.tokens.push(entry);
        }
        self.token_ids.insert(token.to_string(), id);

        if self.config.build_histogram_cache {
            let ngram_length = self.config.ngram_length;
            self.histogram_cache().histogram(token, ngram_length);
        }

        Ok(())
    }

    /// Removes `token` with all its n-gram occurrences.
    ///
    /// Returns `None` if the token is not indexed.
    pub fn delete(&mut self, token: &str) -> Option<IndexedToken<Payload>> {
        let id = self.token_ids.remove(token)?;
        for (_, ngram) in ngram_windows(token.as_bytes(), self.config.ngram_length) {
            if let Some(occurrences) = self.buckets.get_mut(ngram) {
                occurrences.retain(|occurrence| occurrence.token != id);
                if occurrences.is_empty() {
                    self.buckets.remove(ngram);
                }
            }
        }
        if let Some(cache) = self.histogram_cache.as_mut() {
            cache.remove(token);
        }

        debug!("Deleted token {token} from the n-gram index");
        self.free_ids.push(id);
        self.tokens.get_mut(id).and_then(Option::take)
    }

    /// Tokens that contain `query` exactly, with the smallest offset they contain it at.
    pub fn exact_match_query(&self, query: &str) -> Result<Vec<(String, usize)>> {
        let num_windows = self.check_query(query)?;

        let mut diagonal_windows: BTreeMap<TokenId, HashMap<isize, BTreeSet<usize>>> =
            BTreeMap::new();
        for (window, occurrence) in self.hits(query) {
            diagonal_windows
                .entry(occurrence.token)
                .or_default()
                .entry(occurrence.offset as isize - window as isize)
                .or_default()
                .insert(window);
        }

        Ok(diagonal_windows
            .into_iter()
            .filter_map(|(id, diagonals)| {
                let start = diagonals
                    .into_iter()
                    .filter(|(_, windows)| windows.len() == num_windows)
                    .map(|(diagonal, _)| diagonal)
                    .min()?;
                Some((self.token_of(id)?.to_string(), usize::try_from(start).ok()?))
            })
            .collect())
    }

    /// Tokens that share enough query windows, with the number of shared windows.
    ///
    /// A window is shared if its n-gram occurs anywhere in the token. This overestimates the
    /// similarity of repetitive sequences, see [`Self::histogram_refined_query`].
    pub fn approximate_query(
        &self,
        query: &str,
        threshold: Threshold,
    ) -> Result<Vec<(String, usize)>> {
        let num_windows = self.check_query(query)?;
        let required_windows = threshold.required_windows(num_windows)?;

        Ok(self
            .shared_windows(query)
            .into_iter()
            .filter(|&(_, shared)| shared >= required_windows)
            .filter_map(|(id, shared)| Some((self.token_of(id)?.to_string(), shared)))
            .collect())
    }

    /// Candidates of [`Self::approximate_query`] rescored by histogram intersection, best first.
    pub fn histogram_refined_query(
        &mut self,
        query: &str,
        threshold: Threshold,
    ) -> Result<Vec<(String, usize)>> {
        let num_windows = self.check_query(query)?;
        let required_windows = threshold.required_windows(num_windows)?;
        let candidates = self.approximate_query(query, threshold)?;
        trace!(
            "Refining {} candidates for query {query}",
            candidates.len()
        );

        let ngram_length = self.config.ngram_length;
        let query_histogram = NgramHistogram::from_sequence(query.as_bytes(), ngram_length);
        let cache = self.histogram_cache();
        let mut matches: Vec<_> = candidates
            .into_iter()
            .map(|(token, _)| {
                let score = cache
                    .histogram(&token, ngram_length)
                    .intersection(&query_histogram);
                (token, score)
            })
            .filter(|&(_, score)| score >= required_windows)
            .collect();
        matches.sort_by_key(|&(_, score)| std::cmp::Reverse(score));
        Ok(matches)
    }

    /// Locates `query` inside tokens at an unknown offset.
    ///
    /// Query windows vote for the diagonal `token offset - query offset`. Each token reports the
    /// start of its longest run of consecutive windows on one diagonal, with the Hamming
    /// distance of the query to the token at that start. Tokens missing more than
    /// `max_mismatch` query windows, or whose best start would not fit the query, are skipped.
    pub fn diagonal_voting_query(
        &self,
        query: &str,
        max_mismatch: usize,
    ) -> Result<Vec<DiagonalMatch>> {
        let num_windows = self.check_query(query)?;

        let mut votes: BTreeMap<TokenId, Vec<(usize, isize)>> = BTreeMap::new();
        for (window, occurrence) in self.hits(query) {
            votes
                .entry(occurrence.token)
                .or_default()
                .push((window, occurrence.offset as isize - window as isize));
        }

        let mut matches = Vec::new();
        for (id, mut hits) in votes {
            let Some(token) = self.token_of(id) else {
                continue;
            };

            let hit_windows = hits.iter().map(|&(window, _)| window).collect::<BTreeSet<_>>();
            if num_windows - hit_windows.len() > max_mismatch {
                continue;
            }

            let Some(run) = longest_diagonal_run(&mut hits) else {
                continue;
            };
            let Ok(start) = usize::try_from(run.diagonal) else {
                continue;
            };
            let Some(target) = token.as_bytes().get(start..start + query.len()) else {
                continue;
            };

            matches.push(DiagonalMatch {
                token: token.to_string(),
                start,
                distance: hamming_distance(query.as_bytes(), target),
            });
        }

        Ok(matches)
    }

    /// The memoised histogram of any token, for callers that score candidates themselves.
    pub fn histogram(&mut self, token: &str) -> &NgramHistogram {
        let ngram_length = self.config.ngram_length;
        self.histogram_cache().histogram(token, ngram_length)
    }

    fn histogram_cache(&mut self) -> &mut HistogramCache {
        let capacity = self.config.histogram_cache_capacity;
        self.histogram_cache
            .get_or_insert_with(|| HistogramCache::new(capacity))
    }

    fn entry(&self, token: &str) -> Option<&IndexedToken<Payload>> {
        self.token_ids
            .get(token)
            .and_then(|&id| self.tokens.get(id)?.as_ref())
    }

    fn token_of(&self, id: TokenId) -> Option<&str> {
        self.tokens
            .get(id)?
            .as_ref()
            .map(|entry| entry.token.as_str())
    }

    /// Validates a query and returns its number of windows.
    fn check_query(&self, query: &str) -> Result<usize> {
        if query.len() < self.config.ngram_length {
            return Err(Error::InvalidQueryLength {
                query_length: query.len(),
                ngram_length: self.config.ngram_length,
            });
        }
        validate_token(query)?;
        Ok(ngram_window_count(query.len(), self.config.ngram_length))
    }

    /// Every occurrence of every query window, paired with the window offset.
    ///
    /// N-grams without a bucket have no occurrences.
    fn hits<'index>(
        &'index self,
        query: &'index str,
    ) -> impl Iterator<Item = (usize, Occurrence)> + 'index {
        ngram_windows(query.as_bytes(), self.config.ngram_length).flat_map(
            move |(window, ngram)| {
                self.buckets
                    .get(ngram)
                    .into_iter()
                    .flatten()
                    .map(move |&occurrence| (window, occurrence))
            },
        )
    }

    /// Number of distinct query windows that occur in each token.
    fn shared_windows(&self, query: &str) -> BTreeMap<TokenId, usize> {
        let mut shared = BTreeMap::new();
        let mut last_window = HashMap::new();
        for (window, occurrence) in self.hits(query) {
            if last_window.insert(occurrence.token, window) != Some(window) {
                *shared.entry(occurrence.token).or_insert(0) += 1;
            }
        }
        shared
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use crate::error::Error;

    use super::{DiagonalMatch, NgramIndex, NgramIndexConfig, Threshold};

    fn index_with(ngram_length: usize, tokens: &[&str]) -> NgramIndex<u32> {
        let mut index = NgramIndex::new(NgramIndexConfig {
            ngram_length,
            ..Default::default()
        })
        .unwrap();
        for token in tokens {
            index.insert(token, None).unwrap();
        }
        index
    }

    #[test]
    fn rejects_bad_configs() {
        assert!(matches!(
            NgramIndex::<()>::new(NgramIndexConfig {
                ngram_length: 0,
                ..Default::default()
            }),
            Err(Error::InvalidNgramLength(0))
        ));
        assert!(matches!(
            NgramIndex::<()>::new(NgramIndexConfig {
                ngram_length: 6,
                token_length: Some(4),
                ..Default::default()
            }),
            Err(Error::NgramLongerThanToken {
                ngram_length: 6,
                token_length: 4
            })
        ));

        let mut index = NgramIndex::<()>::new(NgramIndexConfig::default()).unwrap();
        assert!(matches!(
            index.insert("ACGT", None),
            Err(Error::NgramLongerThanToken { .. })
        ));
        assert_eq!(index.token_length(), None);
    }

    #[test]
    fn insert_counts_and_payloads() {
        let mut index = index_with(3, &[]);
        index.insert("ACGTACGT", Some(1)).unwrap();
        index.insert("ACGTACGT", None).unwrap();
        index.insert("ACGTACGT", Some(2)).unwrap();
        index.insert("TTTTGGGG", None).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.num_reads("ACGTACGT"), 3);
        assert_eq!(index.num_reads("CCCCCCCC"), 0);
        assert_eq!(index.payloads("ACGTACGT"), [1, 2]);
        assert!(index.payloads("TTTTGGGG").is_empty());
        assert_eq!(
            index.tokens_by_count(),
            [("ACGTACGT", 3), ("TTTTGGGG", 1)]
        );
        // ACG CGT GTA TAC from the first token, TTT TTG TGG GGG from the second.
        assert_eq!(index.ngram_count(), 8);

        assert!(matches!(
            index.insert("ACGT", None),
            Err(Error::LengthMismatch {
                expected: 8,
                actual: 4
            })
        ));
        assert!(matches!(
            index.insert("ACGTACGU", None),
            Err(Error::InvalidCharacter { character: 'U', .. })
        ));
    }

    #[test]
    fn short_queries_are_an_error() {
        let mut index = index_with(6, &["ACGTACGTAC"]);
        assert!(matches!(
            index.exact_match_query("ACGTA"),
            Err(Error::InvalidQueryLength {
                query_length: 5,
                ngram_length: 6
            })
        ));
        assert!(matches!(
            index.approximate_query("ACG", Threshold::MaxMismatches(1)),
            Err(Error::InvalidQueryLength { .. })
        ));
        assert!(matches!(
            index.histogram_refined_query("", Threshold::MaxMismatches(1)),
            Err(Error::InvalidQueryLength { .. })
        ));
        assert!(matches!(
            index.diagonal_voting_query("ACGTA", 2),
            Err(Error::InvalidQueryLength { .. })
        ));
    }

    #[test]
    fn unknown_ngrams_find_nothing() {
        let index = index_with(3, &["ACGTACGT"]);
        assert!(index.exact_match_query("GGGG").unwrap().is_empty());
        assert!(index
            .approximate_query("GGGGGGGG", Threshold::MaxMismatches(2))
            .unwrap()
            .is_empty());
        assert!(index.diagonal_voting_query("GGGG", 2).unwrap().is_empty());
    }

    #[test]
    fn exact_match_reports_the_smallest_offset() {
        let index = index_with(3, &["ACGACGACGTTT", "TTTTTTTTTTTT"]);
        assert_eq!(
            index.exact_match_query("CGACGT").unwrap(),
            [("ACGACGACGTTT".to_string(), 4)]
        );
        assert_eq!(
            index.exact_match_query("ACG").unwrap(),
            [("ACGACGACGTTT".to_string(), 0)]
        );
        assert_eq!(
            index.exact_match_query("TTT").unwrap(),
            [
                ("ACGACGACGTTT".to_string(), 9),
                ("TTTTTTTTTTTT".to_string(), 0)
            ]
        );
        assert_eq!(
            index.exact_match_query("TTTT").unwrap(),
            [("TTTTTTTTTTTT".to_string(), 0)]
        );
        // All windows occur, but not on a common diagonal.
        assert!(index.exact_match_query("ACGTTTACG").unwrap().is_empty());
    }

    #[test]
    fn repetitive_tokens_are_refined_away() {
        let mut index = index_with(3, &["AAAAAAAA", "AAAAAAAT", "AAATTTTT", "CCCCGGGG"]);

        // Every window of the query is AAA, which all of the first three tokens contain.
        assert_eq!(
            index
                .approximate_query("AAAAAAAA", Threshold::MaxMismatches(2))
                .unwrap(),
            [
                ("AAAAAAAA".to_string(), 6),
                ("AAAAAAAT".to_string(), 6),
                ("AAATTTTT".to_string(), 6)
            ]
        );
        assert_eq!(
            index
                .histogram_refined_query("AAAAAAAA", Threshold::MaxMismatches(2))
                .unwrap(),
            [("AAAAAAAA".to_string(), 6), ("AAAAAAAT".to_string(), 5)]
        );
    }

    #[test]
    fn similarity_fraction_threshold() {
        let mut index = index_with(3, &["ACGTTGCA", "ACGTTGGG", "TTTTTTTT"]);

        // ACGTTGCA shares all 6 windows, ACGTTGGG shares ACG CGT GTT TTG.
        assert_eq!(
            index
                .approximate_query("ACGTTGCA", Threshold::MinSimilarity(1.0))
                .unwrap(),
            [("ACGTTGCA".to_string(), 6)]
        );
        assert_eq!(
            index
                .approximate_query("ACGTTGCA", Threshold::MinSimilarity(0.6))
                .unwrap(),
            [("ACGTTGCA".to_string(), 6), ("ACGTTGGG".to_string(), 4)]
        );
        assert_eq!(
            index
                .histogram_refined_query("ACGTTGCA", Threshold::MinSimilarity(0.6))
                .unwrap(),
            [("ACGTTGCA".to_string(), 6), ("ACGTTGGG".to_string(), 4)]
        );

        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                index.approximate_query("ACGTTGCA", Threshold::MinSimilarity(fraction)),
                Err(Error::InvalidSimilarityFraction(_))
            ));
        }
    }

    #[test]
    fn identical_token_scores_its_window_count() {
        let mut index = index_with(4, &["ACGTTGCAAC"]);
        assert_eq!(index.histogram("ACGTTGCAAC").total(), 7);
        assert_eq!(
            index
                .histogram_refined_query("ACGTTGCAAC", Threshold::MaxMismatches(0))
                .unwrap(),
            [("ACGTTGCAAC".to_string(), 7)]
        );
    }

    const REFERENCE: &str = "TTGACCGTAGCATCGGATCAAGTC";

    #[test]
    fn diagonal_voting_recovers_embedded_fragments() {
        let index = index_with(4, &[REFERENCE, "CCCCCCCCCCCCCCCCCCCCCCCC"]);
        let fragment = &REFERENCE[6..18];
        assert_eq!(fragment, "GTAGCATCGGAT");

        // No, one and two substitutions at the ends of the fragment.
        for (query, distance) in [
            ("GTAGCATCGGAT", 0),
            ("CTAGCATCGGAT", 1),
            ("CTAGCATCGGAA", 2),
        ] {
            assert_eq!(
                index.diagonal_voting_query(query, 2).unwrap(),
                [DiagonalMatch {
                    token: REFERENCE.to_string(),
                    start: 6,
                    distance
                }]
            );
        }
    }

    #[test]
    fn diagonal_voting_respects_the_mismatch_budget() {
        let index = index_with(4, &[REFERENCE]);
        // A substitution in the middle breaks four windows.
        assert!(index.diagonal_voting_query("GTAGCTTCGGAT", 2).unwrap().is_empty());
        assert_eq!(
            index.diagonal_voting_query("GTAGCTTCGGAT", 4).unwrap(),
            [DiagonalMatch {
                token: REFERENCE.to_string(),
                start: 6,
                distance: 1
            }]
        );
    }

    #[test]
    fn diagonal_voting_skips_overhanging_placements() {
        let index = index_with(4, &[REFERENCE]);
        // The last eight reference characters followed by four that are not part of it, so the
        // best diagonal starts at 16, beyond the last fitting offset 12.
        let query = format!("{}GGGG", &REFERENCE[16..]);
        assert!(index.diagonal_voting_query(&query, 9).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_every_trace() {
        let mut index = index_with(3, &["ACGTACGT", "ACGTTTTT"]);
        index.insert("ACGTACGT", Some(7)).unwrap();
        let ngram_count = index.ngram_count();

        let deleted = index.delete("ACGTACGT").unwrap();
        assert_eq!(deleted.token, "ACGTACGT");
        assert_eq!(deleted.count, 2);
        assert_eq!(deleted.payloads, [7]);
        assert!(index.delete("ACGTACGT").is_none());

        assert!(!index.contains("ACGTACGT"));
        assert_eq!(index.num_reads("ACGTACGT"), 0);
        assert_eq!(index.len(), 1);
        // GTA and TAC were only used by the deleted token.
        assert_eq!(index.ngram_count(), ngram_count - 2);
        assert_eq!(
            index.exact_match_query("ACGT").unwrap(),
            [("ACGTTTTT".to_string(), 0)]
        );
        assert_eq!(
            index
                .approximate_query("ACGTACGT", Threshold::MaxMismatches(6))
                .unwrap(),
            [("ACGTTTTT".to_string(), 4)]
        );

        index.insert("ACGTACGT", None).unwrap();
        assert_eq!(index.num_reads("ACGTACGT"), 1);
        assert_eq!(
            index.exact_match_query("GTAC").unwrap(),
            [("ACGTACGT".to_string(), 2)]
        );
    }

    #[test]
    fn deleted_slots_are_reused() {
        let mut index = index_with(3, &["ACGTACGT", "ACGTTTTT", "CCCCGGGG"]);
        assert_eq!(index.tokens.len(), 3);

        for round in 0..10 {
            let token = if round % 2 == 0 { "ACGTTTTT" } else { "TTTTAAAA" };
            let other = if round % 2 == 0 { "TTTTAAAA" } else { "ACGTTTTT" };
            index.delete(token).unwrap();
            index.insert(other, Some(round)).unwrap();
            assert_eq!(index.tokens.len(), 3);
            assert_eq!(index.len(), 3);
        }

        // The last round deleted TTTTAAAA and inserted ACGTTTTT into its slot.
        assert!(!index.contains("TTTTAAAA"));
        assert_eq!(index.payloads("ACGTTTTT"), [9]);
        assert_eq!(
            index.exact_match_query("GTTT").unwrap(),
            [("ACGTTTTT".to_string(), 2)]
        );
        assert!(index.exact_match_query("TTAA").unwrap().is_empty());
        assert_eq!(
            index.tokens_by_count(),
            [("ACGTACGT", 1), ("ACGTTTTT", 1), ("CCCCGGGG", 1)]
        );
    }

    #[test]
    fn histograms_are_built_on_insert_when_configured() {
        let mut index = NgramIndex::<()>::new(NgramIndexConfig {
            ngram_length: 3,
            histogram_cache_capacity: NonZeroUsize::new(1),
            build_histogram_cache: true,
            ..Default::default()
        })
        .unwrap();
        index.insert("ACGTACGT", None).unwrap();
        index.insert("TTTTTTTT", None).unwrap();

        let cache = index.histogram_cache.as_ref().unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("TTTTTTTT"));
    }

    #[test]
    fn serialised_index_answers_the_same_queries() {
        let mut index = index_with(4, &[REFERENCE, "ACGTACGTACGTACGTACGTACGT"]);
        index.insert(REFERENCE, Some(3)).unwrap();

        let mut buffer = Vec::new();
        ciborium::into_writer(&index, &mut buffer).unwrap();
        let mut loaded: NgramIndex<u32> = ciborium::from_reader(buffer.as_slice()).unwrap();

        assert_eq!(loaded.num_reads(REFERENCE), 2);
        assert_eq!(loaded.payloads(REFERENCE), [3]);
        assert_eq!(
            loaded.diagonal_voting_query("GTAGCATCGGAT", 0).unwrap(),
            index.diagonal_voting_query("GTAGCATCGGAT", 0).unwrap()
        );
        assert_eq!(
            loaded
                .histogram_refined_query(REFERENCE, Threshold::MaxMismatches(3))
                .unwrap(),
            [(REFERENCE.to_string(), 21)]
        );
    }
}
