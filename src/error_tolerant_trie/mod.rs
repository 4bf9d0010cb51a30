//! Exact and substitution-tolerant retrieval of fixed-length tokens.
//!
//! The trie keeps a direct token → count map next to the node structure, so exact lookups
//! of absent tokens and count queries never walk the trie.

use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use node::TrieNode;

use crate::{
    error::Result,
    token::{check_token_length, validate_token},
};

mod node;

#[derive(Debug)]
pub struct ErrorTolerantTrie<Payload> {
    root: TrieNode<Payload>,
    token_length: Option<usize>,
    counts: HashMap<String, usize>,
}

/// A token found by a non-destructive query.
#[derive(Debug, PartialEq, Eq)]
pub struct TrieMatch<'trie, Payload> {
    /// How often the token was inserted.
    pub count: usize,
    pub payload: Option<&'trie Payload>,
    pub num_errors: usize,
}

/// A token that a destructive query removed from the trie, together with its payload.
#[derive(Debug, PartialEq, Eq)]
pub struct DetachedMatch<Payload> {
    pub count: usize,
    pub payload: Option<Payload>,
    pub num_errors: usize,
}

/// Number of neighbours found around a centre token at each distance of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighbourCounts {
    pub centre: String,
    /// `counts[d - 1]` is the number of tokens detached at exactly distance `d`.
    pub counts: Vec<usize>,
}

impl<Payload> Default for ErrorTolerantTrie<Payload> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Payload> ErrorTolerantTrie<Payload> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::root(),
            token_length: None,
            counts: Default::default(),
        }
    }

    /// A trie that only accepts tokens of the given length.
    pub fn with_token_length(token_length: usize) -> Self {
        Self {
            token_length: Some(token_length),
            ..Self::new()
        }
    }

    pub fn token_length(&self) -> Option<usize> {
        self.token_length
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of insertions over all tokens.
    pub fn total_count(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.counts.contains_key(token)
    }

    pub fn count(&self, token: &str) -> usize {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Inserts one occurrence of `token`.
    ///
    /// A given payload replaces the stored one, `None` keeps it.
    pub fn insert(&mut self, token: &str, payload: Option<Payload>) -> Result<()> {
        validate_token(token)?;
        check_token_length(&mut self.token_length, token)?;

        let node = token
            .bytes()
            .fold(&mut self.root, |node, character| {
                node.child_or_insert(character)
            });
        node.count += 1;
        if payload.is_some() {
            node.payload = payload;
        }

        *self.counts.entry(token.to_string()).or_insert(0) += 1;
        Ok(())
    }

    pub fn exact_query(&self, token: &str) -> Option<TrieMatch<'_, Payload>> {
        if !self.contains(token) {
            return None;
        }

        self.root
            .descendant(token.as_bytes())
            .filter(|node| node.is_terminal())
            .map(|node| TrieMatch {
                count: node.count,
                payload: node.payload.as_ref(),
                num_errors: 0,
            })
    }

    pub fn payload_mut(&mut self, token: &str) -> Option<&mut Payload> {
        if !self.contains(token) {
            return None;
        }

        self.root
            .descendant_mut(token.as_bytes())
            .and_then(|node| node.payload.as_mut())
    }

    /// All tokens within `max_errors` substitutions of `token`.
    ///
    /// Tokens of another length than `token` are never reported.
    pub fn error_tolerant_query(
        &self,
        token: &str,
        max_errors: usize,
    ) -> BTreeMap<String, TrieMatch<'_, Payload>> {
        let mut result = BTreeMap::new();
        let mut path = Vec::with_capacity(token.len());
        collect_matches(
            &self.root,
            token.as_bytes(),
            0,
            max_errors,
            &mut path,
            &mut result,
        );
        trace!(
            "Found {} tokens within {max_errors} errors of {token}",
            result.len()
        );
        result
    }

    /// Like [`Self::error_tolerant_query`], but removes every matched token from the trie.
    ///
    /// Inner nodes left without children are pruned up to the last branch point still
    /// shared with a remaining token.
    pub fn destructive_error_tolerant_query(
        &mut self,
        token: &str,
        max_errors: usize,
    ) -> BTreeMap<String, DetachedMatch<Payload>> {
        let mut result = BTreeMap::new();
        let mut path = Vec::with_capacity(token.len());
        detach_matches(
            &mut self.root,
            token.as_bytes(),
            0,
            max_errors,
            &mut path,
            &mut result,
        );

        for detached_token in result.keys() {
            self.counts.remove(detached_token);
        }
        trace!(
            "Detached {} tokens within {max_errors} errors of {token}",
            result.len()
        );
        result
    }

    /// Removes a single token, returning its count and payload.
    pub fn remove(&mut self, token: &str) -> Option<DetachedMatch<Payload>> {
        if !self.contains(token) {
            return None;
        }

        self.destructive_error_tolerant_query(token, 0)
            .into_values()
            .next()
    }

    /// All tokens starting with `prefix`, by descending count.
    pub fn prefix_query(&self, prefix: &str) -> Vec<(String, usize)> {
        let Some(node) = self.root.descendant(prefix.as_bytes()) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut path = prefix.as_bytes().to_vec();
        node.for_each_terminal(&mut path, &mut |token, node| {
            result.push((path_to_token(token), node.count))
        });
        result.sort_by(|(_, a), (_, b)| b.cmp(a));
        result
    }

    /// All tokens with their counts, by descending count and then by token.
    pub fn tokens_by_count(&self) -> Vec<(&str, usize)> {
        let mut result: Vec<_> = self
            .counts
            .iter()
            .map(|(token, &count)| (token.as_str(), count))
            .collect();
        result.sort_by(|(token_a, count_a), (token_b, count_b)| {
            count_b.cmp(count_a).then_with(|| token_a.cmp(token_b))
        });
        result
    }

    /// Counts the neighbours of each centre at increasing distances, removing them as it goes.
    ///
    /// For each distance `d` in `1..=max_distance`, every centre in order detaches all
    /// tokens within `d` substitutions. Since closer tokens were already detached at a smaller
    /// distance, everything detached at `d` is at exactly distance `d` from its centre.
    /// Matches of the centre with itself are not counted. The trie is left without the
    /// detached tokens.
    pub fn neighbour_sweep(
        &mut self,
        centres: impl IntoIterator<Item = impl Into<String>>,
        max_distance: usize,
    ) -> Vec<NeighbourCounts> {
        let mut sweep: Vec<_> = centres
            .into_iter()
            .map(|centre| NeighbourCounts {
                centre: centre.into(),
                counts: Vec::with_capacity(max_distance),
            })
            .collect();

        for distance in 1..=max_distance {
            debug!(
                "Detaching {distance}-neighbours of {} centres from {} remaining tokens",
                sweep.len(),
                self.len()
            );
            for neighbour_counts in &mut sweep {
                let detached =
                    self.destructive_error_tolerant_query(&neighbour_counts.centre, distance);
                neighbour_counts.counts.push(
                    detached
                        .values()
                        .filter(|detached| detached.num_errors != 0)
                        .count(),
                );
            }
        }

        sweep
    }
}

fn path_to_token(path: &[u8]) -> String {
    String::from_utf8_lossy(path).into_owned()
}

fn collect_matches<'trie, Payload>(
    node: &'trie TrieNode<Payload>,
    query: &[u8],
    num_errors: usize,
    max_errors: usize,
    path: &mut Vec<u8>,
    result: &mut BTreeMap<String, TrieMatch<'trie, Payload>>,
) {
    let Some((&query_character, query)) = query.split_first() else {
        if node.is_terminal() {
            result.insert(
                path_to_token(path),
                TrieMatch {
                    count: node.count,
                    payload: node.payload.as_ref(),
                    num_errors,
                },
            );
        }
        return;
    };

    if num_errors == max_errors {
        // No budget left, only the exact continuation can still match.
        if let Some(child) = node.children.get(&query_character) {
            path.push(query_character);
            collect_matches(child, query, num_errors, max_errors, path, result);
            path.pop();
        }
        return;
    }

    for (&character, child) in &node.children {
        path.push(character);
        collect_matches(
            child,
            query,
            num_errors + usize::from(character != query_character),
            max_errors,
            path,
            result,
        );
        path.pop();
    }
}

/// Returns true if the caller should detach `node`.
fn detach_matches<Payload>(
    node: &mut TrieNode<Payload>,
    query: &[u8],
    num_errors: usize,
    max_errors: usize,
    path: &mut Vec<u8>,
    result: &mut BTreeMap<String, DetachedMatch<Payload>>,
) -> bool {
    let Some((&query_character, query)) = query.split_first() else {
        if node.is_terminal() {
            result.insert(
                path_to_token(path),
                DetachedMatch {
                    count: node.count,
                    payload: node.payload.take(),
                    num_errors,
                },
            );
            return true;
        }
        return false;
    };

    let mut detached_children = Vec::new();
    for (&character, child) in node.children.iter_mut() {
        let num_errors = num_errors + usize::from(character != query_character);
        if num_errors > max_errors {
            continue;
        }

        path.push(character);
        if detach_matches(child, query, num_errors, max_errors, path, result) {
            detached_children.push(character);
        }
        path.pop();
    }

    if detached_children.is_empty() {
        return false;
    }
    for character in detached_children {
        node.children.remove(&character);
    }
    node.children.is_empty() && !node.is_terminal()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::{seq::IteratorRandom, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::{error::Error, generate::random_token, similarity::hamming_distance};

    use super::{DetachedMatch, ErrorTolerantTrie, NeighbourCounts, TrieMatch};

    fn example_trie() -> ErrorTolerantTrie<()> {
        let mut trie = ErrorTolerantTrie::new();
        for token in ["ACACACAC", "ACACAGAC", "ACTCACAC", "ACACACGG"] {
            trie.insert(token, None).unwrap();
        }
        trie
    }

    fn errors<'matches, Payload>(
        matches: &'matches BTreeMap<String, TrieMatch<'_, Payload>>,
    ) -> Vec<(&'matches str, usize)> {
        matches
            .iter()
            .map(|(token, found)| (token.as_str(), found.num_errors))
            .collect()
    }

    #[test]
    fn example_query() {
        let trie = example_trie();
        let matches = trie.error_tolerant_query("ACACACAC", 2);
        assert_eq!(
            errors(&matches),
            [
                ("ACACACAC", 0),
                ("ACACACGG", 2),
                ("ACACAGAC", 1),
                ("ACTCACAC", 1)
            ]
        );

        let matches = trie.error_tolerant_query("ACACACAC", 1);
        assert_eq!(
            errors(&matches),
            [("ACACACAC", 0), ("ACACAGAC", 1), ("ACTCACAC", 1)]
        );
    }

    #[test]
    fn zero_errors_equals_exact_query() {
        let mut trie = example_trie();
        trie.insert("ACACAGAC", Some(())).unwrap();

        for token in ["ACACACAC", "ACACAGAC", "ACTCACAC", "ACACACGG", "ACACACAA"] {
            let exact = trie.exact_query(token);
            let tolerant = trie.error_tolerant_query(token, 0);
            match exact {
                Some(exact) => {
                    assert_eq!(tolerant.len(), 1);
                    assert_eq!(tolerant.get(token), Some(&exact));
                    assert_eq!(exact.num_errors, 0);
                }
                None => assert!(tolerant.is_empty()),
            }
        }
    }

    #[test]
    fn counts_and_payloads() {
        let mut trie = ErrorTolerantTrie::new();
        trie.insert("ACGT", Some("first")).unwrap();
        trie.insert("ACGT", None).unwrap();
        trie.insert("ACGT", None).unwrap();
        trie.insert("ACGA", None).unwrap();

        assert_eq!(trie.count("ACGT"), 3);
        assert_eq!(trie.count("ACGA"), 1);
        assert_eq!(trie.count("AAAA"), 0);
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.total_count(), 4);

        let found = trie.exact_query("ACGT").unwrap();
        assert_eq!(found.count, 3);
        assert_eq!(found.payload, Some(&"first"));
        assert_eq!(trie.exact_query("ACGA").unwrap().payload, None);

        trie.insert("ACGT", Some("second")).unwrap();
        assert_eq!(trie.exact_query("ACGT").unwrap().payload, Some(&"second"));

        *trie.payload_mut("ACGT").unwrap() = "third";
        assert_eq!(trie.exact_query("ACGT").unwrap().payload, Some(&"third"));
        assert_eq!(trie.payload_mut("ACGA"), None);
        assert_eq!(trie.payload_mut("TTTT"), None);
    }

    #[test]
    fn rejects_other_lengths_and_characters() {
        let mut trie = ErrorTolerantTrie::<()>::with_token_length(4);
        assert!(matches!(
            trie.insert("ACGTA", None),
            Err(Error::LengthMismatch {
                expected: 4,
                actual: 5
            })
        ));
        assert!(matches!(
            trie.insert("ACGU", None),
            Err(Error::InvalidCharacter { character: 'U', .. })
        ));
        assert!(trie.is_empty());
    }

    #[test]
    fn queries_of_other_lengths_find_nothing() {
        let trie = example_trie();
        assert!(trie.exact_query("ACACAC").is_none());
        assert!(trie.error_tolerant_query("ACACAC", 2).is_empty());
        assert!(trie.error_tolerant_query("ACACACACA", 2).is_empty());
        assert!(trie.error_tolerant_query("", 2).is_empty());
    }

    #[test]
    fn destructive_query_removes_matches() {
        let mut trie = example_trie();
        let detached = trie.destructive_error_tolerant_query("ACACACAC", 1);
        assert_eq!(
            detached.keys().collect::<Vec<_>>(),
            ["ACACACAC", "ACACAGAC", "ACTCACAC"]
        );
        assert_eq!(
            detached["ACACAGAC"],
            DetachedMatch {
                count: 1,
                payload: None,
                num_errors: 1
            }
        );

        assert!(trie
            .destructive_error_tolerant_query("ACACACAC", 1)
            .is_empty());
        assert_eq!(trie.len(), 1);
        assert!(!trie.contains("ACACACAC"));
        assert!(trie.exact_query("ACACACAC").is_none());

        // The branch shared with the remaining token survives.
        let remaining = trie.error_tolerant_query("ACACACAC", 8);
        assert_eq!(errors(&remaining), [("ACACACGG", 2)]);
        assert_eq!(trie.prefix_query("ACACAC"), [("ACACACGG".to_string(), 1)]);
        assert!(trie.prefix_query("ACT").is_empty());
    }

    #[test]
    fn destructive_query_hands_out_payloads() {
        let mut trie = ErrorTolerantTrie::new();
        trie.insert("AAAA", Some(1)).unwrap();
        trie.insert("AAAT", Some(2)).unwrap();
        trie.insert("AAAT", None).unwrap();

        let removed = trie.remove("AAAT").unwrap();
        assert_eq!(removed.count, 2);
        assert_eq!(removed.payload, Some(2));
        assert_eq!(trie.remove("AAAT"), None);
        assert_eq!(trie.exact_query("AAAA").unwrap().payload, Some(&1));
        assert_eq!(trie.count("AAAT"), 0);
    }

    #[test]
    fn prefix_query_sorts_by_count() {
        let mut trie = ErrorTolerantTrie::<()>::new();
        for token in ["ACGT", "ACGA", "ACGA", "AGGA", "ACCC", "ACCC", "ACCC"] {
            trie.insert(token, None).unwrap();
        }

        assert_eq!(
            trie.prefix_query("AC"),
            [
                ("ACCC".to_string(), 3),
                ("ACGA".to_string(), 2),
                ("ACGT".to_string(), 1)
            ]
        );
        assert_eq!(trie.prefix_query("AGGA"), [("AGGA".to_string(), 1)]);
        assert!(trie.prefix_query("T").is_empty());
        assert_eq!(trie.prefix_query("").len(), 4);
        assert_eq!(
            trie.tokens_by_count(),
            [("ACCC", 3), ("ACGA", 2), ("ACGT", 1), ("AGGA", 1)]
        );
    }

    #[test]
    fn neighbour_sweep() {
        let mut trie = ErrorTolerantTrie::<()>::new();
        for token in [
            "AAAAAA", "AAAAAT", "AAAATT", "AAATTT", "CCCCCC", "CCCCCA", "GGGGGG",
        ] {
            trie.insert(token, None).unwrap();
        }

        let sweep = trie.neighbour_sweep(["AAAAAA", "CCCCCC"], 3);
        assert_eq!(
            sweep,
            [
                NeighbourCounts {
                    centre: "AAAAAA".to_string(),
                    counts: vec![1, 1, 1],
                },
                NeighbourCounts {
                    centre: "CCCCCC".to_string(),
                    counts: vec![1, 0, 0],
                }
            ]
        );
        assert_eq!(trie.tokens_by_count(), [("GGGGGG", 1)]);
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let token_length = 10;
        let mut trie = ErrorTolerantTrie::<()>::new();
        let mut tokens = Vec::new();

        // Mutated copies of a few seeds keep many tokens close together.
        let seeds: Vec<_> = (0..5)
            .map(|_| random_token(token_length, &mut rng))
            .collect();
        for _ in 0..300 {
            let mut token = seeds.iter().choose(&mut rng).unwrap().clone().into_bytes();
            for position in (0..token_length).choose_multiple(&mut rng, 3) {
                token[position] = *b"ACGT".iter().choose(&mut rng).unwrap();
            }
            let token = String::from_utf8(token).unwrap();
            trie.insert(&token, None).unwrap();
            tokens.push(token);
        }
        tokens.sort();
        tokens.dedup();

        for query in tokens.iter().take(20).chain(&seeds) {
            for max_errors in 0..=3 {
                let expected: Vec<_> = tokens
                    .iter()
                    .map(|token| {
                        (
                            token.as_str(),
                            hamming_distance(token.as_bytes(), query.as_bytes()),
                        )
                    })
                    .filter(|(_, distance)| *distance <= max_errors)
                    .collect();
                let matches = trie.error_tolerant_query(query, max_errors);
                assert_eq!(errors(&matches), expected);
            }
        }
    }
}
