use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

use crate::similarity::NgramHistogram;

/// Memoised n-gram histograms of indexed tokens, owned by one index.
///
/// Without a capacity the cache keeps every histogram until the token is deleted.
/// With a capacity, the least recently used histogram is evicted first.
pub struct HistogramCache {
    histograms: LruCache<String, NgramHistogram>,
}

impl HistogramCache {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let histograms = match capacity {
            Some(capacity) => {
                debug!("Bounding the histogram cache to {capacity} tokens");
                LruCache::new(capacity)
            }
            None => LruCache::unbounded(),
        };
        Self { histograms }
    }

    /// The histogram of `token`, computed on the first request.
    pub fn histogram(&mut self, token: &str, ngram_length: usize) -> &NgramHistogram {
        self.histograms
            .get_or_insert(token.to_string(), || {
                NgramHistogram::from_sequence(token.as_bytes(), ngram_length)
            })
    }

    pub fn remove(&mut self, token: &str) {
        self.histograms.pop(token);
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.histograms.contains(token)
    }
}

impl std::fmt::Debug for HistogramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramCache")
            .field("len", &self.histograms.len())
            .field("cap", &self.histograms.cap())
            .finish()
    }
}
