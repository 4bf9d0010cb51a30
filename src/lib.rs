//! Error-tolerant indexes for the UMI and well id barcodes of sequencing reads.
//!
//! [`error_tolerant_trie::ErrorTolerantTrie`] retrieves fixed-length tokens within a number
//! of substitutions of a query. [`ngram_index::NgramIndex`] maps n-grams to the tokens they
//! occur in and locates short barcodes inside tokens at unknown offsets.

pub mod alignment;
pub mod barcode_record;
pub mod distance_matrix;
pub mod error;
pub mod error_tolerant_trie;
pub mod generate;
pub mod ngram_index;
pub mod similarity;
pub mod token;
