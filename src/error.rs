use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("index serialisation error: {0}")]
    IndexSerialisation(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("index deserialisation error: {0}")]
    IndexDeserialisation(#[from] ciborium::de::Error<std::io::Error>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("a query of length {query_length} is shorter than the n-gram length {ngram_length}")]
    InvalidQueryLength {
        query_length: usize,
        ngram_length: usize,
    },

    #[error("token of length {actual} does not match the indexed token length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("token {token:?} contains the character {character:?} which is not part of the alphabet")]
    InvalidCharacter { token: String, character: char },

    #[error("n-gram length {0} is not supported")]
    InvalidNgramLength(usize),

    #[error("the n-gram length {ngram_length} is longer than the token length {token_length}")]
    NgramLongerThanToken {
        ngram_length: usize,
        token_length: usize,
    },

    #[error("the given similarity fraction {0} is out of range (0.0, 1.0]")]
    InvalidSimilarityFraction(f64),

    #[error("the given mean {0} is not usable for a Poisson distribution")]
    InvalidPoissonMean(f64),

    #[error("a read of length {read_length} is too short for a barcode layout that requires {required_length} characters")]
    LayoutOutOfRange {
        read_length: usize,
        required_length: usize,
    },

    #[error("line {line_number} of the input is malformed")]
    MalformedInputLine { line_number: usize },

    #[error("the input contains no reads")]
    EmptyInput,
}
