//! Synthetic barcode reads with sequencing substitutions.

use rand::{seq::IteratorRandom, Rng};
use rand_distr::{Distribution, Poisson};

use crate::{
    error::{Error, Result},
    token::BarcodeLayout,
};

const BASES: &[u8; 4] = b"ACGT";

pub fn random_token(length: usize, rng: &mut impl Rng) -> String {
    (0..length)
        .map(|_| BASES[rng.gen_range(0..BASES.len())] as char)
        .collect()
}

/// Replaces `amount` distinct positions of `token` by a different base.
pub fn substitute(token: &str, amount: usize, rng: &mut impl Rng) -> String {
    let mut token = token.as_bytes().to_vec();
    for position in (0..token.len()).choose_multiple(rng, amount) {
        let original = token[position];
        token[position] = *BASES
            .iter()
            .filter(|&&base| base != original)
            .choose(rng)
            .unwrap_or(&original);
    }
    token.into_iter().map(char::from).collect()
}

#[derive(Debug, Clone)]
pub struct ReadGeneratorParameters {
    pub layout: BarcodeLayout,
    pub molecule_amount: usize,
    pub well_id_amount: usize,
    pub amplicon_amount: usize,
    /// Mean of the additional reads per molecule on top of the first.
    pub duplicate_mean: f64,
    /// Mean number of substitutions per read inside the barcode token.
    pub substitution_mean: f64,
    /// Bases appended after the barcode token.
    pub insert_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRead {
    pub read_id: String,
    pub sequence: String,
}

pub struct ReadGenerator {
    parameters: ReadGeneratorParameters,
    well_ids: Vec<String>,
}

impl ReadGenerator {
    pub fn new(parameters: ReadGeneratorParameters, rng: &mut impl Rng) -> Result<Self> {
        for mean in [parameters.duplicate_mean, parameters.substitution_mean] {
            if !mean.is_finite() || mean < 0.0 {
                return Err(Error::InvalidPoissonMean(mean));
            }
        }

        let well_id_length = parameters.layout.well_id_length();
        let well_ids = (0..parameters.well_id_amount)
            .map(|_| random_token(well_id_length, rng))
            .collect();
        Ok(Self {
            parameters,
            well_ids,
        })
    }

    pub fn well_ids(&self) -> &[String] {
        &self.well_ids
    }

    pub fn generate(&self, rng: &mut impl Rng) -> Result<Vec<SyntheticRead>> {
        let duplicates = poisson(self.parameters.duplicate_mean)?;
        let substitutions = poisson(self.parameters.substitution_mean)?;
        let umi_length = self.parameters.layout.umi_length();

        let mut reads = Vec::new();
        for molecule in 0..self.parameters.molecule_amount {
            let umi = random_token(umi_length, rng);
            let Some(well_id) = self.well_ids.iter().choose(rng) else {
                break;
            };
            let amplicon = rng.gen_range(0..self.parameters.amplicon_amount.max(1));
            let token = compose(&self.parameters.layout, &umi, well_id, rng);
            let read_amount = 1 + sample_or_zero(duplicates.as_ref(), rng);

            for copy in 0..read_amount {
                let token = substitute(&token, sample_or_zero(substitutions.as_ref(), rng), rng);
                let insert = random_token(self.parameters.insert_length, rng);
                reads.push(SyntheticRead {
                    read_id: format!("molecule{molecule}.{copy}:amplicon{amplicon}"),
                    sequence: format!("{token}{insert}"),
                });
            }
        }

        Ok(reads)
    }
}

/// Writes UMI and well id into their segments of a random token.
fn compose(layout: &BarcodeLayout, umi: &str, well_id: &str, rng: &mut impl Rng) -> String {
    let mut token = random_token(layout.token_length(), rng).into_bytes();
    let (umi_segments, well_id_segments) = layout.token_segments();
    for (segments, bases) in [(umi_segments, umi), (well_id_segments, well_id)] {
        let mut bases = bases.bytes();
        for segment in segments {
            for (target, base) in token[segment.position..segment.end()].iter_mut().zip(&mut bases) {
                *target = base;
            }
        }
    }
    token.into_iter().map(char::from).collect()
}

fn poisson(mean: f64) -> Result<Option<Poisson<f64>>> {
    if mean == 0.0 {
        Ok(None)
    } else {
        Poisson::new(mean)
            .map(Some)
            .map_err(|_| Error::InvalidPoissonMean(mean))
    }
}

fn sample_or_zero(distribution: Option<&Poisson<f64>>, rng: &mut impl Rng) -> usize {
    distribution.map_or(0, |distribution| distribution.sample(rng) as usize)
}
