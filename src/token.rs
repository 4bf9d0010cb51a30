//! Tokens are fixed-length barcode strings over the DNA alphabet plus `N`.

use compact_genome::{
    implementation::alphabets::dna_alphabet::DnaAlphabet, interface::alphabet::Alphabet,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The character sequencers emit for an uncalled base.
pub const UNKNOWN_CHARACTER: u8 = b'N';

pub fn is_token_character(character: char) -> bool {
    character.is_ascii()
        && (character as u8 == UNKNOWN_CHARACTER
            || DnaAlphabet::ascii_to_character(character as u8).is_ok())
}

/// Fails if the token contains a character outside of `ACGTN`.
pub fn validate_token(token: &str) -> Result<()> {
    if let Some(character) = token.chars().find(|&c| !is_token_character(c)) {
        return Err(Error::InvalidCharacter {
            token: token.to_string(),
            character,
        });
    }

    Ok(())
}

/// Fixes the token length on first use and rejects any later token of another length.
pub(crate) fn check_token_length(token_length: &mut Option<usize>, token: &str) -> Result<usize> {
    match *token_length {
        Some(expected) if expected != token.len() => Err(Error::LengthMismatch {
            expected,
            actual: token.len(),
        }),
        Some(expected) => Ok(expected),
        None => {
            *token_length = Some(token.len());
            Ok(token.len())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub position: usize,
    pub length: usize,
}

impl Segment {
    pub const fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    pub fn end(&self) -> usize {
        self.position + self.length
    }
}

/// Where the UMI and the well id sit inside the first bases of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarcodeLayout {
    /// UMI directly followed by the well id and some padding bases.
    Contiguous {
        umi_start: usize,
        umi_length: usize,
        well_id_length: usize,
        padding: usize,
    },
    /// UMI and well id split into segments that alternate along the read.
    Interleaved {
        umi_segments: Vec<Segment>,
        well_id_segments: Vec<Segment>,
    },
}

impl Default for BarcodeLayout {
    fn default() -> Self {
        Self::Contiguous {
            umi_start: 0,
            umi_length: 16,
            well_id_length: 8,
            padding: 4,
        }
    }
}

impl BarcodeLayout {
    /// The interleaved layout used by APHA-seq reads.
    pub fn interleaved_apha_seq() -> Self {
        Self::Interleaved {
            umi_segments: vec![Segment::new(0, 4), Segment::new(9, 4), Segment::new(18, 2)],
            well_id_segments: vec![Segment::new(4, 5), Segment::new(13, 5)],
        }
    }

    /// Length of the UMI + well id token cut from a read.
    pub fn token_length(&self) -> usize {
        match self {
            Self::Contiguous {
                umi_length,
                well_id_length,
                padding,
                ..
            } => umi_length + well_id_length + padding,
            Self::Interleaved {
                umi_segments,
                well_id_segments,
            } => umi_segments
                .iter()
                .chain(well_id_segments)
                .map(Segment::end)
                .max()
                .unwrap_or(0),
        }
    }

    pub fn umi_length(&self) -> usize {
        self.token_segments().0.iter().map(|segment| segment.length).sum()
    }

    pub fn well_id_length(&self) -> usize {
        self.token_segments().1.iter().map(|segment| segment.length).sum()
    }

    /// UMI and well id segments relative to the start of the token.
    pub fn token_segments(&self) -> (Vec<Segment>, Vec<Segment>) {
        match self {
            Self::Contiguous {
                umi_length,
                well_id_length,
                ..
            } => (
                vec![Segment::new(0, *umi_length)],
                vec![Segment::new(*umi_length, *well_id_length)],
            ),
            Self::Interleaved {
                umi_segments,
                well_id_segments,
            } => (umi_segments.clone(), well_id_segments.clone()),
        }
    }

    /// Cuts the UMI + well id token out of a read.
    ///
    /// Fails on reads that are too short for the layout, or that contain a character outside
    /// of `ACGTN` before the end of the token.
    pub fn umi_well_sequence<'read>(&self, read: &'read str) -> Result<&'read str> {
        let start = match self {
            Self::Contiguous { umi_start, .. } => *umi_start,
            Self::Interleaved { .. } => 0,
        };
        let end = start + self.token_length();
        if read.len() < end {
            return Err(Error::LayoutOutOfRange {
                read_length: read.len(),
                required_length: end,
            });
        }

        if let Some((_, character)) = read
            .char_indices()
            .take_while(|&(index, _)| index < end)
            .find(|&(_, character)| !is_token_character(character))
        {
            return Err(Error::InvalidCharacter {
                token: read.to_string(),
                character,
            });
        }

        // Everything before `end` is ASCII, so both ends are character boundaries.
        read.get(start..end).ok_or(Error::LayoutOutOfRange {
            read_length: read.len(),
            required_length: end,
        })
    }

    /// Splits a token produced by [`Self::umi_well_sequence`] into UMI and well id.
    pub fn split(&self, umi_well_sequence: &str) -> Result<(String, String)> {
        validate_token(umi_well_sequence)?;
        let required_length = self.token_length();
        if umi_well_sequence.len() < required_length {
            return Err(Error::LayoutOutOfRange {
                read_length: umi_well_sequence.len(),
                required_length,
            });
        }

        let (umi_segments, well_id_segments) = self.token_segments();
        Ok((
            concatenate_segments(umi_well_sequence, &umi_segments),
            concatenate_segments(umi_well_sequence, &well_id_segments),
        ))
    }
}

/// `sequence` must be ASCII and long enough for every segment.
fn concatenate_segments(sequence: &str, segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|segment| sequence.get(segment.position..segment.end()))
        .collect()
}
