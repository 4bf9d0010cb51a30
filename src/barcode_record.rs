use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

/// Reads recorded against a single UMI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeRecord {
    pub count: usize,
    pub well_ids: BTreeMap<String, WellRecord>,
}

/// Reads of one UMI that carried the same well id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellRecord {
    pub count: usize,
    pub amplicon_ids: BTreeMap<String, usize>,
}

impl BarcodeRecord {
    pub fn new(well_id: &str, amplicon_id: &str) -> Self {
        let mut record = Self::default();
        record.add_read(well_id, amplicon_id);
        record
    }

    pub fn add_read(&mut self, well_id: &str, amplicon_id: &str) {
        self.count += 1;
        let well = self.well_ids.entry(well_id.to_string()).or_default();
        well.count += 1;
        *well.amplicon_ids.entry(amplicon_id.to_string()).or_insert(0) += 1;
    }

    /// Merges the reads of another record into this one.
    pub fn absorb(&mut self, other: Self) {
        self.count += other.count;
        for (well_id, other_well) in other.well_ids {
            let well = self.well_ids.entry(well_id).or_default();
            well.count += other_well.count;
            for (amplicon_id, count) in other_well.amplicon_ids {
                *well.amplicon_ids.entry(amplicon_id).or_insert(0) += count;
            }
        }
    }

    /// The well id most reads carried, the smallest one on ties.
    pub fn dominant_well_id(&self) -> Option<&str> {
        sorted_by_count(self.well_ids.iter().map(|(well_id, well)| (well_id, well.count)))
            .into_iter()
            .next()
            .map(|(well_id, _)| well_id.as_str())
    }
}

fn sorted_by_count<'a>(
    entries: impl Iterator<Item = (&'a String, usize)>,
) -> Vec<(&'a String, usize)> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by_key(|&(_, count)| std::cmp::Reverse(count));
    entries
}

impl Display for BarcodeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} reads", self.count)?;
        for (well_id, count) in
            sorted_by_count(self.well_ids.iter().map(|(well_id, well)| (well_id, well.count)))
        {
            write!(f, "\n  {well_id}: {count}")?;
            let well = &self.well_ids[well_id];
            for (amplicon_id, count) in sorted_by_count(
                well.amplicon_ids
                    .iter()
                    .map(|(amplicon_id, &count)| (amplicon_id, count)),
            ) {
                write!(f, "\n    {amplicon_id}: {count}")?;
            }
        }
        Ok(())
    }
}
