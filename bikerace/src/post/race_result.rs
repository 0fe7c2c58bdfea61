use crate::interfaces::api::PersistedRace;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// Placing of one competitor in a finished (or finishing) race.
/// * `position` - 1-based arrival position
/// * `ordinal` - English ordinal of the position, e.g. 2nd
/// * `index` - Index of the competitor in the race's competitor list
/// * `ticks` - Motion updates the competitor needed to cross the finish boundary
/// * `finish_ms` - (ms) Time of the crossing, measured from the start of the sequence
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Placing {
    pub position: usize,
    pub ordinal: String,
    pub index: usize,
    pub competitor_id: u64,
    pub name: String,
    pub ticks: u32,
    pub finish_ms: u64,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaceResult {
    pub race: Option<PersistedRace>,
    pub track_length: f64,
    pub placings: Vec<Placing>,
}

impl RaceResult {
    pub fn winner(&self) -> Option<&Placing> {
        self.placings.first()
    }

    /// format_placings renders one `1st - Name` row per finisher.
    pub fn format_placings(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        for placing in self.placings.iter() {
            writeln!(
                &mut out,
                "{} - {} ({} ticks, {:.2}s)",
                placing.ordinal,
                placing.name,
                placing.ticks,
                placing.finish_ms as f64 / 1000.0
            )?;
        }
        Ok(out)
    }

    /// print_placings prints the resulting order to the console output.
    pub fn print_placings(&self) -> anyhow::Result<()> {
        match &self.race {
            Some(race) => println!("RESULT: Race {} ({})", race.race_identifier, race.race_public_id),
            None => println!("RESULT: Unsaved race"),
        }
        print!("{}", self.format_placings()?);
        Ok(())
    }

    /// write_placings_csv writes one CSV row per placing to `path`.
    pub fn write_placings_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .context(format!("Failed to create results file {}!", path.display()))?;
        for placing in self.placings.iter() {
            writer
                .serialize(placing)
                .context("Failed to write placing to results file!")?;
        }
        writer.flush().context("Failed to flush results file!")?;
        Ok(())
    }
}
