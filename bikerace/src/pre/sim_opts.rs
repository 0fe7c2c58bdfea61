use crate::interfaces::api::{CompetitorDescriptor, Vote};
use clap::Parser;
use helpers::general::InputValueError;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "bikerace",
    about = "A tick-based motorcycle drag race simulator"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (overridden by RUST_LOG)
    #[clap(short, long)]
    pub debug: bool,

    /// Skip the start lights countdown
    #[clap(short, long)]
    pub fast_forward: bool,

    /// Replay the race once more after it finished (same racers, no new save)
    #[clap(long)]
    pub replay: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the racer catalog file
    #[clap(short, long)]
    pub catalog_path: PathBuf,

    /// Add a racer as make:model[:year], can be repeated
    #[clap(short, long = "racer")]
    pub racers: Vec<String>,

    /// Load a saved race by its identifier instead of racing the given racers
    #[clap(short, long)]
    pub shared: Option<u64>,

    /// Set viewport width in pixels, the finish line is 200px before its right edge
    #[clap(short, long, default_value = "1280")]
    pub viewport_width: f64,

    /// Set real-time factor, 0 runs the race instantly
    #[clap(short = 't', long, default_value = "0.0")]
    pub realtime_factor: f64,

    /// Set timeout for racer lookups in milliseconds
    #[clap(short, long, default_value = "5000")]
    pub lookup_timeout_ms: u64,

    /// Write the placings to this CSV file
    #[clap(short, long)]
    pub output_path: Option<PathBuf>,

    /// Act as this signed-in user for voting and commenting
    #[clap(short, long)]
    pub user: Option<String>,

    /// Vote on the race after it finished (up or down)
    #[clap(long)]
    pub vote: Option<Vote>,

    /// Comment on the race after it finished
    #[clap(long)]
    pub comment: Option<String>,

    /// Print a listing of saved races after racing (popular or recent)
    #[clap(long)]
    pub list: Option<ListingChoice>,
}

/// Which saved-race listing to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingChoice {
    Popular,
    Recent,
}

impl FromStr for ListingChoice {
    type Err = InputValueError;

    fn from_str(s: &str) -> Result<ListingChoice, InputValueError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popular" => Ok(ListingChoice::Popular),
            "recent" => Ok(ListingChoice::Recent),
            _ => Err(InputValueError::new(format!(
                "listing must be popular or recent, got '{}'",
                s
            ))),
        }
    }
}

impl SimOpts {
    /// descriptors parses the `--racer` arguments.
    pub fn descriptors(&self) -> Result<Vec<CompetitorDescriptor>, InputValueError> {
        self.racers.iter().map(|r| parse_racer(r)).collect()
    }
}

/// parse_racer parses `make:model[:year]`.
pub fn parse_racer(arg: &str) -> Result<CompetitorDescriptor, InputValueError> {
    let parts: Vec<&str> = arg.split(':').collect();
    match parts.as_slice() {
        [make, model] => Ok(CompetitorDescriptor::new(make, model, None)),
        [make, model, year] => Ok(CompetitorDescriptor::new(make, model, Some(year))),
        _ => Err(InputValueError::new(format!(
            "racer '{}' must look like make:model[:year]",
            arg
        ))),
    }
}
