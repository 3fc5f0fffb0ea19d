use std::path::PathBuf;

/// Precinct voting-center CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "pollmap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Resolve voting centers for a precinct GeoJSON file
    Centers(CentersArgs),

    /// Fetch one data-source feed and export it as a FeatureCollection
    Records(RecordsArgs),
}

#[derive(clap::Args, Debug)]
pub struct CentersArgs {
    /// Input precinct FeatureCollection (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub precincts: PathBuf,

    /// Output mapping file (JSON)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Previous output to resume from; resolved precincts are skipped
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub resume: Option<PathBuf>,

    /// Shared retry budget per precinct
    #[arg(long, default_value_t = pollmap::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Reverse geocoder base URL
    #[arg(long, default_value = pollmap::NOMINATIM_URL)]
    pub geocoder_url: String,

    /// Polling-place lookup form URL (defaults to the Orange County FL form)
    #[arg(long)]
    pub form_url: Option<String>,

    /// Overwrite if the output file exists
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct RecordsArgs {
    /// Service tag, e.g. police
    pub service: String,

    /// JSON file listing dispatch reasons to exclude
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub exclusions: Option<PathBuf>,

    /// Time window in minutes for the upstream query
    #[arg(long, default_value_t = 60)]
    pub window: i64,

    /// Output file (stdout if omitted)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Overwrite if the output file exists
    #[arg(long)]
    pub force: bool,
}
