use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catsync")]
#[command(about = "Batch synchronization of catalog resource drafts", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Sync drafts into a catalog file (created when missing)
    catsync drafts.json catalog.json

    # Smaller concurrent windows, slugs must be unique
    catsync drafts.json catalog.json --batch-size 10 --unique-field slug

    # Chain several sync calls of 500 drafts each on one engine
    catsync drafts.json catalog.json --chunk 500

    # Newline-delimited JSON events for scripting
    catsync drafts.json catalog.json --json

    # Use settings from a named profile
    catsync --profile products")]
pub struct Cli {
    /// JSON array of resource drafts; `null` entries are allowed
    /// Optional when using --profile
    pub drafts: Option<PathBuf>,

    /// JSON catalog file to sync into
    /// Optional when using --profile
    pub catalog: Option<PathBuf>,

    /// Drafts processed concurrently per window (non-positive: default)
    #[arg(short, long, allow_negative_numbers = true, env = "CATSYNC_BATCH_SIZE")]
    pub batch_size: Option<i64>,

    /// Capacity of the id-to-key reference cache (non-positive: default)
    #[arg(long, allow_negative_numbers = true, env = "CATSYNC_CACHE_SIZE")]
    pub cache_size: Option<i64>,

    /// Conflict retries per update before giving up
    #[arg(long)]
    pub max_conflict_retries: Option<u32>,

    /// Split the input into sync calls of this many drafts (0: one call)
    #[arg(long)]
    pub chunk: Option<usize>,

    /// Field whose values must be unique per resource type (repeatable)
    #[arg(long = "unique-field")]
    pub unique_fields: Vec<String>,

    /// Reject writes whose references point at missing resources
    #[arg(long)]
    pub check_references: bool,

    /// Plural noun used in the summary
    #[arg(long)]
    pub resource_label: Option<String>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output JSON (newline-delimited JSON for scripting)
    #[arg(long)]
    pub json: bool,

    /// Use named profile from config file
    #[arg(long)]
    pub profile: Option<String>,

    /// List all available profiles
    #[arg(long)]
    pub list_profiles: bool,

    /// Show details of a specific profile
    #[arg(long)]
    pub show_profile: Option<String>,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.list_profiles || self.show_profile.is_some() {
            return Ok(());
        }

        if self.drafts.is_none() || self.catalog.is_none() {
            anyhow::bail!("Drafts and catalog are required (or use --profile)");
        }

        if let Some(drafts) = &self.drafts {
            if !drafts.is_file() {
                anyhow::bail!("Drafts file does not exist: {}", drafts.display());
            }
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("--quiet and --verbose are mutually exclusive");
        }

        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet || self.json {
            return tracing::Level::ERROR;
        }

        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
