use clap::{Args, Parser, Subcommand};
use notenet::error::{NotesError, Result};
use notenet::model::Seed;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "notenet", bin_name = "notenet", version = get_version())]
#[command(about = "Notes on a decentralized document network", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// The identity a note command acts as.
#[derive(Args, Debug, Clone)]
pub struct Identity {
    /// Base16 seed of the identity (64 hex characters)
    #[arg(long, env = "NOTENET_SEED", hide_env_values = true)]
    pub seed: Option<String>,
}

impl Identity {
    pub fn seed(&self) -> Result<Seed> {
        self.seed
            .as_deref()
            .ok_or_else(|| {
                NotesError::InvalidSeed("no seed given (use --seed or NOTENET_SEED)".to_string())
            })?
            .parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a new random seed
    Seed,

    /// Publish the note schemas, the notes definition and the placeholder tile
    Provision {
        /// Base16 seed of the publishing identity
        #[arg(long, env = "SEED", hide_env_values = true)]
        seed: Option<String>,

        /// Where to write the model aliases (defaults to model.json in the data dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List notes, most recent first
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        identity: Identity,
    },

    /// Create a note
    #[command(alias = "n")]
    New {
        /// Title of the note
        title: String,

        /// Text of the note
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        #[command(flatten)]
        identity: Identity,
    },

    /// Show a note
    #[command(alias = "v")]
    View {
        /// List position (e.g. 1) or document id
        note: String,

        #[command(flatten)]
        identity: Identity,
    },

    /// Replace the text of a note
    #[command(alias = "e")]
    Edit {
        /// List position (e.g. 1) or document id
        note: String,

        /// New text of the note
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        #[command(flatten)]
        identity: Identity,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., placeholder-text)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
