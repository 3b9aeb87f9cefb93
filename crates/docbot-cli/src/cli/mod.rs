pub mod config;
pub mod diff;
pub mod doctor;
pub mod generate;

use clap::{Parser, Subcommand};

/// docbot — hierarchical, LLM-assisted repository documentation generator.
#[derive(Debug, Parser)]
#[command(name = "docbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the repository to document (defaults to the current directory).
    #[arg(long, global = true, default_value = ".")]
    pub repo: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline and write a fresh documentation set.
    Generate,
    /// Run the pipeline incrementally, limited to scopes touched since the last run.
    Update,
    /// Compare two snapshots (defaults to the two most recent runs).
    Diff {
        /// Run ID to diff from (defaults to the second-most-recent snapshot).
        #[arg(long)]
        from: Option<String>,
        /// Run ID to diff to (defaults to the most recent snapshot).
        #[arg(long)]
        to: Option<String>,
    },
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load the configuration from `<docbot_dir>/config.toml` under the repo
/// root. A missing file is equivalent to `Config::default()`, matching
/// `sa_gateway::cli::load_config`'s fallback.
pub fn load_config(repo_root: &std::path::Path) -> anyhow::Result<(docbot_types::config::Config, std::path::PathBuf)> {
    // `docbot_dir` itself is read from the default config's own field since
    // the file that names a custom location hasn't been read yet — this
    // mirrors the original's assumption that `.docbot/` is fixed ahead of
    // any config content.
    let default_dir = docbot_types::config::Config::default().docbot_dir;
    let config_path = repo_root.join(&default_dir).join("config.toml");

    let config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", config_path.display()))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", config_path.display()))?
    } else {
        docbot_types::config::Config::default()
    };

    Ok((config, config_path))
}
