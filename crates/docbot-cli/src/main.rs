mod cli;

use clap::Parser;
use cli::{Cli, Command, ConfigCommand};
use docbot_pipeline::RunMode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let repo_root = std::path::PathBuf::from(&args.repo);

    match args.command {
        Command::Generate => {
            init_tracing();
            cli::generate::run(&repo_root, RunMode::Generate).await
        }
        Command::Update => {
            init_tracing();
            cli::generate::run(&repo_root, RunMode::Update).await
        }
        Command::Diff { from, to } => {
            let (config, _) = cli::load_config(&repo_root)?;
            let docbot_dir = repo_root.join(&config.docbot_dir);
            cli::diff::run(&docbot_dir, from, to)
        }
        Command::Doctor => {
            let (config, config_path) = cli::load_config(&repo_root)?;
            let passed = cli::doctor::run(&config, &config_path, &repo_root);
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config(&repo_root)?;
            let valid = cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = cli::load_config(&repo_root)?;
            cli::config::show(&config);
            Ok(())
        }
        Command::Version => {
            println!("docbot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing, matching `sa_gateway::main::init_tracing`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,docbot=debug")))
        .json()
        .init();
}
