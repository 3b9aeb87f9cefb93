use std::path::Path;
use std::sync::Arc;

use docbot_llm::{LlmAdapter, NoLlmAdapter, OpenAiCompatAdapter};
use docbot_pipeline::{run_pipeline, PipelineOptions, RunMode};
use docbot_types::config::Config;

/// Default OpenAI-compatible endpoint used when no override is set.
/// Non-goal per spec.md: no multi-provider routing, just enough to run
/// end-to-end against a real or locally hosted OpenAI-compatible server.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const BASE_URL_ENV: &str = "DOCBOT_LLM_BASE_URL";

fn build_llm_adapter(config: &Config) -> anyhow::Result<Arc<dyn LlmAdapter>> {
    if config.no_llm {
        return Ok(Arc::new(NoLlmAdapter));
    }

    match docbot_llm::resolve_api_key() {
        Some(api_key) => {
            let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
            let adapter = OpenAiCompatAdapter::new(base_url, api_key, config.model.clone(), config.agent_max_parallel)?;
            Ok(Arc::new(adapter))
        }
        None => {
            tracing::warn!("{} not set, falling back to no_llm mode", docbot_llm::LLM_KEY_ENV);
            Ok(Arc::new(NoLlmAdapter))
        }
    }
}

pub async fn run(repo_root: &Path, mode: RunMode) -> anyhow::Result<()> {
    let (config, _config_path) = crate::cli::load_config(repo_root)?;

    let issues = config.validate();
    let fatal = issues.iter().any(|e| e.severity == docbot_types::config::ConfigSeverity::Error);
    for issue in &issues {
        match issue.severity {
            docbot_types::config::ConfigSeverity::Error => tracing::error!("config: {issue}"),
            docbot_types::config::ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
        }
    }
    if fatal {
        anyhow::bail!("config validation failed with {} error(s)", issues.iter().filter(|e| matches!(e.severity, docbot_types::config::ConfigSeverity::Error)).count());
    }

    let docbot_dir = repo_root.join(&config.docbot_dir);
    let adapter = build_llm_adapter(&config)?;
    let llm = if config.no_llm { None } else { Some(adapter) };

    let outcome = run_pipeline(PipelineOptions {
        repo_root: repo_root.to_path_buf(),
        docbot_dir,
        config,
        llm,
        mode,
    })
    .await?;

    println!(
        "run {}: {} scope(s), {} file(s) rendered",
        outcome.run_id,
        outcome.index.scopes.len(),
        outcome.rendered_paths.len()
    );
    for path in &outcome.rendered_paths {
        println!("  wrote {}", path.display());
    }

    Ok(())
}
