use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `.docbot/config.toml`.
///
/// Every field has a default; a missing config file is equivalent to
/// `Config::default()`. CLI flags take precedence over file values, which
/// take precedence over defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub max_scopes: usize,
    pub max_snapshots: usize,
    pub no_llm: bool,
    pub agent_max_depth: u32,
    pub agent_max_parallel: usize,
    pub notepad_budget_chars: usize,
    pub docbot_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            concurrency: 4,
            timeout_secs: 120,
            max_scopes: 64,
            max_snapshots: 20,
            no_llm: false,
            agent_max_depth: 2,
            agent_max_parallel: 8,
            notepad_budget_chars: 8000,
            docbot_dir: ".docbot".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.concurrency == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "concurrency".into(),
                message: "concurrency must be greater than 0".into(),
            });
        }

        if self.timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "timeout_secs".into(),
                message: "timeout_secs must be greater than 0".into(),
            });
        }

        if self.max_scopes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "max_scopes".into(),
                message: "max_scopes must be greater than 0".into(),
            });
        }

        if self.agent_max_parallel == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "agent_max_parallel".into(),
                message: "agent_max_parallel must be greater than 0".into(),
            });
        }

        if self.agent_max_depth == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "agent_max_depth".into(),
                message: "agent_max_depth is 0 — agents will never be allowed to spawn children".into(),
            });
        }

        if self.notepad_budget_chars < 500 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "notepad_budget_chars".into(),
                message: "notepad_budget_chars below 500 may truncate nearly every entry".into(),
            });
        }

        if self.model.trim().is_empty() && !self.no_llm {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "model".into(),
                message: "model must not be empty unless no_llm is set".into(),
            });
        }

        if self.docbot_dir.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "docbot_dir".into(),
                message: "docbot_dir must not be empty".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_issue<'a>(issues: &'a [ConfigError], field: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field == field)
    }

    #[test]
    fn default_config_is_valid() {
        let issues = Config::default().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn zero_concurrency_is_error() {
        let mut cfg = Config::default();
        cfg.concurrency = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "concurrency").expect("expected concurrency error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn zero_agent_max_depth_is_warning_not_error() {
        let mut cfg = Config::default();
        cfg.agent_max_depth = 0;
        let issues = cfg.validate();
        let issue =
            find_issue(&issues, "agent_max_depth").expect("expected agent_max_depth warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn empty_model_without_no_llm_is_error() {
        let mut cfg = Config::default();
        cfg.model = String::new();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "model").is_some());
    }

    #[test]
    fn empty_model_with_no_llm_is_ok() {
        let mut cfg = Config::default();
        cfg.model = String::new();
        cfg.no_llm = true;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "model").is_none());
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string(&cfg).expect("serialize");
        let back: Config = toml::from_str(&s).expect("deserialize");
        assert_eq!(cfg.model, back.model);
        assert_eq!(cfg.agent_max_parallel, back.agent_max_parallel);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let back: Config = toml::from_str("model = \"custom\"\n").expect("deserialize");
        assert_eq!(back.model, "custom");
        assert_eq!(back.concurrency, Config::default().concurrency);
    }
}
