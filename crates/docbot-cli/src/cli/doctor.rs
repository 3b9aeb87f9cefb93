use std::path::Path;

use docbot_types::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `true` when every check passes.
pub fn run(config: &Config, config_path: &Path, repo_root: &Path) -> bool {
    println!("docbot doctor");
    println!("=============\n");

    let mut all_passed = true;

    check_config_file(config_path);
    check_config_validation(config, &mut all_passed);
    check_repo_root(repo_root, &mut all_passed);
    check_docbot_dir(repo_root, config, &mut all_passed);
    check_llm(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    all_passed
}

fn check_config_file(config_path: &Path) {
    let exists = config_path.exists();
    print_check(
        "Config file exists",
        exists,
        if exists { config_path.display().to_string() } else { format!("{} not found (using defaults)", config_path.display()) },
    );
    // A missing config file is not fatal — defaults are valid on their own.
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check("Config validation", error_count == 0, format!("{} issue(s) ({error_count} error(s))", issues.len()));
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_repo_root(repo_root: &Path, all_passed: &mut bool) {
    let ok = repo_root.is_dir();
    print_check(
        "Repository root",
        ok,
        if ok { repo_root.display().to_string() } else { format!("{} is not a directory", repo_root.display()) },
    );
    if !ok {
        *all_passed = false;
    }
}

fn check_docbot_dir(repo_root: &Path, config: &Config, all_passed: &mut bool) {
    let dir = repo_root.join(&config.docbot_dir);
    let created = std::fs::create_dir_all(&dir).is_ok();
    let writable = if created {
        let probe = dir.join(".docbot_doctor_probe");
        let w = std::fs::write(&probe, b"probe").is_ok();
        let _ = std::fs::remove_file(&probe);
        w
    } else {
        false
    };

    let detail = if created && writable {
        format!("{} (writable)", dir.display())
    } else {
        format!("{} (not writable)", dir.display())
    };
    print_check("Docbot state directory", created && writable, detail);
    if !(created && writable) {
        *all_passed = false;
    }
}

fn check_llm(config: &Config, all_passed: &mut bool) {
    if config.no_llm {
        print_check("LLM adapter", true, "no_llm mode: agentic enrichment disabled".into());
        return;
    }

    let key_present = docbot_llm::resolve_api_key().is_some();
    print_check(
        "LLM adapter",
        key_present,
        if key_present {
            format!("model={}, {} set", config.model, docbot_llm::LLM_KEY_ENV)
        } else {
            format!("{} not set; falling back to no_llm mode", docbot_llm::LLM_KEY_ENV)
        },
    );
    if !key_present {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "WARN" };
    println!("  [{status}] {name}: {detail}");
}
