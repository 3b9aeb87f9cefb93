//! `list_directory` tool: a filtered, sorted directory listing.

use std::path::Path;

const NOISE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "dist",
    "build",
    "target",
    ".mypy_cache",
    ".pytest_cache",
    ".docbot",
];

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != ".gitignore"
}

fn is_noise(name: &str) -> bool {
    NOISE_DIRS.contains(&name) || name.ends_with(".egg-info")
}

/// List the immediate children of `abs_path`, filtering noise/dotfiles and
/// sorting directories-then-files, each alphabetically case-insensitive.
pub fn list_directory(abs_path: &Path) -> Result<String, String> {
    let entries = std::fs::read_dir(abs_path)
        .map_err(|e| format!("Error: could not list directory: {e}"))?;

    let mut rows: Vec<(bool, String, u64)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Error: {e}"))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) || is_noise(&name) {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|e| format!("Error: could not stat '{name}': {e}"))?;
        rows.push((meta.is_file(), name, meta.len()));
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.to_lowercase().cmp(&b.1.to_lowercase())));

    if rows.is_empty() {
        return Ok("(empty directory)".to_string());
    }

    let mut out = String::new();
    for (is_file, name, size) in rows {
        if is_file {
            out.push_str(&format!("[file] {name} ({size} bytes)\n"));
        } else {
            out.push_str(&format!("[dir]  {name}\n"));
        }
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filters_noise_and_dotfiles() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join(".env"), "").unwrap();
        std::fs::write(dir.path().join(".gitignore"), "").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();

        let out = list_directory(dir.path()).unwrap();
        assert!(!out.contains("node_modules"));
        assert!(!out.contains(".env"));
        assert!(out.contains(".gitignore"));
        assert!(out.contains("[dir]  src"));
        assert!(out.contains("[file] Cargo.toml"));
    }

    #[test]
    fn empty_directory_message() {
        let dir = TempDir::new().unwrap();
        let out = list_directory(dir.path()).unwrap();
        assert_eq!(out, "(empty directory)");
    }
}
