use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use docbot_types::model::SourceFile;

/// Directories pruned from every walk, regardless of language:
/// VCS metadata, virtualenvs, build/cache output, and vendored deps.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "__pycache__",
    "dist",
    "build",
    ".tox",
    ".eggs",
    "node_modules",
    ".mypy_cache",
    ".pytest_cache",
    "target",
    "bin",
    "obj",
    ".gradle",
    ".next",
    ".nuxt",
    "vendor",
    "pkg",
    ".cargo",
    "Pods",
    ".build",
    "coverage",
    ".cache",
];

/// Basenames that mark a file as a language entrypoint.
pub const ENTRYPOINT_NAMES: &[(&str, &str)] = &[
    ("main.py", "python"),
    ("app.py", "python"),
    ("server.py", "python"),
    ("cli.py", "python"),
    ("__main__.py", "python"),
    ("wsgi.py", "python"),
    ("asgi.py", "python"),
    ("main.go", "go"),
    ("main.rs", "rust"),
    ("lib.rs", "rust"),
    ("Main.java", "java"),
    ("Application.java", "java"),
    ("App.java", "java"),
    ("Main.kt", "kotlin"),
    ("Application.kt", "kotlin"),
    ("index.js", "javascript"),
    ("index.ts", "typescript"),
    ("index.tsx", "typescript"),
    ("server.js", "javascript"),
    ("server.ts", "typescript"),
    ("app.js", "javascript"),
    ("app.ts", "typescript"),
    ("main.rb", "ruby"),
    ("Program.cs", "csharp"),
    ("main.swift", "swift"),
    ("main.c", "c"),
    ("main.cpp", "cpp"),
];

/// Basenames that mark a directory as a package/module root, and the
/// language they signal (used to seed `ScanResult::packages`).
const PACKAGE_MARKERS: &[(&str, &str)] = &[
    ("__init__.py", "python"),
    ("package.json", "javascript"),
    ("go.mod", "go"),
    ("Cargo.toml", "rust"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("build.gradle.kts", "kotlin"),
    ("Package.swift", "swift"),
    ("Gemfile", "ruby"),
];

/// Extension -> language name.
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    (".py", "python"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".go", "go"),
    (".rs", "rust"),
    (".java", "java"),
    (".kt", "kotlin"),
    (".cs", "csharp"),
    (".swift", "swift"),
    (".rb", "ruby"),
    (".cpp", "cpp"),
    (".c", "c"),
    (".h", "c"),
    (".hpp", "cpp"),
];

fn language_for_extension(ext: &str) -> Option<&'static str> {
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

pub fn entrypoint_language(fname: &str) -> Option<&'static str> {
    ENTRYPOINT_NAMES
        .iter()
        .find(|(n, _)| *n == fname)
        .map(|(_, lang)| *lang)
}

fn package_marker_language(fname: &str) -> Option<&'static str> {
    PACKAGE_MARKERS
        .iter()
        .find(|(n, _)| *n == fname)
        .map(|(_, lang)| *lang)
}

/// Everything the scanner learns about a repository in one pass.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub source_files: Vec<SourceFile>,
    pub packages: Vec<String>,
    pub entrypoints: Vec<String>,
    pub languages: Vec<String>,
}

/// Walk `root`, classifying every recognised source file.
///
/// Returned paths are repo-relative, forward-slash separated. Directories
/// named in [`SKIP_DIRS`] are never descended into.
pub fn scan_repo(root: &Path) -> std::io::Result<ScanResult> {
    let mut source_files = Vec::new();
    let mut packages: BTreeSet<String> = BTreeSet::new();
    let mut entrypoints = Vec::new();
    let mut languages: BTreeSet<String> = BTreeSet::new();

    walk(root, root, &mut |rel_dir, fname, abs_path| {
        let ext = Path::new(fname)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let rel_path = if rel_dir.is_empty() {
            fname.to_string()
        } else {
            format!("{rel_dir}/{fname}")
        };

        let is_entrypoint = entrypoint_language(fname).is_some();

        if let Some(language) = language_for_extension(&ext) {
            let size_bytes = std::fs::metadata(abs_path).map(|m| m.len()).unwrap_or(0);
            source_files.push(SourceFile {
                path: rel_path.clone(),
                language: language.to_string(),
                size_bytes,
                is_entrypoint,
            });
            languages.insert(language.to_string());
        }

        if fname.ends_with(".csproj") {
            packages.insert(if rel_dir.is_empty() { ".".to_string() } else { rel_dir.to_string() });
        }

        if let Some(pkg_lang) = package_marker_language(fname) {
            if pkg_lang == "python" {
                if !rel_dir.is_empty() {
                    packages.insert(rel_dir.to_string());
                }
            } else {
                packages.insert(if rel_dir.is_empty() { ".".to_string() } else { rel_dir.to_string() });
            }
        }

        if is_entrypoint {
            entrypoints.push(rel_path);
        }
    })?;

    source_files.sort_by(|a, b| a.path.cmp(&b.path));
    entrypoints.sort();

    Ok(ScanResult {
        source_files,
        packages: packages.into_iter().collect(),
        entrypoints,
        languages: languages.into_iter().collect(),
    })
}

fn walk(
    root: &Path,
    dir: &Path,
    on_file: &mut impl FnMut(&str, &str, &Path),
) -> std::io::Result<()> {
    let rel_dir = dir
        .strip_prefix(root)
        .unwrap_or(Path::new(""))
        .to_string_lossy()
        .replace('\\', "/");

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => continue,
        };

        if path.is_dir() {
            if SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            walk(root, &path, on_file)?;
        } else {
            on_file(&rel_dir, &name, &path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_mixed_language_repo_and_prunes_skip_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/leftpad")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        std::fs::write(dir.path().join("node_modules/leftpad/index.js"), "\n").unwrap();

        let result = scan_repo(dir.path()).unwrap();
        assert_eq!(result.source_files.len(), 1);
        assert_eq!(result.source_files[0].path, "src/main.rs");
        assert!(result.source_files[0].is_entrypoint);
        assert_eq!(result.packages, vec![".".to_string()]);
        assert_eq!(result.entrypoints, vec!["src/main.rs".to_string()]);
        assert_eq!(result.languages, vec!["rust".to_string()]);
    }
}
