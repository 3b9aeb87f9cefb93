use std::path::Path;
use std::sync::LazyLock;

use docbot_types::model::{Citation, EnvVar, FileExtraction};
use regex::Regex;

use crate::traits::Extractor;

/// Import-statement shapes across the non-Python languages the scanner
/// recognizes. Checked in order; the first match on a line wins.
static IMPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"^import\s+(?:\{[^}]*\}\s+from\s+)?["']([^"']+)["']"#).unwrap(), // js/ts
        Regex::new(r#"^(?:const|let|var)\s+.*=\s*require\(["']([^"']+)["']\)"#).unwrap(), // js require
        Regex::new(r#"^import\s+\(?\s*"([^"]+)"\s*\)?"#).unwrap(), // go
        Regex::new(r#"^\s*"([^"]+)"\s*$"#).unwrap(),                 // go multi-import block entry
        Regex::new(r"^use\s+([\w:]+)").unwrap(),                     // rust
        Regex::new(r"^import\s+([\w.]+)\s*;").unwrap(),              // java/kotlin/dart
        Regex::new(r"^require\s+['\x22]([^'\x22]+)['\x22]").unwrap(),// ruby
        Regex::new(r"^using\s+([\w.]+)\s*;").unwrap(),                // c#
        Regex::new(r#"^#include\s*[<"]([^">]+)[">]"#).unwrap(),      // c/cpp
    ]
});

/// Env-var read patterns across languages: `process.env.X`, `os.Getenv("X")`,
/// `System.getenv("X")`, `ENV["X"]`, `std::env::var("X")`, `getenv("X")`.
static ENV_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"process\.env(?:\.([A-Za-z_][A-Za-z0-9_]*)|\[\s*['\x22]([A-Za-z_][A-Za-z0-9_]*)['\x22]\s*\])").unwrap(),
        Regex::new(r#"os\.Getenv\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*\)"#).unwrap(),
        Regex::new(r#"System\.getenv\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*\)"#).unwrap(),
        Regex::new(r"ENV\[\s*['\x22]([A-Za-z_][A-Za-z0-9_]*)['\x22]\s*\]").unwrap(),
        Regex::new(r#"std::env::var\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*\)"#).unwrap(),
        Regex::new(r#"getenv\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*\)"#).unwrap(),
    ]
});

/// Catch-all extractor for every language the scanner recognizes other
/// than Python: best-effort imports and environment-variable reads by
/// regex, no symbol/docstring extraction (most of these languages need a
/// real parser for that, which this crate deliberately doesn't carry).
pub struct GenericExtractor;

impl Extractor for GenericExtractor {
    fn extract(&self, abs_path: &Path, rel_path: &str, language: &str) -> FileExtraction {
        let text = match std::fs::read_to_string(abs_path) {
            Ok(t) => t,
            Err(_) => {
                return FileExtraction {
                    path: rel_path.to_string(),
                    language: language.to_string(),
                    symbols: Vec::new(),
                    imports: Vec::new(),
                    env_vars: Vec::new(),
                    errors: Vec::new(),
                    loc: 0,
                }
            }
        };

        let mut imports = Vec::new();
        let mut env_vars = Vec::new();
        let lines: Vec<&str> = text.lines().collect();

        for (idx, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            let lineno = (idx + 1) as u32;

            for pattern in IMPORT_PATTERNS.iter() {
                if let Some(caps) = pattern.captures(line) {
                    if let Some(m) = caps.get(1) {
                        imports.push(m.as_str().to_string());
                        break;
                    }
                }
            }

            for pattern in ENV_PATTERNS.iter() {
                for caps in pattern.captures_iter(line) {
                    let name = caps
                        .iter()
                        .skip(1)
                        .flatten()
                        .next()
                        .map(|m| m.as_str().to_string());
                    if let Some(name) = name {
                        if let Ok(citation) = Citation::new(rel_path, None, lineno, lineno) {
                            env_vars.push(EnvVar {
                                name,
                                default: None,
                                citation,
                            });
                        }
                    }
                }
            }
        }

        imports.sort();
        imports.dedup();
        env_vars.sort_by(|a, b| a.name.cmp(&b.name));
        env_vars.dedup_by(|a, b| a.name == b.name);

        FileExtraction {
            path: rel_path.to_string(),
            language: language.to_string(),
            symbols: Vec::new(),
            imports,
            env_vars,
            errors: Vec::new(),
            loc: lines.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_js_import_and_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(
            &path,
            "import express from \"express\";\nconst port = process.env.PORT;\n",
        )
        .unwrap();

        let extraction = GenericExtractor.extract(&path, "app.js", "javascript");
        assert_eq!(extraction.imports, vec!["express".to_string()]);
        assert_eq!(extraction.env_vars.len(), 1);
        assert_eq!(extraction.env_vars[0].name, "PORT");
    }

    #[test]
    fn finds_go_getenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "host := os.Getenv(\"HOST\")\n").unwrap();
        let extraction = GenericExtractor.extract(&path, "main.go", "go");
        assert_eq!(extraction.env_vars[0].name, "HOST");
    }

    #[test]
    fn unreadable_file_returns_empty() {
        let extraction = GenericExtractor.extract(Path::new("/no/such/file.go"), "main.go", "go");
        assert_eq!(extraction.loc, 0);
    }
}
