use std::path::Path;
use std::sync::LazyLock;

use docbot_types::model::{Citation, EnvVar, FileExtraction, PublicSymbol, RaisedError};
use regex::Regex;

use crate::traits::Extractor;

static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(async\s+def|def)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(\(.*)").unwrap());
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(\(.*)?:?").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))").unwrap());
static ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"os\.(?:environ\.get|getenv)\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["'](?:\s*,\s*([^)]+))?\)|os\.environ\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
    )
    .unwrap()
});
static RAISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^raise\s+([A-Za-z_][A-Za-z0-9_.]*)\s*(\((.*)\))?").unwrap());

/// Regex-driven stand-in for a Python AST walk: good enough to recover
/// module-level defs, classes, imports, `os.getenv` reads and `raise`
/// sites without a real parser.
pub struct PythonExtractor;

impl Extractor for PythonExtractor {
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

        let lines: Vec<&str> = text.lines().collect();
        let mut symbols = Vec::new();
        let mut imports = Vec::new();
        let mut env_vars = Vec::new();
        let mut errors = Vec::new();

        for (idx, raw_line) in lines.iter().enumerate() {
            let indent = raw_line.len() - raw_line.trim_start().len();
            let line = raw_line.trim();
            let lineno = (idx + 1) as u32;

            if indent == 0 {
                if let Some(caps) = DEF_RE.captures(line) {
                    let name = caps.get(2).unwrap().as_str().to_string();
                    if !name.starts_with('_') {
                        let signature = signature_span(&lines, idx);
                        let docstring = first_line_docstring(&lines, idx);
                        if let Ok(citation) = Citation::new(rel_path, Some(name.clone()), lineno, lineno) {
                            symbols.push(PublicSymbol {
                                name,
                                kind: "function".to_string(),
                                signature: Some(signature),
                                docstring,
                                citation,
                            });
                        }
                    }
                } else if let Some(caps) = CLASS_RE.captures(line) {
                    let name = caps.get(1).unwrap().as_str().to_string();
                    if !name.starts_with('_') {
                        let signature = signature_span(&lines, idx);
                        let docstring = first_line_docstring(&lines, idx);
                        if let Ok(citation) = Citation::new(rel_path, Some(name.clone()), lineno, lineno) {
                            symbols.push(PublicSymbol {
                                name,
                                kind: "class".to_string(),
                                signature: Some(signature),
                                docstring,
                                citation,
                            });
                        }
                    }
                } else if let Some(caps) = IMPORT_RE.captures(line) {
                    let module = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str().to_string());
                    if let Some(module) = module {
                        imports.push(module);
                    }
                }
            }

            for caps in ENV_RE.captures_iter(line) {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str().to_string());
                if let Some(name) = name {
                    let default = caps.get(2).map(|m| m.as_str().trim().to_string());
                    if let Ok(citation) = Citation::new(rel_path, None, lineno, lineno) {
                        env_vars.push(EnvVar {
                            name,
                            default,
                            citation,
                        });
                    }
                }
            }

            if let Some(caps) = RAISE_RE.captures(line) {
                let error_type = caps.get(1).unwrap().as_str().to_string();
                let context = caps.get(3).map(|m| m.as_str().trim().to_string());
                if let Ok(citation) = Citation::new(rel_path, None, lineno, lineno) {
                    errors.push(RaisedError {
                        error_type,
                        context: context.filter(|c| !c.is_empty()),
                        citation,
                    });
                }
            }
        }

        imports.sort();
        imports.dedup();

        FileExtraction {
            path: rel_path.to_string(),
            language: language.to_string(),
            symbols,
            imports,
            env_vars,
            errors,
            loc: lines.len() as u32,
        }
    }
}

/// Joins a `def`/`class` header across its continuation lines, up to the
/// line that closes the parenthesis (or the colon, for a bare `class X:`).
fn signature_span(lines: &[&str], start: usize) -> String {
    let mut depth = 0i32;
    let mut buf = String::new();
    for line in lines.iter().skip(start).take(8) {
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(line.trim());
        depth += line.matches('(').count() as i32 - line.matches(')').count() as i32;
        if depth <= 0 {
            break;
        }
    }
    buf.trim_end_matches(':').to_string()
}

fn first_line_docstring(lines: &[&str], def_idx: usize) -> Option<String> {
    let mut idx = def_idx + 1;
    while idx < lines.len() {
        let line = lines[idx].trim();
        if line.is_empty() {
            idx += 1;
            continue;
        }
        if let Some(stripped) = line
            .strip_prefix("\"\"\"")
            .or_else(|| line.strip_prefix("'''"))
        {
            let stripped = stripped
                .trim_end_matches("\"\"\"")
                .trim_end_matches("'''")
                .trim();
            if stripped.is_empty() {
                return None;
            }
            return Some(stripped.to_string());
        }
        return None;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extracts_public_def_and_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.py");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "import os\n\ndef login(user):\n    \"\"\"Authenticate a user.\"\"\"\n    token = os.getenv(\"AUTH_TOKEN\", \"dev\")\n    return token\n"
        )
        .unwrap();

        let extraction = PythonExtractor.extract(&path, "mod.py", "python");
        assert_eq!(extraction.symbols.len(), 1);
        assert_eq!(extraction.symbols[0].name, "login");
        assert_eq!(extraction.symbols[0].docstring.as_deref(), Some("Authenticate a user."));
        assert_eq!(extraction.imports, vec!["os".to_string()]);
        assert_eq!(extraction.env_vars.len(), 1);
        assert_eq!(extraction.env_vars[0].name, "AUTH_TOKEN");
    }

    #[test]
    fn skips_private_defs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.py");
        std::fs::write(&path, "def _helper():\n    pass\n").unwrap();
        let extraction = PythonExtractor.extract(&path, "mod.py", "python");
        assert!(extraction.symbols.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_extraction_not_panic() {
        let extraction = PythonExtractor.extract(Path::new("/no/such/file.py"), "mod.py", "python");
        assert_eq!(extraction.loc, 0);
        assert!(extraction.symbols.is_empty());
    }
}
