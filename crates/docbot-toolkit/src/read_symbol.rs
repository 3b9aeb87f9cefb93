//! `read_symbol` tool: a narrower view than `read_file` — the exact lines
//! backing one [`PublicSymbol`] citation, plus its signature/docstring.

use std::path::Path;

use docbot_types::model::PublicSymbol;

const MAX_SYMBOL_CHARS: usize = 4_000;

/// Find `name` among `symbols` restricted to `file`, slice its citation's
/// line range out of the file on disk, and format it for the agent.
pub fn read_symbol(
    abs_repo_file: &Path,
    file: &str,
    name: &str,
    symbols: &[PublicSymbol],
) -> Result<String, String> {
    let symbol = symbols
        .iter()
        .find(|s| s.citation.file == file && s.name == name)
        .ok_or_else(|| format!("Error: no public symbol named '{name}' in '{file}'"))?;

    let contents = std::fs::read_to_string(abs_repo_file)
        .map_err(|e| format!("Error: could not read '{file}': {e}"))?;
    let lines: Vec<&str> = contents.lines().collect();

    let start = symbol.citation.line_start.saturating_sub(1) as usize;
    let end = (symbol.citation.line_end as usize).min(lines.len());
    let slice = if start < end {
        lines[start..end].join("\n")
    } else {
        String::new()
    };

    let mut out = String::new();
    if let Some(sig) = &symbol.signature {
        out.push_str(&format!("signature: {sig}\n"));
    }
    if let Some(doc) = &symbol.docstring {
        out.push_str(&format!("docstring: {doc}\n"));
    }
    out.push_str(&format!("=== {file}:{name} ===\n"));

    let body = if slice.chars().count() > MAX_SYMBOL_CHARS {
        let truncated: String = slice.chars().take(MAX_SYMBOL_CHARS).collect();
        format!("{truncated}\n... (symbol truncated)")
    } else {
        slice
    };
    out.push_str(&body);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_types::model::Citation;
    use tempfile::TempDir;

    fn symbol(file: &str, name: &str, start: u32, end: u32) -> PublicSymbol {
        PublicSymbol {
            name: name.into(),
            kind: "function".into(),
            signature: Some(format!("fn {name}()")),
            docstring: None,
            citation: Citation::new(file, Some(name.into()), start, end).unwrap(),
        }
    }

    #[test]
    fn slices_requested_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "line1\nline2\nline3\nline4\n").unwrap();
        let symbols = vec![symbol("lib.rs", "thing", 2, 3)];
        let out = read_symbol(&path, "lib.rs", "thing", &symbols).unwrap();
        assert!(out.contains("line2\nline3"));
        assert!(!out.contains("line1"));
        assert!(!out.contains("line4"));
    }

    #[test]
    fn missing_symbol_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "line1\n").unwrap();
        let err = read_symbol(&path, "lib.rs", "nope", &[]).unwrap_err();
        assert!(err.contains("no public symbol"));
    }
}
