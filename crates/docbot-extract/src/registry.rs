use std::collections::HashMap;
use std::path::Path;

use docbot_types::model::FileExtraction;

use crate::generic::GenericExtractor;
use crate::python::PythonExtractor;
use crate::traits::Extractor;

/// Language name -> extractor, built once and shared read-only across the
/// whole pipeline run.
///
/// Unknown languages fall back to the generic extractor rather than
/// being skipped outright, so every file contributes at least its
/// imports and env-var reads.
pub struct ExtractorRegistry {
    by_language: HashMap<&'static str, Box<dyn Extractor>>,
    fallback: Box<dyn Extractor>,
}

impl ExtractorRegistry {
    pub fn load() -> Self {
        let mut by_language: HashMap<&'static str, Box<dyn Extractor>> = HashMap::new();
        by_language.insert("python", Box::new(PythonExtractor));

        let languages = by_language.len();
        tracing::info!(languages, "extractor registry loaded");

        Self {
            by_language,
            fallback: Box::new(GenericExtractor),
        }
    }

    pub fn extract(&self, abs_path: &Path, rel_path: &str, language: &str) -> FileExtraction {
        match self.by_language.get(language) {
            Some(extractor) => extractor.extract(abs_path, rel_path, language),
            None => self.fallback.extract(abs_path, rel_path, language),
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.by_language.contains_key(language)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_generic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "host := os.Getenv(\"HOST\")\n").unwrap();

        let registry = ExtractorRegistry::load();
        assert!(!registry.supports("go"));
        let extraction = registry.extract(&path, "main.go", "go");
        assert_eq!(extraction.env_vars[0].name, "HOST");
    }

    #[test]
    fn python_uses_dedicated_extractor() {
        let registry = ExtractorRegistry::load();
        assert!(registry.supports("python"));
    }
}
