//! Load/save for the `.docbot/project_state.json` file: which scope owns
//! each repo-relative path, carried between runs so `docbot update` can
//! diff against it instead of re-scanning from scratch.

use std::path::Path;

use docbot_types::error::{Error, Result};
use docbot_types::model::ProjectState;

const FILE_NAME: &str = "project_state.json";

pub fn load(docbot_dir: &Path) -> Result<ProjectState> {
    let path = docbot_dir.join(FILE_NAME);
    if !path.exists() {
        return Ok(ProjectState::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    serde_json::from_str(&raw).map_err(Error::Json)
}

pub fn save(docbot_dir: &Path, state: &ProjectState) -> Result<()> {
    std::fs::create_dir_all(docbot_dir)?;
    let path = docbot_dir.join(FILE_NAME);
    let tmp = docbot_dir.join(format!("{FILE_NAME}.tmp"));
    let raw = serde_json::to_string_pretty(state).map_err(Error::Json)?;
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let state = load(dir.path()).unwrap();
        assert!(state.scopes.is_empty());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut state = ProjectState::default();
        state.assign_scope("core", "src/lib.rs");
        save(dir.path(), &state).unwrap();
        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.scope_of("src/lib.rs"), Some("core"));
    }
}
