use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use tagqa_engine::ArtifactWriter;

const PREFS_FILENAME: &str = ".tagqa_prefs.ron";

/// Operator choices remembered between launches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct Preferences {
    /// Folder holding `Tag_QA_Files`.
    #[serde(default)]
    pub workspace_parent: Option<PathBuf>,
    #[serde(default)]
    pub last_session: Option<PathBuf>,
}

pub(crate) fn load_preferences(config_dir: &Path) -> Preferences {
    let path = config_dir.join(PREFS_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Preferences::default();
        }
        Err(err) => {
            engine_warn!("Failed to read preferences from {:?}: {}", path, err);
            return Preferences::default();
        }
    };

    match ron::from_str(&content) {
        Ok(prefs) => {
            engine_info!("Loaded preferences from {:?}", path);
            prefs
        }
        Err(err) => {
            engine_warn!("Failed to parse preferences from {:?}: {}", path, err);
            Preferences::default()
        }
    }
}

pub(crate) fn save_preferences(config_dir: &Path, prefs: &Preferences) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(prefs, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize preferences: {}", err);
            return;
        }
    };

    let writer = ArtifactWriter::new(config_dir.to_path_buf());
    if let Err(err) = writer.replace(PREFS_FILENAME, content.as_bytes()) {
        engine_error!("Failed to write preferences to {:?}: {}", config_dir, err);
    }
}
