use directories::ProjectDirs;
use std::{
    env,
    path::PathBuf,
};

const PROJECT_NAME: &str = "EXPORTER_MERGER";

lazy_static::lazy_static! {
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{PROJECT_NAME}_CONFIG"))
        .ok()
        .map(PathBuf::from);
}

/// `$EXPORTER_MERGER_CONFIG`, else the platform config directory, else `./.config`.
pub fn get_config_dir() -> PathBuf {
    if let Some(folder) = CONFIG_FOLDER.clone() {
        return folder;
    }
    ProjectDirs::from("de", "rebuy", "exporter-merger")
        .map(|dirs| dirs.config_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

pub(crate) fn default_config_file() -> PathBuf {
    get_config_dir().join("config.yaml")
}
