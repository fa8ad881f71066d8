use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

pub struct Config {
    pub data_dir: PathBuf,
    pub seed: Option<u64>,
    pub firebase_api_key: Option<String>,
    pub google_id_token: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            data_dir: var("JOBSEEKER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            seed: var("JOBSEEKER_SEED").and_then(|raw| match raw.parse() {
                Ok(seed) => Some(seed),
                Err(e) => {
                    warn!("Invalid JOBSEEKER_SEED value '{raw}': {e}, catalog will be random");
                    None
                }
            }),
            firebase_api_key: var("FIREBASE_API_KEY"),
            google_id_token: var("GOOGLE_ID_TOKEN"),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("jobseeker.db")
    }
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            info!("{key} not set");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory, or the current directory as a fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobseeker") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
