use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::app::*;

pub const DEFAULT_DATA_FILE: &str = "voting_data.json";
pub const DEFAULT_PASSWORD_FILE: &str = "admin_password.json";
pub const DEFAULT_LOG_FILE: &str = "voting_log.txt";

/// The optional JSON settings file.
///
/// All the fields are optional. Relative file names are resolved against the data directory,
/// which is itself resolved against the current directory.
///
/// ```json
/// {
///   "dataDir": "/var/lib/ballotbox",
///   "dataFile": "voting_data.json",
///   "passwordFile": "admin_password.json",
///   "logFile": "voting_log.txt"
/// }
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "dataDir")]
    pub data_dir: Option<String>,
    #[serde(rename = "dataFile")]
    pub data_file: Option<String>,
    #[serde(rename = "passwordFile")]
    pub password_file: Option<String>,
    #[serde(rename = "logFile")]
    pub log_file: Option<String>,
}

/// The resolved locations of the three data files.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub data_path: PathBuf,
    pub password_path: PathBuf,
    pub log_path: PathBuf,
}

impl Settings {
    /// The default file names inside the given directory.
    pub fn in_dir(dir: &Path) -> Settings {
        Settings::from_file(dir, &SettingsFile::default())
    }

    fn from_file(dir: &Path, sf: &SettingsFile) -> Settings {
        let locate = |name: &Option<String>, default: &str| -> PathBuf {
            dir.join(name.as_deref().unwrap_or(default))
        };
        Settings {
            data_path: locate(&sf.data_file, DEFAULT_DATA_FILE),
            password_path: locate(&sf.password_file, DEFAULT_PASSWORD_FILE),
            log_path: locate(&sf.log_file, DEFAULT_LOG_FILE),
        }
    }

    /// Combines the settings file (if any) with the data directory given on the command line.
    /// The command line wins.
    pub fn resolve(config_path: Option<&str>, data_dir: Option<&str>) -> AppResult<Settings> {
        let sf = match config_path {
            Some(p) => read_settings_file(p)?,
            None => SettingsFile::default(),
        };
        let dir: PathBuf = match (data_dir, sf.data_dir.as_deref()) {
            (Some(d), _) => PathBuf::from(d),
            (None, Some(d)) => PathBuf::from(d),
            (None, None) => PathBuf::from("."),
        };
        let settings = Settings::from_file(&dir, &sf);
        debug!("resolve: {:?}", settings);
        Ok(settings)
    }
}

pub fn read_settings_file(path: &str) -> AppResult<SettingsFile> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let sf: SettingsFile = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    Ok(sf)
}
