//! User configuration, read from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculator::DEFAULT_SPEAK_PREFIX;
use crate::history::FileHistory;
use crate::voice::{PhraseRule, PhraseTable};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub display: DisplayConfig,
    pub voice: VoiceConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record evaluations.
    pub enabled: bool,
    /// History file; defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show results with thousand separators.
    pub group_digits: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub speak_prefix: String,
    /// Rules applied before the built-in phrase table.
    pub extra_phrases: Vec<PhraseRule>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speak_prefix: DEFAULT_SPEAK_PREFIX.to_string(),
            extra_phrases: Vec::new(),
        }
    }
}

impl Config {
    /// `<config dir>/simplecalc/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("simplecalc").join("config.toml"))
    }

    /// Load from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Where history is stored, if anywhere.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(FileHistory::default_path)
    }

    /// Built-in phrases with the configured extras in front.
    pub fn phrase_table(&self) -> PhraseTable {
        PhraseTable::builtin().with_extra(self.voice.extra_phrases.iter().cloned())
    }
}
