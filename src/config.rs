use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::arena::GameSettings;
use crate::difficulty::{InterferenceDifficulty, StroopMode, Tier, MAX_GRID_LEVEL};
use crate::games::{MemorySettings, SchulteSettings};
use crate::trial::{ContentType, MemoryMode};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sound_enabled: bool,
    /// 0-based index into the grid level table.
    pub schulte_level: usize,
    /// Keep going through every larger grid after the first.
    pub schulte_marathon: bool,
    pub schulte_content: ContentType,
    pub stroop_mode: StroopMode,
    pub stroop_questions: u32,
    /// Seconds per question, 0 for unlimited.
    pub stroop_time_limit: u32,
    pub stroop_tier: Tier,
    pub memory_mode: MemoryMode,
}

impl Default for Config {
    fn default() -> Self {
        let stroop = InterferenceDifficulty::default();
        Self {
            sound_enabled: true,
            schulte_level: 0,
            schulte_marathon: false,
            schulte_content: ContentType::Number,
            stroop_mode: stroop.mode,
            stroop_questions: stroop.question_count,
            stroop_time_limit: stroop.time_limit_secs,
            stroop_tier: stroop.tier,
            memory_mode: MemoryMode::Visual,
        }
    }
}

impl Config {
    pub fn game_settings(&self) -> GameSettings {
        let level = self.schulte_level.min(MAX_GRID_LEVEL);
        let schulte = if self.schulte_marathon {
            SchulteSettings::marathon(level, self.schulte_content)
        } else {
            SchulteSettings::single(level, self.schulte_content)
        };
        GameSettings {
            schulte,
            interference: InterferenceDifficulty {
                mode: self.stroop_mode,
                question_count: self.stroop_questions,
                time_limit_secs: self.stroop_time_limit,
                tier: self.stroop_tier,
            },
            memory: MemorySettings {
                mode: self.memory_mode,
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("braingym_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable config: {}", e);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            sound_enabled: false,
            schulte_level: 2,
            schulte_marathon: true,
            schulte_content: ContentType::Letter,
            stroop_mode: StroopMode::Reverse,
            stroop_questions: 10,
            stroop_time_limit: 0,
            stroop_tier: Tier::Hard,
            memory_mode: MemoryMode::Digit,
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"memory_mode": "digit"}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.memory_mode, MemoryMode::Digit);
        assert_eq!(cfg.stroop_questions, 20);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn marathon_runs_to_the_largest_grid() {
        let cfg = Config {
            schulte_level: 1,
            schulte_marathon: true,
            ..Config::default()
        };
        let settings = cfg.game_settings();
        assert_eq!(settings.schulte.start_level, 1);
        assert_eq!(settings.schulte.end_level, MAX_GRID_LEVEL);
        assert_eq!(settings.interference.question_count, 20);
    }
}
