use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::narration::VoiceOptions;
use crate::engine::target::Difficulty;
use crate::engine::variant::{GameKind, GridSize, Variant};
use crate::host::AudioSetting;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_game")]
    pub game: String,
    #[serde(default)]
    pub audio: AudioSetting,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_grid_side")]
    pub grid_side: usize,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_speech_pitch")]
    pub speech_pitch: f32,
    #[serde(default)]
    pub speech_language: Option<String>,
    #[serde(default = "default_progress_dir")]
    pub progress_dir: String,
}

fn default_game() -> String {
    "colors".to_string()
}
fn default_grid_side() -> usize {
    4
}
fn default_speech_rate() -> f32 {
    0.9
}
fn default_speech_pitch() -> f32 {
    1.1
}
fn default_progress_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poptap")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: default_game(),
            audio: AudioSetting::default(),
            difficulty: Difficulty::default(),
            grid_side: default_grid_side(),
            speech_rate: default_speech_rate(),
            speech_pitch: default_speech_pitch(),
            speech_language: None,
            progress_dir: default_progress_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("poptap")
            .join("config.toml")
    }

    /// Unknown game names fall back to the default rather than failing.
    pub fn game_kind(&self) -> GameKind {
        GameKind::from_name(&self.game).unwrap_or(GameKind::Colors)
    }

    pub fn grid(&self) -> GridSize {
        GridSize::from_side(self.grid_side).unwrap_or(GridSize::Four)
    }

    pub fn voice(&self) -> VoiceOptions {
        VoiceOptions {
            rate: self.speech_rate.clamp(0.1, 2.0),
            pitch: self.speech_pitch.clamp(0.5, 2.0),
            language: self.speech_language.clone(),
        }
    }

    pub fn variant(&self) -> Variant {
        Variant::preset(self.game_kind(), self.difficulty, self.grid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.game, "colors");
        assert_eq!(config.audio, AudioSetting::Full);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.grid_side, 4);
        assert!(config.progress_dir.contains("poptap"));
    }

    #[test]
    fn test_config_partial_file() {
        let toml_str = r#"
game = "math"
audio = "noSpeech"
difficulty = "hard"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.game_kind(), GameKind::Math);
        assert_eq!(config.audio, AudioSetting::NoSpeech);
        assert_eq!(config.variant().difficulty, Difficulty::Hard);
        assert_eq!(config.speech_rate, 0.9);
    }

    #[test]
    fn test_unknown_game_and_grid_fall_back() {
        let config = Config {
            game: "chess".to_string(),
            grid_side: 7,
            ..Config::default()
        };
        assert_eq!(config.game_kind(), GameKind::Colors);
        assert_eq!(config.grid(), GridSize::Four);
    }

    #[test]
    fn test_voice_clamps_out_of_range_values() {
        let config = Config {
            speech_rate: 9.0,
            speech_pitch: 0.0,
            ..Config::default()
        };
        let voice = config.voice();
        assert_eq!(voice.rate, 2.0);
        assert_eq!(voice.pitch, 0.5);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            game: "letters".to_string(),
            audio: AudioSetting::Mute,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.game, "letters");
        assert_eq!(loaded.audio, AudioSetting::Mute);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.game, "colors");
    }
}
