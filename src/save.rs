use crate::character::CharacterSheet;
use crate::error::SaveError;
use crate::game_state::GameState;
use crate::message::ChatHistory;
use crate::settings::data_dir;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{create_dir_all, read_dir, read_to_string, remove_file, write};
use std::path::{Path, PathBuf};

pub fn default_save_dir() -> PathBuf {
    data_dir().join("saves")
}

/// Whole-game snapshot as written to disk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub character_state: CharacterSheet,
    pub game_state: GameState,
    #[serde(default)]
    pub chat_state: ChatHistory,
}

impl GameSnapshot {
    /// Reject blobs that do not look like a saved game before decoding them.
    pub fn from_value(value: Value) -> Result<Self, SaveError> {
        let object = value
            .as_object()
            .ok_or_else(|| SaveError::MalformedSnapshot("expected a JSON object".to_string()))?;
        for key in ["characterState", "gameState"] {
            match object.get(key) {
                Some(Value::Object(_)) => {}
                Some(_) => {
                    return Err(SaveError::MalformedSnapshot(format!(
                        "`{key}` must be an object"
                    )));
                }
                None => {
                    return Err(SaveError::MalformedSnapshot(format!("missing `{key}`")));
                }
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Clone, Debug)]
pub struct SaveManager {
    save_dir: PathBuf,
    pub available_saves: Vec<String>,
}

impl Default for SaveManager {
    fn default() -> Self {
        Self::new(default_save_dir())
    }
}

impl SaveManager {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        let save_dir = save_dir.into();
        Self {
            available_saves: Self::scan_save_files(&save_dir),
            save_dir,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn scan_save_files(save_dir: &Path) -> Vec<String> {
        let Ok(entries) = read_dir(save_dir) else {
            return Vec::new();
        };

        let mut saves: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.is_file() && path.extension()? == "json" {
                    path.file_stem()?.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();
        saves.sort();
        saves
    }

    pub fn refresh(&mut self) -> &[String] {
        self.available_saves = Self::scan_save_files(&self.save_dir);
        &self.available_saves
    }

    fn path_for(&self, save_name: &str) -> Result<PathBuf, SaveError> {
        let valid = !save_name.trim().is_empty()
            && !save_name.contains(['/', '\\'])
            && save_name != "."
            && save_name != "..";
        if !valid {
            return Err(SaveError::InvalidName(save_name.to_string()));
        }
        Ok(self.save_dir.join(format!("{save_name}.json")))
    }

    pub fn save(&mut self, save_name: &str, snapshot: &GameSnapshot) -> Result<PathBuf, SaveError> {
        let path = self.path_for(save_name)?;
        create_dir_all(&self.save_dir)?;
        let serialized = serde_json::to_string_pretty(snapshot)?;
        write(&path, serialized)?;
        self.refresh();
        log::info!("Saved game to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, save_name: &str) -> Result<GameSnapshot, SaveError> {
        let path = self.path_for(save_name)?;
        if !path.is_file() {
            return Err(SaveError::NotFound(save_name.to_string()));
        }
        let data = read_to_string(&path)?;
        let value: Value = serde_json::from_str(&data)?;
        let snapshot = GameSnapshot::from_value(value)?;
        log::info!("Loaded game from {}", path.display());
        Ok(snapshot)
    }

    pub fn delete_save(&mut self, save_name: &str) -> Result<(), SaveError> {
        let path = self.path_for(save_name)?;
        remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SaveError::NotFound(save_name.to_string()),
            _ => SaveError::IO(e),
        })?;
        self.refresh();
        Ok(())
    }
}
