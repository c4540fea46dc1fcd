use async_openai::error::OpenAIError;
// Import necessary libraries and modules for API interaction, file I/O, and serialization.
use async_openai::{Client, config::OpenAIConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "STUDY_MASTER_DATA";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// Define a structure to hold application settings. Every field falls back to
// its default so older settings files keep loading.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub language: String,               // Preferred narration language.
    pub openai_api_key: Option<String>, // Optional API key for OpenAI services.
    pub model: String,
    pub study_mode: bool, // Gate dice rolls behind study checks.
    pub debug_mode: bool, // Verbose logging.
    pub auto_save: bool,
    pub auto_save_interval: u64, // Minutes between automatic saves.
    pub max_context_length: usize,
    pub theme: String,
    pub font_size: String,
    pub sound_effects: bool,
    pub dice_animations: bool,
}

// Implement the Default trait for Settings to provide a method to create default settings.
impl Default for Settings {
    fn default() -> Self {
        Settings {
            language: "English".to_string(),
            openai_api_key: None, // No API key by default.
            model: "gpt-4o-mini".to_string(),
            study_mode: true,
            debug_mode: false,
            auto_save: true,
            auto_save_interval: 5,
            max_context_length: 10000,
            theme: "dark".to_string(),
            font_size: "medium".to_string(),
            sound_effects: true,
            dice_animations: true,
        }
    }
}

// Root of everything the application writes: settings, saves and logs.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dir::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("study_master")
        .join("data")
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

// Additional implementation block for Settings.
impl Settings {
    // Constructor function to create new settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    // Load settings from the default file path.
    pub fn load() -> io::Result<Self> {
        Self::load_settings_from_file(default_settings_path())
    }

    // Save current settings to the default file path.
    pub fn save(&self) -> io::Result<()> {
        self.save_to_file(default_settings_path())
    }

    // Load settings from a specified file path.
    pub fn load_settings_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?; // Read settings from file.
        let settings = serde_json::from_str(&data)?; // Deserialize JSON data into settings.
        Ok(settings)
    }

    // Save current settings to a specified file path.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?; // Serialize settings into pretty JSON format.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?; // Create the directory if it doesn't exist.
        }
        let mut file = fs::File::create(path)?; // Create or overwrite the file.
        file.write_all(data.as_bytes())?; // Write the serialized data to the file.
        Ok(())
    }

    // The configured key, or the environment's when none is stored.
    pub fn api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn toggle_study_mode(&mut self) -> bool {
        self.study_mode = !self.study_mode;
        self.study_mode
    }

    pub fn toggle_debug_mode(&mut self) -> bool {
        self.debug_mode = !self.debug_mode;
        self.debug_mode
    }

    // Back to defaults, keeping the API key.
    pub fn reset(&mut self) {
        let api_key = self.openai_api_key.take();
        *self = Settings {
            openai_api_key: api_key,
            ..Settings::default()
        };
    }

    // Asynchronously validate an API key with OpenAI's services.
    pub async fn validate_api_key(api_key: &str) -> bool {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key)); // Configure the OpenAI client with the API key.
        match client.models().list().await {
            Ok(_) => true,
            Err(OpenAIError::Reqwest(e)) => {
                log::error!("Please verify your internet connection. Error: {e}");
                false
            }
            Err(e) => {
                log::warn!("API key rejected: {e}");
                false
            }
        }
    }
}
