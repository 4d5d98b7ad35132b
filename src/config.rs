use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the booking agent (chat + admin endpoints).
    pub api_url: String,
    /// Whisper-compatible transcription endpoint used for voice capture.
    pub stt_api_url: String,
    pub stt_api_key: String,
    pub stt_model: String,
    /// Host speech synthesizer command for spoken replies.
    pub tts_command: String,
    /// Preferred synthesizer voice, matched by name (first match wins).
    pub preferred_voice: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            stt_api_url: "https://api.groq.com/openai/v1".to_string(),
            stt_api_key: String::new(),
            stt_model: "whisper-large-v3-turbo".to_string(),
            tts_command: "espeak-ng".to_string(),
            preferred_voice: "english".to_string(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("aura-booking");
        config_dir.join("config.toml")
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        return config.with_env_overrides();
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config: {}. Using defaults.", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config: {}. Using defaults.", e);
                }
            }
        }

        let config = Config::default().with_env_overrides();
        // Save defaults on first run
        let _ = config.save();
        config
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// `AURA_API_URL` overrides the agent address; env keys fill empty fields.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("AURA_API_URL") {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
        if self.stt_api_key.is_empty() {
            if let Ok(key) = std::env::var("GROQ_API_KEY") {
                self.stt_api_key = key;
            }
        }
        self
    }
}
