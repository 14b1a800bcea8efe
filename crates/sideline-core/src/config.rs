use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::errors::SidelineError;

fn default_api_base_url() -> String {
    "https://api.videosdk.live".to_string()
}

/// Client configuration, constructed explicitly and passed in at app start.
///
/// There is no ambient module-level token; everything that needs the auth
/// token takes a config.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl ClientConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Self::default()
        }
    }

    /// A config without an auth token cannot start any flow.
    pub fn ensure_auth(&self) -> Result<(), SidelineError> {
        if self.auth_token.trim().is_empty() {
            Err(SidelineError::Auth("missing auth token".to_string()))
        } else {
            Ok(())
        }
    }
}

pub struct ConfigStore {
    config: Mutex<ClientConfig>,
    file_path: PathBuf,
}

impl ConfigStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("config.json");
        let config = Self::load(&file_path);
        Self {
            config: Mutex::new(config),
            file_path,
        }
    }

    pub fn get(&self) -> ClientConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn set_auth_token(&self, token: String) {
        self.config.lock().unwrap().auth_token = token;
        self.save();
    }

    pub fn set_api_base_url(&self, url: String) {
        self.config.lock().unwrap().api_base_url = url;
        self.save();
    }

    fn save(&self) {
        let config = self.config.lock().unwrap().clone();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&config) {
            let _ = std::fs::write(&self.file_path, json);
        }
    }

    fn load(path: &PathBuf) -> ClientConfig {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => ClientConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_default_config() {
        let c = ClientConfig::default();
        assert!(c.auth_token.is_empty());
        assert_eq!(c.api_base_url, "https://api.videosdk.live");
    }

    #[test]
    fn test_ensure_auth() {
        assert!(ClientConfig::default().ensure_auth().is_err());
        assert!(ClientConfig::new("   ").ensure_auth().is_err());
        assert!(ClientConfig::new("tok").ensure_auth().is_ok());
    }

    #[test]
    fn test_new_creates_defaults_when_no_file() {
        let dir = temp_dir();
        let store = ConfigStore::new(dir.path().to_str().unwrap());
        assert_eq!(store.get(), ClientConfig::default());
    }

    #[test]
    fn test_set_auth_token_persists() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        {
            let store = ConfigStore::new(path);
            store.set_auth_token("tok-123".to_string());
        }
        let store = ConfigStore::new(path);
        assert_eq!(store.get().auth_token, "tok-123");
    }

    #[test]
    fn test_set_api_base_url_persists() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        {
            let store = ConfigStore::new(path);
            store.set_api_base_url("https://rooms.example.com".to_string());
        }
        let store = ConfigStore::new(path);
        assert_eq!(store.get().api_base_url, "https://rooms.example.com");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        fs::write(dir.path().join("config.json"), "not json!!!").unwrap();
        let store = ConfigStore::new(path);
        assert_eq!(store.get(), ClientConfig::default());
    }

    #[test]
    fn test_partial_json_uses_serde_defaults() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"auth_token":"tok"}"#,
        )
        .unwrap();
        let store = ConfigStore::new(path);
        let c = store.get();
        assert_eq!(c.auth_token, "tok");
        assert_eq!(c.api_base_url, "https://api.videosdk.live");
    }
}
