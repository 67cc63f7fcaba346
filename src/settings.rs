//! Player settings and preferences
//!
//! Persisted separately from run state. The simulation only flips the
//! in-memory ad flag; writing it out goes through a `SettingsStore`.

use serde::{Deserialize, Serialize};

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether ads may be shown (false after the player removes ads)
    pub show_ads: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { show_ads: true }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "tilt_roller_settings";

    /// Decode settings, falling back to defaults on bad data
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Encode settings for storage
    pub fn to_json(&self) -> String {
        // A struct of plain bools always serializes
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Durable backing store for settings
pub trait SettingsStore {
    /// Read stored settings, or defaults when nothing is stored
    fn load(&self) -> Settings;
    /// Write settings
    fn save(&mut self, settings: &Settings);
}

/// In-memory store (native builds and tests)
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    json: Option<String>,
    /// Number of writes performed
    pub writes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with raw JSON
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            json: Some(json.into()),
            writes: 0,
        }
    }

    /// Raw stored JSON, if any
    pub fn raw(&self) -> Option<&str> {
        self.json.as_deref()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Settings {
        match &self.json {
            Some(json) => Settings::from_json(json),
            None => Settings::default(),
        }
    }

    fn save(&mut self, settings: &Settings) {
        self.json = Some(settings.to_json());
        self.writes += 1;
        log::debug!("Settings saved to memory");
    }
}

/// LocalStorage-backed store (WASM only)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl SettingsStore for LocalStorageStore {
    fn load(&self) -> Settings {
        if let Some(storage) = Self::storage() {
            if let Ok(Some(json)) = storage.get_item(Settings::STORAGE_KEY) {
                log::info!("Loaded settings from LocalStorage");
                return Settings::from_json(&json);
            }
        }

        log::info!("Using default settings");
        Settings::default()
    }

    fn save(&mut self, settings: &Settings) {
        if let Some(storage) = Self::storage() {
            let _ = storage.set_item(Settings::STORAGE_KEY, &settings.to_json());
            log::info!("Settings saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shows_ads() {
        assert!(Settings::default().show_ads);
        assert!(MemoryStore::new().load().show_ads);
    }

    #[test]
    fn test_memory_store_persists() {
        let mut store = MemoryStore::new();
        store.save(&Settings { show_ads: false });
        assert_eq!(store.writes, 1);
        assert!(!store.load().show_ads);
        assert_eq!(store.raw(), Some(r#"{"show_ads":false}"#));
    }

    #[test]
    fn test_corrupt_settings_fall_back() {
        let store = MemoryStore::with_json("garbage");
        assert_eq!(store.load(), Settings::default());

        let store = MemoryStore::with_json("{}");
        assert!(store.load().show_ads);
    }
}
