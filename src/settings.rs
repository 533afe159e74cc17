//! Player settings and preferences
//!
//! Persisted separately from the best score in LocalStorage.

use serde::{Deserialize, Serialize};

/// Spawn-rate difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Chill,
    #[default]
    Normal,
    Turbo,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Chill => "chill",
            Difficulty::Normal => "normal",
            Difficulty::Turbo => "turbo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chill" => Some(Difficulty::Chill),
            "normal" => Some(Difficulty::Normal),
            "turbo" => Some(Difficulty::Turbo),
            _ => None,
        }
    }

    /// Spawn cadence for this difficulty. Also the token lifetime.
    pub fn spawn_interval_ms(&self) -> u64 {
        match self {
            Difficulty::Chill => 1050,
            Difficulty::Normal => 850,
            Difficulty::Turbo => 650,
        }
    }
}

/// Visual themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Sky,
    Desert,
    Ocean,
    Neon,
}

impl Theme {
    /// CSS class applied to the document body
    pub fn css_class(&self) -> &'static str {
        match self {
            Theme::Sky => "theme-sky",
            Theme::Desert => "theme-desert",
            Theme::Ocean => "theme-ocean",
            Theme::Neon => "theme-neon",
        }
    }

    pub fn from_css_class(s: &str) -> Option<Self> {
        match s {
            "theme-sky" => Some(Theme::Sky),
            "theme-desert" => Some(Theme::Desert),
            "theme-ocean" => Some(Theme::Ocean),
            "theme-neon" => Some(Theme::Neon),
            _ => None,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Spawn-rate difficulty (applies from the next round)
    pub difficulty: Difficulty,
    /// Visual theme
    pub theme: Theme,
    /// Minimize shake, flashes, confetti
    pub reduced_motion: bool,
    /// Mute all sound effects
    pub muted: bool,
}

impl Settings {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "wq_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
