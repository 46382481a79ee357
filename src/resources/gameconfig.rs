//! Game configuration resource.
//!
//! Settings loaded from an INI file next to the executable. Every value has a
//! default, so a missing file or a missing key never stops the game.
//!
//! # Configuration File Format
//!
//! ```ini
//! [window]
//! width = 800
//! height = 600
//! target_fps = 60
//! title = My Game
//!
//! [game]
//! start_room = Rooms\main_room.json
//! container_extension = win
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::{Path, PathBuf};

const DEFAULT_WINDOW_WIDTH: u32 = 800;
const DEFAULT_WINDOW_HEIGHT: u32 = 600;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_TITLE: &str = "roompack";
const DEFAULT_START_ROOM: &str = "Rooms\\main_room.json";
const DEFAULT_CONTAINER_EXTENSION: &str = "win";
pub const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Game configuration resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
    /// Target frames per second.
    pub target_fps: u32,
    /// Window title.
    pub title: String,
    /// Room loaded right after the container is opened.
    pub start_room: String,
    /// Extension offered by the container file picker, without the dot.
    pub container_extension: String,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            title: DEFAULT_TITLE.to_string(),
            start_room: DEFAULT_START_ROOM.to_string(),
            container_extension: DEFAULT_CONTAINER_EXTENSION.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text instead of a file.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [window] section
        if let Some(width) = config.getuint("window", "width").ok().flatten() {
            self.window_width = width as u32;
        }
        if let Some(height) = config.getuint("window", "height").ok().flatten() {
            self.window_height = height as u32;
        }
        if let Some(fps) = config.getuint("window", "target_fps").ok().flatten() {
            self.target_fps = fps as u32;
        }
        if let Some(title) = config.get("window", "title") {
            self.title = title;
        }

        // [game] section
        if let Some(room) = config.get("game", "start_room") {
            self.start_room = room;
        }
        if let Some(ext) = config.get("game", "container_extension") {
            self.container_extension = ext.trim_start_matches('.').to_string();
        }

        info!(
            "Loaded config: {}x{} window, fps={}, start_room='{}', extension='{}'",
            self.window_width,
            self.window_height,
            self.target_fps,
            self.start_room,
            self.container_extension
        );
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the window size.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::new();
        assert_eq!(config.window_size(), (800, 600));
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.start_room, "Rooms\\main_room.json");
        assert_eq!(config.container_extension, "win");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut config = GameConfig::new();
        config
            .load_from_str("[window]\nwidth = 1024\n\n[game]\ncontainer_extension = .pak\n")
            .unwrap();
        assert_eq!(config.window_size(), (1024, 600));
        assert_eq!(config.container_extension, "pak");
        assert_eq!(config.start_room, "Rooms\\main_room.json");
    }

    #[test]
    fn test_start_room_keeps_backslashes() {
        let mut config = GameConfig::new();
        config
            .load_from_str("[game]\nstart_room = Rooms\\intro.json\n")
            .unwrap();
        assert_eq!(config.start_room, "Rooms\\intro.json");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut config = GameConfig::with_path("./definitely/not/here.ini");
        assert!(config.load_from_file().is_err());
        assert_eq!(config, GameConfig::with_path("./definitely/not/here.ini"));
    }
}
