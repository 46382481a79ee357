//! Font store resource.
//!
//! Fonts reach scripts as raw bytes plus a point size. The first time a text
//! command uses one, raylib rasterizes it at that size and the result is kept
//! under `(real key, point size)`.
//!
//! Note: This is a non-send resource because Raylib fonts must be accessed
//! from the main thread only.

use raylib::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resources::lua_runtime::TextFont;
use crate::resources::media::file_type_of;

type FontKey = (String, u32);

/// Loaded fonts keyed by real resource key and point size.
///
/// This is a non-send resource; use `NonSend<FontStore>` in system parameters.
#[derive(Default)]
pub struct FontStore {
    fonts: FxHashMap<FontKey, Font>,
    failed: FxHashSet<FontKey>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font for `font`, loading it from its bytes if needed.
    ///
    /// Returns `None` when loading fails, now or on an earlier call.
    pub fn get_or_load(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        font: &TextFont,
    ) -> Option<&Font> {
        let size = font.handle.point_size;
        self.get_or_load_with(&font.key, size, || {
            let file_type = file_type_of(&font.key);
            let loaded = rl
                .load_font_from_memory(thread, &file_type, &font.handle.bytes, size as i32, None)
                .map_err(|e| e.to_string())?;
            log::debug!("Loaded font '{}' at {}pt", font.key, size);
            Ok(loaded)
        })
    }

    fn get_or_load_with(
        &mut self,
        key: &str,
        size: u32,
        load: impl FnOnce() -> Result<Font, String>,
    ) -> Option<&Font> {
        let id = (key.to_string(), size);
        if self.failed.contains(&id) {
            return None;
        }
        if !self.fonts.contains_key(&id) {
            match load() {
                Ok(font) => {
                    self.fonts.insert(id.clone(), font);
                }
                Err(e) => {
                    log::error!("Cannot load font '{}' at {}pt: {}", key, size, e);
                    self.failed.insert(id);
                    return None;
                }
            }
        }
        self.fonts.get(&id)
    }

    pub fn get(&self, key: &str, size: u32) -> Option<&Font> {
        self.fonts.get(&(key.to_string(), size))
    }

    /// Whether loading `key` at `size` has failed.
    pub fn has_failed(&self, key: &str, size: u32) -> bool {
        self.failed.contains(&(key.to_string(), size))
    }

    /// Get the number of loaded fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Remove all loaded fonts and forget failures.
    pub fn clear(&mut self) {
        self.fonts.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_are_per_size_and_not_retried() {
        let mut store = FontStore::new();
        let mut attempts = 0;
        for _ in 0..2 {
            let font = store.get_or_load_with("Fonts/a.ttf", 12, || {
                attempts += 1;
                Err("not a font".into())
            });
            assert!(font.is_none());
        }
        assert_eq!(attempts, 1);
        assert!(store.has_failed("Fonts/a.ttf", 12));
        assert!(!store.has_failed("Fonts/a.ttf", 24));
        assert!(store.get("Fonts/a.ttf", 12).is_none());
        assert!(store.is_empty());

        store.clear();
        assert!(!store.has_failed("Fonts/a.ttf", 12));
    }
}
