//! GPU textures for images drawn by scripts.
//!
//! Images are decoded on the CPU by the resource cache. The first time a
//! draw command references an image its pixels are uploaded and the texture
//! is kept under the image's real key. A key whose upload failed is not
//! retried.

use raylib::ffi;
use raylib::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resources::media::ImageHandle;

/// Non-send store of uploaded textures, keyed by real resource key.
#[derive(Default)]
pub struct TextureStore {
    map: FxHashMap<String, Texture2D>,
    failed: FxHashSet<String>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture for `key`, uploading `image` if it is not there yet.
    ///
    /// Returns `None` when the upload fails, now or on an earlier call.
    pub fn get_or_upload(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        key: &str,
        image: &ImageHandle,
    ) -> Option<&Texture2D> {
        self.get_or_upload_with(key, || {
            let texture = upload(rl, thread, image)?;
            log::debug!("Uploaded texture '{}' ({}x{})", key, image.width, image.height);
            Ok(texture)
        })
    }

    fn get_or_upload_with(
        &mut self,
        key: &str,
        upload: impl FnOnce() -> Result<Texture2D, String>,
    ) -> Option<&Texture2D> {
        if self.failed.contains(key) {
            return None;
        }
        if !self.map.contains_key(key) {
            match upload() {
                Ok(texture) => {
                    self.map.insert(key.to_string(), texture);
                }
                Err(e) => {
                    log::error!("Cannot upload texture '{}': {}", key, e);
                    self.failed.insert(key.to_string());
                    return None;
                }
            }
        }
        self.map.get(key)
    }

    /// Whether an upload for `key` has failed.
    pub fn has_failed(&self, key: &str) -> bool {
        self.failed.contains(key)
    }

    pub fn get(&self, key: &str) -> Option<&Texture2D> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.failed.clear();
    }
}

fn upload(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    image: &ImageHandle,
) -> Result<Texture2D, String> {
    let expected = image.width as usize * image.height as usize * 4;
    if image.width <= 0 || image.height <= 0 || image.pixels.len() != expected {
        return Err(format!(
            "bad pixel buffer for {}x{} image",
            image.width, image.height
        ));
    }
    // GenImageColor allocates an RGBA8 buffer owned by raylib, which
    // Image::from_raw frees on drop.
    let raylib_image = unsafe {
        let raw = ffi::GenImageColor(image.width, image.height, Color::BLANK.into());
        std::ptr::copy_nonoverlapping(image.pixels.as_ptr(), raw.data as *mut u8, expected);
        Image::from_raw(raw)
    };
    rl.load_texture_from_image(thread, &raylib_image)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_upload_is_not_retried() {
        let mut store = TextureStore::new();
        let mut attempts = 0;
        for _ in 0..3 {
            let texture = store.get_or_upload_with("Images/bad.png", || {
                attempts += 1;
                Err("bad pixel buffer".into())
            });
            assert!(texture.is_none());
        }
        assert_eq!(attempts, 1);
        assert!(store.has_failed("Images/bad.png"));
        assert!(store.is_empty());

        store.clear();
        assert!(!store.has_failed("Images/bad.png"));
    }
}
