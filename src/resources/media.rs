//! Media decoding boundary.
//!
//! The resource cache never interprets image or sound bytes itself; it hands
//! them to a [`MediaBackend`]. [`RaylibMedia`] is the production backend and
//! only uses raylib's CPU-side loaders, so decoding works before (or without)
//! a window or audio device. GPU upload happens later, in
//! [`TextureStore`](crate::resources::texturestore::TextureStore), and sound
//! playback on the audio thread.
//!
//! Note: the decoded handles are plain data, so tests can supply their own
//! backend without touching raylib at all.

use std::ffi::CString;
use std::sync::Arc;

use raylib::ffi;

/// Decoded RGBA8 bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub width: i32,
    pub height: i32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// A validated sound clip.
///
/// The encoded bytes are kept (and shared with the audio thread) since raylib
/// sounds must be created on the thread owning the audio device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundHandle {
    /// File type hint such as `.ogg` or `.wav`.
    pub file_type: String,
    pub bytes: Arc<[u8]>,
    pub frame_count: u32,
    pub sample_rate: u32,
    pub channels: u32,
}

/// Font bytes wrapped at a given point size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    pub bytes: Arc<[u8]>,
    pub point_size: u32,
}

impl FontHandle {
    /// Wrap raw font bytes at `point_size`. The bytes are shared, not copied.
    pub fn wrap(bytes: Arc<[u8]>, point_size: u32) -> Self {
        Self { bytes, point_size }
    }
}

/// Decoder for the binary resource kinds.
///
/// `key` is the resolved storage key; backends use its extension as a file
/// type hint. Errors are human-readable reasons.
pub trait MediaBackend {
    fn decode_image(&self, key: &str, bytes: &[u8]) -> Result<ImageHandle, String>;
    fn decode_sound(&self, key: &str, bytes: &[u8]) -> Result<SoundHandle, String>;
}

/// File type hint (`.png`, `.ogg`, ...) derived from a key's extension.
///
/// Both `/` and `\` are accepted as separators.
pub fn file_type_of(key: &str) -> String {
    let name = key.rsplit(['/', '\\']).next().unwrap_or(key);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Backend decoding through raylib's in-memory loaders.
#[derive(Debug, Default, Clone, Copy)]
pub struct RaylibMedia;

impl RaylibMedia {
    pub fn new() -> Self {
        Self
    }
}

fn buffer_len(bytes: &[u8]) -> Result<i32, String> {
    i32::try_from(bytes.len()).map_err(|_| "payload too large".to_string())
}

impl MediaBackend for RaylibMedia {
    fn decode_image(&self, key: &str, bytes: &[u8]) -> Result<ImageHandle, String> {
        let file_type = file_type_of(key);
        let c_type = CString::new(file_type.as_str()).map_err(|e| e.to_string())?;
        let len = buffer_len(bytes)?;

        let mut raw = unsafe { ffi::LoadImageFromMemory(c_type.as_ptr(), bytes.as_ptr(), len) };
        if raw.data.is_null() || raw.width <= 0 || raw.height <= 0 {
            return Err(format!("unrecognised image data (type '{}')", file_type));
        }
        unsafe {
            ffi::ImageFormat(
                &mut raw,
                ffi::PixelFormat::PIXELFORMAT_UNCOMPRESSED_R8G8B8A8 as i32,
            );
        }
        let size = raw.width as usize * raw.height as usize * 4;
        let pixels = unsafe { std::slice::from_raw_parts(raw.data as *const u8, size) }.to_vec();
        let handle = ImageHandle {
            width: raw.width,
            height: raw.height,
            pixels,
        };
        unsafe { ffi::UnloadImage(raw) };
        Ok(handle)
    }

    fn decode_sound(&self, key: &str, bytes: &[u8]) -> Result<SoundHandle, String> {
        let file_type = file_type_of(key);
        let c_type = CString::new(file_type.as_str()).map_err(|e| e.to_string())?;
        let len = buffer_len(bytes)?;

        let wave = unsafe { ffi::LoadWaveFromMemory(c_type.as_ptr(), bytes.as_ptr(), len) };
        if wave.data.is_null() || wave.frameCount == 0 {
            return Err(format!("unrecognised sound data (type '{}')", file_type));
        }
        let handle = SoundHandle {
            file_type,
            bytes: Arc::from(bytes),
            frame_count: wave.frameCount,
            sample_rate: wave.sampleRate,
            channels: wave.channels,
        };
        unsafe { ffi::UnloadWave(wave) };
        Ok(handle)
    }
}
