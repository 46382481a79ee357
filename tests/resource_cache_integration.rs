//! Resource cache integration tests: alias identity, memoization, failure
//! handling and cache clearing, with a stub media backend.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use roompack::resources::container::ContainerBuilder;
use roompack::resources::media::{ImageHandle, MediaBackend, SoundHandle, file_type_of};
use roompack::resources::resourcecache::{ResourceCache, ResourceError, ResourceKind};

/// Decodes anything, counting how often it was asked to.
#[derive(Clone, Default)]
struct CountingMedia {
    decodes: Rc<Cell<usize>>,
}

impl MediaBackend for CountingMedia {
    fn decode_image(&self, _key: &str, bytes: &[u8]) -> Result<ImageHandle, String> {
        self.decodes.set(self.decodes.get() + 1);
        Ok(ImageHandle {
            width: bytes.len() as i32,
            height: 1,
            pixels: vec![255; bytes.len() * 4],
        })
    }

    fn decode_sound(&self, key: &str, bytes: &[u8]) -> Result<SoundHandle, String> {
        self.decodes.set(self.decodes.get() + 1);
        if bytes.is_empty() {
            return Err("empty clip".into());
        }
        Ok(SoundHandle {
            file_type: file_type_of(key),
            bytes: Arc::from(bytes),
            frame_count: bytes.len() as u32,
            sample_rate: 22050,
            channels: 1,
        })
    }
}

fn cache_with(media: CountingMedia) -> ResourceCache {
    let container = ContainerBuilder::new()
        .insert("Images/backgrounds/bg2.png", vec![1, 2, 3])
        .insert("Sounds/mus/test.ogg", vec![9, 9])
        .insert("Sounds/silence.ogg", Vec::new())
        .insert("Rooms/main_room.json", br#"{"scripts": ["a.lua"]}"#.to_vec())
        .insert("Fonts/mono.ttf", vec![0, 1, 0, 0])
        .manifest_alias("Images\\backgrounds\\bg2.png", "Images/backgrounds/bg2.png")
        .manifest_alias("Sounds\\mus\\test.ogg", "Sounds/mus/test.ogg")
        .manifest_alias("Rooms\\main_room.json", "Rooms/main_room.json")
        .build()
        .unwrap();
    ResourceCache::new(container, Box::new(media))
}

#[test]
fn alias_and_real_key_share_one_instance() {
    let media = CountingMedia::default();
    let mut cache = cache_with(media.clone());

    let via_alias = cache.get_image("Images\\backgrounds\\bg2.png").unwrap();
    let via_real = cache.get_image("Images/backgrounds/bg2.png").unwrap();

    assert!(Rc::ptr_eq(&via_alias, &via_real));
    assert_eq!(media.decodes.get(), 1);
    assert_eq!(cache.cached_len(), 1);
}

#[test]
fn repeated_gets_do_not_decode_again() {
    let media = CountingMedia::default();
    let mut cache = cache_with(media.clone());

    let first = cache.get("Sounds\\mus\\test.ogg", ResourceKind::Sound).unwrap();
    let second = cache.get("Sounds\\mus\\test.ogg", ResourceKind::Sound).unwrap();

    assert!(first.same_instance(&second));
    assert_eq!(media.decodes.get(), 1);
    assert!(cache.is_cached("Sounds/mus/test.ogg", ResourceKind::Sound));
}

#[test]
fn not_found_reports_logical_key_and_caches_nothing() {
    let mut cache = cache_with(CountingMedia::default());

    let err = cache.get_image("Images\\missing.png").unwrap_err();
    assert!(matches!(&err, ResourceError::NotFound(key) if key == "Images\\missing.png"));
    assert_eq!(err.to_string(), "Resource Images\\missing.png not found");
    assert_eq!(cache.cached_len(), 0);
}

#[test]
fn decode_failure_is_retried_next_time() {
    let media = CountingMedia::default();
    let mut cache = cache_with(media.clone());

    assert!(matches!(
        cache.get_sound("Sounds/silence.ogg"),
        Err(ResourceError::Decode { .. })
    ));
    assert!(cache.get_sound("Sounds/silence.ogg").is_err());
    assert_eq!(media.decodes.get(), 2);
    assert_eq!(cache.cached_len(), 0);
}

#[test]
fn clear_cache_forces_fresh_decode() {
    let media = CountingMedia::default();
    let mut cache = cache_with(media.clone());

    let before = cache.get_image("Images/backgrounds/bg2.png").unwrap();
    cache.clear_cache();
    assert_eq!(cache.cached_len(), 0);
    let after = cache.get_image("Images/backgrounds/bg2.png").unwrap();

    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);
    assert_eq!(media.decodes.get(), 2);
}

#[test]
fn json_through_alias() {
    let mut cache = cache_with(CountingMedia::default());
    let json = cache.get_json("Rooms\\main_room.json").unwrap();
    assert_eq!(json["scripts"][0], "a.lua");
    let again = cache.get_json("Rooms/main_room.json").unwrap();
    assert!(Rc::ptr_eq(&json, &again));
}

#[test]
fn fonts_share_bytes_across_sizes() {
    let media = CountingMedia::default();
    let mut cache = cache_with(media.clone());

    let small = cache.get_font("Fonts/mono.ttf", 12).unwrap();
    let large = cache.get_font("Fonts/mono.ttf", 32).unwrap();

    assert_eq!(small.point_size, 12);
    assert_eq!(large.point_size, 32);
    assert!(Arc::ptr_eq(&small.bytes, &large.bytes));
    assert_eq!(media.decodes.get(), 0);
    assert_eq!(cache.cached_len(), 1);
}

#[test]
fn kind_names_from_scripts() {
    let mut cache = cache_with(CountingMedia::default());
    let image = cache.get_by_name("Images\\backgrounds\\bg2.png", "Images").unwrap();
    assert_eq!(image.kind(), ResourceKind::Image);
    assert!(matches!(
        cache.get_by_name("Images/backgrounds/bg2.png", "video"),
        Err(ResourceError::UnsupportedKind(kind)) if kind == "video"
    ));
}
