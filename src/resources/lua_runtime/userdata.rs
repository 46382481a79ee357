//! Userdata types handed to scripts.
//!
//! Images, sounds and fonts wrap the cached instance; `==` between two
//! values of the same type is true when they share that instance.

use std::rc::Rc;

use mlua::prelude::*;

use super::commands::{AudioLuaCmd, ControlCmd};
use super::runtime::app_data;
use crate::resources::media::{FontHandle, ImageHandle, SoundHandle};

/// A decoded image.
#[derive(Debug, Clone)]
pub struct LuaImage {
    pub key: String,
    pub handle: Rc<ImageHandle>,
}

impl LuaUserData for LuaImage {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("key", |_, this| Ok(this.key.clone()));
        fields.add_field_method_get("width", |_, this| Ok(this.handle.width));
        fields.add_field_method_get("height", |_, this| Ok(this.handle.height));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaUserDataRef<LuaImage>| {
            Ok(Rc::ptr_eq(&this.handle, &other.handle))
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "Image({}, {}x{})",
                this.key, this.handle.width, this.handle.height
            ))
        });
    }
}

/// A decoded sound.
#[derive(Debug, Clone)]
pub struct LuaSound {
    pub key: String,
    pub handle: Rc<SoundHandle>,
}

impl LuaSound {
    pub(super) fn queue_play(&self, lua: &Lua, looped: bool) -> LuaResult<()> {
        app_data(lua)?.audio_commands.borrow_mut().push(AudioLuaCmd::Play {
            key: self.key.clone(),
            sound: self.handle.clone(),
            looped,
        });
        Ok(())
    }
}

impl LuaUserData for LuaSound {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("key", |_, this| Ok(this.key.clone()));
        fields.add_field_method_get("frames", |_, this| Ok(this.handle.frame_count));
        fields.add_field_method_get("sample_rate", |_, this| Ok(this.handle.sample_rate));
        fields.add_field_method_get("channels", |_, this| Ok(this.handle.channels));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        // sound:play([looped])
        methods.add_method("play", |lua, this, looped: Option<bool>| {
            this.queue_play(lua, looped.unwrap_or(false))
        });
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaUserDataRef<LuaSound>| {
            Ok(Rc::ptr_eq(&this.handle, &other.handle))
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("Sound({})", this.key))
        });
    }
}

/// Font bytes wrapped at a point size.
#[derive(Debug, Clone)]
pub struct LuaFont {
    pub key: String,
    pub handle: FontHandle,
}

impl LuaUserData for LuaFont {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("key", |_, this| Ok(this.key.clone()));
        fields.add_field_method_get("size", |_, this| Ok(this.handle.point_size));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaUserDataRef<LuaFont>| {
            Ok(std::sync::Arc::ptr_eq(&this.handle.bytes, &other.handle.bytes)
                && this.handle.point_size == other.handle.point_size)
        });
    }
}

/// View of the active room passed as the second handler argument.
#[derive(Debug, Clone)]
pub struct LuaRoom {
    pub key: String,
    pub modules: Vec<String>,
}

impl LuaUserData for LuaRoom {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("key", |_, this, ()| Ok(this.key.clone()));
        methods.add_method("modules", |_, this, ()| Ok(this.modules.clone()));
        // room:goto(room_key) - switch rooms once the current event is dispatched
        methods.add_method("goto", |lua, _, room_key: String| {
            app_data(lua)?
                .control_commands
                .borrow_mut()
                .push(ControlCmd::GotoRoom { room_key });
            Ok(())
        });
    }
}
