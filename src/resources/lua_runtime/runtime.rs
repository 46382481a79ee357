//! Lua runtime core implementation.
//!
//! This module contains the [`LuaRuntime`] struct which owns the Lua state,
//! provides the `engine` table API to scripts, and turns script sources into
//! isolated [`ScriptModule`]s.

use std::cell::{Cell, RefCell};

use log::{debug, error, info, warn};
use mlua::AppDataRef;
use mlua::prelude::*;

use super::commands::*;
use super::module::{HandlerId, HandlerKind, ScriptHandler, ScriptLoadError, ScriptModule};
use super::userdata::{LuaFont, LuaImage, LuaSound};
use crate::resources::resourcecache::{Resource, SharedCache};

/// Point size used when a script asks for a font without one.
const DEFAULT_FONT_SIZE: u32 = 16;

/// Shared state accessible from Lua function closures.
/// This is stored in Lua's app_data and allows Lua functions to reach the
/// resource cache and queue commands.
pub(crate) struct LuaAppData {
    cache: SharedCache,
    pub(super) render_commands: RefCell<Vec<RenderCmd>>,
    pub(super) audio_commands: RefCell<Vec<AudioLuaCmd>>,
    pub(super) control_commands: RefCell<Vec<ControlCmd>>,
    /// Handlers collected from the module being evaluated. `None` outside
    /// module construction.
    pending_handlers: RefCell<Option<Vec<ScriptHandler>>>,
    next_handler_id: Cell<u64>,
}

pub(super) fn app_data(lua: &Lua) -> LuaResult<AppDataRef<'_, LuaAppData>> {
    lua.app_data_ref::<LuaAppData>()
        .ok_or_else(|| LuaError::runtime("LuaAppData not found"))
}

/// Registers a Lua function that pushes a command to a queue in `LuaAppData`.
macro_rules! register_cmd {
    ($engine:expr, $lua:expr, $name:expr, $queue:ident,
     |$args:pat_param| $arg_ty:ty, $cmd:expr) => {
        $engine.set(
            $name,
            $lua.create_function(|lua, $args: $arg_ty| {
                app_data(lua)?.$queue.borrow_mut().push($cmd);
                Ok(())
            })?,
        )?;
    };
}

/// Holds the Lua interpreter state.
///
/// Not `Send`: the Lua state and the shared cache live on the main thread.
pub struct LuaRuntime {
    lua: Lua,
    /// Returns a fresh module environment whose reads fall back to `_G`.
    make_env: LuaFunction,
}

impl LuaRuntime {
    /// Creates a new Lua runtime bound to `cache` and registers the `engine` API.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization or API registration fails.
    pub fn new(cache: SharedCache) -> LuaResult<Self> {
        let lua = Lua::new();

        lua.set_app_data(LuaAppData {
            cache,
            render_commands: RefCell::new(Vec::new()),
            audio_commands: RefCell::new(Vec::new()),
            control_commands: RefCell::new(Vec::new()),
            pending_handlers: RefCell::new(None),
            next_handler_id: Cell::new(1),
        });

        let make_env: LuaFunction = lua
            .load("return function() return setmetatable({}, { __index = _G }) end")
            .set_name("=module_env")
            .eval()?;

        let runtime = Self { lua, make_env };
        runtime.register_base_api()?;
        runtime.register_resource_api()?;
        runtime.register_handler_api()?;
        runtime.register_output_api()?;

        Ok(runtime)
    }

    /// Registers the `engine` table with logging functions.
    fn register_base_api(&self) -> LuaResult<()> {
        let engine = self.lua.create_table()?;

        // engine.log(message) - General purpose logging
        engine.set(
            "log",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_info",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_warn",
            self.lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_error",
            self.lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("engine", engine)?;

        Ok(())
    }

    /// Registers resource lookups backed by the shared cache.
    ///
    /// Every lookup resolves manifest aliases first; failures surface as Lua
    /// errors carrying the [`ResourceError`](crate::resources::resourcecache::ResourceError) message.
    fn register_resource_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        // engine.get_image(key) -> Image
        engine.set(
            "get_image",
            self.lua.create_function(|lua, key: String| {
                let data = app_data(lua)?;
                let mut cache = data.cache.borrow_mut();
                let handle = cache.get_image(&key).map_err(LuaError::external)?;
                Ok(LuaImage {
                    key: cache.real_key(&key).to_string(),
                    handle,
                })
            })?,
        )?;

        // engine.get_sound(key) -> Sound
        engine.set(
            "get_sound",
            self.lua.create_function(|lua, key: String| {
                let data = app_data(lua)?;
                let mut cache = data.cache.borrow_mut();
                let handle = cache.get_sound(&key).map_err(LuaError::external)?;
                Ok(LuaSound {
                    key: cache.real_key(&key).to_string(),
                    handle,
                })
            })?,
        )?;

        // engine.get_font(key, size) -> Font
        engine.set(
            "get_font",
            self.lua.create_function(|lua, (key, size): (String, Option<u32>)| {
                let data = app_data(lua)?;
                let mut cache = data.cache.borrow_mut();
                let handle = cache
                    .get_font(&key, size.unwrap_or(DEFAULT_FONT_SIZE))
                    .map_err(LuaError::external)?;
                Ok(LuaFont {
                    key: cache.real_key(&key).to_string(),
                    handle,
                })
            })?,
        )?;

        // engine.get_json(key) -> table
        engine.set(
            "get_json",
            self.lua.create_function(|lua, key: String| {
                let value = {
                    let data = app_data(lua)?;
                    let mut cache = data.cache.borrow_mut();
                    cache.get_json(&key).map_err(LuaError::external)?
                };
                json_to_lua(lua, &value)
            })?,
        )?;

        // engine.get_script(key) -> string
        engine.set(
            "get_script",
            self.lua.create_function(|lua, key: String| {
                let data = app_data(lua)?;
                let text = data
                    .cache
                    .borrow_mut()
                    .get_script(&key)
                    .map_err(LuaError::external)?;
                Ok(text.to_string())
            })?,
        )?;

        // engine.get_resource(key, kind [, size]) - kind is "image", "sound", "font", "json" or "script"
        engine.set(
            "get_resource",
            self.lua
                .create_function(|lua, (key, kind, size): (String, String, Option<u32>)| {
                    let (resource, real_key) = {
                        let data = app_data(lua)?;
                        let mut cache = data.cache.borrow_mut();
                        let resource = cache.get_by_name(&key, &kind).map_err(LuaError::external)?;
                        (resource, cache.real_key(&key).to_string())
                    };
                    resource_into_lua(lua, real_key, resource, size)
                })?,
        )?;

        // engine.clear_cache()
        engine.set(
            "clear_cache",
            self.lua.create_function(|lua, ()| {
                app_data(lua)?.cache.borrow_mut().clear_cache();
                Ok(())
            })?,
        )?;

        Ok(())
    }

    /// Registers explicit handler registration.
    ///
    /// ```lua
    /// engine.register_handler("event", function(event) end, "name")
    /// engine.register_handler("event_room", function(event, room) end)
    /// engine.on_event(fn [, name])
    /// engine.on_event_room(fn [, name])
    /// ```
    fn register_handler_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        engine.set(
            "register_handler",
            self.lua.create_function(
                |lua, (kind, func, name): (String, LuaFunction, Option<String>)| {
                    let kind = kind.parse::<HandlerKind>().map_err(LuaError::runtime)?;
                    register_handler(lua, kind, func, name)
                },
            )?,
        )?;

        engine.set(
            "on_event",
            self.lua
                .create_function(|lua, (func, name): (LuaFunction, Option<String>)| {
                    register_handler(lua, HandlerKind::EventOnly, func, name)
                })?,
        )?;

        engine.set(
            "on_event_room",
            self.lua
                .create_function(|lua, (func, name): (LuaFunction, Option<String>)| {
                    register_handler(lua, HandlerKind::EventAndRoom, func, name)
                })?,
        )?;

        Ok(())
    }

    /// Registers drawing, audio and session commands.
    fn register_output_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        register_cmd!(engine, self.lua, "draw_image", render_commands,
            |(image, x, y)| (LuaUserDataRef<LuaImage>, f32, f32),
            RenderCmd::DrawImage { key: image.key.clone(), image: image.handle.clone(), x, y });
        // engine.draw_text(text, x, y [, size [, font]]) - size defaults to the font's
        engine.set(
            "draw_text",
            self.lua.create_function(
                |lua,
                 (text, x, y, size, font): (
                    String,
                    f32,
                    f32,
                    Option<f32>,
                    Option<LuaUserDataRef<LuaFont>>,
                )| {
                    let font = font.map(|f| TextFont {
                        key: f.key.clone(),
                        handle: f.handle.clone(),
                    });
                    let point_size = font
                        .as_ref()
                        .map_or(DEFAULT_FONT_SIZE, |f| f.handle.point_size);
                    let size = size.unwrap_or(point_size as f32);
                    app_data(lua)?
                        .render_commands
                        .borrow_mut()
                        .push(RenderCmd::DrawText { text, x, y, size, font });
                    Ok(())
                },
            )?,
        )?;
        register_cmd!(engine, self.lua, "clear_screen", render_commands,
            |()| (), RenderCmd::Clear);

        engine.set(
            "play_sound",
            self.lua.create_function(
                |lua, (sound, looped): (LuaUserDataRef<LuaSound>, Option<bool>)| {
                    sound.queue_play(lua, looped.unwrap_or(false))
                },
            )?,
        )?;
        register_cmd!(engine, self.lua, "stop_sounds", audio_commands,
            |()| (), AudioLuaCmd::StopAll);

        register_cmd!(engine, self.lua, "goto_room", control_commands,
            |room_key| String, ControlCmd::GotoRoom { room_key });
        register_cmd!(engine, self.lua, "quit", control_commands,
            |()| (), ControlCmd::Quit);

        Ok(())
    }

    /// Evaluates `source` as a new module.
    ///
    /// The chunk runs in a fresh environment; handlers it registers while
    /// running are collected into the returned module. On failure nothing the
    /// script registered is kept.
    pub fn load_module(
        &self,
        name: &str,
        source_key: &str,
        source: &str,
    ) -> Result<ScriptModule, ScriptLoadError> {
        let env: LuaTable = self
            .make_env
            .call(())
            .map_err(|e| ScriptLoadError::from_lua(name, e))?;

        let data = app_data(&self.lua).map_err(|e| ScriptLoadError::from_lua(name, e))?;
        data.pending_handlers.replace(Some(Vec::new()));
        drop(data);

        let result = self
            .lua
            .load(source)
            .set_name(source_key)
            .set_environment(env.clone())
            .exec();

        let handlers = app_data(&self.lua)
            .ok()
            .and_then(|data| data.pending_handlers.replace(None))
            .unwrap_or_default();

        match result {
            Ok(()) => {
                debug!(
                    "Module '{}' loaded from '{}' with {} handler(s)",
                    name,
                    source_key,
                    handlers.len()
                );
                Ok(ScriptModule::new(name, source_key, env, handlers))
            }
            Err(e) => Err(ScriptLoadError::from_lua(name, e)),
        }
    }

    /// Drains all queued render commands.
    pub fn drain_render_commands(&self) -> Vec<RenderCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.render_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Drains all queued audio commands.
    pub fn drain_audio_commands(&self) -> Vec<AudioLuaCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.audio_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Drains all queued room/session commands.
    pub fn drain_control_commands(&self) -> Vec<ControlCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.control_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

fn register_handler(
    lua: &Lua,
    kind: HandlerKind,
    func: LuaFunction,
    name: Option<String>,
) -> LuaResult<u64> {
    let data = app_data(lua)?;
    let mut pending = data.pending_handlers.borrow_mut();
    let Some(handlers) = pending.as_mut() else {
        return Err(LuaError::runtime(
            "handlers can only be registered while a script is loading",
        ));
    };
    let id = data.next_handler_id.get();
    data.next_handler_id.set(id + 1);
    let id = HandlerId(id);
    handlers.push(ScriptHandler {
        id,
        kind,
        name: name.unwrap_or_else(|| format!("handler{}", id)),
        func,
    });
    Ok(id.0)
}

fn resource_into_lua(
    lua: &Lua,
    real_key: String,
    resource: Resource,
    size: Option<u32>,
) -> LuaResult<LuaValue> {
    match resource {
        Resource::Image(handle) => LuaImage {
            key: real_key,
            handle,
        }
        .into_lua(lua),
        Resource::Sound(handle) => LuaSound {
            key: real_key,
            handle,
        }
        .into_lua(lua),
        Resource::Font(bytes) => LuaFont {
            key: real_key,
            handle: crate::resources::media::FontHandle::wrap(
                bytes,
                size.unwrap_or(DEFAULT_FONT_SIZE),
            ),
        }
        .into_lua(lua),
        Resource::Json(value) => json_to_lua(lua, &value),
        Resource::Script(text) => text.as_ref().into_lua(lua),
    }
}

/// JSON `null` becomes `nil`, so missing and null fields read the same.
fn json_to_lua(lua: &Lua, value: &serde_json::Value) -> LuaResult<LuaValue> {
    let options = LuaSerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::container::ContainerBuilder;
    use crate::resources::media::{ImageHandle, MediaBackend, SoundHandle};
    use crate::resources::resourcecache::ResourceCache;
    use std::sync::Arc;

    struct NullMedia;

    impl MediaBackend for NullMedia {
        fn decode_image(&self, _key: &str, _bytes: &[u8]) -> Result<ImageHandle, String> {
            Ok(ImageHandle {
                width: 2,
                height: 3,
                pixels: vec![0; 24],
            })
        }

        fn decode_sound(&self, _key: &str, bytes: &[u8]) -> Result<SoundHandle, String> {
            Ok(SoundHandle {
                file_type: ".wav".into(),
                bytes: Arc::from(bytes),
                frame_count: 10,
                sample_rate: 22050,
                channels: 2,
            })
        }
    }

    fn runtime(builder: ContainerBuilder) -> LuaRuntime {
        let cache = ResourceCache::new(builder.build().unwrap(), Box::new(NullMedia)).into_shared();
        LuaRuntime::new(cache).unwrap()
    }

    #[test]
    fn test_module_collects_registered_handlers() {
        let rt = runtime(ContainerBuilder::new());
        let module = rt
            .load_module(
                "a",
                "Scripts/a.lua",
                r#"
                function one(event) end
                function two(event, room) end
                engine.on_event(one, "one")
                engine.register_handler("event_room", two, "two")
                "#,
            )
            .unwrap();
        let kinds: Vec<_> = module.handlers().iter().map(|h| (h.name.as_str(), h.kind)).collect();
        assert_eq!(
            kinds,
            vec![("one", HandlerKind::EventOnly), ("two", HandlerKind::EventAndRoom)]
        );
        assert_eq!(module.exports().unwrap(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_module_globals_are_isolated() {
        let rt = runtime(ContainerBuilder::new());
        let a = rt.load_module("a", "a.lua", "counter = 1").unwrap();
        let b = rt.load_module("b", "b.lua", "counter = (counter or 0) + 10").unwrap();
        let lua = rt.lua();
        assert_eq!(lua.unpack::<i64>(a.get("counter").unwrap()).unwrap(), 1);
        assert_eq!(lua.unpack::<i64>(b.get("counter").unwrap()).unwrap(), 10);
        assert_eq!(rt.lua().globals().get::<LuaValue>("counter").unwrap(), LuaValue::Nil);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let rt = runtime(ContainerBuilder::new());
        let err = rt.load_module("bad", "bad.lua", "function (").unwrap_err();
        assert!(matches!(err, ScriptLoadError::Syntax { .. }));
    }

    #[test]
    fn test_failed_module_discards_its_handlers() {
        let rt = runtime(ContainerBuilder::new());
        let err = rt
            .load_module(
                "boom",
                "boom.lua",
                r#"engine.on_event(function(e) end) error("import failed")"#,
            )
            .unwrap_err();
        assert!(matches!(err, ScriptLoadError::Evaluation { .. }));
        let ok = rt.load_module("ok", "ok.lua", "").unwrap();
        assert!(ok.handlers().is_empty());
    }

    #[test]
    fn test_unknown_handler_kind_fails_module() {
        let rt = runtime(ContainerBuilder::new());
        let err = rt
            .load_module("k", "k.lua", r#"engine.register_handler("tick", function() end)"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown handler kind"));
    }

    #[test]
    fn test_handler_ids_are_unique_across_modules() {
        let rt = runtime(ContainerBuilder::new());
        let a = rt.load_module("a", "a.lua", "engine.on_event(function(e) end)").unwrap();
        let b = rt.load_module("b", "b.lua", "engine.on_event(function(e) end)").unwrap();
        assert_ne!(a.handlers()[0].id, b.handlers()[0].id);
        assert_eq!(a.handlers()[0].name, format!("handler{}", a.handlers()[0].id));
    }

    #[test]
    fn test_register_outside_loading_errors() {
        let rt = runtime(ContainerBuilder::new());
        let result: LuaResult<()> = rt
            .lua()
            .load("engine.on_event(function(e) end)")
            .exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_api_reads_cache() {
        let rt = runtime(
            ContainerBuilder::new()
                .insert("Images/bg2.png", vec![1])
                .insert("Rooms/r.json", br#"{"title":"hall"}"#.to_vec())
                .manifest_alias("bg", "Images/bg2.png"),
        );
        let module = rt
            .load_module(
                "res",
                "res.lua",
                r#"
                local a = engine.get_image("bg")
                local b = engine.get_image("Images/bg2.png")
                same = (a == b)
                width = a.width
                real = a.key
                title = engine.get_json("Rooms/r.json").title
                ok, err = pcall(engine.get_image, "missing.png")
                err = tostring(err)
                "#,
            )
            .unwrap();
        assert_eq!(module.get("same").unwrap(), LuaValue::Boolean(true));
        assert_eq!(rt.lua().unpack::<i64>(module.get("width").unwrap()).unwrap(), 2);
        let real: String = rt.lua().unpack(module.get("real").unwrap()).unwrap();
        assert_eq!(real, "Images/bg2.png");
        let title: String = rt.lua().unpack(module.get("title").unwrap()).unwrap();
        assert_eq!(title, "hall");
        assert_eq!(module.get("ok").unwrap(), LuaValue::Boolean(false));
        let err: String = rt.lua().unpack(module.get("err").unwrap()).unwrap();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_output_commands_are_queued() {
        let rt = runtime(ContainerBuilder::new().insert("s.wav", vec![1, 2]).insert("i.png", vec![3]));
        rt.load_module(
            "out",
            "out.lua",
            r#"
            engine.draw_image(engine.get_image("i.png"), 4, 5)
            engine.get_sound("s.wav"):play(true)
            engine.goto_room("Rooms/next.json")
            engine.quit()
            "#,
        )
        .unwrap();
        let render = rt.drain_render_commands();
        assert!(matches!(
            &render[..],
            [RenderCmd::DrawImage { key, image, x, y }]
                if key == "i.png" && image.width == 2 && *x == 4.0 && *y == 5.0
        ));
        let audio = rt.drain_audio_commands();
        assert!(matches!(&audio[..], [AudioLuaCmd::Play { key, looped: true, .. }] if key == "s.wav"));
        assert_eq!(
            rt.drain_control_commands(),
            vec![
                ControlCmd::GotoRoom { room_key: "Rooms/next.json".into() },
                ControlCmd::Quit
            ]
        );
        assert!(rt.drain_render_commands().is_empty());
    }

    #[test]
    fn test_json_null_reads_as_nil() {
        let rt = runtime(
            ContainerBuilder::new().insert("d.json", br#"{"v": null, "list": [1, null]}"#.to_vec()),
        );
        let module = rt
            .load_module(
                "j",
                "j.lua",
                r#"
                local j = engine.get_json("d.json")
                null_is_nil = (j.v == nil)
                null_is_falsy = not j.v
                first = j.list[1]
                via_resource = (engine.get_resource("d.json", "json").v == nil)
                "#,
            )
            .unwrap();
        assert_eq!(module.get("null_is_nil").unwrap(), LuaValue::Boolean(true));
        assert_eq!(module.get("null_is_falsy").unwrap(), LuaValue::Boolean(true));
        assert_eq!(rt.lua().unpack::<i64>(module.get("first").unwrap()).unwrap(), 1);
        assert_eq!(module.get("via_resource").unwrap(), LuaValue::Boolean(true));
    }

    #[test]
    fn test_draw_text_with_font() {
        let rt = runtime(
            ContainerBuilder::new()
                .insert("Fonts/a.ttf", b"TTF".to_vec())
                .manifest_alias("title_font", "Fonts/a.ttf"),
        );
        rt.load_module(
            "txt",
            "txt.lua",
            r#"
            local font = engine.get_font("title_font", 24)
            engine.draw_text("plain", 1, 2)
            engine.draw_text("sized", 1, 2, 40, font)
            engine.draw_text("font size", 1, 2, nil, font)
            "#,
        )
        .unwrap();
        let render = rt.drain_render_commands();
        assert_eq!(render.len(), 3);
        assert!(matches!(
            &render[0],
            RenderCmd::DrawText { size, font: None, .. } if *size == DEFAULT_FONT_SIZE as f32
        ));
        assert!(matches!(
            &render[1],
            RenderCmd::DrawText { size, font: Some(f), .. }
                if *size == 40.0 && f.key == "Fonts/a.ttf" && f.handle.point_size == 24
        ));
        assert!(matches!(
            &render[2],
            RenderCmd::DrawText { text, size, font: Some(f), .. }
                if text == "font size" && *size == 24.0 && &*f.handle.bytes == b"TTF"
        ));
    }
}
