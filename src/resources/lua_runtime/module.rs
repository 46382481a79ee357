//! Script modules and their registered handlers.
//!
//! A [`ScriptModule`] is one script evaluated in its own environment table.
//! Reads of unknown names fall through to the shared globals (the `engine`
//! table, the standard library), writes stay in the module. Event handlers are
//! not discovered by reflection: the script registers them explicitly while it
//! is being evaluated, choosing the calling convention up front.
//!
//! ```lua
//! local bg = engine.get_image("bg")
//!
//! function background_script(event)
//!     engine.draw_image(bg, 0, 0)
//! end
//!
//! engine.on_event(background_script, "background_script")
//! ```

use std::fmt;
use std::str::FromStr;

use mlua::prelude::*;

use crate::resources::resourcecache::ResourceError;

/// Calling convention of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// `handler(event)`
    EventOnly,
    /// `handler(event, room)`
    EventAndRoom,
}

impl HandlerKind {
    /// Number of arguments the handler is called with.
    pub fn arity(&self) -> usize {
        match self {
            HandlerKind::EventOnly => 1,
            HandlerKind::EventAndRoom => 2,
        }
    }
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(HandlerKind::EventOnly),
            "event_room" => Ok(HandlerKind::EventAndRoom),
            other => Err(format!(
                "unknown handler kind '{}', expected 'event' or 'event_room'",
                other
            )),
        }
    }
}

/// Stable identity of a registered handler, unique per runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A Lua function registered for event dispatch.
#[derive(Debug, Clone)]
pub struct ScriptHandler {
    pub id: HandlerId,
    pub kind: HandlerKind,
    pub name: String,
    pub func: LuaFunction,
}

/// Failure to construct a module from a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptLoadError {
    #[error("cannot fetch source: {0}")]
    Source(#[from] ResourceError),
    #[error("syntax error in {name}: {source}")]
    Syntax {
        name: String,
        #[source]
        source: LuaError,
    },
    #[error("{name} failed during evaluation: {source}")]
    Evaluation {
        name: String,
        #[source]
        source: LuaError,
    },
}

impl ScriptLoadError {
    pub(crate) fn from_lua(name: &str, err: LuaError) -> Self {
        match err {
            LuaError::SyntaxError { .. } => ScriptLoadError::Syntax {
                name: name.to_string(),
                source: err,
            },
            _ => ScriptLoadError::Evaluation {
                name: name.to_string(),
                source: err,
            },
        }
    }
}

/// One live, independently scoped script.
#[derive(Debug)]
pub struct ScriptModule {
    name: String,
    source_key: String,
    env: LuaTable,
    handlers: Vec<ScriptHandler>,
}

impl ScriptModule {
    pub(crate) fn new(
        name: impl Into<String>,
        source_key: impl Into<String>,
        env: LuaTable,
        handlers: Vec<ScriptHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            source_key: source_key.into(),
            env,
            handlers,
        }
    }

    /// Module name: the script's base file name without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container key the source was loaded from.
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> &[ScriptHandler] {
        &self.handlers
    }

    /// A top-level binding defined by this module (globals are not consulted).
    pub fn get(&self, name: &str) -> LuaResult<LuaValue> {
        self.env.raw_get(name)
    }

    /// Names of every top-level binding defined by this module, sorted.
    pub fn exports(&self) -> LuaResult<Vec<String>> {
        let mut names = Vec::new();
        for pair in self.env.clone().pairs::<LuaValue, LuaValue>() {
            let (key, _) = pair?;
            if let LuaValue::String(s) = key {
                names.push(s.to_str()?.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Module name for a script key: base file name, extension stripped.
///
/// Both `/` and `\` count as separators since container keys may use either.
pub fn module_name_for(script_key: &str) -> String {
    let base = script_key.rsplit(['/', '\\']).next().unwrap_or(script_key);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[..idx].to_string(),
        _ => base.to_string(),
    }
}
