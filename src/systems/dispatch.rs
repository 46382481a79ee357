//! Event dispatcher.
//!
//! Routes each [`GameEvent`] to every registered handler of the active room:
//! modules in load order, handlers in registration order. Handlers declared as
//! [`HandlerKind::EventOnly`] get `(event)`, those declared as
//! [`HandlerKind::EventAndRoom`] get `(event, room)`.
//!
//! A failing handler never stops the tick. Its first failure in the current
//! room is logged; later failures of the same handler are counted but not
//! logged again. The handler is still called on every event.

use bevy_ecs::prelude::*;
use log::{debug, error};

use crate::events::input::{EventQueue, GameEvent};
use crate::resources::lua_runtime::{HandlerKind, LuaRoom};
use crate::resources::roomregistry::RoomRegistry;
use crate::resources::session::Session;

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers called.
    pub invoked: usize,
    /// Handlers that raised an error.
    pub failed: usize,
    /// Failures that were logged (first failure per handler per room).
    pub reported: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.invoked += other.invoked;
        self.failed += other.failed;
        self.reported += other.reported;
    }
}

/// Dispatch one event to the active room. Does nothing without one.
pub fn dispatch_event(rooms: &mut RoomRegistry, event: &GameEvent) -> DispatchReport {
    let mut report = DispatchReport::default();
    let (runtime, Some(active)) = rooms.dispatch_parts() else {
        return report;
    };
    let lua = runtime.lua();

    let event_table = match event.to_lua_table(lua) {
        Ok(table) => table,
        Err(e) => {
            error!("Cannot convert event {:?} for scripts: {}", event, e);
            return report;
        }
    };
    let room = match lua.create_userdata(LuaRoom {
        key: active.key().to_string(),
        modules: active.module_names(),
    }) {
        Ok(ud) => ud,
        Err(e) => {
            error!("Cannot build room view for scripts: {}", e);
            return report;
        }
    };

    for module in &active.modules {
        for handler in module.handlers() {
            let result = match handler.kind {
                HandlerKind::EventOnly => handler.func.call::<()>(event_table.clone()),
                HandlerKind::EventAndRoom => {
                    handler.func.call::<()>((event_table.clone(), room.clone()))
                }
            };
            report.invoked += 1;

            if let Err(e) = result {
                report.failed += 1;
                if active.error_logged.insert(handler.id) {
                    report.reported += 1;
                    error!(
                        target: "lua",
                        "Error when trying to execute {}.{}: {}",
                        module.name(),
                        handler.name,
                        e
                    );
                } else {
                    debug!(target: "lua", "{}.{} failed again", module.name(), handler.name);
                }
            }
        }
    }
    report
}

/// Dispatch every event in order.
///
/// Room switches requested by a handler are applied once the event that
/// triggered them has reached every handler, so the next event already goes
/// to the new room. Returns the merged report and whether a script asked to
/// quit.
pub fn dispatch_all(rooms: &mut RoomRegistry, events: &[GameEvent]) -> (DispatchReport, bool) {
    let mut report = DispatchReport::default();
    let mut quit = false;
    for event in events {
        report.merge(dispatch_event(rooms, event));
        quit |= rooms.apply_pending_commands();
    }
    (report, quit)
}

/// Drain the [`EventQueue`] into the active room.
pub fn dispatch_events_system(
    mut queue: ResMut<EventQueue>,
    mut rooms: NonSendMut<RoomRegistry>,
    mut session: ResMut<Session>,
) {
    let events = queue.drain();
    let (_, quit) = dispatch_all(&mut rooms, &events);
    if quit || events.iter().any(|e| matches!(e, GameEvent::Quit)) {
        session.quit_requested = true;
    }
}
