//! Input systems.
//!
//! [`poll_input_system`] reads hardware input from Raylib each frame and
//! pushes [`GameEvent`]s onto the [`EventQueue`] in the order raylib reports
//! them. ESC and the window close button both produce [`GameEvent::Quit`];
//! for ESC the key press itself is queued first.
use bevy_ecs::prelude::*;
use raylib::ffi;
use raylib::prelude::*;

use crate::events::input::{EventQueue, GameEvent};

const KEY_ESCAPE: i32 = KeyboardKey::KEY_ESCAPE as i32;

const MOUSE_BUTTONS: [MouseButton; 3] = [
    MouseButton::MOUSE_BUTTON_LEFT,
    MouseButton::MOUSE_BUTTON_RIGHT,
    MouseButton::MOUSE_BUTTON_MIDDLE,
];

/// Poll Raylib for keyboard, mouse and window input.
pub fn poll_input_system(
    mut rl: NonSendMut<RaylibHandle>,
    mut queue: ResMut<EventQueue>,
    mut held_keys: Local<Vec<i32>>,
    mut last_mouse: Local<Option<Vector2>>,
) {
    let mut quit = rl.window_should_close();

    // Key presses, queued by raylib in press order
    while let Some(key) = rl.get_key_pressed_number() {
        let key = key as i32;
        queue.push(GameEvent::KeyDown { key });
        if !held_keys.contains(&key) {
            held_keys.push(key);
        }
        if key == KEY_ESCAPE {
            quit = true;
        }
    }
    held_keys.retain(|&key| {
        let released = unsafe { ffi::IsKeyReleased(key) };
        if released {
            queue.push(GameEvent::KeyUp { key });
        }
        !released
    });

    // Mouse
    let pos = rl.get_mouse_position();
    if last_mouse.is_some_and(|last| last != pos) {
        queue.push(GameEvent::MouseMotion { x: pos.x, y: pos.y });
    }
    *last_mouse = Some(pos);
    for button in MOUSE_BUTTONS {
        if rl.is_mouse_button_pressed(button) {
            queue.push(GameEvent::MouseButtonDown {
                button: button as i32,
                x: pos.x,
                y: pos.y,
            });
        }
        if rl.is_mouse_button_released(button) {
            queue.push(GameEvent::MouseButtonUp {
                button: button as i32,
                x: pos.x,
                y: pos.y,
            });
        }
    }

    if rl.is_window_resized() {
        queue.push(GameEvent::Resized {
            width: rl.get_screen_width(),
            height: rl.get_screen_height(),
        });
    }

    if quit {
        queue.push(GameEvent::Quit);
    }
}
