//! Render system.
//!
//! Draws the retained [`Canvas`] every frame. Image textures and script fonts
//! are loaded lazily, before the drawing scope opens.

use bevy_ecs::prelude::*;
use raylib::prelude::*;

use crate::resources::canvas::Canvas;
use crate::resources::fontstore::FontStore;
use crate::resources::lua_runtime::RenderCmd;
use crate::resources::texturestore::TextureStore;

pub fn render_system(
    mut rl: NonSendMut<RaylibHandle>,
    th: NonSend<RaylibThread>,
    mut textures: NonSendMut<TextureStore>,
    mut fonts: NonSendMut<FontStore>,
    canvas: NonSend<Canvas>,
) {
    for cmd in canvas.commands() {
        match cmd {
            RenderCmd::DrawImage { key, image, .. } => {
                textures.get_or_upload(&mut rl, &th, key, image);
            }
            RenderCmd::DrawText {
                font: Some(font), ..
            } => {
                fonts.get_or_load(&mut rl, &th, font);
            }
            _ => {}
        }
    }

    let mut d = rl.begin_drawing(&th);
    d.clear_background(Color::BLACK);
    for cmd in canvas.commands() {
        match cmd {
            RenderCmd::DrawImage { key, x, y, .. } => {
                if let Some(tex) = textures.get(key) {
                    d.draw_texture_v(tex, Vector2 { x: *x, y: *y }, Color::WHITE);
                }
            }
            RenderCmd::DrawText {
                text,
                x,
                y,
                size,
                font,
            } => {
                let loaded = font
                    .as_ref()
                    .and_then(|f| fonts.get(&f.key, f.handle.point_size));
                match loaded {
                    Some(loaded) => d.draw_text_ex(
                        loaded,
                        text,
                        Vector2 { x: *x, y: *y },
                        *size,
                        1.0,
                        Color::WHITE,
                    ),
                    None => d.draw_text(text, *x as i32, *y as i32, *size as i32, Color::WHITE),
                }
            }
            RenderCmd::Clear => {}
        }
    }
}
