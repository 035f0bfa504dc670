//! Drawing built-ins: draw state, sprites, text, primitives.

use crate::builtins::CallCtx;
use crate::drawing;
use crate::error::Result;
use crate::render::Blend;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "draw_set_color" | "draw_set_colour" => {
            rt.draw.color = c.real(0) as i64 as u32;
            ok
        }
        "draw_get_color" | "draw_get_colour" => Some(Ok(Value::Real(rt.draw.color as f64))),
        "draw_set_alpha" => {
            rt.draw.alpha = c.real(0).clamp(0.0, 1.0);
            ok
        }
        "draw_get_alpha" => Some(Ok(Value::Real(rt.draw.alpha))),
        "draw_set_font" => {
            rt.draw.font = c.int(0);
            ok
        }
        "draw_set_halign" => {
            rt.draw.halign = c.int(0);
            ok
        }
        "draw_set_valign" => {
            rt.draw.valign = c.int(0);
            ok
        }
        "make_color_rgb" | "make_colour_rgb" => {
            let (r, g, b) = (c.int(0) as u32, c.int(1) as u32, c.int(2) as u32);
            Some(Ok(Value::Real(
                ((b & 0xFF) << 16 | (g & 0xFF) << 8 | (r & 0xFF)) as f64,
            )))
        }
        "merge_color" | "merge_colour" => {
            let a = c.real(0) as i64 as u32;
            let b = c.real(1) as i64 as u32;
            let t = c.real(2).clamp(0.0, 1.0);
            let mix = |x: u32, y: u32| ((x as f64 + (y as f64 - x as f64) * t) as u32) & 0xFF;
            let r = mix(a & 0xFF, b & 0xFF);
            let g = mix((a >> 8) & 0xFF, (b >> 8) & 0xFF);
            let bl = mix((a >> 16) & 0xFF, (b >> 16) & 0xFF);
            Some(Ok(Value::Real((bl << 16 | g << 8 | r) as f64)))
        }

        "draw_sprite" => {
            let frame = resolve_frame(rt, c, 1);
            drawing::draw_sprite(
                rt,
                c.int(0),
                frame,
                c.real(2),
                c.real(3),
                1.0,
                1.0,
                0.0,
                0xFF_FFFF,
                1.0,
            );
            ok
        }
        "draw_sprite_ext" => {
            let frame = resolve_frame(rt, c, 1);
            drawing::draw_sprite(
                rt,
                c.int(0),
                frame,
                c.real(2),
                c.real(3),
                c.real(4),
                c.real(5),
                c.real(6),
                c.real(7) as i64 as u32,
                c.real(8),
            );
            ok
        }
        "draw_self" => {
            let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get(c.self_id as u32))
                .flatten()
            else {
                return ok;
            };
            let (sprite, frame, x, y, xs, ys, ang, col, alpha) = (
                inst.sprite_index,
                inst.image_index.floor() as i64,
                inst.x,
                inst.y,
                inst.image_xscale,
                inst.image_yscale,
                inst.image_angle,
                inst.image_blend,
                inst.image_alpha,
            );
            drawing::draw_sprite(rt, sprite, frame, x, y, xs, ys, ang, col, alpha);
            ok
        }
        "draw_background" => {
            drawing::draw_background(rt, c.int(0), c.real(1), c.real(2), false, false);
            ok
        }
        "draw_background_tiled" => {
            drawing::draw_background(rt, c.int(0), c.real(1), c.real(2), true, true);
            ok
        }

        "draw_text" => {
            let text = match c.arg(2).as_string() {
                Ok(t) => t,
                Err(e) => return Some(Err(super::builtin_error(name, e))),
            };
            drawing::draw_text(rt, c.real(0), c.real(1), &text);
            ok
        }
        "string_width" => {
            let text = c.string(0);
            Some(Ok(Value::Real(drawing::measure_string(rt, &text).0)))
        }
        "string_height" => {
            let text = c.string(0);
            Some(Ok(Value::Real(drawing::measure_string(rt, &text).1)))
        }

        "draw_rectangle" => {
            let blend = Blend::from_gml(rt.draw.color, rt.draw.alpha);
            let outline = c.arg(4).is_truthy();
            let (x1, y1, x2, y2) = (
                c.real(0) as f32,
                c.real(1) as f32,
                c.real(2) as f32,
                c.real(3) as f32,
            );
            if outline {
                rt.renderer.draw_rect(x1, y1, x2, y1 + 1.0, blend);
                rt.renderer.draw_rect(x1, y2 - 1.0, x2, y2, blend);
                rt.renderer.draw_rect(x1, y1, x1 + 1.0, y2, blend);
                rt.renderer.draw_rect(x2 - 1.0, y1, x2, y2, blend);
            } else {
                rt.renderer.draw_rect(x1, y1, x2, y2, blend);
            }
            ok
        }

        _ => None,
    }
}

/// `-1` as the subimage argument means the caller's current frame.
fn resolve_frame(rt: &Runtime, c: CallCtx, arg: usize) -> i64 {
    let v = c.real(arg);
    if v < 0.0 {
        (c.self_id >= 0)
            .then(|| rt.instances.get(c.self_id as u32))
            .flatten()
            .map(|i| i.image_index.floor() as i64)
            .unwrap_or(0)
    } else {
        v.floor() as i64
    }
}
