//! Variable resolution and built-in property interception.
//!
//! Reads and writes of instance variables go through a dispatch table keyed
//! by built-in name before falling through to the per-instance slot bag; the
//! interpreter's variable ops stay free of special cases.

use crate::instance::Instance;
use crate::runtime::{RoomTarget, Runtime};
use crate::value::Value;

/// Built-in instance properties backed by structured fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceVar {
    X,
    Y,
    Xprevious,
    Yprevious,
    Xstart,
    Ystart,
    SpriteIndex,
    ImageIndex,
    ImageSpeed,
    ImageNumber,
    ImageXscale,
    ImageYscale,
    ImageAngle,
    ImageBlend,
    ImageAlpha,
    MaskIndex,
    Depth,
    Visible,
    Solid,
    Persistent,
    Direction,
    Speed,
    Hspeed,
    Vspeed,
    Gravity,
    GravityDirection,
    Friction,
    Alarm,
    ObjectIndex,
    Id,
    SpriteWidth,
    SpriteHeight,
    BboxLeft,
    BboxRight,
    BboxTop,
    BboxBottom,
    PathIndex,
    PathPosition,
    PathSpeed,
    PathEndAction,
}

impl InstanceVar {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "x" => Self::X,
            "y" => Self::Y,
            "xprevious" => Self::Xprevious,
            "yprevious" => Self::Yprevious,
            "xstart" => Self::Xstart,
            "ystart" => Self::Ystart,
            "sprite_index" => Self::SpriteIndex,
            "image_index" => Self::ImageIndex,
            "image_speed" => Self::ImageSpeed,
            "image_number" => Self::ImageNumber,
            "image_xscale" => Self::ImageXscale,
            "image_yscale" => Self::ImageYscale,
            "image_angle" => Self::ImageAngle,
            "image_blend" => Self::ImageBlend,
            "image_alpha" => Self::ImageAlpha,
            "mask_index" => Self::MaskIndex,
            "depth" => Self::Depth,
            "visible" => Self::Visible,
            "solid" => Self::Solid,
            "persistent" => Self::Persistent,
            "direction" => Self::Direction,
            "speed" => Self::Speed,
            "hspeed" => Self::Hspeed,
            "vspeed" => Self::Vspeed,
            "gravity" => Self::Gravity,
            "gravity_direction" => Self::GravityDirection,
            "friction" => Self::Friction,
            "alarm" => Self::Alarm,
            "object_index" => Self::ObjectIndex,
            "id" => Self::Id,
            "sprite_width" => Self::SpriteWidth,
            "sprite_height" => Self::SpriteHeight,
            "bbox_left" => Self::BboxLeft,
            "bbox_right" => Self::BboxRight,
            "bbox_top" => Self::BboxTop,
            "bbox_bottom" => Self::BboxBottom,
            "path_index" => Self::PathIndex,
            "path_position" => Self::PathPosition,
            "path_speed" => Self::PathSpeed,
            "path_endaction" => Self::PathEndAction,
            _ => return None,
        })
    }
}

/// Read a built-in instance property. `col` is the array column for the
/// indexed properties (alarm).
pub fn read_instance_var(rt: &Runtime, inst: &Instance, var: InstanceVar, col: i32) -> Value {
    let data = &rt.data;
    match var {
        InstanceVar::X => Value::Real(inst.x),
        InstanceVar::Y => Value::Real(inst.y),
        InstanceVar::Xprevious => Value::Real(inst.xprevious),
        InstanceVar::Yprevious => Value::Real(inst.yprevious),
        InstanceVar::Xstart => Value::Real(inst.xstart),
        InstanceVar::Ystart => Value::Real(inst.ystart),
        InstanceVar::SpriteIndex => Value::Real(inst.sprite_index as f64),
        InstanceVar::ImageIndex => Value::Real(inst.image_index),
        InstanceVar::ImageSpeed => Value::Real(inst.image_speed),
        InstanceVar::ImageNumber => Value::Real(
            usize::try_from(inst.sprite_index)
                .ok()
                .and_then(|i| data.sprites.get(i))
                .map(|s| s.frames.len() as f64)
                .unwrap_or(0.0),
        ),
        InstanceVar::ImageXscale => Value::Real(inst.image_xscale),
        InstanceVar::ImageYscale => Value::Real(inst.image_yscale),
        InstanceVar::ImageAngle => Value::Real(inst.image_angle),
        InstanceVar::ImageBlend => Value::Real(inst.image_blend as f64),
        InstanceVar::ImageAlpha => Value::Real(inst.image_alpha),
        InstanceVar::MaskIndex => Value::Real(inst.mask_index as f64),
        InstanceVar::Depth => Value::Real(inst.depth),
        InstanceVar::Visible => Value::bool(inst.visible),
        InstanceVar::Solid => Value::bool(inst.solid),
        InstanceVar::Persistent => Value::bool(inst.persistent),
        InstanceVar::Direction => Value::Real(inst.direction),
        InstanceVar::Speed => Value::Real(inst.speed),
        InstanceVar::Hspeed => Value::Real(inst.hspeed),
        InstanceVar::Vspeed => Value::Real(inst.vspeed),
        InstanceVar::Gravity => Value::Real(inst.gravity),
        InstanceVar::GravityDirection => Value::Real(inst.gravity_direction),
        InstanceVar::Friction => Value::Real(inst.friction),
        InstanceVar::Alarm => {
            let k = col.clamp(0, 11) as usize;
            Value::Real(inst.alarms[k] as f64)
        }
        InstanceVar::ObjectIndex => Value::Real(inst.object_index as f64),
        InstanceVar::Id => Value::Real(inst.id as f64),
        InstanceVar::SpriteWidth => Value::Real(
            usize::try_from(inst.sprite_index)
                .ok()
                .and_then(|i| data.sprites.get(i))
                .map(|s| s.width as f64 * inst.image_xscale)
                .unwrap_or(0.0),
        ),
        InstanceVar::SpriteHeight => Value::Real(
            usize::try_from(inst.sprite_index)
                .ok()
                .and_then(|i| data.sprites.get(i))
                .map(|s| s.height as f64 * inst.image_yscale)
                .unwrap_or(0.0),
        ),
        InstanceVar::BboxLeft => Value::Real(inst.bbox(data).map(|b| b.0).unwrap_or(inst.x)),
        InstanceVar::BboxTop => Value::Real(inst.bbox(data).map(|b| b.1).unwrap_or(inst.y)),
        InstanceVar::BboxRight => Value::Real(inst.bbox(data).map(|b| b.2).unwrap_or(inst.x)),
        InstanceVar::BboxBottom => Value::Real(inst.bbox(data).map(|b| b.3).unwrap_or(inst.y)),
        InstanceVar::PathIndex => Value::Real(inst.path.index as f64),
        InstanceVar::PathPosition => Value::Real(inst.path.position),
        InstanceVar::PathSpeed => Value::Real(inst.path.speed),
        InstanceVar::PathEndAction => Value::Real(inst.path.end_action as f64),
    }
}

/// Write a built-in instance property, applying the coupled-field updates
/// (speed/direction versus hspeed/vspeed). Read-only properties log once
/// and ignore the write.
pub fn write_instance_var(rt: &mut Runtime, id: u32, var: InstanceVar, col: i32, value: &Value) {
    let real = value.as_real().unwrap_or(0.0);
    let Some(inst) = rt.instances.get_mut(id) else {
        return;
    };
    match var {
        InstanceVar::X => inst.x = real,
        InstanceVar::Y => inst.y = real,
        InstanceVar::Xprevious => inst.xprevious = real,
        InstanceVar::Yprevious => inst.yprevious = real,
        InstanceVar::Xstart => inst.xstart = real,
        InstanceVar::Ystart => inst.ystart = real,
        InstanceVar::SpriteIndex => inst.sprite_index = real as i32,
        InstanceVar::ImageIndex => inst.image_index = real,
        InstanceVar::ImageSpeed => inst.image_speed = real,
        InstanceVar::ImageXscale => inst.image_xscale = real,
        InstanceVar::ImageYscale => inst.image_yscale = real,
        InstanceVar::ImageAngle => inst.image_angle = real,
        InstanceVar::ImageBlend => inst.image_blend = real as i64 as u32,
        InstanceVar::ImageAlpha => inst.image_alpha = real,
        InstanceVar::MaskIndex => inst.mask_index = real as i32,
        InstanceVar::Depth => inst.depth = real,
        InstanceVar::Visible => inst.visible = value.is_truthy(),
        InstanceVar::Solid => inst.solid = value.is_truthy(),
        InstanceVar::Persistent => inst.persistent = value.is_truthy(),
        InstanceVar::Direction => {
            inst.direction = real.rem_euclid(360.0);
            inst.apply_polar();
        }
        InstanceVar::Speed => {
            inst.speed = real;
            inst.apply_polar();
        }
        InstanceVar::Hspeed => {
            inst.hspeed = real;
            inst.apply_cartesian();
        }
        InstanceVar::Vspeed => {
            inst.vspeed = real;
            inst.apply_cartesian();
        }
        InstanceVar::Gravity => inst.gravity = real,
        InstanceVar::GravityDirection => inst.gravity_direction = real,
        InstanceVar::Friction => inst.friction = real,
        InstanceVar::Alarm => {
            let k = col.clamp(0, 11) as usize;
            inst.alarms[k] = real as i32;
        }
        InstanceVar::PathIndex => inst.path.index = real as i32,
        InstanceVar::PathPosition => inst.path.position = real.clamp(0.0, 1.0),
        InstanceVar::PathSpeed => inst.path.speed = real,
        InstanceVar::PathEndAction => inst.path.end_action = real as i32,
        InstanceVar::ObjectIndex
        | InstanceVar::Id
        | InstanceVar::ImageNumber
        | InstanceVar::SpriteWidth
        | InstanceVar::SpriteHeight
        | InstanceVar::BboxLeft
        | InstanceVar::BboxRight
        | InstanceVar::BboxTop
        | InstanceVar::BboxBottom => {
            rt.warn_once("read-only variable", format!("{var:?}"));
        }
    }
}

/// Read a built-in global by name. `col` indexes the per-view arrays.
/// Returns None when the name is not a built-in global.
pub fn read_global_builtin(rt: &Runtime, name: &str, col: i32) -> Option<Value> {
    let view = |f: fn(&crate::assets::RoomView) -> i32| -> Value {
        rt.room
            .views
            .get(col.max(0) as usize)
            .map(|v| Value::Real(f(v) as f64))
            .unwrap_or(Value::Real(0.0))
    };
    Some(match name {
        "room" => Value::Real(rt.room.index as f64),
        "room_first" => Value::Real(
            rt.data.room_order.first().copied().unwrap_or(0) as f64,
        ),
        "room_last" => Value::Real(
            rt.data.room_order.last().copied().unwrap_or(0) as f64,
        ),
        "room_width" => Value::Real(rt.room.width as f64),
        "room_height" => Value::Real(rt.room.height as f64),
        "room_speed" => Value::Real(rt.room.speed as f64),
        "room_caption" => Value::string(rt.room.caption.as_str()),
        "room_persistent" => Value::bool(false),
        "score" => Value::Real(rt.score),
        "lives" => Value::Real(rt.lives),
        "health" => Value::Real(rt.health),
        "fps" => Value::Real(rt.room.speed as f64),
        // Deterministic clock: derived from the frame counter, not wall time.
        "current_time" => Value::Real(rt.frame as f64 * 1000.0 / rt.room.speed.max(1) as f64),
        "instance_count" => Value::Real(rt.instances.ids().len() as f64),
        "mouse_x" | "mouse_y" => Value::Real(0.0),
        "os_type" => Value::Real(0.0),
        "view_current" => Value::Real(0.0),
        "view_enabled" => view(|v| v.enabled as i32),
        "view_xview" => view(|v| v.view_x),
        "view_yview" => view(|v| v.view_y),
        "view_wview" => view(|v| v.view_width),
        "view_hview" => view(|v| v.view_height),
        "view_xport" => view(|v| v.port_x),
        "view_yport" => view(|v| v.port_y),
        "view_wport" => view(|v| v.port_width),
        "view_hport" => view(|v| v.port_height),
        _ => return None,
    })
}

/// Write a built-in global by name. Returns false when the name is not a
/// built-in global (caller falls through to plain storage).
pub fn write_global_builtin(rt: &mut Runtime, name: &str, col: i32, value: &Value) -> bool {
    let real = value.as_real().unwrap_or(0.0);
    let set_view = |rt: &mut Runtime, f: fn(&mut crate::assets::RoomView, i32)| {
        if let Some(v) = rt.room.views.get_mut(col.max(0) as usize) {
            f(v, real as i32);
        }
    };
    match name {
        // Assigning `room` jumps rooms at the next flush boundary.
        "room" => rt.pending_room = Some(RoomTarget::Index(real as u32)),
        "room_speed" => rt.room.speed = (real as u32).max(1),
        "room_caption" => rt.room.caption = value.as_string().unwrap_or_default(),
        "score" => rt.score = real,
        "lives" => rt.lives = real,
        "health" => rt.health = real,
        "view_enabled" => {
            if let Some(v) = rt.room.views.get_mut(col.max(0) as usize) {
                v.enabled = value.is_truthy();
            }
        }
        "view_xview" => set_view(rt, |v, n| v.view_x = n),
        "view_yview" => set_view(rt, |v, n| v.view_y = n),
        "view_wview" => set_view(rt, |v, n| v.view_width = n),
        "view_hview" => set_view(rt, |v, n| v.view_height = n),
        "view_xport" => set_view(rt, |v, n| v.port_x = n),
        "view_yport" => set_view(rt, |v, n| v.port_y = n),
        "view_wport" => set_view(rt, |v, n| v.port_width = n),
        "view_hport" => set_view(rt, |v, n| v.port_height = n),
        _ => return false,
    }
    true
}
