//! Event kinds and subtypes.
//!
//! Events are keyed by `(kind, subtype)`. Resolution walks the object's
//! parent chain until a handler is found; `event_inherited()` re-dispatches
//! one level above the chain level currently in progress.

pub const CREATE: u32 = 0;
pub const DESTROY: u32 = 1;
pub const ALARM: u32 = 2;
pub const STEP: u32 = 3;
pub const COLLISION: u32 = 4;
pub const KEYBOARD: u32 = 5;
pub const MOUSE: u32 = 6;
pub const OTHER: u32 = 7;
pub const DRAW: u32 = 8;
pub const KEY_PRESS: u32 = 9;
pub const KEY_RELEASE: u32 = 10;
pub const TRIGGER: u32 = 11;
pub const CLEANUP: u32 = 12;
pub const GESTURE: u32 = 13;

/// Step subtypes.
pub const STEP_NORMAL: u32 = 0;
pub const STEP_BEGIN: u32 = 1;
pub const STEP_END: u32 = 2;

/// Draw subtypes.
pub const DRAW_NORMAL: u32 = 0;
pub const DRAW_GUI: u32 = 64;

/// Other subtypes the runtime raises itself.
pub const OTHER_GAME_START: u32 = 2;
pub const OTHER_GAME_END: u32 = 3;
pub const OTHER_ROOM_START: u32 = 4;
pub const OTHER_ROOM_END: u32 = 5;
pub const OTHER_ANIMATION_END: u32 = 7;
pub const OTHER_PATH_END: u32 = 8;
/// User events occupy subtypes 10..=25.
pub const OTHER_USER0: u32 = 10;

/// Human-readable event name for diagnostics and traces.
pub fn event_name(kind: u32, subtype: u32) -> String {
    match kind {
        CREATE => "create".into(),
        DESTROY => "destroy".into(),
        ALARM => format!("alarm{subtype}"),
        STEP => match subtype {
            STEP_NORMAL => "step".into(),
            STEP_BEGIN => "beginstep".into(),
            STEP_END => "endstep".into(),
            _ => format!("step{subtype}"),
        },
        COLLISION => format!("collision{subtype}"),
        KEYBOARD => format!("keyboard{subtype}"),
        MOUSE => format!("mouse{subtype}"),
        OTHER => match subtype {
            OTHER_GAME_START => "gamestart".into(),
            OTHER_GAME_END => "gameend".into(),
            OTHER_ROOM_START => "roomstart".into(),
            OTHER_ROOM_END => "roomend".into(),
            OTHER_ANIMATION_END => "animationend".into(),
            OTHER_PATH_END => "endofpath".into(),
            10..=25 => format!("user{}", subtype - 10),
            _ => format!("other{subtype}"),
        },
        DRAW => match subtype {
            DRAW_NORMAL => "draw".into(),
            DRAW_GUI => "drawgui".into(),
            _ => format!("draw{subtype}"),
        },
        KEY_PRESS => format!("keypress{subtype}"),
        KEY_RELEASE => format!("keyrelease{subtype}"),
        TRIGGER => format!("trigger{subtype}"),
        CLEANUP => "cleanup".into(),
        GESTURE => format!("gesture{subtype}"),
        _ => format!("event{kind}_{subtype}"),
    }
}
