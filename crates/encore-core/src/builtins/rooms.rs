//! Room navigation and program-level built-ins.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::{RoomTarget, Runtime};
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "room_goto" => {
            rt.pending_room = Some(RoomTarget::Index(c.real(0) as u32));
            ok
        }
        "room_goto_next" => {
            if let Some(next) = rt.next_room_in_order(1) {
                rt.pending_room = Some(RoomTarget::Index(next));
            } else {
                rt.warn_once("room_goto_next", "already at the last room".into());
            }
            ok
        }
        "room_goto_previous" => {
            if let Some(prev) = rt.next_room_in_order(-1) {
                rt.pending_room = Some(RoomTarget::Index(prev));
            } else {
                rt.warn_once("room_goto_previous", "already at the first room".into());
            }
            ok
        }
        "room_restart" => {
            rt.pending_room = Some(RoomTarget::Restart);
            ok
        }
        "room_get_name" => {
            let name = rt
                .data
                .rooms
                .get(c.int(0).max(0) as usize)
                .map(|r| r.name.clone())
                .unwrap_or_default();
            Some(Ok(Value::string(name)))
        }
        "game_end" => {
            rt.game_end_requested = true;
            ok
        }
        "game_restart" => {
            // Full program restart is not supported; jump to the first room.
            rt.warn_once("game_restart", "treated as a jump to the start room".into());
            if let Some(&first) = rt.data.room_order.first() {
                rt.pending_room = Some(RoomTarget::Index(first));
            }
            ok
        }
        _ => None,
    }
}
