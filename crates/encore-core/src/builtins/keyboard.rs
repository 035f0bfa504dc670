//! Keyboard built-ins reading the per-frame input snapshot.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    match name {
        "keyboard_check" => Some(Ok(Value::bool(rt.input.is_down(c.int(0).max(0) as u32)))),
        "keyboard_check_pressed" => {
            Some(Ok(Value::bool(rt.input.is_pressed(c.int(0).max(0) as u32))))
        }
        "keyboard_check_released" => {
            Some(Ok(Value::bool(rt.input.is_released(c.int(0).max(0) as u32))))
        }
        // Direct hardware polling reads the same deterministic snapshot.
        "keyboard_check_direct" => Some(Ok(Value::bool(rt.input.is_down(c.int(0).max(0) as u32)))),
        "keyboard_clear" | "io_clear" => {
            rt.input.clear();
            Some(Ok(Value::Real(0.0)))
        }
        _ => None,
    }
}
