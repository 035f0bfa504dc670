//! Drag-and-drop action built-ins. The compiler emits these for DnD events;
//! each mirrors a code-level equivalent.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "action_create_object" => Some(
            rt.create_instance(c.int(0), c.real(1), c.real(2))
                .map(|id| Value::Real(id as f64)),
        ),
        "action_kill_object" => {
            if c.self_id >= 0 {
                let persistent = rt
                    .instances
                    .get(c.self_id as u32)
                    .map(|i| i.persistent)
                    .unwrap_or(false);
                if !persistent {
                    rt.destroy_instance(c.self_id as u32);
                }
            }
            ok
        }
        "action_move_to" => {
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                inst.x = c.real(0);
                inst.y = c.real(1);
            }
            ok
        }
        "action_set_alarm" => {
            let steps = c.int(0);
            let slot = c.int(1).clamp(0, 11) as usize;
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                inst.alarms[slot] = steps;
            }
            ok
        }
        "action_set_score" => {
            rt.score = c.real(0);
            ok
        }
        _ => None,
    }
}
