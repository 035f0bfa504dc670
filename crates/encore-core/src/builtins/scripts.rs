//! Event and script dispatch built-ins.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::vm;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "event_inherited" => {
            if c.self_id >= 0 {
                if let Err(e) = rt.dispatch_inherited(c.self_id as u32, c.other_id.max(0) as u32) {
                    return Some(Err(e));
                }
            }
            ok
        }
        "event_perform" => {
            if c.self_id >= 0 {
                let kind = c.int(0).max(0) as u32;
                let subtype = c.int(1).max(0) as u32;
                if let Err(e) = rt.dispatch_event(
                    c.self_id as u32,
                    c.other_id.max(0) as u32,
                    kind,
                    subtype,
                ) {
                    return Some(Err(e));
                }
            }
            ok
        }
        "event_user" => {
            if c.self_id >= 0 {
                let subtype = crate::events::OTHER_USER0 + c.int(0).max(0) as u32;
                if let Err(e) = rt.dispatch_event(
                    c.self_id as u32,
                    c.other_id.max(0) as u32,
                    crate::events::OTHER,
                    subtype,
                ) {
                    return Some(Err(e));
                }
            }
            ok
        }
        "script_execute" => {
            // The script id is the first popped argument; the rest pass
            // through.
            let script = c.int(0);
            let Some(entry) = rt.data.scripts.get(script.max(0) as usize) else {
                return Some(Err(super::builtin_error(
                    name,
                    format!("script {script} does not exist"),
                )));
            };
            let code_id = entry.code_id;
            let rest: Vec<Value> = c.args.iter().skip(1).cloned().collect();
            Some(vm::execute_code(rt, code_id, c.self_id, c.other_id, &rest))
        }
        _ => None,
    }
}
