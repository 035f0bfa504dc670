//! Path-following built-ins.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "path_start" => {
            let data = rt.data.clone();
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                let path_index = c.int(0);
                inst.path.index = path_index;
                inst.path.position = 0.0;
                inst.path.speed = c.real(1);
                inst.path.end_action = c.int(2);
                let absolute = c.arg(3).is_truthy();
                let start = usize::try_from(path_index)
                    .ok()
                    .and_then(|i| data.paths.get(i))
                    .map(|p| p.point_at(0.0));
                if let Some((px, py)) = start {
                    if absolute {
                        inst.path.offset_x = 0.0;
                        inst.path.offset_y = 0.0;
                        inst.x = px;
                        inst.y = py;
                    } else {
                        // Relative paths start at the instance's position;
                        // the follower tracks an offset from the first point.
                        inst.path.offset_x = inst.x - px;
                        inst.path.offset_y = inst.y - py;
                    }
                }
            }
            ok
        }
        "path_end" => {
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                inst.path = Default::default();
            }
            ok
        }
        "path_get_number" => Some(Ok(Value::Real(rt.data.paths.len() as f64))),
        "path_get_length" => {
            let length = usize::try_from(c.int(0))
                .ok()
                .and_then(|i| rt.data.paths.get(i))
                .map(|p| p.length())
                .unwrap_or(0.0);
            Some(Ok(Value::Real(length)))
        }
        "path_get_x" => {
            let x = usize::try_from(c.int(0))
                .ok()
                .and_then(|i| rt.data.paths.get(i))
                .map(|p| p.point_at(c.real(1)).0)
                .unwrap_or(0.0);
            Some(Ok(Value::Real(x)))
        }
        "path_get_y" => {
            let y = usize::try_from(c.int(0))
                .ok()
                .and_then(|i| rt.data.paths.get(i))
                .map(|p| p.point_at(c.real(1)).1)
                .unwrap_or(0.0);
            Some(Ok(Value::Real(y)))
        }
        _ => None,
    }
}
