//! Instance lifecycle, lookup, and collision built-ins.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::instance::FIRST_INSTANCE_ID;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    match name {
        "instance_create" => Some(
            rt.create_instance(c.int(2), c.real(0), c.real(1))
                .map(|id| Value::Real(id as f64)),
        ),
        "instance_destroy" => {
            // Persistent instances are exempt from instance_destroy; they
            // only leave via program exit.
            let destroy = |rt: &mut Runtime, id: u32| {
                let persistent = rt
                    .instances
                    .get(id)
                    .map(|i| i.persistent)
                    .unwrap_or(false);
                if !persistent {
                    rt.destroy_instance(id);
                }
            };
            match c.args.first() {
                None => {
                    if c.self_id >= 0 {
                        destroy(rt, c.self_id as u32);
                    }
                }
                Some(v) => {
                    let target = v.as_real().unwrap_or(-4.0) as i64;
                    if target >= FIRST_INSTANCE_ID as i64 {
                        destroy(rt, target as u32);
                    } else if target >= 0 {
                        for id in rt.instances.ids_of_object(target as i32, &rt.data.clone()) {
                            destroy(rt, id);
                        }
                    }
                }
            }
            Some(Ok(Value::Real(0.0)))
        }
        "instance_exists" => {
            let target = c.real(0) as i64;
            let exists = if target >= FIRST_INSTANCE_ID as i64 {
                rt.instances
                    .get(target as u32)
                    .map(|i| !i.destroyed)
                    .unwrap_or(false)
            } else if target >= 0 {
                !rt.instances.ids_of_object(target as i32, &rt.data).is_empty()
            } else {
                false
            };
            Some(Ok(Value::bool(exists)))
        }
        "instance_number" => {
            let count = rt.instances.ids_of_object(c.int(0), &rt.data).len();
            Some(Ok(Value::Real(count as f64)))
        }
        "instance_find" => {
            let ids = rt.instances.ids_of_object(c.int(0), &rt.data);
            let id = ids
                .get(c.int(1).max(0) as usize)
                .map(|&i| i as f64)
                .unwrap_or(-4.0);
            Some(Ok(Value::Real(id)))
        }

        "place_meeting" => {
            let hit = (c.self_id >= 0)
                && rt.place_meeting(c.self_id as u32, c.real(0), c.real(1), c.int(2));
            Some(Ok(Value::bool(hit)))
        }
        "place_free" => {
            let blocked =
                (c.self_id >= 0) && rt.place_meeting(c.self_id as u32, c.real(0), c.real(1), -3);
            Some(Ok(Value::bool(!blocked)))
        }
        "position_meeting" => {
            // A point test is a degenerate bbox test at the given position.
            let data = rt.data.clone();
            let (px, py, obj) = (c.real(0), c.real(1), c.int(2));
            let hit = rt.instances.iter().any(|other| {
                !other.destroyed
                    && data.object_is_ancestor(other.object_index, obj)
                    && other
                        .bbox(&data)
                        .map(|(l, t, r, b)| px >= l && px < r && py >= t && py < b)
                        .unwrap_or(false)
            });
            Some(Ok(Value::bool(hit)))
        }
        "distance_to_point" => {
            let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get(c.self_id as u32))
                .flatten()
            else {
                return Some(Ok(Value::Real(0.0)));
            };
            let (px, py) = (c.real(0), c.real(1));
            let (l, t, r, b) = inst.bbox(&rt.data).unwrap_or((inst.x, inst.y, inst.x, inst.y));
            let dx = (l - px).max(px - r).max(0.0);
            let dy = (t - py).max(py - b).max(0.0);
            Some(Ok(Value::Real(dx.hypot(dy))))
        }
        "distance_to_object" => {
            let data = rt.data.clone();
            let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get(c.self_id as u32))
                .flatten()
            else {
                return Some(Ok(Value::Real(0.0)));
            };
            let (al, at, ar, ab) = inst.bbox(&data).unwrap_or((inst.x, inst.y, inst.x, inst.y));
            let mut best = f64::MAX;
            for other in rt.instances.iter() {
                if other.id == inst.id
                    || other.destroyed
                    || !data.object_is_ancestor(other.object_index, c.int(0))
                {
                    continue;
                }
                let (bl, bt, br, bb) =
                    other.bbox(&data).unwrap_or((other.x, other.y, other.x, other.y));
                let dx = (al - br).max(bl - ar).max(0.0);
                let dy = (at - bb).max(bt - ab).max(0.0);
                best = best.min(dx.hypot(dy));
            }
            Some(Ok(Value::Real(if best == f64::MAX { -1.0 } else { best })))
        }
        "move_towards_point" => {
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                let dx = c.real(0) - inst.x;
                let dy = c.real(1) - inst.y;
                let mut dir = (-dy).atan2(dx).to_degrees();
                if dir < 0.0 {
                    dir += 360.0;
                }
                inst.direction = dir;
                inst.speed = c.real(2);
                inst.apply_polar();
            }
            Some(Ok(Value::Real(0.0)))
        }
        "motion_set" => {
            if let Some(inst) = (c.self_id >= 0)
                .then(|| rt.instances.get_mut(c.self_id as u32))
                .flatten()
            {
                inst.direction = c.real(0).rem_euclid(360.0);
                inst.speed = c.real(1);
                inst.apply_polar();
            }
            Some(Ok(Value::Real(0.0)))
        }
        _ => None,
    }
}
