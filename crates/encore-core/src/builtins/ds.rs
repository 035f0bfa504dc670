//! ds_map and ds_list built-ins: integer-handle data structures.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::{DsKey, Runtime};
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let ok = Some(Ok(Value::Real(0.0)));
    match name {
        "ds_map_create" => Some(Ok(Value::Real(rt.ds.create_map() as f64))),
        "ds_map_destroy" => {
            let handle = c.int(0);
            if let Some(slot) = usize::try_from(handle).ok().and_then(|h| rt.ds.maps.get_mut(h)) {
                *slot = None;
            }
            ok
        }
        "ds_map_clear" => {
            if let Some(map) = rt.ds.map(c.int(0)) {
                map.clear();
            }
            ok
        }
        "ds_map_add" | "ds_map_set" | "ds_map_replace" => {
            let key = DsKey::from_value(&c.arg(1));
            let value = c.arg(2);
            if let Some(map) = rt.ds.map(c.int(0)) {
                map.insert(key, value);
            }
            ok
        }
        "ds_map_delete" => {
            let key = DsKey::from_value(&c.arg(1));
            if let Some(map) = rt.ds.map(c.int(0)) {
                map.remove(&key);
            }
            ok
        }
        "ds_map_find_value" => {
            let key = DsKey::from_value(&c.arg(1));
            let value = rt
                .ds
                .map(c.int(0))
                .and_then(|m| m.get(&key).cloned())
                .unwrap_or(Value::Undefined);
            Some(Ok(value))
        }
        "ds_map_exists" => {
            let key = DsKey::from_value(&c.arg(1));
            let exists = rt.ds.map(c.int(0)).map(|m| m.contains_key(&key)).unwrap_or(false);
            Some(Ok(Value::bool(exists)))
        }
        "ds_map_size" => {
            let size = rt.ds.map(c.int(0)).map(|m| m.len()).unwrap_or(0);
            Some(Ok(Value::Real(size as f64)))
        }

        "ds_list_create" => Some(Ok(Value::Real(rt.ds.create_list() as f64))),
        "ds_list_destroy" => {
            let handle = c.int(0);
            if let Some(slot) = usize::try_from(handle).ok().and_then(|h| rt.ds.lists.get_mut(h)) {
                *slot = None;
            }
            ok
        }
        "ds_list_clear" => {
            if let Some(list) = rt.ds.list(c.int(0)) {
                list.clear();
            }
            ok
        }
        "ds_list_add" => {
            let values: Vec<Value> = c.args.iter().skip(1).cloned().collect();
            if let Some(list) = rt.ds.list(c.int(0)) {
                list.extend(values);
            }
            ok
        }
        "ds_list_insert" => {
            let pos = c.int(1).max(0) as usize;
            let value = c.arg(2);
            if let Some(list) = rt.ds.list(c.int(0)) {
                let pos = pos.min(list.len());
                list.insert(pos, value);
            }
            ok
        }
        "ds_list_replace" => {
            let pos = c.int(1);
            let value = c.arg(2);
            if let Some(list) = rt.ds.list(c.int(0)) {
                if let Some(slot) = usize::try_from(pos).ok().and_then(|p| list.get_mut(p)) {
                    *slot = value;
                }
            }
            ok
        }
        "ds_list_delete" => {
            let pos = c.int(1);
            if let Some(list) = rt.ds.list(c.int(0)) {
                if let Ok(p) = usize::try_from(pos) {
                    if p < list.len() {
                        list.remove(p);
                    }
                }
            }
            ok
        }
        "ds_list_find_value" => {
            let pos = c.int(1);
            let value = rt
                .ds
                .list(c.int(0))
                .and_then(|l| usize::try_from(pos).ok().and_then(|p| l.get(p).cloned()))
                .unwrap_or(Value::Undefined);
            Some(Ok(value))
        }
        "ds_list_find_index" => {
            let needle = c.arg(1);
            let index = rt
                .ds
                .list(c.int(0))
                .and_then(|l| l.iter().position(|v| v.gml_eq(&needle)))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            Some(Ok(Value::Real(index)))
        }
        "ds_list_size" => {
            let size = rt.ds.list(c.int(0)).map(|l| l.len()).unwrap_or(0);
            Some(Ok(Value::Real(size as f64)))
        }
        _ => None,
    }
}
