//! The built-in function registry.
//!
//! A name-keyed dispatch over function families; the VM lands here for every
//! non-script call. Unknown names are fatal with the name and argument count
//! in the diagnostic.

mod actions;
mod draw;
mod ds;
mod instances;
mod keyboard;
mod math;
mod paths;
mod rooms;
mod scripts;
mod strings;
mod stubs;

use crate::error::{Result, RuntimeError};
use crate::runtime::Runtime;
use crate::value::Value;

/// Call context handed to every built-in.
#[derive(Clone, Copy)]
pub struct CallCtx<'a> {
    pub self_id: i32,
    pub other_id: i32,
    pub args: &'a [Value],
}

impl<'a> CallCtx<'a> {
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or(Value::Undefined)
    }

    pub fn real(&self, i: usize) -> f64 {
        self.args
            .get(i)
            .and_then(|v| v.as_real().ok())
            .unwrap_or(0.0)
    }

    pub fn int(&self, i: usize) -> i32 {
        self.real(i).floor() as i32
    }

    pub fn string(&self, i: usize) -> String {
        self.args
            .get(i)
            .and_then(|v| v.as_string().ok())
            .unwrap_or_default()
    }
}

/// Construct the fatal diagnostic for a built-in; the VM rewrites the code
/// entry and ip at the call site.
pub fn builtin_error(name: &str, message: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Vm {
        message: format!("{name}: {message}"),
        code_entry: String::new(),
        ip: 0,
    }
}

/// Dispatch a built-in call by name.
pub fn call(
    rt: &mut Runtime,
    name: &str,
    self_id: i32,
    other_id: i32,
    args: &[Value],
) -> Result<Value> {
    let ctx = CallCtx {
        self_id,
        other_id,
        args,
    };
    type Family = for<'a> fn(&mut Runtime, &str, CallCtx<'a>) -> Option<Result<Value>>;
    let families: [Family; 11] = [
        math::dispatch,
        strings::dispatch,
        draw::dispatch,
        instances::dispatch,
        rooms::dispatch,
        keyboard::dispatch,
        ds::dispatch,
        scripts::dispatch,
        paths::dispatch,
        actions::dispatch,
        stubs::dispatch,
    ];
    for family in families {
        if let Some(result) = family(rt, name, ctx) {
            return result;
        }
    }
    Err(RuntimeError::Vm {
        message: format!("unknown built-in function {name} (argc {})", args.len()),
        code_entry: String::new(),
        ip: 0,
    })
}
