//! The bytecode interpreter: a stack machine executing decoded instructions
//! against the runtime state.

pub mod vars;

use std::collections::HashMap;
use std::rc::Rc;

use datawin::bytecode::{self, ComparisonKind, DataType, Instruction, Opcode, Operand, ScopeCode};

use crate::builtins;
use crate::error::{Result, RuntimeError};
use crate::instance::FIRST_INSTANCE_ID;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::vm::vars::InstanceVar;

/// `popenv` with this branch operand discards the environment frame without
/// iterating (a `break` out of `with`).
const POPENV_MAGIC: i32 = -1048576 * 4;

/// Two-dimensional array indices are packed as `row * 32000 + col`.
const ARRAY_ROW_STRIDE: i32 = 32000;

/// A decoded code entry, cached after first execution.
pub struct DecodedCode {
    pub name: String,
    pub instructions: Vec<Instruction>,
    /// Byte offset → instruction index, for branch targets.
    pub by_offset: HashMap<usize, usize>,
}

/// A `with` iteration frame.
struct EnvFrame {
    targets: Vec<u32>,
    pos: usize,
    saved_self: i32,
    saved_other: i32,
}

/// Storage target for a variable access.
enum Target {
    SelfScope,
    OtherScope,
    Global,
    Builtin,
    Local,
    Instance(u32),
    /// Write applies to every live instance of the object; reads use the
    /// first one.
    Object(i32),
    /// `all`: writes hit every live instance, reads use the first.
    AllInstances,
    Nothing,
}

fn decode_entry(rt: &mut Runtime, code_index: u32) -> Result<Rc<DecodedCode>> {
    if let Some(cached) = rt.code_cache.get(&code_index) {
        return Ok(cached.clone());
    }
    let entry = rt
        .data
        .code
        .get(code_index as usize)
        .ok_or(RuntimeError::AssetRef {
            context: "code entry",
            index: code_index as i64,
        })?;
    let bytes = rt.data.bytecode(code_index).ok_or(RuntimeError::AssetRef {
        context: "code bytecode span",
        index: code_index as i64,
    })?;
    let instructions = bytecode::decode(bytes).map_err(|e| RuntimeError::Vm {
        message: e.to_string(),
        code_entry: entry.name.clone(),
        ip: 0,
    })?;
    let by_offset = instructions
        .iter()
        .enumerate()
        .map(|(i, inst)| (inst.offset, i))
        .collect();
    let decoded = Rc::new(DecodedCode {
        name: entry.name.clone(),
        instructions,
        by_offset,
    });
    rt.code_cache.insert(code_index, decoded.clone());
    Ok(decoded)
}

/// Execute a code entry to completion and return its result (`Undefined`
/// when the code falls off the end or `exit`s).
pub fn execute_code(
    rt: &mut Runtime,
    code_index: u32,
    self_id: i32,
    other_id: i32,
    args: &[Value],
) -> Result<Value> {
    let code = decode_entry(rt, code_index)?;
    let trace = rt.trace.instructions.matches(&code.name);

    let mut stack: Vec<Value> = Vec::with_capacity(16);
    let mut locals: HashMap<u32, Value> = HashMap::new();
    let mut env: Vec<EnvFrame> = Vec::new();
    let mut self_id = self_id;
    let mut other_id = other_id;
    let args: Vec<Value> = args.to_vec();
    let mut ip = 0usize;

    macro_rules! vm_err {
        ($inst:expr, $($fmt:tt)*) => {
            RuntimeError::Vm {
                message: format!($($fmt)*),
                code_entry: code.name.clone(),
                ip: $inst.offset,
            }
        };
    }

    while ip < code.instructions.len() {
        let inst = &code.instructions[ip];
        if trace {
            tracing::trace!(
                entry = %code.name,
                offset = inst.offset,
                op = inst.opcode.mnemonic(),
                "exec"
            );
        }

        let mut next_ip = ip + 1;
        match inst.opcode {
            Opcode::Conv => {
                let v = pop(&mut stack, &code, inst)?;
                stack.push(convert(v, inst.type2, &code, inst)?);
            }

            Opcode::Add => {
                let b = pop(&mut stack, &code, inst)?;
                let a = pop(&mut stack, &code, inst)?;
                let result = match (&a, &b) {
                    (Value::Str(x), Value::Str(y)) => {
                        Value::string(format!("{x}{y}"))
                    }
                    (Value::Str(_), _) | (_, Value::Str(_)) => {
                        return Err(vm_err!(inst, "cannot add {} and {}", a.type_name(), b.type_name()))
                    }
                    _ => Value::Real(as_real(&a, &code, inst)? + as_real(&b, &code, inst)?),
                };
                stack.push(result);
            }
            Opcode::Sub => binary_real(&mut stack, &code, inst, |a, b| a - b)?,
            Opcode::Mul => binary_real(&mut stack, &code, inst, |a, b| a * b)?,
            Opcode::Div => {
                let b = pop_real(&mut stack, &code, inst)?;
                let a = pop_real(&mut stack, &code, inst)?;
                let result = if b == 0.0 {
                    div_zero_sentinel(inst)
                } else {
                    a / b
                };
                stack.push(Value::Real(result));
            }
            Opcode::Rem => {
                let b = pop_real(&mut stack, &code, inst)?;
                let a = pop_real(&mut stack, &code, inst)?;
                let result = if b == 0.0 {
                    div_zero_sentinel(inst)
                } else {
                    a % b
                };
                stack.push(Value::Real(result));
            }
            Opcode::Mod => {
                let b = pop_real(&mut stack, &code, inst)?;
                let a = pop_real(&mut stack, &code, inst)?;
                // GML mod keeps the dividend's sign.
                let result = if b == 0.0 {
                    div_zero_sentinel(inst)
                } else {
                    a % b
                };
                stack.push(Value::Real(result));
            }
            Opcode::And => binary_bits(&mut stack, &code, inst, |a, b| a & b, bool_and)?,
            Opcode::Or => binary_bits(&mut stack, &code, inst, |a, b| a | b, bool_or)?,
            Opcode::Xor => binary_bits(&mut stack, &code, inst, |a, b| a ^ b, bool_xor)?,
            Opcode::Shl => binary_real(&mut stack, &code, inst, |a, b| {
                ((a as i64) << ((b as i64) & 63)) as f64
            })?,
            Opcode::Shr => binary_real(&mut stack, &code, inst, |a, b| {
                ((a as i64) >> ((b as i64) & 63)) as f64
            })?,

            Opcode::Neg => {
                let v = pop_real(&mut stack, &code, inst)?;
                stack.push(Value::Real(-v));
            }
            Opcode::Not => {
                let v = pop(&mut stack, &code, inst)?;
                let result = if inst.type1 == DataType::Bool {
                    Value::bool(!v.is_truthy())
                } else {
                    Value::Real(!(as_real(&v, &code, inst)? as i64) as f64)
                };
                stack.push(result);
            }

            Opcode::Cmp => {
                let b = pop(&mut stack, &code, inst)?;
                let a = pop(&mut stack, &code, inst)?;
                let Operand::Comparison(kind) = inst.operand else {
                    return Err(vm_err!(inst, "cmp without comparison kind"));
                };
                let result = match kind {
                    ComparisonKind::Equal => a.gml_eq(&b),
                    ComparisonKind::NotEqual => !a.gml_eq(&b),
                    rel => {
                        let ord = a
                            .gml_cmp(&b)
                            .map_err(|e| vm_err!(inst, "{e}"))?;
                        match rel {
                            ComparisonKind::Less => ord.is_lt(),
                            ComparisonKind::LessEqual => ord.is_le(),
                            ComparisonKind::GreaterEqual => ord.is_ge(),
                            ComparisonKind::Greater => ord.is_gt(),
                            _ => unreachable!(),
                        }
                    }
                };
                stack.push(Value::bool(result));
            }

            Opcode::Dup => {
                let Operand::Dup(extra) = inst.operand else {
                    return Err(vm_err!(inst, "dup without size"));
                };
                let n = extra as usize + 1;
                if stack.len() < n {
                    return Err(vm_err!(inst, "stack underflow in dup"));
                }
                let start = stack.len() - n;
                for i in 0..n {
                    let v = stack[start + i].clone();
                    stack.push(v);
                }
            }

            Opcode::PushI | Opcode::Push | Opcode::PushLoc | Opcode::PushGlb | Opcode::PushBltn => {
                let v = match &inst.operand {
                    Operand::Int16(v) => Value::Real(*v as f64),
                    Operand::Int32(v) => Value::Real(*v as f64),
                    Operand::Int64(v) => Value::Real(*v as f64),
                    Operand::Double(v) => Value::Real(*v),
                    Operand::Float(v) => Value::Real(*v as f64),
                    Operand::Bool(v) => Value::bool(*v),
                    Operand::StringIndex(idx) => {
                        let s = rt
                            .data
                            .strings
                            .get(*idx as usize)
                            .ok_or_else(|| vm_err!(inst, "string index {idx} out of range"))?;
                        Value::string(s.as_str())
                    }
                    Operand::Variable { var_ref, scope } => {
                        let ctx = VarCtx {
                            self_id,
                            other_id,
                            args: &args,
                        };
                        read_variable(
                            rt,
                            &mut stack,
                            &mut locals,
                            ctx,
                            *var_ref,
                            *scope,
                            &code,
                            inst,
                        )?
                    }
                    other => return Err(vm_err!(inst, "bad push operand {other:?}")),
                };
                stack.push(v);
            }

            Opcode::Pop => {
                let Operand::Variable { var_ref, scope } = inst.operand else {
                    return Err(vm_err!(inst, "pop without variable operand"));
                };
                let ctx = VarCtx {
                    self_id,
                    other_id,
                    args: &args,
                };
                write_variable(rt, &mut stack, &mut locals, ctx, var_ref, scope, &code, inst)?;
            }
            Opcode::Popz => {
                pop(&mut stack, &code, inst)?;
            }

            Opcode::B => {
                next_ip = branch_target(&code, inst)?;
            }
            Opcode::Bt => {
                let v = pop(&mut stack, &code, inst)?;
                if v.is_truthy() {
                    next_ip = branch_target(&code, inst)?;
                }
            }
            Opcode::Bf => {
                let v = pop(&mut stack, &code, inst)?;
                if !v.is_truthy() {
                    next_ip = branch_target(&code, inst)?;
                }
            }

            Opcode::PushEnv => {
                let target = pop(&mut stack, &code, inst)?;
                let targets = resolve_env_targets(rt, &target, self_id, other_id);
                if targets.is_empty() {
                    // No instances: skip the body entirely.
                    next_ip = branch_target(&code, inst)?;
                } else {
                    let first = targets[0];
                    env.push(EnvFrame {
                        targets,
                        pos: 0,
                        saved_self: self_id,
                        saved_other: other_id,
                    });
                    other_id = self_id;
                    self_id = first as i32;
                }
            }
            Opcode::PopEnv => {
                let magic = matches!(inst.operand, Operand::Branch(b) if b == POPENV_MAGIC);
                let Some(frame) = env.last_mut() else {
                    return Err(vm_err!(inst, "popenv without pushenv"));
                };
                if magic {
                    let frame = env.pop().expect("frame checked above");
                    self_id = frame.saved_self;
                    other_id = frame.saved_other;
                } else {
                    // Advance past destroyed instances; created ones were
                    // never in the snapshot.
                    frame.pos += 1;
                    while frame.pos < frame.targets.len() {
                        let id = frame.targets[frame.pos];
                        match rt.instances.get(id) {
                            Some(i) if !i.destroyed => break,
                            _ => frame.pos += 1,
                        }
                    }
                    if frame.pos < frame.targets.len() {
                        self_id = frame.targets[frame.pos] as i32;
                        next_ip = branch_target(&code, inst)?;
                    } else {
                        let frame = env.pop().expect("frame checked above");
                        self_id = frame.saved_self;
                        other_id = frame.saved_other;
                    }
                }
            }

            Opcode::Call => {
                let Operand::Call { function_id, argc } = inst.operand else {
                    return Err(vm_err!(inst, "call without function operand"));
                };
                let name = rt
                    .data
                    .functions
                    .get(function_id as usize)
                    .cloned()
                    .ok_or_else(|| vm_err!(inst, "function id {function_id} out of range"))?;
                let mut call_args = Vec::with_capacity(argc as usize);
                for _ in 0..argc {
                    call_args.push(pop(&mut stack, &code, inst)?);
                }

                if rt.trace.calls.matches(&name) && !rt.trace.ignore_calls.contains(&name) {
                    tracing::debug!(call = %name, argc, entry = %code.name, "call");
                }

                let result = if let Some(&script) = rt.data.script_by_name.get(&name) {
                    let code_id = rt.data.scripts[script as usize].code_id;
                    execute_code(rt, code_id, self_id, other_id, &call_args)?
                } else {
                    builtins::call(rt, &name, self_id, other_id, &call_args).map_err(|e| {
                        match e {
                            RuntimeError::Vm { message, .. } => RuntimeError::Vm {
                                message,
                                code_entry: code.name.clone(),
                                ip: inst.offset,
                            },
                            other => other,
                        }
                    })?
                };
                stack.push(result);
            }
            Opcode::CallV => {
                return Err(vm_err!(inst, "indirect calls are not part of bytecode 16"));
            }

            Opcode::Break => {
                // Signal opcodes carry no semantics in bytecode 16.
            }

            Opcode::Ret => {
                return pop(&mut stack, &code, inst);
            }
            Opcode::Exit => {
                return Ok(Value::Undefined);
            }
        }
        ip = next_ip;
    }

    Ok(Value::Undefined)
}

struct VarCtx<'a> {
    self_id: i32,
    other_id: i32,
    args: &'a [Value],
}

fn pop(stack: &mut Vec<Value>, code: &DecodedCode, inst: &Instruction) -> Result<Value> {
    stack.pop().ok_or_else(|| RuntimeError::Vm {
        message: "stack underflow".into(),
        code_entry: code.name.clone(),
        ip: inst.offset,
    })
}

fn as_real(v: &Value, code: &DecodedCode, inst: &Instruction) -> Result<f64> {
    v.as_real().map_err(|e| RuntimeError::Vm {
        message: e.to_string(),
        code_entry: code.name.clone(),
        ip: inst.offset,
    })
}

fn pop_real(stack: &mut Vec<Value>, code: &DecodedCode, inst: &Instruction) -> Result<f64> {
    let v = pop(stack, code, inst)?;
    as_real(&v, code, inst)
}

fn binary_real(
    stack: &mut Vec<Value>,
    code: &DecodedCode,
    inst: &Instruction,
    f: impl Fn(f64, f64) -> f64,
) -> Result<()> {
    let b = pop_real(stack, code, inst)?;
    let a = pop_real(stack, code, inst)?;
    stack.push(Value::Real(f(a, b)));
    Ok(())
}

fn bool_and(a: bool, b: bool) -> bool {
    a && b
}
fn bool_or(a: bool, b: bool) -> bool {
    a || b
}
fn bool_xor(a: bool, b: bool) -> bool {
    a != b
}

/// Bitwise on integers, logical when both operand types are Bool.
fn binary_bits(
    stack: &mut Vec<Value>,
    code: &DecodedCode,
    inst: &Instruction,
    bits: impl Fn(i64, i64) -> i64,
    logic: fn(bool, bool) -> bool,
) -> Result<()> {
    let b = pop(stack, code, inst)?;
    let a = pop(stack, code, inst)?;
    let result = if inst.type1 == DataType::Bool && inst.type2 == DataType::Bool {
        Value::bool(logic(a.is_truthy(), b.is_truthy()))
    } else {
        let x = as_real(&a, code, inst)? as i64;
        let y = as_real(&b, code, inst)? as i64;
        Value::Real(bits(x, y) as f64)
    };
    stack.push(result);
    Ok(())
}

fn is_int_type(t: DataType) -> bool {
    matches!(t, DataType::Int16 | DataType::Int32 | DataType::Int64)
}

/// Division-family by-zero sentinel: 0 for integer operands, +inf for real.
fn div_zero_sentinel(inst: &Instruction) -> f64 {
    if is_int_type(inst.type1) && is_int_type(inst.type2) {
        0.0
    } else {
        f64::INFINITY
    }
}

fn convert(v: Value, target: DataType, code: &DecodedCode, inst: &Instruction) -> Result<Value> {
    Ok(match target {
        DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            Value::Real(as_real(&v, code, inst)?.round_ties_even())
        }
        DataType::Bool => Value::bool(v.is_truthy()),
        DataType::String => {
            let s = v.as_string().map_err(|e| RuntimeError::Vm {
                message: e.to_string(),
                code_entry: code.name.clone(),
                ip: inst.offset,
            })?;
            Value::string(s)
        }
        // Double/Float/Variable keep the value as-is.
        _ => v,
    })
}

fn branch_target(code: &DecodedCode, inst: &Instruction) -> Result<usize> {
    let Operand::Branch(delta) = inst.operand else {
        return Err(RuntimeError::Vm {
            message: "branch without target".into(),
            code_entry: code.name.clone(),
            ip: inst.offset,
        });
    };
    let target = inst.offset as i64 + delta as i64;
    if target == code.instructions.last().map(|i| (i.offset + i.size) as i64).unwrap_or(0) {
        // Branch to one past the last instruction: exit.
        return Ok(code.instructions.len());
    }
    code.by_offset
        .get(&(target as usize))
        .copied()
        .ok_or_else(|| RuntimeError::Vm {
            message: format!("branch to unaligned offset {target:#x}"),
            code_entry: code.name.clone(),
            ip: inst.offset,
        })
}

/// Resolve a `with` target expression into a snapshot of instance ids.
fn resolve_env_targets(rt: &Runtime, target: &Value, self_id: i32, other_id: i32) -> Vec<u32> {
    let v = match target.as_real() {
        Ok(r) => r as i64,
        Err(_) => return Vec::new(),
    };
    match v {
        -1 => live_singleton(rt, self_id),
        -2 => live_singleton(rt, other_id),
        -3 => rt.instances.ids(),
        -4 => Vec::new(),
        id if id >= FIRST_INSTANCE_ID as i64 => live_singleton(rt, id as i32),
        obj if obj >= 0 && (obj as usize) < rt.data.objects.len() => {
            rt.instances.ids_of_object(obj as i32, &rt.data)
        }
        _ => Vec::new(),
    }
}

fn live_singleton(rt: &Runtime, id: i32) -> Vec<u32> {
    if id >= 0 {
        match rt.instances.get(id as u32) {
            Some(i) if !i.destroyed => vec![id as u32],
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    }
}

/// Split a packed array index into (row, col).
fn unpack_index(idx: i32) -> (i32, i32) {
    if idx >= ARRAY_ROW_STRIDE {
        (idx / ARRAY_ROW_STRIDE, idx % ARRAY_ROW_STRIDE)
    } else {
        (0, idx)
    }
}

#[allow(clippy::too_many_arguments)]
fn read_variable(
    rt: &mut Runtime,
    stack: &mut Vec<Value>,
    locals: &mut HashMap<u32, Value>,
    ctx: VarCtx,
    var_ref: datawin::bytecode::VariableRef,
    scope: i16,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<Value> {
    let def = rt
        .data
        .variables
        .get(var_ref.slot as usize)
        .ok_or_else(|| RuntimeError::Vm {
            message: format!("variable slot {} out of range", var_ref.slot),
            code_entry: code.name.clone(),
            ip: inst.offset,
        })?;
    let name = def.name.clone();

    if var_ref.is_array() {
        // Array access pops (index, then the explicitly pushed target).
        let idx = pop_real(stack, code, inst)? as i32;
        let target_v = pop_real(stack, code, inst)? as i32;
        if idx < 0 {
            return Err(RuntimeError::Vm {
                message: format!("negative array index {idx} on {name}"),
                code_entry: code.name.clone(),
                ip: inst.offset,
            });
        }
        let (row, col) = unpack_index(idx);
        let target = resolve_target(rt, target_v, &ctx, code, inst)?;
        return read_array_cell(rt, locals, &ctx, target, var_ref.slot, &name, row, col, code, inst);
    }

    let scope_code = ScopeCode::from_i16(scope);
    match scope_code {
        Some(ScopeCode::Local) => Ok(locals.get(&var_ref.slot).cloned().unwrap_or(Value::Undefined)),
        Some(ScopeCode::Arg) => Ok(read_argument(&name, ctx.args)),
        Some(ScopeCode::Global) => {
            if let Some(v) = vars::read_global_builtin(rt, &name, 0) {
                Ok(v)
            } else {
                Ok(rt.globals.get(&var_ref.slot).cloned().unwrap_or(Value::Undefined))
            }
        }
        Some(ScopeCode::Builtin) => {
            if name == "argument_count" {
                return Ok(Value::Real(ctx.args.len() as f64));
            }
            if let Some(v) = read_argument_opt(&name, ctx.args) {
                return Ok(v);
            }
            if let Some(var) = InstanceVar::from_name(&name) {
                return read_on_instance(rt, ctx.self_id, var, 0, code, inst);
            }
            if let Some(v) = vars::read_global_builtin(rt, &name, 0) {
                return Ok(v);
            }
            Ok(rt
                .named_globals
                .get(&name)
                .cloned()
                .unwrap_or(Value::Undefined))
        }
        Some(ScopeCode::Own) => read_instance_slot(rt, ctx.self_id, var_ref.slot, &name, code, inst),
        Some(ScopeCode::Other) => read_instance_slot(rt, ctx.other_id, var_ref.slot, &name, code, inst),
        Some(ScopeCode::Stacktop) => {
            let target_v = pop_real(stack, code, inst)? as i32;
            match resolve_target(rt, target_v, &ctx, code, inst)? {
                Target::Instance(id) => read_instance_slot(rt, id as i32, var_ref.slot, &name, code, inst),
                Target::Object(obj) => {
                    let ids = rt.instances.ids_of_object(obj, &rt.data);
                    match ids.first() {
                        Some(&id) => read_instance_slot(rt, id as i32, var_ref.slot, &name, code, inst),
                        None => Ok(Value::Undefined),
                    }
                }
                Target::Global => Ok(rt.globals.get(&var_ref.slot).cloned().unwrap_or(Value::Undefined)),
                Target::SelfScope => read_instance_slot(rt, ctx.self_id, var_ref.slot, &name, code, inst),
                Target::OtherScope => read_instance_slot(rt, ctx.other_id, var_ref.slot, &name, code, inst),
                Target::Local => Ok(locals.get(&var_ref.slot).cloned().unwrap_or(Value::Undefined)),
                Target::AllInstances => match rt.instances.ids().first() {
                    Some(&id) => read_instance_slot(rt, id as i32, var_ref.slot, &name, code, inst),
                    None => Ok(Value::Undefined),
                },
                Target::Builtin | Target::Nothing => Ok(Value::Undefined),
            }
        }
        Some(ScopeCode::All) => match rt.instances.ids().first() {
            Some(&id) => read_instance_slot(rt, id as i32, var_ref.slot, &name, code, inst),
            None => Ok(Value::Undefined),
        },
        Some(ScopeCode::Noone) => Ok(Value::Undefined),
        None if scope >= 0 => {
            // Object-index scope: read from the first live instance.
            let ids = rt.instances.ids_of_object(scope as i32, &rt.data);
            match ids.first() {
                Some(&id) => read_instance_slot(rt, id as i32, var_ref.slot, &name, code, inst),
                None => Ok(Value::Undefined),
            }
        }
        _ => Err(RuntimeError::Vm {
            message: format!("unhandled variable scope {scope} for {name}"),
            code_entry: code.name.clone(),
            ip: inst.offset,
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_variable(
    rt: &mut Runtime,
    stack: &mut Vec<Value>,
    locals: &mut HashMap<u32, Value>,
    ctx: VarCtx,
    var_ref: datawin::bytecode::VariableRef,
    scope: i16,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<()> {
    let def = rt
        .data
        .variables
        .get(var_ref.slot as usize)
        .ok_or_else(|| RuntimeError::Vm {
            message: format!("variable slot {} out of range", var_ref.slot),
            code_entry: code.name.clone(),
            ip: inst.offset,
        })?;
    let name = def.name.clone();

    if var_ref.is_array() {
        let idx = pop_real(stack, code, inst)? as i32;
        let target_v = pop_real(stack, code, inst)? as i32;
        let value = pop(stack, code, inst)?;
        if idx < 0 {
            return Err(RuntimeError::Vm {
                message: format!("negative array index {idx} on {name}"),
                code_entry: code.name.clone(),
                ip: inst.offset,
            });
        }
        let (row, col) = unpack_index(idx);
        let target = resolve_target(rt, target_v, &ctx, code, inst)?;
        return write_array_cell(rt, locals, &ctx, target, var_ref.slot, &name, row, col, value);
    }

    let value = pop(stack, code, inst)?;
    let scope_code = ScopeCode::from_i16(scope);
    match scope_code {
        Some(ScopeCode::Local) => {
            locals.insert(var_ref.slot, value);
            Ok(())
        }
        Some(ScopeCode::Global) => {
            if !vars::write_global_builtin(rt, &name, 0, &value) {
                rt.globals.insert(var_ref.slot, value);
            }
            Ok(())
        }
        Some(ScopeCode::Builtin) => {
            if let Some(var) = InstanceVar::from_name(&name) {
                write_on_instance(rt, ctx.self_id, var, 0, &value);
                return Ok(());
            }
            if !vars::write_global_builtin(rt, &name, 0, &value) {
                rt.named_globals.insert(name, value);
            }
            Ok(())
        }
        Some(ScopeCode::Own) => {
            write_instance_slot(rt, ctx.self_id, var_ref.slot, &name, value);
            Ok(())
        }
        Some(ScopeCode::Other) => {
            write_instance_slot(rt, ctx.other_id, var_ref.slot, &name, value);
            Ok(())
        }
        Some(ScopeCode::Stacktop) => {
            let target_v = pop_real(stack, code, inst)? as i32;
            match resolve_target(rt, target_v, &ctx, code, inst)? {
                Target::Instance(id) => write_instance_slot(rt, id as i32, var_ref.slot, &name, value),
                Target::Object(obj) => {
                    for id in rt.instances.ids_of_object(obj, &rt.data) {
                        write_instance_slot(rt, id as i32, var_ref.slot, &name, value.clone());
                    }
                }
                Target::Global => {
                    if !vars::write_global_builtin(rt, &name, 0, &value) {
                        rt.globals.insert(var_ref.slot, value);
                    }
                }
                Target::SelfScope => write_instance_slot(rt, ctx.self_id, var_ref.slot, &name, value),
                Target::OtherScope => write_instance_slot(rt, ctx.other_id, var_ref.slot, &name, value),
                Target::Local => {
                    locals.insert(var_ref.slot, value);
                }
                Target::AllInstances => {
                    for id in rt.instances.ids() {
                        write_instance_slot(rt, id as i32, var_ref.slot, &name, value.clone());
                    }
                }
                Target::Builtin | Target::Nothing => {}
            }
            Ok(())
        }
        Some(ScopeCode::All) => {
            for id in rt.instances.ids() {
                write_instance_slot(rt, id as i32, var_ref.slot, &name, value.clone());
            }
            Ok(())
        }
        Some(ScopeCode::Noone) => Ok(()),
        None if scope >= 0 => {
            // Object-index scope: write to every live instance.
            for id in rt.instances.ids_of_object(scope as i32, &rt.data) {
                write_instance_slot(rt, id as i32, var_ref.slot, &name, value.clone());
            }
            Ok(())
        }
        _ => Err(RuntimeError::Vm {
            message: format!("unhandled variable scope {scope} for {name}"),
            code_entry: code.name.clone(),
            ip: inst.offset,
        }),
    }
}

fn read_argument(name: &str, args: &[Value]) -> Value {
    read_argument_opt(name, args).unwrap_or(Value::Undefined)
}

fn read_argument_opt(name: &str, args: &[Value]) -> Option<Value> {
    let idx: usize = name.strip_prefix("argument")?.parse().ok()?;
    Some(args.get(idx).cloned().unwrap_or(Value::Undefined))
}

fn resolve_target(
    rt: &Runtime,
    target_v: i32,
    _ctx: &VarCtx,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<Target> {
    Ok(match target_v {
        -1 => Target::SelfScope,
        -2 => Target::OtherScope,
        -3 => Target::AllInstances,
        -4 => Target::Nothing,
        -5 => Target::Global,
        -6 => Target::Builtin,
        -7 => Target::Local,
        v if v >= FIRST_INSTANCE_ID as i32 => {
            if rt.instances.contains(v as u32) {
                Target::Instance(v as u32)
            } else {
                Target::Nothing
            }
        }
        v if v >= 0 && (v as usize) < rt.data.objects.len() => Target::Object(v),
        v => {
            return Err(RuntimeError::Vm {
                message: format!("invalid variable target {v}"),
                code_entry: code.name.clone(),
                ip: inst.offset,
            })
        }
    })
}

fn read_instance_slot(
    rt: &mut Runtime,
    id: i32,
    slot: u32,
    name: &str,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<Value> {
    if let Some(var) = InstanceVar::from_name(name) {
        return read_on_instance(rt, id, var, 0, code, inst);
    }
    let Some(instance) = (id >= 0).then(|| rt.instances.get(id as u32)).flatten() else {
        return Err(RuntimeError::Vm {
            message: format!("variable {name} read on missing instance {id}"),
            code_entry: code.name.clone(),
            ip: inst.offset,
        });
    };
    Ok(instance.vars.get(&slot).cloned().unwrap_or(Value::Undefined))
}

fn read_on_instance(
    rt: &Runtime,
    id: i32,
    var: InstanceVar,
    col: i32,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<Value> {
    let Some(instance) = (id >= 0).then(|| rt.instances.get(id as u32)).flatten() else {
        return Err(RuntimeError::Vm {
            message: format!("built-in read on missing instance {id}"),
            code_entry: code.name.clone(),
            ip: inst.offset,
        });
    };
    Ok(vars::read_instance_var(rt, instance, var, col))
}

fn write_instance_slot(rt: &mut Runtime, id: i32, slot: u32, name: &str, value: Value) {
    if let Some(var) = InstanceVar::from_name(name) {
        write_on_instance(rt, id, var, 0, &value);
        return;
    }
    if id >= 0 {
        if let Some(instance) = rt.instances.get_mut(id as u32) {
            instance.vars.insert(slot, value);
        }
    }
}

fn write_on_instance(rt: &mut Runtime, id: i32, var: InstanceVar, col: i32, value: &Value) {
    if id >= 0 {
        vars::write_instance_var(rt, id as u32, var, col, value);
    }
}

#[allow(clippy::too_many_arguments)]
fn read_array_cell(
    rt: &mut Runtime,
    locals: &mut HashMap<u32, Value>,
    ctx: &VarCtx,
    target: Target,
    slot: u32,
    name: &str,
    row: i32,
    col: i32,
    code: &DecodedCode,
    inst: &Instruction,
) -> Result<Value> {
    // alarm[] and the view_* arrays are built-in indexed properties, not
    // value arrays.
    if let Some(var) = InstanceVar::from_name(name) {
        let id = match target {
            Target::SelfScope => ctx.self_id,
            Target::OtherScope => ctx.other_id,
            Target::Instance(id) => id as i32,
            Target::Object(obj) => rt
                .instances
                .ids_of_object(obj, &rt.data)
                .first()
                .map(|&i| i as i32)
                .unwrap_or(-1),
            _ => ctx.self_id,
        };
        return read_on_instance(rt, id, var, col, code, inst);
    }
    if matches!(target, Target::Global | Target::Builtin) {
        if let Some(v) = vars::read_global_builtin(rt, name, col) {
            return Ok(v);
        }
    }

    let cell = match target {
        Target::Local => locals.get(&slot).cloned(),
        Target::Global => rt.globals.get(&slot).cloned(),
        Target::Builtin => rt.named_globals.get(name).cloned(),
        Target::SelfScope => instance_slot_value(rt, ctx.self_id, slot),
        Target::OtherScope => instance_slot_value(rt, ctx.other_id, slot),
        Target::Instance(id) => instance_slot_value(rt, id as i32, slot),
        Target::Object(obj) => {
            let id = rt
                .instances
                .ids_of_object(obj, &rt.data)
                .first()
                .copied();
            id.and_then(|i| instance_slot_value(rt, i as i32, slot))
        }
        Target::AllInstances => rt
            .instances
            .ids()
            .first()
            .and_then(|&i| instance_slot_value(rt, i as i32, slot)),
        Target::Nothing => None,
    };
    Ok(cell
        .map(|c| c.array_get(row, col))
        .unwrap_or(Value::Undefined))
}

#[allow(clippy::too_many_arguments)]
fn write_array_cell(
    rt: &mut Runtime,
    locals: &mut HashMap<u32, Value>,
    ctx: &VarCtx,
    target: Target,
    slot: u32,
    name: &str,
    row: i32,
    col: i32,
    value: Value,
) -> Result<()> {
    if let Some(var) = InstanceVar::from_name(name) {
        let id = match target {
            Target::SelfScope => ctx.self_id,
            Target::OtherScope => ctx.other_id,
            Target::Instance(id) => id as i32,
            _ => ctx.self_id,
        };
        write_on_instance(rt, id, var, col, &value);
        return Ok(());
    }
    if matches!(target, Target::Global | Target::Builtin)
        && vars::write_global_builtin(rt, name, col, &value)
    {
        return Ok(());
    }

    match target {
        Target::Local => set_cell(locals.entry(slot).or_insert(Value::Undefined), row, col, &value),
        Target::Global => set_cell(
            rt.globals.entry(slot).or_insert(Value::Undefined),
            row,
            col,
            &value,
        ),
        Target::Builtin => set_cell(
            rt.named_globals
                .entry(name.to_string())
                .or_insert(Value::Undefined),
            row,
            col,
            &value,
        ),
        Target::SelfScope => write_instance_array(rt, ctx.self_id, slot, row, col, value),
        Target::OtherScope => write_instance_array(rt, ctx.other_id, slot, row, col, value),
        Target::Instance(id) => write_instance_array(rt, id as i32, slot, row, col, value),
        Target::Object(obj) => {
            for id in rt.instances.ids_of_object(obj, &rt.data) {
                write_instance_array(rt, id as i32, slot, row, col, value.clone());
            }
        }
        Target::AllInstances => {
            for id in rt.instances.ids() {
                write_instance_array(rt, id as i32, slot, row, col, value.clone());
            }
        }
        Target::Nothing => {}
    }
    Ok(())
}

/// Grow-or-replace: a non-array cell is overwritten with a fresh array
/// before the element write.
fn set_cell(cell: &mut Value, row: i32, col: i32, value: &Value) {
    if !matches!(cell, Value::Array(_)) {
        *cell = Value::new_array();
    }
    cell.array_set(row, col, value.clone());
}

fn instance_slot_value(rt: &Runtime, id: i32, slot: u32) -> Option<Value> {
    (id >= 0)
        .then(|| rt.instances.get(id as u32))
        .flatten()
        .and_then(|i| i.vars.get(&slot).cloned())
}

fn write_instance_array(rt: &mut Runtime, id: i32, slot: u32, row: i32, col: i32, value: Value) {
    if id < 0 {
        return;
    }
    if let Some(instance) = rt.instances.get_mut(id as u32) {
        let cell = instance.vars.entry(slot).or_insert(Value::Undefined);
        if !matches!(cell, Value::Array(_)) {
            *cell = Value::new_array();
        }
        cell.array_set(row, col, value);
    }
}
