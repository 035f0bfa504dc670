//! Math and random-number built-ins. IEEE-754 semantics throughout; the
//! random functions draw from the runtime's deterministic generator.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let r = |v: f64| Some(Ok(Value::Real(v)));
    match name {
        "abs" => r(c.real(0).abs()),
        "sign" => r(c.real(0).signum() * if c.real(0) == 0.0 { 0.0 } else { 1.0 }),
        "round" => r(c.real(0).round_ties_even()),
        "floor" => r(c.real(0).floor()),
        "ceil" => r(c.real(0).ceil()),
        "frac" => r(c.real(0).fract()),
        "sqrt" => r(c.real(0).sqrt()),
        "sqr" => r(c.real(0) * c.real(0)),
        "power" => r(c.real(0).powf(c.real(1))),
        "exp" => r(c.real(0).exp()),
        "ln" => r(c.real(0).ln()),
        "log2" => r(c.real(0).log2()),
        "log10" => r(c.real(0).log10()),
        "sin" => r(c.real(0).sin()),
        "cos" => r(c.real(0).cos()),
        "tan" => r(c.real(0).tan()),
        "arcsin" => r(c.real(0).asin()),
        "arccos" => r(c.real(0).acos()),
        "arctan" => r(c.real(0).atan()),
        "arctan2" => r(c.real(0).atan2(c.real(1))),
        "degtorad" => r(c.real(0).to_radians()),
        "radtodeg" => r(c.real(0).to_degrees()),
        "min" => {
            let mut best = c.real(0);
            for i in 1..c.args.len() {
                best = best.min(c.real(i));
            }
            r(best)
        }
        "max" => {
            let mut best = c.real(0);
            for i in 1..c.args.len() {
                best = best.max(c.real(i));
            }
            r(best)
        }
        "clamp" => r(c.real(0).clamp(c.real(1), c.real(2))),
        "lerp" => r(c.real(0) + (c.real(1) - c.real(0)) * c.real(2)),
        "point_distance" => r((c.real(2) - c.real(0)).hypot(c.real(3) - c.real(1))),
        "point_direction" => {
            let mut dir = (-(c.real(3) - c.real(1)))
                .atan2(c.real(2) - c.real(0))
                .to_degrees();
            if dir < 0.0 {
                dir += 360.0;
            }
            r(dir)
        }
        "lengthdir_x" => r(c.real(0) * c.real(1).to_radians().cos()),
        "lengthdir_y" => r(-c.real(0) * c.real(1).to_radians().sin()),

        "random" => r(rt.rng.random(c.real(0))),
        "random_range" => r(rt.rng.random_range(c.real(0), c.real(1))),
        "irandom" => r(rt.rng.irandom(c.int(0)) as f64),
        "irandom_range" => {
            let lo = c.int(0);
            let hi = c.int(1);
            r((lo + rt.rng.irandom(hi - lo)) as f64)
        }
        "choose" => {
            if c.args.is_empty() {
                return Some(Ok(Value::Undefined));
            }
            let idx = rt.rng.irandom(c.args.len() as i32 - 1) as usize;
            Some(Ok(c.arg(idx)))
        }
        "random_get_seed" => r(rt.rng.seed() as f64),
        "random_set_seed" => {
            rt.rng.set_seed(c.real(0) as i64 as u32);
            r(0.0)
        }
        // Deterministic replay: reseed from the frame counter, never from
        // wall time.
        "randomize" => {
            let seed = rt.frame as u32 ^ 0x9E37_79B9;
            rt.rng.set_seed(seed);
            r(seed as f64)
        }
        _ => None,
    }
}
