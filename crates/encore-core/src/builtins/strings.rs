//! String manipulation and type-check built-ins.
//!
//! GML string positions are 1-based; out-of-range reads yield empty strings.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::{parse_real_prefix, Value};

pub fn dispatch(_rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    let s = |v: String| Some(Ok(Value::string(v)));
    let r = |v: f64| Some(Ok(Value::Real(v)));
    match name {
        "string" => match c.arg(0).as_string() {
            Ok(v) => s(v),
            Err(e) => Some(Err(super::builtin_error(name, e))),
        },
        "real" => r(parse_real_prefix(&c.string(0))),
        "string_length" => r(c.string(0).chars().count() as f64),
        "string_char_at" => {
            let text = c.string(0);
            let pos = c.int(1);
            s(char_range(&text, pos, 1))
        }
        "string_copy" => {
            let text = c.string(0);
            let pos = c.int(1);
            let count = c.int(2);
            s(char_range(&text, pos, count))
        }
        "string_delete" => {
            let text = c.string(0);
            let pos = c.int(1).max(1) as usize;
            let count = c.int(2).max(0) as usize;
            let chars: Vec<char> = text.chars().collect();
            let mut out = String::new();
            for (i, ch) in chars.iter().enumerate() {
                if i + 1 < pos || i + 1 >= pos + count {
                    out.push(*ch);
                }
            }
            s(out)
        }
        "string_insert" => {
            let insert = c.string(0);
            let text = c.string(1);
            let pos = (c.int(2).max(1) as usize - 1).min(text.chars().count());
            let mut out: String = text.chars().take(pos).collect();
            out.push_str(&insert);
            out.extend(text.chars().skip(pos));
            s(out)
        }
        "string_pos" => {
            let needle = c.string(0);
            let haystack = c.string(1);
            let pos = haystack
                .find(&needle)
                .map(|byte| haystack[..byte].chars().count() + 1)
                .unwrap_or(0);
            r(pos as f64)
        }
        "string_replace" => {
            let text = c.string(0);
            let from = c.string(1);
            let to = c.string(2);
            s(text.replacen(&from, &to, 1))
        }
        "string_replace_all" => {
            let text = c.string(0);
            let from = c.string(1);
            let to = c.string(2);
            s(text.replace(&from, &to))
        }
        "string_count" => {
            let needle = c.string(0);
            let haystack = c.string(1);
            if needle.is_empty() {
                return r(0.0);
            }
            r(haystack.matches(&needle).count() as f64)
        }
        "string_lower" => s(c.string(0).to_lowercase()),
        "string_upper" => s(c.string(0).to_uppercase()),
        "string_repeat" => s(c.string(0).repeat(c.int(1).max(0) as usize)),
        "string_letters" => s(c.string(0).chars().filter(|ch| ch.is_alphabetic()).collect()),
        "string_digits" => s(c.string(0).chars().filter(|ch| ch.is_ascii_digit()).collect()),
        "chr" => s(char::from_u32(c.int(0).max(0) as u32)
            .map(String::from)
            .unwrap_or_default()),
        "ord" => r(c.string(0).chars().next().map(|ch| ch as u32 as f64).unwrap_or(0.0)),

        "is_real" => Some(Ok(Value::bool(matches!(c.arg(0), Value::Real(_))))),
        "is_string" => Some(Ok(Value::bool(matches!(c.arg(0), Value::Str(_))))),
        "is_array" => Some(Ok(Value::bool(matches!(c.arg(0), Value::Array(_))))),
        "is_undefined" => Some(Ok(Value::bool(matches!(c.arg(0), Value::Undefined)))),
        _ => None,
    }
}

/// Characters `[pos, pos+count)` with GML's 1-based indexing; out-of-range
/// yields the empty string.
fn char_range(text: &str, pos: i32, count: i32) -> String {
    if pos < 1 || count <= 0 {
        return String::new();
    }
    text.chars()
        .skip(pos as usize - 1)
        .take(count as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::char_range;

    #[test]
    fn copy_is_one_based_and_forgiving() {
        assert_eq!(char_range("hello", 1, 2), "he");
        assert_eq!(char_range("hello", 4, 10), "lo");
        assert_eq!(char_range("hello", 0, 3), "");
        assert_eq!(char_range("hello", 9, 3), "");
        assert_eq!(char_range("hello", 2, -1), "");
    }
}
