//! Side-effect-free stubs for file, INI, audio, and window built-ins, plus
//! the few system functions with real behavior. Stub calls are logged as
//! runtime warnings (rate-limited), never fatal.

use crate::builtins::CallCtx;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn dispatch(rt: &mut Runtime, name: &str, c: CallCtx) -> Option<Result<Value>> {
    match name {
        "show_debug_message" => {
            tracing::info!(target: "game", "{}", c.string(0));
            Some(Ok(Value::Real(0.0)))
        }

        // File and INI access is outside the data container; stubbed with
        // safe defaults.
        "file_exists" | "file_delete" | "ini_section_exists" | "ini_key_exists" => {
            stub(rt, name);
            Some(Ok(Value::bool(false)))
        }
        "ini_open" | "ini_close" | "ini_write_real" | "ini_write_string" | "file_text_open_read"
        | "file_text_open_write" | "file_text_close" | "file_text_write_string"
        | "file_text_writeln" => {
            stub(rt, name);
            Some(Ok(Value::Real(-1.0)))
        }
        "ini_read_real" => {
            stub(rt, name);
            Some(Ok(Value::Real(c.real(2))))
        }
        "ini_read_string" => {
            stub(rt, name);
            Some(Ok(Value::string(c.string(2))))
        }
        "file_text_read_string" | "file_text_readln" => {
            stub(rt, name);
            Some(Ok(Value::string("")))
        }
        "file_text_eof" => {
            stub(rt, name);
            Some(Ok(Value::bool(true)))
        }

        // Audio is stubbed; handles are -1, queries report silence.
        "sound_play" | "sound_loop" | "sound_stop" | "sound_stop_all" | "sound_volume"
        | "audio_play_sound" | "audio_stop_sound" | "audio_stop_all" | "audio_sound_gain"
        | "audio_sound_pitch" | "audio_pause_sound" | "audio_resume_sound"
        | "audio_master_gain" | "caster_load" | "caster_play" | "caster_loop" | "caster_stop"
        | "caster_free" | "caster_set_volume" => {
            stub(rt, name);
            Some(Ok(Value::Real(-1.0)))
        }
        "audio_is_playing" | "caster_is_playing" => {
            stub(rt, name);
            Some(Ok(Value::bool(false)))
        }

        // Window and display management belongs to the shell layer.
        "window_set_caption" | "window_set_fullscreen" | "window_set_size"
        | "window_center" | "display_reset" => {
            stub(rt, name);
            Some(Ok(Value::Real(0.0)))
        }
        "window_get_width" | "display_get_width" => {
            Some(Ok(Value::Real(rt.data.window_width as f64)))
        }
        "window_get_height" | "display_get_height" => {
            Some(Ok(Value::Real(rt.data.window_height as f64)))
        }
        "window_get_fullscreen" => Some(Ok(Value::bool(false))),

        "show_message" => {
            stub(rt, name);
            tracing::info!(target: "game", "message: {}", c.string(0));
            Some(Ok(Value::Real(0.0)))
        }
        "game_save" | "game_load" => {
            stub(rt, name);
            Some(Ok(Value::Real(0.0)))
        }
        _ => None,
    }
}

fn stub(rt: &mut Runtime, name: &str) {
    rt.warn_once("stub call", name.to_string());
}
