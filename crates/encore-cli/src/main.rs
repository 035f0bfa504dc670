use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use encore_core::assets::GameData;
use encore_core::game::{Game, GameOptions};
use encore_core::input::InputRecording;
use encore_core::render::software::SoftwareRenderer;
use encore_core::runtime::{TraceConfig, TraceFilter};
use encore_core::RuntimeError;

#[derive(Parser)]
#[command(name = "encore", about = "Re-executes GameMaker: Studio 1.x titles (bytecode 16)")]
struct Cli {
    /// Path to the data container (game.unx / data.win / a PE exe with an
    /// embedded FORM blob).
    #[arg(default_value = "game.unx")]
    data_file: PathBuf,

    /// Enable debug keybindings (PageUp/PageDown cycle rooms, P pauses,
    /// O steps one frame while paused).
    #[arg(long)]
    debug: bool,

    /// Screenshot path pattern; `%s` is replaced by the frame number.
    #[arg(long)]
    screenshot: Option<String>,

    /// Capture a screenshot at this frame (repeatable; enables headless).
    #[arg(long = "screenshot-at-frame")]
    screenshot_at_frame: Vec<u64>,

    /// Start in this room (name or index) instead of the first room.
    #[arg(long)]
    room: Option<String>,

    /// Print room names and exit.
    #[arg(long)]
    list_rooms: bool,

    /// Log event dispatch for instances of this object (repeatable).
    #[arg(long = "debug-obj")]
    debug_obj: Vec<String>,

    /// Trace calls to a function, or `*` for all (repeatable).
    #[arg(long = "trace-calls")]
    trace_calls: Vec<String>,

    /// Exclude a function from `--trace-calls` output (repeatable).
    #[arg(long = "ignore-function-traced-calls")]
    ignore_function_traced_calls: Vec<String>,

    /// Trace event dispatch for an object, or `*` for all (repeatable).
    #[arg(long = "trace-events")]
    trace_events: Vec<String>,

    /// Trace executed instructions in a code entry, or `*` (repeatable).
    #[arg(long = "trace-instructions")]
    trace_instructions: Vec<String>,

    /// Frame pacing multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Record per-frame input to a JSON file.
    #[arg(long = "record-inputs")]
    record_inputs: Option<PathBuf>,

    /// Play back a recorded input file deterministically.
    #[arg(long = "playback-inputs")]
    playback_inputs: Option<PathBuf>,

    /// PRNG seed (replays are bit-identical for the same seed, container,
    /// and input recording).
    #[arg(long, default_value_t = 0)]
    seed: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            // Data-format failures exit 2, runtime failures exit 1.
            let code = err
                .downcast_ref::<RuntimeError>()
                .map(|e| e.exit_code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(&cli.data_file)
        .with_context(|| format!("reading {}", cli.data_file.display()))?;
    let data = Rc::new(GameData::load(&bytes)?);

    if cli.list_rooms {
        for room in &data.rooms {
            println!("{}", room.name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let start_room = match &cli.room {
        None => None,
        Some(arg) => Some(resolve_room(&data, arg)?),
    };

    let playback = match &cli.playback_inputs {
        None => None,
        Some(path) => Some(
            InputRecording::load(path)
                .with_context(|| format!("reading input recording {}", path.display()))?,
        ),
    };

    let headless = !cli.screenshot_at_frame.is_empty();
    let renderer = SoftwareRenderer::new(data.window_width, data.window_height);

    let options = GameOptions {
        seed: cli.seed,
        start_room,
        speed_multiplier: cli.speed.max(0.01),
        headless,
        debug: cli.debug,
        screenshot_pattern: cli.screenshot.clone(),
        screenshot_frames: BTreeSet::from_iter(cli.screenshot_at_frame.iter().copied()),
        record_path: cli.record_inputs.clone(),
        playback,
    };

    let mut game = Game::new(data, Box::new(renderer), options);
    game.rt.trace = TraceConfig {
        calls: TraceFilter::from_args(&cli.trace_calls),
        ignore_calls: cli.ignore_function_traced_calls.into_iter().collect(),
        events: TraceFilter::from_args(&cli.trace_events),
        instructions: TraceFilter::from_args(&cli.trace_instructions),
        debug_objects: cli.debug_obj.into_iter().collect(),
    };

    game.run()?;
    Ok(ExitCode::SUCCESS)
}

fn resolve_room(data: &GameData, arg: &str) -> anyhow::Result<u32> {
    if let Some(index) = data.room_by_name(arg) {
        return Ok(index);
    }
    if let Ok(index) = arg.parse::<u32>() {
        if (index as usize) < data.rooms.len() {
            return Ok(index);
        }
    }
    anyhow::bail!("no room named or numbered {arg:?}");
}
