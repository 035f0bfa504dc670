//! Runtime core for re-executing shipped GameMaker: Studio 1.x titles
//! (bytecode 16).
//!
//! The pipeline: [`assets::GameData`] decodes the FORM container into the
//! resolved asset graph; [`game::Game`] owns the [`runtime::Runtime`] and
//! drives the per-frame phase order; [`vm`] interprets event and script
//! bytecode against the runtime; [`render::Renderer`] is the drawing
//! contract, with a deterministic software implementation for headless use.

pub mod assets;
pub mod builtins;
pub mod drawing;
pub mod error;
pub mod events;
pub mod game;
pub mod input;
pub mod instance;
pub mod render;
pub mod rng;
pub mod runtime;
pub mod value;
pub mod vm;

pub use error::{Result, RuntimeError};
pub use game::{Game, GameOptions};
