//! CLI module for the scrolls application
//!
//! This module handles startup options, the interactive command loop and the
//! text rendering of notes.
mod app;
mod args;
mod render;

pub use app::*;
pub use args::*;
pub use render::*;
