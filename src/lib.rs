//! The Scrolls of Skelos: a local note-taking library
//!
//! This library provides a JSON-backed archive of text notes and screen
//! captures with tags, plus the interactive command loop that drives it.

mod capture;
mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod storage;
mod types;

// Re-export key components
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use storage::*;
pub use types::*;
