//! I/O helpers for ghostenv commands.

pub mod config;
pub mod console;
pub mod editor;
pub mod environment;
pub mod interrupt;
pub mod process;
pub mod toolchain;
