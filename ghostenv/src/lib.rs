//! Temporary, disposable virtual environments for testing pip packages.
//!
//! One invocation owns one environment and drives it through a linear
//! lifecycle with guaranteed cleanup. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (lifecycle state machine, layout,
//!   specifier parsing, test script rendering). No I/O.
//! - **[`io`]**: Side-effecting operations (temp directories, child processes,
//!   Ctrl+C, configuration, console output). The [`io::toolchain::Toolchain`]
//!   trait isolates the interpreter and installer so tests can script them.
//!
//! [`controller`] sequences core logic with I/O to implement `ghostenv run`.

pub mod controller;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
