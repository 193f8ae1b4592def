//! Deterministic, pure logic shared by the environment controller.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod layout;
pub mod lifecycle;
pub mod script;
pub mod specifier;
