//! Deterministic, pure logic shared by the tick runner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod console;
pub mod memory;
pub mod tasks;
pub mod types;
pub mod world;
