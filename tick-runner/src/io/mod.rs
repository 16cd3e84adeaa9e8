//! I/O helpers for tick-runner commands.

pub mod config;
pub mod init;
pub mod raw_memory;
