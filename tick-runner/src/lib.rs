//! Fault-isolating tick runner for a turn-based game sandbox.
//!
//! Once per cycle the runner resets the shared memory blob, loads a logic
//! module if none is held, and ticks it. Any error or panic raised by the
//! module is logged and converted into a full reload on the next cycle; nothing
//! escapes to the host.
//!
//! - **[`core`]**: Pure, deterministic logic (runner types, shared memory,
//!   console formatting, the sandbox world and its task engine).
//! - **[`io`]**: Side-effecting operations (config and raw memory on disk).
//!
//! [`tick`] drives a [`module::LogicModule`] against a [`host::Host`];
//! [`hive`] is the reference module shipped with the CLI. [`panic_hook`] lets a
//! module's setup turn panics into trace text instead of stderr noise.

pub mod core;
pub mod exit_codes;
pub mod hive;
pub mod host;
pub mod io;
pub mod logging;
pub mod module;
pub mod panic_hook;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tick;
