//! Capability interface between the runner and a logic module.

use anyhow::Result;

use crate::core::memory::SharedMemory;
use crate::host::Host;

/// Everything a module may touch during one tick.
pub struct TickContext<'a, H: Host> {
    /// Reset to empty by the runner before every tick.
    pub memory: &'a mut SharedMemory,
    pub host: &'a mut H,
}

/// A loaded logic module.
///
/// The runner calls `initialize` once after loading, then `setup` once when
/// enabled, then `tick` every cycle until any of them fails or panics.
pub trait LogicModule<H: Host> {
    fn initialize(&mut self) -> Result<()>;

    /// Optional one-time setup. Must be safe to call again on a reloaded module.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn tick(&mut self, cx: &mut TickContext<'_, H>) -> Result<()>;
}

/// Produces fresh module instances on demand.
pub trait ModuleLoader<H: Host> {
    fn load(&mut self) -> Result<Box<dyn LogicModule<H>>>;
}

impl<H, F> ModuleLoader<H> for F
where
    H: Host,
    F: FnMut() -> Result<Box<dyn LogicModule<H>>>,
{
    fn load(&mut self) -> Result<Box<dyn LogicModule<H>>> {
        self()
    }
}
