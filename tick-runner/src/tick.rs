//! Per-cycle orchestration: reset shared memory, load the module when absent,
//! tick it, and recover from any fault by discarding the module.

use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::memory::SharedMemory;
use crate::core::types::{Fault, ModuleState, Phase, TickOutcome};
use crate::host::Host;
use crate::io::config::RunnerConfig;
use crate::module::{LogicModule, ModuleLoader, TickContext};

/// Runner behavior switches, usually taken from [`RunnerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOptions {
    /// Call the module's optional `setup` after `initialize`.
    pub call_setup: bool,
    /// Mirror runner lines to the notification sink as well as the console.
    pub notify: bool,
    /// Emit a `TRACE:` line when the fault carries a backtrace.
    pub include_trace: bool,
}

impl Default for TickOptions {
    fn default() -> Self {
        Self {
            call_setup: true,
            notify: true,
            include_trace: true,
        }
    }
}

impl From<&RunnerConfig> for TickOptions {
    fn from(cfg: &RunnerConfig) -> Self {
        Self {
            call_setup: cfg.call_setup,
            notify: cfg.notify,
            include_trace: cfg.include_trace,
        }
    }
}

/// Summary of a [`TickRunner::run_ticks`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u32,
    pub faults: u32,
    pub final_state: ModuleState,
}

/// Owns the loaded module handle and the shared memory blob.
///
/// Neither escapes: the module is only reachable through [`run_tick`], and
/// memory is exposed read-only between cycles.
///
/// [`run_tick`]: TickRunner::run_tick
pub struct TickRunner<H: Host, L: ModuleLoader<H>> {
    loader: L,
    module: Option<Box<dyn LogicModule<H>>>,
    memory: SharedMemory,
    options: TickOptions,
}

impl<H: Host, L: ModuleLoader<H>> TickRunner<H, L> {
    pub fn new(loader: L, options: TickOptions) -> Self {
        Self {
            loader,
            module: None,
            memory: SharedMemory::default(),
            options,
        }
    }

    pub fn state(&self) -> ModuleState {
        if self.module.is_some() {
            ModuleState::Loaded
        } else {
            ModuleState::Unloaded
        }
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    /// Run one cycle. Never fails and never panics on behalf of the module.
    pub fn run_tick(&mut self, host: &mut H) -> TickOutcome {
        let time = host.time();
        host.console(&format!("GAME TICK {time}"));
        debug!(time, state = ?self.state(), "tick start");

        self.memory.reset();

        let loaded_now = self.module.is_none();
        match self.guarded_tick(host) {
            Ok(()) => TickOutcome::Ran { loaded_now },
            Err(fault) => {
                self.module = None;
                self.report_fault(host, &fault);
                TickOutcome::Faulted(fault)
            }
        }
    }

    /// Run `count` cycles, advancing the host clock after each one.
    pub fn run_ticks<F>(&mut self, host: &mut H, count: u32, mut on_tick: F) -> RunSummary
    where
        F: FnMut(&mut H, &TickOutcome),
    {
        let mut faults = 0u32;
        for _ in 0..count {
            let outcome = self.run_tick(host);
            if outcome.is_fault() {
                faults += 1;
            }
            on_tick(host, &outcome);
            host.advance();
        }
        RunSummary {
            ticks: count,
            faults,
            final_state: self.state(),
        }
    }

    fn guarded_tick(&mut self, host: &mut H) -> Result<(), Fault> {
        let module = match self.module.take() {
            Some(module) => module,
            None => {
                self.announce(host, "Loading code");
                let module = self.load_module()?;
                info!(time = host.time(), "logic module loaded");
                module
            }
        };
        let module = self.module.insert(module);
        let mut cx = TickContext {
            memory: &mut self.memory,
            host,
        };
        guard(Phase::Tick, || module.tick(&mut cx))
    }

    fn load_module(&mut self) -> Result<Box<dyn LogicModule<H>>, Fault> {
        let loader = &mut self.loader;
        let mut module = guard(Phase::Load, || loader.load())?;
        guard(Phase::Initialize, || module.initialize())?;
        if self.options.call_setup {
            guard(Phase::Setup, || module.setup())?;
        }
        Ok(module)
    }

    fn report_fault(&self, host: &mut H, fault: &Fault) {
        warn!(
            time = host.time(),
            phase = %fault.phase,
            fault = %fault,
            "logic module faulted; reloading next tick"
        );
        self.announce(host, &format!("Panic! {fault}"));
        if self.options.include_trace {
            if let Some(trace) = &fault.trace {
                self.announce(host, &format!("TRACE: {trace}"));
            }
        }
        self.announce(host, "resetting VM next tick.");
    }

    fn announce(&self, host: &mut H, line: &str) {
        host.console(line);
        if self.options.notify {
            host.notify(line);
        }
    }
}

/// Run `f`, converting both its error and any panic into a [`Fault`].
fn guard<T>(phase: Phase, f: impl FnOnce() -> Result<T>) -> Result<T, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Fault::from_error(phase, &err)),
        Err(payload) => Err(Fault::from_panic(phase, &*payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::World;
    use crate::host::SandboxHost;
    use crate::test_support::{Script, ScriptedLoader, count_lines};

    fn host() -> SandboxHost {
        SandboxHost::new(World::default())
    }

    #[test]
    fn first_tick_loads_initializes_and_sets_up() {
        let loader = ScriptedLoader::new();
        let calls = loader.clone();
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        assert_eq!(runner.state(), ModuleState::Unloaded);
        let outcome = runner.run_tick(&mut host);

        assert_eq!(outcome, TickOutcome::Ran { loaded_now: true });
        assert_eq!(runner.state(), ModuleState::Loaded);
        let calls = calls.calls();
        assert_eq!(
            (calls.loads, calls.initializes, calls.setups, calls.ticks),
            (1, 1, 1, 1)
        );
        assert_eq!(host.console_lines()[0], "GAME TICK 1");
        assert_eq!(host.notifications(), ["Loading code".to_string()]);
    }

    #[test]
    fn consecutive_successful_ticks_reuse_the_module() {
        let loader = ScriptedLoader::new();
        let calls = loader.clone();
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        let summary = runner.run_ticks(&mut host, 3, |_, _| {});

        assert_eq!(summary.faults, 0);
        assert_eq!(summary.final_state, ModuleState::Loaded);
        let calls = calls.calls();
        assert_eq!((calls.loads, calls.initializes, calls.setups), (1, 1, 1));
        assert_eq!(calls.ticks, 3);
        assert_eq!(host.time(), 4);
    }

    #[test]
    fn memory_is_empty_before_every_tick() {
        let loader = ScriptedLoader::new();
        let calls = loader.clone();
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        runner.run_ticks(&mut host, 3, |_, _| {});

        assert!(!runner.memory().is_empty(), "module writes survive until next cycle");
        assert_eq!(calls.calls().memory_empty_at_tick, vec![true, true, true]);
    }

    #[test]
    fn tick_error_unloads_and_logs_one_panic() {
        let loader = ScriptedLoader::new().on_tick(Script::Ok).on_tick(Script::Err("boom"));
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        runner.run_tick(&mut host);
        let outcome = runner.run_tick(&mut host);

        assert!(outcome.is_fault());
        assert_eq!(runner.state(), ModuleState::Unloaded);
        assert_eq!(count_lines(host.console_lines(), "Panic!"), 1);
        assert!(host.console_lines().contains(&"Panic! boom".to_string()));
        assert_eq!(
            host.console_lines().last().map(String::as_str),
            Some("resetting VM next tick.")
        );
    }

    #[test]
    fn panics_in_each_phase_are_contained() {
        for (loader, phase) in [
            (ScriptedLoader::new().on_load(Script::Panic("no module")), Phase::Load),
            (
                ScriptedLoader::new().on_initialize(Script::Panic("bad init")),
                Phase::Initialize,
            ),
            (
                ScriptedLoader::new().on_setup(Script::Err("bad setup")),
                Phase::Setup,
            ),
            (ScriptedLoader::new().on_tick(Script::Panic("boom")), Phase::Tick),
        ] {
            let mut runner = TickRunner::new(loader, TickOptions::default());
            let mut host = host();

            match runner.run_tick(&mut host) {
                TickOutcome::Faulted(fault) => assert_eq!(fault.phase, phase),
                other => panic!("expected fault in {phase}, got {other:?}"),
            }
            assert_eq!(runner.state(), ModuleState::Unloaded);
            assert_eq!(count_lines(host.console_lines(), "Panic!"), 1);
        }
    }

    #[test]
    fn trace_line_sits_between_panic_and_reset() {
        crate::panic_hook::install();
        let loader = ScriptedLoader::new().on_tick(Script::Panic("boom"));
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        let outcome = runner.run_tick(&mut host);

        let TickOutcome::Faulted(fault) = outcome else {
            panic!("expected a fault");
        };
        assert!(fault.trace.is_some());
        let lines = host.console_lines();
        assert_eq!(lines[..3], ["GAME TICK 1", "Loading code", "Panic! boom"]);
        assert!(lines[3].starts_with("TRACE: panicked at "));
        assert_eq!(lines[4], "resetting VM next tick.");
        assert_eq!(lines.len(), 5);
        assert!(host.notifications()[2].starts_with("TRACE: "));
    }

    #[test]
    fn trace_line_can_be_disabled() {
        crate::panic_hook::install();
        let loader = ScriptedLoader::new().on_tick(Script::Panic("boom"));
        let options = TickOptions {
            include_trace: false,
            ..TickOptions::default()
        };
        let mut runner = TickRunner::new(loader, options);
        let mut host = host();

        match runner.run_tick(&mut host) {
            TickOutcome::Faulted(fault) => assert!(fault.trace.is_some()),
            other => panic!("expected a fault, got {other:?}"),
        }
        assert_eq!(count_lines(host.console_lines(), "TRACE:"), 0);
        assert_eq!(
            host.console_lines()[2..],
            ["Panic! boom", "resetting VM next tick."]
        );
    }

    #[test]
    fn fault_forces_full_reload_next_cycle() {
        let loader = ScriptedLoader::new()
            .on_tick(Script::Ok)
            .on_tick(Script::Panic("boom"));
        let calls = loader.clone();
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        let outcomes: Vec<TickOutcome> = (0..3).map(|_| runner.run_tick(&mut host)).collect();

        assert_eq!(outcomes[0], TickOutcome::Ran { loaded_now: true });
        assert!(outcomes[1].is_fault());
        assert_eq!(outcomes[2], TickOutcome::Ran { loaded_now: true });
        let calls = calls.calls();
        assert_eq!((calls.loads, calls.initializes, calls.setups), (2, 2, 2));
    }

    #[test]
    fn setup_is_skipped_when_disabled() {
        let loader = ScriptedLoader::new();
        let calls = loader.clone();
        let options = TickOptions {
            call_setup: false,
            ..TickOptions::default()
        };
        let mut runner = TickRunner::new(loader, options);
        runner.run_tick(&mut host());

        assert_eq!(calls.calls().setups, 0);
        assert_eq!(runner.state(), ModuleState::Loaded);
    }

    #[test]
    fn notify_can_be_disabled() {
        let loader = ScriptedLoader::new().on_tick(Script::Err("boom"));
        let options = TickOptions {
            notify: false,
            ..TickOptions::default()
        };
        let mut runner = TickRunner::new(loader, options);
        let mut host = host();
        runner.run_tick(&mut host);

        assert!(host.notifications().is_empty());
        assert_eq!(count_lines(host.console_lines(), "Panic!"), 1);
    }

    #[test]
    fn closure_loader_is_accepted() {
        let mut loads = 0;
        let loader = move || -> Result<Box<dyn LogicModule<SandboxHost>>> {
            loads += 1;
            anyhow::bail!("load attempt {loads} failed")
        };
        let mut runner = TickRunner::new(loader, TickOptions::default());
        let mut host = host();

        runner.run_tick(&mut host);
        runner.run_tick(&mut host);

        assert!(host.console_lines().contains(&"Panic! load attempt 2 failed".to_string()));
    }
}
