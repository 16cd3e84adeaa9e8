//! Test-only doubles: a scripted logic module and a scratch workspace.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::host::Host;
use crate::io::init::{InitOptions, RunnerPaths, init_runner};
use crate::module::{LogicModule, ModuleLoader, TickContext};

/// Scripted behavior for one call. Queues that run dry behave as `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Ok,
    Err(&'static str),
    Panic(&'static str),
}

impl Script {
    fn apply(self) -> Result<()> {
        match self {
            Script::Ok => Ok(()),
            Script::Err(msg) => bail!("{msg}"),
            Script::Panic(msg) => panic!("{msg}"),
        }
    }
}

/// Counters recorded by scripted modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub loads: u32,
    pub initializes: u32,
    pub setups: u32,
    pub ticks: u32,
    /// Whether shared memory was empty when each tick began.
    pub memory_empty_at_tick: Vec<bool>,
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: Calls,
    load: VecDeque<Script>,
    initialize: VecDeque<Script>,
    setup: VecDeque<Script>,
    tick: VecDeque<Script>,
}

/// Loader whose modules follow per-operation scripts.
///
/// Clones share state, so a clone kept by the test observes the calls made
/// through the one handed to the runner.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoader {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load(self, script: Script) -> Self {
        self.state.borrow_mut().load.push_back(script);
        self
    }

    pub fn on_initialize(self, script: Script) -> Self {
        self.state.borrow_mut().initialize.push_back(script);
        self
    }

    pub fn on_setup(self, script: Script) -> Self {
        self.state.borrow_mut().setup.push_back(script);
        self
    }

    pub fn on_tick(self, script: Script) -> Self {
        self.state.borrow_mut().tick.push_back(script);
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.borrow().calls.clone()
    }
}

impl<H: Host> ModuleLoader<H> for ScriptedLoader {
    fn load(&mut self) -> Result<Box<dyn LogicModule<H>>> {
        let script = {
            let mut state = self.state.borrow_mut();
            state.calls.loads += 1;
            state.load.pop_front().unwrap_or(Script::Ok)
        };
        script.apply()?;
        Ok(Box::new(ScriptedModule {
            state: Rc::clone(&self.state),
        }))
    }
}

struct ScriptedModule {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedModule {
    /// Record the call and pop its script without holding the borrow while it runs.
    fn next_script(&self, pick: impl FnOnce(&mut ScriptState) -> Option<Script>) -> Script {
        let mut state = self.state.borrow_mut();
        pick(&mut state).unwrap_or(Script::Ok)
    }
}

impl<H: Host> LogicModule<H> for ScriptedModule {
    fn initialize(&mut self) -> Result<()> {
        self.next_script(|state| {
            state.calls.initializes += 1;
            state.initialize.pop_front()
        })
        .apply()
    }

    fn setup(&mut self) -> Result<()> {
        self.next_script(|state| {
            state.calls.setups += 1;
            state.setup.pop_front()
        })
        .apply()
    }

    fn tick(&mut self, cx: &mut TickContext<'_, H>) -> Result<()> {
        let empty = cx.memory.is_empty();
        let script = self.next_script(|state| {
            state.calls.ticks += 1;
            state.calls.memory_empty_at_tick.push(empty);
            state.tick.pop_front()
        });
        cx.memory
            .creeps
            .insert("scripted".to_string(), json!({ "time": cx.host.time() }));
        script.apply()
    }
}

/// Count console lines starting with `prefix`.
pub fn count_lines(lines: &[String], prefix: &str) -> usize {
    lines.iter().filter(|line| line.starts_with(prefix)).count()
}

/// Temporary project root with `.tick-runner/` initialized.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
    pub paths: RunnerPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        let paths = init_runner(dir.path(), &InitOptions { force: false })?;
        Ok(Self { dir, paths })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
