//! Reference logic module: harvests energy and hauls it back to the spawn.
//!
//! Two kinds of creeps do the work. Workers from the starting roster get task
//! plans (walk to a source, harvest, walk home, deposit). Mining pairs are
//! spawned per source from the stockpile and driven directly by [`mine`].
//!
//! The module itself holds no game state. Everything it needs across cycles
//! lives in the host's raw memory, so a reload after a fault picks up where
//! the previous instance left off.

pub mod mine;

use std::collections::VecDeque;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::core::console::Level;
use crate::core::memory::SharedMemory;
use crate::core::tasks::{Task, Tasks};
use crate::core::world::{ActionError, Body, Creep, World};
use crate::host::Host;
use crate::io::raw_memory;
use crate::module::{LogicModule, TickContext};
use crate::panic_hook;
use mine::{DropOff, MineError, MineSites, is_miner};

/// State persisted in raw memory between cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveState {
    pub tasks: Tasks,
    /// Laid out on the first cycle that finds none.
    pub mines: Option<MineSites>,
    pub ticks_run: u64,
}

/// One cycle's view of the colony. The single spawn starts at most one creep
/// per cycle.
pub struct Hive<'a> {
    tasks: &'a Tasks,
    world: &'a mut World,
    spawn_free: bool,
}

impl<'a> Hive<'a> {
    pub fn new(tasks: &'a Tasks, world: &'a mut World) -> Self {
        Self {
            tasks,
            world,
            spawn_free: true,
        }
    }

    /// `Ok` once `name` exists and has no task. A missing creep is spawned
    /// with `body` sized from the stockpile and becomes usable next cycle.
    pub fn get_creep<B>(&mut self, name: &str, body: B) -> Result<(), MineError>
    where
        B: FnOnce(u32) -> Option<Body>,
    {
        if self.tasks.has_task(name) {
            return Err(MineError::CreepBusy(name.to_string()));
        }
        if self.world.creep(name).is_some() {
            return Ok(());
        }
        if !self.spawn_free {
            return Err(MineError::NoSpawnAvailable);
        }
        self.spawn_free = false;
        let spawn_failed = |err: ActionError| MineError::SpawningFailed(name.to_string(), err);
        let body = body(self.world.stockpile)
            .ok_or_else(|| spawn_failed(ActionError::NotEnoughEnergy))?;
        self.world.spawn_creep(name, body).map_err(spawn_failed)?;
        Err(MineError::SpawningInProgress(name.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct HiveLogic {
    fail_on_tick: Option<u64>,
}

impl HiveLogic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panic when the host clock reaches `tick`, to exercise recovery.
    pub fn failing_on(tick: u64) -> Self {
        Self {
            fail_on_tick: Some(tick),
        }
    }
}

impl<H: Host<World = World>> LogicModule<H> for HiveLogic {
    fn initialize(&mut self) -> Result<()> {
        debug!(fail_on_tick = ?self.fail_on_tick, "hive initialized");
        Ok(())
    }

    /// Route panics into the fault's trace instead of stderr.
    fn setup(&mut self) -> Result<()> {
        panic_hook::install();
        debug!("panic hook armed");
        Ok(())
    }

    fn tick(&mut self, cx: &mut TickContext<'_, H>) -> Result<()> {
        let time = cx.host.time();
        if self.fail_on_tick == Some(time) {
            panic!("injected fault at tick {time}");
        }

        let mut state: HiveState = raw_memory::decode_or_default(cx.host.raw_memory());
        let world = cx.host.world();
        let planned = plan(&mut state.tasks, world);
        let sites = state
            .mines
            .get_or_insert_with(|| MineSites::new(world, DropOff::Spawn));
        let failures = sites.run(&mut Hive::new(&state.tasks, world));
        state.tasks.run(world);
        record(cx.memory, &state.tasks, world);
        state.ticks_run += 1;

        *cx.host.raw_memory() = raw_memory::encode(&state).context("encode hive state")?;
        if planned > 0 {
            cx.host.log(Level::Info, &format!("hive planned {planned} task(s)"));
        }
        for (source_id, err) in failures {
            if err.is_waiting() {
                debug!(source = %source_id, %err, "mine waiting");
            } else {
                cx.host.log(Level::Warn, &format!("[mine / {source_id}] {err}"));
            }
        }
        Ok(())
    }
}

/// Give every idle creep a plan. Returns how many plans were assigned.
fn plan(tasks: &mut Tasks, world: &World) -> usize {
    let mut planned = 0;
    for creep in world.creeps.values() {
        if is_miner(&creep.name) || tasks.has_task(&creep.name) {
            continue;
        }
        let Some(task) = plan_for(creep, world) else {
            continue;
        };
        tasks.add_task(creep.name.clone(), task);
        planned += 1;
    }
    planned
}

fn plan_for(creep: &Creep, world: &World) -> Option<Task> {
    let deliver = || Task::MultiStep(VecDeque::from([Task::MoveTo(world.spawn), Task::Deposit]));
    if creep.is_full() {
        return Some(deliver());
    }
    match world.nearest_source(creep.pos) {
        Some(source) => Some(Task::MultiStep(VecDeque::from([
            Task::MoveTo(source.pos),
            Task::Continuous(Box::new(Task::Harvest(source.id.clone()))),
        ]))),
        None if creep.energy > 0 => Some(deliver()),
        None => None,
    }
}

fn record(memory: &mut SharedMemory, tasks: &Tasks, world: &World) {
    memory.spawns.insert(
        "spawn".to_string(),
        json!({
            "x": world.spawn.x,
            "y": world.spawn.y,
            "stockpile": world.stockpile,
        }),
    );
    for creep in world.creeps.values() {
        let task = match tasks.task_list.get(&creep.name) {
            Some(task) => task.label(),
            None if is_miner(&creep.name) => "mine",
            None => "idle",
        };
        memory.creeps.insert(
            creep.name.clone(),
            json!({ "task": task, "energy": creep.energy }),
        );
    }
}
