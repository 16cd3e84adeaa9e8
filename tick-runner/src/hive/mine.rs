//! Per-source mining.
//!
//! Every source gets a `harvester:<id>` with work parts only and a
//! `hauler:<id>` with carry and move parts. The hauler tows the harvester onto
//! the source, then ferries the energy it drops to the drop-off.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Hive;
use crate::core::tasks::{Task, TaskReturn};
use crate::core::world::{ActionError, Body, HARVEST_POWER, Position, WORK_COST, World};

const SOURCE_ENERGY_CAPACITY: u32 = 3000;
const ENERGY_REGEN_TIME: u32 = 300;
/// Work parts that drain a source exactly once per regeneration period.
const REQUIRED_WORK: u32 = SOURCE_ENERGY_CAPACITY / ENERGY_REGEN_TIME / HARVEST_POWER;

const HARVESTER_PREFIX: &str = "harvester:";
const HAULER_PREFIX: &str = "hauler:";

pub fn harvester_name(source_id: &str) -> String {
    format!("{HARVESTER_PREFIX}{source_id}")
}

pub fn hauler_name(source_id: &str) -> String {
    format!("{HAULER_PREFIX}{source_id}")
}

/// Whether the creep belongs to a mining pair rather than the worker pool.
pub fn is_miner(creep_name: &str) -> bool {
    creep_name.starts_with(HARVESTER_PREFIX) || creep_name.starts_with(HAULER_PREFIX)
}

/// As many work parts as `energy` buys, capped at [`REQUIRED_WORK`].
///
/// `None` when not even one work part is affordable.
pub fn harvester_body(energy: u32) -> Option<Body> {
    let extra = energy.checked_sub(WORK_COST)? / WORK_COST;
    Some(Body {
        work: 1 + extra.min(REQUIRED_WORK - 1),
        carry: 0,
        moves: 0,
    })
}

// TODO: size carry parts from the haul distance once sources are farther out.
pub fn hauler_body(_energy: u32) -> Option<Body> {
    Some(Body {
        work: 0,
        carry: 2,
        moves: 2,
    })
}

/// Where haulers unload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOff {
    Spawn,
    Creep(String),
}

impl DropOff {
    pub fn pos(&self, world: &World) -> Option<Position> {
        match self {
            DropOff::Spawn => Some(world.spawn),
            DropOff::Creep(name) => world.creep(name).map(|creep| creep.pos),
        }
    }

    fn accept_energy(&self, world: &mut World, hauler: &str) -> Result<u32, ActionError> {
        match self {
            DropOff::Spawn => world.deposit(hauler),
            DropOff::Creep(name) => world.transfer(hauler, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineError {
    CreepBusy(String),
    NoSpawnAvailable,
    SpawningInProgress(String),
    SpawningFailed(String, ActionError),
    Action(String, ActionError),
    MissingSource(String),
    MissingDropOff,
}

impl MineError {
    /// Waiting on the spawn rather than failing.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            MineError::NoSpawnAvailable
                | MineError::SpawningInProgress(_)
                | MineError::SpawningFailed(_, ActionError::NotEnoughEnergy)
        )
    }
}

impl fmt::Display for MineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MineError::CreepBusy(name) => write!(f, "creep {name} is busy"),
            MineError::NoSpawnAvailable => f.write_str("no spawn available"),
            MineError::SpawningInProgress(name) => write!(f, "spawning {name}"),
            MineError::SpawningFailed(name, err) => write!(f, "failed to spawn {name}: {err}"),
            MineError::Action(name, err) => write!(f, "{name}: {err}"),
            MineError::MissingSource(id) => write!(f, "source {id} not found"),
            MineError::MissingDropOff => f.write_str("energy drop-off not found"),
        }
    }
}

impl std::error::Error for MineError {}

/// Sources worked by mining pairs and the drop-off they feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineSites {
    pub drop_off: DropOff,
    /// Nearest to the drop-off first.
    pub source_ids: Vec<String>,
}

impl MineSites {
    pub fn new(world: &World, drop_off: DropOff) -> Self {
        let origin = drop_off.pos(world).unwrap_or(world.spawn);
        let mut sources: Vec<(u32, String)> = world
            .sources
            .values()
            .map(|source| (source.pos.range_to(origin), source.id.clone()))
            .collect();
        sources.sort();
        Self {
            drop_off,
            source_ids: sources.into_iter().map(|(_, id)| id).collect(),
        }
    }

    /// Work every source once. Returns the sources that could not be worked.
    pub fn run(&self, hive: &mut Hive<'_>) -> Vec<(String, MineError)> {
        self.source_ids
            .iter()
            .filter_map(|source_id| {
                self.process_source(source_id, hive)
                    .err()
                    .map(|err| (source_id.clone(), err))
            })
            .collect()
    }

    fn process_source(&self, source_id: &str, hive: &mut Hive<'_>) -> Result<(), MineError> {
        let hauler = hauler_name(source_id);
        let hauler_ready = hive.get_creep(&hauler, hauler_body);
        let harvester = harvester_name(source_id);
        hive.get_creep(&harvester, harvester_body)?;

        let world = &mut *hive.world;
        let source_pos = world
            .sources
            .get(source_id)
            .map(|source| source.pos)
            .ok_or_else(|| MineError::MissingSource(source_id.to_string()))?;

        if pos_of(world, &harvester)?.is_near_to(source_pos) {
            run_step(&mut Task::Harvest(source_id.to_string()), &harvester, world)?;
            hauler_ready?;
            self.haul_energy(world, &harvester, &hauler)
        } else {
            hauler_ready?;
            tow_to_source(world, source_pos, &harvester, &hauler)
        }
    }

    /// Pick up what the harvester dropped until full, then unload.
    fn haul_energy(&self, world: &mut World, harvester: &str, hauler: &str) -> Result<(), MineError> {
        let (hauler_pos, free) = world
            .creep(hauler)
            .map(|creep| (creep.pos, creep.free_capacity()))
            .ok_or_else(|| MineError::Action(hauler.to_string(), ActionError::NotFound))?;

        if free > 0 {
            let harvester_pos = pos_of(world, harvester)?;
            if hauler_pos.is_near_to(harvester_pos) {
                world
                    .pickup(hauler, harvester_pos)
                    .map(drop)
                    .map_err(|err| MineError::Action(hauler.to_string(), err))
            } else {
                run_step(&mut Task::MoveTo(harvester_pos), hauler, world)
            }
        } else {
            let drop_off_pos = self.drop_off.pos(world).ok_or(MineError::MissingDropOff)?;
            if hauler_pos.is_near_to(drop_off_pos) {
                self.drop_off
                    .accept_energy(world, hauler)
                    .map(drop)
                    .map_err(|err| MineError::Action(hauler.to_string(), err))
            } else {
                run_step(&mut Task::MoveTo(drop_off_pos), hauler, world)
            }
        }
    }
}

/// Walk the hauler to the harvester, then pull it toward the source. Next to
/// the source the hauler swaps places so the harvester ends up in range.
fn tow_to_source(
    world: &mut World,
    source_pos: Position,
    harvester: &str,
    hauler: &str,
) -> Result<(), MineError> {
    let harvester_pos = pos_of(world, harvester)?;
    let hauler_pos = pos_of(world, hauler)?;

    let mut task = if hauler_pos.is_near_to(harvester_pos) {
        let toward = if hauler_pos.is_near_to(source_pos) {
            harvester_pos
        } else {
            source_pos
        };
        match hauler_pos.direction_to(toward) {
            Some(direction) => Task::Tow(harvester.to_string(), direction),
            None => return Ok(()),
        }
    } else {
        Task::MoveTo(harvester_pos)
    };
    run_step(&mut task, hauler, world)
}

fn pos_of(world: &World, creep: &str) -> Result<Position, MineError> {
    world
        .creep(creep)
        .map(|creep| creep.pos)
        .ok_or_else(|| MineError::Action(creep.to_string(), ActionError::NotFound))
}

/// Run a one-shot task for this cycle.
fn run_step(task: &mut Task, creep: &str, world: &mut World) -> Result<(), MineError> {
    match task.run(creep, world) {
        TaskReturn::Complete | TaskReturn::ProgressMade => Ok(()),
        TaskReturn::Err(err) => Err(MineError::Action(creep.to_string(), err)),
    }
}
