//! Per-creep task trees executed once per tick.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::world::{ActionError, Direction, Position, World};

/// Result of running a task for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskReturn {
    Complete,
    ProgressMade,
    Err(ActionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// One step in a fixed direction.
    Move(Direction),
    /// One step in a fixed direction, pulling the named creep behind.
    Tow(String, Direction),
    /// Walk until within range 1 of the target.
    MoveTo(Position),
    /// Harvest once from the source with this id.
    Harvest(String),
    /// Unload carried energy at the spawn.
    Deposit,
    /// Repeat the inner task until it errors.
    Continuous(Box<Task>),
    /// Repeat the inner task forever, ignoring errors.
    Perpetual(Box<Task>),
    /// Run tasks in order; each must complete before the next starts.
    MultiStep(VecDeque<Task>),
}

impl Task {
    pub fn run(&mut self, creep: &str, world: &mut World) -> TaskReturn {
        match self {
            Task::Move(direction) => finish(world.move_direction(creep, *direction)),

            Task::Tow(towed, direction) => finish(world.tow(creep, towed, *direction)),

            Task::MoveTo(target) => {
                let Some(pos) = world.creep(creep).map(|c| c.pos) else {
                    return TaskReturn::Err(ActionError::NotFound);
                };
                if pos.is_near_to(*target) {
                    return TaskReturn::Complete;
                }
                match pos.direction_to(*target) {
                    Some(direction) => match world.move_direction(creep, direction) {
                        Ok(()) => TaskReturn::ProgressMade,
                        Err(err) => TaskReturn::Err(err),
                    },
                    None => TaskReturn::Complete,
                }
            }

            Task::Harvest(source_id) => finish(world.harvest(creep, source_id).map(|_| ())),

            Task::Deposit => finish(world.deposit(creep).map(|_| ())),

            Task::Continuous(task) => match task.run(creep, world) {
                TaskReturn::Complete => TaskReturn::ProgressMade,
                other => other,
            },

            Task::Perpetual(task) => {
                let _ = task.run(creep, world);
                TaskReturn::ProgressMade
            }

            Task::MultiStep(steps) => match steps.front_mut() {
                Some(task) => match task.run(creep, world) {
                    TaskReturn::Complete => {
                        steps.pop_front();
                        if steps.is_empty() {
                            TaskReturn::Complete
                        } else {
                            TaskReturn::ProgressMade
                        }
                    }
                    other => other,
                },
                None => TaskReturn::Complete,
            },
        }
    }

    /// Short name of the step currently being executed.
    pub fn label(&self) -> &'static str {
        match self {
            Task::Move(_) => "move",
            Task::Tow(..) => "tow",
            Task::MoveTo(_) => "move_to",
            Task::Harvest(_) => "harvest",
            Task::Deposit => "deposit",
            Task::Continuous(task) | Task::Perpetual(task) => task.label(),
            Task::MultiStep(steps) => steps.front().map_or("idle", Task::label),
        }
    }
}

fn finish(result: Result<(), ActionError>) -> TaskReturn {
    match result {
        Ok(()) => TaskReturn::Complete,
        Err(err) => TaskReturn::Err(err),
    }
}

/// Active tasks keyed by creep name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tasks {
    pub task_list: BTreeMap<String, Task>,
}

impl Tasks {
    /// Run every task once.
    ///
    /// Entries are dropped when their creep is gone, when the task completes,
    /// or when it errors. Returns the names of dropped entries.
    pub fn run(&mut self, world: &mut World) -> Vec<String> {
        let mut finished = Vec::new();
        self.task_list.retain(|creep_name, task| {
            if world.creep(creep_name).is_none() {
                debug!(creep = %creep_name, "dropping task for missing creep");
                finished.push(creep_name.clone());
                return false;
            }
            match task.run(creep_name, world) {
                TaskReturn::ProgressMade => true,
                TaskReturn::Complete => {
                    finished.push(creep_name.clone());
                    false
                }
                TaskReturn::Err(err) => {
                    debug!(creep = %creep_name, %err, "task ended with error");
                    finished.push(creep_name.clone());
                    false
                }
            }
        });
        finished
    }

    pub fn add_task(&mut self, creep_name: String, task: Task) {
        self.task_list.insert(creep_name, task);
    }

    pub fn has_task(&self, creep_name: &str) -> bool {
        self.task_list.contains_key(creep_name)
    }
}
