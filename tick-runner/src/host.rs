//! The game side of the runner boundary.
//!
//! A [`Host`] owns everything that survives a module reload: the cycle
//! counter, the log sinks, the raw memory string and the world itself.

use tracing::trace;

use crate::core::console::{Level, format_line};
use crate::core::world::{Creep, Position, Source, World};
use crate::io::config::SandboxConfig;

pub trait Host {
    type World;

    /// Current cycle counter.
    fn time(&self) -> u64;

    /// Write a line to the console sink.
    fn console(&mut self, line: &str);

    /// Write a line to the notification sink.
    fn notify(&mut self, line: &str);

    /// Raw memory persisted across cycles and module reloads.
    fn raw_memory(&mut self) -> &mut String;

    fn world(&mut self) -> &mut Self::World;

    /// Move the cycle counter forward by one.
    fn advance(&mut self);

    /// Write a leveled, colorized line to the console sink.
    fn log(&mut self, level: Level, text: &str) {
        let line = format_line(level, text);
        self.console(&line);
    }
}

/// In-memory host over a [`World`], collecting its output lines.
#[derive(Debug, Clone)]
pub struct SandboxHost {
    time: u64,
    world: World,
    raw_memory: String,
    console: Vec<String>,
    notifications: Vec<String>,
}

impl SandboxHost {
    /// Cycle counter starts at 1.
    pub fn new(world: World) -> Self {
        Self {
            time: 1,
            world,
            raw_memory: String::new(),
            console: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Build a host around a world laid out from `cfg`.
    ///
    /// The spawn sits at the origin with every creep on it; sources are spread
    /// along a diagonal away from it.
    pub fn from_config(cfg: &SandboxConfig) -> Self {
        let spawn = Position::new(0, 0);
        let mut world = World::new(spawn);
        world.stockpile = cfg.spawn_energy;
        for i in 1..=cfg.creeps {
            world.add_creep(Creep {
                name: format!("worker-{i}"),
                pos: spawn,
                energy: 0,
                capacity: cfg.creep_capacity,
                work: cfg.creep_work,
                moves: 1,
            });
        }
        for i in 1..=cfg.sources {
            let offset = i32::try_from(i.saturating_mul(4)).unwrap_or(i32::MAX);
            world.add_source(Source {
                id: format!("source-{i}"),
                pos: Position::new(offset, offset / 2),
                energy: cfg.source_energy,
            });
        }
        Self::new(world)
    }

    pub fn with_raw_memory(mut self, raw: String) -> Self {
        self.raw_memory = raw;
        self
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn console_lines(&self) -> &[String] {
        &self.console
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// Take the console lines written so far.
    pub fn drain_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }

    /// Take the notifications sent so far.
    pub fn drain_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notifications)
    }

    pub fn world_state(&self) -> &World {
        &self.world
    }

    pub fn raw_memory_str(&self) -> &str {
        &self.raw_memory
    }
}

impl Host for SandboxHost {
    type World = World;

    fn time(&self) -> u64 {
        self.time
    }

    fn console(&mut self, line: &str) {
        trace!(line, "console");
        self.console.push(line.to_string());
    }

    fn notify(&mut self, line: &str) {
        trace!(line, "notify");
        self.notifications.push(line.to_string());
    }

    fn raw_memory(&mut self) -> &mut String {
        &mut self.raw_memory
    }

    fn world(&mut self) -> &mut World {
        &mut self.world
    }

    fn advance(&mut self) {
        self.time += 1;
    }
}
