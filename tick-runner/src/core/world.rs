//! Minimal in-memory game world owned by the sandbox host.
//!
//! Positions live on an unbounded integer grid. Range is Chebyshev distance,
//! so a diagonal step costs the same as a straight one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Energy harvested per work part per action.
pub const HARVEST_POWER: u32 = 2;
/// Energy held per carry part.
pub const CARRY_CAPACITY: u32 = 50;
pub const WORK_COST: u32 = 100;
pub const CARRY_COST: u32 = 50;
pub const MOVE_COST: u32 = 50;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn range_to(self, other: Position) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    pub fn is_near_to(self, other: Position) -> bool {
        self.range_to(other) <= 1
    }

    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    /// Direction of the first step toward `target`, or `None` when already there.
    pub fn direction_to(self, target: Position) -> Option<Direction> {
        let dx = (target.x - self.x).signum();
        let dy = (target.y - self.y).signum();
        Direction::from_offset(dx, dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl Direction {
    /// Grid offset; `y` grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
        }
    }

    fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        match (dx, dy) {
            (0, -1) => Some(Direction::Top),
            (1, -1) => Some(Direction::TopRight),
            (1, 0) => Some(Direction::Right),
            (1, 1) => Some(Direction::BottomRight),
            (0, 1) => Some(Direction::Bottom),
            (-1, 1) => Some(Direction::BottomLeft),
            (-1, 0) => Some(Direction::Left),
            (-1, -1) => Some(Direction::TopLeft),
            _ => None,
        }
    }
}

/// Why a creep action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionError {
    NotFound,
    NotInRange,
    Full,
    Empty,
    NoMoveParts,
    NotEnoughEnergy,
    NameTaken,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ActionError::NotFound => "target not found",
            ActionError::NotInRange => "target not in range",
            ActionError::Full => "creep is full",
            ActionError::Empty => "nothing to take",
            ActionError::NoMoveParts => "creep has no move parts",
            ActionError::NotEnoughEnergy => "not enough energy",
            ActionError::NameTaken => "name already in use",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ActionError {}

/// Part counts of a creep body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub work: u32,
    pub carry: u32,
    pub moves: u32,
}

impl Body {
    /// Spawn cost in energy. Saturates instead of wrapping.
    pub fn cost(&self) -> u32 {
        self.work
            .saturating_mul(WORK_COST)
            .saturating_add(self.carry.saturating_mul(CARRY_COST))
            .saturating_add(self.moves.saturating_mul(MOVE_COST))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creep {
    pub name: String,
    pub pos: Position,
    pub energy: u32,
    pub capacity: u32,
    pub work: u32,
    pub moves: u32,
}

impl Creep {
    pub fn is_full(&self) -> bool {
        self.energy >= self.capacity
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.energy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub pos: Position,
    pub energy: u32,
}

/// The whole sandbox: creeps, energy sources, one spawn and its stockpile.
///
/// The stockpile is the spawn's energy: deposits fill it and spawning a creep
/// spends from it. Energy harvested by a creep without carry parts lands in
/// `dropped` on the creep's tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct World {
    pub creeps: BTreeMap<String, Creep>,
    pub sources: BTreeMap<String, Source>,
    pub dropped: BTreeMap<Position, u32>,
    pub spawn: Position,
    pub stockpile: u32,
}

impl World {
    pub fn new(spawn: Position) -> Self {
        Self {
            spawn,
            ..Self::default()
        }
    }

    pub fn add_creep(&mut self, creep: Creep) {
        self.creeps.insert(creep.name.clone(), creep);
    }

    pub fn add_source(&mut self, source: Source) {
        self.sources.insert(source.id.clone(), source);
    }

    pub fn creep(&self, name: &str) -> Option<&Creep> {
        self.creeps.get(name)
    }

    /// Closest source that still holds energy. Ties go to the lowest id.
    pub fn nearest_source(&self, from: Position) -> Option<&Source> {
        self.sources
            .values()
            .filter(|source| source.energy > 0)
            .min_by_key(|source| source.pos.range_to(from))
    }

    pub fn move_direction(&mut self, creep: &str, direction: Direction) -> Result<(), ActionError> {
        let creep = self.creeps.get_mut(creep).ok_or(ActionError::NotFound)?;
        if creep.moves == 0 {
            return Err(ActionError::NoMoveParts);
        }
        creep.pos = creep.pos.step(direction);
        Ok(())
    }

    /// Step `creep` in `direction`, pulling the adjacent `towed` creep into the
    /// tile it left. Towing toward the towed creep swaps the two.
    pub fn tow(&mut self, creep: &str, towed: &str, direction: Direction) -> Result<(), ActionError> {
        let towed_pos = self.creeps.get(towed).ok_or(ActionError::NotFound)?.pos;
        let puller = self.creeps.get_mut(creep).ok_or(ActionError::NotFound)?;
        if creep == towed || !puller.pos.is_near_to(towed_pos) {
            return Err(ActionError::NotInRange);
        }
        if puller.moves == 0 {
            return Err(ActionError::NoMoveParts);
        }
        let left = puller.pos;
        puller.pos = left.step(direction);
        if let Some(towed) = self.creeps.get_mut(towed) {
            towed.pos = left;
        }
        Ok(())
    }

    /// Move energy from an adjacent source into the creep. Returns the amount.
    ///
    /// A creep without carry capacity drops the energy on its own tile.
    pub fn harvest(&mut self, creep: &str, source_id: &str) -> Result<u32, ActionError> {
        let creep = self.creeps.get_mut(creep).ok_or(ActionError::NotFound)?;
        let source = self
            .sources
            .get_mut(source_id)
            .ok_or(ActionError::NotFound)?;
        if !creep.pos.is_near_to(source.pos) {
            return Err(ActionError::NotInRange);
        }
        let drops = creep.capacity == 0;
        if !drops && creep.is_full() {
            return Err(ActionError::Full);
        }
        if source.energy == 0 {
            return Err(ActionError::Empty);
        }
        let mut amount = creep.work.saturating_mul(HARVEST_POWER).min(source.energy);
        if drops {
            let pile = self.dropped.entry(creep.pos).or_default();
            *pile = pile.saturating_add(amount);
        } else {
            amount = amount.min(creep.free_capacity());
            creep.energy += amount;
        }
        source.energy -= amount;
        Ok(amount)
    }

    /// Pick up energy dropped on `at`, which must be within range 1.
    pub fn pickup(&mut self, creep: &str, at: Position) -> Result<u32, ActionError> {
        let creep = self.creeps.get_mut(creep).ok_or(ActionError::NotFound)?;
        if !creep.pos.is_near_to(at) {
            return Err(ActionError::NotInRange);
        }
        if creep.is_full() {
            return Err(ActionError::Full);
        }
        let Some(pile) = self.dropped.get_mut(&at) else {
            return Err(ActionError::Empty);
        };
        let amount = (*pile).min(creep.free_capacity());
        *pile -= amount;
        if *pile == 0 {
            self.dropped.remove(&at);
        }
        creep.energy += amount;
        Ok(amount)
    }

    /// Hand carried energy to an adjacent creep. Returns the amount moved.
    pub fn transfer(&mut self, creep: &str, target: &str) -> Result<u32, ActionError> {
        let from = self.creeps.get(creep).ok_or(ActionError::NotFound)?;
        let to = self.creeps.get(target).ok_or(ActionError::NotFound)?;
        if creep == target || !from.pos.is_near_to(to.pos) {
            return Err(ActionError::NotInRange);
        }
        if from.energy == 0 {
            return Err(ActionError::Empty);
        }
        if to.is_full() {
            return Err(ActionError::Full);
        }
        let amount = from.energy.min(to.free_capacity());
        if let Some(from) = self.creeps.get_mut(creep) {
            from.energy -= amount;
        }
        if let Some(to) = self.creeps.get_mut(target) {
            to.energy += amount;
        }
        Ok(amount)
    }

    /// Unload everything the creep carries into the spawn stockpile.
    pub fn deposit(&mut self, creep: &str) -> Result<u32, ActionError> {
        let creep = self.creeps.get_mut(creep).ok_or(ActionError::NotFound)?;
        if !creep.pos.is_near_to(self.spawn) {
            return Err(ActionError::NotInRange);
        }
        if creep.energy == 0 {
            return Err(ActionError::Empty);
        }
        let amount = std::mem::take(&mut creep.energy);
        self.stockpile = self.stockpile.saturating_add(amount);
        Ok(amount)
    }

    /// Create a creep on the spawn tile, paying its body cost from the stockpile.
    pub fn spawn_creep(&mut self, name: &str, body: Body) -> Result<(), ActionError> {
        if self.creeps.contains_key(name) {
            return Err(ActionError::NameTaken);
        }
        let cost = body.cost();
        if cost > self.stockpile {
            return Err(ActionError::NotEnoughEnergy);
        }
        self.stockpile -= cost;
        self.add_creep(Creep {
            name: name.to_string(),
            pos: self.spawn,
            energy: 0,
            capacity: body.carry.saturating_mul(CARRY_CAPACITY),
            work: body.work,
            moves: body.moves,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creep(name: &str, pos: Position) -> Creep {
        Creep {
            name: name.to_string(),
            pos,
            energy: 0,
            capacity: 10,
            work: 2,
            moves: 1,
        }
    }

    fn source(id: &str, pos: Position, energy: u32) -> Source {
        Source {
            id: id.to_string(),
            pos,
            energy,
        }
    }

    #[test]
    fn direction_to_steps_diagonally_then_straight() {
        let from = Position::new(0, 0);
        assert_eq!(
            from.direction_to(Position::new(3, 1)),
            Some(Direction::BottomRight)
        );
        assert_eq!(from.direction_to(Position::new(0, -4)), Some(Direction::Top));
        assert_eq!(from.direction_to(from), None);
        assert_eq!(from.range_to(Position::new(3, -5)), 5);
    }

    #[test]
    fn harvest_requires_range_and_caps_at_capacity() {
        let mut world = World::new(Position::new(0, 0));
        world.add_creep(creep("w", Position::new(0, 0)));
        world.add_source(source("s", Position::new(2, 0), 100));

        assert_eq!(world.harvest("w", "s"), Err(ActionError::NotInRange));

        world.move_direction("w", Direction::Right).expect("move");
        assert_eq!(world.harvest("w", "s"), Ok(4));
        assert_eq!(world.harvest("w", "s"), Ok(4));
        assert_eq!(world.harvest("w", "s"), Ok(2));
        assert_eq!(world.harvest("w", "s"), Err(ActionError::Full));
        assert_eq!(world.sources["s"].energy, 90);
    }

    #[test]
    fn harvest_reports_empty_source() {
        let mut world = World::new(Position::new(0, 0));
        world.add_creep(creep("w", Position::new(1, 1)));
        world.add_source(source("s", Position::new(1, 2), 0));
        assert_eq!(world.harvest("w", "s"), Err(ActionError::Empty));
        assert_eq!(world.harvest("w", "missing"), Err(ActionError::NotFound));
    }

    #[test]
    fn deposit_moves_energy_into_stockpile() {
        let mut world = World::new(Position::new(0, 0));
        let mut worker = creep("w", Position::new(1, 0));
        worker.energy = 7;
        world.add_creep(worker);

        assert_eq!(world.deposit("w"), Ok(7));
        assert_eq!(world.stockpile, 7);
        assert_eq!(world.deposit("w"), Err(ActionError::Empty));
    }

    #[test]
    fn nearest_source_skips_depleted_and_breaks_ties_by_id() {
        let mut world = World::new(Position::new(0, 0));
        world.add_source(source("a", Position::new(1, 0), 0));
        world.add_source(source("b", Position::new(3, 0), 5));
        world.add_source(source("c", Position::new(0, 3), 5));

        let nearest = world.nearest_source(Position::new(0, 0)).expect("source");
        assert_eq!(nearest.id, "b");
    }

    #[test]
    fn oversized_work_saturates_instead_of_overflowing() {
        let mut world = World::new(Position::new(0, 0));
        let mut worker = creep("w", Position::new(1, 0));
        worker.work = 3_000_000_000;
        worker.capacity = u32::MAX;
        world.add_creep(worker);
        world.add_source(source("s", Position::new(2, 0), u32::MAX));

        assert_eq!(world.harvest("w", "s"), Ok(u32::MAX));
        world.stockpile = u32::MAX - 1;
        assert_eq!(world.deposit("w"), Ok(u32::MAX));
        assert_eq!(world.stockpile, u32::MAX);
        assert_eq!(
            Body {
                work: u32::MAX,
                carry: 1,
                moves: 1
            }
            .cost(),
            u32::MAX
        );
    }

    #[test]
    fn harvest_without_carry_drops_energy_for_pickup() {
        let mut world = World::new(Position::new(0, 0));
        let mut miner = creep("m", Position::new(2, 0));
        miner.capacity = 0;
        miner.work = 3;
        world.add_creep(miner);
        world.add_creep(creep("h", Position::new(1, 0)));
        world.add_source(source("s", Position::new(3, 0), 100));

        assert_eq!(world.harvest("m", "s"), Ok(6));
        assert_eq!(world.harvest("m", "s"), Ok(6));
        assert_eq!(world.dropped[&Position::new(2, 0)], 12);

        assert_eq!(world.pickup("h", Position::new(2, 0)), Ok(10));
        assert_eq!(world.dropped[&Position::new(2, 0)], 2);
        assert_eq!(world.pickup("h", Position::new(2, 0)), Err(ActionError::Full));
        assert_eq!(world.pickup("m", Position::new(5, 5)), Err(ActionError::NotInRange));
    }

    #[test]
    fn tow_pulls_the_towed_creep_into_the_vacated_tile() {
        let mut world = World::new(Position::new(0, 0));
        world.add_creep(creep("hauler", Position::new(1, 0)));
        let mut miner = creep("miner", Position::new(0, 0));
        miner.moves = 0;
        world.add_creep(miner);

        assert_eq!(world.move_direction("miner", Direction::Right), Err(ActionError::NoMoveParts));
        world.tow("hauler", "miner", Direction::Right).expect("tow");
        assert_eq!(world.creeps["hauler"].pos, Position::new(2, 0));
        assert_eq!(world.creeps["miner"].pos, Position::new(1, 0));

        world.tow("hauler", "miner", Direction::Left).expect("swap");
        assert_eq!(world.creeps["hauler"].pos, Position::new(1, 0));
        assert_eq!(world.creeps["miner"].pos, Position::new(2, 0));

        world.move_direction("hauler", Direction::Left).expect("move");
        world.move_direction("hauler", Direction::Left).expect("move");
        assert_eq!(
            world.tow("hauler", "miner", Direction::Right),
            Err(ActionError::NotInRange)
        );
    }

    #[test]
    fn transfer_moves_what_fits() {
        let mut world = World::new(Position::new(0, 0));
        let mut giver = creep("a", Position::new(0, 0));
        giver.energy = 8;
        world.add_creep(giver);
        let mut taker = creep("b", Position::new(1, 1));
        taker.energy = 5;
        world.add_creep(taker);

        assert_eq!(world.transfer("a", "b"), Ok(5));
        assert_eq!(world.creeps["a"].energy, 3);
        assert_eq!(world.transfer("a", "b"), Err(ActionError::Full));
        assert_eq!(world.transfer("b", "a"), Ok(7));
    }

    #[test]
    fn spawning_spends_the_stockpile() {
        let mut world = World::new(Position::new(3, 3));
        world.stockpile = 250;
        let hauler = Body {
            work: 0,
            carry: 2,
            moves: 2,
        };

        world.spawn_creep("hauler", hauler).expect("spawn");
        assert_eq!(world.stockpile, 50);
        let spawned = &world.creeps["hauler"];
        assert_eq!((spawned.pos, spawned.capacity, spawned.moves), (Position::new(3, 3), 100, 2));

        assert_eq!(world.spawn_creep("hauler", Body::default()), Err(ActionError::NameTaken));
        assert_eq!(world.spawn_creep("other", hauler), Err(ActionError::NotEnoughEnergy));
        assert_eq!(world.stockpile, 50);
    }
}
