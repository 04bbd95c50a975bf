use std::collections::HashMap;

use glam::Vec3;
use tracing::debug;

use common::{
    config::ShipConfig,
    input::ControlWord,
    ring::InputSample,
    ship::{InputOutcome, Ship},
    time::Clock,
};

pub const MAX_SHIPS: usize = 10;

// Ships strafe along x, so every slot gets its own lane along z.
pub const LANE_SPACING: f32 = 40.0;

/// Authoritative ships, one per connected client.
pub struct World<C: Clock + Clone> {
    ships: HashMap<u64, Ship<C>>,
    lanes: [Option<u64>; MAX_SHIPS],
    config: ShipConfig,
    clock: C,
}

impl<C: Clock + Clone> World<C> {
    pub fn new(config: ShipConfig, clock: C) -> Self {
        Self {
            ships: HashMap::new(),
            lanes: [None; MAX_SHIPS],
            config,
            clock,
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn ship(&self, client_id: u64) -> Option<&Ship<C>> {
        self.ships.get(&client_id)
    }

    /// Ship ids with their current positions, sorted by id.
    pub fn positions(&self) -> Vec<(u64, Vec3)> {
        let mut positions: Vec<_> = self
            .ships
            .iter()
            .map(|(&id, ship)| (id, ship.position()))
            .collect();
        positions.sort_by_key(|&(id, _)| id);
        positions
    }

    /// Ship ids with the input each ship is currently following, sorted by id.
    pub fn inputs(&self) -> Vec<(u64, InputSample)> {
        let mut inputs: Vec<_> = self
            .ships
            .iter()
            .map(|(&id, ship)| (id, ship.history().current()))
            .collect();
        inputs.sort_by_key(|&(id, _)| id);
        inputs
    }

    /// Places a new ship in the first free lane. Returns its start position,
    /// or `None` when every lane is taken. Spawning an existing id returns
    /// that ship's current position.
    pub fn spawn(&mut self, client_id: u64) -> Option<Vec3> {
        if let Some(ship) = self.ships.get(&client_id) {
            return Some(ship.position());
        }

        let lane = self.lanes.iter().position(Option::is_none)?;
        self.lanes[lane] = Some(client_id);

        let start = Vec3::new(0.0, 0.0, lane as f32 * LANE_SPACING);
        let ship = Ship::new(start, self.config, self.clock.clone());
        self.ships.insert(client_id, ship);

        Some(start)
    }

    pub fn remove(&mut self, client_id: u64) -> bool {
        for lane in self.lanes.iter_mut() {
            if *lane == Some(client_id) {
                *lane = None;
            }
        }
        self.ships.remove(&client_id).is_some()
    }

    pub fn apply_input(&mut self, client_id: u64, time: f64, input: ControlWord) -> Option<InputOutcome> {
        self.ships
            .get_mut(&client_id)
            .map(|ship| ship.apply_input(time, input))
    }

    pub fn tick(&mut self, dt: f64) {
        for (client_id, ship) in self.ships.iter_mut() {
            let frame = ship.tick(dt, true);
            if let Some(position) = frame.fire_position {
                debug!(client_id, x = position.x, z = position.z, "ship fired");
            }
        }
    }
}
