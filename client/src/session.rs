use std::collections::HashMap;

use glam::Vec3;

use common::{
    config::ShipConfig,
    input::ControlWord,
    net::AppChannel,
    protocol::{self, ClientMessage, ServerMessage},
    render::{RenderedShip, Renderer},
    ship::{InputOutcome, PositionOutcome},
    time::SharedClock,
};

use crate::{
    clock::ServerClock,
    net::NetworkHandle,
    render::{LOCAL_ASSET, REMOTE_ASSET},
};

/// A shot spawned this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub ship_id: u64,
    pub position: Vec3,
}

/// Every ship this client knows about. All mutation goes through this type
/// from the frame loop, one message at a time.
pub struct ClientSession {
    pub client_id: u64,
    local_ship: Option<u64>,
    ships: HashMap<u64, RenderedShip<SharedClock>>,
    clock: ServerClock,
    config: ShipConfig,
}

impl ClientSession {
    pub fn new(client_id: u64, config: ShipConfig) -> Self {
        Self {
            client_id,
            local_ship: None,
            ships: HashMap::new(),
            clock: ServerClock::new(),
            config,
        }
    }

    pub fn local_ship(&self) -> Option<u64> {
        self.local_ship
    }

    pub fn ship(&self, ship_id: u64) -> Option<&RenderedShip<SharedClock>> {
        self.ships.get(&ship_id)
    }

    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    pub fn clock(&self) -> &ServerClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ServerClock {
        &mut self.clock
    }

    pub fn dispatch(&mut self, message: ServerMessage, rtt: f64, renderer: &mut dyn Renderer) {
        match message {
            ServerMessage::Welcome {
                ship_id,
                start,
                server_time,
            } => {
                if self.clock.is_synced() {
                    self.clock.sync(server_time, rtt);
                } else {
                    self.clock.snap(server_time + rtt / 2.0);
                }
                self.local_ship = Some(ship_id);
                self.spawn(ship_id, start, LOCAL_ASSET, renderer);
                tracing::info!(ship_id, "joined as local ship");
            }
            ServerMessage::Spawned { ship_id, start } => {
                if Some(ship_id) == self.local_ship {
                    return;
                }
                self.spawn(ship_id, start, REMOTE_ASSET, renderer);
            }
            ServerMessage::Input {
                ship_id,
                time,
                input,
            } => {
                // Local inputs were already applied when they were pressed.
                if Some(ship_id) == self.local_ship {
                    return;
                }
                let Some(rendered) = self.ships.get_mut(&ship_id) else {
                    tracing::debug!(ship_id, "input for unknown ship");
                    return;
                };
                if rendered.ship.apply_input(time, input) == InputOutcome::Stale {
                    tracing::debug!(ship_id, time, "dropped stale input");
                }
            }
            ServerMessage::Position {
                ship_id,
                time,
                position,
            } => {
                let Some(rendered) = self.ships.get_mut(&ship_id) else {
                    tracing::debug!(ship_id, "position for unknown ship");
                    return;
                };
                if let PositionOutcome::Corrected(diff) = rendered.ship.apply_position(time, position)
                {
                    tracing::trace!(ship_id, error = diff.length(), "position corrected");
                }
            }
            ServerMessage::Removed { ship_id } => {
                if let Some(rendered) = self.ships.remove(&ship_id) {
                    rendered.destroy(renderer);
                }
                if Some(ship_id) == self.local_ship {
                    self.local_ship = None;
                }
            }
            ServerMessage::ServerTime(server_time) => self.clock.sync(server_time, rtt),
        }
    }

    /// Applies a new local control word at the current estimated server time
    /// and returns the message announcing it.
    pub fn set_local_input(&mut self, input: ControlWord) -> Option<ClientMessage> {
        let ship_id = self.local_ship?;
        let rendered = self.ships.get_mut(&ship_id)?;
        let time = self.clock.now();

        match rendered.ship.apply_input(time, input) {
            InputOutcome::Applied => Some(ClientMessage::Input { time, input }),
            InputOutcome::Duplicate | InputOutcome::Stale => None,
        }
    }

    /// The local ship's active input with the time it took effect. Sent every
    /// frame: the server drops repeats, and a lost change is carried by the
    /// next frame's copy.
    pub fn input_message(&self) -> Option<ClientMessage> {
        let rendered = self.ships.get(&self.local_ship?)?;
        let active = rendered.ship.history().current();
        Some(ClientMessage::Input {
            time: active.timestamp,
            input: active.input,
        })
    }

    pub fn send_input(&self, network: &mut dyn NetworkHandle) {
        if let Some(message) = self.input_message() {
            Self::send(network, &message);
        }
    }

    /// Ticks every ship. Ships stay hidden until the clock has been synced.
    pub fn update(&mut self, dt: f64, renderer: &mut dyn Renderer) -> Vec<Shot> {
        let visible = self.clock.is_synced();
        let mut shots = Vec::new();
        for (ship_id, rendered) in self.ships.iter_mut() {
            if let Some(position) = rendered.update(dt, visible, renderer) {
                shots.push(Shot {
                    ship_id: *ship_id,
                    position,
                });
            }
        }
        shots
    }

    /// Drains every channel and dispatches what decodes.
    pub fn receive(&mut self, network: &mut dyn NetworkHandle, renderer: &mut dyn Renderer) {
        let rtt = network.rtt();
        for channel in [
            AppChannel::ReliableOrdered,
            AppChannel::Unreliable,
            AppChannel::ServerTime,
        ] {
            while let Some(bytes) = network.receive_message(channel) {
                match protocol::decode::<ServerMessage>(&bytes) {
                    Ok(message) => self.dispatch(message, rtt, renderer),
                    Err(e) => tracing::warn!(?channel, error = %e, "dropping undecodable message"),
                }
            }
        }
    }

    pub fn send(network: &mut dyn NetworkHandle, message: &ClientMessage) {
        match protocol::encode(message) {
            Ok(bytes) => network.send_message(AppChannel::Unreliable, bytes),
            Err(e) => tracing::error!(error = %e, "failed to encode client message"),
        }
    }

    fn spawn(&mut self, ship_id: u64, start: Vec3, asset: &str, renderer: &mut dyn Renderer) {
        if self.ships.contains_key(&ship_id) {
            return;
        }
        let rendered = RenderedShip::create(
            start,
            asset,
            self.config,
            self.clock.handle(),
            renderer,
        );
        self.ships.insert(ship_id, rendered);
    }
}
