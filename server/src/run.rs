use std::{
    fmt,
    net::{SocketAddr, UdpSocket},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use rand::{rng, seq::SliceRandom};
use renet::RenetServer;
use renet_netcode::NetcodeServerTransport;
use tracing::{debug, info, warn};

use crate::{
    net::{self, RenetServerNetworkHandle, ServerNetworkEvent, ServerNetworkHandle},
    world::World,
};
use common::{
    config::ShipConfig,
    net::AppChannel,
    protocol::{self, ClientMessage, ProtocolError, ServerMessage},
    ship::InputOutcome,
    time::{self, Clock, POSITION_BROADCAST_INTERVAL, SystemClock, TICK_DURATION},
};

const MAX_MESSAGES_PER_CLIENT_PER_TICK: u32 = 64;

#[derive(Debug)]
pub enum RunError {
    Transport(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Transport(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}

impl std::error::Error for RunError {}

fn transport_error<E: fmt::Display>(error: E) -> RunError {
    RunError::Transport(error.to_string())
}

pub fn run_server(
    socket: UdpSocket,
    server_addr: SocketAddr,
    private_key: [u8; 32],
    config: ShipConfig,
    running: Arc<AtomicBool>,
) -> Result<(), RunError> {
    let protocol_id = protocol::version();
    let server_config =
        net::build_server_config(time::unix_now(), protocol_id, server_addr, private_key);
    let mut transport =
        NetcodeServerTransport::new(server_config, socket).map_err(transport_error)?;
    let mut server = RenetServer::new(common::net::connection_config());
    let mut world = World::new(config, SystemClock::new());

    info!(protocol_id, %server_addr, "server started");
    server_loop(&mut server, &mut transport, &mut world, &running)?;
    info!("server shutting down");

    Ok(())
}

fn server_loop(
    server: &mut RenetServer,
    transport: &mut NetcodeServerTransport,
    world: &mut World<SystemClock>,
    running: &AtomicBool,
) -> Result<(), RunError> {
    let mut last_updated = Instant::now();
    let mut last_broadcast = Instant::now();

    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        let duration = now - last_updated;
        last_updated = now;

        transport
            .update(duration, server)
            .map_err(transport_error)?;
        server.update(duration);

        let broadcast = now.duration_since(last_broadcast) >= POSITION_BROADCAST_INTERVAL;
        if broadcast {
            last_broadcast = now;
        }

        let mut network_handle = RenetServerNetworkHandle { server };
        update_world(&mut network_handle, world, duration.as_secs_f64(), broadcast);

        transport.send_packets(server);
        thread::sleep(TICK_DURATION.saturating_sub(now.elapsed()));
    }

    Ok(())
}

/// One server tick: connections, inputs, simulation and, when `broadcast`
/// is set, authoritative positions plus the server clock.
pub fn update_world<C: Clock + Clone>(
    network: &mut dyn ServerNetworkHandle,
    world: &mut World<C>,
    dt: f64,
    broadcast: bool,
) {
    process_events(network, world);
    receive_inputs(network, world);
    world.tick(dt);

    if broadcast {
        broadcast_positions(network, world);
        sync_clocks(network, world.now());
    }
}

pub fn process_events<C: Clock + Clone>(network: &mut dyn ServerNetworkHandle, world: &mut World<C>) {
    while let Some(event) = network.get_event() {
        match event {
            ServerNetworkEvent::ClientConnected { client_id } => {
                info!(client_id, "client connected");
                spawn_ship(network, world, client_id);
            }
            ServerNetworkEvent::ClientDisconnected { client_id, reason } => {
                info!(client_id, %reason, "client disconnected");
                if world.remove(client_id) {
                    send(
                        network,
                        Target::All,
                        AppChannel::ReliableOrdered,
                        &ServerMessage::Removed { ship_id: client_id },
                    );
                }
            }
        }
    }
}

fn spawn_ship<C: Clock + Clone>(
    network: &mut dyn ServerNetworkHandle,
    world: &mut World<C>,
    client_id: u64,
) {
    let Some(start) = world.spawn(client_id) else {
        warn!(client_id, "no free lane; disconnecting client");
        network.disconnect(client_id);
        return;
    };

    let welcome = ServerMessage::Welcome {
        ship_id: client_id,
        start,
        server_time: world.now(),
    };
    send(network, Target::One(client_id), AppChannel::ReliableOrdered, &welcome);

    // Introduce the newcomer's neighbours to it, and it to them.
    for (ship_id, position) in world.positions() {
        if ship_id != client_id {
            let spawned = ServerMessage::Spawned {
                ship_id,
                start: position,
            };
            send(network, Target::One(client_id), AppChannel::ReliableOrdered, &spawned);
        }
    }

    let spawned = ServerMessage::Spawned {
        ship_id: client_id,
        start,
    };
    send(network, Target::AllExcept(client_id), AppChannel::ReliableOrdered, &spawned);
}

pub fn receive_inputs<C: Clock + Clone>(network: &mut dyn ServerNetworkHandle, world: &mut World<C>) {
    let mut client_ids = network.clients_id();

    // If a tick runs long, no single client is always the one processed last.
    client_ids.shuffle(&mut rng());

    for client_id in client_ids {
        let mut messages_this_client = 0;
        let mut latest = None;

        // Clients resend their current input every frame, so only the newest
        // message of the tick needs decoding.
        while let Some(data) = network.receive_message(client_id, AppChannel::Unreliable) {
            messages_this_client += 1;
            latest = Some(data);
        }

        if messages_this_client > MAX_MESSAGES_PER_CLIENT_PER_TICK {
            debug!(
                client_id,
                messages_this_client, "per-tick message limit exceeded; kept the newest"
            );
        }

        let Some(data) = latest else {
            continue;
        };

        match protocol::decode::<ClientMessage>(&data) {
            Ok(ClientMessage::Input { time, input }) => {
                if world.apply_input(client_id, time, input) == Some(InputOutcome::Applied) {
                    let relay = ServerMessage::Input {
                        ship_id: client_id,
                        time,
                        input,
                    };
                    send(network, Target::AllExcept(client_id), AppChannel::Unreliable, &relay);
                }
            }
            Err(error) => {
                warn!(client_id, %error, "client sent bad data; disconnecting them");
                network.disconnect(client_id);
            }
        }
    }
}

/// Repeats every ship's active input alongside its position, so a client
/// that lost the immediate relay still converges on the next broadcast.
fn broadcast_positions<C: Clock + Clone>(network: &mut dyn ServerNetworkHandle, world: &World<C>) {
    let time = world.now();
    for (ship_id, sample) in world.inputs() {
        let message = ServerMessage::Input {
            ship_id,
            time: sample.timestamp,
            input: sample.input,
        };
        send(network, Target::All, AppChannel::Unreliable, &message);
    }
    for (ship_id, position) in world.positions() {
        let message = ServerMessage::Position {
            ship_id,
            time,
            position,
        };
        send(network, Target::All, AppChannel::Unreliable, &message);
    }
}

fn sync_clocks(network: &mut dyn ServerNetworkHandle, server_time: f64) {
    send(
        network,
        Target::All,
        AppChannel::ServerTime,
        &ServerMessage::ServerTime(server_time),
    );
}

enum Target {
    One(u64),
    All,
    AllExcept(u64),
}

fn send(
    network: &mut dyn ServerNetworkHandle,
    target: Target,
    channel: AppChannel,
    message: &ServerMessage,
) {
    let payload = match protocol::encode(message) {
        Ok(payload) => payload,
        Err(error) => {
            report_unencodable(message, &error);
            return;
        }
    };

    match target {
        Target::One(client_id) => network.send_message(client_id, channel, payload),
        Target::All => network.broadcast_message(channel, payload),
        Target::AllExcept(client_id) => network.broadcast_message_except(client_id, channel, payload),
    }
}

fn report_unencodable(message: &ServerMessage, error: &ProtocolError) {
    warn!(message = message.variant_name(), %error, "dropping message");
}
