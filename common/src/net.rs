use std::{
    env, io,
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

use renet::{ChannelConfig, ConnectionConfig, SendType};
use socket2::{Domain, Socket, Type};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5000";

const DEFAULT_PRIVATE_KEY: [u8; 32] = [
    211, 120, 2, 54, 202, 170, 80, 236, 225, 33, 220, 193, 223, 199, 20, 80, 202, 88, 77, 123, 88,
    129, 160, 222, 33, 251, 99, 37, 145, 18, 199, 199,
];

/// Shared by server and client so the client can mint its own connect token.
pub fn private_key() -> [u8; 32] {
    DEFAULT_PRIVATE_KEY
}

/// Reads `IP` and `PORT` from the environment (after loading `.env`), falling
/// back to the local default.
pub fn server_address() -> Result<SocketAddr, std::net::AddrParseError> {
    dotenvy::dotenv().ok();

    let ip = env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

    format!("{}:{}", ip, port).parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppChannel {
    ReliableOrdered,
    Unreliable,
    ServerTime,
}

impl From<AppChannel> for u8 {
    fn from(channel: AppChannel) -> Self {
        match channel {
            AppChannel::ReliableOrdered => 0,
            AppChannel::Unreliable => 1,
            AppChannel::ServerTime => 2,
        }
    }
}

/// Spawns and removals are reliable. Inputs and positions are unreliable and
/// streamed: clients resend their active input every frame and the server
/// repeats every ship's input with each position broadcast, so a lost
/// datagram is superseded by the next one.
pub fn connection_config() -> ConnectionConfig {
    let reliable_config = ChannelConfig {
        channel_id: 0,
        max_memory_usage_bytes: 5 * 1024 * 1024,
        send_type: SendType::ReliableOrdered {
            resend_time: Duration::from_millis(100),
        },
    };

    let unreliable_config = ChannelConfig {
        channel_id: 1,
        max_memory_usage_bytes: 5 * 1024 * 1024,
        send_type: SendType::Unreliable,
    };

    let time_sync_config = ChannelConfig {
        channel_id: 2,
        max_memory_usage_bytes: 1024 * 1024,
        send_type: SendType::Unreliable,
    };

    let client_channels_config = vec![reliable_config.clone(), unreliable_config.clone()];
    let server_channels_config = vec![reliable_config, unreliable_config, time_sync_config];

    ConnectionConfig {
        client_channels_config,
        server_channels_config,
        ..Default::default()
    }
}

pub fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
