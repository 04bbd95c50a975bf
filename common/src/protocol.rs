use std::fmt;

use bincode::{
    config::standard,
    serde::{decode_from_slice, encode_to_vec},
};
use glam::Vec3;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::input::ControlWord;

/// Every timestamp on the wire is in server seconds, as estimated by the
/// sender.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ClientMessage {
    Input { time: f64, input: ControlWord },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ServerMessage {
    Welcome {
        ship_id: u64,
        start: Vec3,
        server_time: f64,
    },
    Spawned {
        ship_id: u64,
        start: Vec3,
    },
    Input {
        ship_id: u64,
        time: f64,
        input: ControlWord,
    },
    Position {
        ship_id: u64,
        time: f64,
        position: Vec3,
    },
    Removed {
        ship_id: u64,
    },
    ServerTime(f64),
}

impl ServerMessage {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "Welcome",
            Self::Spawned { .. } => "Spawned",
            Self::Input { .. } => "Input",
            Self::Position { .. } => "Position",
            Self::Removed { .. } => "Removed",
            Self::ServerTime(_) => "ServerTime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Malformed,
    Unencodable(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed => f.write_str("malformed message"),
            ProtocolError::Unencodable(reason) => write!(f, "failed to encode message: {}", reason),
        }
    }
}

impl std::error::Error for ProtocolError {}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    encode_to_vec(message, standard()).map_err(|e| ProtocolError::Unencodable(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    decode_from_slice::<T, _>(bytes, standard())
        .map(|(message, _)| message)
        .map_err(|_| ProtocolError::Malformed)
}

pub fn version() -> u64 {
    env!("CARGO_PKG_VERSION")
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .unwrap_or(0)
}
