use std::{net::SocketAddr, time::Duration};

use renet::RenetClient;
use renet_netcode::ConnectToken;

use common::net::AppChannel;

pub trait NetworkHandle {
    fn is_connected(&self) -> bool;
    fn is_disconnected(&self) -> bool;
    fn get_disconnect_reason(&self) -> String;
    /// Round-trip time in seconds.
    fn rtt(&self) -> f64;
    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>);
    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>>;
}

pub struct RenetNetworkHandle<'a> {
    pub client: &'a mut RenetClient,
}

impl<'a> RenetNetworkHandle<'a> {
    pub fn new(client: &'a mut RenetClient) -> Self {
        Self { client }
    }
}

impl NetworkHandle for RenetNetworkHandle<'_> {
    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn is_disconnected(&self) -> bool {
        self.client.is_disconnected()
    }

    fn get_disconnect_reason(&self) -> String {
        match self.client.disconnect_reason() {
            Some(reason) => format!("{:?}", reason),
            None => "no reason given".to_string(),
        }
    }

    fn rtt(&self) -> f64 {
        self.client.rtt()
    }

    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>) {
        self.client.send_message(channel, message);
    }

    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>> {
        self.client
            .receive_message(channel)
            .map(|bytes| bytes.to_vec())
    }
}

// TODO: Fetch the token from a matchmaker instead of minting it with the shared key.
pub fn create_connect_token(
    current_time: Duration,
    protocol_id: u64,
    client_id: u64,
    server_addr: SocketAddr,
    private_key: &[u8; 32],
) -> Result<ConnectToken, String> {
    ConnectToken::generate(
        current_time,
        protocol_id,
        3600,
        client_id,
        15,
        vec![server_addr],
        None,
        private_key,
    )
    .map_err(|e| format!("failed to generate connect token: {}", e))
}
