use std::{
    fmt,
    io::{self, Stdout, Write, stdout},
    net::{SocketAddr, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{self, Clear, ClearType},
};
use renet::RenetClient;
use renet_netcode::{ClientAuthentication, NetcodeClientTransport};

use common::{config::ShipConfig, time::unix_now};

use crate::{
    input::{KeyLatch, KeyOutcome},
    net::{self, NetworkHandle, RenetNetworkHandle},
    render::TerminalRenderer,
    session::ClientSession,
};

const FRAME_SLEEP: Duration = Duration::from_millis(16);

#[derive(Debug)]
pub enum ClientError {
    Io(io::Error),
    Transport(String),
    Disconnected(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "terminal error: {}", e),
            ClientError::Transport(e) => write!(f, "transport error: {}", e),
            ClientError::Disconnected(reason) => write!(f, "disconnected: {}", reason),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}

/// Restores the terminal however the loop exits.
struct RawTerminal {
    stdout: Stdout,
}

impl RawTerminal {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, Hide, Clear(ClearType::All))?;
        Ok(Self { stdout })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, Show);
        let _ = terminal::disable_raw_mode();
    }
}

pub struct ClientRunner {
    pub session: ClientSession,
    pub client: RenetClient,
    pub transport: NetcodeClientTransport,
    pub renderer: TerminalRenderer,
    keys: KeyLatch,
    last_updated: Instant,
}

impl ClientRunner {
    pub fn new(
        socket: UdpSocket,
        server_addr: SocketAddr,
        private_key: [u8; 32],
        session: ClientSession,
    ) -> Result<Self, ClientError> {
        let protocol_id = common::protocol::version();
        let current_time = unix_now();
        socket.set_nonblocking(true)?;

        let connect_token = net::create_connect_token(
            current_time,
            protocol_id,
            session.client_id,
            server_addr,
            &private_key,
        )
        .map_err(ClientError::Transport)?;
        let authentication = ClientAuthentication::Secure { connect_token };
        let transport = NetcodeClientTransport::new(current_time, authentication, socket)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let client = RenetClient::new(common::net::connection_config());

        Ok(Self {
            session,
            client,
            transport,
            renderer: TerminalRenderer::new(),
            keys: KeyLatch::default(),
            last_updated: Instant::now(),
        })
    }

    /// Runs until the player quits or the connection drops.
    pub fn run(&mut self) -> Result<(), ClientError> {
        let mut terminal = RawTerminal::enter()?;

        loop {
            let now = Instant::now();
            let dt = now - self.last_updated;
            self.last_updated = now;

            self.client.update(dt);
            self.transport
                .update(dt, &mut self.client)
                .map_err(|e| ClientError::Transport(e.to_string()))?;

            let quit = self.frame(dt, &mut terminal.stdout)?;

            self.transport
                .send_packets(&mut self.client)
                .map_err(|e| ClientError::Transport(e.to_string()))?;

            if quit {
                self.transport.disconnect();
                tracing::info!("quit requested");
                return Ok(());
            }

            thread::sleep(FRAME_SLEEP);
        }
    }

    fn frame(&mut self, dt: Duration, out: &mut impl Write) -> Result<bool, ClientError> {
        let mut network = RenetNetworkHandle::new(&mut self.client);

        if network.is_disconnected() {
            return Err(ClientError::Disconnected(network.get_disconnect_reason()));
        }
        if !network.is_connected() {
            return Ok(matches!(self.keys.poll()?, KeyOutcome::Quit));
        }

        self.session.clock_mut().advance(dt);
        self.session.receive(&mut network, &mut self.renderer);

        match self.keys.poll()? {
            KeyOutcome::Quit => return Ok(true),
            KeyOutcome::Changed(word) => {
                self.session.set_local_input(word);
            }
            KeyOutcome::Unchanged => {}
        }
        self.session.send_input(&mut network);

        for shot in self.session.update(dt.as_secs_f64(), &mut self.renderer) {
            tracing::debug!(ship_id = shot.ship_id, x = shot.position.x, "shot fired");
            self.renderer.flash_shot(shot.position.x);
        }

        self.renderer.draw(out, 0)?;
        Ok(false)
    }
}

pub fn run_client(
    server_addr: SocketAddr,
    private_key: [u8; 32],
    config: ShipConfig,
) -> Result<(), ClientError> {
    let client_id = rand::random::<u64>();
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    tracing::info!(%server_addr, client_id, "connecting");

    let session = ClientSession::new(client_id, config);
    let mut runner = ClientRunner::new(socket, server_addr, private_key, session)?;
    runner.run()
}
