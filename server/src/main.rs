use std::{
    io, process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{error, info};

use common::config::ShipConfig;

fn main() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    server::init_tracing();

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("server forced to shut down");
        handler_flag.store(false, Ordering::Relaxed);
    }) {
        error!(error = %e, "failed to install Ctrl-C handler");
        process::exit(1);
    }

    let config = match ShipConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid ship configuration");
            process::exit(1);
        }
    };

    let server_addr = match common::net::server_address() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "invalid IP or PORT");
            process::exit(1);
        }
    };

    let socket = match common::net::bind_socket(server_addr) {
        Ok(socket) => {
            info!(%server_addr, "server listening");
            socket
        }
        Err(e) => {
            error!(error = %e, "failed to bind socket");
            if e.kind() == io::ErrorKind::AddrInUse {
                error!("is another instance of the server already running?");
            }
            process::exit(1);
        }
    };

    let private_key = common::net::private_key();
    if let Err(e) = server::run_server(socket, server_addr, private_key, config, running) {
        error!(error = %e, "server stopped");
        process::exit(1);
    }
}
