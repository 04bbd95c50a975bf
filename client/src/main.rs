use std::process;

use common::{config::ShipConfig, net};

fn main() {
    dotenvy::dotenv().ok();
    client::init_tracing();

    let config = match ShipConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid ship configuration: {}.", e);
            process::exit(1);
        }
    };

    let server_addr = match net::server_address() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid server address: {}.", e);
            process::exit(1);
        }
    };

    if let Err(e) = client::run_client(server_addr, net::private_key(), config) {
        tracing::error!(error = %e, "client stopped");
        eprintln!("Client stopped: {}.", e);
        process::exit(1);
    }
}
