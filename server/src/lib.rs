pub mod net;
pub mod run;
pub mod world;

#[cfg(test)]
mod test_helpers;

pub use net::{RenetServerNetworkHandle, ServerNetworkEvent, ServerNetworkHandle};
pub use run::{process_events, receive_inputs, run_server, update_world};
pub use world::World;

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
