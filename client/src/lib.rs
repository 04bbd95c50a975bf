pub mod clock;
pub mod input;
pub mod net;
pub mod render;
pub mod run;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use clock::ServerClock;
pub use net::{NetworkHandle, RenetNetworkHandle};
pub use render::TerminalRenderer;
pub use run::{ClientError, ClientRunner, run_client};
pub use session::{ClientSession, Shot};

/// Logs go to stderr, since stdout carries the strip. Quiet by default so
/// the terminal stays readable; redirect stderr to keep a trace.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}
