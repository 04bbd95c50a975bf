pub mod config;
pub mod input;
pub mod net;
pub mod protocol;
pub mod render;
pub mod ring;
pub mod ship;
pub mod time;

#[cfg(test)]
mod test_helpers;
