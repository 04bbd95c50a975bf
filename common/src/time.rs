use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

// Server simulation runs at 60Hz.
pub const TICK_DURATION: Duration = Duration::from_micros(16667);

// Authoritative positions and server time go out at 20Hz.
pub const POSITION_BROADCAST_INTERVAL: Duration = Duration::from_millis(50);

pub fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time is before unix epoch")
}

/// Monotonic time in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock whose value is set from outside. Clones share the same reading,
/// so one owner can drive every ship that holds a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedClock {
    now: Rc<Cell<f64>>,
}

impl SharedClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for SharedClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}
