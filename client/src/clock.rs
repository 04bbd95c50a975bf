use std::time::Duration;

use common::time::{Clock, SharedClock};

// ServerTime messages arrive at 20Hz, every 50ms.

// Thresholds
const HARD_SNAP_THRESHOLD: f64 = 1.0; // >1s: Just teleport.
const FAST_CATCHUP_THRESHOLD: f64 = 0.25; // >250ms: Speed up significantly.
const MODERATE_DRIFT_THRESHOLD: f64 = 0.05; // >50ms: Standard correction.

// Alphas
const ALPHA_FAST: f64 = 0.3;
const ALPHA_NORMAL: f64 = 0.1;
const ALPHA_JITTER: f64 = 0.03; // High damping for noise.

// Speed limits
const BASE_CLOCK_CORRECTION_LIMIT: f64 = 0.01;
const MAX_CLOCK_CORRECTION_LIMIT: f64 = 0.05;
const CLOCK_CORRECTION_RATIO: f64 = 0.25;

pub const MAX_REASONABLE_RTT: f64 = 1.0;

/// The client's estimate of server time. Every ship reads it through the
/// shared handle, so a nudge here is seen by all of them at once.
#[derive(Debug)]
pub struct ServerClock {
    estimate: SharedClock,
    synced: bool,
    since_sync: f64,
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            estimate: SharedClock::new(0.0),
            synced: false,
            since_sync: 0.0,
        }
    }

    pub fn handle(&self) -> SharedClock {
        self.estimate.clone()
    }

    pub fn now(&self) -> f64 {
        self.estimate.now()
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn advance(&mut self, interval: Duration) {
        let seconds = interval.as_secs_f64();
        self.estimate.advance(seconds);
        self.since_sync += seconds;
    }

    /// Jumps straight to `target`.
    pub fn snap(&mut self, target: f64) {
        self.estimate.set(target);
        self.synced = true;
        self.since_sync = 0.0;
        tracing::info!(time = target, "clock snapped to server time");
    }

    /// Moves the estimate towards `server_sent_time` plus half the round
    /// trip. Once synced, the clock only jumps forwards; when it runs ahead it
    /// slows down instead, since ship histories assume time never goes back.
    pub fn sync(&mut self, server_sent_time: f64, rtt: f64) {
        if rtt > MAX_REASONABLE_RTT {
            tracing::debug!(rtt, "discarding server time with stale round trip");
            return;
        }

        let target = server_sent_time + rtt / 2.0;
        let delta = target - self.now();

        if !self.synced || delta > HARD_SNAP_THRESHOLD {
            self.snap(target);
            return;
        }

        let nudge = correction(delta).max(-self.since_sync);
        self.estimate.advance(nudge);
        self.since_sync = 0.0;
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

fn correction(delta: f64) -> f64 {
    let alpha = if delta.abs() > FAST_CATCHUP_THRESHOLD {
        ALPHA_FAST
    } else if delta.abs() > MODERATE_DRIFT_THRESHOLD {
        ALPHA_NORMAL
    } else {
        ALPHA_JITTER
    };

    let raw_correction = delta * alpha;

    // Low error: prioritize smoothness. High error: prioritize speed.
    let dynamic_limit = (delta.abs() * CLOCK_CORRECTION_RATIO)
        .clamp(BASE_CLOCK_CORRECTION_LIMIT, MAX_CLOCK_CORRECTION_LIMIT);

    raw_correction.clamp(-dynamic_limit, dynamic_limit)
}
