use glam::Vec3;
use tracing::debug;

use crate::{
    config::ShipConfig,
    input::{ControlWord, ShipInput},
    render::RenderPose,
    ring::{History, HistoryError, InputSample},
    time::Clock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Applied,
    /// Same control word as the active input; nothing changed.
    Duplicate,
    /// Effective before the active input started; superseded already.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionOutcome {
    Corrected(Vec3),
    Suppressed,
}

/// Result of one `Ship::tick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub fire_position: Option<Vec3>,
    pub pose: RenderPose,
    pub visible: bool,
}

impl Frame {
    pub fn is_firing(&self) -> bool {
        self.fire_position.is_some()
    }
}

enum Replay {
    Exact(Vec3),
    Clamped { position: Vec3, oldest: f64 },
}

/// A strafing ship whose movement is a function of its input history.
///
/// `position` is always current to `clock.now()`. Late inputs are merged by
/// rewinding and replaying the most recent segment, and authoritative
/// positions become an `offset` that `tick` folds into `position` over
/// several frames.
pub struct Ship<C: Clock> {
    position: Vec3,
    offset: Vec3,
    fire_cooldown: f64,
    alt_fire: bool,
    history: History,
    config: ShipConfig,
    clock: C,
}

impl<C: Clock> Ship<C> {
    pub fn new(start: Vec3, config: ShipConfig, clock: C) -> Self {
        let initial = InputSample {
            timestamp: clock.now(),
            input: ControlWord::NONE,
        };

        Self {
            position: start,
            offset: Vec3::ZERO,
            fire_cooldown: 0.0,
            alt_fire: false,
            history: History::new(config.history_capacity, initial),
            config,
            clock,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn fire_cooldown(&self) -> f64 {
        self.fire_cooldown
    }

    pub fn alt_fire(&self) -> bool {
        self.alt_fire
    }

    pub fn current_input(&self) -> ControlWord {
        self.history.current().input
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &ShipConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pose(&self) -> RenderPose {
        RenderPose::new(
            self.position,
            self.current_input().decode(),
            self.config.render_scale,
        )
    }

    /// Where the ship was at `time`, including any pending offset. Queries
    /// older than the retained history are clamped to the oldest sample.
    pub fn position_at(&self, time: f64) -> Vec3 {
        match self.replay(time) {
            Replay::Exact(position) => position,
            Replay::Clamped { position, oldest } => {
                debug!(time, oldest, "history exhausted; clamped to oldest sample");
                position
            }
        }
    }

    /// Like `position_at`, but reports a query older than the retained
    /// history instead of clamping it.
    pub fn try_position_at(&self, time: f64) -> Result<Vec3, HistoryError> {
        match self.replay(time) {
            Replay::Exact(position) => Ok(position),
            Replay::Clamped { .. } => {
                let capacity = self.history.capacity();
                Err(HistoryError::Exhausted {
                    steps: capacity,
                    capacity,
                })
            }
        }
    }

    fn replay(&self, time: f64) -> Replay {
        let mut result = self.position + self.offset;
        let mut oldest = f64::INFINITY;

        for (sample, interval_end) in self.history.iter_back(self.clock.now()) {
            let input = sample.input.decode();

            if time < sample.timestamp {
                // Fully revert an input that started after `time`.
                integrate(
                    &mut result,
                    input,
                    self.config.speed,
                    -(interval_end - sample.timestamp),
                );
                oldest = sample.timestamp;
            } else {
                // Partly revert the input that was active at `time`.
                integrate(&mut result, input, self.config.speed, -(interval_end - time));
                return Replay::Exact(result);
            }
        }

        // With a free slot left, the oldest sample is the one written at
        // construction and nothing moved the ship before it.
        if self.history.is_full() {
            Replay::Clamped {
                position: result,
                oldest,
            }
        } else {
            Replay::Exact(result)
        }
    }

    /// Merges an input that became effective at `time`: rolls the current
    /// input back to `time`, records the new one and replays it to now.
    pub fn apply_input(&mut self, time: f64, input: ControlWord) -> InputOutcome {
        let head = self.history.current();
        if input == head.input {
            return InputOutcome::Duplicate;
        }

        if time < head.timestamp {
            debug!(
                time,
                head = head.timestamp,
                "input older than the active one; dropping"
            );
            return InputOutcome::Stale;
        }

        let now = self.clock.now();
        let time = time.min(now);
        let elapsed = now - time;

        integrate(
            &mut self.position,
            head.input.decode(),
            self.config.speed,
            -elapsed,
        );

        // Only the latest transition is corrected: senders report their
        // current state with a latency estimate, so there is nothing to
        // identify stray packets by.
        self.history.push(InputSample {
            timestamp: time,
            input,
        });

        integrate(&mut self.position, input.decode(), self.config.speed, elapsed);

        InputOutcome::Applied
    }

    /// Compares an authoritative position for `time` with where this ship
    /// thinks it was and stores the difference as the pending offset.
    pub fn apply_position(&mut self, time: f64, position: Vec3) -> PositionOutcome {
        // The remote side may not have seen a recent input change yet.
        let since_change = self.clock.now() - self.history.current().timestamp;
        if since_change > 0.0 && since_change < self.config.reconciliation_grace {
            debug!(since_change, "position correction suppressed");
            return PositionOutcome::Suppressed;
        }

        let diff = position - self.position_at(time);
        self.offset = diff;

        PositionOutcome::Corrected(diff)
    }

    /// Starts a new cooldown, shortened or lengthened by `time_offset`, and
    /// switches the side the next shot spawns on.
    pub fn reset_fire(&mut self, time_offset: f64) {
        self.fire_cooldown = (self.config.fire_rate + time_offset).max(0.0);
        self.alt_fire = !self.alt_fire;
    }

    pub fn tick(&mut self, dt: f64, visible: bool) -> Frame {
        let input = self.current_input().decode();

        integrate(&mut self.position, input, self.config.speed, dt);

        self.fire_cooldown -= dt;
        let mut fire_position = None;
        if input.fire && self.fire_cooldown <= 0.0 {
            let lateral = Vec3::new(self.config.fire_offset, 0.0, 0.0);
            fire_position = Some(if self.alt_fire {
                self.position - lateral
            } else {
                self.position + lateral
            });
            self.reset_fire(0.0);
        }

        self.dissipate_offset(dt);

        Frame {
            fire_position,
            pose: RenderPose::new(self.position, input, self.config.render_scale),
            visible,
        }
    }

    fn dissipate_offset(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        let dt = dt as f32;
        if dt >= 1.0 || self.offset.length_squared() < dt * dt {
            self.position += self.offset;
            self.offset = Vec3::ZERO;
        } else {
            let step = self.offset * dt;
            self.position += step;
            self.offset -= step;
        }
    }
}

fn integrate(position: &mut Vec3, input: ShipInput, speed: f32, time: f64) {
    position.x += input.direction() * speed * time as f32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{input::encode, time::SharedClock};

    const EPSILON: f32 = 1e-3;

    fn left() -> ControlWord {
        encode(true, false, false)
    }

    fn right() -> ControlWord {
        encode(false, true, false)
    }

    fn fire() -> ControlWord {
        encode(false, false, true)
    }

    fn ship_at_origin() -> (Ship<SharedClock>, SharedClock) {
        let clock = SharedClock::new(0.0);
        let ship = Ship::new(Vec3::ZERO, ShipConfig::default(), clock.clone());
        (ship, clock)
    }

    fn run(ship: &mut Ship<SharedClock>, clock: &SharedClock, seconds: f64, dt: f64) {
        let frames = (seconds / dt).round() as usize;
        for _ in 0..frames {
            clock.advance(dt);
            ship.tick(dt, true);
        }
    }

    #[test]
    fn new_ship_is_idle_with_one_history_sample() {
        let (ship, _) = ship_at_origin();

        assert_eq!(ship.position(), Vec3::ZERO);
        assert_eq!(ship.offset(), Vec3::ZERO);
        assert_eq!(ship.current_input(), ControlWord::NONE);
        assert_eq!(ship.history().len(), 1);
    }

    #[test]
    fn holding_left_for_a_second_moves_three_hundred_units() {
        let (mut ship, clock) = ship_at_origin();

        assert_eq!(ship.apply_input(0.0, left()), InputOutcome::Applied);
        clock.advance(1.0);
        ship.tick(1.0, true);

        assert_eq!(ship.position().x, -300.0);
    }

    #[test]
    fn late_input_rewinds_and_replays_the_last_segment() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, left());
        clock.advance(1.0);
        ship.tick(1.0, true);

        // Right actually started half a second ago:
        // -300 + 150 (undo 0.5s of left) + 150 (redo 0.5s of right) = 0.
        assert_eq!(ship.apply_input(0.5, right()), InputOutcome::Applied);

        assert!((ship.position().x - 0.0).abs() < EPSILON);
        assert_eq!(ship.current_input(), right());
        assert_eq!(ship.history().current().timestamp, 0.5);
    }

    #[test]
    fn late_input_for_the_whole_interval_flips_the_movement() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, left());
        clock.advance(1.0);
        ship.tick(1.0, true);

        // Reported one second late: -300 + 300 (undo 1s of left) + 300 (redo 1s of right) = 300.
        assert_eq!(ship.apply_input(0.0, right()), InputOutcome::Applied);
        assert!((ship.position().x - 300.0).abs() < EPSILON);
    }

    #[test]
    fn repeated_input_only_mutates_on_first_delivery() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(0.2);

        assert_eq!(ship.apply_input(0.1, left()), InputOutcome::Applied);
        let position = ship.position();
        let history_len = ship.history().len();

        assert_eq!(ship.apply_input(0.1, left()), InputOutcome::Duplicate);
        assert_eq!(ship.apply_input(0.15, left()), InputOutcome::Duplicate);
        assert_eq!(ship.position(), position);
        assert_eq!(ship.history().len(), history_len);
    }

    #[test]
    fn input_older_than_the_active_one_is_dropped() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(2.0);
        ship.apply_input(1.5, left());
        let position = ship.position();

        assert_eq!(ship.apply_input(1.0, right()), InputOutcome::Stale);
        assert_eq!(ship.position(), position);
        assert_eq!(ship.current_input(), left());
    }

    #[test]
    fn input_from_the_future_is_applied_at_now() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(1.0);

        ship.apply_input(3.0, right());

        assert_eq!(ship.history().current().timestamp, 1.0);
        assert_eq!(ship.position(), Vec3::ZERO);
    }

    #[test]
    fn replay_at_now_is_position_plus_offset() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, left());
        run(&mut ship, &clock, 0.5, 0.05);
        clock.advance(1.0);
        ship.apply_position(clock.now() - 0.2, Vec3::new(40.0, 0.0, 0.0));

        assert_eq!(ship.position_at(clock.now()), ship.position() + ship.offset());
    }

    #[test]
    fn replay_is_deterministic() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, left());
        run(&mut ship, &clock, 0.3, 0.01);
        ship.apply_input(0.25, right());
        run(&mut ship, &clock, 0.3, 0.01);

        let first = ship.position_at(0.2);
        let second = ship.position_at(0.2);
        assert_eq!(first, second);
    }

    #[test]
    fn replay_then_reintegrate_round_trips() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, right());
        run(&mut ship, &clock, 1.0, 0.02);

        let d = 0.4;
        let mut past = ship.position_at(clock.now() - d);
        integrate(&mut past, right().decode(), ship.config().speed, d);

        assert!((past - ship.position()).length() < 1e-3);
    }

    #[test]
    fn replay_walks_back_across_several_inputs() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, right());
        clock.advance(1.0);
        ship.tick(1.0, true);
        ship.apply_input(1.0, left());
        clock.advance(0.5);
        ship.tick(0.5, true);

        // +300 then -150.
        assert!((ship.position().x - 150.0).abs() < EPSILON);
        assert!((ship.position_at(1.0).x - 300.0).abs() < EPSILON);
        assert!((ship.position_at(0.5).x - 150.0).abs() < EPSILON);
        assert!((ship.position_at(0.0).x - 0.0).abs() < EPSILON);
    }

    #[test]
    fn replay_before_construction_stops_at_the_start_position() {
        let clock = SharedClock::new(5.0);
        let mut ship = Ship::new(Vec3::new(7.0, 0.0, 0.0), ShipConfig::default(), clock.clone());
        ship.apply_input(5.0, left());
        clock.advance(1.0);
        ship.tick(1.0, true);

        assert!((ship.position_at(-100.0).x - 7.0).abs() < EPSILON);
        assert!(ship.try_position_at(-100.0).is_ok());
    }

    #[test]
    fn only_the_most_recent_inputs_are_queryable() {
        let (mut ship, clock) = ship_at_origin();
        let capacity = ship.config().history_capacity;

        for i in 0..capacity + 5 {
            clock.advance(0.1);
            let word = if i % 2 == 0 { right() } else { left() };
            assert_eq!(ship.apply_input(clock.now(), word), InputOutcome::Applied);
        }
        clock.advance(0.1);

        let oldest = ship.history().oldest().timestamp;
        assert!(ship.history().is_full());
        assert!((oldest - 0.6).abs() < 1e-9);

        assert!(ship.try_position_at(oldest + 0.05).is_ok());
        assert_eq!(
            ship.try_position_at(0.0),
            Err(HistoryError::Exhausted {
                steps: capacity,
                capacity
            })
        );

        // Clamped rather than crashed: the answer is the position at the
        // oldest retained sample.
        let clamped = ship.position_at(0.0);
        assert!((clamped - ship.position_at(oldest)).length() < EPSILON);
    }

    #[test]
    fn position_inside_grace_window_is_ignored() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(1.0);
        ship.apply_input(1.0, right());
        clock.advance(0.2);

        let outcome = ship.apply_position(1.1, Vec3::new(500.0, 0.0, 0.0));

        assert_eq!(outcome, PositionOutcome::Suppressed);
        assert_eq!(ship.offset(), Vec3::ZERO);
    }

    #[test]
    fn position_correction_becomes_the_offset() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, right());
        run(&mut ship, &clock, 1.0, 0.1);

        // The authority thinks the ship was 10 units further right at 0.8s.
        let expected = ship.position_at(0.8) + Vec3::new(10.0, 0.0, 0.0);
        let outcome = ship.apply_position(0.8, expected);

        match outcome {
            PositionOutcome::Corrected(diff) => {
                assert!((diff - Vec3::new(10.0, 0.0, 0.0)).length() < EPSILON)
            }
            PositionOutcome::Suppressed => panic!("correction should not be suppressed"),
        }
        assert!((ship.offset() - Vec3::new(10.0, 0.0, 0.0)).length() < EPSILON);
    }

    #[test]
    fn offset_converges_to_exactly_zero_and_is_conserved() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(1.0);
        ship.apply_position(1.0, Vec3::new(0.0, 60.0, -80.0));
        assert_eq!(ship.offset(), Vec3::new(0.0, 60.0, -80.0));

        let dt = 1.0 / 60.0;
        let mut previous = ship.offset().length();
        let mut frames = 0;
        while ship.offset() != Vec3::ZERO {
            ship.tick(dt, true);
            let magnitude = ship.offset().length();
            assert!(magnitude < previous);
            previous = magnitude;
            frames += 1;
            assert!(frames < 10_000, "offset failed to converge");
        }

        assert!((ship.position() - Vec3::new(0.0, 60.0, -80.0)).length() < 0.05);
    }

    #[test]
    fn large_frame_step_folds_offset_without_overshoot() {
        let (mut ship, clock) = ship_at_origin();
        clock.advance(1.0);
        ship.apply_position(1.0, Vec3::new(3.0, 0.0, 0.0));

        ship.tick(1.5, true);

        assert_eq!(ship.offset(), Vec3::ZERO);
        assert_eq!(ship.position(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn shots_alternate_sides_and_respect_the_cooldown() {
        let (mut ship, clock) = ship_at_origin();
        ship.apply_input(0.0, fire());

        clock.advance(0.01);
        let first = ship.tick(0.01, true);
        assert_eq!(first.fire_position, Some(Vec3::new(25.0, 0.0, 0.0)));
        assert!(ship.alt_fire());
        assert!(ship.fire_cooldown() >= 0.0);

        clock.advance(0.05);
        let blocked = ship.tick(0.05, true);
        assert!(!blocked.is_firing());

        clock.advance(0.06);
        let second = ship.tick(0.06, true);
        assert_eq!(second.fire_position, Some(Vec3::new(-25.0, 0.0, 0.0)));
        assert!(!ship.alt_fire());
    }

    #[test]
    fn reset_fire_never_leaves_a_negative_cooldown() {
        let (mut ship, _) = ship_at_origin();

        ship.reset_fire(-1.0);

        assert_eq!(ship.fire_cooldown(), 0.0);
        assert!(ship.alt_fire());
    }

    #[test]
    fn frame_passes_visibility_through() {
        let (mut ship, _) = ship_at_origin();

        assert!(!ship.tick(0.016, false).visible);
        assert!(ship.tick(0.016, true).visible);
    }
}
