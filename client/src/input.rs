use std::{io, time::Duration};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use common::input::{ControlWord, ShipInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Unchanged,
    Changed(ControlWord),
    Quit,
}

/// Terminals report presses but not releases, so controls latch until another
/// key changes them.
#[derive(Debug, Default)]
pub struct KeyLatch {
    state: ShipInput,
}

impl KeyLatch {
    pub fn word(&self) -> ControlWord {
        self.state.into()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind != KeyEventKind::Press {
            return KeyOutcome::Unchanged;
        }

        if key.modifiers == KeyModifiers::CONTROL
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            return KeyOutcome::Quit;
        }

        let before = self.state;
        match key.code {
            KeyCode::Left | KeyCode::Char('a') => {
                self.state.left = true;
                self.state.right = false;
            }
            KeyCode::Right | KeyCode::Char('d') => {
                self.state.left = false;
                self.state.right = true;
            }
            KeyCode::Down | KeyCode::Char('s') => {
                self.state.left = false;
                self.state.right = false;
            }
            KeyCode::Char(' ') => self.state.fire = !self.state.fire,
            KeyCode::Esc | KeyCode::Char('q') => return KeyOutcome::Quit,
            _ => {}
        }

        if self.state == before {
            KeyOutcome::Unchanged
        } else {
            KeyOutcome::Changed(self.word())
        }
    }

    /// Drains pending terminal events without blocking. Returns the last
    /// change, or `Quit` as soon as one is seen.
    pub fn poll(&mut self) -> io::Result<KeyOutcome> {
        let mut outcome = KeyOutcome::Unchanged;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                match self.handle_key(key) {
                    KeyOutcome::Quit => return Ok(KeyOutcome::Quit),
                    KeyOutcome::Changed(word) => outcome = KeyOutcome::Changed(word),
                    KeyOutcome::Unchanged => {}
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::input::encode;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn strafe_keys_latch_and_replace_each_other() {
        let mut latch = KeyLatch::default();

        assert_eq!(
            latch.handle_key(press(KeyCode::Left)),
            KeyOutcome::Changed(encode(true, false, false))
        );
        assert_eq!(
            latch.handle_key(press(KeyCode::Right)),
            KeyOutcome::Changed(encode(false, true, false))
        );
        assert_eq!(latch.handle_key(press(KeyCode::Right)), KeyOutcome::Unchanged);
    }

    #[test]
    fn down_stops_and_space_toggles_fire() {
        let mut latch = KeyLatch::default();
        latch.handle_key(press(KeyCode::Left));
        latch.handle_key(press(KeyCode::Char(' ')));

        assert_eq!(
            latch.handle_key(press(KeyCode::Down)),
            KeyOutcome::Changed(encode(false, false, true))
        );
        assert_eq!(
            latch.handle_key(press(KeyCode::Char(' '))),
            KeyOutcome::Changed(ControlWord::NONE)
        );
    }

    #[test]
    fn quit_keys() {
        let mut latch = KeyLatch::default();

        assert_eq!(latch.handle_key(press(KeyCode::Esc)), KeyOutcome::Quit);
        assert_eq!(latch.handle_key(press(KeyCode::Char('q'))), KeyOutcome::Quit);
        assert_eq!(
            latch.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn releases_are_ignored() {
        let mut latch = KeyLatch::default();
        let mut release = press(KeyCode::Left);
        release.kind = KeyEventKind::Release;

        assert_eq!(latch.handle_key(release), KeyOutcome::Unchanged);
        assert_eq!(latch.word(), ControlWord::NONE);
    }
}
