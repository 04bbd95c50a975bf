use serde::{Deserialize, Serialize};

pub const FIRE: u8 = 4;
pub const LEFT: u8 = 2;
pub const RIGHT: u8 = 1;

const MASK: u8 = FIRE | LEFT | RIGHT;

/// The three ship controls packed into the low bits of a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlWord(u8);

impl ControlWord {
    pub const NONE: ControlWord = ControlWord(0);

    /// Bits outside the three control flags are discarded.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & MASK)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn decode(self) -> ShipInput {
        decode(self)
    }
}

impl From<ShipInput> for ControlWord {
    fn from(input: ShipInput) -> Self {
        encode(input.left, input.right, input.fire)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipInput {
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl ShipInput {
    /// Sign of the strafe velocity along x. Opposing flags cancel.
    pub fn direction(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

pub fn encode(left: bool, right: bool, fire: bool) -> ControlWord {
    let mut bits = 0;
    if fire {
        bits |= FIRE;
    }
    if left {
        bits |= LEFT;
    }
    if right {
        bits |= RIGHT;
    }
    ControlWord(bits)
}

pub fn decode(word: ControlWord) -> ShipInput {
    ShipInput {
        left: word.0 & LEFT != 0,
        right: word.0 & RIGHT != 0,
        fire: word.0 & FIRE != 0,
    }
}
