use std::{env, fmt, str::FromStr};

/// Gameplay tuning for a ship. `Default` holds the reference values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipConfig {
    /// Strafe speed in units per second.
    pub speed: f32,

    /// Seconds between two shots while fire is held.
    pub fire_rate: f64,

    /// Number of input samples retained for replaying past positions.
    pub history_capacity: usize,

    /// Seconds after a local input change during which authoritative
    /// positions are ignored.
    pub reconciliation_grace: f64,

    /// Lateral distance from the hull at which shots spawn.
    pub fire_offset: f32,

    pub render_scale: f32,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            speed: 300.0,
            fire_rate: 0.1,
            history_capacity: 10,
            reconciliation_grace: 0.5,
            fire_offset: 25.0,
            render_scale: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Unparsable { key: &'static str, value: String },
    OutOfRange { key: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unparsable { key, value } => {
                write!(f, "{} has an unparsable value '{}'", key, value)
            }
            ConfigError::OutOfRange { key, reason } => write!(f, "{} {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ShipConfig {
    /// Reads overrides from the process environment after loading `.env`, if
    /// there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            speed: read(&lookup, "SHIP_SPEED", defaults.speed)?,
            fire_rate: read(&lookup, "SHIP_FIRE_RATE", defaults.fire_rate)?,
            history_capacity: read(&lookup, "SHIP_HISTORY_CAPACITY", defaults.history_capacity)?,
            reconciliation_grace: read(
                &lookup,
                "SHIP_RECONCILIATION_GRACE",
                defaults.reconciliation_grace,
            )?,
            fire_offset: read(&lookup, "SHIP_FIRE_OFFSET", defaults.fire_offset)?,
            render_scale: read(&lookup, "SHIP_RENDER_SCALE", defaults.render_scale)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "SHIP_SPEED",
                reason: "must be a positive number",
            });
        }
        if !self.fire_rate.is_finite() || self.fire_rate <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "SHIP_FIRE_RATE",
                reason: "must be a positive number of seconds",
            });
        }
        // One slot for the active input plus at least one to rewind into.
        if self.history_capacity < 2 {
            return Err(ConfigError::OutOfRange {
                key: "SHIP_HISTORY_CAPACITY",
                reason: "must be at least 2",
            });
        }
        if !self.reconciliation_grace.is_finite() || self.reconciliation_grace < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "SHIP_RECONCILIATION_GRACE",
                reason: "must not be negative",
            });
        }
        if !self.fire_offset.is_finite() || !self.render_scale.is_finite() {
            return Err(ConfigError::OutOfRange {
                key: "SHIP_FIRE_OFFSET",
                reason: "and SHIP_RENDER_SCALE must be finite",
            });
        }

        Ok(())
    }
}

fn read<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Unparsable { key, value }),
        None => Ok(default),
    }
}
