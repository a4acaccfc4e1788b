use std::fmt;

/// How a channel's trigger level is carried on the wire for the current
/// trigger mode. Re-evaluated on every access, the mode can change between
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEncoding {
    /// One level command.
    Single,
    /// A low and a high threshold command (Tektronix runt, Keysight transition).
    Window,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TriggerLevelError {
    #[error("At least one trigger level is required")]
    Empty,

    #[error("Trigger level {0} is not a finite number")]
    NotFinite(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerLevel {
    Single(f64),
    Window { low: f64, high: f64 },
}

impl TriggerLevel {
    /// Threshold pair from two levels given in any order.
    pub fn window(a: f64, b: f64) -> Self {
        Self::Window {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Encode caller-supplied levels for `encoding`.
    ///
    /// A window takes the minimum as its low and the maximum as its high
    /// threshold; a single level takes the first value.
    pub fn encode(levels: &[f64], encoding: LevelEncoding) -> Result<Self, TriggerLevelError> {
        let first = *levels.first().ok_or(TriggerLevelError::Empty)?;
        if let Some(bad) = levels.iter().find(|l| !l.is_finite()) {
            return Err(TriggerLevelError::NotFinite(*bad));
        }
        Ok(match encoding {
            LevelEncoding::Single => Self::Single(first),
            LevelEncoding::Window => {
                let low = levels.iter().copied().fold(f64::INFINITY, f64::min);
                let high = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Self::Window { low, high }
            }
        })
    }

    pub fn encoding(&self) -> LevelEncoding {
        match self {
            Self::Single(_) => LevelEncoding::Single,
            Self::Window { .. } => LevelEncoding::Window,
        }
    }

    pub fn low(&self) -> f64 {
        match *self {
            Self::Single(level) => level,
            Self::Window { low, .. } => low,
        }
    }

    pub fn high(&self) -> f64 {
        match *self {
            Self::Single(level) => level,
            Self::Window { high, .. } => high,
        }
    }

    /// `[level]` or `[low, high]`.
    pub fn to_vec(&self) -> Vec<f64> {
        match *self {
            Self::Single(level) => vec![level],
            Self::Window { low, high } => vec![low, high],
        }
    }
}

impl From<f64> for TriggerLevel {
    fn from(level: f64) -> Self {
        Self::Single(level)
    }
}

impl fmt::Display for TriggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(level) => write!(f, "{level} V"),
            Self::Window { low, high } => write!(f, "[{low} V, {high} V]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_reorders_levels() {
        let level = TriggerLevel::encode(&[1.5, -0.5], LevelEncoding::Window).unwrap();
        assert_eq!(level, TriggerLevel::Window { low: -0.5, high: 1.5 });
        assert_eq!(level.to_vec(), vec![-0.5, 1.5]);
        assert_eq!(TriggerLevel::window(2.0, 1.0).low(), 1.0);
    }

    #[test]
    fn test_single_takes_first_level() {
        let level = TriggerLevel::encode(&[0.8, 3.0], LevelEncoding::Single).unwrap();
        assert_eq!(level, TriggerLevel::Single(0.8));
        assert_eq!(level.low(), level.high());
    }

    #[test]
    fn test_single_value_window_collapses() {
        let level = TriggerLevel::encode(&[0.25], LevelEncoding::Window).unwrap();
        assert_eq!(level, TriggerLevel::Window { low: 0.25, high: 0.25 });
    }

    #[test]
    fn test_invalid_levels() {
        assert_eq!(
            TriggerLevel::encode(&[], LevelEncoding::Single).unwrap_err(),
            TriggerLevelError::Empty
        );
        assert!(matches!(
            TriggerLevel::encode(&[1.0, f64::NAN], LevelEncoding::Window),
            Err(TriggerLevelError::NotFinite(_))
        ));
    }
}
