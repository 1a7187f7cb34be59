//! Model time bookkeeping
//!
//! BMI has little to say about time beyond a few conventions:
//! model time is a floating point value, the start time is typically `0.0`,
//! a model without an end time reports a very large (here infinite) end time,
//! and a negative time step may be used to run a model backwards.
//! See <https://bmi.readthedocs.io/en/stable/#time-functions>.

use crate::errors::{BmiError, BmiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit tokens accepted for model time, grouped by the unit they name
const SECOND_TOKENS: [&str; 4] = ["s", "sec", "second", "seconds"];
const MINUTE_TOKENS: [&str; 3] = ["min", "minute", "minutes"];
const HOUR_TOKENS: [&str; 4] = ["h", "hr", "hour", "hours"];
const DAY_TOKENS: [&str; 3] = ["d", "day", "days"];

/// Units of model time
///
/// Parsed from the udunits time tokens listed above; rendered back using the
/// shortest token (`s`, `min`, `h`, `d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeUnits {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnits::Seconds => "s",
            TimeUnits::Minutes => "min",
            TimeUnits::Hours => "h",
            TimeUnits::Days => "d",
        }
    }

    /// Length of one unit in seconds
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnits::Seconds => 1.0,
            TimeUnits::Minutes => 60.0,
            TimeUnits::Hours => 3600.0,
            TimeUnits::Days => 86400.0,
        }
    }

    /// Every token accepted by [`TimeUnits::from_str`]
    pub fn valid_tokens() -> impl Iterator<Item = &'static str> {
        SECOND_TOKENS
            .into_iter()
            .chain(MINUTE_TOKENS)
            .chain(HOUR_TOKENS)
            .chain(DAY_TOKENS)
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeUnits {
    type Err = BmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if SECOND_TOKENS.contains(&s) {
            Ok(TimeUnits::Seconds)
        } else if MINUTE_TOKENS.contains(&s) {
            Ok(TimeUnits::Minutes)
        } else if HOUR_TOKENS.contains(&s) {
            Ok(TimeUnits::Hours)
        } else if DAY_TOKENS.contains(&s) {
            Ok(TimeUnits::Days)
        } else {
            Err(BmiError::Validation(format!(
                "units must be one of {:?}, got '{}'",
                TimeUnits::valid_tokens().collect::<Vec<_>>(),
                s
            )))
        }
    }
}

impl TryFrom<String> for TimeUnits {
    type Error = BmiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeUnits> for String {
    fn from(value: TimeUnits) -> Self {
        value.as_str().to_string()
    }
}

/// Time state of a running model
///
/// No ordering is enforced between the current, start and end times; a model is free
/// to run past its declared end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmiTime {
    pub current_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub units: TimeUnits,
    pub time_step: f64,
}

impl Default for BmiTime {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            start_time: 0.0,
            end_time: f64::INFINITY,
            units: TimeUnits::Seconds,
            time_step: 3600.0,
        }
    }
}

impl BmiTime {
    /// Create a time state, validating the unit token
    ///
    /// # Errors
    ///
    /// Returns [`BmiError::Validation`] if `units` is not a recognised time unit.
    pub fn new(
        current_time: f64,
        start_time: f64,
        end_time: f64,
        units: &str,
        time_step: f64,
    ) -> BmiResult<Self> {
        Ok(Self {
            current_time,
            start_time,
            end_time,
            units: units.parse()?,
            time_step,
        })
    }

    /// Default time state expressed in the given units
    pub fn with_units(units: &str) -> BmiResult<Self> {
        Ok(Self {
            units: units.parse()?,
            ..Self::default()
        })
    }

    /// Move the current time forward by one time step
    pub fn advance(&mut self) {
        self.current_time += self.time_step;
    }

    /// Reset the current time to the start time
    pub fn reset(&mut self) {
        self.current_time = self.start_time;
    }

    /// True once the current time has reached the end time in the stepping direction
    pub fn is_finished(&self) -> bool {
        if self.time_step < 0.0 {
            self.current_time <= self.end_time
        } else {
            self.current_time >= self.end_time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_time_units() {
        for unit in [
            "s", "sec", "second", "seconds", "min", "minute", "minutes", "h", "hr", "hour",
            "hours", "d", "day", "days",
        ] {
            let t = BmiTime::with_units(unit).unwrap();
            assert_eq!(t.units, unit.parse::<TimeUnits>().unwrap());
        }
    }

    #[test]
    fn bad_time_units() {
        for unit in [
            "secs", "summer", "mins", "minut", "hrs", "huors", "year", "years", "",
        ] {
            let result = BmiTime::with_units(unit);
            assert!(
                matches!(result, Err(BmiError::Validation(_))),
                "{} should be rejected",
                unit
            );
        }
    }

    #[test]
    fn units_parse_to_canonical_token() {
        assert_eq!("seconds".parse::<TimeUnits>().unwrap(), TimeUnits::Seconds);
        assert_eq!("hr".parse::<TimeUnits>().unwrap().to_string(), "h");
        assert_eq!("days".parse::<TimeUnits>().unwrap().as_str(), "d");
        assert_eq!(TimeUnits::Days.seconds(), 86400.0);
    }

    #[test]
    fn defaults() {
        let t = BmiTime::default();
        assert_eq!(t.current_time, 0.0);
        assert_eq!(t.start_time, 0.0);
        assert!(t.end_time.is_infinite());
        assert_eq!(t.units, TimeUnits::Seconds);
        assert_eq!(t.time_step, 3600.0);
        assert!(!t.is_finished());
    }

    #[test]
    fn negative_time_step_runs_backwards() {
        let mut t = BmiTime::new(10.0, 10.0, 0.0, "d", -2.5).unwrap();
        t.advance();
        assert_eq!(t.current_time, 7.5);
        assert!(!t.is_finished());
        for _ in 0..3 {
            t.advance();
        }
        assert!(t.is_finished());
        t.reset();
        assert_eq!(t.current_time, 10.0);
    }

    #[test]
    fn deserialise_validates_units() {
        let t: BmiTime = toml::from_str("units = \"hours\"\ntime_step = 1.0").unwrap();
        assert_eq!(t.units, TimeUnits::Hours);
        assert_eq!(t.time_step, 1.0);
        assert!(t.end_time.is_infinite());

        let bad = toml::from_str::<BmiTime>("units = \"years\"");
        assert!(bad.is_err());
    }

    #[test]
    fn serialise_uses_canonical_units() {
        let t = BmiTime::with_units("minutes").unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"units\":\"min\""));
    }
}
