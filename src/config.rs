/*!
 * Shim Configuration
 *
 * Runtime configuration applied by `lockshim::init`
 */

use serde::{Deserialize, Serialize};

/// How a timed condition wait compares the clock against its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePrecision {
    /// Compare seconds and nanoseconds
    #[default]
    Precise,
    /// Compare whole seconds only; the wait may overshoot by up to a second
    WholeSeconds,
}

impl DeadlinePrecision {
    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            DeadlinePrecision::Precise => 0,
            DeadlinePrecision::WholeSeconds => 1,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => DeadlinePrecision::WholeSeconds,
            _ => DeadlinePrecision::Precise,
        }
    }
}

/// Shim configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Turn interception on once the configuration is applied
    pub start_enabled: bool,
    /// Deadline comparison used by timed condition waits
    pub deadline_precision: DeadlinePrecision,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            deadline_precision: DeadlinePrecision::Precise,
        }
    }
}

impl ShimConfig {
    /// Interception on, deadlines compared at whole-second granularity
    pub const fn whole_seconds() -> Self {
        Self {
            start_enabled: true,
            deadline_precision: DeadlinePrecision::WholeSeconds,
        }
    }

    /// Apply the configuration but leave interception off
    pub const fn dormant() -> Self {
        Self {
            start_enabled: false,
            deadline_precision: DeadlinePrecision::Precise,
        }
    }

    pub const fn with_precision(mut self, precision: DeadlinePrecision) -> Self {
        self.deadline_precision = precision;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_roundtrips_through_u8() {
        for p in [DeadlinePrecision::Precise, DeadlinePrecision::WholeSeconds] {
            assert_eq!(DeadlinePrecision::from_u8(p.as_u8()), p);
        }
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: ShimConfig = serde_json::from_str(r#"{"deadline_precision":"whole_seconds"}"#).unwrap();
        assert!(cfg.start_enabled);
        assert_eq!(cfg.deadline_precision, DeadlinePrecision::WholeSeconds);
    }
}
