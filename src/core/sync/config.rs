/*!
 * Synchronization Configuration
 *
 * Runtime configuration for spin backoff and keyed lock tables
 */

use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{
    CONTENDED_SPIN_YIELD_THRESHOLD, DEFAULT_SPIN_YIELD_THRESHOLD, DEFAULT_TABLE_CAPACITY,
    LOW_LATENCY_SPIN_YIELD_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Backoff used between failed spin lock attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinStrategy {
    /// Busy-wait with the CPU spin hint only
    Spin,
    /// Busy-wait, then yield the time slice after `yield_after` attempts
    SpinThenYield,
}

impl FromStr for SpinStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spin" => Ok(SpinStrategy::Spin),
            "spin_then_yield" | "yield" => Ok(SpinStrategy::SpinThenYield),
            other => Err(SyncError::invalid_argument(
                "spin_strategy",
                format!("unknown strategy `{}` (expected `spin` or `spin_then_yield`)", other),
            )),
        }
    }
}

/// Spin lock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinConfig {
    pub strategy: SpinStrategy,
    /// Attempts before yielding (ignored by `SpinStrategy::Spin`)
    pub yield_after: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            strategy: SpinStrategy::SpinThenYield,
            yield_after: DEFAULT_SPIN_YIELD_THRESHOLD,
        }
    }
}

impl SpinConfig {
    /// Never yield; lowest latency for critical sections of a few instructions
    pub const fn pure_spin() -> Self {
        Self {
            strategy: SpinStrategy::Spin,
            yield_after: 0,
        }
    }
}

/// Keyed lock table configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Slots reserved up front in the key -> entry map
    pub initial_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_TABLE_CAPACITY,
        }
    }
}

/// Toolkit configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub spin: SpinConfig,
    pub table: TableConfig,
}

impl SyncConfig {
    /// Configuration for short, rarely contended critical sections
    pub const fn low_latency() -> Self {
        Self {
            spin: SpinConfig {
                strategy: SpinStrategy::SpinThenYield,
                yield_after: LOW_LATENCY_SPIN_YIELD_THRESHOLD,
            },
            table: TableConfig {
                initial_capacity: DEFAULT_TABLE_CAPACITY,
            },
        }
    }

    /// Configuration for many threads competing for few locks
    pub const fn contended() -> Self {
        Self {
            spin: SpinConfig {
                strategy: SpinStrategy::SpinThenYield,
                yield_after: CONTENDED_SPIN_YIELD_THRESHOLD,
            },
            table: TableConfig {
                initial_capacity: DEFAULT_TABLE_CAPACITY * 16,
            },
        }
    }

    /// Load configuration from the environment, falling back to defaults
    ///
    /// Environment variables:
    /// - SYNC_SPIN_STRATEGY: `spin` or `spin_then_yield`
    /// - SYNC_SPIN_YIELD_AFTER: attempts before yielding
    /// - SYNC_TABLE_CAPACITY: initial keyed lock table capacity
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(strategy) = lookup("SYNC_SPIN_STRATEGY") {
            config.spin.strategy = strategy.parse()?;
        }
        if let Some(yield_after) = lookup("SYNC_SPIN_YIELD_AFTER") {
            config.spin.yield_after = parse_number(&yield_after, "SYNC_SPIN_YIELD_AFTER")?;
        }
        if let Some(capacity) = lookup("SYNC_TABLE_CAPACITY") {
            config.table.initial_capacity = parse_number(&capacity, "SYNC_TABLE_CAPACITY")?;
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(raw: &str, name: &str) -> SyncResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SyncError::invalid_argument(name, format!("`{}` is not a valid number", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.spin.strategy, SpinStrategy::SpinThenYield);
    }

    #[test]
    fn test_env_overrides() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("SYNC_SPIN_STRATEGY", "spin"),
            ("SYNC_SPIN_YIELD_AFTER", "12"),
            ("SYNC_TABLE_CAPACITY", " 256 "),
        ]))
        .unwrap();

        assert_eq!(config.spin.strategy, SpinStrategy::Spin);
        assert_eq!(config.spin.yield_after, 12);
        assert_eq!(config.table.initial_capacity, 256);
    }

    #[test]
    fn test_invalid_env_values() {
        let err = SyncConfig::from_lookup(lookup_from(&[("SYNC_SPIN_STRATEGY", "sleep")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument { .. }));

        let err = SyncConfig::from_lookup(lookup_from(&[("SYNC_TABLE_CAPACITY", "-1")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument { ref name, .. } if name == "SYNC_TABLE_CAPACITY"));
    }

    #[test]
    fn test_presets() {
        assert!(SyncConfig::low_latency().spin.yield_after > SyncConfig::contended().spin.yield_after);
        assert_eq!(SpinConfig::pure_spin().strategy, SpinStrategy::Spin);
    }
}
