//! Global configuration values.
//!
//! Two independently settable names pick the backend the facade builds on
//! first use:
//!
//! - `SimulatorImplementationType` - kernel to instantiate
//! - `SchedulerType` - scheduler to attach
//!
//! The values are read when the facade first resolves its kernel, not at
//! process start, so a program may override them any time before its
//! first `Simulator` call. Initial values come from the defaults overlaid
//! by the `TEMPO_GLOBAL_VALUE` environment variable, e.g.
//! `TEMPO_GLOBAL_VALUE="SchedulerType=tempo::HeapScheduler"`.

use crate::registry::{self, DEFAULT_SIMULATOR_IMPL, MAP_SCHEDULER};
use serde::{Deserialize, Serialize};
use std::sync::{OnceLock, PoisonError, RwLock};
use tempo_env::{SimError, SimResult};

/// Key of the kernel type value.
pub const SIMULATOR_IMPLEMENTATION_TYPE: &str = "SimulatorImplementationType";

/// Key of the scheduler type value.
pub const SCHEDULER_TYPE: &str = "SchedulerType";

/// Environment variable holding `Name=value` assignments separated by `;`.
pub const ENV_VAR: &str = "TEMPO_GLOBAL_VALUE";

/// The configuration values consulted at first resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Registry name of the kernel.
    pub simulator_implementation_type: String,

    /// Registry name of the scheduler.
    pub scheduler_type: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            simulator_implementation_type: DEFAULT_SIMULATOR_IMPL.to_string(),
            scheduler_type: MAP_SCHEDULER.to_string(),
        }
    }
}

impl GlobalConfig {
    /// Parses a JSON object such as `{"SchedulerType": "tempo::ListScheduler"}`.
    /// Missing keys keep their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::config(e.to_string()))
    }

    /// Defaults overlaid by `TEMPO_GLOBAL_VALUE`, if set.
    pub fn from_env() -> SimResult<Self> {
        let mut config = Self::default();
        if let Ok(assignments) = std::env::var(ENV_VAR) {
            config.apply_assignments(&assignments)?;
        }
        Ok(config)
    }

    /// Applies `Name=value;Name=value` assignments. Empty segments are
    /// skipped; unknown names are rejected.
    pub fn apply_assignments(&mut self, assignments: &str) -> SimResult<()> {
        for segment in assignments.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| SimError::config(format!("expected Name=value, got `{segment}`")))?;
            self.set(name.trim(), value.trim())?;
        }
        Ok(())
    }

    /// Sets one value by its key.
    pub fn set(&mut self, name: &str, value: &str) -> SimResult<()> {
        match name {
            SIMULATOR_IMPLEMENTATION_TYPE => self.simulator_implementation_type = value.to_string(),
            SCHEDULER_TYPE => self.scheduler_type = value.to_string(),
            other => return Err(SimError::config(format!("unknown global value `{other}`"))),
        }
        Ok(())
    }

    /// Checks both names against the registry.
    pub fn validate(&self) -> SimResult<()> {
        registry::lookup_simulator_impl(&self.simulator_implementation_type)?;
        registry::lookup_scheduler(&self.scheduler_type)?;
        Ok(())
    }
}

static GLOBAL: OnceLock<RwLock<GlobalConfig>> = OnceLock::new();

fn cell() -> &'static RwLock<GlobalConfig> {
    GLOBAL.get_or_init(|| {
        // First access may happen while the facade resolves its kernel,
        // where nothing may log; a malformed variable is fatal instead.
        match GlobalConfig::from_env() {
            Ok(config) => RwLock::new(config),
            Err(err) => panic!("invalid {ENV_VAR}: {err}"),
        }
    })
}

/// Snapshot of the current values.
pub fn global() -> GlobalConfig {
    cell().read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Replaces both values after validating them.
pub fn apply(config: GlobalConfig) -> SimResult<()> {
    config.validate()?;
    *cell().write().unwrap_or_else(PoisonError::into_inner) = config;
    Ok(())
}

/// Applies `Name=value;...` assignments to the current values.
pub fn apply_assignments(assignments: &str) -> SimResult<()> {
    let mut config = global();
    config.apply_assignments(assignments)?;
    apply(config)
}

/// Selects the kernel type by registry name.
pub fn set_simulator_implementation_type(name: &str) -> SimResult<()> {
    registry::lookup_simulator_impl(name)?;
    cell().write().unwrap_or_else(PoisonError::into_inner).simulator_implementation_type = name.to_string();
    Ok(())
}

/// Selects the scheduler type by registry name.
pub fn set_scheduler_type(name: &str) -> SimResult<()> {
    registry::lookup_scheduler(name)?;
    cell().write().unwrap_or_else(PoisonError::into_inner).scheduler_type = name.to_string();
    Ok(())
}

/// Restores the built-in defaults.
pub fn reset() {
    *cell().write().unwrap_or_else(PoisonError::into_inner) = GlobalConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HEAP_SCHEDULER, LIST_SCHEDULER};

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.simulator_implementation_type, DEFAULT_SIMULATOR_IMPL);
        assert_eq!(config.scheduler_type, MAP_SCHEDULER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_assignments() {
        let mut config = GlobalConfig::default();
        config
            .apply_assignments(" SchedulerType = tempo::HeapScheduler ;; ")
            .unwrap();
        assert_eq!(config.scheduler_type, HEAP_SCHEDULER);
        assert_eq!(config.simulator_implementation_type, DEFAULT_SIMULATOR_IMPL);
    }

    #[test]
    fn test_assignment_errors() {
        let mut config = GlobalConfig::default();
        assert!(matches!(config.apply_assignments("SchedulerType"), Err(SimError::Config(_))));
        assert!(matches!(config.apply_assignments("Colour=blue"), Err(SimError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_names() {
        let config = GlobalConfig {
            scheduler_type: "tempo::Nope".into(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SimError::UnknownSchedulerType("tempo::Nope".into())));
    }

    #[test]
    fn test_from_json() {
        let config = GlobalConfig::from_json(r#"{"SchedulerType": "tempo::ListScheduler"}"#).unwrap();
        assert_eq!(config.scheduler_type, LIST_SCHEDULER);
        assert_eq!(config.simulator_implementation_type, DEFAULT_SIMULATOR_IMPL);

        assert!(GlobalConfig::from_json(r#"{"Colour": "blue"}"#).is_err());
        assert!(GlobalConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_roundtrip_keys() {
        let json = serde_json::to_value(GlobalConfig::default()).unwrap();
        assert_eq!(json[SIMULATOR_IMPLEMENTATION_TYPE], DEFAULT_SIMULATOR_IMPL);
        assert_eq!(json[SCHEDULER_TYPE], MAP_SCHEDULER);
    }
}
