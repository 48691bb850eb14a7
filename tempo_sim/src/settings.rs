//! Loading global configuration files for the CLI.

use std::path::{Path, PathBuf};
use tempo_core::config::{self, GlobalConfig};
use tempo_core::{registry, SimError, SimResult};
use thiserror::Error;

/// Errors from loading a configuration file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SimError,
    },
}

/// Reads a JSON configuration file, validates it and applies it globally.
///
/// ```json
/// { "SimulatorImplementationType": "tempo::DefaultSimulatorImpl",
///   "SchedulerType": "tempo::HeapScheduler" }
/// ```
pub fn load_config(path: &Path) -> Result<GlobalConfig, SettingsError> {
    let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |source| SettingsError::Invalid {
        path: path.to_path_buf(),
        source,
    };
    let parsed = GlobalConfig::from_json(&json).map_err(invalid)?;
    config::apply(parsed.clone()).map_err(invalid)?;
    Ok(parsed)
}

/// Resolves the `--scheduler` argument into the schedulers to run.
///
/// Without an argument the configured `SchedulerType` is used, so call
/// this after `load_config`. `all` expands to every registered scheduler.
pub fn select_schedulers(requested: Option<&str>) -> SimResult<Vec<String>> {
    match requested {
        None => Ok(vec![config::global().scheduler_type]),
        Some("all") => Ok(registry::scheduler_names()),
        Some(name) => {
            registry::lookup_scheduler(name)?;
            Ok(vec![name.to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tempo-settings-{}-{}.json", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_select_named_and_all_schedulers() {
        use tempo_core::registry::{HEAP_SCHEDULER, LIST_SCHEDULER, MAP_SCHEDULER};

        assert_eq!(select_schedulers(Some(LIST_SCHEDULER)).unwrap(), vec![LIST_SCHEDULER]);
        let all = select_schedulers(Some("all")).unwrap();
        for name in [MAP_SCHEDULER, HEAP_SCHEDULER, LIST_SCHEDULER] {
            assert!(all.iter().any(|n| n == name), "{name} missing");
        }
        assert_eq!(
            select_schedulers(Some("tempo::Nope")),
            Err(SimError::UnknownSchedulerType("tempo::Nope".into()))
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/tempo.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_unknown_scheduler_is_rejected() {
        let path = temp_file("unknown", r#"{"SchedulerType": "tempo::Nope"}"#);
        let err = load_config(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid { source: SimError::UnknownSchedulerType(_), .. }
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let path = temp_file("malformed", "{ SchedulerType ");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { source: SimError::Config(_), .. }));
        std::fs::remove_file(path).ok();
    }
}
