//! Scenarios exercising the simulator facade end to end.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Events scheduled out of order run in time order
    Ordering,

    /// Simultaneous events run in scheduling order
    FifoTies,

    /// Cancelled and removed events never run
    Cancel,

    /// `stop_after` halts the run loop at the requested time
    StopAt,

    /// Destroy events run exactly once, at teardown
    Destroy,

    /// Events inherit the context of the event that scheduled them
    ContextPropagation,

    /// A caller-built kernel replaces the configured one
    Injection,

    /// Teardown followed by lazy reconstruction
    Restart,

    /// Seeded random workload with interleaved cancellations
    RandomLoad,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Ordering,
            ScenarioId::FifoTies,
            ScenarioId::Cancel,
            ScenarioId::StopAt,
            ScenarioId::Destroy,
            ScenarioId::ContextPropagation,
            ScenarioId::Injection,
            ScenarioId::Restart,
            ScenarioId::RandomLoad,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Ordering => "ordering",
            ScenarioId::FifoTies => "fifo_ties",
            ScenarioId::Cancel => "cancel",
            ScenarioId::StopAt => "stop_at",
            ScenarioId::Destroy => "destroy",
            ScenarioId::ContextPropagation => "context_propagation",
            ScenarioId::Injection => "injection",
            ScenarioId::Restart => "restart",
            ScenarioId::RandomLoad => "random_load",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Ordering => "Schedule at 5, 1, 3; expect execution at 1, 3, 5",
            ScenarioId::FifoTies => "Many events at one instant run first-in first-out",
            ScenarioId::Cancel => "Cancel and remove pending events; none execute",
            ScenarioId::StopAt => "Stop at t=3 with events at 1, 2, 4, 5; only 1 and 2 run",
            ScenarioId::Destroy => "Destroy events run once at teardown, never during run",
            ScenarioId::ContextPropagation => "Context 7 flows into events scheduled from inside",
            ScenarioId::Injection => "Install a kernel before first use; its identity is kept",
            ScenarioId::Restart => "Tear down mid-run, rebuild lazily, old handles expire",
            ScenarioId::RandomLoad => "Seeded random delays and cancellations, checked against a model",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ordering" => Ok(ScenarioId::Ordering),
            "fifo_ties" | "fifo" => Ok(ScenarioId::FifoTies),
            "cancel" => Ok(ScenarioId::Cancel),
            "stop_at" | "stop" => Ok(ScenarioId::StopAt),
            "destroy" => Ok(ScenarioId::Destroy),
            "context_propagation" | "context" => Ok(ScenarioId::ContextPropagation),
            "injection" => Ok(ScenarioId::Injection),
            "restart" => Ok(ScenarioId::Restart),
            "random_load" | "random" => Ok(ScenarioId::RandomLoad),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!("FIFO".parse::<ScenarioId>(), Ok(ScenarioId::FifoTies));
        assert_eq!("random".parse::<ScenarioId>(), Ok(ScenarioId::RandomLoad));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }
}
