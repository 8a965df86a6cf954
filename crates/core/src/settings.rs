//! Engine tuning loaded from the environment.

use std::time::Duration;

/// Scheduler submission command used when `SIMFLEET_SCHEDULER` is unset.
pub const DEFAULT_SCHEDULER: &str = "qsub";

/// Grid marker poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Status table interval.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// How to hand a script to the cluster scheduler: `<program> <args..> <script>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SchedulerCommand {
    /// Split a whitespace-separated command line. Returns `None` when blank.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Default for SchedulerCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_SCHEDULER.to_string(),
            args: Vec::new(),
        }
    }
}

/// Engine settings that are not part of a single run's arguments.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub scheduler: SchedulerCommand,
    pub poll_interval: Duration,
    pub report_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerCommand::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                         | Default |
    /// |---------------------------------|---------|
    /// | `SIMFLEET_SCHEDULER`            | `qsub`  |
    /// | `SIMFLEET_POLL_INTERVAL_MS`     | `1000`  |
    /// | `SIMFLEET_REPORT_INTERVAL_SECS` | `5`     |
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let scheduler = lookup("SIMFLEET_SCHEDULER")
            .and_then(|v| SchedulerCommand::parse(&v))
            .unwrap_or_default();

        let poll_interval = parse_or_default(
            "SIMFLEET_POLL_INTERVAL_MS",
            lookup("SIMFLEET_POLL_INTERVAL_MS"),
            DEFAULT_POLL_INTERVAL,
            Duration::from_millis,
        );

        let report_interval = parse_or_default(
            "SIMFLEET_REPORT_INTERVAL_SECS",
            lookup("SIMFLEET_REPORT_INTERVAL_SECS"),
            DEFAULT_REPORT_INTERVAL,
            Duration::from_secs,
        );

        Self {
            scheduler,
            poll_interval,
            report_interval,
        }
    }
}

fn parse_or_default(
    key: &str,
    raw: Option<String>,
    default: Duration,
    to_duration: fn(u64) -> Duration,
) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid interval, using default");
            default
        }
        Ok(n) => to_duration(n),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
