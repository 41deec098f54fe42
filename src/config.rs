//! Configuration for critical sections and the comparison driver.
//!
//! This module provides:
//! - [`LockConfig`]: which wait backend a critical section uses and whether
//!   its event is created eagerly
//! - [`DriverConfig`] and [`DriverProfile`]: workload shape of a benchmark run
//! - [`ConfigLoader`]: layered loading (profile + env + overrides)
//!
//! # Example
//!
//! ```
//! # use critsect::config::{ConfigLoader, DriverProfile};
//! let config = ConfigLoader::new()
//!     .profile(DriverProfile::Smoke)
//!     .ignore_env()
//!     .override_value("CRITSECT_WORKERS", "3")
//!     .load()
//!     .unwrap();
//! assert_eq!(config.driver.workers, 3);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "CRITSECT_";

/// Which [`WaitBackend`](crate::sync::WaitBackend) a critical section uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `parking_lot` mutex + condvar; available everywhere.
    Parking,
    /// Linux `eventfd(2)` in semaphore mode.
    #[serde(rename = "eventfd")]
    EventFd,
}

impl BackendKind {
    /// The kernel-object backend where one exists, otherwise `Parking`.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::EventFd
        } else {
            Self::Parking
        }
    }

    /// True if this backend can be built on the current target.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        match self {
            Self::Parking => true,
            Self::EventFd => cfg!(target_os = "linux"),
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parking => "parking",
            Self::EventFd => "eventfd",
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parking" => Ok(Self::Parking),
            "eventfd" => Ok(Self::EventFd),
            _ => Err(ConfigError::Parse(format!("unknown backend: {s}"))),
        }
    }
}

/// How a critical section is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockConfig {
    /// Create the wait event at initialization instead of on first contention.
    pub eager_event: bool,
    /// Wait backend.
    pub backend: BackendKind,
}

/// Workload of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Worker threads appending to the shared log.
    pub workers: usize,
    /// Lock/append/unlock rounds per worker.
    pub iterations_per_worker: u64,
    /// Capacity of the circular log.
    pub log_slots: usize,
    /// Pause between consistency scans.
    pub checker_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverProfile::Standard.driver_config()
    }
}

impl DriverConfig {
    /// Validates the workload shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.iterations_per_worker == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        if self.log_slots < 2 {
            return Err(ConfigError::InvalidLogSlots(self.log_slots));
        }
        if self.checker_interval.is_zero() {
            return Err(ConfigError::InvalidCheckInterval);
        }
        Ok(())
    }

    /// Set the worker count.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the iterations per worker.
    #[must_use]
    pub fn iterations_per_worker(mut self, iterations: u64) -> Self {
        self.iterations_per_worker = iterations;
        self
    }

    /// Set the log capacity.
    #[must_use]
    pub fn log_slots(mut self, slots: usize) -> Self {
        self.log_slots = slots;
        self
    }

    /// Set the checker pause.
    #[must_use]
    pub fn checker_interval(mut self, interval: Duration) -> Self {
        self.checker_interval = interval;
        self
    }
}

/// Preset workloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DriverProfile {
    /// Five workers, 500 000 iterations each, 256 slots.
    #[default]
    Standard,
    /// Same shape with a tenth of the iterations.
    Quick,
    /// Two workers and a small log; finishes in milliseconds.
    Smoke,
}

impl DriverProfile {
    /// Driver settings for this profile.
    #[must_use]
    pub fn driver_config(self) -> DriverConfig {
        let checker_interval = Duration::from_millis(1);
        match self {
            Self::Standard => DriverConfig {
                workers: 5,
                iterations_per_worker: 500_000,
                log_slots: 256,
                checker_interval,
            },
            Self::Quick => DriverConfig {
                workers: 5,
                iterations_per_worker: 50_000,
                log_slots: 256,
                checker_interval,
            },
            Self::Smoke => DriverConfig {
                workers: 2,
                iterations_per_worker: 2_000,
                log_slots: 16,
                checker_interval,
            },
        }
    }
}

impl FromStr for DriverProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "quick" => Ok(Self::Quick),
            "smoke" => Ok(Self::Smoke),
            _ => Err(ConfigError::Parse(format!("unknown profile: {s}"))),
        }
    }
}

/// Full configuration: lock construction plus workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CritsectConfig {
    /// Critical section settings.
    pub lock: LockConfig,
    /// Benchmark workload.
    pub driver: DriverConfig,
}

impl CritsectConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lock.backend.is_supported() {
            return Err(ConfigError::UnsupportedBackend(self.lock.backend));
        }
        self.driver.validate()
    }
}

/// Configuration loader with layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    profile: DriverProfile,
    read_env: bool,
    overrides: BTreeMap<String, String>,
}

impl ConfigLoader {
    /// Creates a loader with the standard profile that reads the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile: DriverProfile::Standard,
            read_env: true,
            overrides: BTreeMap::new(),
        }
    }

    /// Sets the base profile.
    #[must_use]
    pub fn profile(mut self, profile: DriverProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Skips `CRITSECT_*` environment variables.
    #[must_use]
    pub fn ignore_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Adds a programmatic override (highest precedence). Keys use the
    /// environment names, e.g. `CRITSECT_WORKERS`.
    #[must_use]
    pub fn override_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads configuration with precedence:
    /// 1. Profile defaults (lowest)
    /// 2. Environment variables
    /// 3. Programmatic overrides (highest)
    pub fn load(&self) -> Result<CritsectConfig, ConfigError> {
        let mut config = CritsectConfig {
            lock: LockConfig::default(),
            driver: self.profile.driver_config(),
        };
        if self.read_env {
            apply_env_overrides(&mut config)?;
        }
        apply_overrides(&mut config, &self.overrides)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Parse error.
    Parse(String),
    /// Zero workers.
    InvalidWorkers,
    /// Zero iterations.
    InvalidIterations,
    /// Log too small to tell neighbours apart.
    InvalidLogSlots(usize),
    /// Zero checker pause.
    InvalidCheckInterval,
    /// Backend not available on this target.
    UnsupportedBackend(BackendKind),
    /// Unknown override key.
    InvalidOverride(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::InvalidWorkers => write!(f, "workers must be > 0"),
            Self::InvalidIterations => write!(f, "iterations must be > 0"),
            Self::InvalidLogSlots(slots) => write!(f, "log_slots must be >= 2, got {slots}"),
            Self::InvalidCheckInterval => write!(f, "checker interval must be > 0"),
            Self::UnsupportedBackend(kind) => {
                write!(f, "backend {kind} is not available on this platform")
            }
            Self::InvalidOverride(key) => write!(f, "invalid override: {key}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn apply_env_overrides(config: &mut CritsectConfig) -> Result<(), ConfigError> {
    let mut overrides = BTreeMap::new();
    for (key, value) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            overrides.insert(key, value);
        }
    }
    apply_overrides(config, &overrides)
}

fn apply_overrides(
    config: &mut CritsectConfig,
    overrides: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        apply_override(config, key, value)?;
    }
    Ok(())
}

fn apply_override(config: &mut CritsectConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "CRITSECT_WORKERS" => config.driver.workers = parse_usize(value, key)?,
        "CRITSECT_ITERATIONS" => config.driver.iterations_per_worker = parse_u64(value, key)?,
        "CRITSECT_LOG_SLOTS" => config.driver.log_slots = parse_usize(value, key)?,
        "CRITSECT_CHECK_INTERVAL_MS" => {
            config.driver.checker_interval = parse_duration_ms(value, key)?;
        }
        "CRITSECT_BACKEND" => config.lock.backend = value.parse()?,
        "CRITSECT_EAGER_EVENT" => config.lock.eager_event = parse_bool(value, key)?,
        _ => return Err(ConfigError::InvalidOverride(key.to_string())),
    }
    Ok(())
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Parse(format!("invalid u64 for {key}: {value}")))
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::Parse(format!("invalid usize for {key}: {value}")))
}

fn parse_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Parse(format!("invalid bool for {key}: {value}"))),
    }
}

fn parse_duration_ms(value: &str, key: &str) -> Result<Duration, ConfigError> {
    parse_u64(value, key).map(Duration::from_millis)
}
