//! Timed contention runs with a concurrent consistency checker.
//!
//! A run spawns the configured workers, each appending to the shared log
//! under the lock, plus one checker that scans the log under the same lock
//! every `checker_interval` until the workers are done, then once more.
//! The wall-clock time from the first spawn to the last join is reported.
//!
//! Any failure (lock error, panic, or broken log) raises a stop flag so the
//! remaining threads finish early instead of completing a workload whose
//! result is already void.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use super::lockable::{LockKind, Lockable, NativeLock};
use super::log::{Inconsistency, SharedLog, wall_clock_seed};
use crate::config::{BackendKind, ConfigError, DriverConfig, LockConfig};
use crate::error::Error;
use crate::sync::{CriticalSection, ParkingBackend, ProcessTeardown, WaitBackend};

/// Outcome of one timed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Lock under test.
    pub lock: LockKind,
    /// Wait backend, for the custom lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Worker threads.
    pub workers: usize,
    /// Iterations per worker.
    pub iterations_per_worker: u64,
    /// Wall-clock time of the whole run.
    #[serde(rename = "runtime_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Consistency scans performed, including the final one.
    pub scans: u64,
}

/// Both runs of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    /// Baseline run.
    pub native: RunReport,
    /// Critical section run.
    pub custom: RunReport,
}

impl ComparisonReport {
    /// Custom runtime divided by native runtime.
    #[must_use]
    pub fn slowdown(&self) -> f64 {
        let native = self.native.elapsed.as_secs_f64();
        if native == 0.0 {
            return f64::INFINITY;
        }
        self.custom.elapsed.as_secs_f64() / native
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Why a run did not complete.
#[derive(Debug)]
pub enum DriverError {
    /// The workload or lock configuration is invalid.
    Config(ConfigError),
    /// Acquiring, creating, or deleting the lock failed.
    Lock(Error),
    /// A worker thread panicked.
    WorkerPanicked {
        /// Index of the worker.
        worker: usize,
    },
    /// The checker thread panicked.
    CheckerPanicked,
    /// The checker found a broken pair in the log.
    Inconsistent(Inconsistency),
}

impl DriverError {
    /// True if the failure means the lock did not provide mutual exclusion.
    #[must_use]
    pub const fn is_inconsistency(&self) -> bool {
        matches!(self, Self::Inconsistent(_))
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Lock(err) => write!(f, "lock failure: {err}"),
            Self::WorkerPanicked { worker } => write!(f, "worker {worker} panicked"),
            Self::CheckerPanicked => write!(f, "checker panicked"),
            Self::Inconsistent(inconsistency) => {
                write!(f, "buffer inconsistency: {inconsistency}")
            }
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Lock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<Error> for DriverError {
    fn from(err: Error) -> Self {
        Self::Lock(err)
    }
}

/// Runs the workload against `lock`, using `log` as the oracle.
///
/// The log is reset first. Returns the first failure observed.
pub fn run<L: Lockable>(
    lock: &L,
    log: &SharedLog,
    config: &DriverConfig,
) -> Result<RunReport, DriverError> {
    config.validate()?;
    log.reset();
    let done = AtomicBool::new(false);
    let stop = AtomicBool::new(false);

    tracing::info!(
        lock = %lock.kind(),
        workers = config.workers,
        iterations = config.iterations_per_worker,
        slots = log.capacity(),
        "starting timed run"
    );
    let started = Instant::now();

    let (workers, checker) = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.workers)
            .map(|_| scope.spawn(|| work(lock, log, config.iterations_per_worker, &stop)))
            .collect();
        let checker = scope.spawn(|| check(lock, log, config.checker_interval, &done, &stop));

        let workers: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                let joined = handle.join();
                if !matches!(joined, Ok(Ok(()))) {
                    stop.store(true, Ordering::Relaxed);
                }
                joined
            })
            .collect();
        done.store(true, Ordering::Release);
        (workers, checker.join())
    });
    let elapsed = started.elapsed();

    let scans = match checker {
        Ok(Ok(scans)) => scans,
        Ok(Err(err)) => return Err(err),
        Err(_) => return Err(DriverError::CheckerPanicked),
    };
    for (worker, joined) in workers.into_iter().enumerate() {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(DriverError::Lock(err)),
            Err(_) => return Err(DriverError::WorkerPanicked { worker }),
        }
    }

    tracing::info!(lock = %lock.kind(), ?elapsed, scans, "timed run finished");
    Ok(RunReport {
        lock: lock.kind(),
        backend: None,
        workers: config.workers,
        iterations_per_worker: config.iterations_per_worker,
        elapsed,
        scans,
    })
}

fn work<L: Lockable>(
    lock: &L,
    log: &SharedLog,
    iterations: u64,
    stop: &AtomicBool,
) -> Result<(), Error> {
    for _ in 0..iterations {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if let Err(err) = lock.with_lock(|| log.append(wall_clock_seed)) {
            stop.store(true, Ordering::Relaxed);
            return Err(err);
        }
    }
    Ok(())
}

fn check<L: Lockable>(
    lock: &L,
    log: &SharedLog,
    interval: Duration,
    done: &AtomicBool,
    stop: &AtomicBool,
) -> Result<u64, DriverError> {
    let mut scans = 0;
    loop {
        // Sampled before scanning so the last scan sees every append.
        let finished = done.load(Ordering::Acquire);
        let verdict = match lock.with_lock(|| log.verify()) {
            Ok(verdict) => verdict,
            Err(err) => {
                stop.store(true, Ordering::Relaxed);
                return Err(err.into());
            }
        };
        scans += 1;
        if let Err(inconsistency) = verdict {
            stop.store(true, Ordering::Relaxed);
            tracing::error!(lock = %lock.kind(), %inconsistency, "buffer inconsistency");
            return Err(DriverError::Inconsistent(inconsistency));
        }
        if finished || stop.load(Ordering::Relaxed) {
            return Ok(scans);
        }
        thread::sleep(interval);
    }
}

/// Builds a critical section from `lock_config`, runs the workload on it and
/// deletes it.
pub fn run_custom(
    lock_config: &LockConfig,
    log: &SharedLog,
    config: &DriverConfig,
) -> Result<RunReport, DriverError> {
    let mut report = match lock_config.backend {
        BackendKind::Parking => run_section(ParkingBackend, lock_config.eager_event, log, config),
        #[cfg(target_os = "linux")]
        BackendKind::EventFd => run_section(
            crate::sync::backend::EventFdBackend,
            lock_config.eager_event,
            log,
            config,
        ),
        #[cfg(not(target_os = "linux"))]
        BackendKind::EventFd => Err(ConfigError::UnsupportedBackend(BackendKind::EventFd).into()),
    }?;
    report.backend = Some(lock_config.backend);
    Ok(report)
}

fn run_section<B: WaitBackend>(
    backend: B,
    eager_event: bool,
    log: &SharedLog,
    config: &DriverConfig,
) -> Result<RunReport, DriverError> {
    let section = CriticalSection::initialize(backend, ProcessTeardown, eager_event)?;
    let report = run(&section, log, config);
    section.delete()?;
    report
}

/// Runs the workload on a fresh [`NativeLock`].
pub fn run_native(log: &SharedLog, config: &DriverConfig) -> Result<RunReport, DriverError> {
    run(&NativeLock::new(), log, config)
}

/// Runs the native lock first, then the critical section, sharing one log.
pub fn compare(
    lock_config: &LockConfig,
    config: &DriverConfig,
) -> Result<ComparisonReport, DriverError> {
    let log = SharedLog::new(config.log_slots);
    let native = run_native(&log, config)?;
    let custom = run_custom(lock_config, &log, config)?;
    Ok(ComparisonReport { native, custom })
}
