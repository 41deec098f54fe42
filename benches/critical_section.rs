//! Critical section benchmarks.
//!
//! 1. **Uncontended** enter/leave against the native recursive mutex
//! 2. **Reentrant** nesting depth
//! 3. **Contended** throughput with several threads, per backend
//! 4. **Event creation** cost of the first contention (lazy vs eager)

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::thread;

use critsect::bench::{Lockable, NativeLock};
use critsect::sync::{CriticalSection, NoTeardown, ParkingBackend, Timeout, WaitBackend};

// =============================================================================
// HELPERS
// =============================================================================

fn section<B: WaitBackend>(backend: B) -> CriticalSection<B, NoTeardown> {
    CriticalSection::with_backend(backend, NoTeardown)
}

fn hammer<L: Lockable>(lock: &L, threads: usize, per_thread: u64) {
    let counter = std::sync::atomic::AtomicU64::new(0);
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                for _ in 0..per_thread {
                    let _ = lock.with_lock(|| {
                        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    });
                }
            });
        }
    });
    black_box(counter.into_inner());
}

// =============================================================================
// 1. UNCONTENDED
// =============================================================================

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_section/uncontended");

    let custom = section(ParkingBackend);
    group.bench_function("custom_enter_leave", |b| {
        b.iter(|| {
            let _ = black_box(custom.enter(Timeout::Infinite));
            custom.leave();
        })
    });

    group.bench_function("custom_guard", |b| {
        b.iter(|| black_box(custom.lock().map(|guard| guard.acquisition())))
    });

    let native = NativeLock::new();
    group.bench_function("native", |b| b.iter(|| black_box(native.with_lock(|| 1))));

    group.finish();
}

// =============================================================================
// 2. REENTRANT
// =============================================================================

fn bench_reentrant(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_section/reentrant");
    let custom = section(ParkingBackend);

    for depth in [1u32, 4, 16] {
        group.throughput(Throughput::Elements(u64::from(depth)));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                for _ in 0..depth {
                    let _ = custom.enter(Timeout::NoWait);
                }
                for _ in 0..depth {
                    custom.leave();
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// 3. CONTENDED
// =============================================================================

fn bench_contended(c: &mut Criterion) {
    const PER_THREAD: u64 = 2_000;
    let mut group = c.benchmark_group("critical_section/contended");
    group.sample_size(20);

    for threads in [2usize, 4] {
        group.throughput(Throughput::Elements(threads as u64 * PER_THREAD));

        let parking = section(ParkingBackend);
        group.bench_with_input(BenchmarkId::new("parking", threads), &threads, |b, &n| {
            b.iter(|| hammer(&parking, n, PER_THREAD))
        });

        #[cfg(target_os = "linux")]
        {
            let eventfd = section(critsect::sync::backend::EventFdBackend);
            group.bench_with_input(BenchmarkId::new("eventfd", threads), &threads, |b, &n| {
                b.iter(|| hammer(&eventfd, n, PER_THREAD))
            });
        }

        let native = NativeLock::new();
        group.bench_with_input(BenchmarkId::new("native", threads), &threads, |b, &n| {
            b.iter(|| hammer(&native, n, PER_THREAD))
        });
    }

    group.finish();
}

// =============================================================================
// 4. EVENT CREATION
// =============================================================================

fn bench_event_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_section/initialize");

    for eager in [false, true] {
        let name = if eager { "eager" } else { "lazy" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let section = CriticalSection::initialize(ParkingBackend, NoTeardown, eager);
                black_box(section.map(|section| section.delete()))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_reentrant,
    bench_contended,
    bench_event_creation,
);
criterion_main!(benches);
