/*!
 * Sync Toolkit - Stress Harness
 *
 * Drives every primitive from several threads at once and prints a JSON
 * report of what each workload observed:
 * - Lock-free stack conservation
 * - Spin lock and keyed lock mutual exclusion
 * - Bounded queue hand-off with close/drain
 * - Ordered map consistency under concurrent writers
 */

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::info;

use sync_toolkit::monitoring::{generate_run_id, init_tracing, span_workload};
use sync_toolkit::{
    BoundedQueue, KeyedMutex, KeyedRwMonitor, LockFreeStack, OrderedMap, SpinLock, SyncConfig,
    SyncError,
};

const DEFAULT_THREADS: usize = 4;
const OPS_PER_THREAD: usize = 10_000;
const KEY_SPACE: usize = 8;
const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Serialize)]
struct StressReport {
    run_id: String,
    threads: usize,
    config: SyncConfig,
    stack: StackReport,
    spin_counter: u64,
    keyed_mutex: ExclusionReport,
    keyed_rw: ExclusionReport,
    queue_delivered: usize,
    map: MapReport,
}

#[derive(Debug, Serialize)]
struct StackReport {
    pushed: usize,
    popped_concurrently: usize,
    drained: usize,
}

#[derive(Debug, Serialize)]
struct ExclusionReport {
    acquisitions: usize,
    violations: usize,
    live_entries_after: usize,
}

#[derive(Debug, Serialize)]
struct MapReport {
    len: usize,
    sorted: bool,
}

fn main() -> Result<()> {
    init_tracing();

    let config = SyncConfig::from_env()?;
    let threads = match std::env::var("SYNC_STRESS_THREADS") {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            SyncError::invalid_argument("SYNC_STRESS_THREADS", format!("`{}` is not a number", raw))
        })?,
        Err(_) => DEFAULT_THREADS,
    };
    if threads == 0 {
        return Err(SyncError::invalid_argument("SYNC_STRESS_THREADS", "must be at least 1").into());
    }

    info!(threads, ?config, "sync stress harness starting");

    let report = StressReport {
        run_id: generate_run_id(),
        threads,
        config,
        stack: stress_stack(threads),
        spin_counter: stress_spin_lock(threads, &config),
        keyed_mutex: stress_keyed_mutex(threads, &config)?,
        keyed_rw: stress_keyed_rw(threads, &config)?,
        queue_delivered: stress_queue(threads)?,
        map: stress_ordered_map(threads),
    };

    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    info!("sync stress harness finished");
    Ok(())
}

fn stress_stack(threads: usize) -> StackReport {
    let span = span_workload("lock_free_stack", threads);
    let _entered = span.enter();

    let stack = LockFreeStack::new();
    let popped = AtomicUsize::new(0);

    thread::scope(|s| {
        for t in 0..threads {
            let stack = &stack;
            let popped = &popped;
            s.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    stack.push(t * OPS_PER_THREAD + i);
                    if i % 3 == 0 && stack.pop().is_some() {
                        popped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    let mut drained = 0;
    while stack.pop().is_some() {
        drained += 1;
    }

    span.record_operations((threads * OPS_PER_THREAD) as u64);
    StackReport {
        pushed: threads * OPS_PER_THREAD,
        popped_concurrently: popped.into_inner(),
        drained,
    }
}

fn stress_spin_lock(threads: usize, config: &SyncConfig) -> u64 {
    let span = span_workload("spin_lock", threads);
    let _entered = span.enter();

    let counter = SpinLock::with_config(0u64, config.spin);
    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..OPS_PER_THREAD {
                    *counter.lock() += 1;
                }
            });
        }
    });

    let total = counter.into_inner();
    span.record_operations(total);
    total
}

fn stress_keyed_mutex(threads: usize, config: &SyncConfig) -> Result<ExclusionReport> {
    let span = span_workload("keyed_mutex", threads);
    let _entered = span.enter();

    let locks = KeyedMutex::with_config(config.table);
    let inside: Vec<AtomicUsize> = (0..KEY_SPACE).map(|_| AtomicUsize::new(0)).collect();
    let violations = AtomicUsize::new(0);

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let (locks, inside, violations) = (&locks, &inside, &violations);
                s.spawn(move || -> Result<(), SyncError> {
                    for i in 0..OPS_PER_THREAD {
                        let key = (t + i) % KEY_SPACE;
                        let _guard = locks.lock(key)?;
                        if inside[key].fetch_add(1, Ordering::SeqCst) != 0 {
                            violations.fetch_add(1, Ordering::Relaxed);
                        }
                        inside[key].fetch_sub(1, Ordering::SeqCst);
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            join_worker(handle)?;
        }
        Ok(())
    })?;

    span.record_operations((threads * OPS_PER_THREAD) as u64);
    Ok(ExclusionReport {
        acquisitions: threads * OPS_PER_THREAD,
        violations: violations.into_inner(),
        live_entries_after: locks.len(),
    })
}

fn stress_keyed_rw(threads: usize, config: &SyncConfig) -> Result<ExclusionReport> {
    let span = span_workload("keyed_rw_monitor", threads);
    let _entered = span.enter();

    let monitor = KeyedRwMonitor::with_config(config.table);
    let writers: Vec<AtomicUsize> = (0..KEY_SPACE).map(|_| AtomicUsize::new(0)).collect();
    let readers: Vec<AtomicUsize> = (0..KEY_SPACE).map(|_| AtomicUsize::new(0)).collect();
    let violations = AtomicUsize::new(0);

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let (monitor, writers, readers, violations) =
                    (&monitor, &writers, &readers, &violations);
                s.spawn(move || -> Result<(), SyncError> {
                    for i in 0..OPS_PER_THREAD {
                        let key = (t * 7 + i) % KEY_SPACE;
                        if i % 4 == 0 {
                            let _guard = monitor.lock_for_write(key)?;
                            let other_writers = writers[key].fetch_add(1, Ordering::SeqCst);
                            if other_writers != 0 || readers[key].load(Ordering::SeqCst) != 0 {
                                violations.fetch_add(1, Ordering::Relaxed);
                            }
                            writers[key].fetch_sub(1, Ordering::SeqCst);
                        } else {
                            let _guard = monitor.lock_for_read(key)?;
                            readers[key].fetch_add(1, Ordering::SeqCst);
                            if writers[key].load(Ordering::SeqCst) != 0 {
                                violations.fetch_add(1, Ordering::Relaxed);
                            }
                            readers[key].fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            join_worker(handle)?;
        }
        Ok(())
    })?;

    span.record_operations((threads * OPS_PER_THREAD) as u64);
    Ok(ExclusionReport {
        acquisitions: threads * OPS_PER_THREAD,
        violations: violations.into_inner(),
        live_entries_after: monitor.len(),
    })
}

fn stress_queue(threads: usize) -> Result<usize> {
    let span = span_workload("bounded_queue", threads);
    let _entered = span.enter();

    let queue = BoundedQueue::new(QUEUE_CAPACITY)?;
    let delivered = thread::scope(|s| -> Result<usize> {
        let consumer = s.spawn(|| queue.drain().count());

        let producers: Vec<_> = (0..threads)
            .map(|t| {
                let queue = &queue;
                s.spawn(move || -> Result<(), SyncError> {
                    for i in 0..OPS_PER_THREAD {
                        queue.enqueue(t * OPS_PER_THREAD + i)?;
                    }
                    Ok(())
                })
            })
            .collect();

        let produced: Vec<Result<()>> = producers.into_iter().map(join_worker).collect();
        // Close before propagating so the consumer always reaches end-of-stream
        queue.close();
        produced.into_iter().collect::<Result<()>>()?;

        consumer
            .join()
            .map_err(|_| miette::miette!("queue consumer panicked"))
    })?;

    span.record_operations(delivered as u64);
    Ok(delivered)
}

fn stress_ordered_map(threads: usize) -> MapReport {
    let span = span_workload("ordered_map", threads);
    let _entered = span.enter();

    let map = OrderedMap::new();
    thread::scope(|s| {
        for t in 0..threads {
            let map = &map;
            s.spawn(move || {
                for i in 0..OPS_PER_THREAD / 10 {
                    let key = (i * 31 + t * 17) % 1_000;
                    map.insert(key, t);
                    if i % 5 == 0 {
                        map.delete(&key);
                    }
                }
            });
        }
    });

    let keys = map.keys();
    span.record_operations(keys.len() as u64);
    MapReport {
        len: map.len(),
        sorted: keys.windows(2).all(|w| w[0] <= w[1]),
    }
}

fn join_worker(handle: thread::ScopedJoinHandle<'_, Result<(), SyncError>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| miette::miette!("stress worker panicked"))??;
    Ok(())
}
