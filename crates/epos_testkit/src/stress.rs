//! Stress helpers for epos.
//!
//! These drive a collection from several threads at once and report what
//! happened.

use epos_codec::Value;
use epos_core::Collection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations per thread.
    pub operations_per_thread: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations_per_thread: 250,
            threads: 8,
        }
    }
}

/// Inserts from many threads at once and returns every identifier handed
/// out, in no particular order.
pub fn stress_concurrent_inserts(
    collection: &Collection,
    config: &StressConfig,
) -> (StressTestResult, Vec<u64>) {
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let collection = collection.clone();
            let failed = Arc::clone(&failed);
            let ops = config.operations_per_thread;

            thread::spawn(move || {
                let mut ids = Vec::with_capacity(ops);
                for i in 0..ops {
                    let value = Value::record([("thread", t as i64), ("op", i as i64)]);
                    match collection.insert(&value) {
                        Ok(id) => ids.push(id),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                ids
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.join().expect("Thread panicked"));
    }

    let result = StressTestResult::new(ids.len(), failed.load(Ordering::Relaxed), start.elapsed());
    (result, ids)
}

/// Runs readers and writers against one collection at once.
///
/// Each thread updates and reads back the records it inserted itself,
/// counting any read that does not see the value it just wrote as a
/// failure.
pub fn stress_mixed_operations(collection: &Collection, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let collection = collection.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let ops = config.operations_per_thread;

            thread::spawn(move || {
                for i in 0..ops {
                    let value = Value::record([("thread", t as i64), ("op", i as i64)]);
                    let outcome = collection.insert(&value).and_then(|id| {
                        let updated = Value::record([("thread", t as i64), ("op", -(i as i64))]);
                        collection.update(id, &updated)?;
                        let seen = collection.get(id)?;
                        if i % 2 == 0 {
                            collection.delete(id)?;
                        }
                        Ok(seen == updated)
                    });
                    match outcome {
                        Ok(true) => successful.fetch_add(1, Ordering::Relaxed),
                        _ => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestDatabase;

    #[test]
    fn result_throughput() {
        let result = StressTestResult::new(90, 10, Duration::from_secs(2));
        assert_eq!(result.total_ops, 100);
        assert!((result.ops_per_second - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_concurrent_insert_run() {
        let db = TestDatabase::memory();
        let coll = db.coll("stress").unwrap();
        let config = StressConfig {
            operations_per_thread: 20,
            threads: 4,
        };
        let (result, ids) = stress_concurrent_inserts(&coll, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(ids.len(), 80);
    }
}
