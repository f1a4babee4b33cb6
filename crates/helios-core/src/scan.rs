//! Bounded parallel scanning of a frame source.
//!
//! Frames are read sequentially on the calling thread, copied, and handed to
//! a fixed-size rayon pool. A counting semaphore caps the number of copies in
//! flight: when it is exhausted the scanning thread blocks until a worker
//! finishes. Each worker writes into its own set-once slot, so results come
//! back in frame-index order whatever the completion order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{SCAN_SHUTDOWN_TIMEOUT, SCAN_TASKS_PER_CORE};
use crate::error::{HeliosError, Result};
use crate::frame::FrameSource;
use crate::pipeline::{PipelineStage, ProgressReporter};

/// Configuration of the frame scanning pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Worker thread count. Defaults to the available parallelism.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Maximum number of copied frames waiting or being processed.
    /// Defaults to `SCAN_TASKS_PER_CORE` times the available parallelism.
    #[serde(default)]
    pub max_in_flight: Option<usize>,
    /// Ceiling on the time spent waiting for workers once all frames are
    /// submitted.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_shutdown_timeout_secs() -> u64 {
    SCAN_SHUTDOWN_TIMEOUT.as_secs()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_in_flight: None,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a scan.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a scan. A `None` slot means the frame failed or was skipped
/// after cancellation.
#[derive(Clone, Debug)]
pub struct ScanOutcome<T> {
    pub results: Vec<Option<T>>,
    pub failures: usize,
    pub cancelled: bool,
}

impl<T> ScanOutcome<T> {
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }
}

/// Counting semaphore bounding the number of in-flight frame copies.
struct Semaphore {
    available: Mutex<usize>,
    capacity: usize,
    changed: Condvar,
}

impl Semaphore {
    fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity),
            capacity,
            changed: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.changed.wait(&mut available);
        }
        *available -= 1;
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.changed.notify_all();
    }

    /// Block until every permit is back, or the deadline passes.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut available = self.available.lock();
        while *available < self.capacity {
            if self.changed.wait_until(&mut available, deadline).timed_out() {
                return *available == self.capacity;
            }
        }
        true
    }
}

struct ScanSlots<T> {
    slots: Vec<OnceLock<T>>,
    completed: AtomicUsize,
    failures: AtomicUsize,
}

/// Fixed-size worker pool for per-frame work.
pub struct FrameScanner {
    pool: ThreadPool,
    max_in_flight: usize,
    shutdown_timeout: Duration,
}

impl FrameScanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let threads = config.worker_threads.unwrap_or(cores).max(1);
        let max_in_flight = config
            .max_in_flight
            .unwrap_or(cores * SCAN_TASKS_PER_CORE)
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("helios-scan-{i}"))
            .panic_handler(|payload| {
                warn!(message = %panic_message(payload.as_ref()), "Scan worker panicked");
            })
            .build()
            .map_err(|e| HeliosError::ThreadPool(e.to_string()))?;

        debug!(threads, max_in_flight, "Frame scanner ready");

        Ok(Self {
            pool,
            max_in_flight,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Run `work` for every frame of `source`, failures are logged.
    pub fn scan<T, W>(
        &self,
        source: &mut dyn FrameSource,
        work: W,
        cancel: &CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<ScanOutcome<T>>
    where
        T: Send + Sync + 'static,
        W: Fn(usize, &[u8]) -> Result<T> + Send + Sync + 'static,
    {
        self.scan_with_handler(source, work, log_failure, cancel, reporter)
    }

    /// Run `work` for every frame of `source`.
    ///
    /// A frame whose work returns an error or panics is reported to
    /// `on_failure` as [`HeliosError::WorkerFailure`] and leaves its slot
    /// empty; the scan carries on. A panic in `on_failure` or in the
    /// reporter is logged and does not stop the scan either. Errors from the source itself stop
    /// submission and are returned once the pool is drained.
    pub fn scan_with_handler<T, W, F>(
        &self,
        source: &mut dyn FrameSource,
        work: W,
        on_failure: F,
        cancel: &CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<ScanOutcome<T>>
    where
        T: Send + Sync + 'static,
        W: Fn(usize, &[u8]) -> Result<T> + Send + Sync + 'static,
        F: Fn(HeliosError) + Send + Sync + 'static,
    {
        let total = source.frame_count();
        info!(total_frames = total, "Scanning frames");
        reporter.begin_stage(PipelineStage::Scanning, Some(total));

        let shared = Arc::new(ScanSlots {
            slots: (0..total).map(|_| OnceLock::new()).collect(),
            completed: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        });
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let work = Arc::new(work);
        let on_failure = Arc::new(on_failure);

        let mut cancelled = false;
        let mut source_error = None;

        for index in 0..total {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            // The source reuses its buffer, so the copy must happen here and
            // not inside the worker.
            let frame = match source.next_frame() {
                Ok(raw) => raw.to_vec(),
                Err(e) => {
                    warn!(frame = index, error = %e, "Frame source failed, stopping scan");
                    source_error = Some(e);
                    break;
                }
            };

            semaphore.acquire();

            let shared = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);
            let work = Arc::clone(&work);
            let on_failure = Arc::clone(&on_failure);
            let cancel = cancel.clone();
            let reporter = Arc::clone(&reporter);
            self.pool.spawn(move || {
                let task = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_task(&shared, index, &frame, &*work, &*on_failure, &cancel, &*reporter)
                }));
                if let Err(payload) = task {
                    warn!(
                        frame = index,
                        message = %panic_message(payload.as_ref()),
                        "Scan callback panicked"
                    );
                }
                // Results are unwrapped once every permit is back, so the
                // slots must be released before the permit.
                drop(shared);
                semaphore.release();
            });
        }

        if !semaphore.wait_idle(self.shutdown_timeout) {
            return Err(HeliosError::ProcessingTimeout {
                waited: self.shutdown_timeout,
            });
        }
        reporter.finish_stage();

        if let Some(e) = source_error {
            return Err(e);
        }

        let shared = Arc::try_unwrap(shared).map_err(|_| {
            HeliosError::ThreadPool("scan workers still hold the result slots".into())
        })?;
        let failures = shared.failures.load(Ordering::SeqCst);
        let cancelled = cancelled || cancel.is_cancelled();
        let results: Vec<Option<T>> = shared.slots.into_iter().map(OnceLock::into_inner).collect();

        info!(
            completed = results.iter().filter(|r| r.is_some()).count(),
            failures,
            cancelled,
            "Frame scan finished"
        );

        Ok(ScanOutcome {
            results,
            failures,
            cancelled,
        })
    }
}

fn run_task<T, W, F>(
    shared: &ScanSlots<T>,
    index: usize,
    frame: &[u8],
    work: &W,
    on_failure: &F,
    cancel: &CancellationToken,
    reporter: &dyn ProgressReporter,
) where
    W: Fn(usize, &[u8]) -> Result<T>,
    F: Fn(HeliosError),
{
    if cancel.is_cancelled() {
        return;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| work(index, frame))) {
        Ok(Ok(value)) => {
            let _ = shared.slots[index].set(value);
        }
        Ok(Err(e)) => {
            shared.failures.fetch_add(1, Ordering::SeqCst);
            on_failure(as_worker_failure(index, e));
        }
        Err(payload) => {
            shared.failures.fetch_add(1, Ordering::SeqCst);
            on_failure(HeliosError::WorkerFailure {
                frame_index: index,
                message: panic_message(payload.as_ref()),
            });
        }
    }

    let done = shared.completed.fetch_add(1, Ordering::SeqCst) + 1;
    reporter.advance(done);
}

fn as_worker_failure(index: usize, error: HeliosError) -> HeliosError {
    match error {
        e @ HeliosError::WorkerFailure { .. } => e,
        other => HeliosError::WorkerFailure {
            frame_index: index,
            message: other.to_string(),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Default failure handler: log and keep going.
pub fn log_failure(error: HeliosError) {
    match &error {
        HeliosError::WorkerFailure { frame_index, .. } => {
            warn!(frame = frame_index, error = %error, "Frame processing failed");
        }
        _ => warn!(error = %error, "Frame processing failed"),
    }
}
