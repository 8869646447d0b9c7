//! Fixed worker pool.
//!
//! Workers are OS threads spawned once and kept for the executor's
//! lifetime. Each worker blocks on its own job channel; results funnel
//! through one bounded channel back to the coordinator, which is the only
//! consumer. A full output channel stalls a worker until the coordinator
//! drains it.
//!
//! Panics inside an engine are caught per transaction: the transaction is
//! failed, the view rolled back to its pre-transaction checkpoint, and the
//! shard continues.

use crate::cancel::CancelToken;
use crate::delta::StateDelta;
use crate::engine::{BlockContext, ExecutionEngine};
use crate::errors::ExecutionError;
use crate::snapshot::StateSnapshot;
use crate::view::WorkerView;
use shared_types::{Hash, LogEntry, U256};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, warn};
use vc_mempool::PoolEntry;

/// One contiguous slice of a level, bound for one worker.
pub(crate) struct ShardJob {
    pub level: usize,
    pub shard: usize,
    pub entries: Vec<PoolEntry>,
    pub base: Arc<StateSnapshot>,
    pub ctx: BlockContext,
    pub engine: Arc<dyn ExecutionEngine>,
    pub cancel: CancelToken,
}

/// Per-transaction outcome produced by a worker.
pub(crate) struct TxOutcome {
    pub hash: Hash,
    pub priority: u128,
    pub gas_price: U256,
    pub success: bool,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
    pub delta: StateDelta,
}

/// Result of one shard.
pub(crate) struct ShardResult {
    pub shard: usize,
    pub outcomes: Vec<TxOutcome>,
    pub interrupted: bool,
}

/// Fixed-size pool of worker threads.
///
/// Job senders sit behind a mutex: `mpsc::Sender` is not `Sync`, and the
/// executor is shared (`Arc`) between the block loop and its blocking
/// tasks. Dispatch holds the lock only for the send.
pub(crate) struct WorkerPool {
    senders: Mutex<Vec<mpsc::Sender<ShardJob>>>,
    worker_count: usize,
    results: Mutex<mpsc::Receiver<ShardResult>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (result_tx, result_rx) = mpsc::sync_channel(worker_count * 2);

        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let (job_tx, job_rx) = mpsc::channel::<ShardJob>();
            let out = result_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("vc-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, job_rx, out))
                .expect("worker thread spawn failed");
            senders.push(job_tx);
            handles.push(handle);
        }

        Self {
            senders: Mutex::new(senders),
            worker_count,
            results: Mutex::new(result_rx),
            handles,
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Send a shard to worker `index % worker_count`.
    pub(crate) fn dispatch(&self, index: usize, job: ShardJob) -> Result<(), ExecutionError> {
        let senders = self.senders.lock().expect("worker sender lock poisoned");
        if senders.is_empty() {
            return Err(ExecutionError::WorkerPoolDisconnected);
        }
        let slot = index % senders.len();
        senders[slot]
            .send(job)
            .map_err(|_| ExecutionError::WorkerPoolDisconnected)
    }

    /// Receive one shard result. The coordinator is the sole caller.
    pub(crate) fn collect(&self) -> Result<ShardResult, ExecutionError> {
        self.results
            .lock()
            .expect("worker result lock poisoned")
            .recv()
            .map_err(|_| ExecutionError::WorkerPoolDisconnected)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channels lets every worker run off the end of
        // its receive loop.
        if let Ok(mut senders) = self.senders.lock() {
            senders.clear();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(worker_id: usize, jobs: mpsc::Receiver<ShardJob>, out: mpsc::SyncSender<ShardResult>) {
    debug!(worker_id, "worker started");
    while let Ok(job) = jobs.recv() {
        let result = run_shard(job);
        if out.send(result).is_err() {
            break;
        }
    }
    debug!(worker_id, "worker stopped");
}

/// Execute a shard sequentially against a worker-local view.
fn run_shard(job: ShardJob) -> ShardResult {
    let mut view = WorkerView::new(job.base.clone());
    let mut outcomes = Vec::with_capacity(job.entries.len());
    let mut interrupted = false;

    for entry in &job.entries {
        // Cooperative cancellation between transactions, never inside one.
        if job.cancel.is_cancelled() {
            interrupted = true;
            break;
        }

        let checkpoint = view.checkpoint();
        let run = catch_unwind(AssertUnwindSafe(|| {
            job.engine.run(&entry.tx, &mut view, &job.ctx)
        }));

        let outcome = match run {
            Ok(Ok(execution)) => TxOutcome {
                hash: entry.hash,
                priority: entry.priority,
                gas_price: entry.tx.gas_price,
                success: true,
                gas_used: execution.gas_used,
                logs: execution.logs,
                delta: view.take_delta(),
            },
            Ok(Err(engine_error)) => {
                warn!(hash = ?entry.hash, "engine error: {engine_error}");
                view.restore(checkpoint);
                failed_outcome(entry)
            }
            Err(_) => {
                error!(hash = ?entry.hash, level = job.level, "worker panic isolated");
                view.restore(checkpoint);
                failed_outcome(entry)
            }
        };
        outcomes.push(outcome);
    }

    ShardResult {
        shard: job.shard,
        outcomes,
        interrupted,
    }
}

/// Failed transactions burn their whole declared limit and carry no state.
fn failed_outcome(entry: &PoolEntry) -> TxOutcome {
    TxOutcome {
        hash: entry.hash,
        priority: entry.priority,
        gas_price: entry.tx.gas_price,
        success: false,
        gas_used: entry.tx.gas_limit,
        logs: Vec::new(),
        delta: StateDelta::default(),
    }
}
