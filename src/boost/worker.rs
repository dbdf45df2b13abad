/*!
 * Boost Worker
 *
 * Dedicated elevated-priority thread that runs boost work items strictly in
 * submission order. Each item is queued at most once at a time: queueing an
 * item that is already waiting is a no-op, and the mark is dropped right
 * before the item runs so a kick arriving mid-run queues it again.
 */

use crate::core::config::WorkerConfig;
use crate::platform::sched;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Work items executed by the boost worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItem {
    InputBoost,
    MaxBoost,
}

impl WorkItem {
    const COUNT: usize = 2;

    #[inline]
    fn index(self) -> usize {
        match self {
            WorkItem::InputBoost => 0,
            WorkItem::MaxBoost => 1,
        }
    }
}

enum Message {
    Run(WorkItem),
    Stop,
}

/// Handle to the dedicated boost worker thread
pub struct BoostWorker {
    tx: flume::Sender<Message>,
    queued: Arc<[AtomicBool; WorkItem::COUNT]>,
    stopped: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BoostWorker {
    /// Spawn the worker; `execute` runs every dequeued item
    pub fn spawn<F>(config: &WorkerConfig, execute: F) -> std::io::Result<Self>
    where
        F: Fn(WorkItem) + Send + 'static,
    {
        let (tx, rx) = flume::unbounded::<Message>();
        let queued: Arc<[AtomicBool; WorkItem::COUNT]> =
            Arc::new([AtomicBool::new(false), AtomicBool::new(false)]);
        let thread_queued = queued.clone();
        let thread_config = config.clone();

        let handle = std::thread::Builder::new()
            .name("boost-worker".to_string())
            .spawn(move || {
                apply_thread_policy(&thread_config);
                run_worker_loop(rx, thread_queued, execute);
            })?;

        info!(
            rt_priority = config.rt_priority,
            affinity = ?config.affinity,
            "Boost worker started"
        );

        Ok(Self {
            tx,
            queued,
            stopped: AtomicBool::new(false),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue `item`; returns `false` if it was already waiting or the worker stopped
    pub fn queue(&self, item: WorkItem) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        if self.queued[item.index()].swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.tx.send(Message::Run(item)).is_err() {
            self.queued[item.index()].store(false, Ordering::Release);
            return false;
        }
        true
    }

    pub fn is_queued(&self, item: WorkItem) -> bool {
        self.queued[item.index()].load(Ordering::Acquire)
    }

    /// Run everything already queued, then stop and join the thread
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(Message::Stop);

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Boost worker panicked during shutdown");
            } else {
                info!("Boost worker shut down");
            }
        }
    }
}

impl Drop for BoostWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker_loop<F>(
    rx: flume::Receiver<Message>,
    queued: Arc<[AtomicBool; WorkItem::COUNT]>,
    execute: F,
) where
    F: Fn(WorkItem),
{
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(item) => {
                queued[item.index()].store(false, Ordering::Release);
                execute(item);
            }
            Message::Stop => break,
        }
    }
    debug!("Boost worker loop exited");
}

fn apply_thread_policy(config: &WorkerConfig) {
    if !config.affinity.is_empty() {
        if let Err(e) = sched::pin_current_thread(&config.affinity) {
            warn!(error = %e, "Failed to pin boost worker");
        }
    }
    if config.rt_priority > 0 {
        if let Err(e) = sched::set_fifo_priority(0, config.rt_priority) {
            warn!(error = %e, "Failed to set SCHED_FIFO on boost worker");
        }
    }
}
