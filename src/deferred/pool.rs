/*!
 * Deferred Pool
 *
 * General-purpose pool of timer threads that fire delayed tasks once their
 * deadline passes. Entries are ordered by (deadline, sequence); an entry whose
 * sequence no longer matches the task's pending fire is stale and skipped.
 */

use super::task::TaskInner;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

pub(super) struct TimerEntry {
    pub(super) deadline: Instant,
    pub(super) seq: u64,
    pub(super) task: Arc<TaskInner>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

struct PoolQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    next_seq: u64,
    shutdown: bool,
}

pub(super) struct PoolShared {
    name: String,
    queue: Mutex<PoolQueue>,
    wakeup: Condvar,
}

impl PoolShared {
    /// Insert a timer entry, returning its sequence or None after shutdown
    pub(super) fn schedule(&self, deadline: Instant, task: Arc<TaskInner>) -> Option<u64> {
        let mut queue = self.queue.lock();
        if queue.shutdown {
            return None;
        }

        queue.next_seq += 1;
        let seq = queue.next_seq;
        queue.heap.push(Reverse(TimerEntry {
            deadline,
            seq,
            task,
        }));
        drop(queue);

        self.wakeup.notify_one();
        Some(seq)
    }

    pub(super) fn is_shutdown(&self) -> bool {
        self.queue.lock().shutdown
    }

    fn run(self: Arc<Self>) {
        let mut queue = self.queue.lock();
        loop {
            if queue.shutdown {
                break;
            }

            let next_deadline = queue.heap.peek().map(|Reverse(entry)| entry.deadline);
            match next_deadline {
                None => {
                    self.wakeup.wait(&mut queue);
                }
                Some(deadline) if deadline > Instant::now() => {
                    self.wakeup.wait_until(&mut queue, deadline);
                }
                Some(_) => {
                    if let Some(Reverse(entry)) = queue.heap.pop() {
                        MutexGuard::unlocked(&mut queue, || {
                            entry.task.fire(entry.seq);
                        });
                    }
                }
            }
        }
        debug!("Deferred pool '{}' thread exiting", self.name);
    }
}

/// Pool of timer threads executing delayed tasks
pub struct DeferredPool {
    shared: Arc<PoolShared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl DeferredPool {
    /// Spawn a pool with `threads` timer threads (at least one)
    pub fn new(name: &str, threads: usize) -> std::io::Result<Arc<Self>> {
        let shared = Arc::new(PoolShared {
            name: name.to_string(),
            queue: Mutex::new(PoolQueue {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let pool = Arc::new(Self {
            shared: shared.clone(),
            threads: Mutex::new(Vec::new()),
        });

        for index in 0..threads.max(1) {
            let worker = shared.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.threads.lock().push(handle),
                Err(e) => {
                    warn!("Failed to spawn deferred pool '{}' thread: {}", name, e);
                    pool.shutdown();
                    return Err(e);
                }
            }
        }

        info!(
            "Deferred pool '{}' started with {} thread(s)",
            name,
            threads.max(1)
        );
        Ok(pool)
    }

    pub(super) fn shared(&self) -> &Arc<PoolShared> {
        &self.shared
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Number of timer entries waiting, stale ones included
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().heap.len()
    }

    /// Stop the timer threads; nothing queued fires afterwards
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.shutdown {
                return;
            }
            queue.shutdown = true;
            queue.heap.clear();
        }
        self.shared.wakeup.notify_all();

        let current = std::thread::current().id();
        for handle in self.threads.lock().drain(..) {
            // A task shutting down its own pool cannot join itself
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("Deferred pool '{}' thread panicked", self.shared.name);
            }
        }
        info!("Deferred pool '{}' shut down", self.shared.name);
    }
}

impl Drop for DeferredPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
