/*!
 * Delayed Task
 *
 * A cancelable unit of work fired once by a `DeferredPool` after a delay.
 *
 * # Invariants
 * - At most one fire is pending at any time; `queue` on a pending task is a no-op
 * - `cancel_sync` returns only once no firing of this task is running
 * - While a cancel is in progress the task's own running work cannot re-queue
 *   it, so a self-rearming task is stopped for good; other threads may queue
 */

use super::pool::{DeferredPool, PoolShared};
use super::types::{CancelOutcome, TaskStatus};
use log::trace;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};

type Work = Box<dyn Fn(&DelayedTask) + Send + Sync>;

#[derive(Default)]
struct TaskState {
    /// Sequence of the pool entry that is allowed to fire
    pending: Option<u64>,
    /// Threads currently executing the work; a fire queued while the previous
    /// one runs may overlap it on another pool thread
    runners: Vec<ThreadId>,
    cancelling: usize,
    fired: u64,
}

pub(super) struct TaskInner {
    name: String,
    state: Mutex<TaskState>,
    idle: Condvar,
    work: Work,
    pool: Arc<PoolShared>,
}

impl TaskInner {
    /// Called by a pool thread once `seq`'s deadline has passed
    pub(super) fn fire(self: &Arc<Self>, seq: u64) {
        {
            let mut state = self.state.lock();
            if state.pending != Some(seq) {
                trace!("Skipping stale fire of '{}'", self.name);
                return;
            }
            state.pending = None;
            state.runners.push(std::thread::current().id());
        }

        let handle = DelayedTask {
            inner: Arc::clone(self),
        };
        (self.work)(&handle);

        let current = std::thread::current().id();
        let mut state = self.state.lock();
        if let Some(slot) = state.runners.iter().position(|&runner| runner == current) {
            state.runners.swap_remove(slot);
        }
        state.fired += 1;
        drop(state);
        self.idle.notify_all();
    }
}

/// Handle to a delayed task; clones refer to the same task
#[derive(Clone)]
pub struct DelayedTask {
    inner: Arc<TaskInner>,
}

impl DelayedTask {
    pub fn new<F>(pool: &DeferredPool, name: &str, work: F) -> Self
    where
        F: Fn(&DelayedTask) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TaskInner {
                name: name.to_string(),
                state: Mutex::new(TaskState::default()),
                idle: Condvar::new(),
                work: Box::new(work),
                pool: pool.shared().clone(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Schedule a fire after `delay`.
    ///
    /// Returns `false` without changing anything if a fire is already pending,
    /// the task's own work re-arms it during a cancel, or the pool has shut down.
    pub fn queue(&self, delay: Duration) -> bool {
        let mut state = self.inner.state.lock();
        if state.pending.is_some() {
            return false;
        }
        let current = std::thread::current().id();
        if state.cancelling > 0 && state.runners.contains(&current) {
            trace!("Refusing re-arm of '{}' during cancel", self.inner.name);
            return false;
        }

        let deadline = Instant::now() + delay;
        match self.inner.pool.schedule(deadline, Arc::clone(&self.inner)) {
            Some(seq) => {
                state.pending = Some(seq);
                trace!("Queued '{}' to fire in {:?}", self.inner.name, delay);
                true
            }
            None => false,
        }
    }

    /// Cancel a pending fire and wait for any in-flight firing to finish.
    ///
    /// Called from within the task's own work it does not wait for itself.
    pub fn cancel_sync(&self) -> CancelOutcome {
        let mut state = self.inner.state.lock();
        state.cancelling += 1;
        let was_pending = state.pending.take().is_some();

        let current = std::thread::current().id();
        while state.runners.iter().any(|&runner| runner != current) {
            self.inner.idle.wait(&mut state);
        }
        state.cancelling -= 1;

        if was_pending {
            CancelOutcome::WasPending
        } else {
            CancelOutcome::WasIdle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    pub fn is_running(&self) -> bool {
        !self.inner.state.lock().runners.is_empty()
    }

    pub fn status(&self) -> TaskStatus {
        let state = self.inner.state.lock();
        TaskStatus {
            pending: state.pending.is_some(),
            running: !state.runners.is_empty(),
            fired: state.fired,
        }
    }

    /// Whether the owning pool still accepts work
    pub fn pool_alive(&self) -> bool {
        !self.inner.pool.is_shutdown()
    }
}

impl std::fmt::Debug for DelayedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedTask")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(pool: &DeferredPool) -> (DelayedTask, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let task = DelayedTask::new(pool, "count", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (task, count)
    }

    #[test]
    fn test_fires_once_after_delay() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let (task, count) = counting_task(&pool);

        assert!(task.queue(Duration::from_millis(20)));
        assert!(task.is_pending());
        std::thread::sleep(Duration::from_millis(120));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!task.is_pending());
        assert_eq!(task.status().fired, 1);
    }

    #[test]
    fn test_requeue_while_pending_is_noop() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let (task, count) = counting_task(&pool);

        assert!(task.queue(Duration::from_millis(30)));
        assert!(!task.queue(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_reports_pending_then_idle() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let (task, count) = counting_task(&pool);

        task.queue(Duration::from_secs(10));
        assert_eq!(task.cancel_sync(), CancelOutcome::WasPending);
        assert_eq!(task.cancel_sync(), CancelOutcome::WasIdle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_waits_for_running_work() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = finished.clone();
        let task = DelayedTask::new(&pool, "slow", move |_| {
            std::thread::sleep(Duration::from_millis(80));
            flag.store(1, Ordering::SeqCst);
        });

        task.queue(Duration::ZERO);
        while !task.is_running() {
            std::thread::yield_now();
        }

        // Work is in flight, not pending
        assert_eq!(task.cancel_sync(), CancelOutcome::WasIdle);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_self_rearm_stops_on_cancel() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let task = DelayedTask::new(&pool, "periodic", move |me| {
            seen.fetch_add(1, Ordering::SeqCst);
            me.queue(Duration::from_millis(5));
        });

        task.queue(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(60));
        task.cancel_sync();
        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel >= 2);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
        assert!(!task.is_pending());
    }

    #[test]
    fn test_no_fire_after_shutdown() {
        let pool = DeferredPool::new("test", 2).unwrap();
        let (task, count) = counting_task(&pool);

        task.queue(Duration::from_millis(30));
        pool.shutdown();
        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!task.pool_alive());
        task.cancel_sync();
        assert!(!task.queue(Duration::ZERO));
    }
}
