/*!
 * Deferred Task Scheduler Tests
 * Deadline ordering and cancel/fire races across pool threads
 */

use parking_lot::Mutex;
use pressure_responder::deferred::{DeferredPool, DelayedTask};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_tasks_fire_in_deadline_order() {
    let pool = DeferredPool::new("ordering", 1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<_> = [60u64, 20, 40]
        .iter()
        .map(|&delay| {
            let order = order.clone();
            let task = DelayedTask::new(&pool, &format!("t{}", delay), move |_| {
                order.lock().push(delay);
            });
            assert!(task.queue(Duration::from_millis(delay)));
            task
        })
        .collect();

    wait_until(|| order.lock().len() == 3);
    assert_eq!(*order.lock(), vec![20, 40, 60]);
    assert!(tasks.iter().all(|t| t.status().fired == 1));
}

#[test]
fn test_every_queue_fires_or_is_cancelled() {
    let pool = DeferredPool::new("race", 2).unwrap();
    let fired = Arc::new(AtomicU64::new(0));
    let seen = fired.clone();
    let task = DelayedTask::new(&pool, "race", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut queued = 0u64;
    let mut cancelled = 0u64;
    for i in 0..200u64 {
        if task.queue(Duration::from_micros(200 + (i % 7) * 100)) {
            queued += 1;
        }
        thread::sleep(Duration::from_micros((i % 5) * 150));
        if task.cancel_sync().was_pending() {
            cancelled += 1;
        }
    }

    wait_until(|| !task.is_running());
    assert!(!task.is_pending());
    assert_eq!(fired.load(Ordering::SeqCst) + cancelled, queued);
}

#[test]
fn test_cancel_from_another_thread_blocks_until_done() {
    let pool = DeferredPool::new("blocking", 1).unwrap();
    let finished = Arc::new(AtomicU64::new(0));
    let flag = finished.clone();
    let task = DelayedTask::new(&pool, "slow", move |_| {
        thread::sleep(Duration::from_millis(60));
        flag.store(1, Ordering::SeqCst);
    });

    task.queue(Duration::from_millis(1));
    wait_until(|| task.is_running());

    let canceller = {
        let task = task.clone();
        thread::spawn(move || task.cancel_sync())
    };
    let outcome = canceller.join().unwrap();

    // The firing had already started, so nothing was pending
    assert!(outcome.was_idle());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pool_shutdown_drops_pending() {
    let pool = DeferredPool::new("shutdown", 2).unwrap();
    let fired = Arc::new(AtomicU64::new(0));
    let seen = fired.clone();
    let task = DelayedTask::new(&pool, "late", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    assert!(task.queue(Duration::from_millis(30)));
    assert_eq!(pool.queued(), 1);
    pool.shutdown();

    assert!(!task.pool_alive());
    assert!(!task.queue(Duration::from_millis(1)));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_foreign_queue_during_cancel_is_accepted() {
    let pool = DeferredPool::new("foreign", 2).unwrap();
    let fired = Arc::new(AtomicU64::new(0));
    let seen = fired.clone();
    let task = DelayedTask::new(&pool, "removal", move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(200));
        }
    });

    assert!(task.queue(Duration::ZERO));
    wait_until(|| task.is_running());

    let canceller = {
        let task = task.clone();
        thread::spawn(move || task.cancel_sync())
    };
    thread::sleep(Duration::from_millis(50));

    // Another thread is waiting in cancel_sync; a fresh queue from here still counts
    assert!(task.queue(Duration::from_millis(10)));
    assert!(task.is_pending());

    // The cancel waited out the slow firing and the short one overlapping it
    assert!(canceller.join().unwrap().was_idle());
    assert!(!task.is_running());
    wait_until(|| task.status().fired == 2);
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert!(!task.is_pending());
}
