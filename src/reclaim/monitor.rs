/*!
 * Pressure Monitor
 *
 * Background task that polls a memory source and drives the synchronous
 * reclaim path whenever available memory sits below the free-memory target.
 */

use super::reclaimer::Reclaimer;
use super::traits::MemorySource;
use super::types::ReclaimOutcome;
use crate::core::types::Millis;
use log::{info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Control messages for the monitor task
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    /// Stop polling; explicit triggers still run
    Pause,
    Resume,
    /// Run the pressure path now regardless of the memory reading
    Trigger,
    Shutdown,
}

/// Handle to the pressure monitor background task
pub struct PressureMonitor {
    command_tx: mpsc::UnboundedSender<MonitorCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl PressureMonitor {
    /// Spawn on the current tokio runtime
    pub fn spawn(
        reclaimer: Arc<Reclaimer>,
        memory: Arc<dyn MemorySource>,
        minfree_mib: u64,
        poll_ms: Millis,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            run_monitor_loop(reclaimer, memory, minfree_mib, poll_ms, command_rx).await;
        });

        info!(
            "Pressure monitor spawned - minfree {} MiB, polling every {} ms",
            minfree_mib, poll_ms
        );

        Self {
            command_tx,
            handle: Some(handle),
        }
    }

    pub fn pause(&self) {
        let _ = self.command_tx.send(MonitorCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.command_tx.send(MonitorCommand::Resume);
    }

    pub fn trigger(&self) {
        let _ = self.command_tx.send(MonitorCommand::Trigger);
    }

    /// Shutdown the monitor task gracefully
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(MonitorCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Pressure monitor shutdown error: {}", e);
            } else {
                info!("Pressure monitor shutdown complete");
            }
        }
    }
}

/// Scan/kill passes block, so they leave the async worker threads
async fn force_reclaim(reclaimer: &Arc<Reclaimer>) -> Option<ReclaimOutcome> {
    let reclaimer = reclaimer.clone();
    match tokio::task::spawn_blocking(move || reclaimer.force_reclaim()).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("Reclaim task failed: {}", e);
            None
        }
    }
}

async fn run_monitor_loop(
    reclaimer: Arc<Reclaimer>,
    memory: Arc<dyn MemorySource>,
    minfree_mib: u64,
    poll_ms: Millis,
    mut command_rx: mpsc::UnboundedReceiver<MonitorCommand>,
) {
    let mut active = true;
    let mut interval = tokio::time::interval(Duration::from_millis(poll_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !active {
                    continue;
                }
                match memory.available_mib() {
                    Ok(available) if available < minfree_mib => {
                        trace!("Memory pressure: {} MiB available", available);
                        force_reclaim(&reclaimer).await;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to read available memory: {}", e),
                }
            }

            Some(cmd) = command_rx.recv() => {
                match cmd {
                    MonitorCommand::Pause => {
                        info!("Pressure monitor paused");
                        active = false;
                    }
                    MonitorCommand::Resume => {
                        info!("Pressure monitor resumed");
                        active = true;
                    }
                    MonitorCommand::Trigger => {
                        if let Some(outcome) = force_reclaim(&reclaimer).await {
                            trace!("Manual reclaim trigger: {:?}", outcome);
                        }
                    }
                    MonitorCommand::Shutdown => {
                        info!("Pressure monitor shutting down");
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for PressureMonitor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(MonitorCommand::Shutdown);
        }
    }
}
