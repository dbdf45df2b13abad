/*!
 * Pressure Responder - Main Entry Point
 *
 * Daemon that wires the boost arbiter and the low-memory reclaimer to the
 * host platform:
 * - Boost arbiter registered with the governor, input and display sources
 * - Reclaimer armed with the configured minfree, periodic pass started
 * - Pressure monitor driving the synchronous reclaim path
 * - Line commands on stdin for manual events
 */

use anyhow::Context;
use pressure_responder::boost::types::{DisplayEvent, InputEvent};
use pressure_responder::{
    init_tracing, BoostArbiter, BoostHandle, DeferredPool, MonotonicClock, Platform,
    PressureMonitor, Reclaimer, ReclaimerDeps, ResponderConfig, ResponderStats,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Commands accepted on stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Input,
    Display(DisplayEvent),
    Reclaim,
    Boost(u64),
    Stats,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("input"), None) => Command::Input,
            (Some("display"), Some("on")) => Command::Display(DisplayEvent::On),
            (Some("display"), Some("off")) => Command::Display(DisplayEvent::Off),
            (Some("reclaim"), None) => Command::Reclaim,
            (Some("boost"), Some(ms)) => Command::Boost(
                ms.parse()
                    .map_err(|_| format!("invalid duration '{}'", ms))?,
            ),
            (Some("stats"), None) => Command::Stats,
            _ => return Err(format!("unknown command '{}'", line.trim())),
        };
        if words.next().is_some() {
            return Err(format!("trailing arguments in '{}'", line.trim()));
        }
        Ok(command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Pressure responder starting...");
    let config = ResponderConfig::from_env().context("failed to load configuration")?;

    let platform = Platform::detect();
    info!(platform = ?platform.kind, "Platform bindings selected");

    let pool = DeferredPool::new("responder-deferred", config.worker.deferred_threads)
        .context("failed to start deferred pool")?;
    let clock = MonotonicClock::shared();

    info!("Starting boost arbiter...");
    let boost = BoostHandle::from_start(BoostArbiter::start(
        platform.collaborators(),
        config.boost.clone(),
        &config.worker,
        &pool,
        clock.clone(),
    ));

    info!("Starting low-memory reclaimer...");
    let reclaimer = Arc::new(Reclaimer::new(
        config.reclaim.clone(),
        ReclaimerDeps {
            processes: platform.processes.clone(),
            boost: boost.clone(),
            bus: platform.bus.clone(),
            clock,
        },
        &pool,
    ));
    reclaimer.enable(config.reclaim.minfree_mib);
    reclaimer.start_periodic();

    let monitor = PressureMonitor::spawn(
        reclaimer.clone(),
        platform.memory.clone(),
        config.reclaim.minfree_mib,
        config.reclaim.pressure_poll_ms,
    );

    info!("Responder ready - commands: input | display on|off | reclaim | boost <ms> | stats");
    info!("Press Ctrl+C to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match Command::parse(&line) {
                        Ok(command) => run_command(command, &platform, &boost, &reclaimer).await,
                        Err(e) => warn!("{}", e),
                    },
                    Ok(None) => {
                        info!("stdin closed, waiting for Ctrl+C");
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            error!(error = %e, "Failed to listen for Ctrl+C");
                        }
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
                break;
            }
        }
    }

    info!("Shutting down...");
    monitor.shutdown().await;
    let blocking_pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        reclaimer.stop_periodic();
        if let Some(arbiter) = boost.arbiter() {
            arbiter.shutdown();
        }
        blocking_pool.shutdown();
    })
    .await
    .context("shutdown task failed")?;

    info!("Pressure responder stopped");
    Ok(())
}

async fn run_command(
    command: Command,
    platform: &Platform,
    boost: &BoostHandle,
    reclaimer: &Arc<Reclaimer>,
) {
    match command {
        Command::Input => platform.input.emit(InputEvent::touch()),
        Command::Display(event) => {
            // Display off cancels the removals synchronously
            let display = platform.display.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || display.set_power(event)).await {
                error!(error = %e, "Display event failed");
            }
        }
        Command::Reclaim => {
            let reclaimer = reclaimer.clone();
            match tokio::task::spawn_blocking(move || reclaimer.force_reclaim()).await {
                Ok(outcome) => info!(?outcome, "Reclaim requested"),
                Err(e) => error!(error = %e, "Reclaim task failed"),
            }
        }
        Command::Boost(ms) => boost.kick_max(ms),
        Command::Stats => {
            let stats = ResponderStats {
                boost: boost.arbiter().map(|arbiter| arbiter.stats()),
                reclaim: reclaimer.stats(),
            };
            info!(flags = ?boost.arbiter().map(|a| a.flags()), "stats: {}", stats.to_json());
        }
    }
}
