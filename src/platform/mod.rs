/*!
 * Platform Module
 * Collaborator bindings with platform-specific implementations
 *
 * Linux is used when cpufreq and procfs are both reachable; every other host
 * falls back to the in-process simulation.
 */

pub mod hubs;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod registry;
pub mod sched;
pub mod simulation;

pub use hubs::{DisplayHub, InputHub};
pub use registry::Registry;
pub use simulation::{SimBusBoost, SimGovernor, SimMemory, SimProcessTable};

use crate::boost::arbiter::BoostCollaborators;
use crate::boost::traits::{BusBoost, FrequencyGovernor};
use crate::reclaim::traits::{MemorySource, ProcessTable};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Linux,
    Simulation,
}

/// Every collaborator the responder binds to
#[derive(Clone)]
pub struct Platform {
    pub kind: PlatformKind,
    pub governor: Arc<dyn FrequencyGovernor>,
    pub processes: Arc<dyn ProcessTable>,
    pub memory: Arc<dyn MemorySource>,
    pub bus: Option<Arc<dyn BusBoost>>,
    pub input: Arc<InputHub>,
    pub display: Arc<DisplayHub>,
}

impl Platform {
    /// Select the best available bindings for the current host
    pub fn detect() -> Self {
        #[cfg(target_os = "linux")]
        {
            let governor = linux::SysfsGovernor::new();
            let processes = linux::ProcfsProcessTable::new();
            if governor.is_supported() && processes.is_supported() {
                info!("Using Linux cpufreq and procfs bindings");
                return Self {
                    kind: PlatformKind::Linux,
                    governor: Arc::new(governor),
                    processes: Arc::new(processes),
                    memory: Arc::new(linux::ProcMemInfo::new()),
                    bus: None,
                    input: Arc::new(InputHub::new()),
                    display: Arc::new(DisplayHub::new()),
                };
            }
        }

        info!("Using simulated platform bindings");
        Self::simulation()
    }

    /// Fully simulated bindings: octa-core governor, empty process table
    pub fn simulation() -> Self {
        Self {
            kind: PlatformKind::Simulation,
            governor: Arc::new(SimGovernor::octa_core()),
            processes: Arc::new(SimProcessTable::new(Vec::new())),
            memory: Arc::new(SimMemory::new(u64::MAX / (1024 * 1024))),
            bus: Some(Arc::new(SimBusBoost::new())),
            input: Arc::new(InputHub::new()),
            display: Arc::new(DisplayHub::new()),
        }
    }

    /// Registration targets of the boost arbiter
    pub fn collaborators(&self) -> BoostCollaborators {
        BoostCollaborators {
            governor: self.governor.clone(),
            input: self.input.clone(),
            display: self.display.clone(),
        }
    }
}
