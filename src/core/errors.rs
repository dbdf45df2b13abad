/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use super::types::Pid;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Boost arbiter errors.
///
/// Every variant except `NotInitialized` and `ShutDown` is an initialization
/// failure: the arbiter unwinds what it registered and stays disabled.
#[derive(Error, Debug, Diagnostic)]
pub enum BoostError {
    #[error("Failed to start boost worker: {0}")]
    #[diagnostic(
        code(boost::worker_spawn),
        help("The dedicated worker thread could not be created. Check thread limits.")
    )]
    WorkerSpawn(String),

    #[error("Failed to register frequency policy hook: {0}")]
    #[diagnostic(
        code(boost::policy_notifier),
        help("The frequency governor refused the policy hook. Input boost stays disabled.")
    )]
    PolicyNotifier(#[source] PlatformError),

    #[error("Failed to register input handler: {0}")]
    #[diagnostic(
        code(boost::input_handler),
        help("Input events cannot be observed. Input boost stays disabled.")
    )]
    InputHandler(#[source] PlatformError),

    #[error("Failed to register display listener: {0}")]
    #[diagnostic(
        code(boost::display_listener),
        help("Display power events cannot be observed. Input boost stays disabled.")
    )]
    DisplayListener(#[source] PlatformError),

    #[error("Boost arbiter is not initialized")]
    #[diagnostic(code(boost::not_initialized))]
    NotInitialized,

    #[error("Boost arbiter has been shut down")]
    #[diagnostic(code(boost::shut_down))]
    ShutDown,
}

/// Reclaimer errors, all recovered locally by skipping the victim or pass
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ReclaimError {
    #[error("Failed to signal PID {pid}: {reason}")]
    #[diagnostic(
        code(reclaim::signal_delivery),
        help("The victim may have exited already. It is skipped, not retried.")
    )]
    SignalDelivery { pid: Pid, reason: String },

    #[error("Process table unavailable: {0}")]
    #[diagnostic(
        code(reclaim::process_table),
        help("The process list could not be read. The pass frees nothing.")
    )]
    ProcessTable(String),
}

/// Platform binding errors (sysfs, procfs)
#[derive(Error, Debug, Diagnostic)]
pub enum PlatformError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(platform::io),
        help("Check that the path exists and the responder has permission to access it.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    #[diagnostic(code(platform::parse))]
    Parse { path: PathBuf, reason: String },

    #[error("Not supported: {0}")]
    #[diagnostic(
        code(platform::unsupported),
        help("This operation is not supported on this platform.")
    )]
    Unsupported(String),

    #[error("{registry} refused registration")]
    #[diagnostic(code(platform::registration_refused))]
    RegistrationRefused { registry: &'static str },
}

impl PlatformError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlatformError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PlatformError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    #[diagnostic(
        code(config::json),
        help("The config file must be a JSON object matching ResponderConfig.")
    )]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(config::invalid),
        help("All frequency and duration tunables must be positive integers.")
    )]
    Invalid { field: &'static str, reason: String },
}

/// Unified responder error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum ResponderError {
    #[error("Boost error: {0}")]
    #[diagnostic(transparent)]
    Boost(#[from] BoostError),

    #[error("Reclaim error: {0}")]
    #[diagnostic(transparent)]
    Reclaim(#[from] ReclaimError),

    #[error("Platform error: {0}")]
    #[diagnostic(transparent)]
    Platform(#[from] PlatformError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}
