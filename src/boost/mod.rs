/*!
 * Boost Module
 *
 * CPU frequency-floor boost arbiter:
 * - Shared atomic boost state with monotonic max-boost expiry
 * - Dedicated worker for boost application, deferred pool for removal
 * - Policy hook translating the boost regime into per-CPU floors
 * - Input and display collaborator contracts
 */

pub mod arbiter;
pub mod handle;
mod handlers;
pub mod policy;
pub mod state;
pub mod stats;
pub mod traits;
pub mod types;
pub mod worker;

pub use arbiter::{BoostArbiter, BoostCollaborators};
pub use handle::BoostHandle;
pub use policy::BoostPolicyHook;
pub use state::{BoostState, ExtendOutcome};
pub use stats::{AtomicBoostStats, BoostStats};
pub use traits::*;
pub use types::*;
