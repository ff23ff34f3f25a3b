// ABOUTME: Blue-green swap orchestration using the type state pattern.
// ABOUTME: Exports the lock, marker, state markers, drain logic and the controller entry point.

mod controller;
mod drain;
mod error;
mod lock;
mod marker;
mod signal;
mod state;
mod swap;
mod transitions;

pub use controller::{SwapEvent, SwapMode, run_swap};
pub use drain::{DrainOutcome, DrainSettings, drain_sessions};
pub use error::{DeployError, DeployErrorKind};
pub use lock::{DeployLock, LockInfo};
pub use marker::ActiveSlotMarker;
pub use signal::{Signal, SignalTrigger, Signals};
pub use state::{
    Committed, CutOver, Drained, Healthy, Locked, OldStopped, ReadyForCutover, RolledBack,
    Splitting, StaleCleared, Started,
};
pub use swap::{Swap, SwapPlan, SwapReport};
pub use transitions::TransitionResult;
