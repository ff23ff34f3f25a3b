// ABOUTME: Swap state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid transition order at compile time.

/// Lock held, active slot read from the marker.
/// Available actions: `stop_stale()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

/// Leftover process in the inactive slot stopped.
/// Available actions: `start()`
#[derive(Debug, Clone, Copy, Default)]
pub struct StaleCleared;

/// Inactive slot service started.
/// Available actions: `health_check()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Started;

/// New slot answered its health probe.
/// Available actions: `cutover()`, `split_traffic()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Healthy;

/// Pinned sessions routed to the old slot, everyone else to the new one.
/// Available actions: `drain()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitting;

/// Drain finished (drained, forced or timed out).
/// Available actions: `cutover()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Drained;

/// All traffic on the new slot.
/// Available actions: `stop_old()`
#[derive(Debug, Clone, Copy, Default)]
pub struct CutOver;

/// Old slot service stopped.
/// Available actions: `commit()`
#[derive(Debug, Clone, Copy, Default)]
pub struct OldStopped;

/// Marker flipped; terminal success state.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Committed;

/// New slot stopped after a failed health gate; terminal failure state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolledBack;

/// States from which traffic may be moved wholesale to the new slot.
pub trait ReadyForCutover: sealed::Sealed {}

impl ReadyForCutover for Healthy {}
impl ReadyForCutover for Drained {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Healthy {}
    impl Sealed for super::Drained {}
}
