//! # roomlease-app
//!
//! Application layer: the admission scheduler and the **port definitions**
//! (traits) it drives.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `MessagePublisher`: fire-and-forget publishing on the bus
//!   - `LeaseTimer`: schedule and cancel lease expiries
//!   - `Clock`: wall-clock time for lease bookkeeping
//! - Own the scheduling state (`AdmissionController`): request queue,
//!   lease table, round-robin rotation on expiry
//! - Serialize every scheduler event through one channel (`runtime`)
//! - Record counters and gauges through the `metrics` facade (`metrics`)
//! - Provide **in-process infrastructure** that needs no IO: the broadcast
//!   bus and the tokio-backed lease timer
//!
//! ## Dependency rule
//! Depends on `roomlease-domain` only (plus `tokio` for channels, tasks and
//! timers, and the `metrics` facade). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod event_bus;
pub mod metrics;
pub mod ports;
pub mod runtime;
pub mod scheduler;
pub mod timer;
