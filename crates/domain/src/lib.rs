//! # roomlease-domain
//!
//! Pure domain model for the roomlease actuator admission scheduler.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **device key** (`room/actuator`) that identifies a schedulable resource
//! - Route **topics** (`room/<room>/actuators/<actuator>/<kind>`) to device keys
//! - Define the **payloads** carried by request, ack, grant and sensor messages
//! - Define **leases** and the per-device admission state
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device_key;
pub mod lease;
pub mod message;
pub mod payload;
pub mod topic;
