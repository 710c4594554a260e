//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the scheduler and the outside world.
//! They are defined here (in `app`) so that both the scheduler and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod publisher;
pub mod timer;

pub use clock::{Clock, SystemClock};
pub use publisher::MessagePublisher;
pub use timer::LeaseTimer;
