//! Clock port.

use roomlease_domain::time::{self, Timestamp};

/// Source of the current time, injected so tests can pin it.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock [`Clock`] backed by [`time::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
