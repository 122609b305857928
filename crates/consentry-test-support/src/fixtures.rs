//! Clocks and registries backed by in-memory jars.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use consentry_core::jar::Clock;
use consentry_core::{JarContext, MemoryJar, StoreRegistry};

/// Fixed instant used as the starting point for manual clocks.
pub const EPOCH_SECS: i64 = 1_700_000_000;

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    /// Clock starting at [`EPOCH_SECS`].
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::from_timestamp(EPOCH_SECS, 0).unwrap_or_default())
    }

    /// Clock starting at `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Current instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        let delta = TimeDelta::try_seconds(seconds).unwrap_or_default();
        self.now.set(self.now.get() + delta);
    }

    /// Time source for [`MemoryJar::with_clock`].
    #[must_use]
    pub fn clock(&self) -> Clock {
        let now = Rc::clone(&self.now);
        Rc::new(move || now.get())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry over a fresh default in-memory jar, plus the jar itself.
#[must_use]
pub fn memory_registry() -> (Rc<MemoryJar>, StoreRegistry) {
    registry_over(MemoryJar::new())
}

/// Registry over an in-memory jar attached to `context` and driven by `clock`.
#[must_use]
pub fn memory_registry_with(
    context: JarContext,
    clock: &ManualClock,
) -> (Rc<MemoryJar>, StoreRegistry) {
    registry_over(MemoryJar::with_clock(context, clock.clock()))
}

fn registry_over(jar: MemoryJar) -> (Rc<MemoryJar>, StoreRegistry) {
    let jar = Rc::new(jar);
    let registry = StoreRegistry::new(Rc::clone(&jar) as Rc<dyn consentry_core::CookieJar>);
    (jar, registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::new();
        let start = clock.now();
        let source = clock.clock();
        clock.advance(30);
        assert_eq!((clock.now() - start).num_seconds(), 30);
        assert_eq!(source(), clock.now());
    }
}
