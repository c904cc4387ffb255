//! [`Clock`] definitions.

#[cfg(test)]
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use common::DateTime;

/// Source of the current [`DateTime`].
pub trait Clock {
    /// Returns the current [`DateTime`].
    fn now(&self) -> DateTime;
}

/// [`Clock`] reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Clock for System {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}

/// [`Clock`] standing still until moved explicitly.
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct Manual(Arc<Mutex<DateTime>>);

#[cfg(test)]
impl Manual {
    /// Creates a new [`Manual`] [`Clock`] showing the provided [`DateTime`].
    pub fn new(now: DateTime) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    /// Moves this [`Manual`] [`Clock`] forward.
    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

#[cfg(test)]
impl Clock for Manual {
    fn now(&self) -> DateTime {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
