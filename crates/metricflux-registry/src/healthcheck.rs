//! User-defined health checks stored alongside metrics.
//!
//! Exporters that publish numeric series skip these.

use std::fmt;
use std::sync::{Mutex, PoisonError};

type CheckFn = Box<dyn Fn(&Healthcheck) + Send + Sync>;

pub struct Healthcheck {
    error: Mutex<Option<String>>,
    check: CheckFn,
}

impl Healthcheck {
    /// Create a healthcheck that runs `check` on every [`Healthcheck::check`] call.
    pub fn new(check: impl Fn(&Healthcheck) + Send + Sync + 'static) -> Self {
        Self {
            error: Mutex::new(None),
            check: Box::new(check),
        }
    }

    pub fn check(&self) {
        (self.check)(self);
    }

    pub fn healthy(&self) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn unhealthy(&self, error: impl Into<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.into());
    }

    /// Last recorded error, if unhealthy.
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for Healthcheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Healthcheck")
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}
