//! Process-wide default for the raise-on-error policy
//!
//! Host applications set this once at startup; it only supplies the default
//! used by [`Response::new`](crate::Response::new). Callers that want an
//! explicit policy pass one to
//! [`Response::with_policy`](crate::Response::with_policy) instead.

use std::sync::atomic::{AtomicBool, Ordering};

static RAISE_ERRORS: AtomicBool = AtomicBool::new(true);

/// Sets the process-wide default error policy. Defaults to `true`.
pub fn set_raise_errors(raise: bool) {
    RAISE_ERRORS.store(raise, Ordering::SeqCst);
}

/// Whether constructing a response signals faults and HTTP errors by default.
pub fn raise_errors() -> bool {
    RAISE_ERRORS.load(Ordering::SeqCst)
}
