//! Development-only diagnostics.
//!
//! Warnings never change control flow. They are emitted through `tracing` with the `oneway` target
//! and are compiled out of builds with `debug_assertions` disabled or the `production` feature enabled.

use std::fmt::Display;

/// Returns `true` if development diagnostics are emitted by this build.
pub const fn enabled() -> bool {
    cfg!(all(debug_assertions, not(feature = "production")))
}

pub(crate) fn warning(message: impl Display) {
    if enabled() {
        tracing::warn!(target: "oneway", "{message}");
    }
}
