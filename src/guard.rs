//! Guarded calls for best-effort side effects
//!
//! Initializer, start and enhancement activation all go through [`attempt`]:
//! the error (or panic) is logged and reduced to `Err(())`, and the caller
//! decides what, if anything, the failure means.

use crate::errors::{BootError, Result};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Run a fallible future, discarding its error.
///
/// Panics inside the future are caught and treated like errors.
pub async fn attempt<F, T>(label: &str, call: F) -> std::result::Result<T, ()>
where
    F: Future<Output = Result<T>>,
{
    let outcome = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(BootError::Panicked(panic_message(payload.as_ref()))),
    };

    match outcome {
        Ok(value) => Ok(value),
        Err(e) => {
            log::warn!("{} failed (ignored): {}", label, e);
            Err(())
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
