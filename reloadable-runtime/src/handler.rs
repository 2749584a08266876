//! Post-reload hooks.

use std::any::Any;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

use reloadable_core::UnitImplementation;

use crate::unit::Reloadable;

pub type HandlerError = Box<dyn Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Callback invoked once after every successful reload of a unit.
///
/// The handler receives the unit itself, so `target.current()` already
/// returns the new implementation. Failures and panics are logged and never
/// undo the reload.
pub trait ReloadHandler<T>: Send + Sync {
    fn on_reloaded(&self, target: &Reloadable<T>) -> HandlerResult;
}

impl<T, F> ReloadHandler<T> for F
where
    F: Fn(&Reloadable<T>) -> HandlerResult + Send + Sync,
{
    fn on_reloaded(&self, target: &Reloadable<T>) -> HandlerResult {
        self(target)
    }
}

pub(crate) fn invoke_handler<T: UnitImplementation>(
    handler: &dyn ReloadHandler<T>,
    target: &Reloadable<T>,
) {
    match catch_unwind(AssertUnwindSafe(|| handler.on_reloaded(target))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(unit = %target.name(), error = %err, "reload handler failed");
        }
        Err(payload) => {
            tracing::error!(
                unit = %target.name(),
                panic = %panic_message(payload.as_ref()),
                "reload handler panicked",
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
