//! Stop handles shared by a background task, the unit that started it and the
//! manager registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::watch;

use reloadable_core::{ReloadTrigger, UnitImplementation, UnitName};

use crate::unit::Reloadable;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a watcher or timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Watcher,
    Timer,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Watcher => write!(f, "watcher"),
            TaskKind::Timer => write!(f, "timer"),
        }
    }
}

/// Running flag plus stop signal of one background task.
///
/// Stopping is one-way: a stopped control never runs again, a restart always
/// creates a new one.
#[derive(Debug)]
pub struct TaskControl {
    id: TaskId,
    kind: TaskKind,
    unit: UnitName,
    stop_tx: watch::Sender<bool>,
}

impl TaskControl {
    pub(crate) fn new(kind: TaskKind, unit: UnitName) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            unit,
            stop_tx,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn unit(&self) -> &UnitName {
        &self.unit
    }

    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow()
    }

    /// Signal the task to stop. Returns `true` if it was still running.
    ///
    /// A reload already in progress is not interrupted.
    pub fn stop(&self) -> bool {
        let was_stopped = self.stop_tx.send_replace(true);
        if !was_stopped {
            tracing::info!(unit = %self.unit, task = %self.kind, id = %self.id, "background reload task stopped");
        }
        !was_stopped
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }
}

/// Resolves once the task has been told to stop.
pub(crate) async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    // Err means the control was dropped, which ends the task as well.
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

/// Run one triggered reload on the blocking pool and wait for it.
///
/// Returns `false` when the unit is gone and the calling task should exit.
pub(crate) async fn trigger_reload<T: UnitImplementation>(
    unit: &Weak<Reloadable<T>>,
    trigger: ReloadTrigger,
    control: &Arc<TaskControl>,
) -> bool {
    let Some(unit) = unit.upgrade() else {
        tracing::debug!(unit = %control.unit(), trigger = %trigger, "unit dropped; ending background task");
        return false;
    };
    let task = Arc::clone(control);
    match tokio::task::spawn_blocking(move || unit.reload_from(trigger, &task)).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(
                unit = %control.unit(),
                trigger = %trigger,
                error = %err,
                "reload task join failure",
            );
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_one_way_and_reports_first_transition() {
        let control = TaskControl::new(TaskKind::Timer, UnitName::from("area"));
        assert!(control.is_running());
        assert!(control.stop());
        assert!(!control.is_running());
        assert!(!control.stop(), "second stop is a no-op");
    }

    #[test]
    fn task_ids_are_unique() {
        let a = TaskControl::new(TaskKind::Watcher, UnitName::from("a"));
        let b = TaskControl::new(TaskKind::Watcher, UnitName::from("a"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn subscribers_observe_stop_sent_before_they_wait() {
        let control = TaskControl::new(TaskKind::Watcher, UnitName::from("area"));
        let mut rx = control.subscribe();
        control.stop();
        tokio_test::block_on(async {
            tokio::time::timeout(std::time::Duration::from_secs(1), stopped(&mut rx))
                .await
                .expect("stop observed");
        });
    }
}
