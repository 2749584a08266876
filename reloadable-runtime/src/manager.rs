//! Registry of every running watcher and timer so they can be stopped in bulk.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::Serialize;

use reloadable_core::UnitName;

use crate::task::{TaskControl, TaskId, TaskKind};

static GLOBAL: OnceLock<Arc<ReloadableManager>> = OnceLock::new();

/// Tracks the background reload tasks of every unit that registered with it.
///
/// Units register on start and deregister on stop. Bulk stops only signal
/// tasks: a reload already in progress runs to completion.
#[derive(Debug, Default)]
pub struct ReloadableManager {
    watchers: Mutex<HashMap<TaskId, Arc<TaskControl>>>,
    timers: Mutex<HashMap<TaskId, Arc<TaskControl>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub kind: TaskKind,
    pub unit: UnitName,
}

/// Snapshot of the registry, suitable for logging or JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub watchers: Vec<TaskSummary>,
    pub timers: Vec<TaskSummary>,
}

impl ReloadableManager {
    /// A standalone registry. Units only see it when built with it explicitly.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide registry used by units that were not given one.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(ReloadableManager::new))
    }

    pub(crate) fn register(&self, task: Arc<TaskControl>) {
        let mut registry = self.registry(task.kind()).lock();
        registry.insert(task.id(), task);
    }

    pub(crate) fn deregister(&self, task: &TaskControl) {
        self.registry(task.kind()).lock().remove(&task.id());
    }

    /// Stop every registered reload timer. Returns how many were stopped.
    pub fn stop_periodic_updates(&self) -> usize {
        let stopped = Self::stop_all(&self.timers);
        tracing::info!(stopped, "all periodic reloading stopped");
        stopped
    }

    /// Stop every registered source watcher. Returns how many were stopped.
    pub fn stop_on_modified_updates(&self) -> usize {
        let stopped = Self::stop_all(&self.watchers);
        tracing::info!(stopped, "all on-modified reloading stopped");
        stopped
    }

    pub fn active_watchers(&self) -> usize {
        self.watchers.lock().len()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn status(&self) -> ManagerStatus {
        ManagerStatus {
            watchers: Self::summarize(&self.watchers),
            timers: Self::summarize(&self.timers),
        }
    }

    fn registry(&self, kind: TaskKind) -> &Mutex<HashMap<TaskId, Arc<TaskControl>>> {
        match kind {
            TaskKind::Watcher => &self.watchers,
            TaskKind::Timer => &self.timers,
        }
    }

    // The lock is held while stopping so a concurrent register cannot slip a
    // task in between the drain and the stop.
    fn stop_all(registry: &Mutex<HashMap<TaskId, Arc<TaskControl>>>) -> usize {
        let mut guard = registry.lock();
        guard.drain().filter(|(_, task)| task.stop()).count()
    }

    fn summarize(registry: &Mutex<HashMap<TaskId, Arc<TaskControl>>>) -> Vec<TaskSummary> {
        let mut summaries: Vec<TaskSummary> = registry
            .lock()
            .values()
            .map(|task| TaskSummary {
                id: task.id(),
                kind: task.kind(),
                unit: task.unit().clone(),
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_stop_only_touches_its_own_kind() {
        let manager = ReloadableManager::new();
        let watcher = TaskControl::new(TaskKind::Watcher, UnitName::from("a"));
        let timer = TaskControl::new(TaskKind::Timer, UnitName::from("a"));
        manager.register(Arc::clone(&watcher));
        manager.register(Arc::clone(&timer));

        assert_eq!(manager.stop_periodic_updates(), 1);
        assert!(!timer.is_running());
        assert!(watcher.is_running());
        assert_eq!(manager.active_timers(), 0);
        assert_eq!(manager.active_watchers(), 1);

        assert_eq!(manager.stop_on_modified_updates(), 1);
        assert!(!watcher.is_running());
        assert_eq!(manager.active_watchers(), 0);
    }

    #[test]
    fn bulk_stop_on_empty_registry_is_a_no_op() {
        let manager = ReloadableManager::new();
        assert_eq!(manager.stop_periodic_updates(), 0);
        assert_eq!(manager.stop_on_modified_updates(), 0);
    }

    #[test]
    fn already_stopped_tasks_are_drained_but_not_counted() {
        let manager = ReloadableManager::new();
        let timer = TaskControl::new(TaskKind::Timer, UnitName::from("a"));
        manager.register(Arc::clone(&timer));
        timer.stop();

        assert_eq!(manager.stop_periodic_updates(), 0);
        assert_eq!(manager.active_timers(), 0);
    }

    #[test]
    fn status_lists_tasks_in_start_order() {
        let manager = ReloadableManager::new();
        let first = TaskControl::new(TaskKind::Timer, UnitName::from("first"));
        let second = TaskControl::new(TaskKind::Timer, UnitName::from("second"));
        manager.register(Arc::clone(&second));
        manager.register(Arc::clone(&first));
        manager.deregister(&TaskControl::new(TaskKind::Timer, UnitName::from("ghost")));

        let status = manager.status();
        let units: Vec<&str> = status.timers.iter().map(|t| t.unit.as_str()).collect();
        assert_eq!(units, vec!["first", "second"]);
        assert!(status.watchers.is_empty());

        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["timers"][0]["unit"], "first");
        assert_eq!(json["timers"][0]["kind"], "timer");
    }

    #[test]
    fn global_registry_is_shared() {
        assert!(Arc::ptr_eq(&ReloadableManager::global(), &ReloadableManager::global()));
    }
}
